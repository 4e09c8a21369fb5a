//! Snapshot tests
//!
//! Parses each *.hcl file in /tests/ individually and compares if the
//! resolved document changes.

#[test]
fn snapshots() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_env("HCLR_LOG"))
        .with_writer(std::io::stderr)
        .init();

    insta::glob!("*.hcl", |path| {
        let mut parser = hclr::Parser::new();
        parser.register_data_lookup("echo", |properties| Ok(properties.clone()));

        let document = parser.parse_file(path).expect("must be a valid document");

        insta::assert_yaml_snapshot!(document);
    });
}
