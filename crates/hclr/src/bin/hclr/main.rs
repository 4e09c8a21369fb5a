mod cli;

use hclr::Document;

fn main() {
    use clap::Parser;
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_env("HCLR_LOG"))
        .with_writer(std::io::stderr)
        .init();

    for new_path in cli.directory.iter() {
        match new_path.canonicalize() {
            Err(e) => {
                eprintln!(
                    "Failed to resolve path for -C/--directory {}\n{}",
                    new_path.display(),
                    e
                );
                std::process::exit(1);
            }
            Ok(cwd) => {
                if let Err(err) = std::env::set_current_dir(&cwd) {
                    eprintln!("Failed to set work directory to {}\n{}", cwd.display(), err,);
                    std::process::exit(1);
                }

                tracing::info!(directory=%cwd.display(), "Changed working directory");
            }
        }
    }

    let command_result = match cli.command {
        cli::Command::Parse(parse_cli) => parse(parse_cli),
        cli::Command::Dev(dev_cli) => dev(dev_cli),
    };

    if let Err(e) = command_result {
        for error in e.chain() {
            eprintln!("{error}")
        }
        std::process::exit(1);
    }
}

pub fn parse(cli: cli::ParseCommand) -> anyhow::Result<()> {
    let mut parser = parser(&cli.input);

    for path in &cli.variables.files {
        tracing::info!(path=%path.display(), "loading variables");
        parser.parse_vars(&std::fs::read_to_string(path)?)?;
    }
    parser.set_variables(cli.variables.values);

    let document = parser.parse(&load(&cli.input)?)?;

    output(&cli.output, &document)?;
    Ok(())
}

fn parser(input: &cli::InputArgs) -> hclr::Parser {
    hclr::Parser::with_options(hclr::ParseOptions {
        ignore_errors: input.ignore_errors,
        ..Default::default()
    })
}

/// Source text of all input files, or stdin when there are none
fn load(input: &cli::InputArgs) -> anyhow::Result<String> {
    if input.files.is_empty() {
        return Ok(std::io::read_to_string(std::io::stdin())?);
    }

    let mut source = String::new();
    for file_path in &input.files {
        tracing::info!(path=%file_path.display(), "loading file");
        source.push_str(&std::fs::read_to_string(file_path)?);
        source.push('\n');
    }

    Ok(source)
}

fn output(output: &cli::OutputArgs, document: &Document) -> anyhow::Result<()> {
    match output.format {
        cli::OutputFormat::Yaml => serde_yaml::to_writer(std::io::stdout(), document)?,
        cli::OutputFormat::Json => serde_json::to_writer_pretty(std::io::stdout(), document)?,
    };

    Ok(())
}

/// (hclr-)developer utilities
///
/// A quick way to expose internal structures for debugging purposes
pub fn dev(cli: cli::DevCommand) -> anyhow::Result<()> {
    let source = load(&cli.input)?;

    match cli.command {
        cli::DevSubCommand::Nodes => {
            let nodes = if cli.input.ignore_errors {
                hclr::lower::tokenize_lenient(&source)
            } else {
                hclr::lower::tokenize(&source)?
            };
            println!("{nodes:#?}")
        }
        cli::DevSubCommand::Document => {
            let document = parser(&cli.input).parse(&source)?;
            println!("{document:#?}")
        }
    }

    Ok(())
}
