//! # hclr - HCL reduction
//!
//! Parses HCL (as used by terraform) into a plain tree of values. References, function calls, conditionals and
//! data lookups are resolved, what is left is a document that serializes straight to JSON or YAML.
//!
//! ```
//! let document = hclr::Parser::new()
//!     .parse(r#"
//!         variable "size" {
//!           default = 2
//!         }
//!         disks = var.size * 100
//!     "#)
//!     .unwrap();
//!
//! assert_eq!(document["disks"], hclr::Value::Number(200.0));
//! ```
//!
//! ## Introduction for developers
//!
//! Read this to understand how `hclr` works internally.
//!
//! ### HCL Terms
//!
//! In hcl terms...
//! - a file gets parsed as a `body`
//! - ...which is just a list of `structures`
//! - ...where there are two kinds:
//!   - `attribute`: a "key = value" pair
//!   - or `block`:
//!     - 1 `identifier`
//!     - followed by 0 or more `labels`
//!     - and a `body` enclosed in `{` and `}`
//!
//! ### Lowering
//!
//! see [lower]
//!
//! The source is parsed with [hcl_edit] and lowered into [syntax::Node]s. Expressions become *flat* lists of
//! operands and operators that are evaluated strictly left to right: there is no operator precedence, so
//! `1 + 2 * 3` is `9`. Parentheses group.
//!
//! ### Structure
//!
//! The first pass builds the shape of the document. A block is stored under the path made of its identifier and
//! labels:
//!
//! ```hcl
//! resource "aws_instance" "web" {
//!   ami = "ami-123"
//! }
//! ```
//!
//! becomes `resource.aws_instance.web.ami`. When the same path is used again, the map at the end of the path is
//! turned into a list of maps. Attribute expressions are kept unevaluated.
//!
//! ### Resolution
//!
//! The second pass evaluates everything that was kept unevaluated. `locals`, `variable` and `data` are resolved
//! first, then all other top level entries in document order.
//!
//! A reference starts at
//!
//! | **first segment** | **looks at**                                                    |
//! |-------------------|-----------------------------------------------------------------|
//! | `local`           | the `locals` blocks                                             |
//! | `var`             | the variables set on the [Parser], then `variable "<name>"` defaults |
//! | `data`            | `data.<provider>.<name>` runs the registered data lookup once    |
//! | anything else     | the top level entry of the document                              |
//!
//! Unknown functions and references that can not be resolved do not fail the parse. Function calls evaluate to
//! `null`, references stay in the document as `${...}`.
//!
//! ### Output
//!
//! The result is a [Document], an ordered map of [Value]s which serializes via [serde].
//!
pub mod error;
pub mod functions;
pub mod lookup;
pub mod lower;
mod parser;
mod reduce;
pub mod syntax;
pub mod value;

pub use error::Error;
pub use functions::FunctionRegistry;
pub use lookup::DataLookupRegistry;
pub use parser::{ParseOptions, Parser};
pub use syntax::Node;
pub use value::{Document, Map, Value};
