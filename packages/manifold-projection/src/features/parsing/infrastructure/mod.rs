//! Infrastructure - tree-sitter parser and the default-value pre-scan

mod declaration_parser;
mod param_defaults;

pub use declaration_parser::{DeclarationParser, ParsedUnit, SpanExt};
pub use param_defaults::{extract_param_defaults, ParamDefaults};
