//! Evaluation request intake.
//!
//! Requests arrive as camelCase JSON (or YAML) from automation platforms.
//! They are checked against JSON Schema first, then validated semantically.

mod parser;
mod schema;

pub use parser::{EvaluateRequest, RequestError, SUPPORTED_PLATFORMS, SUPPORTED_PROVIDERS};
pub use schema::{validate_request_schema, SchemaError};
