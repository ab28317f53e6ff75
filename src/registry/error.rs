//! Wiring failures.

use thiserror::Error;

/// Boxed error used for constructor, component and abort failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// An unrecoverable defect in the dependency graph.
#[derive(Debug, Error)]
pub enum WiringError {
    #[error("no provider registered for {type_name}{}", required_by_suffix(.required_by))]
    MissingProvider {
        type_name: &'static str,
        required_by: Option<&'static str>,
    },

    #[error("ambiguous provider: {type_name} is already registered")]
    AmbiguousProvider { type_name: &'static str },

    #[error("dependency cycle detected: {}", .path.join(" -> "))]
    Cycle { path: Vec<&'static str> },

    #[error("constructor for {type_name} failed: {source}")]
    Constructor {
        type_name: &'static str,
        source: BoxError,
    },

    #[error("registered value for {type_name} has an unexpected type")]
    TypeMismatch { type_name: &'static str },
}

fn required_by_suffix(required_by: &Option<&'static str>) -> String {
    match required_by {
        Some(dependent) => format!(" (required by {dependent})"),
        None => String::new(),
    }
}
