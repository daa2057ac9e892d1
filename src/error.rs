use std::path::PathBuf;

/// Failure taxonomy for packing operations.
///
/// Input validation errors are raised before any side effect is created;
/// everything else aborts the in-flight operation after best-effort cleanup
/// of its temporary artifacts.
#[derive(Debug, thiserror::Error)]
pub enum PackError {
    #[error("bundle '{}' is not usable: {reason}", path.display())]
    InvalidBundle { path: PathBuf, reason: String },

    #[error("bundle config '{}' is not valid JSON: {source}", path.display())]
    InvalidConfig {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid image reference '{0}': expected name[:tag]")]
    InvalidReference(String),

    #[error("ARCH '{arch}' is unsupported at line {line}")]
    UnsupportedArch { arch: String, line: usize },

    #[error("ENV expression '{expr}' is invalid at line {line}: expected exactly one '='")]
    InvalidEnv { expr: String, line: usize },

    #[error("{directive} requires {expected} argument(s) at line {line}")]
    MissingArgs {
        directive: String,
        expected: usize,
        line: usize,
    },

    #[error("entry '{}' cannot be serialized: {reason}", name.display())]
    UnsupportedEntry { name: PathBuf, reason: String },

    #[error("walk failed: {0}")]
    Walk(#[from] walkdir::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
