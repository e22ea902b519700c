use thiserror::Error;

pub type PreviewResult<T> = Result<T, PreviewError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PreviewError {
    #[error("Markup parse error: {0}")]
    Markup(String),

    #[error("Stylesheet parse error at line {line}, column {column}: {message}")]
    Stylesheet {
        line: u32,
        column: u32,
        message: String,
    },

    #[error("{type_name} is not buildable")]
    NotBuildable { type_name: String },

    #[error("Construction error: {0}")]
    Construction(String),

    // --- delegate process errors ---

    #[error("Delegate did not answer '{method}' within {timeout_ms}ms")]
    DelegateUnresponsive { method: String, timeout_ms: u64 },

    #[error("Delegate failed '{method}': {message}")]
    DelegateFailed { method: String, message: String },

    #[error("Delegate control channel closed: {0}")]
    DelegateClosed(String),

    #[error("Failed to start delegate process: {0}")]
    DelegateSpawn(String),

    #[error("No render mode configured for runtime '{label}'")]
    UnknownRuntime { label: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl PreviewError {
    /// Parse errors are expected while the user is typing and are only worth a debug line.
    pub fn is_parse_error(&self) -> bool {
        matches!(self, PreviewError::Markup(_) | PreviewError::Stylesheet { .. })
    }
}

impl From<roxmltree::Error> for PreviewError {
    fn from(err: roxmltree::Error) -> Self {
        PreviewError::Markup(err.to_string())
    }
}

impl From<serde_yaml::Error> for PreviewError {
    fn from(err: serde_yaml::Error) -> Self {
        PreviewError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for PreviewError {
    fn from(err: serde_json::Error) -> Self {
        PreviewError::DelegateClosed(format!("malformed frame: {}", err))
    }
}

impl From<std::io::Error> for PreviewError {
    fn from(err: std::io::Error) -> Self {
        PreviewError::DelegateClosed(err.to_string())
    }
}
