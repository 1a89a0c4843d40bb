use std::fmt;

pub type Result<T> = std::result::Result<T, ToolError>;

/// Express whether the error seems to be happening in the user's input, the
/// local configuration, or something we shelled out to / talked to over the
/// network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorLayer {
    /// The invocation itself has structural issues like a JSON file that
    /// doesn't parse or a CSS selector we can't compile.  Re-running the same
    /// command will never help.
    BadInput,
    /// The deployment configuration or a template is broken.
    ConfigLayer,
    /// A process we spawned or a server we talked to was unhappy.
    ExternalLayer,
    /// Reading or writing a local file failed.
    DataLayer,
}

/// Payload to provide details about what went wrong for investigation
/// purposes.
#[derive(Debug)]
pub struct ErrorDetails {
    pub layer: ErrorLayer,
    /// Stringified version of the lower level error.
    pub message: String,
}

/// Does a retry make sense or not?
///
/// Nothing in this crate retries (the scripts are run by hand), but keeping
/// the distinction lets a caller decide whether re-running is worth it.
#[derive(Debug)]
pub enum ToolError {
    /// An error that will persist, like a missing file or a 404.
    StickyProblem(ErrorDetails),
    /// An error that might go away if retried later, like a connection reset
    /// or a 502.
    TransientProblem(ErrorDetails),
}

impl ToolError {
    pub fn sticky(layer: ErrorLayer, message: impl Into<String>) -> ToolError {
        ToolError::StickyProblem(ErrorDetails {
            layer,
            message: message.into(),
        })
    }

    pub fn transient(layer: ErrorLayer, message: impl Into<String>) -> ToolError {
        ToolError::TransientProblem(ErrorDetails {
            layer,
            message: message.into(),
        })
    }

    pub fn details(&self) -> &ErrorDetails {
        match self {
            ToolError::StickyProblem(details) => details,
            ToolError::TransientProblem(details) => details,
        }
    }

    pub fn layer(&self) -> ErrorLayer {
        self.details().layer
    }

    pub fn message(&self) -> &str {
        &self.details().message
    }
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for ToolError {}

impl From<std::io::Error> for ToolError {
    fn from(err: std::io::Error) -> ToolError {
        ToolError::sticky(ErrorLayer::DataLayer, err.to_string())
    }
}

// JSON parse errors are sticky input problems.
impl From<serde_json::Error> for ToolError {
    fn from(err: serde_json::Error) -> ToolError {
        ToolError::sticky(ErrorLayer::BadInput, err.to_string())
    }
}

/// reqwest won't return an error for an unhappy status code itself; someone
/// would need to call `Response::error_for_status`, so anything that reaches
/// here is a connection-level problem and we treat it as transient.
impl From<reqwest::Error> for ToolError {
    fn from(err: reqwest::Error) -> ToolError {
        ToolError::transient(ErrorLayer::ExternalLayer, err.to_string())
    }
}

impl From<url::ParseError> for ToolError {
    fn from(err: url::ParseError) -> ToolError {
        ToolError::sticky(ErrorLayer::BadInput, err.to_string())
    }
}

impl From<liquid::Error> for ToolError {
    fn from(err: liquid::Error) -> ToolError {
        ToolError::sticky(ErrorLayer::ConfigLayer, err.to_string())
    }
}

impl From<toml::de::Error> for ToolError {
    fn from(err: toml::de::Error) -> ToolError {
        ToolError::sticky(ErrorLayer::ConfigLayer, err.to_string())
    }
}
