use std::fmt;

#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    TomlError(String),
    MissingKey(String),
    MalformedLine(String),
    InvalidValue(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::TomlError(e) => write!(f, "TOML parsing error: {}", e),
            ConfigError::MissingKey(e) => write!(f, "Missing configuration key: {}", e),
            ConfigError::MalformedLine(e) => write!(f, "Malformed configuration line: {}", e),
            ConfigError::InvalidValue(e) => write!(f, "Invalid configuration value: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError(err)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::TomlError(err.to_string())
    }
}

/// Errors raised while decoding one multipart section.
///
/// These never tear down the upstream connection; the offending section is
/// skipped and decoding resumes at the next boundary.
#[derive(Debug, PartialEq, Eq)]
pub enum MultipartError {
    MalformedHeader(String),
    InvalidContentLength(String),
    SectionTooLarge(usize),
}

impl fmt::Display for MultipartError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MultipartError::MalformedHeader(e) => write!(f, "Malformed section header: {}", e),
            MultipartError::InvalidContentLength(e) => {
                write!(f, "Invalid Content-Length value: {}", e)
            }
            MultipartError::SectionTooLarge(n) => {
                write!(f, "Section exceeds maximum size ({} bytes)", n)
            }
        }
    }
}

impl std::error::Error for MultipartError {}

#[derive(Debug)]
pub enum SourceError {
    RequestFailed(String),
    BadStatus(u16),
    StreamFailed(String),
    StreamEnded,
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::RequestFailed(e) => write!(f, "Upstream request failed: {}", e),
            SourceError::BadStatus(code) => write!(f, "Upstream answered with status {}", code),
            SourceError::StreamFailed(e) => write!(f, "Upstream stream failed: {}", e),
            SourceError::StreamEnded => write!(f, "Upstream stream ended"),
        }
    }
}

impl std::error::Error for SourceError {}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        SourceError::RequestFailed(err.to_string())
    }
}

#[derive(Debug)]
pub enum StreamError {
    ClientGone,
    IoError(std::io::Error),
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamError::ClientGone => write!(f, "Stream client disconnected"),
            StreamError::IoError(e) => write!(f, "Stream IO error: {}", e),
        }
    }
}

impl std::error::Error for StreamError {}

impl From<std::io::Error> for StreamError {
    fn from(err: std::io::Error) -> Self {
        StreamError::IoError(err)
    }
}

#[derive(Debug)]
pub enum RecordingError {
    AlreadyRecording,
    LaunchFailed(String),
    IoError(std::io::Error),
}

impl fmt::Display for RecordingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordingError::AlreadyRecording => write!(f, "Recording already started"),
            RecordingError::LaunchFailed(e) => write!(f, "Recorder launch failed: {}", e),
            RecordingError::IoError(e) => write!(f, "Recorder IO error: {}", e),
        }
    }
}

impl std::error::Error for RecordingError {}

impl From<std::io::Error> for RecordingError {
    fn from(err: std::io::Error) -> Self {
        RecordingError::IoError(err)
    }
}

/// Errors raised while listing the clip tree.
#[derive(Debug)]
pub enum BrowseError {
    InvalidPath(String),
    NotFound(String),
    IoError(std::io::Error),
}

impl fmt::Display for BrowseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrowseError::InvalidPath(p) => write!(f, "Invalid clip path: {}", p),
            BrowseError::NotFound(p) => write!(f, "Clip folder not found: {}", p),
            BrowseError::IoError(e) => write!(f, "Failed to read directory: {}", e),
        }
    }
}

impl std::error::Error for BrowseError {}

impl From<std::io::Error> for BrowseError {
    fn from(err: std::io::Error) -> Self {
        BrowseError::IoError(err)
    }
}

#[derive(Debug)]
pub enum WebError {
    BindFailed(String),
}

impl fmt::Display for WebError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WebError::BindFailed(e) => write!(f, "Web server bind failed: {}", e),
        }
    }
}

impl std::error::Error for WebError {}

#[derive(Debug)]
pub enum ControllerError {
    ConfigurationError(ConfigError),
    WebError(WebError),
    InitializationFailed(String),
}

impl fmt::Display for ControllerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerError::ConfigurationError(e) => write!(f, "Configuration error: {}", e),
            ControllerError::WebError(e) => write!(f, "Web error: {}", e),
            ControllerError::InitializationFailed(e) => write!(f, "Initialization failed: {}", e),
        }
    }
}

impl std::error::Error for ControllerError {}

impl From<ConfigError> for ControllerError {
    fn from(err: ConfigError) -> Self {
        ControllerError::ConfigurationError(err)
    }
}

impl From<WebError> for ControllerError {
    fn from(err: WebError) -> Self {
        ControllerError::WebError(err)
    }
}
