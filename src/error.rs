use thiserror::Error;

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Malformed record at byte {offset}: {message}")]
    Malformed { offset: u64, message: String },
    #[error("Negative delay: {key}={value}")]
    Delay { key: String, value: i64 },
    #[error("Missing variable: {0}")]
    MissingVariable(String),
    #[error("Parse error: {message}")]
    Parse { message: String, line: Option<usize>, col: Option<usize> },
    #[error("Specification error: {0}")]
    Specification(String),
    #[error("Evaluation error: {0}")]
    Evaluation(String),
}

pub type Result<T> = std::result::Result<T, MonitorError>;

// Helper conversions
impl From<std::io::Error> for MonitorError {
    fn from(e: std::io::Error) -> Self { Self::Transport(e.to_string()) }
}
impl From<config::ConfigError> for MonitorError {
    fn from(e: config::ConfigError) -> Self { Self::Config(e.to_string()) }
}
