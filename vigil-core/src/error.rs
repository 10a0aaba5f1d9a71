use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Unknown channel: {0}")]
    UnknownChannel(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
