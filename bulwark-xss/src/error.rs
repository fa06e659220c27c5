use thiserror::Error;

#[derive(Error, Debug)]
pub enum XssError {
    #[error("Invalid custom pattern #{index} '{pattern}': {source}")]
    InvalidPattern {
        index: usize,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Custom pattern #{index} is {len} bytes, maximum is {max}")]
    PatternTooLong { index: usize, len: usize, max: usize },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl XssError {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }
}

pub type XssResult<T> = std::result::Result<T, XssError>;
