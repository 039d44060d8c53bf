use thiserror::Error as ThisError;

///
/// TextError
///

#[derive(Debug, ThisError)]
pub enum TextError {
    #[error("store error: {0}")]
    Store(#[from] rowseq::Error),

    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("model serialization error: {0}")]
    Model(#[from] serde_json::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid caller input, e.g. a vectorizer kind with no embedding table.
    #[error("{message}")]
    Input { message: String },
}

impl TextError {
    pub(crate) fn input(message: impl Into<String>) -> Self {
        Self::Input {
            message: message.into(),
        }
    }
}
