use fsbot_common::FromMessage;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed or unusable structure input.
    #[error("{message}")]
    Parse { message: String },

    /// Writing, compressing or finalizing an archive failed.
    #[error("{message}")]
    Archive { message: String },

    #[error("{message}")]
    Pdf { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Join(#[from] tokio::task::JoinError),

    #[error("{message}")]
    Message { message: String },
}

impl Error {
    #[must_use]
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn archive(message: impl Into<String>) -> Self {
        Self::Archive {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn pdf(message: impl Into<String>) -> Self {
        Self::Pdf {
            message: message.into(),
        }
    }

    /// Whether this error came from the input rather than from the host.
    #[must_use]
    pub fn is_parse(&self) -> bool {
        matches!(self, Self::Parse { .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::parse(err.to_string())
    }
}

impl FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message { message }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

fsbot_common::impl_context!();
