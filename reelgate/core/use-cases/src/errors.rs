use ::domain::AdKind;
use ::domain::ItemId;

/// Failure of a call to the balance, unlock or like backend.
#[derive(Debug, ::thiserror::Error)]
pub enum BackendError {
    /// The backend answered with a non-success envelope.
    #[error("{message}")]
    Rejected { status: i64, message: String },

    #[error("backend unreachable: {0}")]
    Transport(#[from] ::anyhow::Error),
}

impl BackendError {
    pub fn rejected(status: i64, message: impl Into<String>) -> Self {
        Self::Rejected { status, message: message.into() }
    }

    /// Text shown to the user in an alert.
    pub fn user_message(&self) -> String {
        match self {
            Self::Rejected { message, .. } => message.clone(),
            Self::Transport(_) => "Network error, please try again".to_owned(),
        }
    }
}

#[derive(Debug, ::thiserror::Error)]
pub enum MonetizationError {
    #[error("item {0} is not in the feed")]
    UnknownItem(ItemId),

    #[error("item {0} is already unlocked")]
    NotLocked(ItemId),

    #[error("item {0} cannot be unlocked with coins")]
    NotCoinGated(ItemId),

    #[error("{0} ads need a target")]
    MissingTarget(AdKind),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("failed to persist ad quota: {0}")]
    Storage(::anyhow::Error),
}

impl MonetizationError {
    /// Text shown to the user in an alert.
    pub fn user_message(&self) -> String {
        match self {
            Self::Backend(error) => error.user_message(),
            error => error.to_string(),
        }
    }
}

#[derive(Debug, ::thiserror::Error)]
pub enum LikeError {
    #[error("item {0} is not in the feed")]
    UnknownItem(ItemId),

    #[error(transparent)]
    Backend(#[from] BackendError),
}
