/// Core error type for the bot.
///
/// Adapter crates should map their specific errors into this type so startup
/// and transport failures are reported consistently.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The message to edit was deleted or can no longer be edited.
    #[error("message gone: {0}")]
    MessageGone(String),

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;
