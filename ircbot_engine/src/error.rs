use thiserror::Error;

/// An error that might occur while talking to the server, or while commanding
/// an engine.
#[derive(Debug, Error)]
pub enum EngineError
{
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Not connected")]
    NotConnected,
    #[error("Engine has shut down")]
    Shutdown,
}

pub type Result<T> = std::result::Result<T, EngineError>;

impl From<crate::channel::ChannelClosed> for EngineError
{
    fn from(_: crate::channel::ChannelClosed) -> Self
    {
        Self::Shutdown
    }
}
