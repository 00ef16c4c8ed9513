/// A command for a running engine.
///
/// Produced by the operator handle, the bot-facing [`Irc`](crate::Irc) object,
/// the timer service, or the engine itself, and consumed once by the engine's
/// event loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlMessage
{
    /// Shut the engine down for good
    Quit,
    /// Send a line to the server; the command word is uppercased first
    SendLine(String),
    /// The connection has been idle; check it is still alive
    Ping,
    /// Nothing came back after a liveness check
    PingTimeout,
    /// Drop the current connection and start another
    Reconnect,
}

/// Something worth telling the log sink about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEvent
{
    /// A line was written to the server
    SentLine(String),
    /// A line was received from the server
    ReceivedLine(String),
    /// The engine is shutting down
    InternalQuit,
    /// Something went wrong
    InternalError(String),
    /// A status message from bot logic
    Status(String),
}
