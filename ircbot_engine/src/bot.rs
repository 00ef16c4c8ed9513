use crate::Irc;

use async_trait::async_trait;

/// A PRIVMSG addressed to us or to a channel we are in.
///
/// All fields are raw bytes as they came off the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage
{
    /// The sender's prefix, without the leading ':'
    pub prefix: Vec<u8>,
    /// Message body
    pub text: Vec<u8>,
    /// The sender's nick
    pub nick: Vec<u8>,
    /// Where a reply should go: the channel, or the sender for a private
    /// message
    pub channel: Vec<u8>,
}

/// Any other line from the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingCommand
{
    /// The prefix without the leading ':', if there was one
    pub prefix: Option<Vec<u8>>,
    /// The command word or numeric
    pub command: Vec<u8>,
    /// Arguments, with any trailing ':'-argument as the last element
    pub args: Vec<Vec<u8>>,
}

/// Bot logic driven by an [`Engine`](crate::Engine).
///
/// Every async hook is awaited inline by the engine task, so while a hook runs
/// the engine reads nothing further from the server and answers no PINGs.
/// Hooks therefore see protocol state that cannot change underneath them, at
/// the cost of stalling the connection if they take too long.
///
/// The [`Irc`] passed to each hook is the only way to act on the connection.
#[async_trait]
pub trait Bot: Send + Sync + 'static
{
    /// Called once at startup, before any connection is attempted.
    ///
    /// `settings` is the free-form bot section of the configuration file.
    fn initialize(&mut self, _settings: &serde_json::Value) -> anyhow::Result<()>
    {
        Ok(())
    }

    /// Called after USER and NICK have been sent on each new connection, before
    /// the configured channels are joined.
    async fn on_connect(&self, _irc: &Irc) {}

    /// Called just before a deliberate QUIT.
    async fn on_quit(&self, _irc: &Irc) {}

    /// Called for each PRIVMSG.
    async fn handle_message(&self, _message: IncomingMessage, _irc: &Irc) {}

    /// Called for every other line except PINGs and PONGs.
    async fn handle_nonmessage(&self, _command: IncomingCommand, _irc: &Irc) {}
}
