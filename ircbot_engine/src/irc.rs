use crate::{
    channel::Sender,
    engine::Shared,
    error::Result,
    messages::{ControlMessage, LogEvent},
    timer::TimerService,
};

use std::{collections::BTreeSet, sync::Arc};

/// Prepended to bot responses so that other bots know to ignore them
const ZERO_WIDTH_SPACE: &str = "\u{200b}";

/// The bot's view of a connection.
///
/// Passed to every [`Bot`](crate::Bot) hook, and safe to clone and use from
/// other tasks. Operations that change the tracked nick or channel set send the
/// matching command and update the local state under one lock, so a reader
/// never sees one without the other. Readers get a copy of the state, never a
/// live reference.
///
/// All strings are raw bytes; nothing here interprets character sets.
#[derive(Clone)]
pub struct Irc
{
    shared: Arc<Shared>,
}

impl Irc
{
    pub(crate) fn new(shared: Arc<Shared>) -> Self
    {
        Self { shared }
    }

    /// Send a raw line. The terminator is added, and any embedded line breaks
    /// removed, automatically.
    pub async fn send_raw(&self, line: impl AsRef<[u8]>) -> Result<()>
    {
        self.shared.send_line_raw(line.as_ref()).await
    }

    /// Send a PRIVMSG
    pub async fn msg(&self, recipient: impl AsRef<[u8]>, message: impl AsRef<[u8]>) -> Result<()>
    {
        let line = [b"PRIVMSG ".as_slice(), recipient.as_ref(), b" :", message.as_ref()].concat();
        self.shared.send_line_raw(&line).await
    }

    /// Send a PRIVMSG marked as coming from a bot
    pub async fn bot_response(
        &self,
        recipient: impl AsRef<[u8]>,
        message: impl AsRef<[u8]>,
    ) -> Result<()>
    {
        let text = [ZERO_WIDTH_SPACE.as_bytes(), message.as_ref()].concat();
        self.msg(recipient, text).await
    }

    /// Change nick, and record the new one as current
    pub async fn nick(&self, nick: impl AsRef<[u8]>) -> Result<()>
    {
        let nick = nick.as_ref();
        let line = [b"NICK ".as_slice(), nick].concat();

        self.shared.limiter.wait_turn().await;

        let mut current = self.shared.nick.lock().await;
        self.shared.write_line(&line).await?;
        *current = nick.to_vec();

        Ok(())
    }

    /// The nick we last asked for
    pub async fn get_nick(&self) -> Vec<u8>
    {
        self.shared.nick.lock().await.clone()
    }

    /// Record a nick change without sending anything, for instance after the
    /// server has forced one on us
    pub async fn set_nick(&self, nick: impl AsRef<[u8]>)
    {
        *self.shared.nick.lock().await = nick.as_ref().to_vec();
    }

    /// Join a channel, and record it as joined
    pub async fn join(&self, channel: impl AsRef<[u8]>) -> Result<()>
    {
        let channel = channel.as_ref();
        let line = [b"JOIN ".as_slice(), channel].concat();

        self.shared.limiter.wait_turn().await;

        let mut channels = self.shared.channels.lock().await;
        self.shared.write_line(&line).await?;
        channels.insert(channel.to_vec());

        Ok(())
    }

    /// Leave a channel, and stop recording it as joined
    pub async fn part(&self, channel: impl AsRef<[u8]>, reason: impl AsRef<[u8]>) -> Result<()>
    {
        let channel = channel.as_ref();
        let line = [b"PART ".as_slice(), channel, b" :", reason.as_ref()].concat();

        self.shared.limiter.wait_turn().await;

        let mut channels = self.shared.channels.lock().await;
        self.shared.write_line(&line).await?;
        channels.remove(channel);

        Ok(())
    }

    /// The channels we have joined and not parted
    pub async fn get_channels(&self) -> BTreeSet<Vec<u8>>
    {
        self.shared.channels.lock().await.clone()
    }

    /// Replace the recorded channel set without sending anything
    pub async fn set_channels(&self, channels: BTreeSet<Vec<u8>>)
    {
        *self.shared.channels.lock().await = channels;
    }

    /// Shut the bot down.
    ///
    /// The engine finishes whatever it is doing, calls [`Bot::on_quit`](crate::Bot::on_quit),
    /// and disconnects.
    pub fn quit(&self)
    {
        self.shared.quit();
    }

    /// Log a status message
    pub fn log(&self, status: impl Into<String>)
    {
        self.shared.log(LogEvent::Status(status.into()));
    }

    /// Log an error
    pub fn error(&self, message: impl Into<String>)
    {
        self.shared.error(message);
    }

    /// The timer service, for bots that want to schedule their own work
    pub fn timers(&self) -> &TimerService
    {
        &self.shared.timers
    }

    /// The engine's control channel, usable as a timer target
    pub fn control_channel(&self) -> &Sender<ControlMessage>
    {
        &self.shared.control
    }
}

impl std::fmt::Debug for Irc
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        f.debug_struct("Irc")
            .field("server", &self.shared.label)
            .finish()
    }
}
