use async_trait::async_trait;
use ircbot_engine::{Bot, ControlMessage, IncomingCommand, IncomingMessage, Irc};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::time::Duration;

/// What a [`RecordingBot`] has seen
#[derive(Default)]
pub struct Record
{
    pub connects: Mutex<usize>,
    pub quits: Mutex<usize>,
    pub messages: Mutex<Vec<IncomingMessage>>,
    pub nonmessages: Mutex<Vec<IncomingCommand>>,
    pub irc: Mutex<Option<Irc>>,
}

impl Record
{
    /// The facade from the most recent connection
    pub fn irc(&self) -> Irc
    {
        self.irc.lock().clone().expect("bot has not connected")
    }
}

/// Records every hook call. Replies to `echo <text>` with a bot response.
#[derive(Clone, Default)]
pub struct RecordingBot
{
    pub record: Arc<Record>,
}

#[async_trait]
impl Bot for RecordingBot
{
    async fn on_connect(&self, irc: &Irc)
    {
        *self.record.connects.lock() += 1;
        *self.record.irc.lock() = Some(irc.clone());
    }

    async fn on_quit(&self, _irc: &Irc)
    {
        *self.record.quits.lock() += 1;
    }

    async fn handle_message(&self, message: IncomingMessage, irc: &Irc)
    {
        if let Some(text) = message.text.strip_prefix(b"echo ")
        {
            irc.bot_response(&message.channel, text).await.unwrap();
        }
        self.record.messages.lock().push(message);
    }

    async fn handle_nonmessage(&self, command: IncomingCommand, _irc: &Irc)
    {
        self.record.nonmessages.lock().push(command);
    }
}

/// Takes `delay` to finish its connect hook
pub struct SlowBot
{
    pub delay: Duration,
}

#[async_trait]
impl Bot for SlowBot
{
    async fn on_connect(&self, _irc: &Irc)
    {
        tokio::time::sleep(self.delay).await;
    }
}

/// On connect, asks the engine's timer service to send `line` after `delay`
pub struct TimerBot
{
    pub delay: Duration,
    pub line: String,
}

#[async_trait]
impl Bot for TimerBot
{
    async fn on_connect(&self, irc: &Irc)
    {
        let nick = String::from_utf8_lossy(&irc.get_nick().await).into_owned();

        irc.timers().reschedule(
            format!("{}/announce", nick),
            self.delay,
            irc.control_channel(),
            ControlMessage::SendLine(self.line.clone()),
        );
    }
}
