use async_trait::async_trait;
use ircbot_engine::{Bot, IncomingMessage, Irc, OrLog};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Settings
{
    prefix: String,
}

impl Default for Settings
{
    fn default() -> Self
    {
        Self {
            prefix: "!".to_string(),
        }
    }
}

/// Answers `!ping` with `pong`, and does nothing else.
///
/// The command prefix can be changed with `bot.prefix` in the config file.
#[derive(Debug)]
pub struct PingBot
{
    ping: Vec<u8>,
}

impl Default for PingBot
{
    fn default() -> Self
    {
        Self::with_prefix(&Settings::default().prefix)
    }
}

impl PingBot
{
    fn with_prefix(prefix: &str) -> Self
    {
        Self {
            ping: [prefix.as_bytes(), b"ping"].concat(),
        }
    }

    fn is_ping(&self, text: &[u8]) -> bool
    {
        text == self.ping.as_slice()
    }
}

#[async_trait]
impl Bot for PingBot
{
    fn initialize(&mut self, settings: &serde_json::Value) -> anyhow::Result<()>
    {
        if !settings.is_null()
        {
            let settings = Settings::deserialize(settings)?;
            *self = Self::with_prefix(&settings.prefix);
        }
        Ok(())
    }

    async fn on_connect(&self, irc: &Irc)
    {
        irc.log(format!(
            "Connected as {}",
            String::from_utf8_lossy(&irc.get_nick().await)
        ));
    }

    async fn on_quit(&self, irc: &Irc)
    {
        irc.log("Quitting");
    }

    async fn handle_message(&self, message: IncomingMessage, irc: &Irc)
    {
        if self.is_ping(&message.text)
        {
            irc.bot_response(&message.channel, "pong")
                .await
                .or_log("answering ping");
        }
    }
}
