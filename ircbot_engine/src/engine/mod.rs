//! The per-connection state machine.
//!
//! ```text
//! Connecting -> Handshaking -> Running -> Reconnecting -> Connecting ...
//!      |                          |
//!      | (quit while waiting)     +-> Quitting -> Stopped
//!      +---------------------------------------> Stopped
//! ```

use crate::{
    bot::Bot,
    channel::{channel, Receiver, Sender},
    config::ServerConfig,
    connector::{Connector, TcpConnector},
    dispatch,
    error::Result,
    handle::EngineHandle,
    line::{self, Inbound},
    messages::{ControlMessage, LogEvent},
    reconnect::{self, ReconnectStrategy, DEFAULT_RECONNECT_DELAY},
    timer::{TimerKey, TimerService},
    Irc,
};

use backoff::backoff::Backoff;
use std::{collections::VecDeque, sync::Arc};
use tokio::{
    io::{AsyncRead, AsyncReadExt},
    select,
    sync::watch,
    time::Duration,
};

mod shared;
pub(crate) use shared::Shared;

/// How long the connection may sit idle before we check on it
pub const PING_INTERVAL: Duration = Duration::from_secs(3 * 60);
/// How long to wait for any traffic after checking on an idle connection
pub const PING_TIMEOUT: Duration = Duration::from_secs(2 * 60);

const PING_LINE: &[u8] = b"PING :keepalive";
const READ_CHUNK_SIZE: usize = 1024;
/// Receive buffer size beyond which a line is assumed never to end
const MAX_RECEIVE_BUFFER: usize = 64 * 1024;

/// Where an engine is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState
{
    Connecting,
    Handshaking,
    Running,
    Reconnecting,
    Quitting,
    /// Terminal; the engine task has finished or is about to
    Stopped,
}

/// How a connection came to an end
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome
{
    Reconnect,
    Quit,
}

struct TimerKeys
{
    ping: TimerKey,
    ping_timeout: TimerKey,
    reconnect: TimerKey,
}

/// Owns one server connection at a time, for as long as the bot runs.
///
/// Build one with [`Engine::new`], then spawn [`Engine::run`]. The returned
/// [`EngineHandle`] can ask it to reconnect or quit from outside.
pub struct Engine<B, C = TcpConnector>
{
    config: ServerConfig,
    bot: B,
    connector: C,
    reconnect: ReconnectStrategy,

    shared: Arc<Shared>,
    irc: Irc,
    control: Receiver<ControlMessage>,
    // Lines the operator asked for while a connection was being replaced
    deferred: VecDeque<ControlMessage>,

    keys: TimerKeys,
    state: watch::Sender<EngineState>,
}

impl<B: Bot> Engine<B>
{
    pub fn new(
        config: ServerConfig,
        bot: B,
        timers: TimerService,
        log: Sender<LogEvent>,
    ) -> (Self, EngineHandle)
    {
        let label = config.label();
        let (control_send, control_recv) = channel();
        let (state_send, state_recv) = watch::channel(EngineState::Connecting);

        let shared = Arc::new(Shared::new(label.clone(), control_send, log, timers));
        let handle = EngineHandle::new(Arc::clone(&shared), state_recv);

        let engine = Self {
            config,
            bot,
            connector: TcpConnector,
            reconnect: reconnect::fixed(DEFAULT_RECONNECT_DELAY),
            irc: Irc::new(Arc::clone(&shared)),
            shared,
            control: control_recv,
            deferred: VecDeque::new(),
            keys: TimerKeys {
                ping: TimerKey::scoped(&label, "ping"),
                ping_timeout: TimerKey::scoped(&label, "ping-timeout"),
                reconnect: TimerKey::scoped(&label, "reconnect-backoff"),
            },
            state: state_send,
        };

        (engine, handle)
    }
}

impl<B: Bot, C: Connector> Engine<B, C>
{
    /// Open connections with `connector` instead of plain TCP
    pub fn with_connector<C2: Connector>(self, connector: C2) -> Engine<B, C2>
    {
        Engine {
            config: self.config,
            bot: self.bot,
            connector,
            reconnect: self.reconnect,
            shared: self.shared,
            irc: self.irc,
            control: self.control,
            deferred: self.deferred,
            keys: self.keys,
            state: self.state,
        }
    }

    /// Choose how long to wait after a failed connection attempt
    pub fn with_reconnect_strategy(mut self, strategy: ReconnectStrategy) -> Self
    {
        self.reconnect = strategy;
        self
    }

    /// Run until told to quit.
    ///
    /// Connection failures of any kind lead to a reconnect, never to this
    /// returning.
    pub async fn run(mut self)
    {
        loop
        {
            self.set_state(EngineState::Connecting);

            let connected = self
                .connector
                .connect(&self.config.host, self.config.port)
                .await;

            let stream = match connected {
                Ok(stream) => {
                    self.reconnect.reset();
                    stream
                }
                Err(e) => {
                    self.shared.error(format!(
                        "Can't connect to {}:{}: {}",
                        self.config.host, self.config.port, e
                    ));

                    if self.wait_to_retry().await
                    {
                        continue;
                    }
                    else
                    {
                        break;
                    }
                }
            };

            let (reader, writer) = tokio::io::split(stream);
            self.shared.attach(Box::new(writer)).await;

            let outcome = match self.run_connection(reader).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    self.shared.error(format!("Connection failed: {}", e));
                    Outcome::Reconnect
                }
            };

            self.shared.timers.delete(self.keys.ping.clone());
            self.shared.timers.delete(self.keys.ping_timeout.clone());

            match outcome
            {
                Outcome::Reconnect => {
                    if !self.reconnecting().await
                    {
                        break;
                    }
                }
                Outcome::Quit => {
                    self.quitting().await;
                    break;
                }
            }
        }

        self.shared.log(LogEvent::InternalQuit);
        self.shared.timers.quit();
        self.set_state(EngineState::Stopped);
    }

    #[tracing::instrument(skip_all, fields(server = %self.shared.label))]
    async fn run_connection<R>(&mut self, reader: R) -> Result<Outcome>
    where
        R: AsyncRead + Unpin,
    {
        self.set_state(EngineState::Handshaking);
        self.handshake().await?;

        self.set_state(EngineState::Running);
        self.event_loop(reader).await
    }

    async fn handshake(&self) -> Result<()>
    {
        // A fresh connection has joined nothing yet
        self.irc.set_channels(Default::default()).await;

        let user = format!(
            "USER {} a a :{}",
            self.config.username, self.config.realname
        );
        self.shared.send_line_raw(user.as_bytes()).await?;

        self.irc.nick(&self.config.nick).await?;

        self.bot.on_connect(&self.irc).await;

        for channel in &self.config.channels
        {
            self.irc.join(channel).await?;
        }

        self.arm_idle_ping();

        Ok(())
    }

    async fn event_loop<R>(&mut self, mut reader: R) -> Result<Outcome>
    where
        R: AsyncRead + Unpin,
    {
        while let Some(message) = self.deferred.pop_front()
        {
            if let Some(outcome) = self.handle_control(message).await?
            {
                return Ok(outcome);
            }
        }

        let mut buffer = Vec::new();
        let mut chunk = [0u8; READ_CHUNK_SIZE];

        loop
        {
            select!
            {
                read = reader.read(&mut chunk) => {
                    let len = read?;

                    if len == 0
                    {
                        self.shared.error("Empty read");
                        return Ok(Outcome::Reconnect);
                    }

                    buffer.extend_from_slice(&chunk[..len]);

                    while let Some(received) = line::take_line(&mut buffer)
                    {
                        self.handle_line(&received).await?;
                    }

                    if buffer.len() > MAX_RECEIVE_BUFFER
                    {
                        self.shared.error(format!(
                            "Receive buffer overflow; discarding {} bytes",
                            buffer.len()
                        ));
                        buffer.clear();
                    }

                    // Any traffic at all shows the connection is alive
                    self.shared.timers.delete(self.keys.ping_timeout.clone());
                    self.arm_idle_ping();
                }
                control = self.control.recv() => {
                    let Some(message) = control else {
                        return Ok(Outcome::Quit);
                    };

                    if let Some(outcome) = self.handle_control(message).await?
                    {
                        return Ok(outcome);
                    }
                }
            }
        }
    }

    async fn handle_line(&self, received: &[u8]) -> Result<()>
    {
        match line::classify(received)
        {
            Inbound::Ping(args) => {
                let pong = [b"PONG ".as_slice(), args].concat();
                self.shared.send_line_raw(&pong).await?;
            }
            Inbound::Pong => {}
            Inbound::Other => {
                self.shared.log(LogEvent::ReceivedLine(
                    String::from_utf8_lossy(received).into_owned(),
                ));
                dispatch::dispatch_line(&self.bot, received, &self.irc).await;
            }
        }

        Ok(())
    }

    async fn handle_control(&self, message: ControlMessage) -> Result<Option<Outcome>>
    {
        tracing::trace!(?message, "Control message");

        match message
        {
            ControlMessage::Quit => Ok(Some(Outcome::Quit)),
            ControlMessage::SendLine(text) => {
                self.shared
                    .send_line_raw(&line::normalize_command(&text))
                    .await?;
                Ok(None)
            }
            ControlMessage::Ping => {
                self.shared.send_line_raw(PING_LINE).await?;
                self.shared.timers.reschedule(
                    self.keys.ping_timeout.clone(),
                    PING_TIMEOUT,
                    &self.shared.control,
                    ControlMessage::PingTimeout,
                );
                Ok(None)
            }
            ControlMessage::PingTimeout => {
                self.shared.error("Ping timeout");
                Ok(Some(Outcome::Reconnect))
            }
            ControlMessage::Reconnect => Ok(Some(Outcome::Reconnect)),
        }
    }

    /// Leave the current connection on the way to a new one.
    ///
    /// Returns `false` if a quit request turned up in the meantime.
    async fn reconnecting(&mut self) -> bool
    {
        self.set_state(EngineState::Reconnecting);

        if let Err(e) = self.shared.send_line_raw(b"QUIT :Reconnecting").await
        {
            tracing::warn!(error = %e, "Couldn't send QUIT before reconnecting");
        }
        self.shared.detach().await;

        !self.absorb_stale_control()
    }

    async fn quitting(&mut self)
    {
        self.set_state(EngineState::Quitting);

        self.bot.on_quit(&self.irc).await;

        let farewell = format!("QUIT :{} exiting normally", self.config.username);
        if let Err(e) = self.shared.send_line_raw(farewell.as_bytes()).await
        {
            tracing::warn!(error = %e, "Couldn't send QUIT");
        }
        self.shared.detach().await;
    }

    /// Wait out the retry delay after a failed connect, while still answering
    /// the control channel.
    ///
    /// Returns `true` to try again, `false` to quit.
    async fn wait_to_retry(&mut self) -> bool
    {
        let delay = self
            .reconnect
            .next_backoff()
            .unwrap_or(DEFAULT_RECONNECT_DELAY);

        tracing::debug!(server = %self.shared.label, ?delay, "Scheduling reconnect");
        self.shared.timers.reschedule(
            self.keys.reconnect.clone(),
            delay,
            &self.shared.control,
            ControlMessage::Reconnect,
        );

        let retry = loop {
            match self.control.recv().await
            {
                Some(ControlMessage::Reconnect) => break true,
                Some(ControlMessage::Quit) | None => break false,
                Some(stale @ (ControlMessage::Ping | ControlMessage::PingTimeout)) => {
                    tracing::debug!(message = ?stale, "Ignoring liveness check while disconnected");
                }
                Some(other) => {
                    self.shared.error(format!(
                        "Control message not supported when not connected: {:?}",
                        other
                    ));
                }
            }
        };

        // A manual reconnect or quit leaves the scheduled one behind
        self.shared.timers.delete(self.keys.reconnect.clone());

        retry
    }

    /// Clear out control messages that were aimed at the connection we just
    /// left. Outgoing lines are kept for the next connection.
    ///
    /// Returns `true` if a quit request was found.
    fn absorb_stale_control(&mut self) -> bool
    {
        loop
        {
            match self.control.try_recv()
            {
                Ok(None) => return false,
                Ok(Some(ControlMessage::Quit)) | Err(_) => return true,
                Ok(Some(message @ ControlMessage::SendLine(_))) => {
                    self.deferred.push_back(message);
                }
                Ok(Some(stale)) => {
                    tracing::debug!(message = ?stale, "Discarding stale control message");
                }
            }
        }
    }

    fn arm_idle_ping(&self)
    {
        self.shared.timers.reschedule(
            self.keys.ping.clone(),
            PING_INTERVAL,
            &self.shared.control,
            ControlMessage::Ping,
        );
    }

    fn set_state(&self, state: EngineState)
    {
        tracing::debug!(server = %self.shared.label, ?state, "Engine state change");
        self.state.send_replace(state);
    }
}
