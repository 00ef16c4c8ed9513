use crate::{
    channel::Sender,
    error::{EngineError, Result},
    line,
    messages::{ControlMessage, LogEvent},
    rate_limit::RateLimiter,
    timer::TimerService,
    utils::OrLog,
};

use std::collections::BTreeSet;
use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    sync::Mutex,
};

pub(crate) type Writer = Box<dyn AsyncWrite + Send + Unpin>;

/// Connection state shared between an engine task, the [`Irc`](crate::Irc)
/// objects handed to bot logic, and the operator's
/// [`EngineHandle`](crate::EngineHandle).
///
/// Every field that can change has its own lock. The state locks are tokio
/// mutexes because the socket write that goes with a state change happens
/// while they are held; the rate limiter's wait never does.
pub(crate) struct Shared
{
    pub label: String,
    pub control: Sender<ControlMessage>,
    pub log: Sender<LogEvent>,
    pub timers: TimerService,
    pub limiter: RateLimiter,

    writer: Mutex<Option<Writer>>,

    pub nick: Mutex<Vec<u8>>,
    pub channels: Mutex<BTreeSet<Vec<u8>>>,
}

impl Shared
{
    pub fn new(
        label: String,
        control: Sender<ControlMessage>,
        log: Sender<LogEvent>,
        timers: TimerService,
    ) -> Self
    {
        Self {
            label,
            control,
            log,
            timers,
            limiter: RateLimiter::default(),
            writer: Mutex::new(None),
            nick: Mutex::new(Vec::new()),
            channels: Mutex::new(BTreeSet::new()),
        }
    }

    pub fn log(&self, event: LogEvent)
    {
        self.log.send(event).or_log("sending log event");
    }

    pub fn error(&self, message: impl Into<String>)
    {
        self.log(LogEvent::InternalError(message.into()));
    }

    /// Queue a shutdown: tell the engine to quit, tell the log sink we are
    /// going, and stop the timer service.
    pub fn quit(&self)
    {
        self.control
            .send(ControlMessage::Quit)
            .or_log("sending quit to engine");
        self.log(LogEvent::InternalQuit);
        self.timers.quit();
    }

    /// Send a line, waiting for a rate-limited slot first.
    ///
    /// CR and LF are stripped and the line truncated before sending.
    pub async fn send_line_raw(&self, line: &[u8]) -> Result<()>
    {
        self.limiter.wait_turn().await;
        self.write_line(line).await
    }

    /// Write a line immediately. Callers must already have waited for a slot
    /// from the rate limiter.
    pub async fn write_line(&self, line: &[u8]) -> Result<()>
    {
        let line = line::sanitize(line);

        {
            let mut writer = self.writer.lock().await;
            let writer = writer.as_mut().ok_or(EngineError::NotConnected)?;

            writer.write_all(&line::frame(&line)).await?;
            writer.flush().await?;
        }

        if !line::is_liveness(&line)
        {
            self.log(LogEvent::SentLine(
                String::from_utf8_lossy(&line).into_owned(),
            ));
        }

        Ok(())
    }

    /// Install the write half of a newly opened connection
    pub async fn attach(&self, writer: Writer)
    {
        *self.writer.lock().await = Some(writer);
    }

    /// Close and forget the current connection's write half, if any
    pub async fn detach(&self)
    {
        if let Some(mut writer) = self.writer.lock().await.take()
        {
            if let Err(e) = writer.shutdown().await
            {
                tracing::debug!(error = %e, "Error closing connection");
            }
        }
    }
}
