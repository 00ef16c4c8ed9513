//! Writes the engine's log events out through `tracing`.

use ircbot_engine::{channel::Receiver, LogEvent};

/// Tracing target for rendered log events, so they can be routed to their
/// own log file
pub const WIRE_TARGET: &str = "ircbot::wire";

pub fn render(event: &LogEvent) -> String
{
    match event
    {
        LogEvent::SentLine(line) => format!(">{}", line),
        LogEvent::ReceivedLine(line) => format!("<{}", line),
        LogEvent::InternalQuit => "--- Quit".to_string(),
        LogEvent::InternalError(message) => format!("--- Error {}", message),
        LogEvent::Status(status) => format!("* {}", status),
    }
}

/// Decides which events are shown.
///
/// A shutdown is announced by whoever asks for it and again by the engine as
/// it stops; only the first announcement is shown.
#[derive(Debug, Default)]
pub struct LogSink
{
    quit_seen: bool,
}

impl LogSink
{
    /// The rendered form of `event`, or `None` if it should not be shown
    pub fn accept(&mut self, event: &LogEvent) -> Option<String>
    {
        if *event == LogEvent::InternalQuit
        {
            if self.quit_seen
            {
                return None;
            }
            self.quit_seen = true;
        }

        Some(render(event))
    }
}

/// Consume log events until every sender has gone
pub async fn run(mut events: Receiver<LogEvent>)
{
    let mut sink = LogSink::default();

    while let Some(event) = events.recv().await
    {
        if let Some(line) = sink.accept(&event)
        {
            tracing::info!(target: WIRE_TARGET, "{}", line);
        }
    }
}
