use crate::{
    engine::{EngineState, Shared},
    error::Result,
    messages::{ControlMessage, LogEvent},
};

use std::sync::Arc;
use tokio::sync::watch;

/// Outside control of a running [`Engine`](crate::Engine), for the operator
/// console or whatever else owns the process.
#[derive(Clone)]
pub struct EngineHandle
{
    shared: Arc<Shared>,
    state: watch::Receiver<EngineState>,
}

impl EngineHandle
{
    pub(crate) fn new(shared: Arc<Shared>, state: watch::Receiver<EngineState>) -> Self
    {
        Self { shared, state }
    }

    /// Shut down completely: the engine quits, the log sink is told, and the
    /// timer service stops.
    pub fn quit(&self)
    {
        self.shared.quit();
    }

    /// Drop the current connection and open a new one
    pub fn reconnect(&self) -> Result<()>
    {
        Ok(self.shared.control.send(ControlMessage::Reconnect)?)
    }

    /// Send a line to the server. The command word will be uppercased.
    pub fn send_line(&self, text: impl Into<String>) -> Result<()>
    {
        Ok(self
            .shared
            .control
            .send(ControlMessage::SendLine(text.into()))?)
    }

    /// Pass an event to the log sink
    pub fn log(&self, event: LogEvent)
    {
        self.shared.log(event);
    }

    /// What the engine is doing right now
    pub fn state(&self) -> EngineState
    {
        *self.state.borrow()
    }

    /// Follow the engine's state changes
    pub fn subscribe(&self) -> watch::Receiver<EngineState>
    {
        self.state.clone()
    }
}

impl std::fmt::Debug for EngineHandle
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        f.debug_struct("EngineHandle")
            .field("server", &self.shared.label)
            .field("state", &self.state())
            .finish()
    }
}
