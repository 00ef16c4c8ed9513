//! Typed, unbounded message channels between tasks and threads.
//!
//! A [`Receiver`]'s `recv()` future can be raced against socket readiness in a
//! single `select!`, which is how the engine waits on "socket readable or
//! control message pending" at once.

use thiserror::Error;
use tokio::sync::mpsc::{
    error::TryRecvError, unbounded_channel, UnboundedReceiver, UnboundedSender,
};

/// The other end of a channel has gone away.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("Channel closed")]
pub struct ChannelClosed;

/// Create a connected sender/receiver pair.
pub fn channel<T>() -> (Sender<T>, Receiver<T>)
{
    let (send, recv) = unbounded_channel();
    (Sender(send), Receiver(recv))
}

/// Sending half of a channel. Cheap to clone; every clone feeds the same
/// receiver.
#[derive(Debug)]
pub struct Sender<T>(UnboundedSender<T>);

impl<T> Clone for Sender<T>
{
    fn clone(&self) -> Self
    {
        Self(self.0.clone())
    }
}

impl<T> Sender<T>
{
    /// Enqueue a message. Never waits for the receiver.
    pub fn send(&self, message: T) -> Result<(), ChannelClosed>
    {
        self.0.send(message).map_err(|_| ChannelClosed)
    }

    /// Whether the receiving half has been dropped
    pub fn is_closed(&self) -> bool
    {
        self.0.is_closed()
    }
}

/// Receiving half of a channel.
#[derive(Debug)]
pub struct Receiver<T>(UnboundedReceiver<T>);

impl<T> Receiver<T>
{
    /// Wait for the oldest unread message.
    ///
    /// Returns `None` once every sender has been dropped and the queue is
    /// drained. Cancel-safe, so it may be used as a `select!` branch.
    pub async fn recv(&mut self) -> Option<T>
    {
        self.0.recv().await
    }

    /// Take the oldest unread message if there is one, without waiting.
    pub fn try_recv(&mut self) -> Result<Option<T>, ChannelClosed>
    {
        match self.0.try_recv()
        {
            Ok(message) => Ok(Some(message)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(ChannelClosed),
        }
    }

    /// Block the current thread until a message arrives.
    ///
    /// For consumers running outside the async runtime. Panics if called from
    /// within an async context.
    pub fn blocking_recv(&mut self) -> Option<T>
    {
        self.0.blocking_recv()
    }
}
