//! A single background scheduler for keyed, one-shot timers.
//!
//! Each timer is identified by a [`TimerKey`]. Scheduling a key that is
//! already pending replaces the earlier entry rather than adding a second one,
//! so "push the idle deadline back on every read" never accumulates timers.

use crate::channel::{channel, Receiver, Sender};

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use tokio::{
    select,
    task::JoinHandle,
    time::{self, Duration, Instant},
};

/// Identifies a logical timer
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerKey(String);

impl TimerKey
{
    pub fn new(name: impl Into<String>) -> Self
    {
        Self(name.into())
    }

    /// A key namespaced under `scope`, so that independent users of one
    /// timer service can pick the same short names.
    pub fn scoped(scope: &str, name: &str) -> Self
    {
        Self(format!("{}/{}", scope, name))
    }
}

impl From<&str> for TimerKey
{
    fn from(name: &str) -> Self
    {
        Self::new(name)
    }
}

impl From<String> for TimerKey
{
    fn from(name: String) -> Self
    {
        Self(name)
    }
}

impl fmt::Display for TimerKey
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.write_str(&self.0)
    }
}

type Delivery = Box<dyn FnOnce() + Send>;

enum TimerRequest
{
    Reschedule {
        key: TimerKey,
        deadline: Instant,
        deliver: Delivery,
    },
    Delete(TimerKey),
    Quit,
}

/// Handle to the timer service. Clones all talk to the same scheduler.
#[derive(Clone)]
pub struct TimerService
{
    requests: Sender<TimerRequest>,
}

impl fmt::Debug for TimerService
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("TimerService")
            .field("running", &!self.requests.is_closed())
            .finish()
    }
}

impl TimerService
{
    /// Spawn the scheduler task and return a handle to it, along with the
    /// task's join handle.
    pub fn start() -> (Self, JoinHandle<()>)
    {
        let (requests, request_recv) = channel();
        let task = tokio::spawn(Scheduler::default().run(request_recv));

        (Self { requests }, task)
    }

    /// Arrange for `message` to be sent to `target` after `delay`, replacing
    /// any pending timer with the same key.
    pub fn reschedule<T: Send + 'static>(
        &self,
        key: impl Into<TimerKey>,
        delay: Duration,
        target: &Sender<T>,
        message: T,
    )
    {
        let key = key.into();
        let deadline = Instant::now() + delay;
        let target = target.clone();
        let fired_key = key.clone();

        let deliver: Delivery = Box::new(move || {
            if target.send(message).is_err()
            {
                tracing::debug!(key = %fired_key, "Timer target has gone away");
            }
        });

        self.submit(TimerRequest::Reschedule {
            key,
            deadline,
            deliver,
        });
    }

    /// Cancel the pending timer for `key`, if there is one.
    pub fn delete(&self, key: impl Into<TimerKey>)
    {
        self.submit(TimerRequest::Delete(key.into()));
    }

    /// Stop the scheduler. Pending timers are discarded without firing.
    pub fn quit(&self)
    {
        self.submit(TimerRequest::Quit);
    }

    fn submit(&self, request: TimerRequest)
    {
        if self.requests.send(request).is_err()
        {
            tracing::trace!("Timer service has stopped; dropping request");
        }
    }
}

struct Entry
{
    deadline: Instant,
    seq: u64,
    deliver: Delivery,
}

#[derive(Default)]
struct Scheduler
{
    entries: HashMap<TimerKey, Entry>,
    // (deadline, insertion sequence) keeps identical deadlines distinct and in
    // the order they were scheduled
    queue: BTreeMap<(Instant, u64), TimerKey>,
    next_seq: u64,
}

impl Scheduler
{
    async fn run(mut self, mut requests: Receiver<TimerRequest>)
    {
        loop
        {
            let next_deadline = self.next_deadline();

            select!
            {
                request = requests.recv() => match request {
                    Some(TimerRequest::Reschedule { key, deadline, deliver }) => {
                        tracing::trace!(%key, "Scheduling timer");
                        self.insert(key, deadline, deliver);
                    }
                    Some(TimerRequest::Delete(key)) => {
                        if self.remove(&key)
                        {
                            tracing::trace!(%key, "Cancelled timer");
                        }
                    }
                    Some(TimerRequest::Quit) | None => break,
                },
                _ = wait_until(next_deadline) => {
                    self.fire_due(Instant::now());
                }
            }
        }

        tracing::debug!(discarded = self.entries.len(), "Timer service stopped");
    }

    fn insert(&mut self, key: TimerKey, deadline: Instant, deliver: Delivery)
    {
        self.remove(&key);

        let seq = self.next_seq;
        self.next_seq += 1;

        self.queue.insert((deadline, seq), key.clone());
        self.entries.insert(
            key,
            Entry {
                deadline,
                seq,
                deliver,
            },
        );
    }

    fn remove(&mut self, key: &TimerKey) -> bool
    {
        match self.entries.remove(key)
        {
            Some(entry) => {
                self.queue.remove(&(entry.deadline, entry.seq));
                true
            }
            None => false,
        }
    }

    fn next_deadline(&self) -> Option<Instant>
    {
        self.queue.keys().next().map(|(deadline, _)| *deadline)
    }

    fn fire_due(&mut self, now: Instant)
    {
        while let Some(first) = self.queue.first_entry()
        {
            if first.key().0 > now
            {
                break;
            }

            let key = first.remove();
            if let Some(entry) = self.entries.remove(&key)
            {
                tracing::trace!(%key, "Timer fired");
                (entry.deliver)();
            }
        }
    }
}

async fn wait_until(deadline: Option<Instant>)
{
    match deadline
    {
        Some(deadline) => time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
