//! Connection engine for simple IRC bots.
//!
//! An [`Engine`] keeps one server connection alive: it registers, joins
//! channels, answers and sends liveness checks, reconnects when the link
//! drops, and hands everything else to a [`Bot`]. Outgoing traffic is rate
//! limited, and every line sent or received is reported on a log channel so
//! that a separate sink can record it.
//!
//! Several tasks cooperate:
//!
//!  - the engine task, one per server, which owns the socket's read half;
//!  - the [timer service](TimerService), shared between engines;
//!  - whatever consumes [`LogEvent`]s;
//!  - the operator, through an [`EngineHandle`].
//!
//! They talk to each other through [`channel`]s.

pub mod bot;
pub mod channel;
pub mod config;
pub mod connector;
pub mod dispatch;
mod engine;
pub mod error;
mod handle;
mod irc;
pub mod line;
pub mod messages;
pub mod rate_limit;
pub mod reconnect;
pub mod timer;

mod utils;
pub use utils::OrLog;

pub use bot::{Bot, IncomingCommand, IncomingMessage};
pub use config::ServerConfig;
pub use connector::{Connector, TcpConnector};
pub use engine::{Engine, EngineState, PING_INTERVAL, PING_TIMEOUT};
pub use error::{EngineError, Result};
pub use handle::EngineHandle;
pub use irc::Irc;
pub use messages::{ControlMessage, LogEvent};
pub use reconnect::{ReconnectConfig, ReconnectStrategy};
pub use timer::{TimerKey, TimerService};
