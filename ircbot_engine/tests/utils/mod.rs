use async_trait::async_trait;
use ircbot_engine::{
    channel::{channel, Receiver},
    Bot, Connector, Engine, EngineHandle, LogEvent, ServerConfig, TimerService,
};
use std::{
    io,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};
use tokio::{
    io::{
        AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines, ReadHalf, WriteHalf,
    },
    sync::mpsc,
    task::JoinHandle,
};

pub mod bot;

pub fn test_config() -> ServerConfig
{
    ServerConfig {
        host: "irc.test".to_string(),
        port: 6667,
        nick: "testbot".to_string(),
        username: "tester".to_string(),
        realname: "Test Bot".to_string(),
        channels: vec!["#one".to_string(), "#two".to_string()],
    }
}

/// Hands out in-memory streams instead of network connections, and passes the
/// server end of each to the test.
#[derive(Clone)]
pub struct MockConnector
{
    inner: Arc<MockConnectorInner>,
}

struct MockConnectorInner
{
    attempts: AtomicUsize,
    refusals: AtomicUsize,
    accepted: mpsc::UnboundedSender<DuplexStream>,
}

impl MockConnector
{
    fn new(refusals: usize) -> (Self, mpsc::UnboundedReceiver<DuplexStream>)
    {
        let (accepted, servers) = mpsc::unbounded_channel();
        let connector = Self {
            inner: Arc::new(MockConnectorInner {
                attempts: AtomicUsize::new(0),
                refusals: AtomicUsize::new(refusals),
                accepted,
            }),
        };
        (connector, servers)
    }

    pub fn attempts(&self) -> usize
    {
        self.inner.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for MockConnector
{
    type Stream = DuplexStream;

    async fn connect(&self, _host: &str, _port: u16) -> io::Result<DuplexStream>
    {
        self.inner.attempts.fetch_add(1, Ordering::SeqCst);

        let refused = self
            .inner
            .refusals
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refused
        {
            return Err(io::ErrorKind::ConnectionRefused.into());
        }

        let (client, server) = tokio::io::duplex(64 * 1024);
        self.inner
            .accepted
            .send(server)
            .map_err(|_| io::Error::from(io::ErrorKind::ConnectionRefused))?;
        Ok(client)
    }
}

/// The far end of one mock connection
pub struct MockServer
{
    lines: Lines<BufReader<ReadHalf<DuplexStream>>>,
    writer: WriteHalf<DuplexStream>,
}

impl MockServer
{
    fn new(stream: DuplexStream) -> Self
    {
        let (reader, writer) = tokio::io::split(stream);
        Self {
            lines: BufReader::new(reader).lines(),
            writer,
        }
    }

    /// The next line the engine sent, or `None` once it has hung up
    pub async fn next_line(&mut self) -> Option<String>
    {
        self.lines.next_line().await.unwrap()
    }

    pub async fn expect(&mut self, expected: &str)
    {
        assert_eq!(self.next_line().await.as_deref(), Some(expected));
    }

    pub async fn expect_handshake(&mut self)
    {
        self.expect("USER tester a a :Test Bot").await;
        self.expect("NICK testbot").await;
        self.expect("JOIN #one").await;
        self.expect("JOIN #two").await;
    }

    pub async fn send(&mut self, line: &str)
    {
        self.writer
            .write_all(format!("{}\r\n", line).as_bytes())
            .await
            .unwrap();
    }

    pub async fn send_raw(&mut self, bytes: &[u8])
    {
        self.writer.write_all(bytes).await.unwrap();
    }
}

/// A running engine wired to a [`MockConnector`]
pub struct Harness
{
    pub handle: EngineHandle,
    pub connector: MockConnector,
    pub task: JoinHandle<()>,
    logs: Receiver<LogEvent>,
    servers: mpsc::UnboundedReceiver<DuplexStream>,
}

impl Harness
{
    pub fn start(bot: impl Bot) -> Self
    {
        Self::start_refusing(bot, 0)
    }

    /// Start an engine whose first `refusals` connection attempts fail
    pub fn start_refusing(bot: impl Bot, refusals: usize) -> Self
    {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();

        let (timers, _) = TimerService::start();
        let (log_send, logs) = channel();
        let (connector, servers) = MockConnector::new(refusals);

        let (engine, handle) = Engine::new(test_config(), bot, timers, log_send);
        let engine = engine.with_connector(connector.clone());
        let task = tokio::spawn(engine.run());

        Self {
            handle,
            connector,
            task,
            logs,
            servers,
        }
    }

    /// Wait for the engine's next successful connection
    pub async fn accept(&mut self) -> MockServer
    {
        MockServer::new(self.servers.recv().await.unwrap())
    }

    /// Everything logged so far
    pub fn drain_logs(&mut self) -> Vec<LogEvent>
    {
        let mut events = Vec::new();
        while let Ok(Some(event)) = self.logs.try_recv()
        {
            events.push(event);
        }
        events
    }

    /// Wait until an event matching `pred` is logged, and return it
    pub async fn wait_for_log(&mut self, pred: impl Fn(&LogEvent) -> bool) -> LogEvent
    {
        loop
        {
            let event = self.logs.recv().await.unwrap();
            if pred(&event)
            {
                return event;
            }
        }
    }
}

pub fn errors(events: &[LogEvent]) -> Vec<&str>
{
    events
        .iter()
        .filter_map(|event| match event {
            LogEvent::InternalError(message) => Some(message.as_str()),
            _ => None,
        })
        .collect()
}
