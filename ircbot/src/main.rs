use clap::Parser;
use ircbot_engine::{channel::channel, Bot, Engine, LogEvent, OrLog, TimerService};
use std::path::PathBuf;
use tracing_subscriber::util::SubscriberInitExt;

mod bot;
mod config;
mod console;
mod log_sink;
mod tracing_config;

use config::BotConfig;
use console::OperatorCommand;

#[derive(Debug, Parser)]
#[command(version, about)]
struct Args
{
    /// Config file location
    #[arg(short, long, default_value = "bot.json5")]
    config: PathBuf,

    /// Don't read operator commands from standard input
    #[arg(long)]
    no_console: bool,
}

/// Main entry point.
///
/// Configuration is loaded and the bot initialised before any networking
/// starts, so that mistakes in either are reported straight away.
pub fn main() -> Result<(), anyhow::Error>
{
    let args = Args::parse();

    let config = BotConfig::load_file(&args.config)?;

    let mut bot = bot::PingBot::default();
    bot.initialize(&config.bot)?;

    if config.log.uses_dir() && !config.log.dir.is_dir()
    {
        std::fs::create_dir_all(&config.log.dir)?;
    }

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run_bot(config, bot, !args.no_console))
}

async fn run_bot(config: BotConfig, bot: impl Bot, console: bool) -> Result<(), anyhow::Error>
{
    tracing_config::build_subscriber(config.log).init();

    let (timers, timer_task) = TimerService::start();
    let (log_send, log_recv) = channel();
    let log_task = tokio::spawn(log_sink::run(log_recv));

    let (engine, handle) = Engine::new(config.server, bot, timers, log_send);
    let engine = engine.with_reconnect_strategy(config.reconnect.build());
    let mut engine_task = tokio::spawn(engine.run());

    let (command_send, mut commands) = channel();
    if console
    {
        console::spawn(command_send)?;
    }
    else
    {
        drop(command_send);
    }
    let mut console_open = console;

    loop
    {
        tokio::select!
        {
            result = &mut engine_task => {
                result?;
                break;
            }
            command = commands.recv(), if console_open => {
                match command
                {
                    Some(OperatorCommand::Quit) => handle.quit(),
                    Some(OperatorCommand::Reconnect) => {
                        handle.reconnect().or_log("requesting reconnect")
                    }
                    Some(OperatorCommand::SendLine(line)) => {
                        handle.send_line(line).or_log("sending operator line")
                    }
                    None => {
                        handle.log(LogEvent::Status("Console closed".to_string()));
                        console_open = false;
                    }
                }
            }
        }
    }

    tracing::debug!("Engine stopped; waiting for log and timer tasks");

    // The log sink runs until the last sender has gone
    drop(handle);
    log_task.await?;
    timer_task.await?;

    Ok(())
}
