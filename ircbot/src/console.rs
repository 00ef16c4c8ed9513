//! Operator commands read from standard input.
//!
//!  - `q` quits
//!  - `r` reconnects
//!  - `/<line>` sends `<line>` to the server
//!
//! Anything else is ignored.

use ircbot_engine::channel::Sender;
use std::io::BufRead;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorCommand
{
    Quit,
    Reconnect,
    SendLine(String),
}

impl OperatorCommand
{
    pub fn parse(input: &str) -> Option<Self>
    {
        let input = input.trim_end_matches(['\r', '\n']);

        match input
        {
            "q" => Some(Self::Quit),
            "r" => Some(Self::Reconnect),
            _ => input
                .strip_prefix('/')
                .map(|line| Self::SendLine(line.to_string())),
        }
    }
}

/// Read commands on a dedicated thread, so that a blocked read of standard
/// input never holds up the runtime.
///
/// The thread stops after a quit command, at end of input, or once nobody is
/// listening for commands.
pub fn spawn(commands: Sender<OperatorCommand>) -> std::io::Result<std::thread::JoinHandle<()>>
{
    std::thread::Builder::new()
        .name("console".to_string())
        .spawn(move || read_commands(std::io::stdin().lock(), commands))
}

fn read_commands(input: impl BufRead, commands: Sender<OperatorCommand>)
{
    for line in input.lines()
    {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                tracing::error!(error = %e, "Couldn't read from console");
                break;
            }
        };

        let Some(command) = OperatorCommand::parse(&line) else {
            continue;
        };

        match command
        {
            OperatorCommand::Quit => println!("Keyboard quit"),
            OperatorCommand::Reconnect => println!("Keyboard reconnect"),
            OperatorCommand::SendLine(_) => (),
        }

        let quitting = command == OperatorCommand::Quit;

        if commands.send(command).is_err() || quitting
        {
            break;
        }
    }
}
