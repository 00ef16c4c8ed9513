//! Turns raw lines from the server into calls on a [`Bot`].

use crate::{
    bot::{Bot, IncomingCommand, IncomingMessage},
    Irc,
};

/// A tokenised, but not yet routed, line from the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLine
{
    pub prefix: Option<Vec<u8>>,
    pub command: Vec<u8>,
    pub args: Vec<Vec<u8>>,
}

/// Where a parsed line should be delivered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Routed
{
    Message(IncomingMessage),
    NonMessage(IncomingCommand),
}

impl ParsedLine
{
    /// Split a raw line into prefix, command and arguments.
    ///
    /// Returns `None` for a line with no command in it.
    pub fn parse(raw: &[u8]) -> Option<Self>
    {
        let mut raw = skip_spaces(raw);
        let mut prefix = None;

        if let Some(rest) = raw.strip_prefix(b":")
        {
            let (source, rest) = split_word(rest);
            prefix = Some(source.to_vec());
            raw = skip_spaces(rest.unwrap_or_default());
        }

        if raw.is_empty()
        {
            return None;
        }

        let (command, rest) = split_word(raw);
        let mut args = Vec::new();

        let Some(mut rest) = rest else {
            return Some(Self {
                prefix,
                command: command.to_vec(),
                args,
            });
        };

        loop
        {
            if let Some(arg) = rest.strip_prefix(b":")
            {
                args.push(arg.to_vec());
                break;
            }

            match rest.iter().position(|b| *b == b' ')
            {
                Some(offset) => {
                    let arg = &rest[..offset];

                    if !arg.is_empty()
                    {
                        args.push(arg.to_vec());
                    }

                    rest = &rest[offset + 1..];
                }
                None => {
                    if !rest.is_empty()
                    {
                        args.push(rest.to_vec());
                    }
                    break;
                }
            }
        }

        Some(Self {
            prefix,
            command: command.to_vec(),
            args,
        })
    }

    /// Decide which bot hook this line belongs to.
    pub fn route(self) -> Routed
    {
        if self.command.eq_ignore_ascii_case(b"PRIVMSG") && self.args.len() >= 2
        {
            let prefix = self.prefix.unwrap_or_default();
            let nick = sender_nick(&prefix).to_vec();
            let mut args = self.args.into_iter();
            let target = args.next().unwrap_or_default();
            let text = args.next().unwrap_or_default();

            let channel = if is_channel_name(&target) {
                target
            }
            else
            {
                nick.clone()
            };

            Routed::Message(IncomingMessage {
                prefix,
                text,
                nick,
                channel,
            })
        }
        else
        {
            Routed::NonMessage(IncomingCommand {
                prefix: self.prefix,
                command: self.command,
                args: self.args,
            })
        }
    }
}

/// Parse `line` and hand it to the matching hook on `bot`.
pub async fn dispatch_line<B: Bot + ?Sized>(bot: &B, line: &[u8], irc: &Irc)
{
    let Some(parsed) = ParsedLine::parse(line) else {
        tracing::trace!("Ignoring empty line");
        return;
    };

    match parsed.route()
    {
        Routed::Message(message) => bot.handle_message(message, irc).await,
        Routed::NonMessage(command) => bot.handle_nonmessage(command, irc).await,
    }
}

/// The nick part of a `nick!user@host` prefix
pub fn sender_nick(prefix: &[u8]) -> &[u8]
{
    prefix.split(|b| *b == b'!').next().unwrap_or(prefix)
}

pub fn is_channel_name(target: &[u8]) -> bool
{
    matches!(target.first(), Some(b'#' | b'&' | b'+' | b'!'))
}

fn skip_spaces(raw: &[u8]) -> &[u8]
{
    let start = raw.iter().position(|b| *b != b' ').unwrap_or(raw.len());
    &raw[start..]
}

fn split_word(raw: &[u8]) -> (&[u8], Option<&[u8]>)
{
    match raw.iter().position(|b| *b == b' ')
    {
        Some(offset) => (&raw[..offset], Some(&raw[offset + 1..])),
        None => (raw, None),
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use pretty_assertions::assert_eq;

    fn args(list: &[&str]) -> Vec<Vec<u8>>
    {
        list.iter().map(|a| a.as_bytes().to_vec()).collect()
    }

    #[test]
    fn no_args()
    {
        let line = ParsedLine::parse(b"command").unwrap();
        assert_eq!(line.command, b"command");
        assert!(line.args.is_empty());
        assert_eq!(line.prefix, None);
    }

    #[test]
    fn simple_args()
    {
        let line = ParsedLine::parse(b"command arg1 arg2 :arg three").unwrap();
        assert_eq!(line.args, args(&["arg1", "arg2", "arg three"]));
    }

    #[test]
    fn prefix()
    {
        let line = ParsedLine::parse(b":irc.example.net 001 bot :Welcome").unwrap();
        assert_eq!(line.prefix, Some(b"irc.example.net".to_vec()));
        assert_eq!(line.command, b"001");
        assert_eq!(line.args, args(&["bot", "Welcome"]));
    }

    #[test]
    fn ending_colon_and_double_space()
    {
        let line = ParsedLine::parse(b"command arg1  arg2 :").unwrap();
        assert_eq!(line.args, args(&["arg1", "arg2", ""]));
    }

    #[test]
    fn colon_space()
    {
        let line = ParsedLine::parse(b"command arg1 : arg2").unwrap();
        assert_eq!(line.args, args(&["arg1", " arg2"]));
    }

    #[test]
    fn empty_or_prefix_only()
    {
        assert_eq!(ParsedLine::parse(b""), None);
        assert_eq!(ParsedLine::parse(b"   "), None);
        assert_eq!(ParsedLine::parse(b":lonely.prefix"), None);
    }

    #[test]
    fn non_utf8_passes_through()
    {
        let line = ParsedLine::parse(b":n!u@h PRIVMSG #a :\xff\xfe").unwrap();
        assert_eq!(line.args[1], vec![0xff, 0xfe]);
    }

    #[test]
    fn channel_message_routes_to_channel()
    {
        let routed = ParsedLine::parse(b":alice!a@host PRIVMSG #rust :hello there")
            .unwrap()
            .route();

        assert_eq!(
            routed,
            Routed::Message(IncomingMessage {
                prefix: b"alice!a@host".to_vec(),
                text: b"hello there".to_vec(),
                nick: b"alice".to_vec(),
                channel: b"#rust".to_vec(),
            })
        );
    }

    #[test]
    fn query_replies_to_sender()
    {
        let routed = ParsedLine::parse(b":alice!a@host privmsg bot :hi").unwrap().route();

        let message = match routed {
            Routed::Message(message) => message,
            other => panic!("expected a message, got {:?}", other),
        };
        assert_eq!(message.nick, b"alice");
        assert_eq!(message.channel, b"alice");
    }

    #[test]
    fn other_commands_are_nonmessages()
    {
        let routed = ParsedLine::parse(b":alice!a@host JOIN #rust").unwrap().route();

        assert_eq!(
            routed,
            Routed::NonMessage(IncomingCommand {
                prefix: Some(b"alice!a@host".to_vec()),
                command: b"JOIN".to_vec(),
                args: args(&["#rust"]),
            })
        );
    }

    #[test]
    fn short_privmsg_is_a_nonmessage()
    {
        let routed = ParsedLine::parse(b":server PRIVMSG #rust").unwrap().route();
        assert!(matches!(routed, Routed::NonMessage(_)));
    }
}
