//! Byte-level helpers for protocol lines on their way in and out.

/// Longest line we will write, not counting the trailing CRLF
pub const MAX_LINE_LENGTH: usize = 510;

/// Remove any embedded CR or LF and truncate to [`MAX_LINE_LENGTH`] bytes.
pub fn sanitize(line: &[u8]) -> Vec<u8>
{
    let mut clean: Vec<u8> = line
        .iter()
        .copied()
        .filter(|b| *b != b'\r' && *b != b'\n')
        .collect();
    clean.truncate(MAX_LINE_LENGTH);
    clean
}

/// Frame a sanitised line for the wire.
pub fn frame(line: &[u8]) -> Vec<u8>
{
    let mut framed = Vec::with_capacity(line.len() + 2);
    framed.extend_from_slice(line);
    framed.extend_from_slice(b"\r\n");
    framed
}

/// Whether an outgoing line is keepalive traffic, which is left out of the
/// sent-line log.
pub fn is_liveness(line: &[u8]) -> bool
{
    line.starts_with(b"PING ") || line.starts_with(b"PONG ")
}

/// Uppercase the command word of an operator-supplied line, leaving the rest
/// untouched.
pub fn normalize_command(text: &str) -> Vec<u8>
{
    let bytes = text.as_bytes();
    match split_first_word(bytes)
    {
        (command, Some(rest)) => {
            let mut line = command.to_ascii_uppercase();
            line.push(b' ');
            line.extend_from_slice(rest);
            line
        }
        (command, None) => command.to_ascii_uppercase(),
    }
}

/// How the engine itself should treat a received line
#[derive(Debug, PartialEq, Eq)]
pub enum Inbound<'a>
{
    /// A server PING; answer with PONG and the same arguments
    Ping(&'a [u8]),
    /// A PONG reply to one of our own checks
    Pong,
    /// Anything else, for the dispatcher
    Other,
}

/// Pick out liveness traffic from an inbound line.
pub fn classify(line: &[u8]) -> Inbound<'_>
{
    let (first, rest) = split_first_word(line);

    if first.eq_ignore_ascii_case(b"PING")
    {
        return Inbound::Ping(rest.unwrap_or_default());
    }

    if first.starts_with(b":")
    {
        if let Some(rest) = rest
        {
            let (command, _) = split_first_word(rest);
            if command.eq_ignore_ascii_case(b"PONG")
            {
                return Inbound::Pong;
            }
        }
    }

    Inbound::Other
}

/// If `buffer` holds a complete CRLF-terminated line, remove and return it
/// without the terminator.
pub fn take_line(buffer: &mut Vec<u8>) -> Option<Vec<u8>>
{
    let end = buffer.windows(2).position(|w| w == b"\r\n")?;
    let mut line: Vec<u8> = buffer.drain(..end + 2).collect();
    line.truncate(end);
    Some(line)
}

fn split_first_word(line: &[u8]) -> (&[u8], Option<&[u8]>)
{
    match line.iter().position(|b| *b == b' ')
    {
        Some(space) => (&line[..space], Some(&line[space + 1..])),
        None => (line, None),
    }
}
