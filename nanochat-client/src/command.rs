//! REPL input parsing.
//!
//! A line is split at its first whitespace character into a command token and
//! the remaining text. Matching is exact and case-sensitive; the remainder is
//! kept whole for `send`/`add` and tokenized for commands with positional
//! arguments.

/// Commands that can be entered at the `> ` prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verb {
    Exit,
    Help,
    Config,
    Conn,
    Send,
    Hist,
    Last,
    Poll,
    Skip,
    Stat,
    Add,
    ShowBuf,
    ClearBuf,
    SendBuf,
    Unknown(String),
}

impl Verb {
    fn from_token(token: &str) -> Self {
        match token {
            "exit" => Verb::Exit,
            "help" => Verb::Help,
            "config" => Verb::Config,
            "conn" => Verb::Conn,
            "send" => Verb::Send,
            "hist" => Verb::Hist,
            "last" => Verb::Last,
            "poll" => Verb::Poll,
            "skip" => Verb::Skip,
            "stat" => Verb::Stat,
            "add" => Verb::Add,
            "showbuf" => Verb::ShowBuf,
            "clearbuf" => Verb::ClearBuf,
            "sendbuf" => Verb::SendBuf,
            other => Verb::Unknown(other.to_string()),
        }
    }

    /// Whether the command talks to the server and so needs an open connection.
    pub fn requires_connection(&self) -> bool {
        matches!(
            self,
            Verb::Send
                | Verb::Hist
                | Verb::Last
                | Verb::Poll
                | Verb::Skip
                | Verb::Stat
                | Verb::SendBuf
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub verb: Verb,
    /// Everything after the command token, trimmed.
    pub remainder: String,
}

impl Command {
    /// Parses one line of input. Returns `None` for blank lines.
    pub fn parse(line: &str) -> Option<Self> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }

        let (token, remainder) = match trimmed.find(char::is_whitespace) {
            Some(split) => (&trimmed[..split], trimmed[split..].trim()),
            None => (trimmed, ""),
        };

        Some(Self {
            verb: Verb::from_token(token),
            remainder: remainder.to_string(),
        })
    }

    /// The remainder split on whitespace.
    pub fn args(&self) -> Vec<&str> {
        self.remainder.split_whitespace().collect()
    }
}
