//! The interactive loop: read a line, parse it, run it, render the result.
//!
//! Every command runs to completion before the next line is read, so at most
//! one request is ever outstanding on the connection.

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::{
    VERSION,
    codec::{Reply, Request, parse_count},
    command::{Command, Verb},
    connection::Address,
    error::ClientError,
    session::Session,
};

pub const PROMPT: &str = "> ";

const LINE_ENDINGS: &[char] = &['\n', '\r'];

/// Line-based terminal over any async reader/writer pair.
pub struct Console<R, W> {
    input: R,
    output: W,
    prompt: &'static str,
}

impl<R, W> Console<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            prompt: PROMPT,
        }
    }

    pub fn with_prompt(mut self, prompt: &'static str) -> Self {
        self.prompt = prompt;
        self
    }

    /// Prompts and reads one line. `None` means end of input.
    ///
    /// Input that is not valid UTF-8 is decoded lossily.
    pub async fn read_line(&mut self) -> std::io::Result<Option<String>> {
        if !self.prompt.is_empty() {
            self.output.write_all(self.prompt.as_bytes()).await?;
            self.output.flush().await?;
        }

        let mut bytes = Vec::new();
        if self.input.read_until(b'\n', &mut bytes).await? == 0 {
            return Ok(None);
        }
        let line = String::from_utf8_lossy(&bytes);
        Ok(Some(line.trim_end_matches(LINE_ENDINGS).to_string()))
    }

    pub async fn write_line(&mut self, text: &str) -> std::io::Result<()> {
        self.output.write_all(text.as_bytes()).await?;
        self.output.write_all(b"\n").await?;
        self.output.flush().await
    }

    pub fn into_output(self) -> W {
        self.output
    }
}

enum Flow {
    Continue,
    Exit,
}

pub struct Repl<R, W> {
    session: Session,
    console: Console<R, W>,
}

impl<R, W> Repl<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(session: Session, console: Console<R, W>) -> Self {
        Self { session, console }
    }

    pub fn into_parts(self) -> (Session, Console<R, W>) {
        (self.session, self.console)
    }

    /// Runs until `exit` or end of input.
    ///
    /// Only terminal failures are returned; command failures are rendered and
    /// the loop carries on. At end of input the connection is dropped without
    /// sending `QUIT`.
    pub async fn run(&mut self) -> Result<()> {
        if self.session.config.username.is_empty() {
            self.print("Warning: username is empty").await?;
        }

        loop {
            let line = self
                .console
                .read_line()
                .await
                .context("failed to read from terminal")?;
            let Some(line) = line else {
                debug!("end of input");
                self.session.connection.abandon();
                break;
            };
            let Some(command) = Command::parse(&line) else {
                continue;
            };
            if let Flow::Exit = self.dispatch(command).await? {
                break;
            }
        }

        Ok(())
    }

    async fn dispatch(&mut self, command: Command) -> Result<Flow> {
        if command.verb.requires_connection() && !self.session.connection.is_connected() {
            self.report(ClientError::NotConnected).await?;
            return Ok(Flow::Continue);
        }

        match &command.verb {
            Verb::Exit => {
                self.session.connection.disconnect().await;
                return Ok(Flow::Exit);
            }
            Verb::Help => self.print(&help_text()).await?,
            Verb::Config => {
                let text = config_text(&self.session.config_path.display().to_string());
                self.print(&text).await?;
            }
            Verb::Conn => self.conn(&command.args()).await?,
            Verb::Send => {
                let request = Request::send_as(&self.session.config.username, &command.remainder);
                self.exchange(request, false).await?;
            }
            Verb::Hist => self.exchange(Request::Hist, false).await?,
            Verb::Last => self.numeric(&command, "last", Request::Last).await?,
            Verb::Poll => self.numeric(&command, "poll", Request::Poll).await?,
            Verb::Skip => self.numeric(&command, "skip", Request::Skip).await?,
            Verb::Stat => self.exchange(Request::Stat, false).await?,
            Verb::Add => self.session.buffer.add(&command.remainder),
            Verb::ShowBuf => {
                let text = format!("Buffer: `{}`", self.session.buffer.contents());
                self.print(&text).await?;
            }
            Verb::ClearBuf => self.session.buffer.clear(),
            Verb::SendBuf => {
                let request = Request::send_as(
                    &self.session.config.username,
                    self.session.buffer.contents(),
                );
                let clear = self.session.config.clear_buffer_on_send;
                self.exchange(request, clear).await?;
            }
            Verb::Unknown(token) => {
                let text = format!("Unknown command '{token}'");
                self.print(&text).await?;
            }
        }

        Ok(Flow::Continue)
    }

    async fn conn(&mut self, args: &[&str]) -> Result<()> {
        let config = &self.session.config;
        let address = match args {
            [] => Address::new(&config.default_host, &config.default_port),
            [host] => Address::new(*host, &config.default_port),
            [host, port] => Address::new(*host, *port),
            _ => {
                return self
                    .report(ClientError::Usage {
                        command: "conn",
                        expected: "zero, one, or two arguments",
                    })
                    .await;
            }
        };
        let entry_message = config.entry_message();

        if self.session.connection.is_connected_to(&address) {
            return self
                .print(&format!("Already connected to '{address}'"))
                .await;
        }
        if let Some(previous) = self.session.connection.disconnect().await {
            self.print(&format!("Disconnecting from '{previous}'"))
                .await?;
        }
        self.print(&format!("Opening a connection to '{address}'"))
            .await?;

        if let Err(err) = self
            .session
            .connection
            .connect(address, entry_message)
            .await
        {
            self.print(&err.to_string()).await?;
        }
        Ok(())
    }

    /// Commands taking exactly one non-negative integer argument.
    async fn numeric(
        &mut self,
        command: &Command,
        name: &'static str,
        build: fn(u64) -> Request,
    ) -> Result<()> {
        let request = match command.args().as_slice() {
            [arg] => parse_count(arg).map(build),
            _ => Err(ClientError::Usage {
                command: name,
                expected: "one argument",
            }),
        };
        match request {
            Ok(request) => self.exchange(request, false).await,
            Err(err) => self.report(err).await,
        }
    }

    async fn exchange(&mut self, request: Request, clear_buffer_on_send: bool) -> Result<()> {
        match self.round_trip(&request, clear_buffer_on_send).await {
            Ok(reply) => {
                for line in reply.map(render_reply).unwrap_or_default() {
                    self.print(&line).await?;
                }
                Ok(())
            }
            Err(err) => self.report(err).await,
        }
    }

    async fn round_trip(
        &mut self,
        request: &Request,
        clear_buffer_on_send: bool,
    ) -> Result<Option<Reply>, ClientError> {
        let Session {
            connection, buffer, ..
        } = &mut self.session;
        let connection = connection.active().ok_or(ClientError::NotConnected)?;

        connection.send(request).await?;
        if clear_buffer_on_send {
            buffer.clear();
        }

        match request.reply_shape() {
            Some(shape) => Ok(Some(connection.read_reply(shape).await?)),
            None => Ok(None),
        }
    }

    /// Renders `err`, dropping the connection when the stream itself failed.
    async fn report(&mut self, err: ClientError) -> Result<()> {
        if err.loses_connection() {
            self.session.connection.abandon();
        }
        self.print(&err.to_string()).await
    }

    async fn print(&mut self, text: &str) -> Result<()> {
        self.console
            .write_line(text)
            .await
            .context("failed to write to terminal")
    }
}

fn render_reply(reply: Reply) -> Vec<String> {
    match reply {
        Reply::Ack(line) => vec![line],
        Reply::List(list) => {
            let mut lines = Vec::with_capacity(list.messages.len() + 1);
            lines.push(format!("{}, {}", list.messages.len(), list.index));
            lines.extend(list.messages);
            lines
        }
        Reply::Skip(skip) => vec![skip.first, skip.second],
        Reply::Stat(stat) => vec![stat.to_string()],
    }
}

fn help_text() -> String {
    format!(
        "Nanochat client, version {VERSION}

Commands:
 exit - exits the client.
 help - shows this message.
 config - shows the config path and the descriptions of the config options.
 conn [host] [port] - connects to the specified host and port.
 send <msg> - sends a message.
 hist - lists the previously sent messages.
 last <n> - shows the specified number of previously sent messages.
 poll <n> - shows the amount of messages after the specified index.
 skip <n> - gets the earliest messages after the specified index.
 stat - shows the server statistics.
 add <msg> - appends text to the message buffer.
 sendbuf - sends the message buffer.
 showbuf - shows the contents of the message buffer.
 clearbuf - clears the buffer contents."
    )
}

fn config_text(path: &str) -> String {
    format!(
        "Config Path:
 '{path}'

Config Options:
 Username - The username to use when connected to a Nanochat server.
 BufferAddSep - The separator placed between buffer segments by 'add'.
 EntryMsg - The message to send after joining a server; '%name' is replaced with Username.
 ClearBufferOnSend - Whether 'sendbuf' clears the buffer.
 DefaultHost - The host used when 'conn' is run with zero arguments.
 DefaultPort - The port used when 'conn' is run with zero or one arguments."
    )
}
