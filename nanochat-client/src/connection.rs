use std::fmt;

use tokio::{
    io::{AsyncWriteExt, BufReader},
    net::{
        TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
};
use tracing::{info, warn};

use crate::{
    codec::{Reply, ReplyShape, Request, read_reply, write_request},
    error::{ConnectionError, ResponseError},
};

/// A `host:port` pair. Compared textually, so `localhost:44322` and
/// `127.0.0.1:44322` are different addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    pub host: String,
    pub port: String,
}

impl Address {
    pub fn new(host: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: port.into(),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// An open stream to a Nanochat server.
///
/// The buffered reader is created once at dial time and dropped with the
/// connection, so bytes read ahead by one exchange are still there for the next.
pub struct Connection {
    address: Address,
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Connection {
    async fn dial(address: Address) -> Result<Self, ConnectionError> {
        let stream = match TcpStream::connect(address.to_string()).await {
            Ok(stream) => stream,
            Err(source) => return Err(ConnectionError::Dial { address, source }),
        };
        info!(%address, "connected");

        let (reader, writer) = stream.into_split();
        Ok(Self {
            address,
            reader: BufReader::new(reader),
            writer,
        })
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub async fn send(&mut self, request: &Request) -> Result<(), ConnectionError> {
        write_request(&mut self.writer, request).await?;
        Ok(())
    }

    pub async fn read_reply(&mut self, shape: ReplyShape) -> Result<Reply, ResponseError> {
        read_reply(&mut self.reader, shape).await
    }

    /// Sends `QUIT` and shuts the socket down. Failures are logged, never returned.
    async fn close(mut self) {
        if let Err(error) = write_request(&mut self.writer, &Request::Quit).await {
            warn!(address = %self.address, ?error, "failed to send QUIT");
        }
        if let Err(error) = self.writer.shutdown().await {
            warn!(address = %self.address, ?error, "failed to shutdown connection cleanly");
        }
        info!(address = %self.address, "disconnected");
    }
}

/// Owns the session's single connection.
#[derive(Default)]
pub struct ConnectionManager {
    active: Option<Connection>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_connected(&self) -> bool {
        self.active.is_some()
    }

    pub fn address(&self) -> Option<&Address> {
        self.active.as_ref().map(Connection::address)
    }

    pub fn active(&mut self) -> Option<&mut Connection> {
        self.active.as_mut()
    }

    pub fn is_connected_to(&self, address: &Address) -> bool {
        self.address() == Some(address)
    }

    /// Replaces the active connection with one to `address`. Does nothing when
    /// `address` is already the open one.
    ///
    /// `entry_message` is sent as a `SEND` right after a successful dial and its
    /// acknowledgement is left on the stream unread.
    pub async fn connect(
        &mut self,
        address: Address,
        entry_message: Option<String>,
    ) -> Result<(), ConnectionError> {
        if self.is_connected_to(&address) {
            return Ok(());
        }
        self.disconnect().await;

        let mut connection = Connection::dial(address).await?;
        if let Some(text) = entry_message {
            connection.send(&Request::Send(text)).await?;
        }
        self.active = Some(connection);
        Ok(())
    }

    /// Sends `QUIT` on the active connection and closes it, returning its address.
    /// Does nothing when no connection is open.
    pub async fn disconnect(&mut self) -> Option<Address> {
        let connection = self.active.take()?;
        let address = connection.address.clone();
        connection.close().await;
        Some(address)
    }

    /// Drops the active connection without sending `QUIT`.
    pub fn abandon(&mut self) {
        if let Some(connection) = self.active.take() {
            warn!(address = %connection.address, "dropping connection");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::{io::AsyncBufReadExt, net::TcpListener};

    async fn listener() -> (TcpListener, Address) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("local addr").port();
        (listener, Address::new("127.0.0.1", port.to_string()))
    }

    async fn accept_lines(listener: TcpListener) -> Vec<String> {
        let (stream, _) = listener.accept().await.expect("accept");
        let mut lines = BufReader::new(stream).lines();
        let mut received = Vec::new();
        while let Some(line) = lines.next_line().await.expect("read line") {
            received.push(line);
        }
        received
    }

    #[test]
    fn address_displays_as_host_port() {
        assert_eq!(
            Address::new("localhost", "44322").to_string(),
            "localhost:44322"
        );
    }

    #[tokio::test]
    async fn disconnect_without_connection_is_a_no_op() {
        let mut manager = ConnectionManager::new();
        assert_eq!(manager.disconnect().await, None);
        assert!(!manager.is_connected());
    }

    #[tokio::test]
    async fn connect_sends_entry_message_then_quit_on_disconnect() {
        let (listener, address) = listener().await;
        let server = tokio::spawn(accept_lines(listener));

        let mut manager = ConnectionManager::new();
        manager
            .connect(address.clone(), Some("hello from bob".into()))
            .await
            .expect("connect");
        assert_eq!(manager.address(), Some(&address));

        assert_eq!(manager.disconnect().await, Some(address));
        let received = server.await.expect("server task");
        assert_eq!(received, vec!["SEND hello from bob", "QUIT"]);
    }

    #[tokio::test]
    async fn reconnecting_to_same_address_is_a_no_op() {
        let (listener, address) = listener().await;
        let server = tokio::spawn(accept_lines(listener));

        let mut manager = ConnectionManager::new();
        manager.connect(address.clone(), None).await.expect("connect");
        assert!(manager.is_connected_to(&address));
        manager
            .connect(address.clone(), None)
            .await
            .expect("reconnect");
        assert!(manager.is_connected());

        manager.disconnect().await;
        let received = server.await.expect("server task");
        assert_eq!(received, vec!["QUIT"]);
    }

    #[tokio::test]
    async fn dial_failure_leaves_no_connection() {
        let (listener, address) = listener().await;
        drop(listener);

        let mut manager = ConnectionManager::new();
        let result = manager.connect(address, None).await;
        assert!(matches!(result, Err(ConnectionError::Dial { .. })));
        assert!(!manager.is_connected());
    }

    #[tokio::test]
    async fn connecting_elsewhere_quits_the_previous_server() {
        let (first_listener, first) = listener().await;
        let (second_listener, second) = listener().await;
        let first_server = tokio::spawn(accept_lines(first_listener));
        let second_server = tokio::spawn(accept_lines(second_listener));

        let mut manager = ConnectionManager::new();
        manager.connect(first, None).await.expect("first connect");
        manager
            .connect(second.clone(), None)
            .await
            .expect("second connect");
        assert_eq!(manager.address(), Some(&second));

        assert_eq!(first_server.await.expect("first server"), vec!["QUIT"]);
        manager.disconnect().await;
        assert_eq!(second_server.await.expect("second server"), vec!["QUIT"]);
    }
}
