//! One-shot RCON exchanges over TCP.
//!
//! Each call opens its own connection, authenticates, sends a single command,
//! reads a single reply and drops the socket before returning.

use log::debug;
use shared::{payload_length, Packet, PacketError, LENGTH_PREFIX_SIZE, SERVERDATA_AUTH_RESPONSE};
use std::future::Future;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Request id used for the authentication packet
pub const AUTH_REQUEST_ID: i32 = 1;
/// Request id used for the command packet
pub const COMMAND_REQUEST_ID: i32 = 2;

/// Failures of a single RCON exchange.
/// Messages never include the password.
#[derive(Debug, thiserror::Error)]
pub enum RconError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("RCON auth failed")]
    Auth,

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),
}

impl From<io::Error> for RconError {
    fn from(e: io::Error) -> Self {
        RconError::Connection(e.to_string())
    }
}

impl From<PacketError> for RconError {
    fn from(e: PacketError) -> Self {
        RconError::Protocol(e.to_string())
    }
}

/// Anything that can deliver a console command and hand back the reply.
///
/// The restart sequence and the player query are written against this seam so
/// they can be driven by a recording fake in tests.
#[allow(async_fn_in_trait)]
pub trait CommandSink {
    async fn send_command(&self, command: &str) -> Result<String, RconError>;
}

/// Connection settings for a remote console
#[derive(Debug, Clone)]
pub struct RconClient {
    host: String,
    port: u16,
    password: String,
    timeout: Duration,
}

impl RconClient {
    pub fn new(host: &str, port: u16, password: &str, timeout: Duration) -> Self {
        Self {
            host: host.to_string(),
            port,
            password: password.to_string(),
            timeout,
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Runs one authenticated exchange and returns the command output.
    ///
    /// The timeout applies to the connect and to every read and write. A
    /// missing reply to the command itself is not an error: many servers stay
    /// silent for side-effecting commands, so the body comes back empty.
    pub async fn send_command(&self, command: &str) -> Result<String, RconError> {
        let addr = self.address();
        let mut stream = match timeout(self.timeout, TcpStream::connect(&addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return Err(RconError::Connection(format!("{}: {}", addr, e))),
            Err(_) => return Err(RconError::Timeout(self.timeout)),
        };

        let result = async {
            authenticate(&mut stream, &self.password, self.timeout).await?;
            execute(&mut stream, command, self.timeout).await
        }
        .await;

        let _ = stream.shutdown().await;
        result
    }
}

impl CommandSink for RconClient {
    async fn send_command(&self, command: &str) -> Result<String, RconError> {
        RconClient::send_command(self, command).await
    }
}

/// Sends a single command without keeping a client around
pub async fn send_command(
    host: &str,
    port: u16,
    password: &str,
    command: &str,
    timeout: Duration,
) -> Result<String, RconError> {
    RconClient::new(host, port, password, timeout)
        .send_command(command)
        .await
}

async fn with_timeout<T, F>(limit: Duration, fut: F) -> Result<T, RconError>
where
    F: Future<Output = Result<T, RconError>>,
{
    match timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(RconError::Timeout(limit)),
    }
}

/// Fills `buf` completely, looping over short reads
async fn read_exact_or_closed<S>(stream: &mut S, buf: &mut [u8]) -> Result<(), RconError>
where
    S: AsyncRead + Unpin,
{
    let mut filled = 0;
    while filled < buf.len() {
        let n = stream.read(&mut buf[filled..]).await?;
        if n == 0 {
            return Err(RconError::Connection(
                "Connection closed by server".to_string(),
            ));
        }
        filled += n;
    }
    Ok(())
}

/// Reads one length-prefixed packet
pub async fn read_packet<S>(stream: &mut S) -> Result<Packet, RconError>
where
    S: AsyncRead + Unpin,
{
    let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
    read_exact_or_closed(stream, &mut prefix).await?;

    let length = payload_length(prefix)?;
    let mut payload = vec![0u8; length];
    read_exact_or_closed(stream, &mut payload).await?;

    Ok(Packet::decode_payload(&payload)?)
}

pub async fn write_packet<S>(stream: &mut S, packet: &Packet) -> Result<(), RconError>
where
    S: AsyncWrite + Unpin,
{
    stream.write_all(&packet.encode()).await?;
    stream.flush().await?;
    Ok(())
}

/// Performs the auth handshake on an open stream.
///
/// Servers commonly send an empty response-value packet ahead of the actual
/// auth response, so packets are consumed until the auth response shows up.
pub async fn authenticate<S>(
    stream: &mut S,
    password: &str,
    io_timeout: Duration,
) -> Result<(), RconError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let request = Packet::auth(AUTH_REQUEST_ID, password);
    with_timeout(io_timeout, write_packet(stream, &request)).await?;

    loop {
        let packet = with_timeout(io_timeout, read_packet(stream)).await?;

        if packet.is_auth_rejection() {
            return Err(RconError::Auth);
        }

        if packet.kind == SERVERDATA_AUTH_RESPONSE {
            if packet.id == AUTH_REQUEST_ID {
                return Ok(());
            }
            return Err(RconError::Protocol(format!(
                "Auth response carried request id {}",
                packet.id
            )));
        }

        debug!("Skipping packet type {} during auth", packet.kind);
    }
}

/// Sends a command on an authenticated stream and reads its reply
pub async fn execute<S>(
    stream: &mut S,
    command: &str,
    io_timeout: Duration,
) -> Result<String, RconError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let request = Packet::exec(COMMAND_REQUEST_ID, command);
    with_timeout(io_timeout, write_packet(stream, &request)).await?;

    match timeout(io_timeout, read_packet(stream)).await {
        Ok(result) => {
            let packet = result?;
            if !packet.is_command_response() {
                return Err(RconError::Protocol(format!(
                    "Unexpected packet type {}",
                    packet.kind
                )));
            }
            Ok(packet.body)
        }
        Err(_) => {
            debug!("No reply within {:?}, treating as empty", io_timeout);
            Ok(String::new())
        }
    }
}
