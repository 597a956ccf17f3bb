//! # RCON Client Library
//!
//! Async client for the Source-style remote console protocol used by
//! dedicated game servers to accept console commands over TCP.
//!
//! ## Session Model
//!
//! There is no persistent session. Every [`RconClient::send_command`] call:
//! - opens a fresh TCP connection (connect bounded by the configured timeout)
//! - authenticates with the password and waits for the auth response
//! - sends exactly one command and reads exactly one reply
//! - closes the socket, whatever the outcome
//!
//! The socket is owned by the call for its whole lifetime, so nothing is
//! shared between exchanges and a failed exchange leaves nothing behind.
//!
//! ## Timeouts
//!
//! The configured timeout bounds the connect and every read and write. A timeout
//! while connecting or authenticating is a hard [`RconError::Timeout`]. A
//! timeout while waiting for the command's reply yields an empty body, since
//! many servers never answer side-effecting commands such as `quit`.
//!
//! ## Framing
//!
//! Packet encoding lives in the `shared` crate. This crate only adds the
//! stream handling: exact reads of the length prefix and payload, with a
//! zero-length read mid-frame reported as a closed connection.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use rcon::RconClient;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = RconClient::new("127.0.0.1", 27015, "secret", Duration::from_secs(5));
//!     let players = client.send_command("players").await?;
//!     println!("{}", players);
//!     Ok(())
//! }
//! ```

pub mod network;

pub use network::{send_command, CommandSink, RconClient, RconError};
