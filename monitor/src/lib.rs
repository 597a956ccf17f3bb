//! # Update Monitor Library
//!
//! Keeps a Project Zomboid dedicated server honest about its mods and binary.
//! On every poll the monitor works out whether anything installed is older
//! than what Steam publishes, and if so restarts the server gracefully over
//! RCON, warning connected players first.
//!
//! ## Cycle Overview
//!
//! ### Freshness Check (`updates`)
//! Combines two independent comparisons into one [`updates::UpdateResult`]:
//! - Workshop mods: ids from the server ini, local folder times vs the
//!   catalog's `time_updated` (`workshop`)
//! - Server build: the app manifest's `buildid` vs the branch build id printed
//!   by steamcmd (`server_build`, using the brace-aware readers in `vdf`)
//!
//! Catalog and steamcmd failures never abort a cycle. They turn the affected
//! comparison into "unknown", which is never treated as outdated.
//!
//! ### Decision (`poll`)
//! When something is outdated and an RCON password is configured, the
//! current player count decides the policy:
//! - zero players: save and quit immediately
//! - players online, or count unknown: run the warning timeline
//!
//! ### Restart Sequence (`restart`)
//! A clamped plan (`0 <= countdown <= warn_1 <= delay`) is expanded into a flat
//! list of steps: first warning, wait, final warning, wait, per-second
//! countdown, save, quit. A failed command aborts the rest of the list.
//!
//! ## Execution Model
//!
//! Everything runs sequentially on one task. Network calls, the steamcmd
//! subprocess and the warning waits each hold up the whole cycle until they
//! finish or time out; the monitor has nothing else to do meanwhile.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use monitor::config::load_config;
//! use monitor::poll::run;
//! use std::collections::HashMap;
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = load_config(
//!         Path::new("monitor.conf"),
//!         Some(Path::new("config/rcon.conf")),
//!         &HashMap::new(),
//!     )?;
//!     run(&cfg, true).await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod players;
pub mod poll;
pub mod restart;
pub mod server_build;
pub mod updates;
pub mod vdf;
pub mod workshop;
