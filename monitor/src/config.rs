//! Monitor configuration loaded from `Key=Value` files.
//!
//! Values are layered: `rcon.conf` first, then `monitor.conf`, then command
//! line overrides. Relative paths resolve against the directory holding
//! `monitor.conf`. Unparseable numbers silently keep their default.

use crate::error::ConfigError;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CATALOG_URL: &str =
    "https://api.steampowered.com/ISteamRemoteStorage/GetPublishedFileDetails/v1/";

/// Everything the monitor needs, resolved once at startup and then only read
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    pub ini_path: PathBuf,
    pub steamapps_dir: PathBuf,
    pub steamcmd_path: PathBuf,
    pub steam_branch: String,
    pub check_interval_sec: u64,
    pub restart_delay_sec: i64,
    pub warn_1_min_sec: i64,
    pub countdown_sec: i64,
    pub rcon_host: String,
    pub rcon_port: u16,
    pub rcon_password: String,
    pub rcon_timeout_sec: f64,
    pub steam_api_timeout_sec: u64,
    pub steamcmd_timeout_sec: u64,
    pub steamcmd_dump_path: Option<PathBuf>,
    pub catalog_url: String,
    pub msg_restart_5min: String,
    pub msg_restart_1min: String,
    pub msg_countdown: String,
    pub save_command: String,
    pub quit_command: String,
    pub players_command: String,
    pub log_path: Option<PathBuf>,
}

impl MonitorConfig {
    /// Builds a config from already-merged key/value pairs
    pub fn from_values(data: &HashMap<String, String>, base_dir: &Path) -> Self {
        let text = |key: &str, default: &str| -> String {
            data.get(key).cloned().unwrap_or_else(|| default.to_string())
        };

        Self {
            ini_path: resolve_path(&text("IniPath", "Zomboid/Server/servertest.ini"), base_dir),
            steamapps_dir: resolve_path(&text("SteamappsDir", "serverfiles/steamapps"), base_dir),
            steamcmd_path: resolve_path(&text("SteamcmdPath", "steamcmd/steamcmd.sh"), base_dir),
            steam_branch: text("SteamBranch", "unstable"),
            check_interval_sec: parse_or(data.get("CheckIntervalSec"), 300),
            restart_delay_sec: parse_or(data.get("RestartDelaySec"), 300),
            warn_1_min_sec: parse_or(data.get("Warn1MinSec"), 60),
            countdown_sec: parse_or(data.get("CountdownSec"), 10),
            rcon_host: text("RCONHost", "127.0.0.1"),
            rcon_port: parse_or(data.get("RCONPort"), 27015),
            rcon_password: text("RCONPassword", ""),
            rcon_timeout_sec: parse_or(data.get("RCONTimeoutSec"), 5.0),
            steam_api_timeout_sec: parse_or(data.get("SteamApiTimeoutSec"), 25),
            steamcmd_timeout_sec: parse_or(data.get("SteamcmdTimeoutSec"), 180),
            steamcmd_dump_path: optional_path(
                data.get("SteamcmdDumpPath")
                    .map(String::as_str)
                    .or(Some("steamcmd_appinfo_380870.txt")),
                base_dir,
            ),
            catalog_url: text("CatalogUrl", DEFAULT_CATALOG_URL),
            msg_restart_5min: text("MsgRestart5Min", "Server will restart in 5 minutes."),
            msg_restart_1min: text("MsgRestart1Min", "Server will restart in 1 minute."),
            msg_countdown: text("MsgCountdown", "Restart in {seconds} seconds."),
            save_command: text("SaveCommand", "save"),
            quit_command: text("QuitCommand", "quit"),
            players_command: text("PlayersCommand", "players"),
            log_path: optional_path(
                data.get("LogPath").map(String::as_str).or(Some("monitor.log")),
                base_dir,
            ),
        }
    }

    pub fn rcon_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.rcon_timeout_sec).unwrap_or(Duration::from_secs(5))
    }

    pub fn steam_api_timeout(&self) -> Duration {
        Duration::from_secs(self.steam_api_timeout_sec)
    }

    pub fn steamcmd_timeout(&self) -> Duration {
        Duration::from_secs(self.steamcmd_timeout_sec)
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_sec)
    }
}

/// Loads and merges the config files plus overrides.
///
/// Missing files contribute nothing; unreadable ones are an error.
pub fn load_config(
    config_path: &Path,
    rcon_path: Option<&Path>,
    overrides: &HashMap<String, String>,
) -> Result<MonitorConfig, ConfigError> {
    let config_path = absolute(config_path);
    let base_dir = config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let mut data = HashMap::new();
    if let Some(rcon_path) = rcon_path {
        data.extend(load_kv_file(rcon_path)?);
    }
    data.extend(load_kv_file(&config_path)?);
    data.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));

    Ok(MonitorConfig::from_values(&data, &base_dir))
}

/// Reads `Key=Value` lines, skipping blanks and `#`/`;` comments
pub fn load_kv_file(path: &Path) -> Result<HashMap<String, String>, ConfigError> {
    match read_text(path) {
        Ok(text) => Ok(parse_kv(&text)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(HashMap::new()),
        Err(source) => Err(ConfigError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

pub fn parse_kv(text: &str) -> HashMap<String, String> {
    let mut data = HashMap::new();
    for raw_line in text.lines() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            data.insert(key.trim().to_string(), value.trim().to_string());
        }
    }
    data
}

/// Reads a text file, replacing invalid UTF-8 instead of failing
pub fn read_text(path: &Path) -> io::Result<String> {
    let bytes = fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn parse_or<T: std::str::FromStr>(value: Option<&String>, default: T) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

pub fn resolve_path(value: &str, base_dir: &Path) -> PathBuf {
    let path = Path::new(value);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

fn optional_path(value: Option<&str>, base_dir: &Path) -> Option<PathBuf> {
    let raw = value?.trim();
    if raw.is_empty() || matches!(raw.to_ascii_lowercase().as_str(), "none" | "off" | "false") {
        return None;
    }
    Some(resolve_path(raw, base_dir))
}
