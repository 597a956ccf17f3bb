//! One complete freshness check: workshop mods plus the server build.

use crate::config::MonitorConfig;
use crate::error::{ApiError, ConfigError};
use crate::server_build::{manifest_path, query_remote_buildid, read_manifest};
use crate::workshop::{build_mod_statuses, fetch_published_details, read_workshop_ids, ModStatus};
use log::warn;
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateResult {
    pub mods_outdated: bool,
    pub server_outdated: bool,
    pub mod_statuses: Vec<ModStatus>,
    pub local_buildid: Option<String>,
    pub local_last_updated: Option<i64>,
    pub remote_buildid: Option<String>,
    pub manifest_path: PathBuf,
    pub steamcmd_error: Option<String>,
    pub api_error: Option<String>,
}

impl UpdateResult {
    pub fn any_outdated(&self) -> bool {
        self.mods_outdated || self.server_outdated
    }

    pub fn outdated_mods(&self) -> impl Iterator<Item = &ModStatus> {
        self.mod_statuses.iter().filter(|m| m.is_outdated())
    }
}

/// Build ids are opaque tokens: compared as strings, and only when both sides
/// are known
pub fn is_server_outdated(local: Option<&str>, remote: Option<&str>) -> bool {
    matches!((local, remote), (Some(l), Some(r)) if l != r)
}

fn http_client(cfg: &MonitorConfig) -> Result<reqwest::Client, ApiError> {
    let client = reqwest::Client::builder()
        .user_agent(concat!("pz-update-monitor/", env!("CARGO_PKG_VERSION")))
        .timeout(cfg.steam_api_timeout())
        .build()?;
    Ok(client)
}

/// Runs every check. Only a missing ini aborts; catalog and steamcmd failures
/// are reported on the result and treated as "unknown".
pub async fn check_updates(cfg: &MonitorConfig) -> Result<UpdateResult, ConfigError> {
    let workshop_ids = read_workshop_ids(&cfg.ini_path)?;

    let remote = match http_client(cfg) {
        Ok(client) => {
            fetch_published_details(&client, &cfg.catalog_url, &workshop_ids, cfg.steam_api_timeout())
                .await
        }
        Err(e) => Err(e),
    };
    let (remote, api_error) = match remote {
        Ok(map) => (map, None),
        Err(e) => {
            warn!("Workshop details unavailable: {}", e);
            (HashMap::new(), Some(e.to_string()))
        }
    };

    let mod_statuses = build_mod_statuses(&workshop_ids, &remote, &cfg.steamapps_dir);
    let mods_outdated = mod_statuses.iter().any(ModStatus::is_outdated);

    let manifest_path = manifest_path(&cfg.steamapps_dir);
    let manifest = read_manifest(&manifest_path);

    let (remote_buildid, steamcmd_error) = match query_remote_buildid(
        &cfg.steamcmd_path,
        &cfg.steam_branch,
        cfg.steamcmd_timeout(),
        cfg.steamcmd_dump_path.as_deref(),
    )
    .await
    {
        Ok(buildid) => (Some(buildid), None),
        Err(e) => (None, Some(e.to_string())),
    };

    let server_outdated =
        is_server_outdated(manifest.buildid.as_deref(), remote_buildid.as_deref());

    Ok(UpdateResult {
        mods_outdated,
        server_outdated,
        mod_statuses,
        local_buildid: manifest.buildid,
        local_last_updated: manifest.last_updated,
        remote_buildid,
        manifest_path,
        steamcmd_error,
        api_error,
    })
}
