//! Poll loop: check, decide, and restart when something is outdated.

use crate::config::MonitorConfig;
use crate::logging::format_ts;
use crate::players::get_player_count;
use crate::restart::{run_restart_sequence, Sleeper, TokioSleeper};
use crate::updates::{check_updates, UpdateResult};
use log::{debug, error, info, warn};
use rcon::{CommandSink, RconClient};

/// What a single cycle ended up doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The check itself could not run (e.g. missing ini)
    CheckFailed,
    UpToDate,
    /// Outdated, but there is no way to reach the server
    MissingPassword,
    PlayerQueryFailed,
    Restarted { immediate: bool },
    RestartFailed,
}

pub fn log_update_result(cfg: &MonitorConfig, result: &UpdateResult) {
    let total = result.mod_statuses.len();
    let outdated: Vec<_> = result.outdated_mods().collect();

    if total == 0 {
        info!("No WorkshopItems found in ini.");
    } else {
        info!("Workshop mods: total={} outdated={}", total, outdated.len());
    }

    for status in outdated {
        info!(
            "Mod outdated id={} local={} version={} remote={} title={}",
            status.workshop_id,
            format_ts(status.local_mtime),
            status.local_version.as_deref().unwrap_or("n/a"),
            format_ts(status.remote_time_updated),
            status.remote_title.as_deref().unwrap_or("n/a")
        );
    }

    info!(
        "Server buildid local={} remote={} branch={} manifest_updated={}",
        result.local_buildid.as_deref().unwrap_or("n/a"),
        result.remote_buildid.as_deref().unwrap_or("n/a"),
        cfg.steam_branch,
        format_ts(result.local_last_updated)
    );

    if let Some(e) = &result.steamcmd_error {
        warn!("steamcmd error: {}", e);
    }
    if let Some(e) = &result.api_error {
        warn!("Workshop API error: {}", e);
    }
}

/// One check-and-act cycle. Every failure is logged here; nothing propagates.
pub async fn run_once<C, S>(cfg: &MonitorConfig, rcon: &C, sleeper: &mut S) -> CycleOutcome
where
    C: CommandSink,
    S: Sleeper,
{
    info!("Starting update check.");

    let result = match check_updates(cfg).await {
        Ok(result) => result,
        Err(e) => {
            error!("Update check failed: {}", e);
            return CycleOutcome::CheckFailed;
        }
    };

    log_update_result(cfg, &result);

    if !result.any_outdated() {
        info!("No updates detected.");
        return CycleOutcome::UpToDate;
    }

    if cfg.rcon_password.is_empty() {
        warn!("RCON password missing. Set RCONPassword in config/rcon.conf or monitor.conf.");
        return CycleOutcome::MissingPassword;
    }

    let player_count = match get_player_count(rcon, &cfg.players_command).await {
        Ok(count) => count,
        Err(e) => {
            error!("RCON error while checking players: {}", e);
            return CycleOutcome::PlayerQueryFailed;
        }
    };

    match player_count {
        Some(count) => info!("Players connected: {}", count),
        None => info!("Player count unknown. Using restart timer."),
    }

    let immediate = player_count == Some(0);
    match run_restart_sequence(rcon, cfg, sleeper, immediate).await {
        Ok(()) => CycleOutcome::Restarted { immediate },
        Err(e) => {
            error!("RCON error during restart sequence: {}", e);
            CycleOutcome::RestartFailed
        }
    }
}

/// Runs cycles forever, or once when `once` is set
pub async fn run(cfg: &MonitorConfig, once: bool) {
    let rcon = RconClient::new(
        &cfg.rcon_host,
        cfg.rcon_port,
        &cfg.rcon_password,
        cfg.rcon_timeout(),
    );
    let mut sleeper = TokioSleeper;

    info!("Monitor started.");
    loop {
        let outcome = run_once(cfg, &rcon, &mut sleeper).await;
        debug!("Cycle finished: {:?}", outcome);

        if once {
            break;
        }
        sleeper.sleep(cfg.check_interval()).await;
    }
    info!("Monitor stopped.");
}
