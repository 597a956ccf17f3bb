//! Player count from the server's `players` command output.

use rcon::{CommandSink, RconError};

const HEADER: &str = "players connected";

/// Reads `N` out of `Players connected (N)` anywhere in the text
fn header_count(response: &str) -> Option<u32> {
    let lower = response.to_ascii_lowercase();
    let mut search_from = 0;

    while let Some(found) = lower[search_from..].find(HEADER) {
        let after = search_from + found + HEADER.len();
        search_from = after;

        let rest = lower[after..].trim_start();
        let Some(rest) = rest.strip_prefix('(') else {
            continue;
        };
        let digits_end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        if digits_end == 0 || !rest[digits_end..].starts_with(')') {
            continue;
        }
        if let Ok(count) = rest[..digits_end].parse() {
            return Some(count);
        }
    }
    None
}

/// Player count from a `players` reply.
///
/// Prefers the `Players connected (N)` header; otherwise counts `-` listing
/// lines. `None` when neither is present.
pub fn parse_player_count(response: &str) -> Option<u32> {
    if response.is_empty() {
        return None;
    }

    if let Some(count) = header_count(response) {
        return Some(count);
    }

    let listed = response
        .lines()
        .filter(|line| line.trim().starts_with('-'))
        .count();
    (listed > 0).then_some(listed as u32)
}

pub async fn get_player_count<C: CommandSink>(
    rcon: &C,
    players_command: &str,
) -> Result<Option<u32>, RconError> {
    let response = rcon.send_command(players_command).await?;
    Ok(parse_player_count(&response))
}
