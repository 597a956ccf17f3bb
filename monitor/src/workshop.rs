//! Workshop mod freshness: ids from the server ini, remote update times from
//! the published file details API, local times from the workshop content tree.

use crate::config::read_text;
use crate::error::{ApiError, ConfigError};
use log::debug;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, UNIX_EPOCH};

/// App id whose workshop content folder holds the server's mods
pub const WORKSHOP_APP_ID: u32 = 108600;

/// What the catalog knows about one workshop item
#[derive(Debug, Clone, PartialEq)]
pub struct ModRemoteInfo {
    pub workshop_id: String,
    pub title: Option<String>,
    pub time_updated: Option<i64>,
    pub result: i64,
}

/// Local vs remote freshness of one workshop item
#[derive(Debug, Clone, PartialEq)]
pub struct ModStatus {
    pub workshop_id: String,
    pub local_mtime: Option<i64>,
    /// Version declared in the first `mod.info` that carries one
    pub local_version: Option<String>,
    pub remote_time_updated: Option<i64>,
    pub remote_title: Option<String>,
}

impl ModStatus {
    /// Outdated only when the remote time is known and newer than (or lacking)
    /// a local one. An unknown remote time never triggers a restart.
    pub fn is_outdated(&self) -> bool {
        match (self.local_mtime, self.remote_time_updated) {
            (_, None) => false,
            (None, Some(_)) => true,
            (Some(local), Some(remote)) => remote > local,
        }
    }
}

/// Extracts the unique numeric ids of the first `WorkshopItems=` line,
/// keeping first-seen order
pub fn parse_workshop_ids(ini_text: &str) -> Vec<String> {
    let raw = ini_text.lines().find_map(|line| {
        let (key, value) = line.split_once('=')?;
        key.trim().eq_ignore_ascii_case("WorkshopItems").then_some(value.trim())
    });

    let Some(raw) = raw else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    raw.split(';')
        .map(str::trim)
        .filter(|part| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()))
        .filter(|part| seen.insert(part.to_string()))
        .map(str::to_string)
        .collect()
}

/// Reads the ini and returns its workshop ids. The ini must exist.
pub fn read_workshop_ids(ini_path: &Path) -> Result<Vec<String>, ConfigError> {
    match read_text(ini_path) {
        Ok(text) => Ok(parse_workshop_ids(&text)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            Err(ConfigError::MissingIni(ini_path.to_path_buf()))
        }
        Err(source) => Err(ConfigError::Read {
            path: ini_path.to_path_buf(),
            source,
        }),
    }
}

/// A catalog field that arrives as either a JSON number or a numeric string
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StrOrNum {
    Num(i64),
    Str(String),
}

impl StrOrNum {
    fn as_i64(&self) -> Option<i64> {
        match self {
            StrOrNum::Num(n) => Some(*n),
            StrOrNum::Str(s) => s.trim().parse().ok(),
        }
    }

    fn as_id(&self) -> Option<String> {
        let id = match self {
            StrOrNum::Num(n) => n.to_string(),
            StrOrNum::Str(s) => s.trim().to_string(),
        };
        (!id.is_empty()).then_some(id)
    }
}

/// Top level of a `GetPublishedFileDetails` reply
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DetailsEnvelope {
    pub response: DetailsResponse,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DetailsResponse {
    pub publishedfiledetails: Vec<PublishedFileDetail>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PublishedFileDetail {
    pub publishedfileid: Option<StrOrNum>,
    pub result: Option<StrOrNum>,
    pub title: Option<String>,
    pub time_updated: Option<StrOrNum>,
}

/// Maps `response.publishedfiledetails[]` by id.
///
/// Items whose `result` is not 1 are kept but carry no title or time.
pub fn parse_published_details(envelope: DetailsEnvelope) -> HashMap<String, ModRemoteInfo> {
    let mut out = HashMap::new();
    for item in envelope.response.publishedfiledetails {
        let Some(workshop_id) = item.publishedfileid.as_ref().and_then(StrOrNum::as_id) else {
            continue;
        };
        let result = item.result.as_ref().and_then(StrOrNum::as_i64).unwrap_or(0);

        let info = if result == 1 {
            ModRemoteInfo {
                workshop_id: workshop_id.clone(),
                title: item.title,
                time_updated: item
                    .time_updated
                    .as_ref()
                    .and_then(StrOrNum::as_i64)
                    .filter(|t| *t != 0),
                result,
            }
        } else {
            ModRemoteInfo {
                workshop_id: workshop_id.clone(),
                title: None,
                time_updated: None,
                result,
            }
        };
        out.insert(workshop_id, info);
    }
    out
}

/// One batched, form-encoded request for every id
pub async fn fetch_published_details(
    client: &reqwest::Client,
    url: &str,
    workshop_ids: &[String],
    timeout: Duration,
) -> Result<HashMap<String, ModRemoteInfo>, ApiError> {
    if workshop_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let mut form = vec![("itemcount".to_string(), workshop_ids.len().to_string())];
    for (i, id) in workshop_ids.iter().enumerate() {
        form.push((format!("publishedfileids[{}]", i), id.clone()));
    }

    let response = client
        .post(url)
        .timeout(timeout)
        .form(&form)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(ApiError::Status(status.as_u16()));
    }

    let envelope: DetailsEnvelope = response.json().await?;
    Ok(parse_published_details(envelope))
}

pub fn workshop_item_dir(steamapps_dir: &Path, workshop_id: &str) -> PathBuf {
    steamapps_dir
        .join("workshop")
        .join("content")
        .join(WORKSHOP_APP_ID.to_string())
        .join(workshop_id)
}

fn mtime_secs(path: &Path) -> Option<i64> {
    let modified = fs::metadata(path).ok()?.modified().ok()?;
    let secs = modified.duration_since(UNIX_EPOCH).ok()?.as_secs();
    i64::try_from(secs).ok()
}

/// Mod folders under `<item>/mods/`, sorted by name
fn mod_folders(item_dir: &Path) -> Vec<PathBuf> {
    let mut folders: Vec<PathBuf> = fs::read_dir(item_dir.join("mods"))
        .into_iter()
        .flatten()
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    folders.sort();
    folders
}

/// Newest `mod.info` (or mod folder) time under `<item>/mods/*`, falling back
/// to the item folder itself
pub fn local_mod_mtime(steamapps_dir: &Path, workshop_id: &str) -> Option<i64> {
    let base = workshop_item_dir(steamapps_dir, workshop_id);

    let newest = mod_folders(&base)
        .into_iter()
        .filter_map(|mod_folder| {
            let mod_info = mod_folder.join("mod.info");
            if mod_info.exists() {
                mtime_secs(&mod_info)
            } else {
                mtime_secs(&mod_folder)
            }
        })
        .max();

    newest.or_else(|| mtime_secs(&base))
}

const VERSION_KEYS: [&str; 4] = ["version", "modversion", "workshopversion", "build"];

/// Version from `mod.info` text.
///
/// Keys are tried in priority order, each matched case-insensitively against
/// every line. The first key with a non-empty value decides; surrounding quotes
/// are stripped and a value that is only quotes counts as no version.
pub fn parse_mod_info_version(text: &str) -> Option<String> {
    for key in VERSION_KEYS {
        let found = text.lines().find_map(|line| {
            let (k, v) = line.split_once('=')?;
            let v = v.trim();
            (k.trim().eq_ignore_ascii_case(key) && !v.is_empty()).then_some(v)
        });
        if let Some(value) = found {
            let value = value.trim_matches('"').trim_matches('\'');
            return (!value.is_empty()).then(|| value.to_string());
        }
    }
    None
}

/// First declared version across the item's mod folders, in name order
pub fn local_mod_version(steamapps_dir: &Path, workshop_id: &str) -> Option<String> {
    let base = workshop_item_dir(steamapps_dir, workshop_id);

    mod_folders(&base).into_iter().find_map(|mod_folder| {
        let text = read_text(&mod_folder.join("mod.info")).ok()?;
        parse_mod_info_version(&text)
    })
}

/// Combines the remote map with local times, in ini order
pub fn build_mod_statuses(
    workshop_ids: &[String],
    remote: &HashMap<String, ModRemoteInfo>,
    steamapps_dir: &Path,
) -> Vec<ModStatus> {
    workshop_ids
        .iter()
        .map(|id| {
            let info = remote.get(id);
            let status = ModStatus {
                workshop_id: id.clone(),
                local_mtime: local_mod_mtime(steamapps_dir, id),
                local_version: local_mod_version(steamapps_dir, id),
                remote_time_updated: info.and_then(|i| i.time_updated),
                remote_title: info.and_then(|i| i.title.clone()),
            };
            debug!(
                "Mod {} local={:?} remote={:?}",
                id, status.local_mtime, status.remote_time_updated
            );
            status
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(payload: serde_json::Value) -> DetailsEnvelope {
        serde_json::from_value(payload).unwrap()
    }

    fn status(local: Option<i64>, remote: Option<i64>) -> ModStatus {
        ModStatus {
            workshop_id: "1".to_string(),
            local_mtime: local,
            local_version: None,
            remote_time_updated: remote,
            remote_title: None,
        }
    }

    #[test]
    fn test_outdated_predicate() {
        assert!(status(None, Some(1000)).is_outdated());
        assert!(!status(Some(1000), Some(1000)).is_outdated());
        assert!(status(Some(1000), Some(1001)).is_outdated());
        assert!(!status(Some(1000), None).is_outdated());
        assert!(!status(None, None).is_outdated());
    }

    #[test]
    fn test_parse_workshop_ids() {
        let ini = "PVP=true\nworkshopitems = 2169435993; 2392709985;abc;;2169435993;498441420\nMods=a;b\n";
        assert_eq!(
            parse_workshop_ids(ini),
            vec!["2169435993", "2392709985", "498441420"]
        );
    }

    #[test]
    fn test_parse_workshop_ids_missing_or_empty() {
        assert!(parse_workshop_ids("Mods=a\n").is_empty());
        assert!(parse_workshop_ids("WorkshopItems=\n").is_empty());
        assert!(parse_workshop_ids("WorkshopItems=\nWorkshopItems=42\n").is_empty());
    }

    #[test]
    fn test_read_workshop_ids_requires_ini() {
        let dir = tempfile::tempdir().unwrap();
        let result = read_workshop_ids(&dir.path().join("servertest.ini"));
        assert!(matches!(result, Err(ConfigError::MissingIni(_))));
    }

    #[test]
    fn test_parse_published_details() {
        let payload = json!({
            "response": {
                "result": 1,
                "resultcount": 3,
                "publishedfiledetails": [
                    {"publishedfileid": "111", "result": 1, "title": "Better Sorting", "time_updated": 1700000000},
                    {"publishedfileid": "222", "result": 9},
                    {"publishedfileid": 333, "result": "1", "title": "Numeric Id", "time_updated": "1700000500"},
                    {"result": 1}
                ]
            }
        });

        let map = parse_published_details(envelope(payload));
        assert_eq!(map.len(), 3);
        assert_eq!(map["111"].time_updated, Some(1_700_000_000));
        assert_eq!(map["111"].title.as_deref(), Some("Better Sorting"));
        assert_eq!(map["222"].time_updated, None);
        assert_eq!(map["222"].title, None);
        assert_eq!(map["333"].time_updated, Some(1_700_000_500));
    }

    #[test]
    fn test_parse_published_details_unexpected_shape() {
        assert!(parse_published_details(envelope(json!({"error": "nope"}))).is_empty());
        assert!(parse_published_details(envelope(json!({"response": {}}))).is_empty());
    }

    #[tokio::test]
    async fn test_no_request_for_empty_list() {
        let client = reqwest::Client::new();
        let map = fetch_published_details(
            &client,
            "http://127.0.0.1:9/unused",
            &[],
            Duration::from_secs(1),
        )
        .await
        .unwrap();
        assert!(map.is_empty());
    }

    #[test]
    fn test_local_mtime_layouts() {
        let dir = tempfile::tempdir().unwrap();
        let steamapps = dir.path();

        assert_eq!(local_mod_mtime(steamapps, "1"), None);

        let bare = workshop_item_dir(steamapps, "2");
        fs::create_dir_all(&bare).unwrap();
        assert!(local_mod_mtime(steamapps, "2").is_some());

        let with_mods = workshop_item_dir(steamapps, "3").join("mods");
        fs::create_dir_all(with_mods.join("ModA")).unwrap();
        fs::create_dir_all(with_mods.join("ModB")).unwrap();
        fs::write(with_mods.join("ModA").join("mod.info"), "name=A\n").unwrap();
        fs::write(with_mods.join("stray.txt"), "").unwrap();

        let expected = [
            mtime_secs(&with_mods.join("ModA").join("mod.info")).unwrap(),
            mtime_secs(&with_mods.join("ModB")).unwrap(),
        ]
        .into_iter()
        .max();
        assert_eq!(local_mod_mtime(steamapps, "3"), expected);
    }

    #[test]
    fn test_mod_info_version_key_order() {
        let text = "name=Hydrocraft\nbuild=41\nmodversion=2.3\n";
        assert_eq!(parse_mod_info_version(text).as_deref(), Some("2.3"));

        let text = "  BUILD = 42\nVersion=\"1.0.4\"\n";
        assert_eq!(parse_mod_info_version(text).as_deref(), Some("1.0.4"));

        assert_eq!(
            parse_mod_info_version("workshopversion='7b'\n").as_deref(),
            Some("7b")
        );
        assert_eq!(parse_mod_info_version("version=\"\"\nbuild=9\n"), None);
        assert_eq!(parse_mod_info_version("name=NoVersion\nversions=3\n"), None);
    }

    #[test]
    fn test_local_version_first_folder_wins() {
        let dir = tempfile::tempdir().unwrap();
        let mods = workshop_item_dir(dir.path(), "5").join("mods");
        fs::create_dir_all(mods.join("AModNoInfo")).unwrap();
        fs::create_dir_all(mods.join("BMod")).unwrap();
        fs::create_dir_all(mods.join("CMod")).unwrap();
        fs::write(mods.join("BMod").join("mod.info"), "name=B\nmodversion=\"1.2\"\n").unwrap();
        fs::write(mods.join("CMod").join("mod.info"), "version=9.9\n").unwrap();

        assert_eq!(local_mod_version(dir.path(), "5").as_deref(), Some("1.2"));
        assert_eq!(local_mod_version(dir.path(), "6"), None);
    }

    #[test]
    fn test_build_mod_statuses_keeps_order() {
        let dir = tempfile::tempdir().unwrap();
        let ids = vec!["20".to_string(), "10".to_string()];
        let mut remote = HashMap::new();
        remote.insert(
            "10".to_string(),
            ModRemoteInfo {
                workshop_id: "10".to_string(),
                title: Some("Ten".to_string()),
                time_updated: Some(5),
                result: 1,
            },
        );

        let statuses = build_mod_statuses(&ids, &remote, dir.path());
        assert_eq!(statuses[0].workshop_id, "20");
        assert!(!statuses[0].is_outdated());
        assert_eq!(statuses[1].remote_title.as_deref(), Some("Ten"));
        assert!(statuses[1].is_outdated());
    }
}
