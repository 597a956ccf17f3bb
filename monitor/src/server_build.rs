//! Dedicated server build: installed build id from the app manifest, published
//! build id from `steamcmd +app_info_print`.

use crate::config::read_text;
use crate::error::ToolError;
use crate::vdf::{extract_branch_block, find_numeric_value};
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Project Zomboid Dedicated Server
pub const SERVER_APP_ID: u32 = 380870;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ManifestInfo {
    pub buildid: Option<String>,
    pub last_updated: Option<i64>,
}

pub fn manifest_path(steamapps_dir: &Path) -> PathBuf {
    steamapps_dir.join(format!("appmanifest_{}.acf", SERVER_APP_ID))
}

pub fn parse_manifest(text: &str) -> ManifestInfo {
    ManifestInfo {
        buildid: find_numeric_value(text, "buildid", false).map(str::to_string),
        last_updated: find_numeric_value(text, "LastUpdated", false).and_then(|v| v.parse().ok()),
    }
}

/// A missing or unreadable manifest simply means the local build is unknown
pub fn read_manifest(path: &Path) -> ManifestInfo {
    match read_text(path) {
        Ok(text) => parse_manifest(&text),
        Err(e) => {
            debug!("No app manifest at {}: {}", path.display(), e);
            ManifestInfo::default()
        }
    }
}

/// Build id for `branch`, or the first build id anywhere as a weaker fallback
pub fn extract_remote_buildid(output: &str, branch: &str) -> Option<String> {
    let scoped = extract_branch_block(output, branch)
        .and_then(|block| find_numeric_value(block, "buildid", true));

    scoped
        .or_else(|| {
            debug!("Branch '{}' not found in app info, using first buildid", branch);
            find_numeric_value(output, "buildid", true)
        })
        .map(str::to_string)
}

pub fn steamcmd_args(app_id: u32) -> Vec<String> {
    vec![
        "+login".to_string(),
        "anonymous".to_string(),
        "+app_info_update".to_string(),
        "1".to_string(),
        "+app_info_print".to_string(),
        app_id.to_string(),
        "+quit".to_string(),
    ]
}

/// Captured result of one steamcmd run
#[derive(Debug, Clone)]
pub struct ToolRun {
    pub command_line: String,
    pub return_code: Option<i32>,
    /// stdout followed by stderr
    pub output: String,
}

pub async fn run_steamcmd(
    steamcmd_path: &Path,
    app_id: u32,
    timeout: Duration,
) -> Result<ToolRun, ToolError> {
    if !steamcmd_path.exists() {
        return Err(ToolError::NotFound(steamcmd_path.to_path_buf()));
    }

    let args = steamcmd_args(app_id);
    let command_line = format!("{} {}", steamcmd_path.display(), args.join(" "));
    debug!("Running {}", command_line);

    let mut command = Command::new(steamcmd_path);
    command
        .args(&args)
        .stdin(Stdio::null())
        .kill_on_drop(true);

    let output = match tokio::time::timeout(timeout, command.output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => return Err(ToolError::Spawn(e)),
        Err(_) => return Err(ToolError::Timeout(timeout)),
    };

    let text = format!(
        "{}\n{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );

    Ok(ToolRun {
        command_line,
        return_code: output.status.code(),
        output: text,
    })
}

/// Saves the raw tool output for troubleshooting; failures are ignored
pub fn write_dump(dump_path: &Path, run: &ToolRun) {
    let return_code = run
        .return_code
        .map(|c| c.to_string())
        .unwrap_or_else(|| "none".to_string());
    let contents = format!(
        "ReturnCode: {}\nCommand: {}\n\n{}",
        return_code, run.command_line, run.output
    );

    let result = dump_path
        .parent()
        .map_or(Ok(()), fs::create_dir_all)
        .and_then(|_| fs::write(dump_path, contents));
    if let Err(e) = result {
        debug!("Could not write steamcmd dump {}: {}", dump_path.display(), e);
    }
}

/// Asks steamcmd for the build id currently published on `branch`
pub async fn query_remote_buildid(
    steamcmd_path: &Path,
    branch: &str,
    timeout: Duration,
    dump_path: Option<&Path>,
) -> Result<String, ToolError> {
    let run = run_steamcmd(steamcmd_path, SERVER_APP_ID, timeout).await?;

    if let Some(dump_path) = dump_path {
        write_dump(dump_path, &run);
    }

    extract_remote_buildid(&run.output, branch).ok_or(ToolError::BuildIdMissing)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_BRANCHES: &str = r#"
"380870"
{
	"depots"
	{
		"branches"
		{
			"public"
			{
				"buildid"		"100"
			}
			"unstable"
			{
				"buildid"		"200"
			}
		}
	}
}
"#;

    #[test]
    fn test_parse_manifest() {
        let manifest = r#"
"AppState"
{
	"appid"		"380870"
	"LastUpdated"		"1705000000"
	"buildid"		"13010203"
}
"#;
        let info = parse_manifest(manifest);
        assert_eq!(info.buildid.as_deref(), Some("13010203"));
        assert_eq!(info.last_updated, Some(1_705_000_000));
    }

    #[test]
    fn test_missing_manifest_is_unknown() {
        let dir = tempfile::tempdir().unwrap();
        let info = read_manifest(&manifest_path(dir.path()));
        assert_eq!(info, ManifestInfo::default());
    }

    #[test]
    fn test_manifest_path_name() {
        let path = manifest_path(Path::new("/srv/steamapps"));
        assert!(path.ends_with("appmanifest_380870.acf"));
    }

    #[test]
    fn test_remote_buildid_is_branch_scoped() {
        assert_eq!(extract_remote_buildid(TWO_BRANCHES, "unstable").as_deref(), Some("200"));
        assert_eq!(extract_remote_buildid(TWO_BRANCHES, "public").as_deref(), Some("100"));
    }

    #[test]
    fn test_remote_buildid_fallback() {
        assert_eq!(extract_remote_buildid(TWO_BRANCHES, "beta").as_deref(), Some("100"));
        assert_eq!(extract_remote_buildid("Login Failure: timeout", "public"), None);
    }

    #[test]
    fn test_steamcmd_args() {
        assert_eq!(
            steamcmd_args(SERVER_APP_ID).join(" "),
            "+login anonymous +app_info_update 1 +app_info_print 380870 +quit"
        );
    }

    #[tokio::test]
    async fn test_missing_tool() {
        let dir = tempfile::tempdir().unwrap();
        let result = query_remote_buildid(
            &dir.path().join("steamcmd.sh"),
            "public",
            Duration::from_secs(1),
            None,
        )
        .await;
        assert!(matches!(result, Err(ToolError::NotFound(_))));
    }

    #[test]
    fn test_dump_write_failure_is_swallowed() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "").unwrap();

        let run = ToolRun {
            command_line: "steamcmd +quit".to_string(),
            return_code: Some(0),
            output: String::new(),
        };
        write_dump(&blocker.join("dump.txt"), &run);
        assert!(!blocker.join("dump.txt").exists());
    }

    #[cfg(unix)]
    fn fake_tool(dir: &Path, script_body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("steamcmd.sh");
        fs::write(&path, format!("#!/bin/sh\n{}\n", script_body)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_query_writes_dump_and_extracts() {
        let dir = tempfile::tempdir().unwrap();
        let tool = fake_tool(
            dir.path(),
            &format!("echo \"args: $*\" >&2\ncat <<'EOF'\n{}\nEOF", TWO_BRANCHES),
        );
        let dump = dir.path().join("dumps").join("appinfo.txt");

        let buildid = query_remote_buildid(&tool, "unstable", Duration::from_secs(10), Some(&dump))
            .await
            .unwrap();
        assert_eq!(buildid, "200");

        let contents = fs::read_to_string(&dump).unwrap();
        assert!(contents.starts_with("ReturnCode: 0\nCommand: "));
        assert!(contents.contains("args: +login anonymous +app_info_update 1 +app_info_print 380870 +quit"));
        assert!(contents.contains("\"branches\""));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_query_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let tool = fake_tool(dir.path(), "sleep 5");

        let result =
            query_remote_buildid(&tool, "public", Duration::from_millis(200), None).await;
        assert!(matches!(result, Err(ToolError::Timeout(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_output_without_buildid() {
        let dir = tempfile::tempdir().unwrap();
        let tool = fake_tool(dir.path(), "echo 'No subscription'\nexit 5");
        let dump = dir.path().join("appinfo.txt");

        let result = query_remote_buildid(&tool, "public", Duration::from_secs(10), Some(&dump)).await;
        assert!(matches!(result, Err(ToolError::BuildIdMissing)));
        assert!(fs::read_to_string(&dump).unwrap().starts_with("ReturnCode: 5"));
    }
}
