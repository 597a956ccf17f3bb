//! Line logger: `[YYYY-mm-dd HH:MM:SS] message` to stdout and, optionally,
//! appended to a log file.

use env_logger::{Builder, Env, Target};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

/// Writes every line to stdout and to the log file when one is open
struct Tee {
    file: Option<File>,
}

impl Write for Tee {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stdout().write_all(buf)?;
        if let Some(file) = self.file.as_mut() {
            file.write_all(buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stdout().flush()?;
        if let Some(file) = self.file.as_mut() {
            file.flush()?;
        }
        Ok(())
    }
}

fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Installs the global logger. `RUST_LOG` overrides the default `info` level.
pub fn init_logging(log_path: Option<&Path>) -> io::Result<()> {
    let file = log_path.map(open_log_file).transpose()?;

    Builder::from_env(Env::default().default_filter_or("info"))
        .target(Target::Pipe(Box::new(Tee { file })))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.args()
            )
        })
        .try_init()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
}

/// Formats a unix timestamp in local time, `n/a` when absent
pub fn format_ts(ts: Option<i64>) -> String {
    use chrono::TimeZone;

    match ts {
        None | Some(0) => "n/a".to_string(),
        Some(secs) => match chrono::Local.timestamp_opt(secs, 0).single() {
            Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => secs.to_string(),
        },
    }
}
