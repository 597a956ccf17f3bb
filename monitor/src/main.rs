use clap::Parser;
use monitor::config::load_config;
use monitor::logging::init_logging;
use monitor::poll::run;
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Project Zomboid update monitor", long_about = None)]
struct Args {
    /// Path to monitor.conf
    #[arg(long, default_value = "monitor.conf")]
    config: PathBuf,

    /// Path to rcon.conf, read before monitor.conf
    #[arg(long, default_value = "config/rcon.conf")]
    rcon: PathBuf,

    /// Run a single check and exit
    #[arg(long)]
    once: bool,

    /// Override a config key, e.g. --set SteamBranch=public
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_override)]
    overrides: Vec<(String, String)>,
}

fn parse_override(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", raw))?;
    Ok((key.trim().to_string(), value.trim().to_string()))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let overrides: HashMap<String, String> = args.overrides.into_iter().collect();
    let cfg = load_config(&args.config, Some(&args.rcon), &overrides)?;

    init_logging(cfg.log_path.as_deref())?;

    run(&cfg, args.once).await;

    Ok(())
}
