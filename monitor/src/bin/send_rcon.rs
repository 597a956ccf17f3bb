//! Operator tool: send one RCON command using `rcon.conf` for defaults.

use clap::Parser;
use monitor::config::load_kv_file;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about = "Send an RCON command using config/rcon.conf as defaults", long_about = None)]
struct Args {
    /// Command to send, e.g. servermsg "hello"
    #[arg(required = true, num_args = 1..)]
    command: Vec<String>,

    /// Override host (defaults to RCONHost in rcon.conf)
    #[arg(long)]
    host: Option<String>,

    /// Override port (defaults to RCONPort in rcon.conf)
    #[arg(long)]
    port: Option<u16>,

    /// Override password (defaults to RCONPassword in rcon.conf)
    #[arg(long)]
    password: Option<String>,

    /// Socket timeout in seconds
    #[arg(long, default_value = "5.0")]
    timeout: f64,

    /// Path to rcon.conf
    #[arg(long, default_value = "config/rcon.conf")]
    rcon: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    let cfg = load_kv_file(&args.rcon)?;

    let host = args
        .host
        .or_else(|| cfg.get("RCONHost").cloned())
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let port = args
        .port
        .or_else(|| cfg.get("RCONPort").and_then(|p| p.parse().ok()))
        .unwrap_or(27015);
    let password = args
        .password
        .or_else(|| cfg.get("RCONPassword").cloned())
        .filter(|p| !p.is_empty());

    let Some(password) = password else {
        use clap::CommandFactory;
        Args::command()
            .error(
                clap::error::ErrorKind::MissingRequiredArgument,
                "RCONPassword is required (pass --password or set RCONPassword in rcon.conf)",
            )
            .exit();
    };

    let timeout = Duration::try_from_secs_f64(args.timeout)?;
    let command = args.command.join(" ");

    let response = rcon::send_command(&host, port, &password, &command, timeout).await?;
    if !response.is_empty() {
        println!("{}", response);
    }

    Ok(())
}
