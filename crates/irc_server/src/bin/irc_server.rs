use std::sync::Arc;

use clap::Parser;
use flexi_logger::{Duplicate, Logger};
use log::info;

use irc_server::clock::{Clock, SystemClock};
use irc_server::config::Config;
use irc_server::registry::Registry;
use irc_server::resolver::{DnsResolver, HostnameResolver};

#[derive(Parser, Debug)]
#[command(name = "irc_server", about = "A pyrcd-compatible IRC server")]
struct Cli {
    /// Directory containing pyrcd.json and the MOTD/rules files it names.
    #[arg(long, default_value = ".")]
    config_dir: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match Config::load(&cli.config_dir) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("startup failed: {e}");
            std::process::exit(1);
        }
    };

    Logger::try_with_str("trace")?
        .log_to_stderr()
        .duplicate_to_stderr(Duplicate::All)
        .start()?;

    let config = Arc::new(config);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let resolver: Arc<dyn HostnameResolver> = Arc::new(DnsResolver::from_system_conf());
    let registry = Registry::new(config, clock, resolver);

    let accept_registry = registry.clone();
    let accept_handle = tokio::spawn(async move { accept_registry.run_accept_loop().await });

    let sweep_registry = registry.clone();
    let sweep_handle = tokio::spawn(async move { sweep_registry.run_sweeper().await });

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    registry.terminate_all();
    accept_handle.abort();
    sweep_handle.abort();

    Ok(())
}
