use clap::Parser;
use std::path::PathBuf;
use tokio::{net::TcpListener, runtime::Runtime, signal};
use tracing::{error, info};

use relay::{config::Config, server};

/// Rendezvous relay for WebRTC offer/answer and ICE candidate exchange.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Port to listen on. Overrides the config file (default 9227).
    port: Option<u16>,
    /// Address to bind (default 0.0.0.0).
    #[arg(long)]
    host: Option<String>,
    /// run with config file: --config config.toml
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if cli.port.is_some() {
        config.port = cli.port;
    }
    if cli.host.is_some() {
        config.host = cli.host;
    }

    tracing_subscriber::fmt().init();
    let rt = Runtime::new()?;
    rt.block_on(async move {
        info!("Starting relay server...");
        match TcpListener::bind(config.bind_addr()).await {
            Ok(listener) => {
                server::run(config, listener, signal::ctrl_c()).await;
                Ok(())
            }
            Err(error) => {
                error!("Bind tcp with error: {:?}", error);
                Err(error)
            }
        }
    })?;

    Ok(())
}
