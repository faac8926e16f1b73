use clap::{Args, Parser, Subcommand};
use commonsfish::{channel_url_for_origin, ClientConfig, ConnectionEvent};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

mod bot;
mod watch;

#[derive(Parser)]
#[command(name = "commonsfish", version, about = "Player bot and observer for commons fishing rooms")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Join a room and sort fish automatically every season.
    Play(bot::PlayArgs),
    /// Observe a room and print the scoreboard as it changes.
    Watch(watch::WatchArgs),
}

#[derive(Args, Clone, Debug)]
struct RoomArgs {
    /// Page origin (http/https) or channel url (ws/wss).
    #[arg(long, env = "COMMONS_WS_URL", default_value = "ws://localhost:8000/ws")]
    url: String,
    #[arg(long, env = "COMMONS_ROOM")]
    room: String,
    #[arg(long, default_value_t = 1500)]
    reconnect_ms: u64,
    /// Give up after this many reconnects in a row. Unlimited when unset.
    #[arg(long)]
    max_reconnects: Option<u32>,
}

impl RoomArgs {
    fn client_config(&self) -> Result<ClientConfig, commonsfish::ClientError> {
        let url = channel_url_for_origin(&self.url)?;
        Ok(ClientConfig::new(url)
            .with_reconnect_delay(Duration::from_millis(self.reconnect_ms))
            .with_max_reconnect_attempts(self.max_reconnects))
    }
}

/// Prints connection-level events shared by both subcommands. Returns
/// false once the driver is done.
fn report_link<E>(event: &ConnectionEvent<E>) -> bool {
    match event {
        ConnectionEvent::Advisory(message) => eprintln!("room: {message}"),
        ConnectionEvent::Reconnecting { attempt, delay } => {
            eprintln!("connection lost, retry {attempt} in {}ms", delay.as_millis())
        }
        ConnectionEvent::GaveUp { attempts } => {
            eprintln!("giving up after {attempts} reconnect attempts");
            return false;
        }
        ConnectionEvent::Stopped => return false,
        _ => {}
    }
    true
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Play(args) => bot::run(args).await,
        Commands::Watch(args) => watch::run(args).await,
    }
}
