use super::*;
use commonsfish::{ConnectionManager, ObserverEvent, ObserverStatus};

#[derive(Args, Clone, Debug)]
pub(super) struct WatchArgs {
    #[command(flatten)]
    room: RoomArgs,
    #[arg(long, env = "COMMONS_PIN")]
    pin: String,
    /// Keep watching after the room finishes.
    #[arg(long)]
    follow: bool,
}

pub(super) async fn run(args: WatchArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = args.room.client_config()?;
    let (handle, mut events) = ConnectionManager::observe(config, &args.room.room, &args.pin)?;

    while let Some(event) = events.recv().await {
        match event {
            ConnectionEvent::Session(ObserverEvent::Updated {
                new_season,
                summary,
                scoreboard,
            }) => {
                if new_season {
                    println!();
                }
                println!("{summary}");
                for line in &scoreboard {
                    println!("  {line}");
                }
                if summary.status == ObserverStatus::Finished && !args.follow {
                    break;
                }
            }
            other => {
                if !report_link(&other) {
                    break;
                }
            }
        }
    }

    handle.shutdown().await;
    Ok(())
}
