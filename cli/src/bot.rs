use super::*;
use commonsfish::{ConnectionManager, PlayerCommand, PlayerEvent, SessionView, StatusLine};
use commonsfish_core::TokenId;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tokio::time::sleep;
use tracing::debug;

#[derive(Args, Clone, Debug)]
pub(super) struct PlayArgs {
    #[command(flatten)]
    room: RoomArgs,
    #[arg(long, env = "COMMONS_NAME")]
    name: String,
    /// Fish to sort each season before submitting.
    #[arg(long, default_value_t = 4)]
    sort: usize,
    #[arg(long, default_value_t = 400)]
    think_min_ms: u64,
    #[arg(long, default_value_t = 1500)]
    think_max_ms: u64,
    #[arg(long)]
    seed: Option<u64>,
}

fn validate(args: &PlayArgs) -> Result<(), Box<dyn std::error::Error>> {
    if args.think_max_ms < args.think_min_ms {
        return Err("invalid think-time range".into());
    }
    Ok(())
}

/// Picks up to `count` tokens and the drop point inside their matching net.
fn choose_moves(view: &SessionView, count: usize, rng: &mut StdRng) -> Vec<(TokenId, (f32, f32))> {
    let mut candidates: Vec<_> = view
        .tokens
        .iter()
        .filter(|token| token.zone.is_none())
        .filter_map(|token| {
            view.zones
                .iter()
                .find(|zone| zone.category == token.category)
                .map(|zone| (token.id, zone.rect.center()))
        })
        .collect();
    candidates.shuffle(rng);
    candidates.truncate(count);
    candidates
}

/// Tracks which season the bot has played. A season only counts once its
/// submit is accepted, so a rejected one gets played again.
#[derive(Clone, Copy, Debug, Default)]
struct Turns {
    played: Option<u32>,
    in_flight: Option<u32>,
}

impl Turns {
    fn begin(&mut self, round_num: u32) -> bool {
        if self.played == Some(round_num) || self.in_flight == Some(round_num) {
            return false;
        }
        self.in_flight = Some(round_num);
        true
    }

    fn submitted(&mut self, round_num: u32) {
        self.played = Some(round_num);
        self.in_flight = None;
    }

    fn rejected(&mut self) {
        self.in_flight = None;
    }
}

fn print_season_end(view: &SessionView) {
    if let Some(results) = &view.results {
        println!("{results}");
    }
    if !view.roster.is_empty() {
        println!("players: {}", commonsfish::roster_line(&view.roster));
    }
}

fn print_leaderboard(view: &SessionView) {
    println!("final standings:");
    for entry in &view.leaderboard {
        println!("  {}. {} {}", entry.rank, entry.name, entry.total);
    }
}

pub(super) async fn run(args: PlayArgs) -> Result<(), Box<dyn std::error::Error>> {
    validate(&args)?;
    let seed = args.seed.unwrap_or_else(|| rand::rng().random());
    let mut rng = StdRng::seed_from_u64(seed);
    let config = args.room.client_config()?.with_board_seed(seed);
    let (handle, mut events) = ConnectionManager::join(config, &args.room.room, &args.name)?;

    let mut turns = Turns::default();
    while let Some(event) = events.recv().await {
        let event = match event {
            ConnectionEvent::Session(event) => event,
            ConnectionEvent::Acknowledged { player_id } => {
                println!(
                    "joined room {} as {}",
                    args.room.room,
                    player_id.map(|id| id.to_string()).unwrap_or_else(|| args.name.clone())
                );
                continue;
            }
            other => {
                if !report_link(&other) {
                    break;
                }
                continue;
            }
        };
        match event {
            PlayerEvent::Synced { outcome, view } => {
                if outcome.is_boundary() {
                    if let (Some(round), Some(total)) = (view.round_num, view.rounds_total) {
                        println!(
                            "season {round}/{total}: stock {}",
                            view.stock.unwrap_or_default()
                        );
                    }
                    print_season_end(&view);
                }
                if view.status == StatusLine::Finished {
                    print_leaderboard(&view);
                    break;
                }
                if view.can_submit() && turns.begin(outcome.round_num) {
                    let think = rng.random_range(args.think_min_ms..=args.think_max_ms);
                    sleep(Duration::from_millis(think)).await;
                    let moves = choose_moves(&view, args.sort, &mut rng);
                    debug!(round = outcome.round_num, think_ms = think, moves = moves.len(), "playing season");
                    for (token, pos) in moves {
                        handle.send(PlayerCommand::Place { token, pos })?;
                    }
                    handle.send(PlayerCommand::Submit)?;
                } else if view.status == StatusLine::Overfished {
                    println!("{}", view.status);
                }
            }
            PlayerEvent::Submitted {
                harvest,
                round_num,
                removed,
                ..
            } => {
                turns.submitted(round_num);
                println!("season {round_num}: harvested {harvest} ({removed} fish sorted)");
            }
            PlayerEvent::SubmitRejected { reason } => {
                turns.rejected();
                eprintln!("submit rejected: {reason}");
            }
            PlayerEvent::Input { .. } | PlayerEvent::Ticked(_) => {}
        }
    }

    handle.shutdown().await;
    Ok(())
}
