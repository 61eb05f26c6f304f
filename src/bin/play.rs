use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::signal;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use ttt_engine::bot;
use ttt_engine::core::{GameState, Mark};
use ttt_engine::session::{GameSession, SessionConfig, Snapshot};
use ttt_engine::storage::{JsonFileStore, MemoryStore, ScoreStore};

/// Plays full games against the built-in computer opponent, printing every
/// status transition.
#[derive(Debug, Parser)]
#[command(name = "play")]
struct Args {
    /// How many games to play before exiting (0 = until interrupted)
    #[arg(long, default_value_t = 3)]
    games: u32,
    /// Seed for both sides; random when omitted
    #[arg(long)]
    seed: Option<u64>,
    /// Thinking delay of the computer opponent, in milliseconds
    #[arg(long, default_value_t = 500)]
    thinking_delay_ms: u64,
    /// Auto-reset countdown tick, in milliseconds
    #[arg(long, default_value_t = 1000)]
    countdown_tick_ms: u64,
    /// Directory for the score file; scores are not persisted when omitted
    #[arg(long, env = "TTT_DATA_DIR")]
    data_dir: Option<PathBuf>,
    /// User id the score is keyed by
    #[arg(long, default_value = "guest")]
    user: String,
}

/// Drives the `X` side through the human input path with the same heuristic
/// policy the computer uses for `O`.
fn drive_x(session: &GameSession, rng: &mut StdRng, snapshot: &Snapshot) {
    if snapshot.thinking || !matches!(snapshot.state, GameState::Turn(Mark::X)) {
        return;
    }
    let Some(cell) = bot::choose_move(&snapshot.board, Mark::X, rng) else {
        return;
    };
    if let Err(err) = session.make_move(cell) {
        debug!("move rejected: {}", err);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    let args = Args::parse();

    let store: Box<dyn ScoreStore> = match &args.data_dir {
        Some(dir) => Box::new(JsonFileStore::for_user(dir, &args.user)),
        None => Box::new(MemoryStore::default()),
    };
    let config = SessionConfig {
        thinking_delay: Duration::from_millis(args.thinking_delay_ms),
        countdown_tick: Duration::from_millis(args.countdown_tick_ms),
        seed: args.seed,
        ..SessionConfig::against_computer("You")
    };
    let session = GameSession::new(config, store);
    let mut updates = session.subscribe();
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(1)),
        None => StdRng::from_entropy(),
    };

    let initial = session.snapshot();
    println!("{}", initial.status_message());
    drive_x(&session, &mut rng, &initial);

    let mut finished = 0u32;
    let mut was_finished = false;
    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                println!("interrupted");
                break;
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                println!("{}", snapshot.status_message());

                let now_finished = matches!(snapshot.state, GameState::Finished(_));
                if now_finished && !was_finished {
                    finished += 1;
                    if args.games != 0 && finished >= args.games {
                        break;
                    }
                }
                was_finished = now_finished;

                drive_x(&session, &mut rng, &snapshot);
            }
        }
    }

    let score = session.score();
    println!(
        "final score: X {} / O {} / draws {}",
        score.x_wins, score.o_wins, score.draws
    );
    for record in session.history() {
        println!(
            "{} | {} | {} vs {} | {} | {} moves",
            record.finished_at.format("%Y-%m-%d %H:%M:%S"),
            record.mode,
            record.player_x,
            record.player_o,
            record.outcome,
            record.moves
        );
    }

    Ok(())
}
