use std::io::ErrorKind;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::sleep;

use ttt_engine::core::{CellIndex, FinishedState, GameError, GameState, Mark};
use ttt_engine::session::{GameSession, MoveRejected, SessionConfig};
use ttt_engine::storage::{MemoryStore, Persisted, ScoreStore, StoreError, StoreResult};

fn cell(index: usize) -> CellIndex {
    CellIndex::try_from(index).unwrap()
}

fn friend_config() -> SessionConfig {
    SessionConfig {
        seed: Some(1),
        ..SessionConfig::with_friend("Alice", "Bob")
    }
}

fn computer_config() -> SessionConfig {
    SessionConfig {
        seed: Some(1),
        ..SessionConfig::against_computer("Alice")
    }
}

fn memory() -> Box<dyn ScoreStore> {
    Box::new(MemoryStore::default())
}

/// Store backed by shared memory so tests can observe saves from outside.
#[derive(Clone, Default)]
struct SharedStore(Arc<Mutex<Option<Persisted>>>);

impl ScoreStore for SharedStore {
    fn load(&mut self) -> StoreResult<Option<Persisted>> {
        Ok(self.0.lock().unwrap().clone())
    }

    fn save(&mut self, data: &Persisted) -> StoreResult<()> {
        *self.0.lock().unwrap() = Some(data.clone());
        Ok(())
    }
}

struct FailingStore;

impl ScoreStore for FailingStore {
    fn load(&mut self) -> StoreResult<Option<Persisted>> {
        Err(StoreError::Io(ErrorKind::Other.into()))
    }

    fn save(&mut self, _data: &Persisted) -> StoreResult<()> {
        Err(StoreError::Io(ErrorKind::Other.into()))
    }
}

/// X takes the top row: X 0, O 3, X 1, O 4, X 2.
fn play_x_win(session: &GameSession) {
    for index in [0, 3, 1, 4, 2] {
        session.make_move(cell(index)).unwrap();
    }
}

#[tokio::test(start_paused = true)]
async fn human_input_is_rejected_while_computer_is_thinking() {
    let session = GameSession::new(computer_config(), memory());
    session.make_move(cell(0)).unwrap();

    let snapshot = session.snapshot();
    assert!(snapshot.thinking);
    assert_eq!(snapshot.status_message(), "Computer is thinking...");
    assert_eq!(
        session.make_move(cell(1)),
        Err(MoveRejected::OpponentPending)
    );
    // the rejected attempt left the board alone
    assert_eq!(session.snapshot().cell(cell(1)), None);

    sleep(Duration::from_millis(510)).await;
    let snapshot = session.snapshot();
    assert!(!snapshot.thinking);
    assert_eq!(snapshot.move_count, 2);
    assert_eq!(snapshot.state, GameState::Turn(Mark::X));
}

#[tokio::test(start_paused = true)]
async fn computer_takes_center_then_blocks() {
    let session = GameSession::new(computer_config(), memory());

    // empty board apart from X at 0: center rule
    session.make_move(cell(0)).unwrap();
    sleep(Duration::from_millis(510)).await;
    assert_eq!(session.snapshot().cell(CellIndex::CENTER), Some(Mark::O));

    // X threatens the top row: block rule fires before corner/random
    session.make_move(cell(1)).unwrap();
    sleep(Duration::from_millis(510)).await;
    assert_eq!(session.snapshot().cell(cell(2)), Some(Mark::O));
}

#[tokio::test(start_paused = true)]
async fn occupied_cell_is_rejected_and_board_unchanged() {
    let session = GameSession::new(friend_config(), memory());
    session.make_move(cell(0)).unwrap();

    assert_eq!(
        session.make_move(cell(0)),
        Err(MoveRejected::Game(GameError::cell_is_occupied(cell(0))))
    );
    let snapshot = session.snapshot();
    assert_eq!(snapshot.cell(cell(0)), Some(Mark::X));
    assert_eq!(snapshot.move_count, 1);
    assert_eq!(snapshot.state, GameState::Turn(Mark::O));
}

#[tokio::test(start_paused = true)]
async fn win_updates_score_and_history_once() {
    let store = SharedStore::default();
    let session = GameSession::new(friend_config(), Box::new(store.clone()));
    play_x_win(&session);

    let snapshot = session.snapshot();
    assert_eq!(
        snapshot.state,
        GameState::Finished(FinishedState::Win(Mark::X))
    );
    assert_eq!(snapshot.winning_line, Some([cell(0), cell(1), cell(2)]));
    assert_eq!(snapshot.score.x_wins, 1);
    assert_eq!(snapshot.score.o_wins, 0);
    assert_eq!(snapshot.score.draws, 0);
    assert_eq!(snapshot.status_message(), "Alice wins! New game in 3...");

    let history = session.history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].moves, 5);
    assert_eq!(history[0].player_x, "Alice");

    // the save happened with the same numbers
    let persisted = store.0.lock().unwrap().clone().unwrap();
    assert_eq!(persisted.score.x_wins, 1);
    assert_eq!(persisted.history.len(), 1);

    // moves are rejected until the countdown resets the board
    assert_eq!(
        session.make_move(cell(5)),
        Err(MoveRejected::Game(GameError::GameIsFinished))
    );
}

#[tokio::test(start_paused = true)]
async fn countdown_resets_exactly_once() {
    let session = GameSession::new(friend_config(), memory());
    play_x_win(&session);
    assert_eq!(session.snapshot().countdown, 3);

    sleep(Duration::from_millis(1010)).await;
    let snapshot = session.snapshot();
    assert_eq!(snapshot.countdown, 2);
    assert_eq!(snapshot.status_message(), "Alice wins! New game in 2...");

    sleep(Duration::from_millis(2010)).await;
    let snapshot = session.snapshot();
    assert_eq!(snapshot.state, GameState::Turn(Mark::X));
    assert_eq!(snapshot.move_count, 0);
    assert_eq!(snapshot.countdown, 0);
    assert_eq!(snapshot.winning_line, None);
    assert!(CellIndex::ALL.iter().all(|&index| snapshot.cell(index).is_none()));
    // score survives the reset
    assert_eq!(snapshot.score.x_wins, 1);

    // no further reset without a new terminal state
    session.make_move(cell(4)).unwrap();
    sleep(Duration::from_secs(10)).await;
    assert_eq!(session.snapshot().cell(cell(4)), Some(Mark::X));
    assert_eq!(session.snapshot().move_count, 1);
}

#[tokio::test(start_paused = true)]
async fn explicit_reset_cancels_pending_countdown() {
    let session = GameSession::new(friend_config(), memory());
    play_x_win(&session);

    session.reset();
    session.make_move(cell(4)).unwrap();

    // the stale countdown must not wipe the new game
    sleep(Duration::from_secs(10)).await;
    let snapshot = session.snapshot();
    assert_eq!(snapshot.cell(cell(4)), Some(Mark::X));
    assert_eq!(snapshot.score.x_wins, 1);
    assert_eq!(session.history().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn shutdown_cancels_timers_without_mutation() {
    let session = GameSession::new(computer_config(), memory());
    session.make_move(cell(0)).unwrap();
    assert!(session.snapshot().thinking);

    session.shutdown();
    sleep(Duration::from_secs(10)).await;

    // the pending computer move never landed
    let snapshot = session.snapshot();
    assert_eq!(snapshot.move_count, 1);
    assert!(snapshot.thinking);
}

#[tokio::test(start_paused = true)]
async fn dropping_the_session_cancels_the_countdown() {
    let store = SharedStore::default();
    let session = GameSession::new(friend_config(), Box::new(store.clone()));
    play_x_win(&session);
    drop(session);

    sleep(Duration::from_secs(10)).await;
    // exactly the one finished game was ever saved
    let persisted = store.0.lock().unwrap().clone().unwrap();
    assert_eq!(persisted.score.x_wins, 1);
    assert_eq!(persisted.history.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn history_is_capped_at_ten_newest_first() {
    let config = SessionConfig {
        countdown_from: 0, // no auto-reset, rounds are driven explicitly
        ..friend_config()
    };
    let session = GameSession::new(config, memory());
    for _ in 0..11 {
        play_x_win(&session);
        session.reset();
    }

    let history = session.history();
    assert_eq!(history.len(), 10);
    assert!(history
        .windows(2)
        .all(|pair| pair[0].finished_at >= pair[1].finished_at));
    assert_eq!(session.score().x_wins, 11);
}

#[tokio::test(start_paused = true)]
async fn score_reset_zeroes_counters_and_saves() {
    let store = SharedStore::default();
    let session = GameSession::new(friend_config(), Box::new(store.clone()));
    play_x_win(&session);
    session.reset_score();

    assert_eq!(session.score().x_wins, 0);
    let persisted = store.0.lock().unwrap().clone().unwrap();
    assert_eq!(persisted.score.x_wins, 0);
    // history is kept
    assert_eq!(persisted.history.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn saved_score_is_loaded_on_session_start() {
    let store = SharedStore::default();
    {
        let session = GameSession::new(friend_config(), Box::new(store.clone()));
        play_x_win(&session);
    }
    let session = GameSession::new(friend_config(), Box::new(store));
    assert_eq!(session.score().x_wins, 1);
    assert_eq!(session.history().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn load_failure_starts_from_zero() {
    let session = GameSession::new(friend_config(), Box::new(FailingStore));
    let score = session.score();
    assert_eq!((score.x_wins, score.o_wins, score.draws), (0, 0, 0));

    // a failing save is swallowed, the game itself is unaffected
    play_x_win(&session);
    assert_eq!(session.score().x_wins, 1);
}

#[tokio::test(start_paused = true)]
async fn friend_mode_draw_counts_once() {
    let session = GameSession::new(friend_config(), memory());
    for index in [0, 1, 2, 4, 3, 5, 7, 6, 8] {
        session.make_move(cell(index)).unwrap();
    }

    let snapshot = session.snapshot();
    assert_eq!(snapshot.state, GameState::Finished(FinishedState::Draw));
    assert_eq!(snapshot.score.draws, 1);
    assert_eq!(snapshot.status_message(), "It's a draw! New game in 3...");
}

#[tokio::test(start_paused = true)]
async fn status_message_names_the_player_on_turn() {
    let session = GameSession::new(friend_config(), memory());
    assert_eq!(session.snapshot().status_message(), "Alice's turn");
    session.make_move(cell(0)).unwrap();
    assert_eq!(session.snapshot().status_message(), "Bob's turn");
}
