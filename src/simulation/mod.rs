//! Simulated hardware for running the dashboard without a board attached.

mod board;

pub use board::{BoardHandle, BoardState, SimulatedBoard};

use log::info;
use tokio::task::JoinHandle;
use tokio::time::{Duration, interval, sleep};

/// How long a simulated button press is held.
const PRESS_DURATION: Duration = Duration::from_millis(300);

/// Spawn a task that periodically presses a button on the simulated board.
///
/// Each press wakes the display, so this exercises the dim and wake cycle
/// during development.
///
/// # Returns
///
/// A `JoinHandle` that can be used to abort the simulation task.
pub fn run_activity_simulation(board: BoardHandle, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(every);
        // The first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            info!("[Sim] Button pressed");
            board.lock().buttons_pressed = true;
            sleep(PRESS_DURATION).await;
            board.lock().buttons_pressed = false;
        }
    })
}
