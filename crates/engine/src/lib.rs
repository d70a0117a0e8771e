//! Impact scoring, progression and reward evaluation

pub mod challenges;
pub mod clock;
pub mod emissions;
pub mod evaluator;
pub mod handler;
pub mod impact;
pub mod leaderboard;
pub mod locks;
pub mod memory;
pub mod notifier;
pub mod store;
pub mod summary;
pub mod validate;

#[cfg(test)]
mod challenges_test;
#[cfg(test)]
mod leaderboard_test;

pub use clock::{Clock, FixedClock, SystemClock};
pub use handler::ProgressionEngine;
pub use memory::MemoryStore;
pub use notifier::{MemoryNotifier, Notifier, PgNotifier};
pub use store::{PgStore, Store};
pub use validate::ActivityInput;
