pub mod agent;
pub mod clock;
pub mod error;
pub mod leaderboard;
pub mod reputation;
pub mod sim;
pub mod task;
pub mod wallet;

pub use agent::*;
pub use clock::*;
pub use error::*;
pub use leaderboard::*;
pub use reputation::*;
pub use sim::*;
pub use task::*;
pub use wallet::*;
