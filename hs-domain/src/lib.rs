pub mod errors;
pub mod leaderboard;
pub mod model;
pub mod valuation;

pub use errors::*;
pub use leaderboard::*;
pub use model::*;
pub use valuation::*;
