//! Gene matching
//!
//! Resolves free-text gene identifiers to Entrez genes of one organism.
//!
//! ```text
//! identifiers → runner (per identifier: lookup → ranking) → MatchRun
//!                  ↑ task: blocking pool, progress + completion events
//!                  ↑ session: supersedes old runs, keeps the last good one
//! ```

pub mod error;
pub mod types;
pub mod ranking;
pub mod runner;
pub mod task;
pub mod session;

pub use error::MatchError;
pub use types::*;
pub use ranking::{rank_candidates, Ranking};
pub use runner::{match_identifiers, run_match, ProgressFn};
pub use task::{spawn_match, CancelToken, MatchEvent, MatchHandle};
pub use session::{Applied, MatchSession};
