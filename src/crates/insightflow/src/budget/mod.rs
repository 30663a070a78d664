//! Token budget tracking
//!
//! Provides the process-wide daily token quota consulted before every model
//! call and updated after it.

pub mod clock;
pub mod estimator;
pub mod tracker;

pub use clock::{Clock, ManualClock, SystemClock};
pub use estimator::{TokenEstimator, CHARS_PER_TOKEN};
pub use tracker::{Reservation, TokenBudget, TokenBudgetTracker, DEFAULT_DAILY_LIMIT};
