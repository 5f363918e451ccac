//! List, board, and time-series view models.
//!
//! Everything here is a pure function over the session's loaded record sets.
//! Filtering is in-memory over the full set — acceptable at this system's
//! scale, and the store query seam already carries where/order/limit should
//! push-down ever be needed.

pub mod board;
pub mod filter;
pub mod series;

pub use board::{BoardColumn, group_by_stage};
pub use filter::{ClientFilter, DealFilter, LeadFilter};
pub use series::{DayBucket, TimeWindow, daily_series};
