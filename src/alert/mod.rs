//! Tiering and notification logic.
//!
//! - `thresholds`: tier, colour and recommendation for an index.
//! - `change`: whether two consecutive readings differ enough to notify.
//! - `dispatch`: opt-in and permission gate in front of the notifier.

pub mod change;
pub mod dispatch;
pub mod thresholds;
