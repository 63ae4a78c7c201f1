//! Booking rules: availability, status lifecycle, pricing and reporting.
//!
//! Everything here is pure; storage and authorization live in the
//! repository and service layers.

pub mod availability;
pub mod dashboard;
pub mod lifecycle;

pub use availability::{find_conflict, DateRange};
pub use dashboard::{summarize, DashboardScope, DashboardSummary};
