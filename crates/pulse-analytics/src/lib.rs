//! Engagement statistics for a chat workspace.
//!
//! Computes per-channel and per-user tables and per-day timelines from the
//! message store, exports them as CSV, and renders a console summary.

pub mod aggregations;
pub mod export;
pub mod reports;
pub mod timeline;

pub use aggregations::{Aggregator, ChannelStats, UserStats};
pub use export::{write_table, CsvRow};
pub use reports::ReportGenerator;
pub use timeline::{daily_timeline, day_start, utc_offset, DayBucket};
