//! CSV export of the statistics tables.

use pulse_core::error::Result;
use serde::Serialize;
use std::io;
use std::path::Path;

use crate::aggregations::{ChannelStats, UserStats};
use crate::timeline::DayBucket;

/// A table row with a fixed CSV header.
///
/// The header is written even when the table has no rows, so the column
/// list must match the serialized field order.
pub trait CsvRow: Serialize {
    const HEADERS: &'static [&'static str];
}

impl CsvRow for ChannelStats {
    const HEADERS: &'static [&'static str] = &[
        "channel_id",
        "channel_name",
        "action_people",
        "message_people",
        "reaction_people",
        "action_num",
        "message_num",
        "reaction_num",
    ];
}

impl CsvRow for UserStats {
    const HEADERS: &'static [&'static str] = &[
        "user_id",
        "user_name",
        "user_image",
        "action_num",
        "message_num",
        "reaction_num",
        "mention_people",
        "reaction_people",
        "receive_reaction_num",
        "receive_reaction_people",
        "receive_mention_num",
        "receive_mention_people",
    ];
}

impl CsvRow for DayBucket {
    const HEADERS: &'static [&'static str] = &[
        "date",
        "message_num",
        "reaction_num",
        "cumulative_message_num",
        "cumulative_reaction_num",
    ];
}

/// Write a header line followed by one record per row.
pub fn write_rows<W: io::Write, T: CsvRow>(writer: W, rows: &[T]) -> Result<()> {
    let mut csv = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    csv.write_record(T::HEADERS)?;
    for row in rows {
        csv.serialize(row)?;
    }
    csv.flush()?;
    Ok(())
}

/// Write a table to `path`, creating the parent directory if needed.
pub fn write_table<T: CsvRow>(path: &Path, rows: &[T]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(path)?;
    write_rows(io::BufWriter::new(file), rows)?;
    tracing::info!("Exported {} rows to {}", rows.len(), path.display());
    Ok(())
}
