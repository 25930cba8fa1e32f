//! Per-day message and reaction counts.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Utc};
use pulse_core::types::{Message, Timestamp};
use serde::Serialize;

/// Activity of one calendar day, with running totals since the first day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayBucket {
    pub date: NaiveDate,
    pub message_num: u64,
    /// Sum of the API-reported reaction counts.
    pub reaction_num: u64,
    pub cumulative_message_num: u64,
    pub cumulative_reaction_num: u64,
}

/// Fixed offset for `hours` east of UTC.
pub fn utc_offset(hours: i32) -> Option<FixedOffset> {
    FixedOffset::east_opt(hours.checked_mul(3600)?)
}

/// Start of `date` in the given offset.
///
/// Dates at the edge of the calendar clamp to the first or last
/// representable instant.
pub fn day_start(date: NaiveDate, offset: FixedOffset) -> Timestamp {
    let local_midnight = date.and_time(NaiveTime::MIN);
    let shift = chrono::Duration::seconds(offset.local_minus_utc() as i64);
    match local_midnight.checked_sub_signed(shift) {
        Some(utc) => Timestamp::from_micros(utc.and_utc().timestamp_micros()),
        None if offset.local_minus_utc() > 0 => Timestamp::from_micros(i64::MIN),
        None => Timestamp::from_micros(i64::MAX),
    }
}

/// Bucket messages by local calendar day, from `since` through the day of `now`.
///
/// Every day in the range gets a row, including days without activity.
/// Messages are sorted internally, so the input order does not matter.
pub fn daily_timeline(
    messages: &[&Message],
    since: NaiveDate,
    now: DateTime<Utc>,
    offset: FixedOffset,
) -> Vec<DayBucket> {
    let today = now.with_timezone(&offset).date_naive();
    if since > today {
        return Vec::new();
    }

    let mut index: Vec<(Timestamp, u64)> = messages
        .iter()
        .map(|m| (m.ts, m.reaction_count()))
        .collect();
    index.sort_unstable_by_key(|(ts, _)| *ts);

    let first = day_start(since, offset);
    let mut cursor = index.partition_point(|(ts, _)| *ts < first);
    if cursor > 0 {
        tracing::debug!("Timeline skips {} messages before {}", cursor, since);
    }

    let mut buckets = Vec::new();
    let mut cumulative_messages = 0;
    let mut cumulative_reactions = 0;

    for date in since.iter_days().take_while(|d| *d <= today) {
        let end = date
            .succ_opt()
            .map(|next| day_start(next, offset))
            .unwrap_or(Timestamp::from_micros(i64::MAX));

        let mut message_num = 0;
        let mut reaction_num = 0;
        while let Some(&(ts, reactions)) = index.get(cursor) {
            if ts >= end {
                break;
            }
            message_num += 1;
            reaction_num += reactions;
            cursor += 1;
        }

        cumulative_messages += message_num;
        cumulative_reactions += reaction_num;
        buckets.push(DayBucket {
            date,
            message_num,
            reaction_num,
            cumulative_message_num: cumulative_messages,
            cumulative_reaction_num: cumulative_reactions,
        });
    }

    tracing::debug!("Computed timeline: {} days from {}", buckets.len(), since);
    buckets
}
