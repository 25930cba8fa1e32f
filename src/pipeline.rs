//! One run of the tool: fetch (or reload) the workspace, aggregate, export.

use anyhow::{anyhow, Result};
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use pulse_analytics::{
    daily_timeline, day_start, utc_offset, write_table, Aggregator, ReportGenerator,
};
use pulse_core::config::AppConfig;
use pulse_core::{fetch_directory, Directory, MessageStore, SlackClient, TimeWindow, Timestamp};
use tracing::info;

/// Per-invocation options layered over the config file.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub since: Option<NaiveDate>,
    pub until: Option<NaiveDate>,
    pub timeline_since: Option<NaiveDate>,
}

/// Fetch everything from the API, snapshot it, then export the tables.
pub async fn run(config: &AppConfig, options: RunOptions) -> Result<()> {
    let client = SlackClient::from_config(&config.slack)?;

    info!("Fetching workspace from {}", config.slack.api_base);
    let directory = fetch_directory(&client).await?;
    let store = MessageStore::load(
        &client,
        &directory.channel_ids(),
        config.slack.history_limit,
    )
    .await?;

    store.save_snapshot(&config.output.snapshot_path())?;
    directory.save_to(&config.output.directory_path())?;
    info!("Snapshot written to {}", config.output.snapshot_path().display());

    export(config, &store, &directory, &options, Utc::now())
}

/// Re-export from the snapshot written by a previous run.
pub fn report(config: &AppConfig, options: RunOptions) -> Result<()> {
    let directory = Directory::load_from(&config.output.directory_path())?;
    let store = MessageStore::load_snapshot(&config.output.snapshot_path())?;
    export(config, &store, &directory, &options, Utc::now())
}

fn export(
    config: &AppConfig,
    store: &MessageStore,
    directory: &Directory,
    options: &RunOptions,
    now: DateTime<Utc>,
) -> Result<()> {
    let offset = utc_offset(config.report.utc_offset_hours).ok_or_else(|| {
        anyhow!(
            "report.utc_offset_hours out of range: {}",
            config.report.utc_offset_hours
        )
    })?;
    let window = time_window(options, now, offset);

    let aggregator = Aggregator::new(store, directory);
    let channels = aggregator.channel_table(window);
    write_table(&config.output.channel_path(), &channels)?;
    let users = aggregator.user_table(window);
    write_table(&config.output.user_path(), &users)?;

    if let Some(since) = options.timeline_since.or(config.report.timeline_since) {
        let messages = store.history(&directory.channel_ids(), window);
        let end = window.latest.to_datetime().unwrap_or(now).min(now);
        let timeline = daily_timeline(&messages, since, end, offset);
        write_table(&config.output.timeline_path(), &timeline)?;
    }

    println!(
        "{}",
        ReportGenerator::text_summary(&channels, &users, config.report.top_n)
    );
    Ok(())
}

/// Inclusive window covering whole local days; open ends default to the
/// epoch and to `now`.
fn time_window(options: &RunOptions, now: DateTime<Utc>, offset: FixedOffset) -> TimeWindow {
    let oldest = options
        .since
        .map(|d| day_start(d, offset))
        .unwrap_or(Timestamp::EPOCH);
    let latest = match options.until.and_then(|d| d.succ_opt()) {
        Some(next) => {
            Timestamp::from_micros(day_start(next, offset).as_micros().saturating_sub(1))
        }
        None => Timestamp::from_datetime(&now),
    };
    TimeWindow::new(oldest, latest)
}
