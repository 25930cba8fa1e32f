//! In-memory message store and the time-window queries over it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::client::WorkspaceClient;
use crate::error::Result;
use crate::types::{ChannelId, Message, Timestamp, UserId};

/// Inclusive `[oldest, latest]` range of message timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub oldest: Timestamp,
    pub latest: Timestamp,
}

impl TimeWindow {
    pub fn new(oldest: Timestamp, latest: Timestamp) -> Self {
        Self { oldest, latest }
    }

    /// Full history up to the caller's notion of "now".
    pub fn until(now: Timestamp) -> Self {
        Self::new(Timestamp::EPOCH, now)
    }

    /// No bounds at all.
    pub fn unbounded() -> Self {
        Self::new(Timestamp::from_micros(i64::MIN), Timestamp::from_micros(i64::MAX))
    }

    pub fn contains(&self, ts: Timestamp) -> bool {
        self.oldest <= ts && ts <= self.latest
    }
}

/// Messages of every loaded channel, keyed by channel id.
///
/// Each channel keeps the order the API returned (newest first for
/// `conversations.history`). The store is built once and never mutated by
/// the query methods.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageStore {
    channels: BTreeMap<ChannelId, Vec<Message>>,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the history of each channel, dropping integration (bot) messages.
    ///
    /// A failure on any channel aborts the whole load.
    pub async fn load(
        client: &dyn WorkspaceClient,
        channel_ids: &[ChannelId],
        limit: u32,
    ) -> Result<Self> {
        let mut store = Self::new();
        for channel_id in channel_ids {
            let fetched = client.channel_history(channel_id, limit).await?;
            let fetched_len = fetched.len();
            let messages: Vec<Message> = fetched
                .into_iter()
                .filter(|m| !m.is_bot_message())
                .collect();
            debug!(
                "Channel {}: {} messages ({} bot messages skipped)",
                channel_id,
                messages.len(),
                fetched_len - messages.len()
            );
            let authorless = messages.iter().filter(|m| m.user.is_none()).count();
            if authorless > 0 {
                warn!(
                    "Channel {}: {} messages have no author; they count towards channel totals only",
                    channel_id, authorless
                );
            }
            store.insert(channel_id.clone(), messages);
        }
        info!(
            "Loaded {} messages from {} channels",
            store.message_count(),
            store.channel_count()
        );
        Ok(store)
    }

    /// Replace the messages of one channel.
    pub fn insert(&mut self, channel_id: impl Into<ChannelId>, messages: Vec<Message>) {
        self.channels.insert(channel_id.into(), messages);
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn message_count(&self) -> usize {
        self.channels.values().map(Vec::len).sum()
    }

    /// In-window messages of the given channels, concatenated in request order.
    ///
    /// Not globally sorted by time. Channels that were never loaded contribute
    /// nothing.
    pub fn history<S: AsRef<str>>(&self, channel_ids: &[S], window: TimeWindow) -> Vec<&Message> {
        channel_ids
            .iter()
            .filter_map(|id| self.channels.get(id.as_ref()))
            .flat_map(|messages| messages.iter())
            .filter(|m| window.contains(m.ts))
            .collect()
    }

    pub fn messages_of(&self, channel_id: &str, window: TimeWindow) -> Vec<&Message> {
        self.history(&[channel_id], window)
    }

    /// Author of each in-window message of a channel (duplicates kept).
    pub fn message_authors(&self, channel_id: &str, window: TimeWindow) -> Vec<&UserId> {
        self.messages_of(channel_id, window)
            .into_iter()
            .filter_map(|m| m.user.as_ref())
            .collect()
    }

    /// Every reacting user on every in-window message of a channel.
    ///
    /// A user reacting with two emoji kinds appears twice.
    pub fn reactors(&self, channel_id: &str, window: TimeWindow) -> Vec<&UserId> {
        self.messages_of(channel_id, window)
            .into_iter()
            .flat_map(|m| m.reactors())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PulseError;
    use crate::types::{Channel, Reaction, User};
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct FakeClient {
        history: HashMap<String, Vec<Message>>,
    }

    #[async_trait]
    impl WorkspaceClient for FakeClient {
        async fn list_users(&self) -> Result<Vec<User>> {
            Ok(Vec::new())
        }

        async fn list_channels(&self) -> Result<Vec<Channel>> {
            Ok(Vec::new())
        }

        async fn channel_history(&self, channel_id: &str, _limit: u32) -> Result<Vec<Message>> {
            self.history
                .get(channel_id)
                .cloned()
                .ok_or_else(|| PulseError::Api {
                    method: "conversations.history".into(),
                    error: "channel_not_found".into(),
                })
        }
    }

    fn msg(secs: i64, user: &str) -> Message {
        Message::new(Timestamp::from_secs(secs), user, "text")
    }

    fn sample_store() -> MessageStore {
        let mut store = MessageStore::new();
        store.insert(
            "C1",
            vec![
                msg(300, "U1").with_reaction(Reaction::new("a", ["U2", "U3"])),
                msg(200, "U2"),
                msg(100, "U1").with_reaction(Reaction::new("b", ["U1"])),
            ],
        );
        store.insert("C2", vec![msg(250, "U3")]);
        store
    }

    #[test]
    fn test_window_is_inclusive() {
        let window = TimeWindow::new(Timestamp::from_secs(100), Timestamp::from_secs(200));
        assert!(window.contains(Timestamp::from_secs(100)));
        assert!(window.contains(Timestamp::from_secs(200)));
        assert!(!window.contains(Timestamp::from_micros(200_000_001)));
        assert!(!window.contains(Timestamp::from_micros(99_999_999)));
    }

    #[test]
    fn test_history_includes_both_bounds() {
        let store = sample_store();
        let window = TimeWindow::new(Timestamp::from_secs(100), Timestamp::from_secs(200));
        let ts: Vec<Timestamp> = store.history(&["C1"], window).iter().map(|m| m.ts).collect();
        assert_eq!(ts, vec![Timestamp::from_secs(200), Timestamp::from_secs(100)]);
    }

    #[test]
    fn test_history_concatenates_in_request_order() {
        let store = sample_store();
        let window = TimeWindow::until(Timestamp::from_secs(1_000));
        let ts: Vec<i64> = store
            .history(&["C2", "C1"], window)
            .iter()
            .map(|m| m.ts.as_micros() / 1_000_000)
            .collect();
        assert_eq!(ts, vec![250, 300, 200, 100]);
    }

    #[test]
    fn test_unknown_channel_is_empty() {
        let store = sample_store();
        assert!(store.messages_of("C404", TimeWindow::unbounded()).is_empty());
    }

    #[test]
    fn test_message_authors_keep_duplicates() {
        let store = sample_store();
        let authors = store.message_authors("C1", TimeWindow::unbounded());
        assert_eq!(authors, vec!["U1", "U2", "U1"]);
    }

    #[test]
    fn test_reactors_flatten_every_reaction() {
        let store = sample_store();
        let reactors = store.reactors("C1", TimeWindow::unbounded());
        assert_eq!(reactors, vec!["U2", "U3", "U1"]);

        let recent = TimeWindow::new(Timestamp::from_secs(150), Timestamp::from_secs(1_000));
        assert_eq!(store.reactors("C1", recent), vec!["U2", "U3"]);
    }

    #[tokio::test]
    async fn test_load_skips_bot_messages() {
        let mut bot = msg(150, "B1");
        bot.subtype = Some("bot_message".into());
        let mut joined = msg(140, "U2");
        joined.subtype = Some("channel_join".into());

        let client = FakeClient {
            history: HashMap::from([
                ("C1".to_string(), vec![msg(200, "U1"), bot, joined]),
                ("C2".to_string(), vec![]),
            ]),
        };

        let store = MessageStore::load(&client, &["C1".to_string(), "C2".to_string()], 100)
            .await
            .unwrap();
        assert_eq!(store.channel_count(), 2);
        assert_eq!(store.message_count(), 2);
        assert!(store
            .messages_of("C1", TimeWindow::unbounded())
            .iter()
            .all(|m| !m.is_bot_message()));
    }

    #[tokio::test]
    async fn test_load_keeps_authorless_messages() {
        let mut system = msg(180, "U1");
        system.user = None;
        let client = FakeClient {
            history: HashMap::from([("C1".to_string(), vec![msg(200, "U1"), system])]),
        };

        let store = MessageStore::load(&client, &["C1".to_string()], 100).await.unwrap();
        assert_eq!(store.messages_of("C1", TimeWindow::unbounded()).len(), 2);
        assert_eq!(store.message_authors("C1", TimeWindow::unbounded()), vec!["U1"]);
    }

    #[tokio::test]
    async fn test_load_fails_on_any_channel_error() {
        let client = FakeClient {
            history: HashMap::from([("C1".to_string(), vec![msg(1, "U1")])]),
        };
        let result =
            MessageStore::load(&client, &["C1".to_string(), "C9".to_string()], 100).await;
        assert!(matches!(result, Err(PulseError::Api { .. })));
    }
}
