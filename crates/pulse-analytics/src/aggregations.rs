//! Per-channel and per-user engagement tables.
//!
//! Both tables are derived from the message store for a time window and are
//! recomputed in full on every call.

use pulse_core::mention;
use pulse_core::store::{MessageStore, TimeWindow};
use pulse_core::types::{Channel, ChannelId, Directory, Message, User, UserId};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// One row of the channel table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelStats {
    pub channel_id: ChannelId,
    pub channel_name: String,
    /// Distinct users who posted or reacted.
    pub action_people: usize,
    /// Distinct message authors.
    pub message_people: usize,
    /// Distinct reactors.
    pub reaction_people: usize,
    pub action_num: usize,
    pub message_num: usize,
    /// Reactor entries; one user reacting with two emoji counts twice.
    pub reaction_num: usize,
}

impl ChannelStats {
    pub fn empty(channel: &Channel) -> Self {
        Self {
            channel_id: channel.id.clone(),
            channel_name: channel.name.clone(),
            action_people: 0,
            message_people: 0,
            reaction_people: 0,
            action_num: 0,
            message_num: 0,
            reaction_num: 0,
        }
    }
}

/// One row of the user table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserStats {
    pub user_id: UserId,
    pub user_name: String,
    pub user_image: String,
    pub action_num: usize,
    pub message_num: usize,
    pub reaction_num: usize,
    /// Distinct other users this user mentioned.
    pub mention_people: usize,
    /// Distinct other users whose messages this user reacted to.
    pub reaction_people: usize,
    /// Reactions from other users on this user's messages.
    pub receive_reaction_num: usize,
    pub receive_reaction_people: usize,
    /// Messages by other users that mention this user.
    pub receive_mention_num: usize,
    pub receive_mention_people: usize,
}

impl UserStats {
    pub fn empty(user: &User) -> Self {
        Self {
            user_id: user.id.clone(),
            user_name: user.display_name().to_string(),
            user_image: user.image_url().to_string(),
            action_num: 0,
            message_num: 0,
            reaction_num: 0,
            mention_people: 0,
            reaction_people: 0,
            receive_reaction_num: 0,
            receive_reaction_people: 0,
            receive_mention_num: 0,
            receive_mention_people: 0,
        }
    }
}

/// Relations collected for one user while scanning messages.
#[derive(Default)]
struct Interactions<'a> {
    mentioned: HashSet<&'a str>,
    reacted_to: HashSet<&'a str>,
    reactions_received: Vec<&'a str>,
    mentions_received: Vec<&'a str>,
}

/// Computes statistics tables over a loaded workspace.
pub struct Aggregator<'a> {
    store: &'a MessageStore,
    directory: &'a Directory,
}

impl<'a> Aggregator<'a> {
    pub fn new(store: &'a MessageStore, directory: &'a Directory) -> Self {
        Self { store, directory }
    }

    /// Statistics for one channel.
    pub fn channel_stats(&self, channel: &Channel, window: TimeWindow) -> ChannelStats {
        let message_num = self.store.messages_of(&channel.id, window).len();
        let authors = self.store.message_authors(&channel.id, window);
        let reactors = self.store.reactors(&channel.id, window);

        let author_set: HashSet<&UserId> = authors.iter().copied().collect();
        let reactor_set: HashSet<&UserId> = reactors.iter().copied().collect();
        let action_people = author_set.union(&reactor_set).count();

        ChannelStats {
            action_people,
            message_people: author_set.len(),
            reaction_people: reactor_set.len(),
            action_num: message_num + reactors.len(),
            message_num,
            reaction_num: reactors.len(),
            ..ChannelStats::empty(channel)
        }
    }

    /// One row per channel, in directory order.
    pub fn channel_table(&self, window: TimeWindow) -> Vec<ChannelStats> {
        let rows: Vec<ChannelStats> = self
            .directory
            .channels
            .iter()
            .map(|channel| self.channel_stats(channel, window))
            .collect();
        tracing::debug!("Computed channel table: {} rows", rows.len());
        rows
    }

    /// One row per eligible (non-bot, non-deleted) user, in directory order.
    ///
    /// Self-mentions and self-reactions are left out of every relational
    /// column (`mention_people`, `reaction_people`, `receive_*`). They still
    /// count towards the raw `message_num` / `reaction_num` activity.
    pub fn user_table(&self, window: TimeWindow) -> Vec<UserStats> {
        let channel_ids = self.directory.channel_ids();

        let mut message_counts: HashMap<&str, usize> = HashMap::new();
        let mut reaction_counts: HashMap<&str, usize> = HashMap::new();
        for channel_id in &channel_ids {
            for author in self.store.message_authors(channel_id, window) {
                *message_counts.entry(author.as_str()).or_insert(0) += 1;
            }
            for reactor in self.store.reactors(channel_id, window) {
                *reaction_counts.entry(reactor.as_str()).or_insert(0) += 1;
            }
        }

        let messages = self.store.history(&channel_ids, window);
        let interactions = collect_interactions(&messages);

        let rows: Vec<UserStats> = self
            .directory
            .eligible_users()
            .map(|user| {
                let id = user.id.as_str();
                let message_num = message_counts.get(id).copied().unwrap_or(0);
                let reaction_num = reaction_counts.get(id).copied().unwrap_or(0);
                let mut row = UserStats {
                    action_num: message_num + reaction_num,
                    message_num,
                    reaction_num,
                    ..UserStats::empty(user)
                };

                if let Some(acts) = interactions.get(id) {
                    row.mention_people = acts.mentioned.len();
                    row.reaction_people = acts.reacted_to.len();
                    row.receive_reaction_num = acts.reactions_received.len();
                    row.receive_reaction_people = distinct(&acts.reactions_received);
                    row.receive_mention_num = acts.mentions_received.len();
                    row.receive_mention_people = distinct(&acts.mentions_received);
                }
                row
            })
            .collect();
        tracing::debug!("Computed user table: {} rows", rows.len());
        rows
    }
}

/// Scan messages once, recording who mentioned and reacted to whom.
///
/// A message mentioning the same user twice records one received mention.
fn collect_interactions<'m>(messages: &[&'m Message]) -> HashMap<&'m str, Interactions<'m>> {
    let mut by_user: HashMap<&str, Interactions> = HashMap::new();
    let mut authorless = 0;

    for message in messages {
        let Some(author) = message.user.as_deref() else {
            authorless += 1;
            continue;
        };

        let mut mentioned_here: HashSet<&str> = HashSet::new();
        for target in mention::mentions(&message.text) {
            if !message.is_authored_by(target) && mentioned_here.insert(target) {
                by_user.entry(author).or_default().mentioned.insert(target);
                by_user
                    .entry(target)
                    .or_default()
                    .mentions_received
                    .push(author);
            }
        }

        for reactor in message.reactors() {
            let reactor = reactor.as_str();
            if message.is_authored_by(reactor) {
                continue;
            }
            by_user.entry(reactor).or_default().reacted_to.insert(author);
            by_user
                .entry(author)
                .or_default()
                .reactions_received
                .push(reactor);
        }
    }

    if authorless > 0 {
        tracing::debug!(
            "Skipped {} messages without an author in user relations",
            authorless
        );
    }
    by_user
}

fn distinct(ids: &[&str]) -> usize {
    ids.iter().collect::<HashSet<_>>().len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_core::types::{Reaction, Timestamp};

    fn msg(secs: i64, user: &str, text: &str) -> Message {
        Message::new(Timestamp::from_secs(secs), user, text)
    }

    fn workspace() -> (MessageStore, Directory) {
        let mut bot = User::new("B1", "Deploy Bot");
        bot.is_bot = true;
        let mut gone = User::new("U9", "Former Member");
        gone.deleted = true;

        let directory = Directory::new(
            vec![
                User::new("U1", "Alice"),
                User::new("U2", "Bob"),
                User::new("U3", "Carol"),
                bot,
                gone,
            ],
            vec![
                Channel::new("C1", "general"),
                Channel::new("C2", "random"),
                Channel::new("C3", "quiet"),
            ],
        );

        let mut store = MessageStore::new();
        store.insert(
            "C1",
            vec![
                msg(400, "U1", "hello <@U2> and <@U3>")
                    .with_reaction(Reaction::new("thumbsup", ["U2", "U3"]))
                    .with_reaction(Reaction::new("eyes", ["U3", "U1"])),
                msg(300, "U2", "thanks <@U1>, cc <@U1> <@U2>"),
                msg(200, "U3", "note to self <@U3>")
                    .with_reaction(Reaction::new("tada", ["U3"])),
            ],
        );
        store.insert(
            "C2",
            vec![msg(350, "U2", "lunch?").with_reaction(Reaction::new("yes", ["U1", "U9"]))],
        );
        store.insert("C3", Vec::new());
        (store, directory)
    }

    #[test]
    fn test_authorless_messages_count_for_channel_only() {
        let directory = Directory::new(
            vec![User::new("U1", "Alice"), User::new("U2", "Bob")],
            vec![Channel::new("C1", "general")],
        );
        let mut system = msg(200, "U1", "welcome <@U2>")
            .with_reaction(Reaction::new("wave", ["U2"]));
        system.user = None;

        let mut store = MessageStore::new();
        store.insert("C1", vec![msg(300, "U1", "hi"), system]);
        let aggregator = Aggregator::new(&store, &directory);

        let channel = &aggregator.channel_table(TimeWindow::unbounded())[0];
        assert_eq!(channel.message_num, 2);
        assert_eq!(channel.reaction_num, 1);
        assert_eq!(channel.action_num, 3);
        assert_eq!(channel.message_people, 1);
        assert_eq!(channel.reaction_people, 1);
        assert_eq!(channel.action_people, 2);

        let users = aggregator.user_table(TimeWindow::unbounded());
        let alice = row(&users, "U1");
        assert_eq!(alice.message_num, 1);
        assert_eq!(alice.receive_reaction_num, 0);
        let bob = row(&users, "U2");
        assert_eq!(bob.reaction_num, 1);
        assert_eq!(bob.reaction_people, 0);
        assert_eq!(bob.receive_mention_num, 0);
        assert_eq!(bob.receive_mention_people, 0);
    }

    fn row<'r>(rows: &'r [UserStats], id: &str) -> &'r UserStats {
        rows.iter().find(|r| r.user_id == id).unwrap()
    }

    #[test]
    fn test_channel_table_counts() {
        let (store, directory) = workspace();
        let table = Aggregator::new(&store, &directory).channel_table(TimeWindow::unbounded());

        assert_eq!(table.len(), 3);
        let general = &table[0];
        assert_eq!(general.channel_name, "general");
        assert_eq!(general.message_num, 3);
        assert_eq!(general.reaction_num, 5);
        assert_eq!(general.action_num, 8);
        assert_eq!(general.message_people, 3);
        assert_eq!(general.reaction_people, 3);
        assert_eq!(general.action_people, 3);

        let random = &table[1];
        assert_eq!(random.message_people, 1);
        assert_eq!(random.reaction_people, 2);
        assert_eq!(random.action_people, 3);
    }

    #[test]
    fn test_empty_channel_yields_zero_row() {
        let (store, directory) = workspace();
        let table = Aggregator::new(&store, &directory).channel_table(TimeWindow::unbounded());
        assert_eq!(table[2], ChannelStats::empty(&directory.channels[2]));
    }

    #[test]
    fn test_channel_missing_from_store_yields_zero_row() {
        let (store, mut directory) = workspace();
        directory.channels.push(Channel::new("C4", "new"));
        let table = Aggregator::new(&store, &directory).channel_table(TimeWindow::unbounded());
        assert_eq!(table.len(), 4);
        assert_eq!(table[3].action_num, 0);
    }

    #[test]
    fn test_channel_invariants_hold() {
        let (store, directory) = workspace();
        let aggregator = Aggregator::new(&store, &directory);
        for window in [
            TimeWindow::unbounded(),
            TimeWindow::new(Timestamp::from_secs(300), Timestamp::from_secs(400)),
            TimeWindow::until(Timestamp::from_secs(250)),
        ] {
            for row in aggregator.channel_table(window) {
                assert_eq!(row.action_num, row.message_num + row.reaction_num);
                assert!(row.action_people <= row.message_people + row.reaction_people);
                assert!(row.action_people >= row.message_people.max(row.reaction_people));
            }
        }
    }

    #[test]
    fn test_overlapping_reaction_sets() {
        let directory = Directory::new(
            vec![User::new("U1", "Alice")],
            vec![Channel::new("C1", "general")],
        );
        let mut store = MessageStore::new();
        store.insert(
            "C1",
            vec![msg(1, "U1", "x")
                .with_reaction(Reaction::new("a", ["A", "B"]))
                .with_reaction(Reaction::new("b", ["B", "C"]))],
        );
        let table = Aggregator::new(&store, &directory).channel_table(TimeWindow::unbounded());
        assert_eq!(table[0].reaction_num, 4);
        assert_eq!(table[0].reaction_people, 3);
    }

    #[test]
    fn test_window_bounds_are_inclusive() {
        let (store, directory) = workspace();
        let window = TimeWindow::new(Timestamp::from_secs(200), Timestamp::from_secs(300));
        let table = Aggregator::new(&store, &directory).channel_table(window);
        assert_eq!(table[0].message_num, 2);
    }

    #[test]
    fn test_user_table_excludes_bots_and_deleted() {
        let (store, directory) = workspace();
        let table = Aggregator::new(&store, &directory).user_table(TimeWindow::unbounded());
        let ids: Vec<&str> = table.iter().map(|r| r.user_id.as_str()).collect();
        assert_eq!(ids, vec!["U1", "U2", "U3"]);
    }

    #[test]
    fn test_user_activity_counts() {
        let (store, directory) = workspace();
        let table = Aggregator::new(&store, &directory).user_table(TimeWindow::unbounded());

        let alice = row(&table, "U1");
        assert_eq!(alice.message_num, 1);
        // eyes on own message + yes on Bob's message
        assert_eq!(alice.reaction_num, 2);
        assert_eq!(alice.action_num, 3);

        let carol = row(&table, "U3");
        assert_eq!(carol.message_num, 1);
        assert_eq!(carol.reaction_num, 3);
    }

    #[test]
    fn test_mentions() {
        let (store, directory) = workspace();
        let table = Aggregator::new(&store, &directory).user_table(TimeWindow::unbounded());

        let alice = row(&table, "U1");
        assert_eq!(alice.mention_people, 2);
        // Bob mentioned Alice twice in one message.
        assert_eq!(alice.receive_mention_num, 1);
        assert_eq!(alice.receive_mention_people, 1);

        let bob = row(&table, "U2");
        assert_eq!(bob.mention_people, 1);
        assert_eq!(bob.receive_mention_num, 1);

        let carol = row(&table, "U3");
        assert_eq!(carol.mention_people, 0);
        assert_eq!(carol.receive_mention_num, 1);
        assert_eq!(carol.receive_mention_people, 1);
    }

    #[test]
    fn test_reactions_exclude_self() {
        let (store, directory) = workspace();
        let table = Aggregator::new(&store, &directory).user_table(TimeWindow::unbounded());

        let alice = row(&table, "U1");
        assert_eq!(alice.reaction_people, 1);
        // U2, U3, U3 from others; her own "eyes" is not counted.
        assert_eq!(alice.receive_reaction_num, 3);
        assert_eq!(alice.receive_reaction_people, 2);

        let bob = row(&table, "U2");
        assert_eq!(bob.reaction_people, 1);
        assert_eq!(bob.receive_reaction_num, 2);
        assert_eq!(bob.receive_reaction_people, 2);

        let carol = row(&table, "U3");
        assert_eq!(carol.reaction_people, 1);
        assert_eq!(carol.receive_reaction_num, 0);
    }

    #[test]
    fn test_user_names_and_images() {
        let (store, mut directory) = workspace();
        directory.users[0].profile.image_original = Some("https://img/alice.png".into());
        let table = Aggregator::new(&store, &directory).user_table(TimeWindow::unbounded());
        assert_eq!(table[0].user_name, "Alice");
        assert_eq!(table[0].user_image, "https://img/alice.png");
        assert_eq!(table[1].user_image, "");
    }

    #[test]
    fn test_user_without_activity_is_zero_row() {
        let (store, mut directory) = workspace();
        directory.users.push(User::new("U5", "Lurker"));
        let table = Aggregator::new(&store, &directory).user_table(TimeWindow::unbounded());
        let lurker = row(&table, "U5");
        assert_eq!(*lurker, UserStats::empty(&directory.users[5]));
    }
}
