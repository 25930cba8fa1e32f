//! Console summary of the computed tables.

use crate::aggregations::{ChannelStats, UserStats};

/// Report generator for end-of-run summaries.
pub struct ReportGenerator;

impl ReportGenerator {
    /// Generate a compact summary suitable for printing after an export.
    pub fn text_summary(channels: &[ChannelStats], users: &[UserStats], top_n: usize) -> String {
        let mut output = String::new();

        let total_messages: usize = channels.iter().map(|c| c.message_num).sum();
        let total_reactions: usize = channels.iter().map(|c| c.reaction_num).sum();
        let active_channels = channels.iter().filter(|c| c.action_num > 0).count();
        let active_users = users.iter().filter(|u| u.action_num > 0).count();

        output.push_str(&format!(
            "  Channels: {} ({} active)  Users: {} ({} active)\n",
            channels.len(),
            active_channels,
            users.len(),
            active_users
        ));
        output.push_str(&format!(
            "  Messages: {}  Reactions: {}\n",
            total_messages, total_reactions
        ));

        let top_channels = top_by_actions(channels, top_n, |c| c.action_num);
        if !top_channels.is_empty() {
            output.push_str("  Top channels:");
            for c in &top_channels {
                output.push_str(&format!(
                    " #{}({}/{}p)",
                    c.channel_name, c.action_num, c.action_people
                ));
            }
            output.push('\n');
        }

        let top_users = top_by_actions(users, top_n, |u| u.action_num);
        if !top_users.is_empty() {
            output.push_str("  Top users:");
            for u in &top_users {
                output.push_str(&format!(" {}({})", u.user_name, u.action_num));
            }
            output.push('\n');
        }

        output
    }
}

/// Rows with at least one action, highest first. Ties keep table order.
fn top_by_actions<T>(rows: &[T], limit: usize, key: impl Fn(&T) -> usize) -> Vec<&T> {
    let mut active: Vec<&T> = rows.iter().filter(|r| key(*r) > 0).collect();
    active.sort_by(|a, b| key(*b).cmp(&key(*a)));
    active.truncate(limit);
    active
}
