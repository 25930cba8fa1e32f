use chrono::{DateTime, TimeZone, Utc};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

pub type UserId = String;
pub type ChannelId = String;

const MICROS_PER_SEC: i64 = 1_000_000;

/// Slack message timestamp (`"<secs>.<micros>"`), stored as microseconds since epoch.
///
/// Unique within a channel; used as both the message key and the sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(i64);

impl Timestamp {
    pub const EPOCH: Timestamp = Timestamp(0);

    pub fn from_micros(micros: i64) -> Self {
        Self(micros)
    }

    /// Whole seconds, saturating at the representable range.
    pub fn from_secs(secs: i64) -> Self {
        Self(secs.saturating_mul(MICROS_PER_SEC))
    }

    /// Whole seconds, or `None` when the value does not fit in microseconds.
    pub fn checked_from_secs(secs: i64) -> Option<Self> {
        secs.checked_mul(MICROS_PER_SEC).map(Self)
    }

    pub fn from_datetime<Tz: TimeZone>(dt: &DateTime<Tz>) -> Self {
        Self(dt.timestamp_micros())
    }

    pub fn as_micros(&self) -> i64 {
        self.0
    }

    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_micros(self.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let per_sec = MICROS_PER_SEC as u64;
        write!(f, "{}{}.{:06}", sign, abs / per_sec, abs % per_sec)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTimestampError(String);

impl fmt::Display for ParseTimestampError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid Slack timestamp: {:?}", self.0)
    }
}

impl std::error::Error for ParseTimestampError {}

impl FromStr for Timestamp {
    type Err = ParseTimestampError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseTimestampError(s.to_string());
        let (secs, frac) = s.split_once('.').unwrap_or((s, ""));
        if secs.is_empty() || !secs.bytes().all(|b| b.is_ascii_digit()) {
            return Err(err());
        }
        if !frac.bytes().all(|b| b.is_ascii_digit()) {
            return Err(err());
        }
        let secs: i64 = secs.parse().map_err(|_| err())?;

        // Right-pad or truncate the fraction to microsecond precision.
        let mut micros: i64 = 0;
        for i in 0..6 {
            let digit = frac.as_bytes().get(i).map(|b| (b - b'0') as i64).unwrap_or(0);
            micros = micros * 10 + digit;
        }

        Timestamp::checked_from_secs(secs)
            .and_then(|ts| ts.0.checked_add(micros))
            .map(Timestamp)
            .ok_or_else(err)
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TsVisitor;

        impl de::Visitor<'_> for TsVisitor {
            type Value = Timestamp;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a Slack timestamp string or number")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Timestamp, E> {
                v.parse().map_err(E::custom)
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Timestamp, E> {
                i64::try_from(v)
                    .ok()
                    .and_then(Timestamp::checked_from_secs)
                    .ok_or_else(|| E::custom("timestamp out of range"))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Timestamp, E> {
                Timestamp::checked_from_secs(v).ok_or_else(|| E::custom("timestamp out of range"))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Timestamp, E> {
                let micros = (v * MICROS_PER_SEC as f64).round();
                if !micros.is_finite() || micros.abs() >= i64::MAX as f64 {
                    return Err(E::custom("timestamp out of range"));
                }
                Ok(Timestamp(micros as i64))
            }
        }

        deserializer.deserialize_any(TsVisitor)
    }
}

/// A single message from `conversations.history`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub ts: Timestamp,
    /// Author. Absent for some system and integration messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserId>,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reactions: Vec<Reaction>,
}

impl Message {
    pub fn new(ts: Timestamp, user: impl Into<UserId>, text: impl Into<String>) -> Self {
        Self {
            ts,
            user: Some(user.into()),
            text: text.into(),
            subtype: None,
            reactions: Vec::new(),
        }
    }

    pub fn with_reaction(mut self, reaction: Reaction) -> Self {
        self.reactions.push(reaction);
        self
    }

    /// Posted by an integration rather than a workspace member.
    pub fn is_bot_message(&self) -> bool {
        self.subtype.as_deref() == Some("bot_message")
    }

    pub fn is_authored_by(&self, user_id: &str) -> bool {
        self.user.as_deref() == Some(user_id)
    }

    /// Every reacting user id across all reaction kinds (duplicates kept).
    pub fn reactors(&self) -> impl Iterator<Item = &UserId> {
        self.reactions.iter().flat_map(|r| r.users.iter())
    }

    /// Sum of the API-reported reaction counts.
    pub fn reaction_count(&self) -> u64 {
        self.reactions.iter().map(|r| r.count as u64).sum()
    }
}

/// Emoji reaction attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    /// Emoji kind, e.g. `thumbsup`.
    pub name: String,
    #[serde(default)]
    pub users: Vec<UserId>,
    #[serde(default)]
    pub count: u32,
}

impl Reaction {
    pub fn new<I, S>(name: impl Into<String>, users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<UserId>,
    {
        let users: Vec<UserId> = users.into_iter().map(Into::into).collect();
        Self {
            name: name.into(),
            count: users.len() as u32,
            users,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: ChannelId,
    pub name: String,
    #[serde(default)]
    pub is_archived: bool,
}

impl Channel {
    pub fn new(id: impl Into<ChannelId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            is_archived: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub real_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_original: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_512: Option<String>,
}

/// Workspace member from `users.list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub real_name: Option<String>,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub profile: Profile,
}

impl User {
    pub fn new(id: impl Into<UserId>, real_name: impl Into<String>) -> Self {
        let real_name = real_name.into();
        Self {
            id: id.into(),
            name: real_name.to_lowercase(),
            real_name: Some(real_name),
            is_bot: false,
            deleted: false,
            profile: Profile::default(),
        }
    }

    /// Bots and deactivated accounts are left out of per-user statistics.
    pub fn is_eligible(&self) -> bool {
        !self.is_bot && !self.deleted
    }

    pub fn display_name(&self) -> &str {
        non_empty(&self.real_name)
            .or_else(|| non_empty(&self.profile.real_name))
            .unwrap_or(&self.name)
    }

    /// Original upload if present, otherwise the largest generated size.
    pub fn image_url(&self) -> &str {
        non_empty(&self.profile.image_original)
            .or_else(|| non_empty(&self.profile.image_512))
            .unwrap_or("")
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// Users and channels of the workspace, in API order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Directory {
    pub users: Vec<User>,
    pub channels: Vec<Channel>,
}

impl Directory {
    pub fn new(users: Vec<User>, channels: Vec<Channel>) -> Self {
        Self { users, channels }
    }

    pub fn channel_ids(&self) -> Vec<ChannelId> {
        self.channels.iter().map(|c| c.id.clone()).collect()
    }

    pub fn channel_names(&self) -> Vec<String> {
        self.channels.iter().map(|c| c.name.clone()).collect()
    }

    pub fn eligible_users(&self) -> impl Iterator<Item = &User> {
        self.users.iter().filter(|u| u.is_eligible())
    }

}
