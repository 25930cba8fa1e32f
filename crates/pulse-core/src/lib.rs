pub mod client;
pub mod config;
pub mod error;
pub mod mention;
pub mod snapshot;
pub mod store;
pub mod types;

pub use client::{fetch_directory, SlackClient, WorkspaceClient};
pub use config::AppConfig;
pub use error::{PulseError, Result};
pub use store::{MessageStore, TimeWindow};
pub use types::{Channel, ChannelId, Directory, Message, Reaction, Timestamp, User, UserId};
