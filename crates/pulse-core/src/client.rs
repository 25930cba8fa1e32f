use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::config::SlackConfig;
use crate::error::{PulseError, Result};
use crate::types::{Channel, Directory, Message, User};

/// Read access to a chat workspace.
#[async_trait]
pub trait WorkspaceClient: Send + Sync {
    /// All members of the workspace, including bots and deactivated accounts.
    async fn list_users(&self) -> Result<Vec<User>>;

    /// Non-archived public channels.
    async fn list_channels(&self) -> Result<Vec<Channel>>;

    /// Up to `limit` most recent messages of a channel, newest first.
    async fn channel_history(&self, channel_id: &str, limit: u32) -> Result<Vec<Message>>;
}

/// Fetch the users and non-archived channels of a workspace.
pub async fn fetch_directory(client: &dyn WorkspaceClient) -> Result<Directory> {
    let users = client.list_users().await?;
    let channels: Vec<Channel> = client
        .list_channels()
        .await?
        .into_iter()
        .filter(|c| !c.is_archived)
        .collect();
    tracing::info!(
        "Fetched directory: {} users, {} channels",
        users.len(),
        channels.len()
    );
    Ok(Directory::new(users, channels))
}

#[derive(Deserialize)]
struct UsersListResponse {
    members: Vec<User>,
}

#[derive(Deserialize)]
struct ConversationsListResponse {
    channels: Vec<Channel>,
}

#[derive(Deserialize)]
struct HistoryResponse {
    #[serde(default)]
    messages: Vec<Message>,
}

/// Slack Web API client.
pub struct SlackClient {
    client: reqwest::Client,
    api_base: Url,
    token: String,
    channel_limit: u32,
}

impl SlackClient {
    pub fn new(config: &SlackConfig, token: impl Into<String>) -> Result<Self> {
        let mut api_base = Url::parse(&config.api_base).map_err(|e| {
            PulseError::Config(format!("Invalid slack.api_base {:?}: {}", config.api_base, e))
        })?;
        if !api_base.path().ends_with('/') {
            let path = format!("{}/", api_base.path());
            api_base.set_path(&path);
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("slack-pulse/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            api_base,
            token: token.into(),
            channel_limit: config.channel_limit,
        })
    }

    /// Build a client from configuration, resolving the token.
    pub fn from_config(config: &SlackConfig) -> Result<Self> {
        let token = config.resolve_token()?;
        Self::new(config, token)
    }

    /// Call a Web API method and decode its payload.
    ///
    /// Slack reports most failures as HTTP 200 with `"ok": false`.
    async fn call<T: DeserializeOwned>(&self, method: &str, params: &[(&str, String)]) -> Result<T> {
        let mut url = self.api_base.join(method).map_err(|e| {
            PulseError::Config(format!("Invalid API method {:?}: {}", method, e))
        })?;
        url.query_pairs_mut()
            .extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())));

        debug!("GET {}", method);
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PulseError::Status {
                method: method.to_string(),
                status: status.as_u16(),
            });
        }

        let body: Value = response.json().await?;
        if !body.get("ok").and_then(Value::as_bool).unwrap_or(false) {
            let error = body
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown_error")
                .to_string();
            return Err(PulseError::Api {
                method: method.to_string(),
                error,
            });
        }

        Ok(serde_json::from_value(body)?)
    }
}

#[async_trait]
impl WorkspaceClient for SlackClient {
    async fn list_users(&self) -> Result<Vec<User>> {
        let response: UsersListResponse = self.call("users.list", &[]).await?;
        Ok(response.members)
    }

    async fn list_channels(&self) -> Result<Vec<Channel>> {
        let response: ConversationsListResponse = self
            .call(
                "conversations.list",
                &[
                    ("exclude_archived", "true".to_string()),
                    ("limit", self.channel_limit.to_string()),
                ],
            )
            .await?;
        Ok(response.channels)
    }

    async fn channel_history(&self, channel_id: &str, limit: u32) -> Result<Vec<Message>> {
        let response: HistoryResponse = self
            .call(
                "conversations.history",
                &[
                    ("channel", channel_id.to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;
        Ok(response.messages)
    }
}
