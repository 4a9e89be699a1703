//! Chat-bot notifications through the Telegram Bot API.

use crate::error::{KitError, Result};
use reqwest::Client;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Default Bot API endpoint.
pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Bot identifiers read from a JSON credentials file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotCredentials {
    /// Bot token, as issued by BotFather
    #[serde(deserialize_with = "string_or_number")]
    pub bot_id: String,
    /// Target chat; stored either as a string or as a number
    #[serde(deserialize_with = "string_or_number")]
    pub chat_id: String,
}

impl BotCredentials {
    /// Load credentials from `path`.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path.as_ref()).await?;
        Ok(serde_json::from_str(&raw)?)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Number(serde_json::Number),
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    Ok(match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(s) => s,
        StringOrNumber::Number(n) => n.to_string(),
    })
}

/// Posts messages to a single chat.
pub struct TelegramNotifier {
    client: Client,
    api_base: String,
    credentials: BotCredentials,
}

impl TelegramNotifier {
    pub fn new(credentials: BotCredentials) -> Self {
        Self {
            client: Client::new(),
            api_base: TELEGRAM_API_BASE.to_string(),
            credentials,
        }
    }

    /// Point the notifier at another Bot API server.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.credentials.bot_id)
    }

    /// Send `text` with link previews disabled.
    pub async fn send(&self, text: &str) -> Result<()> {
        debug!(chat_id = %self.credentials.chat_id, "Posting notification");
        let response = self
            .client
            .post(self.endpoint())
            .query(&[
                ("chat_id", self.credentials.chat_id.as_str()),
                ("disable_web_page_preview", "true"),
                ("text", text),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(KitError::notify_error(format!(
                "bot API answered {}: {}",
                status,
                body.trim()
            )));
        }
        info!("Notification sent");
        Ok(())
    }
}

/// Load credentials from `creds` and post `msg`.
pub async fn telegram(creds: impl AsRef<Path>, msg: &str) -> Result<()> {
    let credentials = BotCredentials::load(creds).await?;
    TelegramNotifier::new(credentials).send(msg).await
}
