//! Telegram Bot API sink.

use std::time::Duration;

use serde::Serialize;

use super::{Alert, AlertSink, SinkError};

const API_BASE: &str = "https://api.telegram.org";

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
}

pub struct TelegramSink {
    client: reqwest::blocking::Client,
    api_base: String,
    bot_token: String,
    chat_id: String,
}

impl TelegramSink {
    pub fn new(
        bot_token: impl Into<String>,
        chat_id: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, SinkError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SinkError::Delivery(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_base: API_BASE.to_string(),
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
        })
    }

    /// Point the sink at a different Bot API host.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    fn send_url(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.bot_token)
    }

    fn payload<'a>(&'a self, alert: &'a Alert) -> SendMessage<'a> {
        SendMessage {
            chat_id: &self.chat_id,
            text: &alert.message,
            parse_mode: "HTML",
        }
    }
}

impl AlertSink for TelegramSink {
    fn name(&self) -> &str {
        "telegram"
    }

    fn deliver(&self, alert: &Alert) -> Result<(), SinkError> {
        let resp = self
            .client
            .post(self.send_url())
            .json(&self.payload(alert))
            .send()
            // The URL embeds the bot token; keep it out of the error text.
            .map_err(|e| SinkError::Delivery(e.without_url().to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(SinkError::Delivery(format!(
                "telegram returned HTTP {}: {}",
                status.as_u16(),
                body.chars().take(200).collect::<String>()
            )));
        }
        Ok(())
    }
}
