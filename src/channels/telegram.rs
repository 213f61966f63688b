//! Telegram channel: long-polls the Bot API for messages and button presses.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

use crate::channels::{
    Channel, Delivery, IncomingMessage, MessageStream, OutgoingResponse, Payload, ReplyMarkup,
};
use crate::error::ChannelError;

/// Maximum message length for Telegram's sendMessage API.
const TELEGRAM_MAX_MESSAGE_LENGTH: usize = 4096;

/// Pause before polling again after a failed getUpdates.
const POLL_RETRY_DELAY: std::time::Duration = std::time::Duration::from_secs(5);

/// Telegram channel: connects to the Bot API via long-polling.
pub struct TelegramChannel {
    bot_token: SecretString,
    allowed_users: Vec<String>,
    client: reqwest::Client,
}

impl TelegramChannel {
    pub fn new(bot_token: SecretString, allowed_users: Vec<String>) -> Self {
        Self {
            bot_token,
            allowed_users,
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        api_url(&self.bot_token, method)
    }

    /// Call a Bot API method and return its `result`.
    async fn call(&self, method: &str, body: &Value) -> Result<Value, ChannelError> {
        let resp = self
            .client
            .post(self.api_url(method))
            .json(body)
            .send()
            .await
            .map_err(|e| send_failed(format!("{method}: {e}")))?;

        let status = resp.status();
        let data: Value = resp
            .json()
            .await
            .map_err(|e| send_failed(format!("{method}: {e}")))?;

        if !status.is_success() || data.get("ok").and_then(Value::as_bool) != Some(true) {
            let description = data
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or("no description");
            return Err(send_failed(format!("{method} returned {status}: {description}")));
        }
        Ok(data.get("result").cloned().unwrap_or(Value::Null))
    }

    /// Send a plain-text message, splitting texts over Telegram's limit.
    /// The markup rides on the last chunk.
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        markup: Option<&ReplyMarkup>,
    ) -> Result<(), ChannelError> {
        let chunks = split_message(text, TELEGRAM_MAX_MESSAGE_LENGTH);
        let last = chunks.len().saturating_sub(1);

        for (i, chunk) in chunks.iter().enumerate() {
            let mut body = serde_json::json!({
                "chat_id": chat_id,
                "text": chunk,
            });
            if i == last {
                if let Some(markup) = markup {
                    body["reply_markup"] = markup_json(markup);
                }
            }
            self.call("sendMessage", &body).await?;
        }
        Ok(())
    }

    /// Replace the text of an earlier message. Only inline buttons survive an
    /// edit; anything else leaves the message without buttons. The text must
    /// fit in one message, see [`plan_delivery`].
    async fn edit_message(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        markup: Option<&ReplyMarkup>,
    ) -> Result<(), ChannelError> {
        let mut body = serde_json::json!({
            "chat_id": chat_id,
            "message_id": message_id,
            "text": text,
        });
        if let Some(inline) = markup.filter(|m| matches!(m, ReplyMarkup::Inline { .. })) {
            body["reply_markup"] = markup_json(inline);
        }
        self.call("editMessageText", &body).await.map(|_| ())
    }

    /// Strip the inline buttons from an earlier message.
    async fn clear_buttons(&self, chat_id: i64, message_id: i64) -> Result<(), ChannelError> {
        let body = serde_json::json!({
            "chat_id": chat_id,
            "message_id": message_id,
        });
        self.call("editMessageReplyMarkup", &body).await.map(|_| ())
    }
}

// ── Channel trait implementation ────────────────────────────────────

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let bot_token = self.bot_token.clone();
        let allowed_users = self.allowed_users.clone();
        let client = self.client.clone();

        tokio::spawn(async move {
            let mut offset: i64 = 0;

            tracing::info!("Telegram channel listening for messages...");

            loop {
                let body = serde_json::json!({
                    "offset": offset,
                    "timeout": 30,
                    "allowed_updates": ["message", "callback_query"]
                });

                let resp = match client
                    .post(api_url(&bot_token, "getUpdates"))
                    .json(&body)
                    .send()
                    .await
                {
                    Ok(r) => r,
                    Err(e) => {
                        tracing::warn!("Telegram poll error: {e}");
                        tokio::time::sleep(POLL_RETRY_DELAY).await;
                        continue;
                    }
                };

                let data: Value = match resp.json().await {
                    Ok(d) => d,
                    Err(e) => {
                        tracing::warn!("Telegram parse error: {e}");
                        tokio::time::sleep(POLL_RETRY_DELAY).await;
                        continue;
                    }
                };

                let results = match poll_results(&data) {
                    Ok(results) => results,
                    Err(description) => {
                        tracing::warn!("Telegram getUpdates rejected: {description}");
                        tokio::time::sleep(POLL_RETRY_DELAY).await;
                        continue;
                    }
                };

                for update in results {
                    // Advance offset past this update
                    if let Some(uid) = update.get("update_id").and_then(Value::as_i64) {
                        offset = uid + 1;
                    }

                    let Some(incoming) = parse_update(update) else {
                        continue;
                    };

                    // Stop the button's loading indicator whatever happens next
                    if let Some(callback_id) =
                        incoming.metadata.get("callback_id").and_then(Value::as_str)
                    {
                        let answer = client
                            .post(api_url(&bot_token, "answerCallbackQuery"))
                            .json(&serde_json::json!({ "callback_query_id": callback_id }))
                            .send()
                            .await;
                        if let Err(e) = answer {
                            tracing::warn!("Telegram answerCallbackQuery failed: {e}");
                        }
                    }

                    let username = incoming
                        .metadata
                        .get("username")
                        .and_then(Value::as_str)
                        .unwrap_or("unknown");
                    let user_id = incoming.user_id.to_string();

                    // Check allowlist against both username and numeric ID
                    if !check_user_allowed(&allowed_users, [username, user_id.as_str()]) {
                        tracing::warn!(
                            "Telegram: ignoring update from unauthorized user: \
                             username={username}, user_id={user_id}"
                        );
                        continue;
                    }

                    if tx.send(incoming).is_err() {
                        tracing::info!("Telegram listener channel closed");
                        return;
                    }
                }
            }
        });

        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|msg| (msg, rx))
        });

        Ok(Box::pin(stream))
    }

    async fn respond(
        &self,
        msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError> {
        let chat_id = msg
            .metadata
            .get("chat_id")
            .and_then(Value::as_i64)
            .ok_or_else(|| send_failed("No chat_id in message metadata"))?;
        let message_id = msg.metadata.get("message_id").and_then(Value::as_i64);
        let markup = response.markup.as_ref();

        match plan_delivery(response.delivery, message_id, &response.content) {
            SendPlan::Edit { message_id } => {
                self.edit_message(chat_id, message_id, &response.content, markup)
                    .await
            }
            SendPlan::SendAndClear { message_id } => {
                self.send_message(chat_id, &response.content, markup).await?;
                if let Err(e) = self.clear_buttons(chat_id, message_id).await {
                    tracing::warn!("Telegram: could not clear buttons: {e}");
                }
                Ok(())
            }
            SendPlan::Send => self.send_message(chat_id, &response.content, markup).await,
        }
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        let resp = self
            .client
            .get(self.api_url("getMe"))
            .send()
            .await
            .map_err(|e| ChannelError::StartupFailed {
                name: "telegram".into(),
                reason: e.to_string(),
            })?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(ChannelError::StartupFailed {
                name: "telegram".into(),
                reason: format!("getMe returned {}", resp.status()),
            })
        }
    }

    async fn shutdown(&self) -> Result<(), ChannelError> {
        tracing::info!("Telegram channel shutting down");
        Ok(())
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn api_url(bot_token: &SecretString, method: &str) -> String {
    format!(
        "https://api.telegram.org/bot{}/{method}",
        bot_token.expose_secret()
    )
}

fn send_failed(reason: impl Into<String>) -> ChannelError {
    ChannelError::SendFailed {
        name: "telegram".into(),
        reason: reason.into(),
    }
}

/// The updates in a getUpdates response, or the API's description of why
/// the poll was refused (bad token, another poller holding the bot).
fn poll_results(data: &Value) -> Result<&[Value], String> {
    if data.get("ok").and_then(Value::as_bool) == Some(true) {
        if let Some(results) = data.get("result").and_then(Value::as_array) {
            return Ok(results.as_slice());
        }
    }
    let description = data
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or("no description");
    Err(match data.get("error_code").and_then(Value::as_i64) {
        Some(code) => format!("{code}: {description}"),
        None => description.to_string(),
    })
}

/// How a reply is carried out against the Bot API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SendPlan {
    Send,
    Edit { message_id: i64 },
    SendAndClear { message_id: i64 },
}

/// Pick the Bot API calls for a reply.
///
/// Edits cannot be split, so an edit over the message limit becomes a new
/// (split) message and the original loses its now stale buttons.
fn plan_delivery(delivery: Delivery, message_id: Option<i64>, text: &str) -> SendPlan {
    match (delivery, message_id) {
        (Delivery::EditOriginal, Some(message_id)) => {
            if text.chars().count() > TELEGRAM_MAX_MESSAGE_LENGTH {
                tracing::warn!(
                    message_id,
                    "Telegram: edit exceeds message limit, sending a new message instead"
                );
                SendPlan::SendAndClear { message_id }
            } else {
                SendPlan::Edit { message_id }
            }
        }
        (Delivery::SendAndCloseOriginal, Some(message_id)) => SendPlan::SendAndClear { message_id },
        _ => SendPlan::Send,
    }
}

/// Turn a Bot API update into an incoming message.
///
/// Text messages and callback queries are kept; everything else (stickers,
/// edits, joins) yields `None`. Routing data lands in the metadata:
/// `chat_id`, `message_id`, `username` and, for button presses,
/// `callback_id`.
fn parse_update(update: &Value) -> Option<IncomingMessage> {
    let (message, from, payload, callback_id) = if let Some(message) = update.get("message") {
        let text = message.get("text").and_then(Value::as_str)?;
        (
            message,
            message.get("from")?,
            Payload::Text(text.to_string()),
            None,
        )
    } else if let Some(query) = update.get("callback_query") {
        let data = query.get("data").and_then(Value::as_str)?;
        (
            query.get("message")?,
            query.get("from")?,
            Payload::Callback(data.to_string()),
            query.get("id").and_then(Value::as_str),
        )
    } else {
        return None;
    };

    let user_id = from.get("id").and_then(Value::as_i64)?;
    let chat_id = message
        .get("chat")
        .and_then(|c| c.get("id"))
        .and_then(Value::as_i64)?;
    let message_id = message.get("message_id").and_then(Value::as_i64);
    let username = from.get("username").and_then(Value::as_str);

    Some(
        IncomingMessage::new("telegram", user_id, payload).with_metadata(serde_json::json!({
            "chat_id": chat_id,
            "message_id": message_id,
            "username": username,
            "callback_id": callback_id,
        })),
    )
}

/// Bot API `reply_markup` object for a markup.
fn markup_json(markup: &ReplyMarkup) -> Value {
    match markup {
        ReplyMarkup::Menu { rows } => serde_json::json!({
            "keyboard": rows
                .iter()
                .map(|row| row
                    .iter()
                    .map(|label| serde_json::json!({ "text": label }))
                    .collect::<Vec<_>>())
                .collect::<Vec<_>>(),
            "resize_keyboard": true,
            "one_time_keyboard": true,
        }),
        ReplyMarkup::Inline { rows } => serde_json::json!({
            "inline_keyboard": rows
                .iter()
                .map(|row| row
                    .iter()
                    .map(|b| serde_json::json!({ "text": b.text, "callback_data": b.data }))
                    .collect::<Vec<_>>())
                .collect::<Vec<_>>(),
        }),
        ReplyMarkup::Remove => serde_json::json!({ "remove_keyboard": true }),
    }
}

/// Check if any identity in the iterator matches the allowed users list.
fn check_user_allowed<'a>(
    allowed_users: &[String],
    identities: impl IntoIterator<Item = &'a str>,
) -> bool {
    let ids: Vec<&str> = identities.into_iter().collect();
    allowed_users
        .iter()
        .any(|u| u == "*" || ids.contains(&u.as_str()))
}

/// Split a message into chunks of at most `max_chars` characters.
/// Tries to split on newlines, then spaces, then hard-cuts at a char boundary.
fn split_message(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut remaining = text;

    loop {
        let Some((limit, _)) = remaining.char_indices().nth(max_chars) else {
            chunks.push(remaining.to_string());
            break;
        };

        // Find a good split point
        let window = &remaining[..limit];
        let split_at = window
            .rfind('\n')
            .or_else(|| window.rfind(' '))
            .filter(|&i| i > 0)
            .unwrap_or(limit);

        chunks.push(remaining[..split_at].to_string());
        remaining = remaining[split_at..].trim_start();
        if remaining.is_empty() {
            break;
        }
    }

    chunks
}

// ── Tests ───────────────────────────────────────────────────────────
