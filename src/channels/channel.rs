//! Channel trait and the message types that cross it.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::directory::model::ExternalId;
use crate::error::ChannelError;

/// What the user sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// A plain text message.
    Text(String),
    /// Opaque data attached to a pressed inline button.
    Callback(String),
}

/// A message received from a channel.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    /// Name of the channel that produced the message.
    pub channel: String,
    /// Chat identity of the sender.
    pub user_id: ExternalId,
    pub payload: Payload,
    /// Channel-specific routing data (chat id, message id, callback id).
    pub metadata: serde_json::Value,
}

impl IncomingMessage {
    pub fn new(channel: &str, user_id: ExternalId, payload: Payload) -> Self {
        Self {
            channel: channel.to_string(),
            user_id,
            payload,
            metadata: serde_json::json!({}),
        }
    }

    pub fn text(channel: &str, user_id: ExternalId, text: &str) -> Self {
        Self::new(channel, user_id, Payload::Text(text.to_string()))
    }

    pub fn callback(channel: &str, user_id: ExternalId, data: &str) -> Self {
        Self::new(channel, user_id, Payload::Callback(data.to_string()))
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// An inline button carrying callback data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineButton {
    pub text: String,
    pub data: String,
}

impl InlineButton {
    pub fn new(text: &str, data: impl Into<String>) -> Self {
        Self {
            text: text.to_string(),
            data: data.into(),
        }
    }
}

/// Selectable actions attached to a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyMarkup {
    /// Persistent menu of text buttons; pressing one sends its label.
    Menu { rows: Vec<Vec<String>> },
    /// Buttons attached to the message itself.
    Inline { rows: Vec<Vec<InlineButton>> },
    /// Hide any menu currently shown.
    Remove,
}

impl ReplyMarkup {
    /// All inline buttons, row by row. Empty for other kinds.
    pub fn inline_buttons(&self) -> impl Iterator<Item = &InlineButton> {
        let rows: &[Vec<InlineButton>] = match self {
            Self::Inline { rows } => rows,
            _ => &[],
        };
        rows.iter().flatten()
    }
}

/// How a reply is placed relative to the message that triggered it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Delivery {
    /// Send as a new message.
    #[default]
    Send,
    /// Replace the text and buttons of the message whose button was pressed.
    EditOriginal,
    /// Send as a new message and strip the buttons from the pressed message.
    SendAndCloseOriginal,
}

/// A reply to send back through a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingResponse {
    pub content: String,
    pub markup: Option<ReplyMarkup>,
    pub delivery: Delivery,
}

impl OutgoingResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            markup: None,
            delivery: Delivery::Send,
        }
    }

    pub fn with_markup(mut self, markup: ReplyMarkup) -> Self {
        self.markup = Some(markup);
        self
    }

    pub fn with_delivery(mut self, delivery: Delivery) -> Self {
        self.delivery = delivery;
        self
    }
}

/// Stream of incoming messages from a channel.
pub type MessageStream = Pin<Box<dyn Stream<Item = IncomingMessage> + Send>>;

/// A message transport.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Channel name, used to route replies.
    fn name(&self) -> &str;

    /// Start receiving messages.
    async fn start(&self) -> Result<MessageStream, ChannelError>;

    /// Send a reply to the sender of `msg`.
    async fn respond(
        &self,
        msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError>;

    /// Verify the channel is reachable.
    async fn health_check(&self) -> Result<(), ChannelError>;

    async fn shutdown(&self) -> Result<(), ChannelError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_builder() {
        let resp = OutgoingResponse::text("hello")
            .with_markup(ReplyMarkup::Remove)
            .with_delivery(Delivery::EditOriginal);
        assert_eq!(resp.content, "hello");
        assert_eq!(resp.markup, Some(ReplyMarkup::Remove));
        assert_eq!(resp.delivery, Delivery::EditOriginal);
    }

    #[test]
    fn inline_buttons_flatten_rows() {
        let markup = ReplyMarkup::Inline {
            rows: vec![
                vec![InlineButton::new("a", "1"), InlineButton::new("b", "2")],
                vec![InlineButton::new("c", "3")],
            ],
        };
        let data: Vec<&str> = markup.inline_buttons().map(|b| b.data.as_str()).collect();
        assert_eq!(data, ["1", "2", "3"]);
        assert_eq!(ReplyMarkup::Remove.inline_buttons().count(), 0);
    }

    #[test]
    fn incoming_constructors() {
        let text = IncomingMessage::text("cli", 7, "hi");
        assert_eq!(text.payload, Payload::Text("hi".into()));
        assert_eq!(text.metadata, serde_json::json!({}));

        let cb = IncomingMessage::callback("telegram", 7, "page_2");
        assert_eq!(cb.payload, Payload::Callback("page_2".into()));
    }
}
