//! Dispatch loop: pulls messages off the channels, runs them through the
//! conversation engine and sends the replies back.

use futures::StreamExt;

use crate::channels::{ChannelManager, IncomingMessage};
use crate::conversation::{ConversationEngine, Event};
use crate::error::Error;

/// The running bot: one engine fed by every registered channel.
pub struct Bot {
    engine: ConversationEngine,
    channels: ChannelManager,
}

impl Bot {
    pub fn new(engine: ConversationEngine, channels: ChannelManager) -> Self {
        Self { engine, channels }
    }

    /// Process messages one at a time until the channels close or Ctrl+C.
    ///
    /// A storage fault stops the loop and is returned; failed sends are
    /// logged and skipped.
    pub async fn run(self) -> Result<(), Error> {
        let mut message_stream = self.channels.start_all().await?;

        tracing::info!(channels = ?self.channels.names(), "Bot ready and listening");

        let result = loop {
            let message = tokio::select! {
                biased;
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Ctrl+C received, shutting down...");
                    break Ok(());
                }
                msg = message_stream.next() => {
                    match msg {
                        Some(m) => m,
                        None => {
                            tracing::info!("All channel streams ended, shutting down...");
                            break Ok(());
                        }
                    }
                }
            };

            if let Err(e) = self.handle_message(&message).await {
                tracing::error!("Error handling message: {}", e);
                break Err(e);
            }
        };

        self.channels.shutdown_all().await;
        result
    }

    /// Run one message through the engine and deliver the replies in order.
    pub async fn handle_message(&self, message: &IncomingMessage) -> Result<(), Error> {
        let event = Event::from_incoming(message);
        tracing::debug!(
            channel = %message.channel,
            user = message.user_id,
            event = ?event,
            "Dispatching"
        );

        let replies = self.engine.handle(message.user_id, event).await?;
        for reply in replies {
            if let Err(e) = self.channels.respond(message, reply).await {
                tracing::warn!(channel = %message.channel, "Failed to send reply: {e}");
            }
        }
        Ok(())
    }
}
