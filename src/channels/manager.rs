//! ChannelManager: merges channel streams and routes replies back.

use std::collections::HashMap;
use std::sync::Arc;

use futures::stream;

use crate::channels::{Channel, IncomingMessage, MessageStream, OutgoingResponse};
use crate::error::ChannelError;

/// Owns the registered channels, keyed by name.
#[derive(Default)]
pub struct ChannelManager {
    channels: HashMap<String, Arc<dyn Channel>>,
}

impl ChannelManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a channel. A channel with the same name is replaced.
    pub fn add(&mut self, channel: Arc<dyn Channel>) {
        let name = channel.name().to_string();
        tracing::info!(channel = %name, "Channel registered");
        self.channels.insert(name, channel);
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.channels.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Start every channel and merge their streams into one.
    pub async fn start_all(&self) -> Result<MessageStream, ChannelError> {
        let mut streams = Vec::with_capacity(self.channels.len());
        for (name, channel) in &self.channels {
            let stream = channel.start().await?;
            tracing::info!(channel = %name, "Channel started");
            streams.push(stream);
        }
        Ok(Box::pin(stream::select_all(streams)))
    }

    /// Send a reply through the channel that produced `msg`.
    pub async fn respond(
        &self,
        msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError> {
        let channel = self
            .channels
            .get(&msg.channel)
            .ok_or_else(|| ChannelError::UnknownChannel {
                name: msg.channel.clone(),
            })?;
        channel.respond(msg, response).await
    }

    /// Health of every channel, by name.
    pub async fn health_check_all(&self) -> Vec<(String, Result<(), ChannelError>)> {
        let mut results = Vec::with_capacity(self.channels.len());
        for (name, channel) in &self.channels {
            results.push((name.clone(), channel.health_check().await));
        }
        results
    }

    pub async fn shutdown_all(&self) {
        for (name, channel) in &self.channels {
            if let Err(e) = channel.shutdown().await {
                tracing::warn!(channel = %name, "Channel shutdown failed: {e}");
            }
        }
    }
}
