//! CLI channel: stdin/stdout REPL for trying the bot locally.
//!
//! Every line is sent as text from a single configured user. A line of the
//! form `/cb <data>` presses an inline button carrying `<data>`.

use async_trait::async_trait;
use futures::stream;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::channels::{
    Channel, Delivery, IncomingMessage, MessageStream, OutgoingResponse, Payload, ReplyMarkup,
};
use crate::directory::model::ExternalId;
use crate::error::ChannelError;

/// A simple CLI channel that reads from stdin and writes to stdout.
pub struct CliChannel {
    user_id: ExternalId,
}

impl CliChannel {
    pub fn new(user_id: ExternalId) -> Self {
        Self { user_id }
    }
}

/// Turn one input line into a payload. Blank lines yield `None`.
fn parse_line(line: &str) -> Option<Payload> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match line.strip_prefix("/cb ") {
        Some(data) => Some(Payload::Callback(data.trim().to_string())),
        None => Some(Payload::Text(line.to_string())),
    }
}

/// Render a reply and its buttons for the terminal.
fn render(response: &OutgoingResponse) -> String {
    let mut out = String::new();
    if response.delivery == Delivery::EditOriginal {
        out.push_str("(edited)\n");
    }
    out.push_str(&response.content);

    match &response.markup {
        Some(ReplyMarkup::Menu { rows }) => {
            for row in rows {
                let labels: Vec<String> = row.iter().map(|l| format!("[{l}]")).collect();
                out.push('\n');
                out.push_str(&labels.join(" "));
            }
        }
        Some(ReplyMarkup::Inline { rows }) => {
            for button in rows.iter().flatten() {
                out.push_str(&format!("\n  {} -> /cb {}", button.text, button.data));
            }
        }
        Some(ReplyMarkup::Remove) | None => {}
    }
    out
}

#[async_trait]
impl Channel for CliChannel {
    fn name(&self) -> &str {
        "cli"
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let user_id = self.user_id;

        tokio::spawn(async move {
            let stdin = tokio::io::stdin();
            let reader = BufReader::new(stdin);
            let mut lines = reader.lines();

            // Print prompt
            eprint!("> ");

            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let Some(payload) = parse_line(&line) else {
                            eprint!("> ");
                            continue;
                        };
                        let msg = IncomingMessage::new("cli", user_id, payload);
                        if tx.send(msg).is_err() {
                            break;
                        }
                    }
                    Ok(None) => break, // EOF
                    Err(e) => {
                        tracing::error!("Error reading stdin: {}", e);
                        break;
                    }
                }
            }
        });

        let stream = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|msg| (msg, rx))
        });

        Ok(Box::pin(stream))
    }

    async fn respond(
        &self,
        _msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError> {
        println!("\n{}\n", render(&response));
        eprint!("> ");
        Ok(())
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        Ok(())
    }
}
