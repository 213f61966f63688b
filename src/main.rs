use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use company_bot::bot::Bot;
use company_bot::channels::{ChannelManager, CliChannel, TelegramChannel};
use company_bot::config::{BotConfig, SessionStoreKind};
use company_bot::conversation::{
    ConversationEngine, DbSessionStore, MemorySessionStore, SessionStore,
};
use company_bot::directory::DirectorySeed;
use company_bot::store::{Database, LibSqlBackend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = BotConfig::from_env()?;

    // Keep the guard alive so buffered log lines are flushed on exit
    let _log_guard = init_tracing(config.log_dir.as_deref())?;

    eprintln!("🤖 Company Bot v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Page size: {}", config.page_size);

    // ── Database ─────────────────────────────────────────────────────────
    let db: Arc<dyn Database> = Arc::new(
        LibSqlBackend::new_local(&config.db_path)
            .await
            .with_context(|| format!("failed to open database at {}", config.db_path.display()))?,
    );
    eprintln!("   Database: {}", config.db_path.display());

    if let Some(ref seed_path) = config.seed_file {
        let seed = DirectorySeed::from_file(seed_path)
            .with_context(|| format!("failed to read seed file {}", seed_path.display()))?;
        let report = seed.apply(db.as_ref()).await?;
        eprintln!(
            "   Seed: {} employees added, {} already present",
            report.employees, report.skipped
        );
    }

    // ── Conversation ─────────────────────────────────────────────────────
    let sessions: Arc<dyn SessionStore> = match config.session_store {
        SessionStoreKind::Memory => Arc::new(MemorySessionStore::new()),
        SessionStoreKind::Database => Arc::new(DbSessionStore::new(Arc::clone(&db))),
    };
    eprintln!("   Sessions: {:?}", config.session_store);
    let engine = ConversationEngine::new(Arc::clone(&db), sessions, config.page_size);

    // ── Channels ─────────────────────────────────────────────────────────
    let mut channels = ChannelManager::new();

    if let Some(ref telegram) = config.telegram {
        eprintln!("   Telegram: enabled (allowed: {})", telegram.allowed_summary());
        channels.add(Arc::new(TelegramChannel::new(
            telegram.bot_token.clone(),
            telegram.allowed_users.clone(),
        )));
    }

    if let Some(user_id) = config.cli_user {
        eprintln!("   CLI: enabled as user {user_id} (`/cb <data>` presses a button)");
        channels.add(Arc::new(CliChannel::new(user_id)));
    }

    for (name, health) in channels.health_check_all().await {
        if let Err(e) = health {
            tracing::warn!(channel = %name, "Health check failed: {e}");
        }
    }

    eprintln!("   Channels: {}\n", channels.names().join(", "));

    Bot::new(engine, channels).run().await?;

    Ok(())
}

/// Install the global subscriber. With a log directory, output goes to a
/// daily rolling file instead of stderr.
fn init_tracing(log_dir: Option<&Path>) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, "company-bot.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            builder.with_ansi(false).with_writer(writer).init();
            Ok(Some(guard))
        }
        None => {
            // stdout belongs to the CLI channel
            builder.with_writer(std::io::stderr).init();
            Ok(None)
        }
    }
}
