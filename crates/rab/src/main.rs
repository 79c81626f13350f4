use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use rab_core::{
    config::{Config, Overrides, StorageConfig},
    storage::{memory::MemoryRepository, PageRepository},
};
use rab_postgres::PostgresRepository;

/// Telegram bot that keeps links for you and hands one back when you ask.
#[derive(Debug, Parser)]
#[command(name = "rab", version)]
struct Cli {
    /// Token for access to the telegram bot (falls back to TELEGRAM_BOT_TOKEN).
    #[arg(long = "tg-bot-token")]
    tg_bot_token: Option<String>,

    /// Keep pages in memory instead of PostgreSQL; they are lost on exit.
    #[arg(long)]
    memory_store: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    rab_core::logging::init("rab")?;

    let cfg = Arc::new(Config::load(&Overrides {
        telegram_bot_token: cli.tg_bot_token,
        memory_store: cli.memory_store,
    })?);

    let pages = open_storage(&cfg.storage).await?;

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "can't listen for ctrl-c");
                return;
            }
            info!("shutdown requested, finishing current batch");
            cancel.cancel();
        });
    }

    rab_telegram::router::run_polling(cfg, pages, cancel).await?;

    Ok(())
}

async fn open_storage(storage: &StorageConfig) -> anyhow::Result<Arc<dyn PageRepository>> {
    match storage {
        StorageConfig::Memory => {
            info!("using in-memory page store");
            Ok(Arc::new(MemoryRepository::new()))
        }
        StorageConfig::Postgres { url } => {
            let repo = PostgresRepository::connect(url).await?;
            repo.init().await?;
            Ok(Arc::new(repo))
        }
    }
}
