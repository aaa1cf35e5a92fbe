use clap::Parser;
use miette::{IntoDiagnostic, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use wallet_ledger::application::ledger::WalletLedger;
use wallet_ledger::config::ServerArgs;
use wallet_ledger::domain::ports::WalletStoreBox;
use wallet_ledger::infrastructure::in_memory::InMemoryWalletStore;
use wallet_ledger::interfaces::http::create_router;
use wallet_ledger::logging::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    let args = ServerArgs::parse();
    init_logging(&args.log_level, args.log_format);

    let store = open_store(&args)?;
    let ledger = Arc::new(WalletLedger::new(store, args.ledger_config()));
    let app = create_router(ledger.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], args.http_port));
    let listener = tokio::net::TcpListener::bind(addr).await.into_diagnostic()?;
    tracing::info!(%addr, "wallet ledger listening");

    // The server keeps answering (with 503) while the ledger drains, and
    // stops accepting connections once the drain future resolves.
    axum::serve(listener, app)
        .with_graceful_shutdown(drain_on_signal(ledger, args.shutdown_timeout()))
        .await
        .into_diagnostic()?;

    tracing::info!("server stopped");
    Ok(())
}

#[cfg(feature = "storage-rocksdb")]
fn open_store(args: &ServerArgs) -> Result<WalletStoreBox> {
    use wallet_ledger::infrastructure::rocksdb::RocksDbWalletStore;

    match &args.db_path {
        Some(path) => {
            tracing::info!(path = %path.display(), "opening RocksDB wallet store");
            let store = RocksDbWalletStore::open(path).into_diagnostic()?;
            Ok(Box::new(store))
        }
        None => Ok(Box::new(InMemoryWalletStore::new())),
    }
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_store(args: &ServerArgs) -> Result<WalletStoreBox> {
    if args.db_path.is_some() {
        tracing::warn!(
            db_path = ?args.db_path,
            "'storage-rocksdb' feature is not enabled; falling back to in-memory storage"
        );
    }
    Ok(Box::new(InMemoryWalletStore::new()))
}

async fn drain_on_signal(ledger: Arc<WalletLedger>, timeout: Duration) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C, draining wallet operations"),
        _ = terminate => tracing::info!("received SIGTERM, draining wallet operations"),
    }

    match ledger.shutdown(timeout).await {
        Ok(()) => tracing::info!("wallet operations drained"),
        Err(err) => tracing::warn!(error = %err, "forcing shutdown"),
    }
}
