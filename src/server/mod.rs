//! In-process startup of the link service.
//!
//! Pending links live in memory, so the callback server and the
//! [`AccountLinker`] handed to the chat application must come from the same
//! [`serve`] call. Anything started elsewhere cannot complete a link here.

use crate::api::create_router;
use crate::config::LinkConfig;
use crate::credentials::CredentialStore;
use crate::link::AccountLinker;
use crate::oauth::{run_pending_cleanup, LinkCoordinator};
use crate::settings::ChannelSettingsStore;
use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// A running callback server together with the façade that feeds it.
pub struct LinkServer {
    linker: AccountLinker,
    local_addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    server: JoinHandle<()>,
    cleanup: JoinHandle<()>,
}

impl LinkServer {
    pub fn linker(&self) -> &AccountLinker {
        &self.linker
    }

    /// Address the callback server is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting requests, drain in-flight ones and stop the sweep.
    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        self.cleanup.abort();
        self.server.await.context("Callback server task failed")?;
        info!("Link server stopped");
        Ok(())
    }
}

/// Open the stores, bind the callback listener and start serving.
///
/// `config` is expected to have passed [`LinkConfig::validate`].
pub async fn serve(config: &LinkConfig) -> Result<LinkServer> {
    let credential_store = Arc::new(
        CredentialStore::new(&config.database_path, &config.encryption_key)
            .context("Failed to initialize credential store")?,
    );
    info!(
        linked_accounts = credential_store
            .count()
            .context("Failed to count linked accounts")?,
        "Credential store initialized"
    );

    let settings = Arc::new(
        ChannelSettingsStore::new(&config.database_path)
            .context("Failed to initialize channel settings store")?,
    );

    let coordinator = Arc::new(LinkCoordinator::from_config(config, credential_store)?);

    let listener = tokio::net::TcpListener::bind(config.bind_address())
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_address()))?;
    let local_addr = listener
        .local_addr()
        .context("Failed to read listener address")?;

    let cleanup = tokio::spawn(run_pending_cleanup(
        coordinator.pending().clone(),
        Duration::from_secs(config.link.cleanup_interval_seconds),
    ));

    let router = create_router(Arc::clone(&coordinator));
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let server = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await
        {
            error!(error = %e, "Callback server error");
        }
    });

    info!(address = %local_addr, "OAuth callback server listening");

    Ok(LinkServer {
        linker: AccountLinker::new(coordinator, settings),
        local_addr,
        shutdown_tx: Some(shutdown_tx),
        server,
        cleanup,
    })
}
