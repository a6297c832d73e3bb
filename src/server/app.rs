use std::net::SocketAddr;

use tokio::net::TcpListener;
use tokio::sync::{oneshot, watch};
use tracing::{error, info};

use crate::config::Config;
use crate::error::{ConfigError, SiriusError};
use crate::server::client;
use crate::server::dispatcher::Dispatcher;

/// Wires config into engines, handlers, and a dispatcher, accepts client connections, and owns
/// the shutdown sequence.
pub struct App {
    config: Config,
}

impl App {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Runs until a shutdown signal (SIGINT/SIGTERM) arrives, then closes the listener, stops
    /// the dispatcher and handlers without draining their queues, and returns.
    pub async fn run(self) -> Result<(), SiriusError> {
        let (ready_tx, _ready_rx) = oneshot::channel();
        self.run_with_ready_signal(ready_tx).await
    }

    /// As [`App::run`], but sends the listener's bound address down `ready` once the socket is
    /// open. Lets tests using `client_addr = "127.0.0.1:0"` learn which port the OS picked.
    pub async fn run_with_ready_signal(
        self,
        ready: oneshot::Sender<SocketAddr>,
    ) -> Result<(), SiriusError> {
        self.config.validate()?;
        let client_addr = self
            .config
            .server
            .client_addr
            .clone()
            .ok_or(ConfigError::MissingClientAddr)?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let built = Dispatcher::build(&self.config, shutdown_rx.clone())?;

        let mut handler_tasks = Vec::new();
        for handler in built.handlers {
            handler_tasks.push(tokio::spawn(handler.run()));
        }
        let dispatcher_task = tokio::spawn(built.dispatcher.run());

        let listener = TcpListener::bind(&client_addr).await?;
        let bound_addr = listener.local_addr()?;
        info!(addr = %bound_addr, "sirius listening");
        let _ = ready.send(bound_addr);

        let job_tx = built.job_tx;
        let mut accept_shutdown = shutdown_rx.clone();
        let accept_task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    accepted = listener.accept() => {
                        match accepted {
                            Ok((stream, peer)) => {
                                let job_tx = job_tx.clone();
                                let shutdown_rx = accept_shutdown.clone();
                                tokio::spawn(async move {
                                    client::handle_connection(stream, peer, job_tx, shutdown_rx).await;
                                });
                            }
                            Err(err) => {
                                error!(error = %err, "accept failed");
                            }
                        }
                    }
                    _ = accept_shutdown.changed() => {
                        if *accept_shutdown.borrow() {
                            return;
                        }
                    }
                }
            }
        });

        wait_for_shutdown_signal().await;
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);

        let _ = accept_task.await;
        let _ = dispatcher_task.await;
        for task in handler_tasks {
            let _ = task.await;
        }

        Ok(())
    }
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm =
        signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
