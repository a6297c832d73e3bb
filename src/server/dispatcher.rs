use std::collections::HashMap;

use tokio::sync::{mpsc, watch};
use tracing::debug;

use crate::config::Config;
use crate::engine::new_engine;
use crate::error::ConfigError;
use crate::server::handler::{RankHandler, SnapshotRank};
use crate::server::job::{Job, JobResult};
use crate::server::{ERR_RANK_NOT_FOUND, MAX_BUFFERED_JOB};

/// Routes incoming jobs to the handler that owns their target rank.
///
/// Construction builds one [`RankHandler`] per primary rank (`primary_rank_id == 0`) and
/// attaches every other rank to its named primary's handler as a snapshot. The resulting map
/// covers both primary and snapshot ids, all pointing at the owning handler's queue.
pub struct Dispatcher {
    job_rx: mpsc::Receiver<Job>,
    routes: HashMap<u32, mpsc::Sender<Job>>,
    shutdown: watch::Receiver<bool>,
}

pub struct BuiltHandlers {
    pub dispatcher: Dispatcher,
    pub job_tx: mpsc::Sender<Job>,
    pub handlers: Vec<RankHandler>,
}

impl Dispatcher {
    /// Builds one handler per primary rank and attaches every other rank to its named primary's
    /// handler as a snapshot. Assumes `config.validate()` has already been called.
    pub fn build(config: &Config, shutdown: watch::Receiver<bool>) -> Result<BuiltHandlers, ConfigError> {
        let mut routes = HashMap::new();
        let mut handlers = Vec::new();

        for primary_def in config.ranks.iter().filter(|r| r.is_primary()) {
            let primary = new_engine(primary_def.engine_config());
            let snapshots: Vec<SnapshotRank> = config
                .ranks
                .iter()
                .filter(|r| !r.is_primary() && r.primary_rank_id == primary_def.id)
                .map(|snap_def| SnapshotRank {
                    id: snap_def.id,
                    engine: new_engine(snap_def.engine_config()),
                })
                .collect();

            let (handler, job_tx) =
                RankHandler::new(primary_def.id, primary, snapshots, shutdown.clone());
            for id in handler.owned_rank_ids() {
                routes.insert(id, job_tx.clone());
            }
            handlers.push(handler);
        }

        let (job_tx, job_rx) = mpsc::channel(MAX_BUFFERED_JOB);
        Ok(BuiltHandlers {
            dispatcher: Dispatcher {
                job_rx,
                routes,
                shutdown,
            },
            job_tx,
            handlers,
        })
    }

    pub async fn run(mut self) {
        loop {
            tokio::select! {
                job = self.job_rx.recv() => {
                    match job {
                        Some(job) => self.route(job).await,
                        None => break,
                    }
                }
                _ = self.shutdown.changed() => {
                    if *self.shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        debug!("dispatcher exit");
    }

    async fn route(&mut self, job: Job) {
        match self.routes.get(&job.rank_id) {
            Some(handler_tx) => {
                let _ = handler_tx.send(job).await;
            }
            None => {
                let result_tx = job.result_tx.clone();
                let _ = result_tx
                    .send(JobResult::error(job.ctx, ERR_RANK_NOT_FOUND))
                    .await;
            }
        }
    }
}
