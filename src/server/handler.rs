use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time;
use tracing::{debug, error, info};

use crate::engine::RankEngine;
use crate::message::{
    DeleteResponse, GetByRankResponse, GetRangeResponse, GetResponse, Request, Response,
    UpdateResponse,
};
use crate::server::job::{Job, JobResult};
use crate::server::{unix_now, ERR_NO_UPDATE_TIME_PERIOD, ERR_SERVER_TIME_RANGE, MAX_BUFFERED_JOB};

const CRON_INTERVAL: Duration = Duration::from_millis(500);

/// A rank attached to a primary as a periodically-reseeded snapshot.
pub struct SnapshotRank {
    pub id: u32,
    pub engine: Box<dyn RankEngine>,
}

/// Owns exactly one primary rank and its attached snapshots. All mutation of those engines
/// happens on this task; nothing outside ever touches them directly.
pub struct RankHandler {
    primary_id: u32,
    primary: Box<dyn RankEngine>,
    snapshots: Vec<SnapshotRank>,
    job_rx: mpsc::Receiver<Job>,
    shutdown: watch::Receiver<bool>,
}

impl RankHandler {
    pub fn new(
        primary_id: u32,
        primary: Box<dyn RankEngine>,
        snapshots: Vec<SnapshotRank>,
        shutdown: watch::Receiver<bool>,
    ) -> (Self, mpsc::Sender<Job>) {
        let (job_tx, job_rx) = mpsc::channel(MAX_BUFFERED_JOB);
        (
            Self {
                primary_id,
                primary,
                snapshots,
                job_rx,
                shutdown,
            },
            job_tx,
        )
    }

    /// Every rank id this handler owns: its primary plus each attached snapshot.
    pub fn owned_rank_ids(&self) -> Vec<u32> {
        let mut ids = vec![self.primary_id];
        ids.extend(self.snapshots.iter().map(|s| s.id));
        ids
    }

    pub async fn run(mut self) {
        let mut cron = time::interval(CRON_INTERVAL);
        loop {
            tokio::select! {
                job = self.job_rx.recv() => {
                    match job {
                        Some(job) => self.handle_job(job).await,
                        None => break,
                    }
                }
                _ = cron.tick() => {
                    self.run_cron(unix_now());
                }
                _ = self.shutdown.changed() => {
                    if *self.shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!(rank_id = self.primary_id, "rank handler exit");
    }

    /// Clear-then-snapshot pass over every attached snapshot, then clear the primary.
    fn run_cron(&mut self, now: u64) {
        for snap in &mut self.snapshots {
            maybe_clear(snap.engine.as_mut(), now);
            maybe_snapshot(snap.engine.as_mut(), self.primary.as_ref(), now);
        }
        maybe_clear(self.primary.as_mut(), now);
    }

    async fn handle_job(&mut self, job: Job) {
        let now = unix_now();
        let rank_id = job.rank_id;
        let ctx = job.ctx;
        let is_primary = rank_id == self.primary_id;

        if !is_primary && !self.snapshots.iter().any(|s| s.id == rank_id) {
            error!(
                rank_id,
                handler = self.primary_id,
                "job routed to handler that does not own this rank"
            );
            std::process::abort();
        }

        if is_primary {
            let primary = &*self.primary;
            for snap in &mut self.snapshots {
                maybe_snapshot(snap.engine.as_mut(), primary, now);
            }
        } else {
            let primary = &*self.primary;
            let snap = self
                .snapshots
                .iter_mut()
                .find(|s| s.id == rank_id)
                .expect("presence already checked above");
            maybe_snapshot(snap.engine.as_mut(), primary, now);
        }

        let target: &mut dyn RankEngine = if is_primary {
            self.primary.as_mut()
        } else {
            self.snapshots
                .iter_mut()
                .find(|s| s.id == rank_id)
                .expect("presence already checked above")
                .engine
                .as_mut()
        };
        maybe_clear(target, now);

        debug!(rank_id, ctx, "handling job");

        let result = match job.request {
            Request::Get(req) => {
                let (_, pos, data) = target.get(req.id);
                Some(ok(ctx, Response::Get(GetResponse { rank: rank_id, pos, data })))
            }
            Request::GetByRank(req) => {
                let (exist, data) = target.get_by_rank(req.pos);
                let pos = if exist { req.pos } else { 0 };
                Some(ok(
                    ctx,
                    Response::GetByRank(GetByRankResponse { rank: rank_id, pos, data }),
                ))
            }
            Request::GetRange(req) => {
                let data = target.get_range(req.start, req.num);
                let total = target.size();
                Some(ok(
                    ctx,
                    Response::GetRange(GetRangeResponse { rank: rank_id, total, data }),
                ))
            }
            Request::Update(req) => {
                let rejection = if (req.time_begin != 0 || req.time_end != 0)
                    && !(req.time_begin <= now && now < req.time_end)
                {
                    Some(ERR_SERVER_TIME_RANGE)
                } else if !req.bypass_no_update_period
                    && target.config().no_update_period.contains(now)
                {
                    Some(ERR_NO_UPDATE_TIME_PERIOD)
                } else {
                    None
                };

                if !req.reply {
                    if rejection.is_none() {
                        run_update(target, &req);
                    }
                    None
                } else if let Some(code) = rejection {
                    Some(JobResult::error(ctx, code))
                } else {
                    let (last_pos, last_data) = run_update(target, &req);
                    let (_, pos, _) = target.get(req.data.id);
                    Some(ok(
                        ctx,
                        Response::Update(UpdateResponse {
                            rank: rank_id,
                            last_pos,
                            pos,
                            data: if req.last_data { Some(last_data) } else { None },
                        }),
                    ))
                }
            }
            Request::Delete(req) => {
                let (existed, last_pos, last_data) = target.delete(req.id);
                if !req.reply {
                    None
                } else {
                    Some(ok(
                        ctx,
                        Response::Delete(DeleteResponse {
                            rank: rank_id,
                            last_pos: if existed { last_pos } else { 0 },
                            data: if req.last_data { Some(last_data) } else { None },
                        }),
                    ))
                }
            }
        };

        if let Some(result) = result {
            let _ = job.result_tx.send(result).await;
        }
    }
}

/// Performs the actual mutation for an accepted `Update`, returning `(lastPos, previousUnit)`
/// observed immediately beforehand. Mirrors the reference handler's two-`get`-calls approach
/// (see the tie-break/update-shape design notes) rather than relying on `update`'s own return.
fn run_update(
    target: &mut dyn RankEngine,
    req: &crate::message::UpdateRequest,
) -> (u32, crate::engine::RankUnit) {
    let (existed, last_pos, last_data) = target.get(req.data.id);
    target.update(req.data.clone());
    (if existed { last_pos } else { 0 }, last_data)
}

fn maybe_snapshot(snap: &mut dyn RankEngine, primary: &dyn RankEngine, now: u64) {
    let period = snap.config().snapshot_period;
    if !period.empty() && period.next_time(snap.last_snapshot_time()) <= now {
        snap.copy_from(primary);
        snap.set_last_snapshot_time(now);
    }
}

fn maybe_clear(engine: &mut dyn RankEngine, now: u64) {
    let period = engine.config().clear_period;
    if !period.empty() && period.next_time(engine.last_clear_time()) <= now {
        engine.clear();
        engine.set_last_clear_time(now);
    }
}

fn ok(ctx: u64, resp: Response) -> JobResult {
    JobResult {
        ctx,
        payload_type: resp.payload_type() as u32,
        err_code: 0,
        payload: resp.encode(),
    }
}
