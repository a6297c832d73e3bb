use tokio::sync::mpsc;

use crate::message::Request;

/// One decoded request in flight, carrying the channel its result should be written back to.
pub struct Job {
    pub rank_id: u32,
    pub ctx: u64,
    pub request: Request,
    pub result_tx: mpsc::Sender<JobResult>,
}

/// The outcome of a job, ready to be marshaled into a reply frame.
///
/// `payload` is empty whenever `err_code != 0`: protocol-level rejections (unknown rank, time
/// window miss, quiet-window miss) carry no response body, only the frame's error code.
pub struct JobResult {
    pub ctx: u64,
    pub payload_type: u32,
    pub err_code: i32,
    pub payload: Vec<u8>,
}

impl JobResult {
    pub fn error(ctx: u64, err_code: i32) -> Self {
        Self {
            ctx,
            payload_type: 0,
            err_code,
            payload: Vec::new(),
        }
    }
}
