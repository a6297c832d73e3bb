use std::net::SocketAddr;

use tokio::io::{ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use crate::frame::Frame;
use crate::message::Request;
use crate::server::job::{Job, JobResult};
use crate::server::MAX_BUFFERED_JOB_RESULT;

/// Drives one client connection: a reader loop that turns frames into jobs handed to the
/// dispatcher, and a writer loop that turns job results back into reply frames. The two run
/// concurrently; either one failing closes the connection for both.
pub async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    dispatcher_tx: mpsc::Sender<Job>,
    app_shutdown: watch::Receiver<bool>,
) {
    let (read_half, write_half) = tokio::io::split(stream);
    let (result_tx, result_rx) = mpsc::channel::<JobResult>(MAX_BUFFERED_JOB_RESULT);
    let (done_tx, done_rx) = watch::channel(false);

    let writer_done_rx = done_rx.clone();
    let writer_app_shutdown = app_shutdown.clone();
    let writer = tokio::spawn(run_writer(
        write_half,
        result_rx,
        writer_done_rx,
        writer_app_shutdown,
    ));

    run_reader(read_half, peer, dispatcher_tx, result_tx, done_rx, app_shutdown).await;
    let _ = done_tx.send(true);
    let _ = writer.await;
    debug!(%peer, "connection closed");
}

async fn run_reader(
    mut read_half: ReadHalf<TcpStream>,
    peer: SocketAddr,
    dispatcher_tx: mpsc::Sender<Job>,
    result_tx: mpsc::Sender<JobResult>,
    mut done_rx: watch::Receiver<bool>,
    mut app_shutdown: watch::Receiver<bool>,
) {
    loop {
        let frame = tokio::select! {
            frame = Frame::read_from(&mut read_half) => frame,
            _ = done_rx.changed() => return,
            _ = app_shutdown.changed() => return,
        };

        let frame = match frame {
            Ok(frame) => frame,
            Err(err) => {
                debug!(%peer, error = %err, "reading frame");
                return;
            }
        };

        let request = match Request::decode(frame.payload_type, &frame.payload) {
            Ok(request) => request,
            Err(err) => {
                warn!(%peer, error = %err, "decoding message payload");
                return;
            }
        };

        let job = Job {
            rank_id: request.rank(),
            ctx: frame.ctx,
            request,
            result_tx: result_tx.clone(),
        };
        if dispatcher_tx.send(job).await.is_err() {
            return;
        }
    }
}

async fn run_writer(
    mut write_half: WriteHalf<TcpStream>,
    mut result_rx: mpsc::Receiver<JobResult>,
    mut done_rx: watch::Receiver<bool>,
    mut app_shutdown: watch::Receiver<bool>,
) {
    loop {
        let result = tokio::select! {
            result = result_rx.recv() => result,
            _ = done_rx.changed() => return,
            _ = app_shutdown.changed() => return,
        };

        let result = match result {
            Some(result) => result,
            None => return,
        };

        let frame = if result.err_code != 0 {
            Frame::error(result.ctx, result.payload_type, result.err_code)
        } else {
            match Frame::new(result.ctx, result.payload_type, result.payload) {
                Ok(frame) => frame,
                Err(_) => continue,
            }
        };

        if let Err(err) = frame.write_to(&mut write_half).await {
            debug!(error = %err, "writing reply frame");
            return;
        }
    }
}

