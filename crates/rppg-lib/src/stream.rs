use crate::{
    clock::Clock,
    session::{AnalysisResult, Pump, Session, SessionError},
    source::FrameSource,
};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use log::{info, warn};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

const UPDATE_CAPACITY: usize = 32;

/// A [`Session`] pumped from a worker thread. Each pump runs under the
/// session lock, so readers never see a half-updated window.
pub struct SessionStream<C: Clock + Send + 'static> {
    session: Arc<Mutex<Session<C>>>,
    stop_tx: Sender<()>,
    updates: Receiver<AnalysisResult>,
    handle: Option<JoinHandle<()>>,
}

fn lock<C: Clock>(session: &Mutex<Session<C>>) -> MutexGuard<'_, Session<C>> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<C: Clock + Send + 'static> SessionStream<C> {
    /// Start `session` on `source` and pump it from a worker thread, waiting
    /// `frame_interval` between frames (zero drains the source as fast as it
    /// yields). Acquisition errors are returned before any thread is spawned.
    pub fn spawn<S>(
        mut session: Session<C>,
        source: S,
        frame_interval: Duration,
    ) -> Result<Self, SessionError>
    where
        S: FrameSource + Send + 'static,
    {
        session.start(source)?;
        let session = Arc::new(Mutex::new(session));
        let (stop_tx, stop_rx) = bounded(1);
        let (update_tx, updates) = bounded(UPDATE_CAPACITY);
        let worker = Arc::clone(&session);
        let handle = std::thread::spawn(move || {
            run_worker(worker, stop_rx, update_tx, frame_interval);
        });
        Ok(Self {
            session,
            stop_tx,
            updates,
            handle: Some(handle),
        })
    }

    /// Latest published result.
    pub fn snapshot(&self) -> AnalysisResult {
        lock(&self.session).result().clone()
    }

    /// The last `n` RR intervals (ms).
    pub fn recent_rr(&self, n: usize) -> Vec<f64> {
        lock(&self.session).recent_rr(n).to_vec()
    }

    /// Results published by the worker, in order. Updates are dropped while
    /// the channel is full; `snapshot` always has the newest one.
    pub fn updates(&self) -> &Receiver<AnalysisResult> {
        &self.updates
    }

    /// Whether the worker has exited (source exhausted, failed or stopped).
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }

    /// Stop the worker, wait for it and stop the session. No analysis pass
    /// runs after this returns. Safe to call repeatedly.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = self.stop_tx.try_send(());
            if handle.join().is_err() {
                warn!("session worker panicked");
            }
        }
        lock(&self.session).stop();
    }
}

impl<C: Clock + Send + 'static> Drop for SessionStream<C> {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_worker<C: Clock>(
    session: Arc<Mutex<Session<C>>>,
    stop_rx: Receiver<()>,
    update_tx: Sender<AnalysisResult>,
    frame_interval: Duration,
) {
    loop {
        if stop_rx.try_recv().is_ok() {
            break;
        }
        let pumped = {
            let mut guard = lock(&session);
            match guard.pump() {
                Ok(Pump::Frame { published: true }) => Ok(Some(guard.result().clone())),
                Ok(Pump::Frame { published: false }) => Ok(None),
                Ok(Pump::Exhausted) => break,
                Err(err) => Err((err, guard.result().clone())),
            }
        };
        match pumped {
            Ok(Some(result)) => {
                let _ = update_tx.try_send(result);
            }
            Ok(None) => {}
            Err((err, result)) => {
                warn!("session worker stopping: {err}");
                let _ = update_tx.try_send(result);
                break;
            }
        }
        if !frame_interval.is_zero() {
            match stop_rx.recv_timeout(frame_interval) {
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {}
            }
        }
    }
    info!("session worker exited");
}
