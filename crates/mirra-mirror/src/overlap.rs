//! Background copies for overlapped transfers.
//!
//! An overlapped transfer moves the source and destination buffers out of
//! the field and onto a short-lived worker thread. The buffers come back
//! through a oneshot channel when the field is next used. If the worker
//! cannot be spawned the job is handed back by the failed `send` and the
//! copy runs inline, so buffers are never lost.

use crossbeam_channel::Receiver;

use crate::mirrored::Element;

/// A copy running (or finished) off the control thread.
pub(crate) struct InFlight<T> {
    pub src: usize,
    pub dst: usize,
    done: Receiver<(Vec<T>, Vec<T>)>,
}

impl<T: Element> InFlight<T> {
    /// Start copying `src_buf` into `dst_buf`.
    pub fn start(src: usize, dst: usize, src_buf: Vec<T>, dst_buf: Vec<T>) -> Self {
        let (job_tx, job_rx) = crossbeam_channel::bounded::<(Vec<T>, Vec<T>)>(1);
        let (done_tx, done_rx) = crossbeam_channel::bounded(1);

        let worker_done = done_tx.clone();
        let _ = std::thread::Builder::new()
            .name("mirra-transfer".into())
            .spawn(move || {
                if let Ok((from, mut into)) = job_rx.recv() {
                    into.copy_from_slice(&from);
                    let _ = worker_done.send((from, into));
                }
            });

        if let Err(returned) = job_tx.send((src_buf, dst_buf)) {
            // Worker never started; its receiver is gone.
            let (from, mut into) = returned.into_inner();
            into.copy_from_slice(&from);
            let _ = done_tx.send((from, into));
        }

        Self {
            src,
            dst,
            done: done_rx,
        }
    }

    /// Whether the copy has finished and can be joined without blocking.
    pub fn is_ready(&self) -> bool {
        !self.done.is_empty()
    }

    /// Block until the copy finishes and return `(src_buf, dst_buf)`.
    pub fn join(self) -> (Vec<T>, Vec<T>) {
        self.done
            .recv()
            .expect("transfer worker holds the only other sender and always replies")
    }
}
