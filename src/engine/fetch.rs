//! engine::fetch
//!
//! Concurrent object reads with in-order hand-off.
//!
//! # Design
//!
//! A [`Fetcher`] serves one object store. With `jobs > 1` it owns a pool of
//! worker threads, each opening its own [`ObjectReader`] before reporting
//! ready. Workers only read
//! and decompress; results travel back over a channel to the owning
//! (sequencing) thread, which parks them until the walker asks for them.
//! The walker therefore sees objects strictly in traversal order no matter
//! how reads were scheduled.
//!
//! Hints are bounded by the prefetch window: once that many objects are in
//! flight or parked, further hints are dropped and those objects are read
//! on demand.
//!
//! Dropping a fetcher closes the job queue, joins the workers and discards
//! anything still parked.

use std::collections::{HashMap, HashSet};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use tracing::{debug, trace};

use crate::core::error::EvtagError;
use crate::core::object::RawObject;
use crate::core::store::{ObjectReader, ObjectSource};
use crate::core::types::Oid;

type ReadResult = Result<RawObject, EvtagError>;

/// Object reader for one store, optionally backed by a worker pool.
pub struct Fetcher {
    mode: Mode,
}

enum Mode {
    Inline(Box<dyn ObjectReader>),
    Pool(Pool),
}

struct Pool {
    jobs: Option<Sender<Oid>>,
    results: Receiver<(Oid, ReadResult)>,
    workers: Vec<JoinHandle<()>>,
    /// Requested and not yet received
    in_flight: HashSet<Oid>,
    /// Received and not yet handed out
    parked: HashMap<Oid, ReadResult>,
    window: usize,
}

impl Fetcher {
    /// Create a fetcher over `source` with `jobs` workers.
    ///
    /// `jobs <= 1` reads inline on the calling thread.
    ///
    /// # Errors
    ///
    /// Fails if a reader cannot be opened or a worker cannot be spawned;
    /// workers already started are joined first.
    pub fn new(
        source: &Arc<dyn ObjectSource>,
        jobs: usize,
        window: usize,
    ) -> Result<Self, EvtagError> {
        if jobs <= 1 {
            return Ok(Self {
                mode: Mode::Inline(source.reader()?),
            });
        }

        let (job_tx, job_rx) = mpsc::channel::<Oid>();
        let (result_tx, result_rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), EvtagError>>();
        let job_rx = Arc::new(Mutex::new(job_rx));

        let mut pool = Pool {
            jobs: Some(job_tx),
            results: result_rx,
            workers: Vec::with_capacity(jobs),
            in_flight: HashSet::new(),
            parked: HashMap::new(),
            window: window.max(1),
        };

        for index in 0..jobs {
            let source = Arc::clone(source);
            let job_rx = Arc::clone(&job_rx);
            let result_tx = result_tx.clone();
            let ready = ready_tx.clone();
            let handle = thread::Builder::new()
                .name(format!("evtag-read-{index}"))
                .spawn(move || {
                    let reader = match source.reader() {
                        Ok(reader) => reader,
                        Err(err) => {
                            let _ = ready.send(Err(err));
                            return;
                        }
                    };
                    let _ = ready.send(Ok(()));
                    drop(ready);
                    worker(reader, job_rx, result_tx);
                })
                .map_err(|e| EvtagError::Store {
                    message: format!("failed to spawn reader thread: {e}"),
                })?;
            pool.workers.push(handle);
        }
        drop(ready_tx);

        for _ in 0..jobs {
            match ready_rx.recv() {
                Ok(Ok(())) => {}
                Ok(Err(err)) => return Err(err),
                Err(_) => {
                    return Err(EvtagError::Store {
                        message: "object reader thread exited during startup".to_string(),
                    })
                }
            }
        }

        debug!(store = %source.store_id(), jobs, window, "started object reader pool");

        Ok(Self {
            mode: Mode::Pool(pool),
        })
    }

    /// Hint that `oid` will be fetched soon.
    pub fn prefetch(&mut self, oid: &Oid) {
        let Mode::Pool(pool) = &mut self.mode else {
            return;
        };
        if pool.in_flight.contains(oid) || pool.parked.contains_key(oid) {
            return;
        }
        if pool.in_flight.len() + pool.parked.len() >= pool.window {
            return;
        }
        pool.request(oid);
    }

    /// Read `oid`, waiting for a worker if necessary.
    pub fn fetch(&mut self, oid: &Oid) -> ReadResult {
        match &mut self.mode {
            Mode::Inline(reader) => reader.read(oid),
            Mode::Pool(pool) => pool.fetch(oid),
        }
    }
}

impl Pool {
    fn request(&mut self, oid: &Oid) {
        if let Some(jobs) = &self.jobs {
            if jobs.send(oid.clone()).is_ok() {
                self.in_flight.insert(oid.clone());
            }
        }
    }

    fn fetch(&mut self, oid: &Oid) -> ReadResult {
        if let Some(result) = self.parked.remove(oid) {
            return result;
        }
        if !self.in_flight.contains(oid) {
            trace!(%oid, "prefetch miss");
            self.request(oid);
        }

        loop {
            let (got, result) = self.results.recv().map_err(|_| EvtagError::Store {
                message: "object reader pool stopped unexpectedly".to_string(),
            })?;
            self.in_flight.remove(&got);
            if got == *oid {
                return result;
            }
            self.parked.insert(got, result);
        }
    }
}

impl Drop for Pool {
    fn drop(&mut self) {
        // Closing the queue ends each worker's receive loop.
        self.jobs = None;
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
        if !self.parked.is_empty() || !self.in_flight.is_empty() {
            trace!(
                parked = self.parked.len(),
                in_flight = self.in_flight.len(),
                "discarded unread prefetches"
            );
        }
    }
}

fn worker(
    mut reader: Box<dyn ObjectReader>,
    jobs: Arc<Mutex<Receiver<Oid>>>,
    results: Sender<(Oid, ReadResult)>,
) {
    loop {
        let next = {
            let queue = match jobs.lock() {
                Ok(queue) => queue,
                Err(poisoned) => poisoned.into_inner(),
            };
            queue.recv()
        };
        let Ok(oid) = next else {
            return;
        };
        let result = reader.read(&oid);
        if results.send((oid, result)).is_err() {
            return;
        }
    }
}
