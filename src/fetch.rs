//! Asynchronous panel fetches tagged with the selection they were issued for
//!
//! Each [`Fetcher::request`] runs its job on a worker thread and bumps a
//! generation counter. Results travel back over an mpsc channel and are only
//! accepted by [`Fetcher::poll`] when both the generation and the key still
//! match the latest request, so a slow fetch for an old selection can never
//! overwrite the display of a newer one.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::view_state::ViewMode;

/// The selection a content fetch was issued for
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FetchKey {
    pub repo_path: String,
    pub mode: ViewMode,
    pub file: Option<String>,
}

impl FetchKey {
    pub fn new(repo_path: impl Into<String>, mode: ViewMode, file: Option<String>) -> Self {
        Self {
            repo_path: repo_path.into(),
            mode,
            file,
        }
    }
}

/// A failed data-provider call, shown locally by the requesting panel
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct FetchError(pub String);

impl From<anyhow::Error> for FetchError {
    fn from(e: anyhow::Error) -> Self {
        FetchError(format!("{e:#}"))
    }
}

struct Tagged<K, T> {
    generation: u64,
    key: K,
    result: Result<T, FetchError>,
}

/// Issues fetches and filters out superseded results
pub struct Fetcher<K, T> {
    name: &'static str,
    generation: u64,
    current: Option<K>,
    in_flight: bool,
    tx: Sender<Tagged<K, T>>,
    rx: Receiver<Tagged<K, T>>,
}

impl<K, T> Fetcher<K, T>
where
    K: Clone + PartialEq + std::fmt::Debug + Send + 'static,
    T: Send + 'static,
{
    pub fn new(name: &'static str) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            name,
            generation: 0,
            current: None,
            in_flight: false,
            tx,
            rx,
        }
    }

    /// Key of the latest request, if it has not been cancelled
    pub fn current_key(&self) -> Option<&K> {
        self.current.as_ref()
    }

    /// Whether the latest request is still outstanding
    pub fn is_loading(&self) -> bool {
        self.in_flight
    }

    /// Start `job` for `key`. Any outstanding request is superseded.
    pub fn request<F>(&mut self, key: K, job: F)
    where
        F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    {
        self.generation += 1;
        let generation = self.generation;
        self.current = Some(key.clone());
        self.in_flight = true;
        tracing::debug!(fetch = self.name, generation, key = ?key, "fetch issued");

        let tx = self.tx.clone();
        let worker_key = key.clone();
        let spawned = std::thread::Builder::new()
            .name(format!("fetch-{}", self.name))
            .spawn(move || {
                let result = job().map_err(FetchError::from);
                // Receiver gone means the panel was torn down
                let _ = tx.send(Tagged {
                    generation,
                    key: worker_key,
                    result,
                });
            });

        if let Err(e) = spawned {
            tracing::warn!(fetch = self.name, error = %e, "failed to spawn fetch worker");
            let _ = self.tx.send(Tagged {
                generation,
                key,
                result: Err(FetchError(format!("failed to start fetch: {e}"))),
            });
        }
    }

    /// Forget the outstanding request; its result will be discarded.
    pub fn cancel(&mut self) {
        self.generation += 1;
        self.current = None;
        self.in_flight = false;
    }

    fn accept(&mut self, tagged: Tagged<K, T>) -> Option<(K, Result<T, FetchError>)> {
        let fresh = tagged.generation == self.generation
            && self.current.as_ref() == Some(&tagged.key);
        if !fresh {
            tracing::trace!(
                fetch = self.name,
                generation = tagged.generation,
                latest = self.generation,
                key = ?tagged.key,
                "discarding stale fetch result"
            );
            return None;
        }
        self.in_flight = false;
        Some((tagged.key, tagged.result))
    }

    /// Drain finished fetches without blocking. Returns the result of the
    /// latest request once it has arrived.
    pub fn poll(&mut self) -> Option<(K, Result<T, FetchError>)> {
        let mut accepted = None;
        while let Ok(tagged) = self.rx.try_recv() {
            if let Some(result) = self.accept(tagged) {
                accepted = Some(result);
            }
        }
        accepted
    }

    /// Block until the latest request resolves or `timeout` elapses.
    pub fn wait(&mut self, timeout: Duration) -> Option<(K, Result<T, FetchError>)> {
        let deadline = Instant::now() + timeout;
        while self.in_flight {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(remaining) {
                Ok(tagged) => {
                    if let Some(result) = self.accept(tagged) {
                        return Some(result);
                    }
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                    return None;
                }
            }
        }
        None
    }
}
