//! Mark-and-sweep garbage collection of remote binaries
//!
//! One session at a time walks `Idle -> Marking -> Sweeping -> Idle`. Callers
//! mark every fingerprint they still reference; `stop` lists the bucket and
//! counts (and optionally deletes) everything that was not marked. An object
//! is live when either its key or its etag is a marked fingerprint.
//!
//! The marking phase must be a quiescence window. Objects uploaded after the
//! mark set was fixed and never marked are collected like any other garbage.

use crate::error::{Result, StoreError};
use crate::fingerprint::Fingerprint;
use crate::remote::{Removal, RemoteStore};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Counters for the last (or running) collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GcStatus {
    pub num_live: u64,
    pub size_live: u64,
    pub num_collected: u64,
    pub size_collected: u64,
    pub duration_millis: u64,
}

/// Collector controller handed out by a store
pub trait GarbageCollector: Send + Sync {
    /// Stable identifier of the collected store
    fn id(&self) -> String;

    /// Begin a marking phase; fails with `AlreadyStarted` if one is running
    fn start(&self) -> Result<()>;

    /// Declare a fingerprint live; fails with `NotStarted` outside marking
    fn mark(&self, fingerprint: &Fingerprint) -> Result<()>;

    /// Sweep unmarked objects, deleting them when `delete` is set
    fn stop(&self, delete: bool) -> Result<GcStatus>;

    fn status(&self) -> GcStatus;

    fn in_progress(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Marking,
    Sweeping,
}

#[derive(Debug)]
struct GcState {
    phase: Phase,
    started: Option<Instant>,
    marked: HashSet<Fingerprint>,
    status: GcStatus,
}

/// Garbage collector over one S3 bucket, keeping the mark set in memory
pub struct S3GarbageCollector {
    remote: Arc<dyn RemoteStore>,
    state: Mutex<GcState>,
}

impl S3GarbageCollector {
    pub fn new(remote: Arc<dyn RemoteStore>) -> Self {
        S3GarbageCollector {
            remote,
            state: Mutex::new(GcState {
                phase: Phase::Idle,
                started: None,
                marked: HashSet::new(),
                status: GcStatus::default(),
            }),
        }
    }

    /// Number of fingerprints marked in the running session
    pub fn marked_count(&self) -> usize {
        self.state.lock().marked.len()
    }

    fn sweep(&self, marked: &HashSet<Fingerprint>, delete: bool) -> Result<GcStatus> {
        let mut status = GcStatus::default();

        for object in self.remote.list_objects()? {
            // Deletes go by key, so a marked key keeps the object whatever its etag
            let live = Fingerprint::parse(&object.key)
                .ok()
                .into_iter()
                .chain(object.fingerprint())
                .any(|fingerprint| marked.contains(&fingerprint));

            if live {
                status.num_live += 1;
                status.size_live += object.size;
                continue;
            }

            status.num_collected += 1;
            status.size_collected += object.size;
            if delete {
                match self.remote.delete_object(&object.key)? {
                    Removal::Deleted => debug!("Collected {} ({} bytes)", object.key, object.size),
                    Removal::AlreadyAbsent => debug!("Object {} already gone", object.key),
                }
            }
        }

        Ok(status)
    }
}

impl GarbageCollector for S3GarbageCollector {
    fn id(&self) -> String {
        format!("s3:{}", self.remote.bucket())
    }

    fn start(&self) -> Result<()> {
        let mut state = self.state.lock();
        if state.phase != Phase::Idle {
            return Err(StoreError::AlreadyStarted);
        }
        state.phase = Phase::Marking;
        state.started = Some(Instant::now());
        state.marked.clear();
        state.status = GcStatus::default();
        debug!("GC {} started", self.id());
        Ok(())
    }

    fn mark(&self, fingerprint: &Fingerprint) -> Result<()> {
        let mut state = self.state.lock();
        if state.phase != Phase::Marking {
            return Err(StoreError::NotStarted);
        }
        state.marked.insert(fingerprint.clone());
        Ok(())
    }

    fn stop(&self, delete: bool) -> Result<GcStatus> {
        let (marked, started) = {
            let mut state = self.state.lock();
            if state.phase != Phase::Marking {
                return Err(StoreError::NotStarted);
            }
            state.phase = Phase::Sweeping;
            (std::mem::take(&mut state.marked), state.started)
        };

        let outcome = self.sweep(&marked, delete);
        drop(marked);

        let mut state = self.state.lock();
        state.phase = Phase::Idle;
        state.started = None;

        let mut status = match outcome {
            Ok(status) => status,
            Err(e) => {
                warn!("GC {} failed: {}", self.id(), e);
                return Err(e);
            }
        };
        status.duration_millis = started
            .map(|t| t.elapsed().as_millis() as u64)
            .unwrap_or_default();
        state.status = status;

        info!(
            "GC {} done in {}ms: {} live ({} bytes), {} {} ({} bytes)",
            self.id(),
            status.duration_millis,
            status.num_live,
            status.size_live,
            status.num_collected,
            if delete { "deleted" } else { "collectable" },
            status.size_collected
        );
        Ok(status)
    }

    fn status(&self) -> GcStatus {
        self.state.lock().status
    }

    fn in_progress(&self) -> bool {
        self.state.lock().phase != Phase::Idle
    }
}

impl std::fmt::Debug for S3GarbageCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("S3GarbageCollector")
            .field("bucket", &self.remote.bucket())
            .field("phase", &state.phase)
            .field("marked", &state.marked.len())
            .finish()
    }
}
