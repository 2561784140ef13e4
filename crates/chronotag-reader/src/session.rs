//! Deduplicating session store.
//!
//! The authoritative set of tags seen this session. One mutex guards the
//! record collection, the seen-EPC index, and the synchronous sink writes:
//! dedup check, insertion, stat computation, and the event-log row all
//! happen under the same lock, so detection throughput is bounded by
//! persistence latency. That is the intended trade — a detection is either
//! fully recorded (memory and sinks attempted) or not recorded at all.

use chronotag_core::{Epc, EventRecord, Gate, SessionStats, TagRecord};
use chronotag_storage::{EventLog, Region, RegionStore, StorageResult};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{info, trace, warn};

#[derive(Debug)]
struct SessionInner {
    /// Detection order is insertion order.
    records: Vec<TagRecord>,

    /// Fast dedup index over `records`.
    seen: HashSet<Epc>,

    /// Gate new detections are recorded against.
    gate: Gate,

    event_log: EventLog,
    store: RegionStore,
}

/// Lock-guarded session state shared between the parser thread and the
/// control thread.
#[derive(Debug, Clone)]
pub struct SessionStore {
    inner: Arc<Mutex<SessionInner>>,
}

impl SessionStore {
    /// Create an empty session writing to the given sinks.
    #[must_use]
    pub fn new(event_log: EventLog, store: RegionStore, gate: Gate) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SessionInner {
                records: Vec::new(),
                seen: HashSet::new(),
                gate,
                event_log,
                store,
            })),
        }
    }

    /// Offer a parsed detection to the session.
    ///
    /// Under the lock: if the EPC is already present this session, the
    /// detection is discarded (not re-recorded, not re-persisted) and
    /// `false` is returned. Otherwise the record is appended, both sinks
    /// are written synchronously (failures logged, never propagated — a
    /// lost write loses that row only), and `true` is returned.
    pub fn observe(&self, record: TagRecord) -> bool {
        let mut inner = self.lock();

        if inner.seen.contains(&record.epc) {
            trace!(epc = %record.epc, "duplicate tag ignored");
            return false;
        }

        if let Err(err) = inner.event_log.append(&record) {
            warn!(%err, epc = %record.epc, "event log write failed");
        }
        let event = EventRecord {
            epc: record.epc.clone(),
            timestamp: record.timestamp,
            gate: inner.gate,
        };
        if let Err(err) = inner.store.append_event(&event) {
            warn!(%err, epc = %record.epc, "region store write failed");
        }

        info!(
            epc = %record.epc,
            rssi = record.rssi,
            antenna = %record.antenna,
            gate = %inner.gate,
            total = inner.records.len() + 1,
            "tag detected"
        );

        inner.seen.insert(record.epc.clone());
        inner.records.push(record);
        true
    }

    /// Copy of the session's records, in detection order.
    ///
    /// Callers own the copy; mutating it cannot affect the live session.
    #[must_use]
    pub fn snapshot(&self) -> Vec<TagRecord> {
        self.lock().records.clone()
    }

    /// Session statistics, computed under the same lock as insertions.
    #[must_use]
    pub fn stats(&self) -> SessionStats {
        let inner = self.lock();
        SessionStats {
            total_reads: inner.records.len(),
            last_read: inner.records.last().map(|r| r.timestamp),
        }
    }

    /// Gate new detections are recorded against.
    #[must_use]
    pub fn gate(&self) -> Gate {
        self.lock().gate
    }

    /// Switch the gate for subsequent detections.
    pub fn set_gate(&self, gate: Gate) {
        let mut inner = self.lock();
        info!(%gate, "recording gate changed");
        inner.gate = gate;
    }

    /// Clear session data.
    ///
    /// With `None`: empties the in-memory collection, truncates the event
    /// log body, and clears every store region — headers persist
    /// everywhere. With a specific region: clears only that region's rows,
    /// leaving the in-memory session untouched.
    ///
    /// # Errors
    /// Propagates sink failures; this is a caller-invoked operation, not
    /// part of the pipeline.
    pub fn clear(&self, region: Option<Region>) -> StorageResult<()> {
        let mut inner = self.lock();
        match region {
            None => {
                inner.records.clear();
                inner.seen.clear();
                inner.event_log.reset()?;
                inner.store.clear_all()?;
                info!("session data cleared");
            }
            Some(region) => {
                inner.store.clear_region(region)?;
                info!(region = region.name(), "region cleared");
            }
        }
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
