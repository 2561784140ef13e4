//! The two worker loops of the pipeline.
//!
//! The acquisition loop drains the device into the ingestion queue and
//! keeps the inventory alive; the parser loop drains the queue through the
//! frame scanner into the session store. The queue is the sole hand-off
//! point between the two, decoupling their paces: a slow sink write never
//! backs up into a missed serial read.
//!
//! Both loops poll the shared running flag each iteration and must survive
//! every error while it is set — an I/O failure is logged and followed by
//! a longer backoff sleep, never by loop exit.

use crate::error::Result;
use crate::inventory::InventoryController;
use crate::port::SharedPort;
use crate::session::SessionStore;
use chronotag_core::TagRecord;
use chronotag_core::constants::{ERROR_BACKOFF_MS, INVENTORY_RETRIGGER_MS, POLL_INTERVAL_MS};
use chronotag_protocol::FrameScanner;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Spawn the acquisition loop on a named thread.
///
/// # Errors
/// Returns the OS error if the thread cannot be spawned.
pub(crate) fn spawn_acquisition_loop(
    port: SharedPort,
    inventory: InventoryController,
    num_antennas: u8,
    running: Arc<AtomicBool>,
    tx: Sender<Vec<u8>>,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("chronotag-acquire".to_string())
        .spawn(move || acquisition_loop(&port, &inventory, num_antennas, &running, &tx))
}

/// Spawn the parser loop on a named thread.
///
/// # Errors
/// Returns the OS error if the thread cannot be spawned.
pub(crate) fn spawn_parser_loop(
    rx: Receiver<Vec<u8>>,
    scanner: FrameScanner,
    session: SessionStore,
    running: Arc<AtomicBool>,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("chronotag-parse".to_string())
        .spawn(move || parser_loop(&rx, scanner, &session, &running))
}

fn acquisition_loop(
    port: &SharedPort,
    inventory: &InventoryController,
    num_antennas: u8,
    running: &AtomicBool,
    tx: &Sender<Vec<u8>>,
) {
    let mut last_inventory = Instant::now();

    while running.load(Ordering::Relaxed) {
        if let Err(err) = drain_device(port, tx) {
            warn!(%err, "read loop error");
            thread::sleep(Duration::from_millis(ERROR_BACKOFF_MS));
            continue;
        }

        // Liveness compensator: inventories can silently stall, so restart
        // on a fixed cadence whether or not data is flowing.
        if last_inventory.elapsed() >= Duration::from_millis(INVENTORY_RETRIGGER_MS) {
            last_inventory = Instant::now();
            if let Err(err) = inventory.start_fast_inventory(num_antennas) {
                warn!(%err, "inventory re-trigger failed");
                thread::sleep(Duration::from_millis(ERROR_BACKOFF_MS));
                continue;
            }
        }

        thread::sleep(Duration::from_millis(POLL_INTERVAL_MS));
    }

    debug!("acquisition loop exited");
}

/// Read everything currently available in one call and enqueue it as a
/// single chunk, preserving byte order.
fn drain_device(port: &SharedPort, tx: &Sender<Vec<u8>>) -> Result<()> {
    let chunk = {
        let mut port = port.lock().unwrap_or_else(PoisonError::into_inner);
        let available = port.bytes_available()?;
        if available == 0 {
            return Ok(());
        }
        let mut buf = vec![0u8; available];
        let n = port.read_bytes(&mut buf)?;
        buf.truncate(n);
        buf
    };

    if !chunk.is_empty() {
        // A closed receiver means shutdown is already under way.
        let _ = tx.send(chunk);
    }
    Ok(())
}

fn parser_loop(
    rx: &Receiver<Vec<u8>>,
    mut scanner: FrameScanner,
    session: &SessionStore,
    running: &AtomicBool,
) {
    while running.load(Ordering::Relaxed) {
        match rx.recv_timeout(Duration::from_millis(POLL_INTERVAL_MS)) {
            Ok(chunk) => {
                // Scanner state persists across chunks; reads rarely align
                // to frame boundaries.
                scanner.feed(&chunk);
                for read in scanner.drain_reads() {
                    session.observe(TagRecord::new(read.epc, read.rssi, read.antenna));
                }
            }
            // Timeout doubles as the idle sleep for an empty queue.
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                // Producer gone but the flag is still set; back off until
                // stop() flips it.
                thread::sleep(Duration::from_millis(ERROR_BACKOFF_MS));
            }
        }
    }

    debug!(
        skipped_bytes = scanner.skipped_bytes(),
        pending_bytes = scanner.pending_bytes(),
        "parser loop exited"
    );
}
