//! Collaborator-facing reader session.
//!
//! [`ReaderSession`] is the one object the dashboard layer holds: it owns
//! the serial connection, the session store, and the worker threads, and
//! exposes every operation the collaborator layer consumes. There is no
//! process-wide singleton; create one session per reader and pass it by
//! reference.

use crate::acquisition::{spawn_acquisition_loop, spawn_parser_loop};
use crate::config::{ConnectionConfig, SessionConfig};
use crate::error::{ReaderError, Result};
use crate::inventory::InventoryController;
use crate::port::{ReaderPort, SerialReaderPort, SharedPort};
use crate::session::SessionStore;
use chronotag_core::{
    AntennaConfig, Gate, MergedRecord, SessionStats, TagRecord,
    constants::{JOIN_TIMEOUT_MS, POLL_INTERVAL_MS},
};
use chronotag_protocol::FrameScanner;
use chronotag_storage::{EventLog, Region, RegionStore, merged_records};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, mpsc};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// An open device connection and its command controller.
struct Connection {
    port: SharedPort,
    config: ConnectionConfig,
    inventory: InventoryController,
}

/// One reader's acquisition session.
///
/// # Examples
///
/// ```no_run
/// use chronotag_reader::{ReaderSession, SessionConfig};
///
/// # fn main() -> chronotag_reader::Result<()> {
/// let mut session = ReaderSession::new(SessionConfig::default())?;
/// session.setup_connection("/dev/ttyUSB0", 57_600)?;
/// session.start()?;
/// // ... tags accumulate ...
/// println!("{} tags", session.get_stats().total_reads);
/// session.stop()?;
/// # Ok(())
/// # }
/// ```
pub struct ReaderSession {
    config: SessionConfig,
    session: SessionStore,
    store: RegionStore,
    connection: Option<Connection>,
    running: Arc<AtomicBool>,
    workers: Vec<(&'static str, JoinHandle<()>)>,
    antennas: AntennaConfig,
}

impl ReaderSession {
    /// Create a session with the given persistence settings. Opens (or
    /// initializes) the region store immediately; the serial device is
    /// not touched until [`setup_connection`](Self::setup_connection).
    ///
    /// # Errors
    /// Returns `ReaderError::Storage` if the store directory cannot be
    /// initialized.
    pub fn new(config: SessionConfig) -> Result<Self> {
        let store = RegionStore::open(&config.store_dir)?;
        let session = SessionStore::new(
            EventLog::new(&config.event_log_path),
            store.clone(),
            config.gate,
        );

        Ok(Self {
            config,
            session,
            store,
            connection: None,
            running: Arc::new(AtomicBool::new(false)),
            workers: Vec::new(),
            antennas: AntennaConfig::default(),
        })
    }

    /// Open the serial device and hold the connection for this session.
    ///
    /// # Errors
    /// Returns `ReaderError::Connection` with the underlying cause if the
    /// port cannot be opened (not retried automatically), or
    /// `ReaderError::Busy` while the reader is running.
    pub fn setup_connection(&mut self, port: &str, baud_rate: u32) -> Result<String> {
        let config = ConnectionConfig::new(port, baud_rate);
        let serial = SerialReaderPort::open(&config)?;
        self.attach_port(Box::new(serial), config)
    }

    /// Attach an already-open device handle.
    ///
    /// This is how tests (and any non-serial transport) connect; the
    /// serial path goes through [`setup_connection`](Self::setup_connection).
    ///
    /// # Errors
    /// Returns `ReaderError::Busy` while the reader is running.
    pub fn attach_port(
        &mut self,
        port: Box<dyn ReaderPort>,
        config: ConnectionConfig,
    ) -> Result<String> {
        if self.is_running() {
            return Err(ReaderError::Busy);
        }

        let shared: SharedPort = Arc::new(Mutex::new(port));
        let inventory =
            InventoryController::new(Arc::clone(&shared), self.config.command_set.clone());
        let message = format!("Successfully connected to {}", config.port);
        info!(port = %config.port, baud = config.baud_rate, "connection established");

        self.connection = Some(Connection {
            port: shared,
            config,
            inventory,
        });
        Ok(message)
    }

    /// Start acquiring: query the antenna count, spawn both worker
    /// threads, and fire the initial fast inventory.
    ///
    /// # Errors
    /// Returns `ReaderError::NotConnected` without an open connection, or
    /// `ReaderError::Io` if a worker thread cannot be spawned. A failed
    /// initial inventory is logged only — the 3-second re-trigger covers
    /// it.
    pub fn start(&mut self) -> Result<String> {
        let (port, inventory) = {
            let connection = self.connection.as_ref().ok_or(ReaderError::NotConnected)?;
            (Arc::clone(&connection.port), connection.inventory.clone())
        };

        if self.is_running() {
            return Ok("Reader already running".to_string());
        }

        let num_antennas = inventory.query_antenna_ports();
        self.antennas = AntennaConfig { num_antennas };

        self.running.store(true, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel();

        let acquire = spawn_acquisition_loop(
            port,
            inventory.clone(),
            num_antennas,
            Arc::clone(&self.running),
            tx,
        )?;
        let parse = match spawn_parser_loop(
            rx,
            FrameScanner::new(num_antennas),
            self.session.clone(),
            Arc::clone(&self.running),
        ) {
            Ok(handle) => handle,
            Err(err) => {
                self.running.store(false, Ordering::Relaxed);
                join_with_timeout(acquire, Duration::from_millis(JOIN_TIMEOUT_MS));
                return Err(err.into());
            }
        };
        self.workers = vec![("acquisition", acquire), ("parser", parse)];

        if let Err(err) = inventory.start_fast_inventory(num_antennas) {
            warn!(%err, "initial fast inventory failed");
        }

        info!(num_antennas, "reader started");
        Ok("Reader started".to_string())
    }

    /// Stop acquiring: flip the running flag, best-effort halt the
    /// device's inventory, join both workers with a bounded timeout, and
    /// close the connection.
    ///
    /// A worker that fails to join in time is abandoned, not force-killed;
    /// shutdown never blocks the caller indefinitely.
    ///
    /// # Errors
    /// Currently infallible in practice; the signature leaves room for
    /// close-time failures.
    pub fn stop(&mut self) -> Result<String> {
        self.running.store(false, Ordering::Relaxed);

        if let Some(connection) = &self.connection {
            if let Err(err) = connection.inventory.stop_inventory() {
                warn!(%err, "stop-inventory command failed");
            }
        }

        for (name, handle) in self.workers.drain(..) {
            if !join_with_timeout(handle, Duration::from_millis(JOIN_TIMEOUT_MS)) {
                warn!(thread = name, "worker did not stop in time; abandoning");
            }
        }

        // Dropping the connection closes the serial handle.
        self.connection = None;
        info!("reader stopped");
        Ok("Reader stopped".to_string())
    }

    /// Whether the worker loops are (supposed to be) running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Parameters of the open connection, if any.
    #[must_use]
    pub fn connection_config(&self) -> Option<&ConnectionConfig> {
        self.connection.as_ref().map(|c| &c.config)
    }

    /// Antenna configuration discovered at the last start.
    #[must_use]
    pub fn antenna_config(&self) -> AntennaConfig {
        self.antennas
    }

    /// Snapshot copy of this session's records, in detection order.
    #[must_use]
    pub fn get_data(&self) -> Vec<TagRecord> {
        self.session.snapshot()
    }

    /// Session statistics.
    #[must_use]
    pub fn get_stats(&self) -> SessionStats {
        self.session.stats()
    }

    /// Clear session data; see [`SessionStore::clear`].
    ///
    /// # Errors
    /// Propagates sink failures to the caller.
    pub fn clear_data(&self, region: Option<Region>) -> Result<()> {
        self.session.clear(region)?;
        Ok(())
    }

    /// Re-scan for missed tags with altered settings; `false` without a
    /// connection or on any device error (logged, never raised).
    #[must_use]
    pub fn retry_missed_tags(&self) -> bool {
        match &self.connection {
            Some(connection) => connection.inventory.retry_missed_tags(),
            None => {
                warn!("retry requested without a connection");
                false
            }
        }
    }

    /// Replace the participant roster from an external file.
    ///
    /// # Errors
    /// Returns `ReaderError::Storage` wrapping the import failure; the
    /// roster is untouched in that case.
    pub fn import_participants(&self, path: impl AsRef<Path>) -> Result<usize> {
        Ok(self.store.import_participants(path)?)
    }

    /// Roster joined against start/finish passages, in roster order.
    ///
    /// # Errors
    /// Returns `ReaderError::Storage` if the store cannot be read.
    pub fn get_merged_data(&self) -> Result<Vec<MergedRecord>> {
        Ok(merged_records(&self.store)?)
    }

    /// Gate new detections are recorded against.
    #[must_use]
    pub fn gate(&self) -> Gate {
        self.session.gate()
    }

    /// Switch the recording gate for subsequent detections.
    pub fn set_gate(&self, gate: Gate) {
        self.session.set_gate(gate);
    }
}

impl Drop for ReaderSession {
    fn drop(&mut self) {
        if self.is_running() {
            let _ = self.stop();
        }
    }
}

/// Join a worker, giving up after `timeout`. Returns `false` when the
/// worker was abandoned.
fn join_with_timeout(handle: JoinHandle<()>, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while !handle.is_finished() {
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(POLL_INTERVAL_MS));
    }
    let _ = handle.join();
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn session_in(dir: &std::path::Path) -> ReaderSession {
        ReaderSession::new(SessionConfig {
            event_log_path: dir.join("events.csv"),
            store_dir: dir.join("store"),
            ..SessionConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn start_requires_a_connection() {
        let dir = tempdir().unwrap();
        let mut session = session_in(dir.path());

        assert!(matches!(session.start(), Err(ReaderError::NotConnected)));
        assert!(!session.is_running());
    }

    #[test]
    fn retry_without_connection_is_false() {
        let dir = tempdir().unwrap();
        let session = session_in(dir.path());
        assert!(!session.retry_missed_tags());
    }

    #[test]
    fn attach_while_running_is_rejected() {
        let dir = tempdir().unwrap();
        let mut session = session_in(dir.path());

        let (port, _handle) = crate::mock::MockReaderPort::new();
        session
            .attach_port(Box::new(port), ConnectionConfig::new("mock0", 57_600))
            .unwrap();
        session.start().unwrap();

        let (second, _handle2) = crate::mock::MockReaderPort::new();
        assert!(matches!(
            session.attach_port(Box::new(second), ConnectionConfig::new("mock1", 57_600)),
            Err(ReaderError::Busy)
        ));

        session.stop().unwrap();
    }

    #[test]
    fn stop_without_start_is_harmless() {
        let dir = tempdir().unwrap();
        let mut session = session_in(dir.path());
        assert_eq!(session.stop().unwrap(), "Reader stopped");
    }

    #[test]
    fn connection_config_reflects_attachment() {
        let dir = tempdir().unwrap();
        let mut session = session_in(dir.path());
        assert!(session.connection_config().is_none());

        let (port, _handle) = crate::mock::MockReaderPort::new();
        let message = session
            .attach_port(Box::new(port), ConnectionConfig::new("mock0", 57_600))
            .unwrap();
        assert_eq!(message, "Successfully connected to mock0");
        assert_eq!(session.connection_config().unwrap().baud_rate, 57_600);
    }
}
