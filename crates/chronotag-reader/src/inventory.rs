//! Inventory command sequencing.
//!
//! The reader's scan behavior is driven by short command sequences with
//! settle pauses between frames: stop whatever is running, reconfigure,
//! start again. The controller holds the port lock across a whole
//! sequence so the acquisition loop cannot interleave a read between the
//! frames of one exchange.

use crate::error::Result;
use crate::port::SharedPort;
use chronotag_core::constants::{COMMAND_SETTLE_MS, DEFAULT_NUM_ANTENNAS, RETRY_SETTLE_MS};
use chronotag_protocol::CommandSet;
use std::sync::{MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Sequences device commands over the shared port.
#[derive(Clone)]
pub struct InventoryController {
    port: SharedPort,
    commands: CommandSet,
}

impl InventoryController {
    /// Create a controller over the shared port with the given command
    /// templates.
    #[must_use]
    pub fn new(port: SharedPort, commands: CommandSet) -> Self {
        Self { port, commands }
    }

    /// Ask the device how many antenna ports it exposes.
    ///
    /// Soft-failing by design: a short or missing response, or any I/O
    /// error, is logged and answered with the default of
    /// [`DEFAULT_NUM_ANTENNAS`] — start-up must not be blocked by a
    /// firmware that does not implement the query.
    #[must_use]
    pub fn query_antenna_ports(&self) -> u8 {
        match self.try_query_antenna_ports() {
            Ok(Some(count)) => {
                info!(count, "antenna count reported by device");
                count
            }
            Ok(None) => {
                warn!(
                    fallback = DEFAULT_NUM_ANTENNAS,
                    "short antenna-count response; using default"
                );
                DEFAULT_NUM_ANTENNAS
            }
            Err(err) => {
                warn!(
                    %err,
                    fallback = DEFAULT_NUM_ANTENNAS,
                    "antenna-count query failed; using default"
                );
                DEFAULT_NUM_ANTENNAS
            }
        }
    }

    fn try_query_antenna_ports(&self) -> Result<Option<u8>> {
        let mut port = self.lock_port();
        port.write_all_bytes(self.commands.antenna_count_query())?;
        thread::sleep(Duration::from_millis(COMMAND_SETTLE_MS));

        let mut response = [0u8; 16];
        let n = port.read_bytes(&mut response)?;
        Ok(self.commands.parse_antenna_count(&response[..n]))
    }

    /// Stop any ongoing scan, enable ports `1..=num_antennas`, and start
    /// the continuous fast inventory.
    ///
    /// # Errors
    /// Returns the first I/O failure; callers on the acquisition path log
    /// it and keep looping.
    pub fn start_fast_inventory(&self, num_antennas: u8) -> Result<()> {
        let mut port = self.lock_port();

        port.write_all_bytes(self.commands.stop_inventory())?;
        thread::sleep(Duration::from_millis(COMMAND_SETTLE_MS));

        port.write_all_bytes(&self.commands.antenna_config(num_antennas))?;
        thread::sleep(Duration::from_millis(COMMAND_SETTLE_MS));

        port.write_all_bytes(self.commands.fast_inventory())?;
        debug!(num_antennas, "fast inventory started");
        Ok(())
    }

    /// Re-scan for tags the fast inventory may have missed: stop, flush
    /// stale input, raise power, and run the alternate-sensitivity
    /// inventory.
    ///
    /// Never propagates an error; any I/O failure is logged and reported
    /// as `false`.
    #[must_use]
    pub fn retry_missed_tags(&self) -> bool {
        match self.try_retry_missed_tags() {
            Ok(()) => {
                info!("retrying with alternate settings for missed tags");
                true
            }
            Err(err) => {
                warn!(%err, "missed-tag retry failed");
                false
            }
        }
    }

    fn try_retry_missed_tags(&self) -> Result<()> {
        let mut port = self.lock_port();

        port.write_all_bytes(self.commands.stop_inventory())?;
        thread::sleep(Duration::from_millis(RETRY_SETTLE_MS));

        port.clear_input()?;

        port.write_all_bytes(&self.commands.power_set())?;
        thread::sleep(Duration::from_millis(RETRY_SETTLE_MS));

        port.write_all_bytes(self.commands.alt_inventory())?;
        Ok(())
    }

    /// Halt any ongoing scan. Used by shutdown.
    ///
    /// # Errors
    /// Returns the write failure; shutdown treats it as best effort.
    pub fn stop_inventory(&self) -> Result<()> {
        self.lock_port()
            .write_all_bytes(self.commands.stop_inventory())
    }

    fn lock_port(&self) -> MutexGuard<'_, Box<dyn crate::port::ReaderPort>> {
        self.port.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockReaderPort;
    use chronotag_protocol::commands::{ALT_INVENTORY, FAST_INVENTORY, STOP_INVENTORY};
    use std::sync::{Arc, Mutex};

    fn controller() -> (InventoryController, crate::mock::MockPortHandle) {
        let (port, handle) = MockReaderPort::new();
        let shared: SharedPort = Arc::new(Mutex::new(Box::new(port)));
        (
            InventoryController::new(shared, CommandSet::default()),
            handle,
        )
    }

    #[test]
    fn fast_inventory_sequences_stop_config_start() {
        let (controller, handle) = controller();
        controller.start_fast_inventory(4).unwrap();

        let writes = handle.writes();
        assert_eq!(writes.len(), 3);
        assert_eq!(writes[0], STOP_INVENTORY.to_vec());
        assert_eq!(writes[1], CommandSet::default().antenna_config(4));
        assert_eq!(writes[2], FAST_INVENTORY.to_vec());
    }

    #[test]
    fn retry_flushes_input_and_raises_power() {
        let (controller, handle) = controller();
        handle.push_bytes(&[0xDE, 0xAD]); // stale bytes to be flushed

        assert!(controller.retry_missed_tags());

        let writes = handle.writes();
        assert_eq!(writes.len(), 3);
        assert_eq!(writes[0], STOP_INVENTORY.to_vec());
        assert_eq!(writes[1], CommandSet::default().power_set().to_vec());
        assert_eq!(writes[2], ALT_INVENTORY.to_vec());
        assert_eq!(handle.input_clears(), 1);
        assert_eq!(handle.pending_inbound(), 0);
    }

    #[test]
    fn antenna_query_reads_reported_count() {
        let (controller, handle) = controller();
        handle.push_bytes(&[0xA0, 0x04, 0x25, 0x08, 0xCD]);

        assert_eq!(controller.query_antenna_ports(), 8);
        assert_eq!(handle.writes().len(), 1); // just the query frame
    }

    #[test]
    fn antenna_query_falls_back_on_silence() {
        let (controller, _handle) = controller();
        assert_eq!(controller.query_antenna_ports(), DEFAULT_NUM_ANTENNAS);
    }

    #[test]
    fn antenna_query_falls_back_on_short_response() {
        let (controller, handle) = controller();
        handle.push_bytes(&[0xA0, 0x04]);
        assert_eq!(controller.query_antenna_ports(), DEFAULT_NUM_ANTENNAS);
    }
}
