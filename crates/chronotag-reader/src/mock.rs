//! Mock reader port for testing and development.
//!
//! Simulates the device side of the serial link: tests script the bytes
//! the "reader" will emit and inspect the command frames the pipeline
//! wrote, without any hardware attached.

use crate::error::Result;
use crate::port::ReaderPort;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Default)]
struct MockState {
    /// Bytes the simulated device has "sent" but the pipeline has not yet
    /// read.
    inbound: VecDeque<u8>,

    /// Every command frame written by the pipeline, in order.
    writes: Vec<Vec<u8>>,

    /// Number of times the input buffer was flushed.
    input_clears: usize,
}

/// Simulated reader device.
///
/// Created together with a [`MockPortHandle`]; the port goes to the
/// pipeline, the handle stays with the test.
///
/// # Examples
///
/// ```
/// use chronotag_reader::{MockReaderPort, ReaderPort};
///
/// let (mut port, handle) = MockReaderPort::new();
/// handle.push_bytes(&[0xA0, 0x04]);
///
/// let mut buf = [0u8; 8];
/// let n = port.read_bytes(&mut buf).unwrap();
/// assert_eq!(&buf[..n], &[0xA0, 0x04]);
/// ```
#[derive(Debug)]
pub struct MockReaderPort {
    state: Arc<Mutex<MockState>>,
}

/// Test-side handle for scripting and inspecting a [`MockReaderPort`].
#[derive(Debug, Clone)]
pub struct MockPortHandle {
    state: Arc<Mutex<MockState>>,
}

impl MockReaderPort {
    /// Create a mock port and its controlling handle.
    #[must_use]
    pub fn new() -> (Self, MockPortHandle) {
        let state = Arc::new(Mutex::new(MockState::default()));
        (
            Self {
                state: Arc::clone(&state),
            },
            MockPortHandle { state },
        )
    }
}

impl ReaderPort for MockReaderPort {
    fn bytes_available(&mut self) -> Result<usize> {
        Ok(lock(&self.state).inbound.len())
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut state = lock(&self.state);
        let mut n = 0;
        while n < buf.len() {
            match state.inbound.pop_front() {
                Some(byte) => {
                    buf[n] = byte;
                    n += 1;
                }
                None => break,
            }
        }
        Ok(n)
    }

    fn write_all_bytes(&mut self, data: &[u8]) -> Result<()> {
        lock(&self.state).writes.push(data.to_vec());
        Ok(())
    }

    fn clear_input(&mut self) -> Result<()> {
        let mut state = lock(&self.state);
        state.inbound.clear();
        state.input_clears += 1;
        Ok(())
    }
}

impl MockPortHandle {
    /// Queue bytes for the pipeline to read, as if the device emitted
    /// them.
    pub fn push_bytes(&self, bytes: &[u8]) {
        lock(&self.state).inbound.extend(bytes.iter().copied());
    }

    /// All command frames written so far, in order.
    #[must_use]
    pub fn writes(&self) -> Vec<Vec<u8>> {
        lock(&self.state).writes.clone()
    }

    /// Number of input-buffer flushes issued by the pipeline.
    #[must_use]
    pub fn input_clears(&self) -> usize {
        lock(&self.state).input_clears
    }

    /// Bytes queued but not yet read.
    #[must_use]
    pub fn pending_inbound(&self) -> usize {
        lock(&self.state).inbound.len()
    }
}

fn lock(state: &Arc<Mutex<MockState>>) -> std::sync::MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}
