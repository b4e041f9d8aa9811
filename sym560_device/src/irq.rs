//! Interrupt bridge: the path from a hardware event pulse to a blocked
//! capture caller.
//!
//! The bridge cycles between two states for the device's whole life:
//! *idle* (no event pending) and *ready* (an event latched, not yet
//! consumed). A pulse on the interrupt line runs [`InterruptBridge::service`]
//! on the service thread, which latches the 12-byte event capture,
//! acknowledges the hardware and raises the [`CaptureGate`]; a consumer
//! blocked in the event-capture command takes the gate back to idle.
//!
//! The service path never allocates and only ever takes the gate mutex,
//! which every holder releases in bounded time — the handler can race
//! against process-context callers without risking an unbounded stall.

use crate::error::{DeviceError, DeviceResult};
use crate::window::RegisterWindow;
use parking_lot::{Condvar, Mutex};
use std::fs::File;
use std::os::fd::{AsFd, OwnedFd};
use std::path::Path;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use sym560_common::consts::{
    EVENT_CAPTURE_LEN, HARD_CTRL_CLEAR_MASK, REG_EVENT_CAP, REG_HARD_CTRL, REG_HARD_STATUS,
};
use tracing::{debug, error, trace};

/// One interrupt line, registered in shared mode.
///
/// This is the pluggable seam between the bridge and the interrupt
/// delivery mechanism: production uses [`UioIrqLine`], demos and tests use
/// [`SimulatedIrqLine`].
pub trait IrqLine: Send + Sync {
    /// Block until the line pulses (`Ok(Some(count))`, where `count` is the
    /// delivery counter) or the line is shut down (`Ok(None)`).
    fn wait(&self) -> DeviceResult<Option<u32>>;

    /// Re-enable the line after servicing a pulse.
    fn rearm(&self) -> DeviceResult<()>;

    /// Wake any blocked [`wait`](Self::wait) with `Ok(None)`. Idempotent.
    fn shutdown(&self);
}

/// Factory producing the interrupt line for a given line number, invoked on
/// the open that transitions the device from zero to one session.
pub type IrqLineFactory = Box<dyn Fn(u32) -> DeviceResult<Arc<dyn IrqLine>> + Send + Sync>;

/// UIO-backed interrupt line.
///
/// Reading the UIO character device blocks until the next interrupt and
/// yields the delivery counter; writing `1` re-enables the (shared, level
/// triggered) line. A pipe provides the shutdown wakeup so the service
/// thread can be detached without a pending interrupt.
pub struct UioIrqLine {
    file: File,
    shutdown_r: OwnedFd,
    shutdown_w: OwnedFd,
    line: u32,
}

impl UioIrqLine {
    /// Open the UIO device for `line`.
    pub fn open(path: &Path, line: u32) -> DeviceResult<Self> {
        let file = File::options()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| DeviceError::IrqRegistration {
                line,
                reason: format!("open {}: {e}", path.display()),
            })?;
        let (shutdown_r, shutdown_w) =
            nix::unistd::pipe().map_err(|e| DeviceError::IrqRegistration {
                line,
                reason: format!("shutdown pipe: {e}"),
            })?;
        Ok(Self {
            file,
            shutdown_r,
            shutdown_w,
            line,
        })
    }
}

impl IrqLine for UioIrqLine {
    fn wait(&self) -> DeviceResult<Option<u32>> {
        use nix::poll::{PollFd, PollFlags, PollTimeout, poll};

        let mut fds = [
            PollFd::new(self.file.as_fd(), PollFlags::POLLIN),
            PollFd::new(self.shutdown_r.as_fd(), PollFlags::POLLIN),
        ];
        poll(&mut fds, PollTimeout::NONE)?;

        if fds[1]
            .revents()
            .is_some_and(|r| r.intersects(PollFlags::POLLIN))
        {
            return Ok(None);
        }

        let mut count = [0u8; 4];
        nix::unistd::read(&self.file, &mut count)?;
        Ok(Some(u32::from_ne_bytes(count)))
    }

    fn rearm(&self) -> DeviceResult<()> {
        nix::unistd::write(&self.file, &1u32.to_ne_bytes())?;
        Ok(())
    }

    fn shutdown(&self) {
        trace!(line = self.line, "shutting down UIO line");
        let _ = nix::unistd::write(&self.shutdown_w, &[1u8]);
    }
}

struct SimState {
    pending: u32,
    total: u32,
    stopped: bool,
}

/// In-process interrupt line for the simulation backend.
///
/// [`pulse`](Self::pulse) stands in for the hardware edge; clones share the
/// line, so a test or demo keeps one clone to pulse while the device owns
/// another.
#[derive(Clone)]
pub struct SimulatedIrqLine {
    state: Arc<(Mutex<SimState>, Condvar)>,
}

impl SimulatedIrqLine {
    /// Create an idle simulated line.
    pub fn new() -> Self {
        Self {
            state: Arc::new((
                Mutex::new(SimState {
                    pending: 0,
                    total: 0,
                    stopped: false,
                }),
                Condvar::new(),
            )),
        }
    }

    /// Deliver one interrupt pulse.
    pub fn pulse(&self) {
        let (lock, cond) = &*self.state;
        let mut st = lock.lock();
        st.pending += 1;
        st.total += 1;
        drop(st);
        cond.notify_all();
    }
}

impl Default for SimulatedIrqLine {
    fn default() -> Self {
        Self::new()
    }
}

impl IrqLine for SimulatedIrqLine {
    fn wait(&self) -> DeviceResult<Option<u32>> {
        let (lock, cond) = &*self.state;
        let mut st = lock.lock();
        loop {
            if st.stopped {
                return Ok(None);
            }
            if st.pending > 0 {
                st.pending -= 1;
                return Ok(Some(st.total));
            }
            cond.wait(&mut st);
        }
    }

    fn rearm(&self) -> DeviceResult<()> {
        Ok(())
    }

    fn shutdown(&self) {
        let (lock, cond) = &*self.state;
        lock.lock().stopped = true;
        cond.notify_all();
    }
}

struct GateState {
    ready: bool,
    cancel_epoch: u64,
    event: [u8; EVENT_CAPTURE_LEN],
}

/// Single-slot handshake between the interrupt service and blocked capture
/// callers.
///
/// One mutex-guarded flag plus a condvar broadcast: the service raises the
/// gate without ever blocking on process-context work, and of several
/// concurrent waiters exactly one consumes a given event — the rest keep
/// waiting for the next pulse. A second pulse before consumption overwrites
/// the slot; the card offers no queue and neither does the gate.
pub struct CaptureGate {
    state: Mutex<GateState>,
    cond: Condvar,
}

impl CaptureGate {
    /// New gate in the idle state.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(GateState {
                ready: false,
                cancel_epoch: 0,
                event: [0; EVENT_CAPTURE_LEN],
            }),
            cond: Condvar::new(),
        }
    }

    /// Latch `event` and wake all waiters. Never blocks beyond the gate
    /// mutex handshake.
    pub fn raise(&self, event: [u8; EVENT_CAPTURE_LEN]) {
        let mut st = self.state.lock();
        st.event = event;
        st.ready = true;
        drop(st);
        self.cond.notify_all();
    }

    /// Block until an event is ready, consume it and return the latched
    /// bytes.
    ///
    /// A wait that begins after [`raise`](Self::raise) completed still
    /// observes the ready state. `timeout: None` waits indefinitely.
    ///
    /// # Errors
    ///
    /// - `Interrupted` if [`cancel_waiters`](Self::cancel_waiters) ran while
    ///   waiting; the ready flag is left untouched for the next waiter.
    /// - `TimedOut` if the bound elapsed without an event.
    pub fn wait(&self, timeout: Option<Duration>) -> DeviceResult<[u8; EVENT_CAPTURE_LEN]> {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut st = self.state.lock();
        let epoch = st.cancel_epoch;
        loop {
            if st.ready {
                st.ready = false;
                return Ok(st.event);
            }
            if st.cancel_epoch != epoch {
                return Err(DeviceError::Interrupted);
            }
            match deadline {
                Some(d) => {
                    if self.cond.wait_until(&mut st, d).timed_out() && !st.ready {
                        return Err(DeviceError::TimedOut);
                    }
                }
                None => self.cond.wait(&mut st),
            }
        }
    }

    /// Wake every blocked waiter with `Interrupted`, leaving the ready flag
    /// untouched.
    pub fn cancel_waiters(&self) {
        let mut st = self.state.lock();
        st.cancel_epoch += 1;
        drop(st);
        self.cond.notify_all();
    }

    /// True while an event is latched and unconsumed.
    pub fn is_ready(&self) -> bool {
        self.state.lock().ready
    }
}

impl Default for CaptureGate {
    fn default() -> Self {
        Self::new()
    }
}

/// The interrupt service routine body.
pub struct InterruptBridge {
    gate: Arc<CaptureGate>,
}

impl InterruptBridge {
    /// Bridge feeding `gate`.
    pub fn new(gate: Arc<CaptureGate>) -> Self {
        Self { gate }
    }

    /// Service one pulse: latch the event capture registers, acknowledge
    /// the hardware and raise the gate.
    pub fn service(&self, main: &RegisterWindow) -> DeviceResult<()> {
        let status = main.read_u8(REG_HARD_STATUS)?;
        trace!(
            status = format_args!("{status:#04x}"),
            "event interrupt received"
        );

        let mut event = [0u8; EVENT_CAPTURE_LEN];
        for word in 0..EVENT_CAPTURE_LEN / 4 {
            let value = main.read_u32(REG_EVENT_CAP + 4 * word as u64)?;
            event[4 * word..4 * (word + 1)].copy_from_slice(&value.to_le_bytes());
        }

        // Writing a 1 to the clear positions acknowledges the captured and
        // error bits while leaving the enable configuration alone.
        let ctrl = main.read_u8(REG_HARD_CTRL)?;
        main.write_u8(REG_HARD_CTRL, ctrl | HARD_CTRL_CLEAR_MASK)?;

        self.gate.raise(event);
        Ok(())
    }
}

/// Owns the interrupt service thread for the span between the first open
/// and the last close.
pub struct IrqService {
    line: Arc<dyn IrqLine>,
    handle: Option<JoinHandle<()>>,
}

impl IrqService {
    /// Enable the line and start servicing pulses.
    pub fn start(
        line: Arc<dyn IrqLine>,
        main: Arc<RegisterWindow>,
        gate: Arc<CaptureGate>,
        line_no: u32,
    ) -> DeviceResult<Self> {
        let bridge = InterruptBridge::new(gate);
        let worker = line.clone();
        let handle = std::thread::Builder::new()
            .name("sym560-irq".to_string())
            .spawn(move || {
                debug!(line = line_no, "interrupt service attached");
                if let Err(e) = worker.rearm() {
                    error!(line = line_no, error = %e, "could not enable interrupt line");
                    return;
                }
                loop {
                    match worker.wait() {
                        Ok(Some(count)) => {
                            trace!(count, "interrupt pulse");
                            if let Err(e) = bridge.service(&main) {
                                error!(error = %e, "interrupt service failed");
                            }
                            if let Err(e) = worker.rearm() {
                                error!(line = line_no, error = %e, "could not re-enable line");
                                break;
                            }
                        }
                        Ok(None) => break,
                        Err(e) => {
                            error!(line = line_no, error = %e, "interrupt wait failed");
                            break;
                        }
                    }
                }
                debug!(line = line_no, "interrupt service detached");
            })
            .map_err(|e| DeviceError::IrqRegistration {
                line: line_no,
                reason: format!("service thread: {e}"),
            })?;

        Ok(Self {
            line,
            handle: Some(handle),
        })
    }
}

impl Drop for IrqService {
    fn drop(&mut self) {
        self.line.shutdown();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_gate_raise_then_wait() {
        let gate = CaptureGate::new();
        let event = [7u8; EVENT_CAPTURE_LEN];
        gate.raise(event);
        assert!(gate.is_ready());

        // A wait starting after the raise still observes the event.
        let got = gate.wait(Some(Duration::from_millis(10))).unwrap();
        assert_eq!(got, event);
        assert!(!gate.is_ready());
    }

    #[test]
    fn test_gate_timeout() {
        let gate = CaptureGate::new();
        let err = gate.wait(Some(Duration::from_millis(20))).unwrap_err();
        assert!(matches!(err, DeviceError::TimedOut));
    }

    #[test]
    fn test_gate_overwrite_keeps_latest() {
        let gate = CaptureGate::new();
        gate.raise([1; EVENT_CAPTURE_LEN]);
        gate.raise([2; EVENT_CAPTURE_LEN]);
        assert_eq!(gate.wait(None).unwrap(), [2; EVENT_CAPTURE_LEN]);
    }

    #[test]
    fn test_gate_cancel_leaves_flag() {
        let gate = Arc::new(CaptureGate::new());
        let waiter = {
            let gate = gate.clone();
            std::thread::spawn(move || gate.wait(None))
        };
        // Give the waiter time to block before cancelling.
        std::thread::sleep(Duration::from_millis(20));
        gate.raise([9; EVENT_CAPTURE_LEN]);
        waiter.join().unwrap().unwrap();

        gate.raise([3; EVENT_CAPTURE_LEN]);
        gate.cancel_waiters();
        // The cancel woke nobody into consuming: the event is still there.
        assert!(gate.is_ready());
        assert_eq!(gate.wait(None).unwrap(), [3; EVENT_CAPTURE_LEN]);
    }

    #[test]
    fn test_gate_cancel_interrupts_blocked_waiter() {
        let gate = Arc::new(CaptureGate::new());
        let waiter = {
            let gate = gate.clone();
            std::thread::spawn(move || gate.wait(None))
        };
        std::thread::sleep(Duration::from_millis(20));
        gate.cancel_waiters();
        assert!(matches!(
            waiter.join().unwrap(),
            Err(DeviceError::Interrupted)
        ));
    }

    #[test]
    fn test_simulated_line_pulse_and_shutdown() {
        let line = SimulatedIrqLine::new();
        line.pulse();
        assert_eq!(line.wait().unwrap(), Some(1));

        let waiter = {
            let line = line.clone();
            std::thread::spawn(move || line.wait())
        };
        std::thread::sleep(Duration::from_millis(20));
        line.shutdown();
        assert_eq!(waiter.join().unwrap().unwrap(), None);
    }
}
