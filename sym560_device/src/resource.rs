//! Device resource manager: ownership of the register windows, the
//! interrupt line, and the session open/close lifecycle.

use crate::error::{DeviceError, DeviceResult};
use crate::irq::{CaptureGate, IrqLineFactory, IrqService, UioIrqLine};
use crate::platform::{self, PciIdent};
use crate::session::Session;
use crate::window::RegisterWindow;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use sym560_common::config::CardConfig;
use sym560_common::consts::EVENT_CAPTURE_LEN;
use tracing::{debug, info, warn};

/// BAR holding the local-configuration (bridge chip) registers.
const BAR_LCR: usize = 0;
/// BAR holding the main register bank.
const BAR_MAIN: usize = 2;

struct OpenState {
    count: u32,
    service: Option<IrqService>,
}

/// The one resource handle for the physical card.
///
/// Created by [`attach`](Self::attach) when the card is discovered and
/// shared by every [`Session`] through `Arc`; dropping the last reference
/// tears everything down in reverse order of construction. The interrupt
/// handler is registered exactly while at least one session is open.
///
/// The register windows carry no software lock: concurrent register-level
/// access from several sessions races at the hardware level, the same as
/// concurrent raw memory access would. Only open/close accounting is
/// coordinated.
pub struct DeviceResource {
    ident: PciIdent,
    main: Arc<RegisterWindow>,
    lcr: RegisterWindow,
    irq_line: u32,
    gate: Arc<CaptureGate>,
    line_factory: IrqLineFactory,
    opens: Mutex<OpenState>,
    capture_timeout: Option<Duration>,
}

impl DeviceResource {
    /// Attach to the configured card.
    ///
    /// Enables the PCI function, verifies the four-field identity, maps
    /// both register windows and records the interrupt line. The interrupt
    /// handler itself is not registered until the first session opens.
    ///
    /// # Errors
    ///
    /// `UnsupportedDevice` if the function at the configured address is
    /// not the supported card; `Io` for any sysfs or mapping failure. A
    /// partial attach unwinds fully: whatever was mapped is released.
    pub fn attach(config: &CardConfig) -> DeviceResult<Arc<Self>> {
        let dir = config.sysfs_dir();
        info!(device = %dir.display(), "attaching sym560 card");

        platform::enable_device(&dir)?;
        let ident = PciIdent::read_from(&dir)?;
        if !ident.is_sym560() {
            warn!(?ident, "PCI function is not a sym560 card");
            return Err(DeviceError::UnsupportedDevice {
                vendor: ident.vendor,
                device: ident.device,
                subvendor: ident.subvendor,
                subsystem: ident.subsystem,
            });
        }

        let main = platform::map_bar(&dir, BAR_MAIN)?;
        let lcr = platform::map_bar(&dir, BAR_LCR)?;
        let irq_line = platform::read_irq_line(&dir)?;

        let uio_path: PathBuf = config.uio_device.clone();
        let line_factory: IrqLineFactory = Box::new(move |line| {
            let uio = UioIrqLine::open(&uio_path, line)?;
            Ok(Arc::new(uio) as Arc<dyn crate::irq::IrqLine>)
        });

        Ok(Self::from_parts(
            ident,
            main,
            lcr,
            irq_line,
            line_factory,
            config.capture_timeout(),
        ))
    }

    /// Assemble a resource from pre-mapped windows and an arbitrary
    /// interrupt-line factory.
    ///
    /// This is the seam the simulation backend and the test suites use;
    /// [`attach`](Self::attach) is a thin wrapper over it.
    pub fn from_parts(
        ident: PciIdent,
        main: RegisterWindow,
        lcr: RegisterWindow,
        irq_line: u32,
        line_factory: IrqLineFactory,
        capture_timeout: Option<Duration>,
    ) -> Arc<Self> {
        Arc::new(Self {
            ident,
            main: Arc::new(main),
            lcr,
            irq_line,
            gate: Arc::new(CaptureGate::new()),
            line_factory,
            opens: Mutex::new(OpenState {
                count: 0,
                service: None,
            }),
            capture_timeout,
        })
    }

    /// Open a session.
    ///
    /// The open that takes the count from zero to one registers the
    /// interrupt handler in shared mode and enables the line; if that
    /// fails, the error is surfaced here and the count stays at zero, so a
    /// later open retries the registration. The transition test runs under
    /// the open-state mutex: concurrent opens produce exactly one
    /// registration.
    pub fn open(self: &Arc<Self>) -> DeviceResult<Session> {
        let mut opens = self.opens.lock();
        if opens.count == 0 {
            let line = (self.line_factory)(self.irq_line)?;
            opens.service = Some(IrqService::start(
                line,
                self.main.clone(),
                self.gate.clone(),
                self.irq_line,
            )?);
        }
        opens.count += 1;
        debug!(open_count = opens.count, "device opened");
        Ok(Session::new(self.clone(), self.capture_timeout))
    }

    /// Close accounting, called when a session drops. The close that takes
    /// the count from one to zero deregisters the interrupt handler.
    pub(crate) fn release(&self) {
        let mut opens = self.opens.lock();
        opens.count = opens.count.saturating_sub(1);
        debug!(open_count = opens.count, "device closed");
        if opens.count == 0 {
            // Dropping the service shuts the line down and joins the
            // service thread.
            opens.service = None;
            debug!("last session closed, interrupt line released");
        }
    }

    /// Number of currently open sessions.
    pub fn open_count(&self) -> u32 {
        self.opens.lock().count
    }

    /// The card's PCI identity.
    pub fn ident(&self) -> PciIdent {
        self.ident
    }

    /// The assigned interrupt line number.
    pub fn irq_line(&self) -> u32 {
        self.irq_line
    }

    /// The main register bank (BAR 2).
    pub fn main_window(&self) -> &RegisterWindow {
        &self.main
    }

    /// The local-configuration (bridge chip) register bank (BAR 0).
    pub fn lcr_window(&self) -> &RegisterWindow {
        &self.lcr
    }

    /// True while a latched event is waiting to be consumed.
    pub fn event_ready(&self) -> bool {
        self.gate.is_ready()
    }

    /// Block until the bridge latches an event, then consume and return it.
    pub(crate) fn wait_event(
        &self,
        timeout: Option<Duration>,
    ) -> DeviceResult<[u8; EVENT_CAPTURE_LEN]> {
        self.gate.wait(timeout)
    }

    /// Wake every blocked capture wait with `Interrupted`, the userspace
    /// analog of signal delivery to blocked callers. The ready flag is
    /// left untouched.
    pub fn interrupt_waiters(&self) {
        self.gate.cancel_waiters();
    }
}

impl Drop for DeviceResource {
    fn drop(&mut self) {
        // Sessions hold the Arc, so by now the count is zero and the
        // service is gone; the windows unmap as they drop, reversing
        // attach.
        info!(device = ?self.ident, "detaching sym560 card");
    }
}
