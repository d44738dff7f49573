//! The 10 ms service tick (spec.md §5, SPEC_FULL.md §0: "wiring of host +
//! core, the 10ms service tick"). [`Service`] owns the device pool, the
//! live config, and one [`WiredPort`] per wired output; `tick` is the
//! single synchronous pass driven every [`SERVICE_TICK`]: drain a pending
//! report from each connected device, decode it, run the mapping engine,
//! and re-encode the result into the wired ports it affects.
use padbridge_core::config::Config;
use padbridge_core::encode::WiredData;
use padbridge_core::error::{DecodeError, EncodeError, MappingError};
use padbridge_core::mapping::{apply_rules, TurboTable};
use padbridge_core::model::GenericCtrl;
use padbridge_host::device::{BtDev, DevicePool, MAX_DEVICES};
use padbridge_host::feedback::{dispatch_feedback, GenericFb};
use padbridge_host::profile::{hid_profile_for, ReportKind};
use padbridge_host::wire_facade::WiredSystem;
use padbridge_shared::shutdown::Shutdown;
use std::time::Duration;
use thiserror::Error;
use tracing::{instrument, warn};

pub const SERVICE_TICK: Duration = Duration::from_millis(10);

#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum TickError {
    #[error("decode failed on slot {slot}: {source}")]
    Decode { slot: u8, source: DecodeError },
    #[error("mapping failed on slot {slot}: {source}")]
    Mapping { slot: u8, source: MappingError },
    #[error("encode failed on port {port}: {source}")]
    Encode { port: usize, source: EncodeError },
}

/// One wired output port's encode-side state (spec.md §4.8): the console
/// target this port drives, plus the running frame and turbo state the
/// encoder writes into.
pub struct WiredPort {
    pub system: WiredSystem,
    pub wired: WiredData,
    pub turbo: TurboTable,
}

impl WiredPort {
    pub fn new(system: WiredSystem) -> Self {
        let wired = WiredData::new(system.frame_len());
        Self {
            system,
            wired,
            turbo: TurboTable::default(),
        }
    }
}

/// Owns the device pool, the live config, and the per-port wired state.
/// The server binary constructs one `Service` and drives `tick` on a
/// fixed interval (spec.md §5's "10 ms polling tick").
pub struct Service {
    pub pool: DevicePool,
    pub config: Config,
    pub ports: Vec<Option<WiredPort>>,
}

impl Service {
    pub fn new(config: Config, port_count: usize) -> Self {
        Self {
            pool: DevicePool::new(),
            config,
            ports: (0..port_count).map(|_| None).collect(),
        }
    }

    pub fn bind_port(&mut self, port: usize, system: WiredSystem) {
        self.ports[port] = Some(WiredPort::new(system));
    }

    /// Drains and decodes every connected device's pending report, maps it
    /// into whichever wired ports it affects, and advances those ports'
    /// encoders (spec.md §5, §4.7 final paragraph: mapping returns the
    /// affected output-port bit-set). Errors from one device or port are
    /// logged and skipped rather than aborting the tick.
    #[instrument(skip(self))]
    pub fn tick(&mut self) {
        let state = self.config.get();
        for slot in 0..MAX_DEVICES as u8 {
            let Some(dev) = self.pool.get_mut(slot) else {
                continue;
            };
            if !dev.is_fully_connected() {
                continue;
            }
            let Some(report) = take_pending_report(dev) else {
                continue;
            };
            let profile = hid_profile_for(dev.bt_type);
            if profile.classify(&report) != ReportKind::Input {
                continue;
            }
            let mut ctrl = GenericCtrl::new();
            if let Err(source) = profile.hdlr(dev, &report, &mut ctrl) {
                warn!(error = %TickError::Decode { slot, source }, "dropping report");
                continue;
            }

            let source_slot = slot as usize % state.in_cfg.len();
            let rules = &state.in_cfg[source_slot].rules;
            let mut outputs = vec![GenericCtrl::new(); self.ports.len()];
            let affected = match apply_rules(&ctrl, rules, &mut outputs) {
                Ok(bits) => bits,
                Err(source) => {
                    warn!(error = %TickError::Mapping { slot, source }, "dropping report");
                    continue;
                }
            };

            for (port_idx, port) in self.ports.iter_mut().enumerate() {
                if affected & (1 << port_idx) == 0 {
                    continue;
                }
                let Some(port) = port else { continue };
                // `WiredSystem::encode` ticks `port.wired`'s frame counter
                // itself on success, so the turbo cadence advances exactly
                // once per transmission (spec.md §5) rather than twice.
                if let Err(source) = port.system.encode(&outputs[port_idx], &port.turbo, &mut port.wired) {
                    warn!(error = %TickError::Encode { port: port_idx, source }, "skipping port");
                }
            }
        }
    }

    /// Routes a feedback event from a wired port back to the HID profile
    /// of whichever device owns that port (spec.md §4.9).
    pub fn feedback(&mut self, fb: GenericFb) -> Option<Vec<u8>> {
        dispatch_feedback(&mut self.pool, fb)
    }

    /// Runs the tick loop until `shutdown` fires.
    pub async fn run(mut self, shutdown: Shutdown) {
        let mut interval = tokio::time::interval(SERVICE_TICK);
        loop {
            tokio::select! {
                _ = interval.tick() => self.tick(),
                _ = shutdown.recv_shutdown() => break,
            }
        }
    }
}

/// Takes the device's pending inbound report, if any, zeroing the buffer
/// behind it. A still-zero buffer means no report has arrived since the
/// last tick.
fn take_pending_report(dev: &mut BtDev) -> Option<Vec<u8>> {
    let mut buf = dev.input.lock().expect("input buffer mutex is not poisoned");
    if buf.iter().all(|byte| *byte == 0) {
        return None;
    }
    Some(std::mem::replace(&mut *buf, vec![0; buf.len()]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use padbridge_core::encode::n64::N64State;
    use padbridge_host::device::BtType;
    use padbridge_shared::Address;

    #[test]
    fn tick_skips_devices_that_are_not_fully_connected() {
        let mut service = Service::new(Config::new(), 1);
        service.bind_port(0, WiredSystem::N64 { state: N64State::new() });
        service.pool.allocate(Address::new([1, 0, 0, 0, 0, 0]), BtType::GenericHid).unwrap();
        service.tick();
        assert_eq!(service.ports[0].as_ref().unwrap().wired.frame_cnt, 0);
    }

    #[test]
    fn take_pending_report_is_none_for_all_zero_buffer() {
        let mut pool = DevicePool::new();
        let slot = pool.allocate(Address::new([2, 0, 0, 0, 0, 0]), BtType::Xbox).unwrap();
        let dev = pool.get_mut(slot).unwrap();
        assert!(take_pending_report(dev).is_none());
    }

    #[test]
    fn take_pending_report_drains_and_zeroes_the_buffer() {
        let mut pool = DevicePool::new();
        let slot = pool.allocate(Address::new([3, 0, 0, 0, 0, 0]), BtType::Xbox).unwrap();
        let dev = pool.get_mut(slot).unwrap();
        dev.input.lock().unwrap()[0] = 0xAB;
        let report = take_pending_report(dev).unwrap();
        assert_eq!(report[0], 0xAB);
        assert!(dev.input.lock().unwrap().iter().all(|b| *b == 0));
    }
}
