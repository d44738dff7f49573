//! The device pool and per-device record (`bt_dev`). At most seven
//! concurrent devices; the pool is a closed, linearly-scanned slot array
//! rather than a dynamic collection: the host owns the pool, each device
//! owns its channels and decode metadata.
use crate::Address;
use padbridge_core::calibration::CalibrationOffset;
use padbridge_core::decode::hid_generic::HidReportMeta;
use padbridge_core::decode::DecodeState;
use padbridge_shared::flags::{AtomicFlags, DeviceFlag};
use padbridge_transport::l2cap_sig::{Channel, IdentifierCounter, PSM_HID_CONTROL, PSM_HID_INTERRUPT, PSM_SDP};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Maximum concurrent devices.
pub const MAX_DEVICES: usize = 7;

/// Per-vendor family a device is classified as, selected by name-prefix
/// matching on inquiry/connection. Each variant is handled by exactly
/// one HID profile handler and one wireless decoder.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, strum::Display)]
pub enum BtType {
    Wii,
    WiiU,
    Ps3,
    Ps4,
    Ps5,
    SwitchV1,
    SwitchV2,
    Xbox,
    GenericHid,
}

impl BtType {
    /// Fixed prefix table; an unmatched name becomes [`BtType::GenericHid`].
    pub fn from_name(name: &str) -> Self {
        const TABLE: &[(&str, BtType)] = &[
            ("Nintendo RVL-CNT", BtType::Wii),
            ("Wii Remote", BtType::Wii),
            ("Joy-Con", BtType::SwitchV1),
            ("Pro Controller", BtType::SwitchV1),
            ("Nintendo Switch", BtType::SwitchV2),
            ("PLAYSTATION(R)3", BtType::Ps3),
            ("Wireless Controller", BtType::Ps4),
            ("DualSense", BtType::Ps5),
            ("Xbox Wireless Controller", BtType::Xbox),
        ];
        TABLE
            .iter()
            .find(|(prefix, _)| name.starts_with(prefix))
            .map(|(_, ty)| *ty)
            .unwrap_or(BtType::GenericHid)
    }
}

/// Bidirectional byte buffer shared with the wire-driver/HID-transport
/// collaborator.
pub type SharedBuffer = Arc<Mutex<Vec<u8>>>;

pub fn shared_buffer(len: usize) -> SharedBuffer {
    Arc::new(Mutex::new(vec![0; len]))
}

/// One L2CAP channel kind a device owns exactly one of.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ChannelKind {
    Sdp,
    HidControl,
    HidInterrupt,
}

/// Per-device record (`bt_dev`).
pub struct BtDev {
    pub slot: u8,
    pub remote_bdaddr: Address,
    pub output_port: Option<u8>,
    pub bt_type: BtType,
    pub report_id: u8,
    pub report_type: u8,
    pub acl_handle: u16,
    pub channels: HashMap<ChannelKind, Channel>,
    pub flags: Arc<AtomicFlags<DeviceFlag>>,
    pub input: SharedBuffer,
    pub output: SharedBuffer,
    /// `raw_src_mappings[report_type]`: decode state is keyed by report
    /// type since each report-type transition re-initialises it.
    pub decode_states: HashMap<u8, DecodeState>,
    pub calibration: Vec<CalibrationOffset>,
    /// Cached HID report descriptor field table for generic-HID peers,
    /// computed once and reused until disconnection.
    pub hid_report_meta: Option<HidReportMeta>,
}

impl BtDev {
    /// L2CAP CID base for a given channel kind; `scid` low nibble then
    /// encodes the device slot so inbound frames route in O(1).
    const SDP_CID_BASE: u16 = 0x0060;
    const HID_CTRL_CID_BASE: u16 = 0x0070;
    const HID_INTR_CID_BASE: u16 = 0x0080;

    fn new(slot: u8, remote_bdaddr: Address, bt_type: BtType) -> Self {
        let ids = IdentifierCounter::new();
        let mut channels = HashMap::new();
        channels.insert(
            ChannelKind::Sdp,
            Channel::new(PSM_SDP, slot, Self::SDP_CID_BASE, ids.clone()),
        );
        channels.insert(
            ChannelKind::HidControl,
            Channel::new(PSM_HID_CONTROL, slot, Self::HID_CTRL_CID_BASE, ids.clone()),
        );
        channels.insert(
            ChannelKind::HidInterrupt,
            Channel::new(PSM_HID_INTERRUPT, slot, Self::HID_INTR_CID_BASE, ids),
        );
        Self {
            slot,
            remote_bdaddr,
            output_port: None,
            bt_type,
            report_id: 0,
            report_type: 0,
            acl_handle: 0,
            channels,
            flags: Arc::new(AtomicFlags::new()),
            input: shared_buffer(64),
            output: shared_buffer(64),
            decode_states: HashMap::new(),
            calibration: Vec::new(),
            hid_report_meta: None,
        }
    }

    pub fn channel(&self, kind: ChannelKind) -> &Channel {
        self.channels.get(&kind).expect("every device owns all three channels")
    }

    pub fn channel_mut(&mut self, kind: ChannelKind) -> &mut Channel {
        self.channels.get_mut(&kind).expect("every device owns all three channels")
    }

    pub fn decode_state(&mut self, report_type: u8) -> &mut DecodeState {
        self.decode_states.entry(report_type).or_default()
    }

    /// All three owned channels reaching `Open`.
    pub fn is_fully_connected(&self) -> bool {
        self.channels.values().all(Channel::is_open)
    }
}

#[derive(Clone, Copy, Error, Debug, Eq, PartialEq)]
pub enum DevicePoolError {
    #[error("device pool is full (max {max} concurrent devices)")]
    PoolFull { max: usize },
    #[error("no device at slot {0}")]
    NoSuchSlot(u8),
    #[error("a device for {0:?} is already allocated")]
    AlreadyAllocated(Address),
}

/// The closed seven-slot device pool: allocation is a linear scan,
/// failing cleanly when full.
#[derive(Default)]
pub struct DevicePool {
    slots: [Option<BtDev>; MAX_DEVICES],
}

impl DevicePool {
    pub fn new() -> Self {
        Self {
            slots: Default::default(),
        }
    }

    /// Allocates a new device for `bdaddr`. Fails if `bdaddr` is already
    /// present (exactly one `bt_dev` may have a given `remote_bdaddr` at a
    /// time) or the pool is full.
    pub fn allocate(&mut self, bdaddr: Address, bt_type: BtType) -> Result<u8, DevicePoolError> {
        if self.find_slot(bdaddr).is_some() {
            return Err(DevicePoolError::AlreadyAllocated(bdaddr));
        }
        let slot = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(DevicePoolError::PoolFull { max: MAX_DEVICES })?;
        self.slots[slot] = Some(BtDev::new(slot as u8, bdaddr, bt_type));
        Ok(slot as u8)
    }

    /// Zeroes the slot on ACL disconnect.
    pub fn free(&mut self, slot: u8) -> Result<(), DevicePoolError> {
        let idx = slot as usize;
        if idx >= MAX_DEVICES || self.slots[idx].is_none() {
            return Err(DevicePoolError::NoSuchSlot(slot));
        }
        self.slots[idx] = None;
        Ok(())
    }

    pub fn get(&self, slot: u8) -> Option<&BtDev> {
        self.slots.get(slot as usize)?.as_ref()
    }

    pub fn get_mut(&mut self, slot: u8) -> Option<&mut BtDev> {
        self.slots.get_mut(slot as usize)?.as_mut()
    }

    pub fn find_slot(&self, bdaddr: Address) -> Option<u8> {
        self.slots
            .iter()
            .flatten()
            .find(|dev| dev.remote_bdaddr == bdaddr)
            .map(|dev| dev.slot)
    }

    /// Reverse lookup used by the feedback path: resolves `wired_id ->
    /// bt_dev`.
    pub fn find_by_output_port(&mut self, port: u8) -> Option<&mut BtDev> {
        self.slots
            .iter_mut()
            .flatten()
            .find(|dev| dev.output_port == Some(port))
    }

    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(b: u8) -> Address {
        Address::new([b, 0, 0, 0, 0, 0])
    }

    #[test]
    fn name_prefix_table_falls_through_to_generic_hid() {
        assert_eq!(BtType::from_name("Joy-Con (L)"), BtType::SwitchV1);
        assert_eq!(BtType::from_name("DualSense Wireless Controller"), BtType::Ps5);
        assert_eq!(BtType::from_name("Some Random Keyboard"), BtType::GenericHid);
    }

    #[test]
    fn pool_rejects_an_eighth_device() {
        let mut pool = DevicePool::new();
        for i in 0..MAX_DEVICES as u8 {
            pool.allocate(addr(i), BtType::GenericHid).unwrap();
        }
        let err = pool.allocate(addr(99), BtType::GenericHid).unwrap_err();
        assert_eq!(err, DevicePoolError::PoolFull { max: MAX_DEVICES });
    }

    #[test]
    fn same_bdaddr_cannot_allocate_twice() {
        let mut pool = DevicePool::new();
        pool.allocate(addr(1), BtType::Wii).unwrap();
        let err = pool.allocate(addr(1), BtType::Wii).unwrap_err();
        assert_eq!(err, DevicePoolError::AlreadyAllocated(addr(1)));
    }

    #[test]
    fn slot_reuse_after_free_iff_untaken() {
        let mut pool = DevicePool::new();
        let slot = pool.allocate(addr(1), BtType::Wii).unwrap();
        pool.free(slot).unwrap();
        let reused = pool.allocate(addr(2), BtType::Ps4).unwrap();
        assert_eq!(reused, slot);
    }

    #[test]
    fn channel_cids_share_low_nibble_with_slot() {
        let mut pool = DevicePool::new();
        let slot = pool.allocate(addr(3), BtType::Xbox).unwrap();
        let dev = pool.get(slot).unwrap();
        for kind in [ChannelKind::Sdp, ChannelKind::HidControl, ChannelKind::HidInterrupt] {
            assert_eq!(dev.channel(kind).scid & 0xF, slot & 0xF);
        }
    }
}
