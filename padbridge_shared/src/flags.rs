//! Lock-free, edge-triggered bit flags for controller- and device-scope
//! state. Each bit is a `bool`-sized slot in a 64-bit atomic
//! word; callers that need to react to a flag flipping `false -> true`
//! `.await` on [`AtomicFlags::wait_until_set`], which is woken from
//! [`AtomicFlags::set`]/[`AtomicFlags::test_and_set`] via a [`tokio::sync::Notify`].
//!
//! Generalizes a `watch`-channel-per-field pattern into a single word so
//! that many independently-meaningful bits (controller bring-up stages,
//! per-device bring-up stages) can be tested/set without a lock.
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Notify;

/// A type whose variants each identify a single bit position (0..64) in an
/// [`AtomicFlags`] word.
pub trait FlagKey: Copy {
    fn bit(self) -> u32;
}

#[derive(Debug, Default)]
pub struct AtomicFlags<F> {
    bits: AtomicU64,
    notify: Notify,
    _marker: std::marker::PhantomData<fn() -> F>,
}

impl<F: FlagKey> AtomicFlags<F> {
    pub fn new() -> Self {
        Self {
            bits: AtomicU64::new(0),
            notify: Notify::new(),
            _marker: std::marker::PhantomData,
        }
    }

    pub fn test(&self, flag: F) -> bool {
        self.bits.load(Ordering::Acquire) & (1 << flag.bit()) != 0
    }

    pub fn set(&self, flag: F) {
        self.bits.fetch_or(1 << flag.bit(), Ordering::AcqRel);
        self.notify.notify_waiters();
    }

    pub fn clear(&self, flag: F) {
        self.bits.fetch_and(!(1 << flag.bit()), Ordering::AcqRel);
        self.notify.notify_waiters();
    }

    /// Atomically sets `flag` and reports whether it was already set,
    /// i.e. detects the `false -> true` edge `BT_INIT`/`DEV_INIT`
    /// transitions rely on.
    pub fn test_and_set(&self, flag: F) -> bool {
        let prev = self.bits.fetch_or(1 << flag.bit(), Ordering::AcqRel);
        self.notify.notify_waiters();
        prev & (1 << flag.bit()) != 0
    }

    pub fn clear_all(&self) {
        self.bits.store(0, Ordering::Release);
        self.notify.notify_waiters();
    }

    /// Waits until `flag` is observed set, re-checking on every notify to
    /// avoid missing an edge that raced with the subscription.
    pub async fn wait_until_set(&self, flag: F) {
        loop {
            if self.test(flag) {
                return;
            }
            let notified = self.notify.notified();
            if self.test(flag) {
                return;
            }
            notified.await;
        }
    }
}

/// Controller-scope bring-up flags.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ControllerFlag {
    Ready,
    Pending,
    Enable,
    NameSet,
    ClassSet,
    BdaddrRead,
    VerRead,
    InquiryFilter,
    ConnFilter,
    PageEnable,
    Inquiry,
}

impl FlagKey for ControllerFlag {
    fn bit(self) -> u32 {
        match self {
            Self::Ready => 0,
            Self::Pending => 1,
            Self::Enable => 2,
            Self::NameSet => 3,
            Self::ClassSet => 4,
            Self::BdaddrRead => 5,
            Self::VerRead => 6,
            Self::InquiryFilter => 7,
            Self::ConnFilter => 8,
            Self::PageEnable => 9,
            Self::Inquiry => 10,
        }
    }
}

/// Device-scope bring-up flags, including the Wii-specific extension
/// bring-up bits.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum DeviceFlag {
    Pending,
    DeviceFound,
    Page,
    NameRead,
    Connected,
    Authenticating,
    Authenticated,
    LinkKeyReq,
    PinCodeReq,
    L2capConnReq,
    L2capConnected,
    L2capLconfDone,
    L2capRconfReq,
    L2capRconfDone,
    HidCtrlPending,
    HidCtrlConnected,
    HidIntrPending,
    HidIntrConnected,
    WiiStatusRx,
    WiiExtConfPending,
    WiiExtConfDone,
    WiiExtIdRead,
    WiiLedSet,
    WiiRepModeSet,
}

impl FlagKey for DeviceFlag {
    fn bit(self) -> u32 {
        match self {
            Self::Pending => 0,
            Self::DeviceFound => 1,
            Self::Page => 2,
            Self::NameRead => 3,
            Self::Connected => 4,
            Self::Authenticating => 5,
            Self::Authenticated => 6,
            Self::LinkKeyReq => 7,
            Self::PinCodeReq => 8,
            Self::L2capConnReq => 9,
            Self::L2capConnected => 10,
            Self::L2capLconfDone => 11,
            Self::L2capRconfReq => 12,
            Self::L2capRconfDone => 13,
            Self::HidCtrlPending => 14,
            Self::HidCtrlConnected => 15,
            Self::HidIntrPending => 16,
            Self::HidIntrConnected => 17,
            Self::WiiStatusRx => 18,
            Self::WiiExtConfPending => 19,
            Self::WiiExtConfDone => 20,
            Self::WiiExtIdRead => 21,
            Self::WiiLedSet => 22,
            Self::WiiRepModeSet => 23,
        }
    }
}

/// Per-report-type `BT_INIT`/`DEV_INIT` latch: once set for a given index
/// it stays set until [`AtomicFlags::clear_all`] is called on reconnection.
pub type ReportTypeInitFlags = AtomicFlags<ReportTypeSlot>;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct ReportTypeSlot(pub u8);

impl FlagKey for ReportTypeSlot {
    fn bit(self) -> u32 {
        debug_assert!(self.0 < 64);
        self.0 as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_test_round_trip() {
        let flags = AtomicFlags::<ControllerFlag>::new();
        assert!(!flags.test(ControllerFlag::Ready));
        flags.set(ControllerFlag::Ready);
        assert!(flags.test(ControllerFlag::Ready));
        flags.clear(ControllerFlag::Ready);
        assert!(!flags.test(ControllerFlag::Ready));
    }

    #[test]
    fn test_and_set_reports_prior_value() {
        let flags = AtomicFlags::<ReportTypeSlot>::new();
        let slot = ReportTypeSlot(3);
        assert!(!flags.test_and_set(slot));
        assert!(flags.test_and_set(slot));
        assert!(flags.test(slot));
    }

    #[tokio::test]
    async fn wait_until_set_resolves_after_set() {
        use std::sync::Arc;
        let flags = Arc::new(AtomicFlags::<ControllerFlag>::new());
        let waiter = {
            let flags = flags.clone();
            tokio::spawn(async move {
                flags.wait_until_set(ControllerFlag::Inquiry).await;
            })
        };
        tokio::task::yield_now().await;
        flags.set(ControllerFlag::Inquiry);
        tokio::time::timeout(std::time::Duration::from_secs(1), waiter)
            .await
            .expect("did not resolve in time")
            .unwrap();
    }
}
