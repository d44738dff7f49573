//! The 16-slot link-key store: a circular buffer with LRU-by-insertion
//! replacement, persisted by an external collaborator as
//! `{bdaddr:u8[6], key:u8[16]}` records plus a write-index. The
//! ring-buffer shape mirrors `padbridge_transport::sock`'s buffer
//! discipline, generalized to a keyed store.
use crate::Address;

pub const LINK_KEY_STORE_SIZE: usize = 16;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct LinkKeyRecord {
    pub bdaddr: Address,
    pub key: [u8; 16],
}

/// 16-slot round-robin store indexed by insertion order: a circular
/// buffer with LRU-by-insertion replacement.
#[derive(Debug)]
pub struct LinkKeyStore {
    records: [Option<LinkKeyRecord>; LINK_KEY_STORE_SIZE],
    write_index: usize,
}

impl LinkKeyStore {
    pub fn new() -> Self {
        Self {
            records: Default::default(),
            write_index: 0,
        }
    }

    /// Inserts or overwrites the key for `bdaddr`. If `bdaddr` is already
    /// present its existing slot is updated in place (not rotated);
    /// otherwise the next write-index slot is used, evicting whatever
    /// occupied it (storing a 17th distinct bdaddr evicts the 1st).
    pub fn store(&mut self, bdaddr: Address, key: [u8; 16]) {
        if let Some(slot) = self.find_slot(bdaddr) {
            self.records[slot] = Some(LinkKeyRecord { bdaddr, key });
            return;
        }
        self.records[self.write_index] = Some(LinkKeyRecord { bdaddr, key });
        self.write_index = (self.write_index + 1) % LINK_KEY_STORE_SIZE;
    }

    pub fn lookup(&self, bdaddr: Address) -> Option<[u8; 16]> {
        self.records
            .iter()
            .flatten()
            .find(|rec| rec.bdaddr == bdaddr)
            .map(|rec| rec.key)
    }

    fn find_slot(&self, bdaddr: Address) -> Option<usize> {
        self.records
            .iter()
            .position(|rec| rec.as_ref().is_some_and(|rec| rec.bdaddr == bdaddr))
    }

    /// Serialises to the on-disk record layout: 16 records followed by
    /// the `u32` write index, for an external collaborator to prefix with
    /// the magic and persist.
    pub fn to_records(&self) -> ([Option<LinkKeyRecord>; LINK_KEY_STORE_SIZE], u32) {
        (self.records, self.write_index as u32)
    }

    pub fn from_records(records: [Option<LinkKeyRecord>; LINK_KEY_STORE_SIZE], write_index: u32) -> Self {
        Self {
            records,
            write_index: write_index as usize % LINK_KEY_STORE_SIZE,
        }
    }
}

impl Default for LinkKeyStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(b: u8) -> Address {
        Address::new([b, 0, 0, 0, 0, 0])
    }

    #[test]
    fn store_then_load_round_trips() {
        let mut store = LinkKeyStore::new();
        let key = [0xAB; 16];
        store.store(addr(1), key);
        assert_eq!(store.lookup(addr(1)), Some(key));
    }

    #[test]
    fn seventeenth_distinct_key_evicts_the_first() {
        let mut store = LinkKeyStore::new();
        for i in 0..17u8 {
            store.store(addr(i), [i; 16]);
        }
        assert_eq!(store.lookup(addr(0)), None);
        assert_eq!(store.lookup(addr(16)), Some([16; 16]));
        for i in 1..17u8 {
            assert_eq!(store.lookup(addr(i)), Some([i; 16]));
        }
    }

    #[test]
    fn restoring_same_bdaddr_updates_in_place_without_rotating() {
        let mut store = LinkKeyStore::new();
        store.store(addr(1), [1; 16]);
        store.store(addr(2), [2; 16]);
        store.store(addr(1), [0xFF; 16]);
        assert_eq!(store.lookup(addr(1)), Some([0xFF; 16]));
        // write_index should still point at slot 2, not advanced by the update.
        let (_, idx) = store.to_records();
        assert_eq!(idx, 2);
    }
}
