use macaddr::MacAddr6;
use std::{
    fmt::{self, Debug, Display, Formatter},
    ops::{Deref, DerefMut},
    str::FromStr,
};

/// A Bluetooth device address in byte order, most-significant byte first.
///
/// The serialized/display representation is colon-hexadecimal notation.
#[derive(Clone, Copy, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Address(pub [u8; 6]);

impl Address {
    pub const fn new(addr: [u8; 6]) -> Self {
        Self(addr)
    }

    /// `00:00:00:00:00:00`.
    pub const fn any() -> Self {
        Self([0; 6])
    }

    /// Low nibble of the last byte, used to derive an L2CAP CID's device
    /// slot: `scid = (slot & 0xF) | base`.
    pub fn slot_nibble(&self) -> u8 {
        self.0[5] & 0x0F
    }
}

impl Deref for Address {
    type Target = [u8; 6];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Address {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

impl Debug for Address {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl From<[u8; 6]> for Address {
    fn from(addr: [u8; 6]) -> Self {
        Self(addr)
    }
}

impl From<Address> for [u8; 6] {
    fn from(addr: Address) -> Self {
        addr.0
    }
}

impl From<MacAddr6> for Address {
    fn from(addr: MacAddr6) -> Self {
        Self(addr.into_array())
    }
}

impl From<Address> for MacAddr6 {
    fn from(addr: Address) -> Self {
        addr.0.into()
    }
}

/// Returned when parsing a colon-hexadecimal address string fails.
#[derive(Debug, Clone)]
pub struct InvalidAddressError(pub String);

impl fmt::Display for InvalidAddressError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "invalid Bluetooth address: {}", &self.0)
    }
}

impl std::error::Error for InvalidAddressError {}

impl FromStr for Address {
    type Err = InvalidAddressError;

    fn from_str(s: &str) -> Result<Self, InvalidAddressError> {
        let fields = s
            .split(':')
            .map(|s| u8::from_str_radix(s, 16).map_err(|_| InvalidAddressError(s.to_string())))
            .collect::<Result<Vec<_>, InvalidAddressError>>()?;
        Ok(Self(
            fields
                .try_into()
                .map_err(|_| InvalidAddressError(s.to_string()))?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_display_and_parse() {
        let addr = Address::new([0x94, 0x59, 0xCB, 0x01, 0x02, 0x03]);
        let s = addr.to_string();
        assert_eq!(s, "94:59:CB:01:02:03");
        assert_eq!(s.parse::<Address>().unwrap(), addr);
    }

    #[test]
    fn slot_nibble_is_low_nibble_of_last_byte() {
        let addr = Address::new([0, 0, 0, 0, 0, 0x1B]);
        assert_eq!(addr.slot_nibble(), 0x0B);
    }

    #[test]
    fn rejects_malformed_strings() {
        assert!("not-an-address".parse::<Address>().is_err());
        assert!("94:59:CB:01:02".parse::<Address>().is_err());
    }
}
