use std::fmt::{self, Display, Formatter, UpperHex};

/// A 16-bit memory address.  Memory is word-addressed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(u16);

impl Address {
    pub const ZERO: Address = Address(0);
    pub const MAX: Address = Address(u16::MAX);

    #[must_use]
    pub const fn new(value: u16) -> Address {
        Address(value)
    }

    /// The address `offset` words beyond this one, if that is still
    /// inside the address space (address arithmetic does not wrap).
    #[must_use]
    pub fn checked_offset(self, offset: usize) -> Option<Address> {
        u16::try_from(offset)
            .ok()
            .and_then(|off| self.0.checked_add(off))
            .map(Address)
    }
}

impl From<u16> for Address {
    fn from(value: u16) -> Address {
        Address(value)
    }
}

impl From<Address> for u16 {
    fn from(addr: Address) -> u16 {
        addr.0
    }
}

impl From<Address> for u32 {
    fn from(addr: Address) -> u32 {
        u32::from(addr.0)
    }
}

impl From<Address> for i64 {
    fn from(addr: Address) -> i64 {
        i64::from(addr.0)
    }
}

impl UpperHex for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        UpperHex::fmt(&self.0, f)
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "x{:04X}", self.0)
    }
}

#[test]
fn test_address_display() {
    assert_eq!(Address::new(0x3000).to_string(), "x3000");
    assert_eq!(Address::new(0x1F).to_string(), "x001F");
}

#[test]
fn test_checked_offset() {
    assert_eq!(
        Address::new(0x3000).checked_offset(2),
        Some(Address::new(0x3002))
    );
    assert_eq!(Address::MAX.checked_offset(1), None);
    assert_eq!(Address::ZERO.checked_offset(0x1_0000), None);
}
