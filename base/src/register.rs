use std::fmt::{self, Display, Formatter};

/// The compressed-register instruction set can name eight further
/// registers in a small number of instructions.  These live in a
/// separate namespace (`h0`..`h7`) rather than being numbered 8..15,
/// because the instruction formats only ever hold three bits of
/// register number plus a separate "high" flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Bank {
    Low,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Register {
    bank: Bank,
    number: u8,
}

impl Register {
    /// Registers per bank.
    pub const COUNT: u8 = 8;

    pub const SP: Register = Register {
        bank: Bank::High,
        number: 5,
    };
    pub const LR: Register = Register {
        bank: Bank::High,
        number: 6,
    };
    pub const PC: Register = Register {
        bank: Bank::High,
        number: 7,
    };

    #[must_use]
    pub fn new(bank: Bank, number: u8) -> Option<Register> {
        (number < Register::COUNT).then_some(Register { bank, number })
    }

    #[must_use]
    pub fn low(number: u8) -> Option<Register> {
        Register::new(Bank::Low, number)
    }

    #[must_use]
    pub fn high(number: u8) -> Option<Register> {
        Register::new(Bank::High, number)
    }

    #[must_use]
    pub fn bank(&self) -> Bank {
        self.bank
    }

    #[must_use]
    pub fn is_high(&self) -> bool {
        self.bank == Bank::High
    }

    /// The three-bit register number as it appears in an instruction
    /// field.
    #[must_use]
    pub fn bits(&self) -> u16 {
        u16::from(self.number)
    }
}

impl Display for Register {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.bank {
            Bank::Low => write!(f, "r{}", self.number),
            Bank::High => write!(f, "h{}", self.number),
        }
    }
}

#[test]
fn test_register_bounds() {
    assert!(Register::low(7).is_some());
    assert!(Register::low(8).is_none());
    assert_eq!(Register::high(5), Some(Register::SP));
}
