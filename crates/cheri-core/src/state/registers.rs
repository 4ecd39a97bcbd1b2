use core::fmt;

use crate::{CapabilityError, CapabilityFault, CapabilityRegister, FaultCode};

/// Number of general-purpose capability registers (`C0..C31`).
pub const CAP_REGISTER_COUNT: usize = 32;
/// Cause-register number reported for `DDC`.
pub const CAUSE_REGISTER_DDC: u8 = 0x20;
/// Cause-register number reported for `PCC` and for faults naming no register.
pub const CAUSE_REGISTER_NONE: u8 = 0xFF;

/// Index of a general-purpose capability register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct CapRegIndex(u8);

impl CapRegIndex {
    /// Decodes a 5-bit register field.
    #[must_use]
    pub const fn from_u5(bits: u8) -> Option<Self> {
        if (bits as usize) < CAP_REGISTER_COUNT {
            Some(Self(bits))
        } else {
            None
        }
    }

    /// Array index for this register (`0..=31`).
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Architectural register number.
    #[must_use]
    pub const fn number(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for CapRegIndex {
    type Error = CapabilityError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_u5(value).ok_or(CapabilityError::RegisterOutOfRange(value))
    }
}

/// Identity of a capability register, as named in fault reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum RegisterId {
    /// General-purpose capability register.
    General(CapRegIndex),
    /// Default data capability.
    Ddc,
    /// Program-counter capability.
    Pcc,
}

impl RegisterId {
    /// Number written to the register field of the cause register.
    #[must_use]
    pub const fn cause_register_number(self) -> u8 {
        match self {
            Self::General(index) => index.number(),
            Self::Ddc => CAUSE_REGISTER_DDC,
            Self::Pcc => CAUSE_REGISTER_NONE,
        }
    }
}

impl From<CapRegIndex> for RegisterId {
    fn from(index: CapRegIndex) -> Self {
        Self::General(index)
    }
}

impl fmt::Display for RegisterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::General(index) => write!(f, "c{}", index.number()),
            Self::Ddc => f.write_str("DDC"),
            Self::Pcc => f.write_str("PCC"),
        }
    }
}

/// General-purpose capability register file.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct CapRegisterFile {
    registers: [CapabilityRegister; CAP_REGISTER_COUNT],
}

impl Default for CapRegisterFile {
    fn default() -> Self {
        Self {
            registers: [CapabilityRegister::null(); CAP_REGISTER_COUNT],
        }
    }
}

impl CapRegisterFile {
    /// Reads a register.
    #[must_use]
    pub const fn read(&self, index: CapRegIndex) -> &CapabilityRegister {
        &self.registers[index.index()]
    }

    /// Writes a register.
    pub const fn write(&mut self, index: CapRegIndex, value: CapabilityRegister) {
        self.registers[index.index()] = value;
    }

    /// Resets every register to the null capability.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Capability cause register contents, latched by every raised capability fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct CapCause {
    /// Latched cause.
    pub cause: FaultCode,
    /// Offending register, if any.
    pub register: Option<RegisterId>,
    /// Diagnostic "instruction available" state at the time of the fault.
    pub instruction_available: bool,
}

impl CapCause {
    /// Builds the cause-register contents for `fault`.
    #[must_use]
    pub const fn from_fault(fault: &CapabilityFault) -> Self {
        Self {
            cause: fault.cause,
            register: fault.register,
            instruction_available: fault.instruction_available,
        }
    }

    /// Packed `(cause << 8) | register` word as read by `CGetCause`.
    #[must_use]
    pub const fn word(self) -> u16 {
        let cause = match self.cause.cap_cause_code() {
            Some(code) => code,
            None => 0,
        };
        let register = match self.register {
            Some(register) => register.cause_register_number(),
            None => CAUSE_REGISTER_NONE,
        };
        ((cause as u16) << 8) | register as u16
    }
}
