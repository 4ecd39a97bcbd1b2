use thiserror::Error;

use crate::state::RegisterId;

/// Fault classes used for diagnostics aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum FaultClass {
    /// Operand capability was untagged.
    Tag,
    /// Operand capability was sealed (or unsealed) when the opposite was required.
    Seal,
    /// Object types did not match or a reserved type was used.
    Type,
    /// A hardware or software permission was missing.
    Permission,
    /// Address or span fell outside the capability bounds.
    Bounds,
    /// Result could not be encoded exactly.
    Representability,
    /// A tagged capability load was refused by the protection state.
    LoadGeneration,
    /// Legacy, non-capability address error.
    Address,
}

/// Closed cause enumeration for faults raised by the capability core.
///
/// Capability causes carry the architectural `CapCause` number; the legacy
/// address-error causes are delivered through the ordinary exception path
/// and have no capability cause number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum FaultCode {
    /// Access or span not contained in `[base, top)`.
    #[error("Length Violation")]
    LengthViolation,
    /// Capability tag was clear.
    #[error("Tag Violation")]
    TagViolation,
    /// Sealed state did not match the operation's requirement.
    #[error("Seal Violation")]
    SealViolation,
    /// Object type mismatch or reserved object type.
    #[error("Type Violation")]
    TypeViolation,
    /// Requested permission word is not a subset of the capability's.
    #[error("User-defined Permission Violation")]
    UserDefViolation,
    /// Result bounds cannot be represented exactly.
    #[error("Bounds Cannot Be Represented Exactly")]
    InexactBounds,
    /// Tagged capability load refused by the current protection state.
    #[error("Cap Load Gen Mismatch")]
    CapabilityLoadGenerationViolation,
    /// Instruction fetch without execute permission.
    #[error("Permit_Execute Violation")]
    PermitExecuteViolation,
    /// Data load without load permission.
    #[error("Permit_Load Violation")]
    PermitLoadViolation,
    /// Data store without store permission.
    #[error("Permit_Store Violation")]
    PermitStoreViolation,
    /// Capability load without load-capability permission.
    #[error("Permit_Load_Capability Violation")]
    PermitLoadCapViolation,
    /// Capability store without store-capability permission.
    #[error("Permit_Store_Capability Violation")]
    PermitStoreCapViolation,
    /// Non-global capability stored without store-local permission.
    #[error("Permit_Store_Local_Capability Violation")]
    PermitStoreLocalCapViolation,
    /// Sealing authority lacks the seal permission.
    #[error("Permit_Seal Violation")]
    PermitSealViolation,
    /// Unsealing authority lacks the unseal permission.
    #[error("Permit_Unseal Violation")]
    PermitUnsealViolation,
    /// Misaligned legacy load.
    #[error("Address Error (load)")]
    AddressErrorLoad,
    /// Misaligned legacy store.
    #[error("Address Error (store)")]
    AddressErrorStore,
}

impl FaultCode {
    /// Every defined cause, in architectural cause-number order.
    pub const ALL: [Self; 17] = [
        Self::LengthViolation,
        Self::TagViolation,
        Self::SealViolation,
        Self::TypeViolation,
        Self::UserDefViolation,
        Self::InexactBounds,
        Self::CapabilityLoadGenerationViolation,
        Self::PermitExecuteViolation,
        Self::PermitLoadViolation,
        Self::PermitStoreViolation,
        Self::PermitLoadCapViolation,
        Self::PermitStoreCapViolation,
        Self::PermitStoreLocalCapViolation,
        Self::PermitSealViolation,
        Self::PermitUnsealViolation,
        Self::AddressErrorLoad,
        Self::AddressErrorStore,
    ];

    /// Returns the architectural `CapCause` number, if this is a capability cause.
    #[must_use]
    pub const fn cap_cause_code(self) -> Option<u8> {
        match self {
            Self::LengthViolation => Some(0x01),
            Self::TagViolation => Some(0x02),
            Self::SealViolation => Some(0x03),
            Self::TypeViolation => Some(0x04),
            Self::UserDefViolation => Some(0x08),
            Self::InexactBounds => Some(0x0A),
            Self::CapabilityLoadGenerationViolation => Some(0x0C),
            Self::PermitExecuteViolation => Some(0x11),
            Self::PermitLoadViolation => Some(0x12),
            Self::PermitStoreViolation => Some(0x13),
            Self::PermitLoadCapViolation => Some(0x14),
            Self::PermitStoreCapViolation => Some(0x15),
            Self::PermitStoreLocalCapViolation => Some(0x16),
            Self::PermitSealViolation => Some(0x17),
            Self::PermitUnsealViolation => Some(0x1B),
            Self::AddressErrorLoad | Self::AddressErrorStore => None,
        }
    }

    /// Converts an architectural `CapCause` number back into a cause.
    #[must_use]
    pub const fn from_cap_cause_code(code: u8) -> Option<Self> {
        match code {
            0x01 => Some(Self::LengthViolation),
            0x02 => Some(Self::TagViolation),
            0x03 => Some(Self::SealViolation),
            0x04 => Some(Self::TypeViolation),
            0x08 => Some(Self::UserDefViolation),
            0x0A => Some(Self::InexactBounds),
            0x0C => Some(Self::CapabilityLoadGenerationViolation),
            0x11 => Some(Self::PermitExecuteViolation),
            0x12 => Some(Self::PermitLoadViolation),
            0x13 => Some(Self::PermitStoreViolation),
            0x14 => Some(Self::PermitLoadCapViolation),
            0x15 => Some(Self::PermitStoreCapViolation),
            0x16 => Some(Self::PermitStoreLocalCapViolation),
            0x17 => Some(Self::PermitSealViolation),
            0x1B => Some(Self::PermitUnsealViolation),
            _ => None,
        }
    }

    /// Returns the diagnostics fault class for this cause.
    #[must_use]
    pub const fn class(self) -> FaultClass {
        match self {
            Self::TagViolation => FaultClass::Tag,
            Self::SealViolation => FaultClass::Seal,
            Self::TypeViolation => FaultClass::Type,
            Self::UserDefViolation
            | Self::PermitExecuteViolation
            | Self::PermitLoadViolation
            | Self::PermitStoreViolation
            | Self::PermitLoadCapViolation
            | Self::PermitStoreCapViolation
            | Self::PermitStoreLocalCapViolation
            | Self::PermitSealViolation
            | Self::PermitUnsealViolation => FaultClass::Permission,
            Self::LengthViolation => FaultClass::Bounds,
            Self::InexactBounds => FaultClass::Representability,
            Self::CapabilityLoadGenerationViolation => FaultClass::LoadGeneration,
            Self::AddressErrorLoad | Self::AddressErrorStore => FaultClass::Address,
        }
    }
}

/// A fault raised by a capability operation.
///
/// Created at the point of violation and consumed immediately by the
/// context's fault raising path. The offending register is `None` for
/// legacy address errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[error("{cause} (register {register:?}, address {address:?})")]
pub struct CapabilityFault {
    /// Fault cause.
    pub cause: FaultCode,
    /// Register whose contents caused the fault.
    pub register: Option<RegisterId>,
    /// Faulting virtual address, when one is architecturally reported.
    pub address: Option<u64>,
    /// `false` when raised before the faulting instruction's PC update was
    /// committed (the "instruction not available" diagnostic state).
    pub instruction_available: bool,
}

impl CapabilityFault {
    /// Creates a fault naming the offending register.
    #[must_use]
    pub const fn new(cause: FaultCode, register: RegisterId) -> Self {
        Self {
            cause,
            register: Some(register),
            address: None,
            instruction_available: true,
        }
    }

    /// Creates a legacy address-error fault that names no register.
    #[must_use]
    pub const fn address_error(cause: FaultCode, address: u64) -> Self {
        Self {
            cause,
            register: None,
            address: Some(address),
            instruction_available: true,
        }
    }

    /// Attaches the faulting address.
    #[must_use]
    pub const fn at(mut self, address: u64) -> Self {
        self.address = Some(address);
        self
    }

    /// Marks the fault as raised before the instruction was available.
    #[must_use]
    pub const fn before_retire(mut self) -> Self {
        self.instruction_available = false;
        self
    }
}

/// Rejection of a capability that would violate the well-formedness invariant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum CapabilityError {
    /// `(base, length)` has no exact encoding.
    #[error("bounds base={base:#x} length={length:#x} are not exactly representable")]
    InexactBounds {
        /// Requested base.
        base: u64,
        /// Requested length.
        length: u128,
    },
    /// `top` would exceed `2^64`.
    #[error("bounds base={base:#x} length={length:#x} exceed the address space")]
    BoundsOverflow {
        /// Requested base.
        base: u64,
        /// Requested length.
        length: u128,
    },
    /// The cursor lies outside the representable window of the bounds.
    #[error("cursor {cursor:#x} is outside the representable window")]
    UnrepresentableCursor {
        /// Requested cursor.
        cursor: u64,
    },
    /// Object type value is outside `0..=MAX_NON_RESERVED_OTYPE`.
    #[error("object type {0} is out of range")]
    ObjectTypeOutOfRange(u64),
    /// Register index is outside the capability register file.
    #[error("capability register index {0} is out of range")]
    RegisterOutOfRange(u8),
}
