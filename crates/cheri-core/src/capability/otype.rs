//! Object types: the sealed state of a capability.

use crate::CapabilityError;

/// Width of the object-type field in the capability encoding.
pub const OTYPE_BITS: u32 = 18;
/// Largest raw value of the object-type field.
pub const MAX_REPRESENTABLE_OTYPE: u64 = (1 << OTYPE_BITS) - 1;
/// Number of sentinel values reserved below the unsealed marker.
pub const RESERVED_OTYPE_COUNT: u64 = 16;
/// Largest object type usable with seal/unseal.
pub const MAX_NON_RESERVED_OTYPE: u64 = MAX_REPRESENTABLE_OTYPE - RESERVED_OTYPE_COUNT - 1;

/// Sealed state of a capability, derived entirely from its object type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ObjectType {
    /// Not sealed.
    #[default]
    Unsealed,
    /// Sealed with a software object type in `0..=MAX_NON_RESERVED_OTYPE`.
    SealedWithType(u32),
    /// Sealed entry capability; unsealed by a jump or exception return to its cursor.
    Sentry,
    /// Other hardware-reserved sentinel, numbered `2..=16` below the field maximum.
    Reserved(u8),
}

impl ObjectType {
    /// Builds a software object type, rejecting reserved values.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::ObjectTypeOutOfRange`] when `value` exceeds
    /// [`MAX_NON_RESERVED_OTYPE`].
    pub fn sealed_with_type(value: u64) -> Result<Self, CapabilityError> {
        if value > MAX_NON_RESERVED_OTYPE {
            return Err(CapabilityError::ObjectTypeOutOfRange(value));
        }
        u32::try_from(value)
            .map(Self::SealedWithType)
            .map_err(|_| CapabilityError::ObjectTypeOutOfRange(value))
    }

    /// Returns `true` for every state other than [`ObjectType::Unsealed`].
    #[must_use]
    pub const fn is_sealed(self) -> bool {
        !matches!(self, Self::Unsealed)
    }

    /// Returns `true` for software object types.
    #[must_use]
    pub const fn is_sealed_with_type(self) -> bool {
        matches!(self, Self::SealedWithType(_))
    }

    /// Returns `true` for sealed entry capabilities.
    #[must_use]
    pub const fn is_sealed_entry(self) -> bool {
        matches!(self, Self::Sentry)
    }

    /// Raw value of the object-type field.
    #[must_use]
    pub const fn to_raw(self) -> u64 {
        match self {
            Self::Unsealed => MAX_REPRESENTABLE_OTYPE,
            Self::SealedWithType(value) => value as u64,
            Self::Sentry => MAX_REPRESENTABLE_OTYPE - 1,
            Self::Reserved(index) => MAX_REPRESENTABLE_OTYPE - index as u64,
        }
    }

    /// Decodes a raw object-type field. Total over all inputs; bits above the
    /// field width are ignored.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn from_raw(raw: u64) -> Self {
        let raw = raw & MAX_REPRESENTABLE_OTYPE;
        if raw <= MAX_NON_RESERVED_OTYPE {
            return Self::SealedWithType(raw as u32);
        }
        match MAX_REPRESENTABLE_OTYPE - raw {
            0 => Self::Unsealed,
            1 => Self::Sentry,
            index => Self::Reserved(index as u8),
        }
    }

    /// Signed view used by `CGetType`: reserved sentinels are negative.
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub const fn to_signed(self) -> i64 {
        match self {
            Self::SealedWithType(value) => value as i64,
            Self::Unsealed | Self::Sentry | Self::Reserved(_) => {
                -((MAX_REPRESENTABLE_OTYPE - self.to_raw()) as i64) - 1
            }
        }
    }
}
