//! Hardware and software permission sets and their flat register encoding.
//!
//! The flat word handed to `CGetPerm`/`CAndPerm`/`CCheckPerm` packs the
//! hardware permissions in bits `0..12` and the software permissions in bits
//! `15..19`. Bits `12..15` are unused and ignored on input.

use bitflags::bitflags;

/// Number of architecturally defined hardware permission bits.
pub const HARDWARE_PERMISSION_BITS: u32 = 12;
/// Bit position of the first software permission in the flat word.
pub const SOFTWARE_PERMISSION_SHIFT: u32 = 15;
/// Number of software permission bits.
pub const SOFTWARE_PERMISSION_BITS: u32 = 4;
/// First flat-word bit above the defined software permissions.
pub const PERMISSION_WORD_LIMIT_SHIFT: u32 = SOFTWARE_PERMISSION_SHIFT + SOFTWARE_PERMISSION_BITS;

bitflags! {
    /// Architecturally defined hardware permissions.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
    pub struct HardwarePermissions: u32 {
        /// Capability may be stored through any store-capability authority.
        const GLOBAL = 1 << 0;
        /// Instruction fetch.
        const EXECUTE = 1 << 1;
        /// Data load.
        const LOAD = 1 << 2;
        /// Data store.
        const STORE = 1 << 3;
        /// Load tagged capabilities.
        const LOAD_CAPABILITY = 1 << 4;
        /// Store tagged capabilities.
        const STORE_CAPABILITY = 1 << 5;
        /// Store non-global capabilities.
        const STORE_LOCAL_CAPABILITY = 1 << 6;
        /// Authorize sealing with the cursor as object type.
        const SEAL = 1 << 7;
        /// Authorize domain-crossing calls.
        const CCALL = 1 << 8;
        /// Authorize unsealing of the cursor's object type.
        const UNSEAL = 1 << 9;
        /// Access privileged special registers.
        const ACCESS_SYSTEM_REGISTERS = 1 << 10;
        /// Set the compartment identifier.
        const SET_CID = 1 << 11;
    }
}

bitflags! {
    /// Software-defined permissions; opaque to the core.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
    pub struct SoftwarePermissions: u32 {
        /// Software permission 0.
        const USER0 = 1 << 0;
        /// Software permission 1.
        const USER1 = 1 << 1;
        /// Software permission 2.
        const USER2 = 1 << 2;
        /// Software permission 3.
        const USER3 = 1 << 3;
    }
}

/// Combined hardware and software permissions of one capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct PermissionSet {
    /// Hardware permissions.
    pub hardware: HardwarePermissions,
    /// Software permissions.
    pub software: SoftwarePermissions,
}

impl PermissionSet {
    /// No permissions.
    pub const NONE: Self = Self::new(HardwarePermissions::empty(), SoftwarePermissions::empty());

    /// Every defined permission.
    pub const ALL: Self = Self::new(HardwarePermissions::all(), SoftwarePermissions::all());

    /// Creates a permission set from its two halves.
    #[must_use]
    pub const fn new(hardware: HardwarePermissions, software: SoftwarePermissions) -> Self {
        Self { hardware, software }
    }

    /// Packs the set into the flat register word.
    #[must_use]
    pub const fn to_word(self) -> u64 {
        (self.hardware.bits() as u64)
            | ((self.software.bits() as u64) << SOFTWARE_PERMISSION_SHIFT)
    }

    /// Unpacks a flat register word, discarding undefined bits.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn from_word(word: u64) -> Self {
        Self {
            hardware: HardwarePermissions::from_bits_truncate(word as u32),
            software: SoftwarePermissions::from_bits_truncate(
                (word >> SOFTWARE_PERMISSION_SHIFT) as u32,
            ),
        }
    }

    /// Returns `true` when `word` sets any bit above the software permissions.
    #[must_use]
    pub const fn word_has_undefined_high_bits(word: u64) -> bool {
        word >> PERMISSION_WORD_LIMIT_SHIFT != 0
    }

    /// Returns `true` when every permission in `self` is also in `other`.
    #[must_use]
    pub const fn is_subset_of(self, other: Self) -> bool {
        other.hardware.contains(self.hardware) && other.software.contains(self.software)
    }

    /// Intersects both halves with `mask`; never adds a permission.
    #[must_use]
    pub const fn intersection(self, mask: Self) -> Self {
        Self {
            hardware: self.hardware.intersection(mask.hardware),
            software: self.software.intersection(mask.software),
        }
    }
}

impl From<HardwarePermissions> for PermissionSet {
    fn from(hardware: HardwarePermissions) -> Self {
        Self::new(hardware, SoftwarePermissions::empty())
    }
}
