//! Capability register value type and its derived-field accessors.

/// Object types and sealed-state classification.
pub mod otype;
/// Hardware/software permission sets and the flat permission word.
pub mod permissions;

pub use otype::{
    ObjectType, MAX_NON_RESERVED_OTYPE, MAX_REPRESENTABLE_OTYPE, OTYPE_BITS, RESERVED_OTYPE_COUNT,
};
pub use permissions::{
    HardwarePermissions, PermissionSet, SoftwarePermissions, HARDWARE_PERMISSION_BITS,
    PERMISSION_WORD_LIMIT_SHIFT, SOFTWARE_PERMISSION_BITS, SOFTWARE_PERMISSION_SHIFT,
};

use crate::compression::{is_representable, is_representable_when_sealing};
use crate::CapabilityError;

/// Exclusive upper limit of the address space (`2^64`).
pub const ADDRESS_SPACE_TOP: u128 = 1 << 64;

/// A capability register value.
///
/// Tagged values always satisfy the representability invariant: their
/// `(base, length, cursor)` triple is exactly encodable. Untagged values
/// carry no authority and may hold any field contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct CapabilityRegister {
    tag: bool,
    base: u64,
    top: u128,
    cursor: u64,
    permissions: PermissionSet,
    otype: ObjectType,
    flags: u8,
}

impl Default for CapabilityRegister {
    fn default() -> Self {
        Self::null()
    }
}

impl CapabilityRegister {
    /// The null capability: untagged, zero bounds, no permissions, unsealed.
    #[must_use]
    pub const fn null() -> Self {
        Self {
            tag: false,
            base: 0,
            top: 0,
            cursor: 0,
            permissions: PermissionSet::NONE,
            otype: ObjectType::Unsealed,
            flags: 0,
        }
    }

    /// The root capability: tagged, covering the whole address space with
    /// every permission.
    #[must_use]
    pub const fn root() -> Self {
        Self {
            tag: true,
            base: 0,
            top: ADDRESS_SPACE_TOP,
            cursor: 0,
            permissions: PermissionSet::ALL,
            otype: ObjectType::Unsealed,
            flags: 0,
        }
    }

    /// Creates a tagged, unsealed capability.
    ///
    /// # Errors
    ///
    /// Fails when `base + length` exceeds `2^64`, when the bounds have no
    /// exact encoding, or when `cursor` lies outside the representable
    /// window of the bounds.
    pub fn new(
        base: u64,
        length: u128,
        cursor: u64,
        permissions: PermissionSet,
    ) -> Result<Self, CapabilityError> {
        let top = u128::from(base) + length;
        if top > ADDRESS_SPACE_TOP {
            return Err(CapabilityError::BoundsOverflow { base, length });
        }
        if !is_representable(base, length, base) {
            return Err(CapabilityError::InexactBounds { base, length });
        }
        if !is_representable(base, length, cursor) {
            return Err(CapabilityError::UnrepresentableCursor { cursor });
        }
        Ok(Self {
            tag: true,
            base,
            top,
            cursor,
            permissions,
            otype: ObjectType::Unsealed,
            flags: 0,
        })
    }

    /// Reassembles a value from decoded fields without validation. Only the
    /// decompressor and the tag-clearing paths may produce unchecked values.
    pub(crate) const fn from_parts(
        tag: bool,
        base: u64,
        top: u128,
        cursor: u64,
        permissions: PermissionSet,
        otype: ObjectType,
        flags: u8,
    ) -> Self {
        Self {
            tag,
            base,
            top,
            cursor,
            permissions,
            otype,
            flags,
        }
    }

    /// Validity bit.
    #[must_use]
    pub const fn tag(&self) -> bool {
        self.tag
    }

    /// Lower bound.
    #[must_use]
    pub const fn base(&self) -> u64 {
        self.base
    }

    /// Exclusive upper bound; may equal `2^64`.
    #[must_use]
    pub const fn top(&self) -> u128 {
        self.top
    }

    /// Exact length, which may be `2^64`.
    #[must_use]
    pub const fn length_full(&self) -> u128 {
        self.top.saturating_sub(self.base as u128)
    }

    /// Length saturated to `u64::MAX` when the exact length is `2^64`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn length(&self) -> u64 {
        let length = self.length_full();
        if length > u64::MAX as u128 {
            u64::MAX
        } else {
            length as u64
        }
    }

    /// Current address.
    #[must_use]
    pub const fn cursor(&self) -> u64 {
        self.cursor
    }

    /// `cursor - base`, modulo `2^64`.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.cursor.wrapping_sub(self.base)
    }

    /// Combined permissions.
    #[must_use]
    pub const fn permissions(&self) -> PermissionSet {
        self.permissions
    }

    /// Hardware permissions.
    #[must_use]
    pub const fn hardware_permissions(&self) -> HardwarePermissions {
        self.permissions.hardware
    }

    /// Software permissions.
    #[must_use]
    pub const fn software_permissions(&self) -> SoftwarePermissions {
        self.permissions.software
    }

    /// Flat permission word (`CGetPerm`).
    #[must_use]
    pub const fn permission_word(&self) -> u64 {
        self.permissions.to_word()
    }

    /// Returns `true` when every hardware permission in `required` is held.
    #[must_use]
    pub const fn has_permissions(&self, required: HardwarePermissions) -> bool {
        self.permissions.hardware.contains(required)
    }

    /// Object type.
    #[must_use]
    pub const fn otype(&self) -> ObjectType {
        self.otype
    }

    /// Flag bits (`CGetFlags`). Reserved: no operation sets them, and only
    /// bit 0 survives a trip through memory.
    #[must_use]
    pub const fn flags(&self) -> u8 {
        self.flags
    }

    /// Returns `true` unless the object type is [`ObjectType::Unsealed`].
    #[must_use]
    pub const fn is_sealed(&self) -> bool {
        self.otype.is_sealed()
    }

    /// Returns `true` for an unsealed capability.
    #[must_use]
    pub const fn is_unsealed(&self) -> bool {
        !self.otype.is_sealed()
    }

    /// Returns `true` when sealed with a software object type.
    #[must_use]
    pub const fn is_sealed_with_type(&self) -> bool {
        self.otype.is_sealed_with_type()
    }

    /// Returns `true` for a sealed entry capability.
    #[must_use]
    pub const fn is_sealed_entry(&self) -> bool {
        self.otype.is_sealed_entry()
    }

    /// Returns `true` when `[addr, addr + len)` lies within `[base, top)`.
    ///
    /// The end address is computed exactly, so a span wrapping past `2^64`
    /// is never in bounds.
    #[must_use]
    pub const fn in_bounds(&self, addr: u64, len: u64) -> bool {
        addr >= self.base && (addr as u128) + (len as u128) <= self.top
    }

    /// Copy with the tag cleared; every other field is preserved byte-for-byte.
    #[must_use]
    pub const fn with_tag_cleared(mut self) -> Self {
        self.tag = false;
        self
    }

    /// Clears the tag in place.
    pub const fn clear_tag(&mut self) {
        self.tag = false;
    }

    /// Copy whose permissions are intersected with `mask`.
    #[must_use]
    pub const fn with_permissions_narrowed(mut self, mask: PermissionSet) -> Self {
        self.permissions = self.permissions.intersection(mask);
        self
    }

    /// Copy with the given object type; bounds and tag are untouched.
    #[must_use]
    pub(crate) const fn with_otype(mut self, otype: ObjectType) -> Self {
        self.otype = otype;
        self
    }

    /// Copy with `GLOBAL` forced to `global`.
    #[must_use]
    pub(crate) fn with_global(mut self, global: bool) -> Self {
        self.permissions
            .hardware
            .set(HardwarePermissions::GLOBAL, global);
        self
    }

    /// Copy that keeps the address but no longer carries authority.
    ///
    /// Used whenever a cursor change would leave the representable window.
    #[must_use]
    pub const fn mark_unrepresentable(mut self, new_cursor: u64) -> Self {
        self.tag = false;
        self.cursor = new_cursor;
        self
    }

    /// Returns `true` when `new_cursor` keeps the bounds exactly encodable.
    #[must_use]
    pub fn is_representable_with_cursor(&self, new_cursor: u64) -> bool {
        is_representable(self.base, self.length_full(), new_cursor)
    }

    /// Moves the cursor, or detags the result if the new cursor is
    /// unrepresentable. Never produces a tagged out-of-window value.
    #[must_use]
    pub fn with_cursor(self, new_cursor: u64) -> Self {
        if self.is_representable_with_cursor(new_cursor) {
            let mut result = self;
            result.cursor = new_cursor;
            result
        } else {
            self.mark_unrepresentable(new_cursor)
        }
    }

    /// Returns a sealed entry capability, or `None` when the value is
    /// untagged, already sealed, or not representable once sealed.
    #[must_use]
    pub fn sealed_entry(self) -> Option<Self> {
        if !self.tag || self.is_sealed() || !is_representable_when_sealing(&self, self.cursor) {
            return None;
        }
        Some(self.with_otype(ObjectType::Sentry))
    }
}
