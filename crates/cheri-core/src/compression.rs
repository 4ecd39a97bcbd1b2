//! Floating-bounds compression and the representability oracle.
//!
//! Bounds are stored as a 12-bit base mantissa and an 11-bit length mantissa
//! scaled by a shared exponent. A `(base, length)` pair is exact when both are
//! multiples of `2^e`, where `e` is the smallest exponent that fits the
//! length into the length mantissa. The base is reconstructed relative to
//! the cursor, which therefore has to stay inside a window of `2^(e+12)`
//! bytes that starts a quarter-window below the base.
//!
//! Memory image (16 bytes, big-endian): metadata word, then cursor.
//!
//! | bits    | field                     |
//! |---------|---------------------------|
//! | 0..12   | hardware permissions      |
//! | 12..16  | software permissions      |
//! | 16..34  | object type               |
//! | 34..40  | exponent                  |
//! | 40..52  | base mantissa             |
//! | 52..63  | length mantissa           |
//! | 63      | reserved flag bit         |

use crate::capability::{
    CapabilityRegister, HardwarePermissions, ObjectType, PermissionSet, SoftwarePermissions,
    ADDRESS_SPACE_TOP, MAX_REPRESENTABLE_OTYPE,
};

/// Width of the base mantissa.
pub const MANTISSA_WIDTH: u32 = 12;
/// Width of the length mantissa.
pub const LENGTH_MANTISSA_WIDTH: u32 = MANTISSA_WIDTH - 1;
/// Largest exponent produced for a length of at most `2^64`.
pub const MAX_EXPONENT: u32 = 65 - LENGTH_MANTISSA_WIDTH;
/// Size of a compressed capability in memory, and of a tag granule.
pub const CAPABILITY_SIZE_BYTES: usize = 16;

const PERMS_SHIFT: u32 = 0;
const UPERMS_SHIFT: u32 = 12;
const OTYPE_SHIFT: u32 = 16;
const EXPONENT_SHIFT: u32 = 34;
const BASE_SHIFT: u32 = 40;
const LENGTH_SHIFT: u32 = 52;
const FLAGS_SHIFT: u32 = 63;

const PERMS_MASK: u64 = 0xFFF;
const UPERMS_MASK: u64 = 0xF;
const EXPONENT_MASK: u64 = 0x3F;
const BASE_MASK: u64 = (1 << MANTISSA_WIDTH) - 1;
const LENGTH_MASK: u64 = (1 << LENGTH_MANTISSA_WIDTH) - 1;

/// Smallest exponent whose scaled length mantissa can hold `length`.
#[must_use]
pub const fn exponent_for_length(length: u128) -> u32 {
    let bit_length = u128::BITS - length.leading_zeros();
    bit_length.saturating_sub(LENGTH_MANTISSA_WIDTH)
}

/// Returns `true` when `(base, length)` has an exact encoding.
#[must_use]
pub const fn bounds_exact(base: u64, length: u128) -> bool {
    if (base as u128) + length > ADDRESS_SPACE_TOP {
        return false;
    }
    let alignment_mask = (1_u128 << exponent_for_length(length)) - 1;
    (base as u128) & alignment_mask == 0 && length & alignment_mask == 0
}

/// Half-open window of cursors representable with `(base, length)`, clamped
/// to the address space.
#[must_use]
#[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
pub const fn representable_window(base: u64, length: u128) -> (u128, u128) {
    let exponent = exponent_for_length(length);
    if exponent + MANTISSA_WIDTH >= 64 {
        return (0, ADDRESS_SPACE_TOP);
    }
    let window = 1_i128 << (exponent + MANTISSA_WIDTH);
    let lower = base as i128 - window / 4;
    let upper = lower + window;
    let lower = if lower < 0 { 0 } else { lower as u128 };
    let upper = if upper > ADDRESS_SPACE_TOP as i128 {
        ADDRESS_SPACE_TOP
    } else {
        upper as u128
    };
    (lower, upper)
}

/// Returns `true` when `(base, length, cursor)` is exactly encodable.
#[must_use]
pub const fn is_representable(base: u64, length: u128, cursor: u64) -> bool {
    if !bounds_exact(base, length) {
        return false;
    }
    let (lower, upper) = representable_window(base, length);
    (cursor as u128) >= lower && (cursor as u128) < upper
}

/// Returns `true` when `cap` with `new_cursor` is representable once sealed.
///
/// A sealed encoding has no room for an out-of-bounds cursor, so the window
/// shrinks to `[base, top]`.
#[must_use]
pub const fn is_representable_when_sealing(cap: &CapabilityRegister, new_cursor: u64) -> bool {
    is_representable(cap.base(), cap.length_full(), new_cursor)
        && new_cursor >= cap.base()
        && (new_cursor as u128) <= cap.top()
}

/// Encodes a capability's metadata and cursor into its memory image.
///
/// Total over all values. The image decodes back to the same value for
/// every representable capability; for other (necessarily untagged) values
/// the bounds are approximated.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn compress(cap: &CapabilityRegister) -> [u8; CAPABILITY_SIZE_BYTES] {
    let length = cap.length_full();
    let exponent = exponent_for_length(length);
    let base_mantissa = (u128::from(cap.base()) >> exponent) as u64 & BASE_MASK;
    let length_mantissa = (length >> exponent).min(u128::from(LENGTH_MASK)) as u64;

    let metadata = ((u64::from(cap.hardware_permissions().bits()) & PERMS_MASK) << PERMS_SHIFT)
        | ((u64::from(cap.software_permissions().bits()) & UPERMS_MASK) << UPERMS_SHIFT)
        | ((cap.otype().to_raw() & MAX_REPRESENTABLE_OTYPE) << OTYPE_SHIFT)
        | (u64::from(exponent) << EXPONENT_SHIFT)
        | (base_mantissa << BASE_SHIFT)
        | (length_mantissa << LENGTH_SHIFT)
        | (u64::from(cap.flags() & 1) << FLAGS_SHIFT);

    let mut image = [0_u8; CAPABILITY_SIZE_BYTES];
    image[..8].copy_from_slice(&metadata.to_be_bytes());
    image[8..].copy_from_slice(&cap.cursor().to_be_bytes());
    image
}

/// Decodes a memory image with its tag. Total over arbitrary bytes.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss
)]
pub fn decompress(image: &[u8; CAPABILITY_SIZE_BYTES], tag: bool) -> CapabilityRegister {
    let mut metadata_bytes = [0_u8; 8];
    metadata_bytes.copy_from_slice(&image[..8]);
    let mut cursor_bytes = [0_u8; 8];
    cursor_bytes.copy_from_slice(&image[8..]);
    let metadata = u64::from_be_bytes(metadata_bytes);
    let cursor = u64::from_be_bytes(cursor_bytes);

    let exponent = (((metadata >> EXPONENT_SHIFT) & EXPONENT_MASK) as u32).min(MAX_EXPONENT);
    let base_mantissa = u128::from((metadata >> BASE_SHIFT) & BASE_MASK);
    let length = u128::from((metadata >> LENGTH_SHIFT) & LENGTH_MASK) << exponent;

    let base = if exponent + MANTISSA_WIDTH >= 64 {
        base_mantissa << exponent
    } else {
        let window = 1_i128 << (exponent + MANTISSA_WIDTH);
        let lowest = i128::from(cursor) - 3 * (window / 4) + 1;
        let residue = (base_mantissa << exponent) as i128;
        let candidate = lowest + (residue - lowest).rem_euclid(window);
        candidate.clamp(0, i128::from(u64::MAX)) as u128
    };
    let base = base.min(u128::from(u64::MAX)) as u64;
    let top = (u128::from(base) + length).min(ADDRESS_SPACE_TOP);

    let permissions = PermissionSet::new(
        HardwarePermissions::from_bits_truncate(((metadata >> PERMS_SHIFT) & PERMS_MASK) as u32),
        SoftwarePermissions::from_bits_truncate(((metadata >> UPERMS_SHIFT) & UPERMS_MASK) as u32),
    );
    let otype = ObjectType::from_raw((metadata >> OTYPE_SHIFT) & MAX_REPRESENTABLE_OTYPE);
    let flags = ((metadata >> FLAGS_SHIFT) & 1) as u8;

    CapabilityRegister::from_parts(tag, base, top, cursor, permissions, otype, flags)
}
