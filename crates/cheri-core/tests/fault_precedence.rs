//! First-failing-check precedence grids for the faulting operations.

#![allow(clippy::pedantic, clippy::nursery)]

use bitflags as _;
use cheri_core::{
    check_type, conditional_seal, seal, store_capability, unseal, validate_access, CapRegIndex,
    CapabilityFault, CapabilityMemory, CapabilityRegister, ExecutionContext, FaultCode, HardwarePermissions,
    PermissionSet, RegisterId, TaggedMemory, ADDRESS_SPACE_TOP, CONDITIONAL_SEAL_SKIP,
    MAX_NON_RESERVED_OTYPE,
};
use proptest as _;
use rstest::rstest;
#[cfg(feature = "serde")]
use serde as _;
use spin as _;
use thiserror as _;
use tracing as _;

const CD: u8 = 3;
const CS: u8 = 1;
const CT: u8 = 2;

fn reg(bits: u8) -> CapRegIndex {
    CapRegIndex::from_u5(bits).expect("valid register")
}

fn fault(cause: FaultCode, bits: u8) -> CapabilityFault {
    CapabilityFault::new(cause, RegisterId::General(reg(bits)))
}

fn cap(base: u64, length: u128, cursor: u64, perms: HardwarePermissions) -> CapabilityRegister {
    CapabilityRegister::new(base, length, cursor, PermissionSet::from(perms))
        .expect("representable")
}

fn data() -> CapabilityRegister {
    cap(
        0x1000,
        0x100,
        0x1000,
        HardwarePermissions::GLOBAL | HardwarePermissions::LOAD | HardwarePermissions::STORE,
    )
}

fn authority(cursor: u64) -> CapabilityRegister {
    cap(
        0,
        0x1000,
        cursor,
        HardwarePermissions::SEAL | HardwarePermissions::UNSEAL | HardwarePermissions::GLOBAL,
    )
}

/// `data()` sealed with `otype` through a root-derived authority.
fn sealed(otype: u64) -> CapabilityRegister {
    let mut ctx = ExecutionContext::default();
    ctx.set_reg(reg(CS), data());
    ctx.set_reg(reg(CT), CapabilityRegister::root().with_cursor(otype));
    seal(&mut ctx, reg(CD), reg(CS), reg(CT)).expect("seal");
    *ctx.reg(reg(CD))
}

fn context(cs: CapabilityRegister, ct: CapabilityRegister) -> ExecutionContext {
    let mut ctx = ExecutionContext::default();
    ctx.set_reg(reg(CS), cs);
    ctx.set_reg(reg(CT), ct);
    ctx
}

#[rstest]
#[case::untagged_source(
    data().with_tag_cleared(),
    authority(42),
    Some(fault(FaultCode::TagViolation, CS))
)]
#[case::untagged_authority(
    data(),
    authority(42).with_tag_cleared(),
    Some(fault(FaultCode::TagViolation, CT))
)]
#[case::sealed_source(sealed(7), authority(0x2000), Some(fault(FaultCode::SealViolation, CS)))]
#[case::sealed_source_bad_authority(
    sealed(7),
    cap(0, 0x10, 0x20, HardwarePermissions::LOAD),
    Some(fault(FaultCode::SealViolation, CS))
)]
#[case::sealed_authority(data(), sealed(7), Some(fault(FaultCode::SealViolation, CT)))]
#[case::missing_seal_permission(
    data(),
    cap(0, 0x1000, 42, HardwarePermissions::UNSEAL),
    Some(fault(FaultCode::PermitSealViolation, CT))
)]
#[case::cursor_out_of_bounds(
    data(),
    authority(0x1000),
    Some(fault(FaultCode::LengthViolation, CT))
)]
#[case::cursor_above_object_types(
    data(),
    CapabilityRegister::root().with_cursor(MAX_NON_RESERVED_OTYPE + 1),
    Some(fault(FaultCode::LengthViolation, CT))
)]
#[case::inexact_when_sealed(
    cap(0x1000, 0x100, 0x1200, HardwarePermissions::LOAD),
    authority(42),
    Some(fault(FaultCode::InexactBounds, CS))
)]
#[case::sealed(data(), authority(42), None)]
fn seal_precedence(
    #[case] cs: CapabilityRegister,
    #[case] ct: CapabilityRegister,
    #[case] expected: Option<CapabilityFault>,
) {
    let mut ctx = context(cs, ct);
    let before = *ctx.reg(reg(CD));
    let result = seal(&mut ctx, reg(CD), reg(CS), reg(CT));
    assert_eq!(result.err(), expected);
    if expected.is_some() {
        assert_eq!(*ctx.reg(reg(CD)), before);
    } else {
        assert_eq!(ctx.reg(reg(CD)).otype().to_raw(), 42);
    }
}

#[rstest]
#[case::untagged_authority_copies(data(), authority(42).with_tag_cleared(), Ok(false))]
#[case::skip_sentinel_copies(
    data(),
    CapabilityRegister::root().with_cursor(CONDITIONAL_SEAL_SKIP),
    Ok(false)
)]
#[case::untagged_authority_beats_sealed_source(
    sealed(7),
    authority(42).with_tag_cleared(),
    Ok(true)
)]
#[case::skip_sentinel_beats_sealed_source(
    sealed(7),
    CapabilityRegister::root().with_cursor(CONDITIONAL_SEAL_SKIP),
    Ok(true)
)]
#[case::untagged_source_still_faults(
    data().with_tag_cleared(),
    authority(42).with_tag_cleared(),
    Err(fault(FaultCode::TagViolation, CS))
)]
#[case::sealed_source_faults(sealed(7), authority(42), Err(fault(FaultCode::SealViolation, CS)))]
fn conditional_seal_bypasses(
    #[case] cs: CapabilityRegister,
    #[case] ct: CapabilityRegister,
    #[case] expected: Result<bool, CapabilityFault>,
) {
    let mut ctx = context(cs, ct);
    match (conditional_seal(&mut ctx, reg(CD), reg(CS), reg(CT)), expected) {
        (Ok(()), Ok(sealed)) => {
            assert_eq!(*ctx.reg(reg(CD)), cs);
            assert_eq!(ctx.reg(reg(CD)).is_sealed(), sealed);
        }
        (Err(actual), Err(expected)) => assert_eq!(actual, expected),
        (actual, expected) => panic!("got {actual:?}, expected {expected:?}"),
    }
}

#[rstest]
#[case::untagged_source(
    sealed(42).with_tag_cleared(),
    authority(42),
    Some(fault(FaultCode::TagViolation, CS))
)]
#[case::untagged_authority(
    sealed(42),
    authority(42).with_tag_cleared(),
    Some(fault(FaultCode::TagViolation, CT))
)]
#[case::unsealed_source(data(), authority(42), Some(fault(FaultCode::SealViolation, CS)))]
#[case::sealed_authority(sealed(42), sealed(42), Some(fault(FaultCode::SealViolation, CT)))]
#[case::sentry_source(
    data().sealed_entry().expect("sentry"),
    authority(42),
    Some(fault(FaultCode::TypeViolation, CS))
)]
#[case::type_mismatch(sealed(42), authority(43), Some(fault(FaultCode::TypeViolation, CT)))]
#[case::missing_unseal_permission(
    sealed(42),
    cap(0, 0x1000, 42, HardwarePermissions::SEAL),
    Some(fault(FaultCode::PermitUnsealViolation, CT))
)]
#[case::cursor_out_of_bounds(
    sealed(42),
    cap(0, 42, 42, HardwarePermissions::UNSEAL),
    Some(fault(FaultCode::LengthViolation, CT))
)]
#[case::maximum_object_type(
    sealed(MAX_NON_RESERVED_OTYPE),
    CapabilityRegister::root().with_cursor(MAX_NON_RESERVED_OTYPE),
    Some(fault(FaultCode::LengthViolation, CT))
)]
#[case::unsealed(sealed(42), authority(42), None)]
fn unseal_precedence(
    #[case] cs: CapabilityRegister,
    #[case] ct: CapabilityRegister,
    #[case] expected: Option<CapabilityFault>,
) {
    let mut ctx = context(cs, ct);
    let result = unseal(&mut ctx, reg(CD), reg(CS), reg(CT));
    assert_eq!(result.err(), expected);
    if expected.is_none() {
        assert_eq!(*ctx.reg(reg(CD)), data());
    } else {
        assert_eq!(*ctx.reg(reg(CD)), CapabilityRegister::null());
    }
}

#[rstest]
#[case::both_untagged(
    data().with_tag_cleared(),
    data().with_tag_cleared(),
    Some(fault(FaultCode::TagViolation, CS))
)]
#[case::untagged_other_beats_unsealed_source(
    data(),
    data().with_tag_cleared(),
    Some(fault(FaultCode::TagViolation, CT))
)]
#[case::unsealed_source(data(), sealed(7), Some(fault(FaultCode::SealViolation, CS)))]
#[case::unsealed_other(sealed(7), data(), Some(fault(FaultCode::SealViolation, CT)))]
#[case::type_mismatch(sealed(7), sealed(8), Some(fault(FaultCode::TypeViolation, CS)))]
#[case::reserved_types_never_match(
    data().sealed_entry().expect("sentry"),
    data().sealed_entry().expect("sentry"),
    Some(fault(FaultCode::TypeViolation, CS))
)]
#[case::same_type(sealed(7), sealed(7), None)]
fn check_type_precedence(
    #[case] cs: CapabilityRegister,
    #[case] cb: CapabilityRegister,
    #[case] expected: Option<CapabilityFault>,
) {
    let ctx = context(cs, cb);
    assert_eq!(check_type(&ctx, reg(CS), reg(CT)).err(), expected);
}

#[rstest]
#[case::untagged(
    data().with_tag_cleared(),
    0x1000,
    4,
    HardwarePermissions::LOAD,
    Some(FaultCode::TagViolation)
)]
#[case::sealed(sealed(5), 0x1000, 4, HardwarePermissions::LOAD, Some(FaultCode::SealViolation))]
#[case::missing_load(
    cap(0x1000, 0x100, 0x1000, HardwarePermissions::STORE),
    0x1000,
    4,
    HardwarePermissions::LOAD,
    Some(FaultCode::PermitLoadViolation)
)]
#[case::store_before_load(
    cap(0x1000, 0x100, 0x1000, HardwarePermissions::empty()),
    0x1000,
    4,
    HardwarePermissions::LOAD | HardwarePermissions::STORE,
    Some(FaultCode::PermitStoreViolation)
)]
#[case::execute_first(
    cap(0x1000, 0x100, 0x1000, HardwarePermissions::empty()),
    0x1000,
    4,
    HardwarePermissions::LOAD | HardwarePermissions::EXECUTE,
    Some(FaultCode::PermitExecuteViolation)
)]
#[case::missing_load_capability(
    data(),
    0x1000,
    16,
    HardwarePermissions::LOAD | HardwarePermissions::LOAD_CAPABILITY,
    Some(FaultCode::PermitLoadCapViolation)
)]
#[case::permission_before_bounds(
    cap(0x1000, 0x100, 0x1000, HardwarePermissions::STORE),
    0x9000,
    4,
    HardwarePermissions::LOAD,
    Some(FaultCode::PermitLoadViolation)
)]
#[case::below_base(data(), 0xFFF, 1, HardwarePermissions::LOAD, Some(FaultCode::LengthViolation))]
#[case::crosses_top(data(), 0x10FE, 4, HardwarePermissions::LOAD, Some(FaultCode::LengthViolation))]
#[case::last_byte(data(), 0x10FF, 1, HardwarePermissions::LOAD, None)]
#[case::wraps_address_space(
    CapabilityRegister::root(),
    u64::MAX,
    2,
    HardwarePermissions::LOAD,
    Some(FaultCode::LengthViolation)
)]
#[case::final_address_byte(
    CapabilityRegister::root(),
    u64::MAX,
    1,
    HardwarePermissions::LOAD,
    None
)]
fn validate_access_precedence(
    #[case] cap: CapabilityRegister,
    #[case] address: u64,
    #[case] len: u64,
    #[case] required: HardwarePermissions,
    #[case] expected: Option<FaultCode>,
) {
    let register = RegisterId::General(reg(9));
    let result = validate_access(&cap, register, address, len, required);
    assert_eq!(result.err().map(|fault| fault.cause), expected);
    if let Err(fault) = result {
        assert_eq!(fault.register, Some(register));
        assert_eq!(fault.address, Some(address));
    }
}

#[rstest]
#[case::untagged_authority(
    CapabilityRegister::root().with_tag_cleared(),
    data(),
    0,
    Some(FaultCode::TagViolation)
)]
#[case::sealed_authority(sealed(3), data(), 0, Some(FaultCode::SealViolation))]
#[case::missing_store(
    cap(0, 0x1000, 0, HardwarePermissions::LOAD),
    data(),
    0,
    Some(FaultCode::PermitStoreViolation)
)]
#[case::missing_store_capability(
    cap(0, 0x1000, 0, HardwarePermissions::STORE),
    data(),
    0,
    Some(FaultCode::PermitStoreCapViolation)
)]
#[case::local_value(
    cap(0, 0x1000, 0, HardwarePermissions::STORE | HardwarePermissions::STORE_CAPABILITY),
    cap(0x1000, 0x100, 0x1000, HardwarePermissions::LOAD),
    0,
    Some(FaultCode::PermitStoreLocalCapViolation)
)]
#[case::store_local_before_bounds(
    cap(0, 0x1000, 0, HardwarePermissions::STORE | HardwarePermissions::STORE_CAPABILITY),
    cap(0x1000, 0x100, 0x1000, HardwarePermissions::LOAD),
    0x2000,
    Some(FaultCode::PermitStoreLocalCapViolation)
)]
#[case::out_of_bounds(
    cap(0, 0x1000, 0, HardwarePermissions::STORE | HardwarePermissions::STORE_CAPABILITY),
    data(),
    0xFF8,
    Some(FaultCode::LengthViolation)
)]
#[case::bounds_before_alignment(
    cap(0, 0x1000, 0, HardwarePermissions::STORE | HardwarePermissions::STORE_CAPABILITY),
    data(),
    0x1008,
    Some(FaultCode::LengthViolation)
)]
#[case::misaligned(
    cap(0, 0x1000, 0, HardwarePermissions::STORE | HardwarePermissions::STORE_CAPABILITY),
    data(),
    0x8,
    Some(FaultCode::AddressErrorStore)
)]
#[case::stored(
    cap(0, 0x1000, 0, HardwarePermissions::STORE | HardwarePermissions::STORE_CAPABILITY),
    data(),
    0x10,
    None
)]
fn store_capability_precedence(
    #[case] cb: CapabilityRegister,
    #[case] value: CapabilityRegister,
    #[case] offset: u64,
    #[case] expected: Option<FaultCode>,
) {
    let memory = TaggedMemory::new();
    let ctx = context(value, cb);
    let result = store_capability(&ctx, &memory, reg(CS), reg(CT), offset);
    assert_eq!(result.err().map(|fault| fault.cause), expected);
    let address = cb.cursor().wrapping_add(offset);
    assert_eq!(memory.load_tag(address & !0xF), expected.is_none());
    if expected.is_none() {
        assert_eq!(memory.load_capability(address), value);
    }
}

#[test]
fn root_spans_the_whole_address_space() {
    assert_eq!(CapabilityRegister::root().top(), ADDRESS_SPACE_TOP);
}
