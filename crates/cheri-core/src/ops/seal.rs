//! Type and permission assertions, sealing and unsealing.
//!
//! Every operation evaluates its checks in architectural order and returns
//! the first failure; the destination register is written only once all
//! checks have passed.

use super::general;
use crate::compression::is_representable_when_sealing;
use crate::{
    CapRegIndex, CapabilityFault, CapabilityRegister, ExecutionContext, FaultCode,
    HardwarePermissions, ObjectType, PermissionSet, MAX_NON_RESERVED_OTYPE,
};

/// Authorizer cursor that makes a conditional seal copy its source unchanged.
pub const CONDITIONAL_SEAL_SKIP: u64 = u64::MAX;

/// `CCheckType`: asserts that `cs` and `cb` are sealed with the same
/// software object type.
///
/// # Errors
///
/// `TagViolation(cs)`, `TagViolation(cb)`, `SealViolation(cs)`,
/// `SealViolation(cb)`, then `TypeViolation(cs)` when the types differ or
/// are reserved.
pub const fn check_type(
    ctx: &ExecutionContext,
    cs: CapRegIndex,
    cb: CapRegIndex,
) -> Result<(), CapabilityFault> {
    let source = ctx.reg(cs);
    let other = ctx.reg(cb);
    if !source.tag() {
        Err(general(FaultCode::TagViolation, cs))
    } else if !other.tag() {
        Err(general(FaultCode::TagViolation, cb))
    } else if source.is_unsealed() {
        Err(general(FaultCode::SealViolation, cs))
    } else if other.is_unsealed() {
        Err(general(FaultCode::SealViolation, cb))
    } else if source.otype().to_raw() != other.otype().to_raw()
        || source.otype().to_raw() > MAX_NON_RESERVED_OTYPE
    {
        Err(general(FaultCode::TypeViolation, cs))
    } else {
        Ok(())
    }
}

/// `CCheckPerm`: asserts that `cs` holds every permission in `requested`.
///
/// `requested` uses the flat permission word layout. Bits above the
/// software permissions always fail; the unused bits between the hardware
/// and software fields are ignored.
///
/// # Errors
///
/// `TagViolation(cs)`, then `UserDefViolation(cs)`.
pub const fn check_permission(
    ctx: &ExecutionContext,
    cs: CapRegIndex,
    requested: u64,
) -> Result<(), CapabilityFault> {
    let source = ctx.reg(cs);
    if !source.tag() {
        Err(general(FaultCode::TagViolation, cs))
    } else if !PermissionSet::from_word(requested).is_subset_of(source.permissions())
        || PermissionSet::word_has_undefined_high_bits(requested)
    {
        Err(general(FaultCode::UserDefViolation, cs))
    } else {
        Ok(())
    }
}

fn sealed_result(
    source: &CapabilityRegister,
    authority: &CapabilityRegister,
    cs: CapRegIndex,
    ct: CapRegIndex,
    conditional: bool,
) -> Result<CapabilityRegister, CapabilityFault> {
    let otype = authority.cursor();
    if !source.tag() {
        return Err(general(FaultCode::TagViolation, cs));
    }
    if !authority.tag() {
        return if conditional {
            Ok(*source)
        } else {
            Err(general(FaultCode::TagViolation, ct))
        };
    }
    if conditional && otype == CONDITIONAL_SEAL_SKIP {
        return Ok(*source);
    }
    if source.is_sealed() {
        return Err(general(FaultCode::SealViolation, cs));
    }
    if authority.is_sealed() {
        return Err(general(FaultCode::SealViolation, ct));
    }
    if !authority.has_permissions(HardwarePermissions::SEAL) {
        return Err(general(FaultCode::PermitSealViolation, ct));
    }
    if !authority.in_bounds(otype, 1) || otype > MAX_NON_RESERVED_OTYPE {
        return Err(general(FaultCode::LengthViolation, ct));
    }
    if !is_representable_when_sealing(source, source.cursor()) {
        return Err(general(FaultCode::InexactBounds, cs));
    }
    ObjectType::sealed_with_type(otype)
        .map(|sealed| source.with_otype(sealed))
        .map_err(|_| general(FaultCode::LengthViolation, ct))
}

/// `CSeal`: `cd = cs` sealed with the object type `ct.cursor`.
///
/// # Errors
///
/// `TagViolation(cs)`, `TagViolation(ct)`, `SealViolation(cs)`,
/// `SealViolation(ct)`, `PermitSealViolation(ct)`, `LengthViolation(ct)`
/// (cursor out of bounds or above the non-reserved range), then
/// `InexactBounds(cs)`.
pub fn seal(
    ctx: &mut ExecutionContext,
    cd: CapRegIndex,
    cs: CapRegIndex,
    ct: CapRegIndex,
) -> Result<(), CapabilityFault> {
    let result = sealed_result(ctx.reg(cs), ctx.reg(ct), cs, ct, false)?;
    ctx.set_reg(cd, result);
    Ok(())
}

/// `CCSeal`: like [`seal`], except that an untagged `ct` or a `ct` whose
/// cursor is [`CONDITIONAL_SEAL_SKIP`] copies `cs` to `cd` unchanged.
///
/// The untagged-authority bypass is evaluated before the skip sentinel.
///
/// # Errors
///
/// As [`seal`], minus `TagViolation(ct)`.
pub fn conditional_seal(
    ctx: &mut ExecutionContext,
    cd: CapRegIndex,
    cs: CapRegIndex,
    ct: CapRegIndex,
) -> Result<(), CapabilityFault> {
    let result = sealed_result(ctx.reg(cs), ctx.reg(ct), cs, ct, true)?;
    ctx.set_reg(cd, result);
    Ok(())
}

/// `CUnseal`: `cd = cs` unsealed with the authority of `ct`.
///
/// The result keeps `GLOBAL` only when both `cs` and `ct` carry it.
///
/// # Errors
///
/// `TagViolation(cs)`, `TagViolation(ct)`, `SealViolation(cs)`,
/// `SealViolation(ct)`, `TypeViolation(cs)` for reserved object types,
/// `TypeViolation(ct)` when `ct.cursor` differs from the object type,
/// `PermitUnsealViolation(ct)`, then `LengthViolation(ct)`.
pub fn unseal(
    ctx: &mut ExecutionContext,
    cd: CapRegIndex,
    cs: CapRegIndex,
    ct: CapRegIndex,
) -> Result<(), CapabilityFault> {
    let source = ctx.reg(cs);
    let authority = ctx.reg(ct);
    let otype = authority.cursor();

    let fault = if !source.tag() {
        Some(general(FaultCode::TagViolation, cs))
    } else if !authority.tag() {
        Some(general(FaultCode::TagViolation, ct))
    } else if source.is_unsealed() {
        Some(general(FaultCode::SealViolation, cs))
    } else if authority.is_sealed() {
        Some(general(FaultCode::SealViolation, ct))
    } else if !source.is_sealed_with_type() {
        Some(general(FaultCode::TypeViolation, cs))
    } else if otype != source.otype().to_raw() {
        Some(general(FaultCode::TypeViolation, ct))
    } else if !authority.has_permissions(HardwarePermissions::UNSEAL) {
        Some(general(FaultCode::PermitUnsealViolation, ct))
    } else if !authority.in_bounds(otype, 1) || otype >= MAX_NON_RESERVED_OTYPE {
        Some(general(FaultCode::LengthViolation, ct))
    } else {
        None
    };
    if let Some(fault) = fault {
        return Err(fault);
    }

    let global = source.has_permissions(HardwarePermissions::GLOBAL)
        && authority.has_permissions(HardwarePermissions::GLOBAL);
    let result = source.with_otype(ObjectType::Unsealed).with_global(global);
    ctx.set_reg(cd, result);
    Ok(())
}
