//! Register-to-register derivation: permission narrowing, tag clearing, moves.

use super::general;
use crate::{CapRegIndex, CapabilityFault, ExecutionContext, FaultCode, PermissionSet};

/// `CAndPerm`: `cd = cb` with both permission sets ANDed against `mask`.
///
/// `mask` uses the flat permission word layout; only defined bits matter.
///
/// # Errors
///
/// `TagViolation(cb)`, then `SealViolation(cb)`.
pub fn and_permissions(
    ctx: &mut ExecutionContext,
    cd: CapRegIndex,
    cb: CapRegIndex,
    mask: u64,
) -> Result<(), CapabilityFault> {
    let source = ctx.reg(cb);
    if !source.tag() {
        return Err(general(FaultCode::TagViolation, cb));
    }
    if source.is_sealed() {
        return Err(general(FaultCode::SealViolation, cb));
    }
    let result = source.with_permissions_narrowed(PermissionSet::from_word(mask));
    ctx.set_reg(cd, result);
    Ok(())
}

/// `CClearTag`: `cd = cb` with the tag cleared.
pub const fn clear_tag(ctx: &mut ExecutionContext, cd: CapRegIndex, cb: CapRegIndex) {
    let result = ctx.reg(cb).with_tag_cleared();
    ctx.set_reg(cd, result);
}

/// `CMove`: `cd = cb`.
pub const fn move_capability(ctx: &mut ExecutionContext, cd: CapRegIndex, cb: CapRegIndex) {
    let value = *ctx.reg(cb);
    ctx.set_reg(cd, value);
}

#[cfg(test)]
mod tests {
    use super::{and_permissions, clear_tag, move_capability};
    use crate::{
        CapRegIndex, CapabilityFault, CapabilityRegister, ExecutionContext, FaultCode,
        HardwarePermissions, ObjectType, PermissionSet, RegisterId, SoftwarePermissions,
    };

    fn reg(bits: u8) -> CapRegIndex {
        CapRegIndex::from_u5(bits).expect("valid register")
    }

    #[test]
    fn and_permissions_only_removes_authority() {
        let mut ctx = ExecutionContext::default();
        ctx.set_reg(reg(1), CapabilityRegister::root());
        let mask = PermissionSet::new(
            HardwarePermissions::LOAD | HardwarePermissions::STORE,
            SoftwarePermissions::USER1,
        );
        and_permissions(&mut ctx, reg(2), reg(1), mask.to_word()).expect("narrow");
        assert_eq!(ctx.reg(reg(2)).permissions(), mask);

        and_permissions(&mut ctx, reg(3), reg(2), u64::MAX).expect("narrow");
        assert_eq!(ctx.reg(reg(3)).permissions(), mask);
    }

    #[test]
    fn and_permissions_rejects_untagged_then_sealed() {
        let mut ctx = ExecutionContext::default();
        let sealed = CapabilityRegister::root().with_otype(ObjectType::SealedWithType(5));
        ctx.set_reg(reg(1), sealed);
        ctx.set_reg(reg(2), sealed.with_tag_cleared());
        ctx.set_reg(reg(3), CapabilityRegister::root());

        assert_eq!(
            and_permissions(&mut ctx, reg(3), reg(1), 0),
            Err(CapabilityFault::new(
                FaultCode::SealViolation,
                RegisterId::General(reg(1))
            ))
        );
        assert_eq!(
            and_permissions(&mut ctx, reg(3), reg(2), 0),
            Err(CapabilityFault::new(
                FaultCode::TagViolation,
                RegisterId::General(reg(2))
            ))
        );
        assert_eq!(*ctx.reg(reg(3)), CapabilityRegister::root());
    }

    #[test]
    fn clear_tag_and_move_copy_fields() {
        let mut ctx = ExecutionContext::default();
        let cap = CapabilityRegister::root().with_cursor(0x55);
        ctx.set_reg(reg(1), cap);

        clear_tag(&mut ctx, reg(2), reg(1));
        assert_eq!(*ctx.reg(reg(2)), cap.with_tag_cleared());

        move_capability(&mut ctx, reg(3), reg(1));
        assert_eq!(*ctx.reg(reg(3)), cap);

        move_capability(&mut ctx, reg(1), reg(1));
        assert_eq!(*ctx.reg(reg(1)), cap);
    }
}
