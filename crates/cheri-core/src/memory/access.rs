//! Bounds and permission checks for capability-relative and implicit
//! (`DDC`/`PCC`-relative) memory accesses.

use crate::{
    CapabilityFault, CapabilityRegister, ExecutionContext, FaultCode, HardwarePermissions,
    RegisterId,
};

/// Direction of a data access, used to pick the address-error cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessKind {
    /// Data read.
    Load,
    /// Data write.
    Store,
}

/// Cause reported when `missing` (non-empty) permissions are absent.
///
/// The most specific architectural cause wins, in the order execute, store,
/// load, load-capability, store-capability, store-local, seal, unseal; any
/// other missing bit maps to [`FaultCode::UserDefViolation`].
#[must_use]
pub const fn missing_permission_cause(missing: HardwarePermissions) -> FaultCode {
    const PRIORITY: [(HardwarePermissions, FaultCode); 8] = [
        (HardwarePermissions::EXECUTE, FaultCode::PermitExecuteViolation),
        (HardwarePermissions::STORE, FaultCode::PermitStoreViolation),
        (HardwarePermissions::LOAD, FaultCode::PermitLoadViolation),
        (HardwarePermissions::LOAD_CAPABILITY, FaultCode::PermitLoadCapViolation),
        (HardwarePermissions::STORE_CAPABILITY, FaultCode::PermitStoreCapViolation),
        (
            HardwarePermissions::STORE_LOCAL_CAPABILITY,
            FaultCode::PermitStoreLocalCapViolation,
        ),
        (HardwarePermissions::SEAL, FaultCode::PermitSealViolation),
        (HardwarePermissions::UNSEAL, FaultCode::PermitUnsealViolation),
    ];
    let mut index = 0;
    while index < PRIORITY.len() {
        let (permission, cause) = PRIORITY[index];
        if missing.contains(permission) {
            return cause;
        }
        index += 1;
    }
    FaultCode::UserDefViolation
}

/// Validates an access of `len` bytes at `address` through `cap`.
///
/// Checks run in order: tag, seal, permissions, bounds. Address arithmetic is
/// exact, so a span whose end passes `2^64` is out of bounds. Pure: the
/// result depends only on the arguments.
///
/// # Errors
///
/// Returns the first failing check as a fault naming `register` and carrying
/// `address`.
pub const fn validate_access(
    cap: &CapabilityRegister,
    register: RegisterId,
    address: u64,
    len: u64,
    required: HardwarePermissions,
) -> Result<(), CapabilityFault> {
    let cause = if !cap.tag() {
        FaultCode::TagViolation
    } else if cap.is_sealed() {
        FaultCode::SealViolation
    } else if !cap.has_permissions(required) {
        missing_permission_cause(required.difference(cap.hardware_permissions()))
    } else if !cap.in_bounds(address, len) {
        FaultCode::LengthViolation
    } else {
        return Ok(());
    };
    Err(CapabilityFault::new(cause, register).at(address))
}

/// Validates alignment of an access of `size` bytes (a power of two).
///
/// # Errors
///
/// Returns [`FaultCode::AddressErrorLoad`] or [`FaultCode::AddressErrorStore`]
/// with the faulting address when `address` is not a multiple of `size`.
pub const fn check_alignment(
    address: u64,
    size: u64,
    kind: AccessKind,
) -> Result<(), CapabilityFault> {
    if size == 0 || address & (size - 1) == 0 {
        return Ok(());
    }
    let cause = match kind {
        AccessKind::Load => FaultCode::AddressErrorLoad,
        AccessKind::Store => FaultCode::AddressErrorStore,
    };
    Err(CapabilityFault::address_error(cause, address))
}

const fn check_implicit(
    cap: &CapabilityRegister,
    register: RegisterId,
    offset: u64,
    len: u64,
    required: HardwarePermissions,
) -> Result<u64, CapabilityFault> {
    let address = cap.cursor().wrapping_add(offset);
    match validate_access(cap, register, address, len, required) {
        Ok(()) => Ok(address),
        Err(fault) => Err(fault),
    }
}

/// Checks a legacy load of `len` bytes at `DDC.cursor + offset`.
///
/// # Errors
///
/// Returns the [`validate_access`] fault, naming [`RegisterId::Ddc`].
pub const fn check_ddc_load(
    ctx: &ExecutionContext,
    offset: u64,
    len: u64,
) -> Result<u64, CapabilityFault> {
    check_implicit(ctx.ddc(), RegisterId::Ddc, offset, len, HardwarePermissions::LOAD)
}

/// Checks a legacy store of `len` bytes at `DDC.cursor + offset`.
///
/// # Errors
///
/// Returns the [`validate_access`] fault, naming [`RegisterId::Ddc`].
pub const fn check_ddc_store(
    ctx: &ExecutionContext,
    offset: u64,
    len: u64,
) -> Result<u64, CapabilityFault> {
    check_implicit(ctx.ddc(), RegisterId::Ddc, offset, len, HardwarePermissions::STORE)
}

/// Checks a legacy read-modify-write of `len` bytes at `DDC.cursor + offset`.
///
/// # Errors
///
/// Returns the [`validate_access`] fault, naming [`RegisterId::Ddc`].
pub const fn check_ddc_rmw(
    ctx: &ExecutionContext,
    offset: u64,
    len: u64,
) -> Result<u64, CapabilityFault> {
    check_implicit(
        ctx.ddc(),
        RegisterId::Ddc,
        offset,
        len,
        HardwarePermissions::LOAD.union(HardwarePermissions::STORE),
    )
}

/// Checks a `PCC`-relative load of `len` bytes at `PCC.cursor + offset`.
///
/// # Errors
///
/// Returns the [`validate_access`] fault, naming [`RegisterId::Pcc`].
pub const fn check_pcc_load(
    ctx: &ExecutionContext,
    offset: u64,
    len: u64,
) -> Result<u64, CapabilityFault> {
    check_implicit(ctx.pcc(), RegisterId::Pcc, offset, len, HardwarePermissions::LOAD)
}

/// Checks an instruction fetch of `len` bytes at `PCC.cursor`.
///
/// Fetch faults are raised before the instruction is available.
///
/// # Errors
///
/// Returns the [`validate_access`] fault for `EXECUTE`, naming
/// [`RegisterId::Pcc`] and marked with
/// [`CapabilityFault::before_retire`].
pub const fn check_pcc_fetch(ctx: &ExecutionContext, len: u64) -> Result<u64, CapabilityFault> {
    match check_implicit(ctx.pcc(), RegisterId::Pcc, 0, len, HardwarePermissions::EXECUTE) {
        Ok(address) => Ok(address),
        Err(fault) => Err(fault.before_retire()),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        check_alignment, check_ddc_load, check_ddc_rmw, check_ddc_store, check_pcc_fetch,
        check_pcc_load, missing_permission_cause, validate_access, AccessKind,
    };
    use crate::{
        BootProfile, CapabilityFault, CapabilityRegister, CoreConfig, ExecutionContext, FaultCode,
        HardwarePermissions, ObjectType, PermissionSet, RegisterId,
    };

    fn load_only(base: u64, length: u128) -> CapabilityRegister {
        CapabilityRegister::new(base, length, base, PermissionSet::from(HardwarePermissions::LOAD))
            .expect("representable")
    }

    #[test]
    fn validate_access_accepts_in_bounds_permitted_access() {
        let cap = load_only(0x1000, 0x100);
        assert_eq!(
            validate_access(&cap, RegisterId::Ddc, 0x10F8, 8, HardwarePermissions::LOAD),
            Ok(())
        );
    }

    #[test]
    fn validate_access_reports_first_failing_check() {
        let cap = load_only(0x1000, 0x100);
        let untagged = cap.with_tag_cleared().with_otype(ObjectType::SealedWithType(1));
        let sealed = cap.with_otype(ObjectType::SealedWithType(1));

        let cause = |cap: &CapabilityRegister, addr, len, perms| {
            validate_access(cap, RegisterId::Ddc, addr, len, perms).map_err(|fault| fault.cause)
        };
        assert_eq!(
            cause(&untagged, 0, 0x10_000, HardwarePermissions::STORE),
            Err(FaultCode::TagViolation)
        );
        assert_eq!(
            cause(&sealed, 0, 0x10_000, HardwarePermissions::STORE),
            Err(FaultCode::SealViolation)
        );
        assert_eq!(
            cause(&cap, 0, 0x10_000, HardwarePermissions::STORE),
            Err(FaultCode::PermitStoreViolation)
        );
        assert_eq!(
            cause(&cap, 0x10FF, 2, HardwarePermissions::LOAD),
            Err(FaultCode::LengthViolation)
        );
    }

    #[test]
    fn faults_carry_register_and_address() {
        let cap = load_only(0x1000, 0x100);
        assert_eq!(
            validate_access(&cap, RegisterId::Pcc, 0x2000, 1, HardwarePermissions::LOAD),
            Err(CapabilityFault::new(FaultCode::LengthViolation, RegisterId::Pcc).at(0x2000))
        );
    }

    #[test]
    fn wrapping_span_is_out_of_bounds() {
        let root = CapabilityRegister::root();
        assert_eq!(
            validate_access(&root, RegisterId::Ddc, u64::MAX, 2, HardwarePermissions::LOAD)
                .map_err(|fault| fault.cause),
            Err(FaultCode::LengthViolation)
        );
    }

    #[test]
    fn missing_permission_priority() {
        assert_eq!(
            missing_permission_cause(HardwarePermissions::LOAD | HardwarePermissions::STORE),
            FaultCode::PermitStoreViolation
        );
        assert_eq!(
            missing_permission_cause(HardwarePermissions::EXECUTE | HardwarePermissions::LOAD),
            FaultCode::PermitExecuteViolation
        );
        assert_eq!(
            missing_permission_cause(HardwarePermissions::LOAD_CAPABILITY),
            FaultCode::PermitLoadCapViolation
        );
        assert_eq!(
            missing_permission_cause(HardwarePermissions::ACCESS_SYSTEM_REGISTERS),
            FaultCode::UserDefViolation
        );
    }

    #[test]
    fn alignment_faults_name_direction_and_address() {
        assert_eq!(check_alignment(0x1000, 16, AccessKind::Load), Ok(()));
        assert_eq!(check_alignment(0x1001, 1, AccessKind::Store), Ok(()));
        assert_eq!(
            check_alignment(0x1008, 16, AccessKind::Load),
            Err(CapabilityFault::address_error(FaultCode::AddressErrorLoad, 0x1008))
        );
        assert_eq!(
            check_alignment(0x1002, 4, AccessKind::Store),
            Err(CapabilityFault::address_error(FaultCode::AddressErrorStore, 0x1002))
        );
    }

    #[test]
    fn implicit_accesses_offset_from_cursor() {
        let mut ctx = ExecutionContext::default();
        ctx.write(RegisterId::Ddc, load_only(0x4000, 0x1000).with_cursor(0x4100));

        assert_eq!(check_ddc_load(&ctx, 0x20, 8), Ok(0x4120));
        assert_eq!(
            check_ddc_store(&ctx, 0x20, 8).map_err(|fault| fault.cause),
            Err(FaultCode::PermitStoreViolation)
        );
        assert_eq!(
            check_ddc_rmw(&ctx, 0x20, 8).map_err(|fault| fault.cause),
            Err(FaultCode::PermitStoreViolation)
        );
        assert_eq!(
            check_ddc_load(&ctx, 0xF00, 8),
            Err(CapabilityFault::new(FaultCode::LengthViolation, RegisterId::Ddc).at(0x5000))
        );
    }

    #[test]
    fn null_ddc_rejects_every_legacy_access() {
        let ctx = ExecutionContext::with_config(&CoreConfig {
            profile: BootProfile::Restricted,
            ..CoreConfig::default()
        });
        assert_eq!(
            check_ddc_load(&ctx, 0, 1).map_err(|fault| (fault.cause, fault.register)),
            Err((FaultCode::TagViolation, Some(RegisterId::Ddc)))
        );
        assert_eq!(check_pcc_load(&ctx, 0x40, 4), Ok(0x40));
    }

    #[test]
    fn fetch_faults_are_raised_before_retire() {
        let mut ctx = ExecutionContext::default();
        ctx.write(RegisterId::Pcc, load_only(0x1000, 0x100));
        let fault = check_pcc_fetch(&ctx, 4).expect_err("no execute permission");
        assert_eq!(fault.cause, FaultCode::PermitExecuteViolation);
        assert_eq!(fault.register, Some(RegisterId::Pcc));
        assert!(!fault.instruction_available);

        assert_eq!(check_pcc_fetch(&ExecutionContext::default(), 4), Ok(0));
    }
}
