//! Capability-relative memory accesses: capability loads/stores and data
//! transfers through a capability.

use tracing::trace;

use crate::{
    check_alignment, validate_access, AccessKind, CapRegIndex, CapabilityFault, CapabilityMemory,
    ExecutionContext, FaultCode, HardwarePermissions, RegisterId, CAPABILITY_SIZE_BYTES,
};

const CAPABILITY_BYTES: u64 = CAPABILITY_SIZE_BYTES as u64;

/// Protection-state treatment of tags read by capability loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum TagLoadPolicy {
    /// Tags load unchanged.
    #[default]
    Allow,
    /// Tags are stripped on load.
    Clear,
    /// Loading a tagged capability faults.
    Trap,
}

/// `CLC`: loads the capability at `cb.cursor + offset` into `cd`.
///
/// The loaded tag is stripped when `cb` lacks `LOAD_CAPABILITY` or the
/// policy is [`TagLoadPolicy::Clear`].
///
/// # Errors
///
/// The [`validate_access`] fault for `LOAD` over 16 bytes, then
/// `AddressErrorLoad` when misaligned, then
/// `CapabilityLoadGenerationViolation(cb)` for a tagged load under
/// [`TagLoadPolicy::Trap`].
pub fn load_capability<M: CapabilityMemory + ?Sized>(
    ctx: &mut ExecutionContext,
    memory: &M,
    cd: CapRegIndex,
    cb: CapRegIndex,
    offset: u64,
    policy: TagLoadPolicy,
) -> Result<(), CapabilityFault> {
    let authority = *ctx.reg(cb);
    let address = authority.cursor().wrapping_add(offset);
    validate_access(
        &authority,
        RegisterId::General(cb),
        address,
        CAPABILITY_BYTES,
        HardwarePermissions::LOAD,
    )?;
    check_alignment(address, CAPABILITY_BYTES, AccessKind::Load)?;

    let mut loaded = memory.load_capability(address);
    if loaded.tag() {
        if !authority.has_permissions(HardwarePermissions::LOAD_CAPABILITY) {
            trace!(address, "tag cleared: missing load-capability permission");
            loaded.clear_tag();
        } else {
            match policy {
                TagLoadPolicy::Allow => {}
                TagLoadPolicy::Clear => {
                    trace!(address, "tag cleared by load policy");
                    loaded.clear_tag();
                }
                TagLoadPolicy::Trap => {
                    return Err(CapabilityFault::new(
                        FaultCode::CapabilityLoadGenerationViolation,
                        RegisterId::General(cb),
                    )
                    .at(address));
                }
            }
        }
    }
    ctx.set_reg(cd, loaded);
    Ok(())
}

/// `CSC`: stores `cs` at `cb.cursor + offset`, data and tag together.
///
/// # Errors
///
/// The [`validate_access`] fault for `STORE | STORE_CAPABILITY` over 16
/// bytes, with `STORE_LOCAL_CAPABILITY` also required when `cs` is tagged
/// and not global; then `AddressErrorStore` when misaligned.
pub fn store_capability<M: CapabilityMemory + ?Sized>(
    ctx: &ExecutionContext,
    memory: &M,
    cs: CapRegIndex,
    cb: CapRegIndex,
    offset: u64,
) -> Result<(), CapabilityFault> {
    let value = ctx.reg(cs);
    let authority = ctx.reg(cb);
    let address = authority.cursor().wrapping_add(offset);
    let mut required = HardwarePermissions::STORE | HardwarePermissions::STORE_CAPABILITY;
    if value.tag() && !value.has_permissions(HardwarePermissions::GLOBAL) {
        required |= HardwarePermissions::STORE_LOCAL_CAPABILITY;
    }
    validate_access(
        authority,
        RegisterId::General(cb),
        address,
        CAPABILITY_BYTES,
        required,
    )?;
    check_alignment(address, CAPABILITY_BYTES, AccessKind::Store)?;
    memory.store_capability(address, value);
    Ok(())
}

const fn scalar_alignment(len: usize) -> u64 {
    if len.is_power_of_two() && len <= 8 {
        len as u64
    } else {
        1
    }
}

/// Reads `buf.len()` bytes at `cb.cursor + offset`.
///
/// Scalar widths (1, 2, 4, 8 bytes) must be naturally aligned.
///
/// # Errors
///
/// The [`validate_access`] fault for `LOAD`, then `AddressErrorLoad`.
pub fn load_bytes_via<M: CapabilityMemory + ?Sized>(
    ctx: &ExecutionContext,
    memory: &M,
    cb: CapRegIndex,
    offset: u64,
    buf: &mut [u8],
) -> Result<(), CapabilityFault> {
    let authority = ctx.reg(cb);
    let address = authority.cursor().wrapping_add(offset);
    validate_access(
        authority,
        RegisterId::General(cb),
        address,
        buf.len() as u64,
        HardwarePermissions::LOAD,
    )?;
    check_alignment(address, scalar_alignment(buf.len()), AccessKind::Load)?;
    memory.read_bytes(address, buf);
    Ok(())
}

/// Writes `data` at `cb.cursor + offset`, clearing every overlapped tag.
///
/// Scalar widths (1, 2, 4, 8 bytes) must be naturally aligned.
///
/// # Errors
///
/// The [`validate_access`] fault for `STORE`, then `AddressErrorStore`.
pub fn store_bytes_via<M: CapabilityMemory + ?Sized>(
    ctx: &ExecutionContext,
    memory: &M,
    cb: CapRegIndex,
    offset: u64,
    data: &[u8],
) -> Result<(), CapabilityFault> {
    let authority = ctx.reg(cb);
    let address = authority.cursor().wrapping_add(offset);
    validate_access(
        authority,
        RegisterId::General(cb),
        address,
        data.len() as u64,
        HardwarePermissions::STORE,
    )?;
    check_alignment(address, scalar_alignment(data.len()), AccessKind::Store)?;
    memory.write_bytes(address, data);
    Ok(())
}
