//! Capability enforcement core for a CHERI CPU emulator.
//!
//! Represents, validates and mutates hardware capabilities and decides, per
//! instruction, whether a memory access, seal, unseal, permission change or
//! control transfer is architecturally permitted.

/// Capability register value type, permissions and object types.
pub mod capability;
pub use capability::{
    CapabilityRegister, HardwarePermissions, ObjectType, PermissionSet, SoftwarePermissions,
    ADDRESS_SPACE_TOP, HARDWARE_PERMISSION_BITS,
    MAX_NON_RESERVED_OTYPE, MAX_REPRESENTABLE_OTYPE, OTYPE_BITS, PERMISSION_WORD_LIMIT_SHIFT,
    RESERVED_OTYPE_COUNT, SOFTWARE_PERMISSION_BITS, SOFTWARE_PERMISSION_SHIFT,
};

/// Floating-bounds compression and the representability oracle.
pub mod compression;
pub use compression::{
    bounds_exact, compress, decompress, exponent_for_length, is_representable,
    is_representable_when_sealing, representable_window, CAPABILITY_SIZE_BYTES,
    LENGTH_MANTISSA_WIDTH, MANTISSA_WIDTH, MAX_EXPONENT,
};

/// Fault taxonomy and construction-time errors.
pub mod fault;
pub use fault::{CapabilityError, CapabilityFault, FaultClass, FaultCode};

/// Per-CPU capability register state.
pub mod state;
pub use state::{
    CapCause, CapRegIndex, CapRegisterFile, ExecutionContext, RegisterId, CAP_REGISTER_COUNT,
    CAUSE_REGISTER_DDC, CAUSE_REGISTER_NONE,
};

/// Fault diagnostics counters.
pub mod diag;
pub use diag::FaultCounters;

/// Host-facing configuration and fault delivery contract.
pub mod api;
pub use api::{BootProfile, CoreConfig, FaultSink, InstructionOutcome, RecordingFaultSink};

/// Access validation and tagged memory.
pub mod memory;
pub use memory::{
    check_alignment, check_ddc_load, check_ddc_rmw, check_ddc_store, check_pcc_fetch,
    check_pcc_load, granule_index, granule_span, missing_permission_cause, validate_access,
    AccessKind, CapabilityMemory, TaggedMemory, GRANULE_BYTES, GRANULE_SHIFT,
};

/// Capability operations exposed to instruction semantics.
pub mod ops;
pub use ops::{
    and_permissions, check_permission, check_type, clear_tag, conditional_seal,
    derive_pcc_relative, get_address, get_base, get_flags, get_length, get_offset, get_perm,
    get_sealed, get_tag, get_type, install_exception_handler_pcc, install_exception_return_pcc,
    load_bytes_via, load_capability, move_capability, seal, set_exception_cursor,
    store_bytes_via, store_capability, unseal, ExceptionTarget, TagLoadPolicy,
    CONDITIONAL_SEAL_SKIP,
};

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
