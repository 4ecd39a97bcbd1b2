//! Capability-manipulating operations exposed to instruction semantics.
//!
//! Faulting operations return `Result<(), CapabilityFault>` and leave every
//! register untouched when they fail. Callers route the error through
//! [`crate::ExecutionContext::run_instruction`] to latch and deliver it.

/// Permission narrowing, tag clearing and register moves.
pub mod derive;
/// Pure field reads that never fault.
pub mod inspect;
/// Capability loads/stores and data accesses through a capability.
pub mod loadstore;
/// Type and permission assertions, sealing and unsealing.
pub mod seal;
/// Program-counter capability updates for exception entry and return.
pub mod transfer;

pub use derive::{and_permissions, clear_tag, move_capability};
pub use inspect::{
    get_address, get_base, get_flags, get_length, get_offset, get_perm, get_sealed, get_tag,
    get_type,
};
pub use loadstore::{
    load_bytes_via, load_capability, store_bytes_via, store_capability, TagLoadPolicy,
};
pub use seal::{
    check_permission, check_type, conditional_seal, seal, unseal, CONDITIONAL_SEAL_SKIP,
};
pub use transfer::{
    derive_pcc_relative, install_exception_handler_pcc, install_exception_return_pcc,
    set_exception_cursor, ExceptionTarget,
};

use crate::{CapRegIndex, CapabilityFault, FaultCode, RegisterId};

/// Fault naming general capability register `reg`.
pub(crate) const fn general(cause: FaultCode, reg: CapRegIndex) -> CapabilityFault {
    CapabilityFault::new(cause, RegisterId::General(reg))
}
