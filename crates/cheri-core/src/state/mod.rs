//! Per-CPU capability state: register identities, the register file and the
//! execution context that owns them.

/// Execution context owning the capability register state.
pub mod context;
/// Capability register identities, register file and cause register.
pub mod registers;

pub use context::ExecutionContext;
pub use registers::{
    CapCause, CapRegIndex, CapRegisterFile, RegisterId, CAP_REGISTER_COUNT, CAUSE_REGISTER_DDC,
    CAUSE_REGISTER_NONE,
};
