//! Memory-side capability enforcement: access validation and the tag store.

/// Bounds/permission validation for explicit and implicit accesses.
pub mod access;
/// Sparse tagged memory and the memory/tag-store contract.
pub mod tags;

pub use access::{
    check_alignment, check_ddc_load, check_ddc_rmw, check_ddc_store, check_pcc_fetch,
    check_pcc_load, missing_permission_cause, validate_access, AccessKind,
};
pub use tags::{
    granule_index, granule_span, CapabilityMemory, TaggedMemory, GRANULE_BYTES, GRANULE_SHIFT,
};
