//! Fault diagnostics counters.

use crate::{CapabilityFault, FaultClass};

/// Saturating fault and representability counters kept per execution context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct FaultCounters {
    /// The last fault raised, if any.
    pub last_fault: Option<CapabilityFault>,
    /// Tag-class faults.
    pub tag: u32,
    /// Seal-class faults.
    pub seal: u32,
    /// Type-class faults.
    pub otype: u32,
    /// Permission-class faults.
    pub permission: u32,
    /// Bounds-class faults.
    pub bounds: u32,
    /// Inexact-bounds faults.
    pub representability: u32,
    /// Load-generation faults.
    pub load_generation: u32,
    /// Legacy address errors.
    pub address: u32,
    /// Control-transfer updates that detagged a capability instead of faulting.
    pub unrepresentable: u32,
}

impl FaultCounters {
    /// Creates zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a raised fault and bumps its class counter.
    #[allow(clippy::missing_const_for_fn)]
    pub fn record_fault(&mut self, fault: &CapabilityFault) {
        self.last_fault = Some(*fault);
        let counter = match fault.cause.class() {
            FaultClass::Tag => &mut self.tag,
            FaultClass::Seal => &mut self.seal,
            FaultClass::Type => &mut self.otype,
            FaultClass::Permission => &mut self.permission,
            FaultClass::Bounds => &mut self.bounds,
            FaultClass::Representability => &mut self.representability,
            FaultClass::LoadGeneration => &mut self.load_generation,
            FaultClass::Address => &mut self.address,
        };
        *counter = counter.saturating_add(1);
    }

    /// Records a capability that lost its tag through an unrepresentable update.
    #[allow(clippy::missing_const_for_fn)]
    pub fn record_unrepresentable(&mut self) {
        self.unrepresentable = self.unrepresentable.saturating_add(1);
    }

    /// Count of faults of `class`.
    #[must_use]
    pub const fn count(&self, class: FaultClass) -> u32 {
        match class {
            FaultClass::Tag => self.tag,
            FaultClass::Seal => self.seal,
            FaultClass::Type => self.otype,
            FaultClass::Permission => self.permission,
            FaultClass::Bounds => self.bounds,
            FaultClass::Representability => self.representability,
            FaultClass::LoadGeneration => self.load_generation,
            FaultClass::Address => self.address,
        }
    }

    /// Resets all counters.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
