use crate::{
    CapabilityFault, CapabilityRegister, HardwarePermissions, PermissionSet, SoftwarePermissions,
};

/// Reset profile controlling the authority installed in `DDC` and `PCC`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum BootProfile {
    /// `DDC` and `PCC` both hold the root capability.
    #[default]
    Authority,
    /// `DDC` is null; `PCC` covers the address space with execute and load only.
    Restricted,
}

/// Top-level immutable configuration for an execution context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct CoreConfig {
    /// Reset authority profile.
    pub profile: BootProfile,
    /// Report every delivered fault to an attached debugger as well.
    pub debugger_on_trap: bool,
}

impl CoreConfig {
    /// `DDC` value installed at reset.
    #[must_use]
    pub const fn reset_ddc(&self) -> CapabilityRegister {
        match self.profile {
            BootProfile::Authority => CapabilityRegister::root(),
            BootProfile::Restricted => CapabilityRegister::null(),
        }
    }

    /// `PCC` value installed at reset.
    #[must_use]
    pub const fn reset_pcc(&self) -> CapabilityRegister {
        match self.profile {
            BootProfile::Authority => CapabilityRegister::root(),
            BootProfile::Restricted => CapabilityRegister::root().with_permissions_narrowed(
                PermissionSet::new(
                    HardwarePermissions::EXECUTE
                        .union(HardwarePermissions::LOAD)
                        .union(HardwarePermissions::GLOBAL),
                    SoftwarePermissions::empty(),
                ),
            ),
        }
    }
}

/// Fault-delivery contract of the enclosing CPU.
///
/// Called exactly once per faulting instruction, after the cause register
/// and counters have been updated. The instruction is abandoned once the
/// sink returns.
pub trait FaultSink {
    /// Transfers the fault to the CPU's exception mechanism.
    fn deliver(&mut self, fault: &CapabilityFault);
}

/// Sink that keeps every delivered fault, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordingFaultSink {
    /// Delivered faults.
    pub faults: Vec<CapabilityFault>,
}

impl FaultSink for RecordingFaultSink {
    fn deliver(&mut self, fault: &CapabilityFault) {
        self.faults.push(*fault);
    }
}

/// Outcome of one instruction run through the capability core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstructionOutcome {
    /// Every check passed and all effects were committed.
    Retired,
    /// The instruction faulted; no effects were committed.
    Fault {
        /// Delivered fault.
        fault: CapabilityFault,
        /// `true` when the fault should also stop an attached debugger.
        debugger_trap: bool,
    },
}

impl InstructionOutcome {
    /// Returns the delivered fault, if any.
    #[must_use]
    pub const fn fault(&self) -> Option<&CapabilityFault> {
        match self {
            Self::Retired => None,
            Self::Fault { fault, .. } => Some(fault),
        }
    }
}
