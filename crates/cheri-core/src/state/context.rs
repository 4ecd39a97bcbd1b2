use tracing::debug;

use super::registers::{CapCause, CapRegIndex, CapRegisterFile, RegisterId};
use crate::{
    CapabilityFault, CapabilityRegister, CoreConfig, FaultCounters, FaultSink, InstructionOutcome,
};

/// Per-CPU capability state: register file, special capabilities, cause
/// register and diagnostics.
///
/// Never shared between concurrently executing CPUs; every operation takes
/// it by `&mut`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ExecutionContext {
    config: CoreConfig,
    registers: CapRegisterFile,
    ddc: CapabilityRegister,
    pcc: CapabilityRegister,
    epcc: CapabilityRegister,
    error_epcc: CapabilityRegister,
    cap_cause: Option<CapCause>,
    counters: FaultCounters,
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::with_config(&CoreConfig::default())
    }
}

impl ExecutionContext {
    /// Creates a context in its reset state for `config`.
    #[must_use]
    pub fn with_config(config: &CoreConfig) -> Self {
        Self {
            config: *config,
            registers: CapRegisterFile::default(),
            ddc: config.reset_ddc(),
            pcc: config.reset_pcc(),
            epcc: CapabilityRegister::null(),
            error_epcc: CapabilityRegister::null(),
            cap_cause: None,
            counters: FaultCounters::new(),
        }
    }

    /// Applies canonical reset: general registers and exception capabilities
    /// become null, `DDC`/`PCC` take the profile defaults, and the cause
    /// register and counters are cleared.
    pub fn reset_canonical(&mut self) {
        self.registers.clear();
        self.ddc = self.config.reset_ddc();
        self.pcc = self.config.reset_pcc();
        self.epcc = CapabilityRegister::null();
        self.error_epcc = CapabilityRegister::null();
        self.cap_cause = None;
        self.counters.reset();
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Reads a general-purpose capability register.
    #[must_use]
    pub const fn reg(&self, index: CapRegIndex) -> &CapabilityRegister {
        self.registers.read(index)
    }

    /// Writes a general-purpose capability register.
    pub const fn set_reg(&mut self, index: CapRegIndex, value: CapabilityRegister) {
        self.registers.write(index, value);
    }

    /// Reads any capability register by identity.
    #[must_use]
    pub const fn read(&self, id: RegisterId) -> &CapabilityRegister {
        match id {
            RegisterId::General(index) => self.registers.read(index),
            RegisterId::Ddc => &self.ddc,
            RegisterId::Pcc => &self.pcc,
        }
    }

    /// Writes any capability register by identity.
    pub const fn write(&mut self, id: RegisterId, value: CapabilityRegister) {
        match id {
            RegisterId::General(index) => self.registers.write(index, value),
            RegisterId::Ddc => self.ddc = value,
            RegisterId::Pcc => self.pcc = value,
        }
    }

    /// Default data capability.
    #[must_use]
    pub const fn ddc(&self) -> &CapabilityRegister {
        &self.ddc
    }

    /// Program-counter capability.
    #[must_use]
    pub const fn pcc(&self) -> &CapabilityRegister {
        &self.pcc
    }

    /// Exception program-counter capability.
    #[must_use]
    pub const fn epcc(&self) -> &CapabilityRegister {
        &self.epcc
    }

    /// Error exception program-counter capability.
    #[must_use]
    pub const fn error_epcc(&self) -> &CapabilityRegister {
        &self.error_epcc
    }

    /// Mutable exception program-counter capability.
    pub const fn epcc_mut(&mut self) -> &mut CapabilityRegister {
        &mut self.epcc
    }

    /// Mutable error exception program-counter capability.
    pub const fn error_epcc_mut(&mut self) -> &mut CapabilityRegister {
        &mut self.error_epcc
    }

    pub(crate) const fn pcc_mut(&mut self) -> &mut CapabilityRegister {
        &mut self.pcc
    }

    /// Latched capability cause register, if any capability fault was raised.
    #[must_use]
    pub const fn cap_cause(&self) -> Option<CapCause> {
        self.cap_cause
    }

    /// Packed `CGetCause` word; zero when no capability fault was raised.
    #[must_use]
    pub const fn cap_cause_word(&self) -> u16 {
        match self.cap_cause {
            Some(cause) => cause.word(),
            None => 0,
        }
    }

    /// Fault diagnostics.
    #[must_use]
    pub const fn counters(&self) -> &FaultCounters {
        &self.counters
    }

    pub(crate) const fn counters_mut(&mut self) -> &mut FaultCounters {
        &mut self.counters
    }

    /// Records a fault: latches the cause register for capability causes and
    /// updates the counters. Returns the fault for delivery.
    pub fn raise(&mut self, fault: CapabilityFault) -> CapabilityFault {
        debug!(
            cause = %fault.cause,
            register = ?fault.register,
            address = ?fault.address,
            instruction_available = fault.instruction_available,
            "capability fault"
        );
        if fault.cause.cap_cause_code().is_some() {
            self.cap_cause = Some(CapCause::from_fault(&fault));
        }
        self.counters.record_fault(&fault);
        fault
    }

    /// Runs one instruction's capability semantics.
    ///
    /// `op` must perform every check before its first write; when it returns
    /// a fault the fault is raised and handed to `sink` exactly once.
    pub fn run_instruction<F>(&mut self, sink: &mut dyn FaultSink, op: F) -> InstructionOutcome
    where
        F: FnOnce(&mut Self) -> Result<(), CapabilityFault>,
    {
        match op(self) {
            Ok(()) => InstructionOutcome::Retired,
            Err(fault) => {
                let fault = self.raise(fault);
                sink.deliver(&fault);
                InstructionOutcome::Fault {
                    fault,
                    debugger_trap: self.config.debugger_on_trap,
                }
            }
        }
    }
}
