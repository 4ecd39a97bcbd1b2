//! Program-counter capability updates on exception entry and return.
//!
//! None of these operations fault. A sealed or unrepresentable result is
//! detagged with its address preserved, so the next fetch through it faults
//! instead.

use tracing::warn;

use crate::{CapRegIndex, CapabilityRegister, ExecutionContext, ObjectType};

/// Saved program-counter capability updated by exception entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ExceptionTarget {
    /// Exception program-counter capability.
    Epcc,
    /// Error exception program-counter capability.
    ErrorEpcc,
}

const fn target_mut(
    ctx: &mut ExecutionContext,
    target: ExceptionTarget,
) -> &mut CapabilityRegister {
    match target {
        ExceptionTarget::Epcc => ctx.epcc_mut(),
        ExceptionTarget::ErrorEpcc => ctx.error_epcc_mut(),
    }
}

fn note_detagged(
    ctx: &mut ExecutionContext,
    before: &CapabilityRegister,
    after: &CapabilityRegister,
) {
    if before.tag() && !after.tag() {
        ctx.counters_mut().record_unrepresentable();
    }
}

/// Moves the cursor of a new PCC, detagging it if the cursor leaves the window.
fn pcc_cursor_or_detag(
    ctx: &mut ExecutionContext,
    cap: CapabilityRegister,
    new_cursor: u64,
) -> CapabilityRegister {
    let updated = cap.with_cursor(new_cursor);
    if cap.tag() && !updated.tag() {
        warn!(new_cursor, "unrepresentable PCC cursor; detagged");
    }
    note_detagged(ctx, &cap, &updated);
    updated
}

/// Writes the saved return address into EPCC or ErrorEPCC.
///
/// A sealed target is never modified in place: the result is detagged with
/// `new_cursor` as its address. An unrepresentable cursor detags the same way.
pub fn set_exception_cursor(ctx: &mut ExecutionContext, target: ExceptionTarget, new_cursor: u64) {
    let current = *target_mut(ctx, target);
    let updated = if current.is_sealed() {
        if current.tag() {
            warn!(?target, new_cursor, "sealed exception capability; detagged");
        }
        current.mark_unrepresentable(new_cursor)
    } else if !current.is_representable_with_cursor(new_cursor) {
        if current.tag() {
            warn!(?target, new_cursor, "unrepresentable exception cursor; detagged");
        }
        current.mark_unrepresentable(new_cursor)
    } else {
        current.with_cursor(new_cursor)
    };
    note_detagged(ctx, &current, &updated);
    *target_mut(ctx, target) = updated;
}

/// Installs `handler` as PCC at `new_pc` on exception entry.
///
/// A sealed handler capability is detagged before the cursor update.
pub fn install_exception_handler_pcc(
    ctx: &mut ExecutionContext,
    handler: CapabilityRegister,
    new_pc: u64,
) {
    let mut pcc = handler;
    if pcc.is_sealed() && pcc.tag() {
        warn!(new_pc, "sealed exception handler capability; detagged");
        pcc.clear_tag();
        ctx.counters_mut().record_unrepresentable();
    }
    let pcc = pcc_cursor_or_detag(ctx, pcc, new_pc);
    *ctx.pcc_mut() = pcc;
}

/// Installs the saved EPCC or ErrorEPCC as PCC on exception return.
///
/// A tagged sentry whose address equals `new_cursor` is unsealed. A sealed
/// capability with a different address is detagged. A sealed non-sentry
/// with a matching address is installed unchanged so the next fetch raises
/// the seal violation.
pub fn install_exception_return_pcc(
    ctx: &mut ExecutionContext,
    source: ExceptionTarget,
    new_cursor: u64,
) {
    let saved = *target_mut(ctx, source);
    let mut pcc = saved;
    if saved.tag() && saved.is_sealed() {
        if saved.cursor() == new_cursor {
            *ctx.pcc_mut() = if saved.is_sealed_entry() {
                saved.with_otype(ObjectType::Unsealed)
            } else {
                saved
            };
            return;
        }
        warn!(?source, new_cursor, "sealed return capability with moved address; detagged");
        pcc.clear_tag();
        ctx.counters_mut().record_unrepresentable();
    }
    let pcc = pcc_cursor_or_detag(ctx, pcc, new_cursor);
    *ctx.pcc_mut() = pcc;
}

/// `cd = PCC` with its cursor moved to `new_address`.
///
/// An address outside PCC's representable window yields an untagged copy
/// carrying `new_address`.
pub fn derive_pcc_relative(ctx: &mut ExecutionContext, cd: CapRegIndex, new_address: u64) {
    let pcc = *ctx.pcc();
    let derived = if pcc.is_representable_with_cursor(new_address) {
        pcc.with_cursor(new_address)
    } else {
        if pcc.tag() {
            warn!(new_address, "unrepresentable PCC-relative address; detagged");
            ctx.counters_mut().record_unrepresentable();
        }
        pcc.mark_unrepresentable(new_address)
    };
    ctx.set_reg(cd, derived);
}
