//! Pure register reads (`CGet*`). None of these fault.

use crate::{CapRegIndex, ExecutionContext};

/// `CGetAddr`: cursor of `cb`.
#[must_use]
pub const fn get_address(ctx: &ExecutionContext, cb: CapRegIndex) -> u64 {
    ctx.reg(cb).cursor()
}

/// `CGetBase`: lower bound of `cb`.
#[must_use]
pub const fn get_base(ctx: &ExecutionContext, cb: CapRegIndex) -> u64 {
    ctx.reg(cb).base()
}

/// `CGetLen`: length of `cb`, all-ones when the true length is `2^64`.
#[must_use]
pub const fn get_length(ctx: &ExecutionContext, cb: CapRegIndex) -> u64 {
    ctx.reg(cb).length()
}

/// `CGetFlags`: flag bits of `cb`.
#[must_use]
pub const fn get_flags(ctx: &ExecutionContext, cb: CapRegIndex) -> u64 {
    ctx.reg(cb).flags() as u64
}

/// `CGetPerm`: flat permission word of `cb`.
#[must_use]
pub const fn get_perm(ctx: &ExecutionContext, cb: CapRegIndex) -> u64 {
    ctx.reg(cb).permission_word()
}

/// `CGetOffset`: `cursor - base` of `cb`, modulo `2^64`.
#[must_use]
pub const fn get_offset(ctx: &ExecutionContext, cb: CapRegIndex) -> u64 {
    ctx.reg(cb).offset()
}

/// `CGetSealed`: `1` when `cb` is sealed with a type or as a sentry, else `0`.
#[must_use]
pub const fn get_sealed(ctx: &ExecutionContext, cb: CapRegIndex) -> u64 {
    let cap = ctx.reg(cb);
    (cap.is_sealed_with_type() || cap.is_sealed_entry()) as u64
}

/// `CGetType`: signed object type; reserved sentinels are negative.
#[must_use]
pub const fn get_type(ctx: &ExecutionContext, cb: CapRegIndex) -> i64 {
    ctx.reg(cb).otype().to_signed()
}

/// `CGetTag`: validity bit of `cb`.
#[must_use]
pub const fn get_tag(ctx: &ExecutionContext, cb: CapRegIndex) -> bool {
    ctx.reg(cb).tag()
}
