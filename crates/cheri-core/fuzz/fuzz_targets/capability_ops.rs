#![no_main]

use cheri_core::{
    and_permissions, check_permission, check_type, clear_tag, conditional_seal,
    derive_pcc_relative, install_exception_return_pcc, load_capability, move_capability, seal,
    set_exception_cursor, store_bytes_via, store_capability, unseal, CapRegIndex,
    CapabilityRegister, ExceptionTarget, ExecutionContext, RecordingFaultSink, TagLoadPolicy,
    TaggedMemory, CAP_REGISTER_COUNT,
};
use libfuzzer_sys::fuzz_target;

fn reg(byte: u8) -> CapRegIndex {
    CapRegIndex::from_u5(byte & 0x1F).expect("masked to five bits")
}

fn assert_within_root(cap: &CapabilityRegister) {
    if !cap.tag() {
        return;
    }
    let root = CapabilityRegister::root();
    assert!(cap.top() <= root.top());
    assert!(cap.permissions().is_subset_of(root.permissions()));
    assert!(
        cap.is_sealed() || cap.is_representable_with_cursor(cap.cursor()),
        "tagged capability outside its representable window: {cap:?}"
    );
}

fuzz_target!(|data: &[u8]| {
    let mut ctx = ExecutionContext::default();
    let memory = TaggedMemory::new();
    let mut sink = RecordingFaultSink::default();

    for chunk in data.chunks_exact(11) {
        let (cd, cs, ct) = (reg(chunk[1]), reg(chunk[2]), reg(chunk[3]));
        let mut word = [0_u8; 8];
        word.copy_from_slice(&chunk[3..11]);
        let operand = u64::from_le_bytes(word);

        let _ = ctx.run_instruction(&mut sink, |ctx| match chunk[0] % 14 {
            0 => seal(ctx, cd, cs, ct),
            1 => conditional_seal(ctx, cd, cs, ct),
            2 => unseal(ctx, cd, cs, ct),
            3 => and_permissions(ctx, cd, cs, operand),
            4 => check_type(ctx, cs, ct),
            5 => check_permission(ctx, cs, operand),
            6 => {
                clear_tag(ctx, cd, cs);
                Ok(())
            }
            7 => {
                move_capability(ctx, cd, cs);
                Ok(())
            }
            8 => load_capability(ctx, &memory, cd, cs, operand & 0xFFFF, TagLoadPolicy::Allow),
            9 => store_capability(ctx, &memory, cs, ct, operand & 0xFFFF),
            10 => store_bytes_via(ctx, &memory, cs, operand & 0xFFFF, &chunk[4..6]),
            11 => {
                set_exception_cursor(ctx, ExceptionTarget::Epcc, operand);
                Ok(())
            }
            12 => {
                install_exception_return_pcc(ctx, ExceptionTarget::Epcc, operand);
                Ok(())
            }
            _ => {
                derive_pcc_relative(ctx, cd, operand);
                Ok(())
            }
        });
    }

    for index in 0..CAP_REGISTER_COUNT {
        let index = u8::try_from(index).expect("register count fits in u8");
        assert_within_root(ctx.reg(reg(index)));
    }
    assert_within_root(ctx.pcc());
    assert_within_root(ctx.epcc());
});
