//! Hand-rolled x86-64 encoder for the System V calling convention.
//!
//! Register plan:
//! - `xmm0`-`xmm7`: incoming arguments, `xmm0` also carries the result.
//! - `xmm8`-`xmm13`: virtual stack slots 0-5.
//! - `xmm14`, `xmm15`: scratch registers for applying one operator.
//! - `rax` and the frame slot `[rbp-8]`: staging for 64-bit constants.

use log::debug;

use crate::ast::BinaryOp;
use crate::codegen::STACK_DEPTH;
use crate::emitter::{CodeOwner, Emitter, FinalizedCode, Slot};
use crate::error::CompileError;
use crate::memory::ExecutableBuffer;

const FIRST_SLOT_XMM: u8 = 8;
const SCRATCH_RHS: u8 = 14;
const SCRATCH_ACC: u8 = 15;
const RETURN_XMM: u8 = 0;

const RBP: u8 = 5;
const SIGN_BIT: u64 = 0x8000_0000_0000_0000;
/// `[rbp-8]`, inside the 16 bytes reserved by the prologue.
const CONST_SLOT_DISP: i8 = -8;
const FRAME_SIZE: u8 = 16;

#[derive(Default)]
pub(crate) struct X64Emitter {
    code: Vec<u8>,
}

impl X64Emitter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn emit(&mut self, bytes: &[u8]) {
        self.code.extend_from_slice(bytes);
    }

    fn slot_xmm(slot: Slot) -> u8 {
        debug_assert!(slot.0 < STACK_DEPTH);
        FIRST_SLOT_XMM + slot.0 as u8
    }

    /// Optional REX prefix carrying the high bits of `reg` and `rm`.
    fn rex(&mut self, reg: u8, rm: u8) {
        let rex = 0x40 | (((reg >> 3) & 1) << 2) | ((rm >> 3) & 1);
        if rex != 0x40 {
            self.code.push(rex);
        }
    }

    /// `prefix [REX] 0F opcode /r` with both operands in xmm registers.
    fn sse_rr(&mut self, prefix: u8, opcode: u8, dst: u8, src: u8) {
        self.code.push(prefix);
        self.rex(dst, src);
        self.emit(&[0x0F, opcode, 0xC0 | ((dst & 7) << 3) | (src & 7)]);
    }

    fn movsd_rr(&mut self, dst: u8, src: u8) {
        self.sse_rr(0xF2, 0x10, dst, src);
    }

    /// `movsd xmm, [rbp+disp8]`
    fn movsd_load_frame(&mut self, dst: u8, disp: i8) {
        self.code.push(0xF2);
        self.rex(dst, RBP);
        self.emit(&[0x0F, 0x10, 0x40 | ((dst & 7) << 3) | RBP, disp as u8]);
    }

    /// `mov rax, imm64` then `mov [rbp+disp8], rax`.
    fn stage_bits(&mut self, bits: u64, disp: i8) {
        self.emit(&[0x48, 0xB8]);
        self.emit(&bits.to_le_bytes());
        self.emit(&[0x48, 0x89, 0x40 | RBP, disp as u8]);
    }

    #[cfg(test)]
    pub(crate) fn code(&self) -> &[u8] {
        &self.code
    }
}

impl Emitter for X64Emitter {
    fn emit_prologue(&mut self, _arity: usize) {
        // push rbp; mov rbp, rsp; sub rsp, FRAME_SIZE
        self.emit(&[0x55, 0x48, 0x89, 0xE5, 0x48, 0x83, 0xEC, FRAME_SIZE]);
    }

    fn load_argument(&mut self, dst: Slot, index: usize) {
        self.movsd_rr(Self::slot_xmm(dst), index as u8);
    }

    fn load_immediate(&mut self, dst: Slot, value: f64) {
        self.stage_bits(value.to_bits(), CONST_SLOT_DISP);
        self.movsd_load_frame(Self::slot_xmm(dst), CONST_SLOT_DISP);
    }

    fn emit_binary_op(&mut self, op: BinaryOp, lhs: Slot, rhs: Slot, dst: Slot) {
        let opcode = match op {
            BinaryOp::Add => 0x58,
            BinaryOp::Mul => 0x59,
            BinaryOp::Sub => 0x5C,
            BinaryOp::Div => 0x5E,
        };
        self.movsd_rr(SCRATCH_ACC, Self::slot_xmm(lhs));
        self.movsd_rr(SCRATCH_RHS, Self::slot_xmm(rhs));
        self.sse_rr(0xF2, opcode, SCRATCH_ACC, SCRATCH_RHS);
        self.movsd_rr(Self::slot_xmm(dst), SCRATCH_ACC);
    }

    fn emit_unary_negate(&mut self, src: Slot, dst: Slot) {
        self.stage_bits(SIGN_BIT, CONST_SLOT_DISP);
        self.movsd_load_frame(SCRATCH_RHS, CONST_SLOT_DISP);
        self.movsd_rr(SCRATCH_ACC, Self::slot_xmm(src));
        // xorpd xmm15, xmm14
        self.sse_rr(0x66, 0x57, SCRATCH_ACC, SCRATCH_RHS);
        self.movsd_rr(Self::slot_xmm(dst), SCRATCH_ACC);
    }

    fn move_to_return_register(&mut self, src: Slot) {
        self.movsd_rr(RETURN_XMM, Self::slot_xmm(src));
    }

    fn emit_epilogue(&mut self) {
        // mov rsp, rbp; pop rbp; ret
        self.emit(&[0x48, 0x89, 0xEC, 0x5D, 0xC3]);
    }

    fn finalize_to_callable(self) -> Result<FinalizedCode, CompileError> {
        debug!("x86-64 code ({} bytes): {:02x?}", self.code.len(), self.code);
        let buffer = ExecutableBuffer::new(&self.code)?;
        Ok(FinalizedCode {
            entry: buffer.as_ptr(),
            owner: CodeOwner::Mapped(buffer),
        })
    }
}
