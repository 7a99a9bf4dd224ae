use crate::ast::BinaryOp;
use crate::error::CompileError;

/// Index into the virtual register stack; slot 0 is the bottom.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Slot(pub(crate) usize);

/// Finalized machine code plus whatever keeps it mapped.
pub(crate) struct FinalizedCode {
    pub(crate) entry: *const u8,
    pub(crate) owner: CodeOwner,
}

pub(crate) enum CodeOwner {
    #[cfg(all(target_arch = "x86_64", unix))]
    Mapped(crate::memory::ExecutableBuffer),
    Cranelift(crate::clif::ClifModule),
}

/// The instruction-encoder capability the code generator drives.
///
/// The virtual register stack lives in [`codegen`](crate::codegen); an
/// emitter only maps slots to whatever its target uses for them.
pub(crate) trait Emitter {
    fn emit_prologue(&mut self, arity: usize);
    /// Copies the `index`-th floating-point argument into `dst`.
    fn load_argument(&mut self, dst: Slot, index: usize);
    fn load_immediate(&mut self, dst: Slot, value: f64);
    fn emit_binary_op(&mut self, op: BinaryOp, lhs: Slot, rhs: Slot, dst: Slot);
    fn emit_unary_negate(&mut self, src: Slot, dst: Slot);
    fn move_to_return_register(&mut self, src: Slot);
    fn emit_epilogue(&mut self);
    fn finalize_to_callable(self) -> Result<FinalizedCode, CompileError>;
}
