use log::debug;

use crate::ast::{FunctionDef, Node, UnaryOp};
use crate::emitter::{Emitter, FinalizedCode, Slot};
use crate::error::CompileError;

/// Floating-point argument registers of the calling convention (`xmm0`-`xmm7`).
pub const MAX_PARAMS: usize = 8;
/// Registers outside the argument set available to the compiler (`xmm8`-`xmm15`).
pub const POOL_SIZE: usize = 8;
/// Pool registers reserved for applying one operator (`xmm14`, `xmm15`).
pub const SCRATCH_REGISTERS: usize = 2;
/// Maximum number of simultaneously live intermediate values.
pub const STACK_DEPTH: usize = POOL_SIZE - SCRATCH_REGISTERS;

/// Compile-time model of the live intermediate values.
#[derive(Debug, Default)]
struct VirtualStack {
    depth: usize,
    high_water: usize,
}

impl VirtualStack {
    fn push(&mut self) -> Result<Slot, CompileError> {
        if self.depth == STACK_DEPTH {
            return Err(CompileError::RegisterExhaustion { limit: STACK_DEPTH });
        }
        let slot = Slot(self.depth);
        self.depth += 1;
        self.high_water = self.high_water.max(self.depth);
        Ok(slot)
    }

    fn pop(&mut self) -> Result<Slot, CompileError> {
        if self.depth == 0 {
            return Err(CompileError::Backend("virtual register stack underflow".into()));
        }
        self.depth -= 1;
        Ok(Slot(self.depth))
    }
}

/// Lowers a checked function definition through `emitter` in one post-order pass.
pub(crate) fn compile_function<E: Emitter>(
    mut emitter: E,
    def: &FunctionDef,
) -> Result<FinalizedCode, CompileError> {
    let mut stack = VirtualStack::default();
    emitter.emit_prologue(def.arity());
    lower(&mut emitter, &mut stack, def, def.body())?;
    let result = stack.pop()?;
    if stack.depth != 0 {
        return Err(CompileError::Backend(format!(
            "{} values left on the virtual register stack",
            stack.depth
        )));
    }
    emitter.move_to_return_register(result);
    emitter.emit_epilogue();
    debug!(
        "lowered function with {} parameter(s), peak stack depth {}",
        def.arity(),
        stack.high_water
    );
    emitter.finalize_to_callable()
}

fn lower<E: Emitter>(
    emitter: &mut E,
    stack: &mut VirtualStack,
    def: &FunctionDef,
    node: &Node,
) -> Result<(), CompileError> {
    match node {
        Node::Variable(name) => {
            let index = def
                .param_index(name)
                .ok_or_else(|| CompileError::FreeVariable(name.clone()))?;
            let dst = stack.push()?;
            emitter.load_argument(dst, index);
        }
        Node::Immediate(value) => {
            let dst = stack.push()?;
            emitter.load_immediate(dst, *value);
        }
        Node::Unary {
            op: UnaryOp::Neg,
            operand,
        } => {
            lower(emitter, stack, def, operand)?;
            let src = stack.pop()?;
            let dst = stack.push()?;
            emitter.emit_unary_negate(src, dst);
        }
        Node::Binary { op, lhs, rhs } => {
            lower(emitter, stack, def, lhs)?;
            lower(emitter, stack, def, rhs)?;
            let rhs = stack.pop()?;
            let lhs = stack.pop()?;
            let dst = stack.push()?;
            emitter.emit_binary_op(*op, lhs, rhs, dst);
        }
        Node::FunctionDef(_) => return Err(CompileError::NestedFunction),
    }
    Ok(())
}
