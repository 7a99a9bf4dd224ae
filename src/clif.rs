//! Cranelift backend.
//!
//! Emitter calls are recorded as slot-level ops and lowered into Cranelift IR
//! when the function is finalized. Each slot maps to the SSA value most
//! recently written to it.

use cranelift::codegen::settings;
use cranelift::prelude::*;
use cranelift_jit::{JITBuilder, JITModule};
use cranelift_module::{Linkage, Module};
use cranelift_native as native;
use log::debug;

use crate::ast::BinaryOp;
use crate::codegen::STACK_DEPTH;
use crate::emitter::{CodeOwner, Emitter, FinalizedCode, Slot};
use crate::error::CompileError;

#[derive(Clone, Copy, Debug)]
enum Op {
    Arg { dst: Slot, index: usize },
    Imm { dst: Slot, value: f64 },
    Binary { op: BinaryOp, lhs: Slot, rhs: Slot, dst: Slot },
    Neg { src: Slot, dst: Slot },
    Return { src: Slot },
}

#[derive(Debug, Default)]
pub(crate) struct CraneliftEmitter {
    arity: usize,
    ops: Vec<Op>,
}

impl CraneliftEmitter {
    pub(crate) fn new() -> Self {
        Self::default()
    }
}

/// Owns the JIT module holding a compiled function's code.
pub(crate) struct ClifModule(Option<JITModule>);

// SAFETY: the module is only touched again to free it on drop; the finalized
// code it owns is immutable.
unsafe impl Send for ClifModule {}
unsafe impl Sync for ClifModule {}

impl Drop for ClifModule {
    fn drop(&mut self) {
        if let Some(module) = self.0.take() {
            // SAFETY: the only pointer into this module lives in the
            // `JitFunction` being dropped alongside it.
            unsafe { module.free_memory() };
        }
    }
}

fn backend_err(e: impl std::fmt::Display) -> CompileError {
    CompileError::Backend(e.to_string())
}

fn new_module() -> Result<JITModule, CompileError> {
    let mut flag_builder = settings::builder();
    flag_builder
        .set("opt_level", "speed")
        .map_err(|e| CompileError::Backend(format!("settings error: {}", e)))?;
    let isa_builder = native::builder().map_err(backend_err)?;
    let isa = isa_builder
        .finish(settings::Flags::new(flag_builder))
        .map_err(backend_err)?;
    let jb = JITBuilder::with_isa(isa, cranelift_module::default_libcall_names());
    Ok(JITModule::new(jb))
}

fn read(slots: &[Option<Value>], slot: Slot) -> Result<Value, CompileError> {
    slots
        .get(slot.0)
        .copied()
        .flatten()
        .ok_or_else(|| CompileError::Backend(format!("read of empty slot {}", slot.0)))
}

fn write(slots: &mut [Option<Value>], slot: Slot, value: Value) -> Result<(), CompileError> {
    let cell = slots
        .get_mut(slot.0)
        .ok_or_else(|| CompileError::Backend(format!("slot {} out of range", slot.0)))?;
    *cell = Some(value);
    Ok(())
}

impl Emitter for CraneliftEmitter {
    fn emit_prologue(&mut self, arity: usize) {
        self.arity = arity;
    }

    fn load_argument(&mut self, dst: Slot, index: usize) {
        self.ops.push(Op::Arg { dst, index });
    }

    fn load_immediate(&mut self, dst: Slot, value: f64) {
        self.ops.push(Op::Imm { dst, value });
    }

    fn emit_binary_op(&mut self, op: BinaryOp, lhs: Slot, rhs: Slot, dst: Slot) {
        self.ops.push(Op::Binary { op, lhs, rhs, dst });
    }

    fn emit_unary_negate(&mut self, src: Slot, dst: Slot) {
        self.ops.push(Op::Neg { src, dst });
    }

    fn move_to_return_register(&mut self, src: Slot) {
        self.ops.push(Op::Return { src });
    }

    // Cranelift generates its own frame.
    fn emit_epilogue(&mut self) {}

    fn finalize_to_callable(self) -> Result<FinalizedCode, CompileError> {
        let mut module = new_module()?;

        let mut sig = module.make_signature();
        for _ in 0..self.arity {
            sig.params.push(AbiParam::new(types::F64));
        }
        sig.returns.push(AbiParam::new(types::F64));
        let func_id = module
            .declare_function("formula", Linkage::Local, &sig)
            .map_err(backend_err)?;

        let mut ctx = module.make_context();
        ctx.func.signature = sig;
        let mut fb_ctx = FunctionBuilderContext::new();
        {
            let mut builder = FunctionBuilder::new(&mut ctx.func, &mut fb_ctx);
            let block = builder.create_block();
            builder.append_block_params_for_function_params(block);
            builder.switch_to_block(block);
            builder.seal_block(block);

            let args = builder.block_params(block).to_vec();
            let mut slots: [Option<Value>; STACK_DEPTH] = [None; STACK_DEPTH];
            let mut returned = false;
            for op in &self.ops {
                match *op {
                    Op::Arg { dst, index } => {
                        let v = *args.get(index).ok_or_else(|| {
                            CompileError::Backend(format!("no argument {}", index))
                        })?;
                        write(&mut slots, dst, v)?;
                    }
                    Op::Imm { dst, value } => {
                        let v = builder.ins().f64const(value);
                        write(&mut slots, dst, v)?;
                    }
                    Op::Binary { op, lhs, rhs, dst } => {
                        let (l, r) = (read(&slots, lhs)?, read(&slots, rhs)?);
                        let v = match op {
                            BinaryOp::Add => builder.ins().fadd(l, r),
                            BinaryOp::Sub => builder.ins().fsub(l, r),
                            BinaryOp::Mul => builder.ins().fmul(l, r),
                            BinaryOp::Div => builder.ins().fdiv(l, r),
                        };
                        write(&mut slots, dst, v)?;
                    }
                    Op::Neg { src, dst } => {
                        let v = builder.ins().fneg(read(&slots, src)?);
                        write(&mut slots, dst, v)?;
                    }
                    Op::Return { src } => {
                        let v = read(&slots, src)?;
                        builder.ins().return_(&[v]);
                        returned = true;
                    }
                }
            }
            if !returned {
                return Err(CompileError::Backend("function has no return".into()));
            }
            builder.finalize();
        }
        debug!("JIT code\n{}", ctx.func.display());

        module
            .define_function(func_id, &mut ctx)
            .map_err(backend_err)?;
        module.clear_context(&mut ctx);
        module.finalize_definitions().map_err(backend_err)?;

        let entry = module.get_finalized_function(func_id);
        Ok(FinalizedCode {
            entry,
            owner: CodeOwner::Cranelift(ClifModule(Some(module))),
        })
    }
}
