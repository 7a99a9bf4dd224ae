use std::fmt;

use log::debug;

use crate::ast::Node;
use crate::clif::CraneliftEmitter;
use crate::codegen::compile_function;
use crate::collect::check_compilable;
use crate::emitter::{CodeOwner, FinalizedCode};
use crate::error::{CompileError, Error, EvalError};
use crate::parser::parse_str;
use crate::rt_types::{Fn0, Fn1, Fn2, Fn3, Fn4, Fn5, Fn6, Fn7, Fn8, Signature};

/// Code generator used by [`JitFunction::compile_with`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Backend {
    /// Hand-rolled x86-64 System V encoder. Only available on x86-64 Unix.
    Native,
    /// Cranelift, through `cranelift-jit`.
    Cranelift,
}

impl Backend {
    pub fn is_available(self) -> bool {
        match self {
            Backend::Native => cfg!(all(target_arch = "x86_64", unix)),
            Backend::Cranelift => true,
        }
    }
}

impl Default for Backend {
    fn default() -> Self {
        if Backend::Native.is_available() {
            Backend::Native
        } else {
            Backend::Cranelift
        }
    }
}

/// A function definition compiled to native code.
///
/// `S` is one of [`Fn0`] through [`Fn8`] and must match the number of
/// parameters of the definition. The machine code lives as long as this value.
///
/// ```
/// use flatjit::{Fn2, JitFunction};
///
/// let f = JitFunction::<Fn2>::from_source("(a, b) { a * b + 1 }").unwrap();
/// assert_eq!(f.call(3.0, 4.0), 13.0);
/// ```
pub struct JitFunction<S: Signature> {
    func: S,
    params: Vec<String>,
    backend: Backend,
    _code: CodeOwner,
}

impl<S: Signature> JitFunction<S> {
    /// Compiles with [`Backend::default`].
    pub fn compile(node: &Node) -> Result<Self, CompileError> {
        Self::compile_with(node, Backend::default())
    }

    pub fn compile_with(node: &Node, backend: Backend) -> Result<Self, CompileError> {
        let def = node.as_function().ok_or(CompileError::NotAFunction)?;
        check_compilable(def, S::ARITY)?;

        let FinalizedCode { entry, owner } = match backend {
            #[cfg(all(target_arch = "x86_64", unix))]
            Backend::Native => compile_function(crate::x64::X64Emitter::new(), def)?,
            #[cfg(not(all(target_arch = "x86_64", unix)))]
            Backend::Native => return Err(CompileError::UnsupportedTarget),
            Backend::Cranelift => compile_function(CraneliftEmitter::new(), def)?,
        };
        debug!(
            "compiled `{}` with {} parameter(s) on the {:?} backend",
            def.name(),
            def.arity(),
            backend
        );
        // SAFETY: both backends emit a System V function taking `def.arity()`
        // f64 arguments, and `check_compilable` matched that against `S::ARITY`.
        let func = unsafe { S::from_code(entry) };
        Ok(Self {
            func,
            params: def.params().to_vec(),
            backend,
            _code: owner,
        })
    }

    /// Parses `source` and compiles it with the default backend.
    pub fn from_source(source: &str) -> Result<Self, Error> {
        let node = parse_str(source)?;
        Ok(Self::compile(&node)?)
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    pub fn arity(&self) -> usize {
        S::ARITY
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// Calls the compiled code with arguments taken from a slice.
    pub fn call_slice(&self, args: &[f64]) -> Result<f64, EvalError> {
        self.func.invoke(args).ok_or(EvalError::ArityMismatch {
            expected: S::ARITY,
            found: args.len(),
        })
    }

    /// The raw function pointer.
    ///
    /// # Safety
    ///
    /// The pointer dangles once `self` is dropped; the caller must not call it
    /// after that.
    pub unsafe fn as_fn(&self) -> S {
        self.func
    }
}

impl<S: Signature> fmt::Debug for JitFunction<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JitFunction")
            .field("params", &self.params)
            .field("backend", &self.backend)
            .finish_non_exhaustive()
    }
}

macro_rules! typed_call {
    ($($name:ident($($arg:ident),*);)*) => {$(
        impl JitFunction<$name> {
            pub fn call(&self, $($arg: f64),*) -> f64 {
                (self.func)($($arg),*)
            }
        }
    )*};
}

typed_call! {
    Fn0();
    Fn1(a0);
    Fn2(a0, a1);
    Fn3(a0, a1, a2);
    Fn4(a0, a1, a2, a3);
    Fn5(a0, a1, a2, a3, a4);
    Fn6(a0, a1, a2, a3, a4, a5);
    Fn7(a0, a1, a2, a3, a4, a5, a6);
    Fn8(a0, a1, a2, a3, a4, a5, a6, a7);
}
