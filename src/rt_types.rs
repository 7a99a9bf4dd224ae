/// Native signature of a compiled function: `N` `f64` arguments, one `f64` result.
///
/// Implemented for the `extern "C"` function pointer types [`Fn0`] through
/// [`Fn8`]; the arity is checked against the function definition when the
/// [`JitFunction`](crate::JitFunction) is built.
///
/// # Safety
///
/// Implementors must be function pointer types whose ABI matches the code the
/// JIT emits for `ARITY` parameters.
pub unsafe trait Signature: Copy + Send + Sync + 'static {
    const ARITY: usize;

    /// Reinterprets the entry point of finalized code.
    ///
    /// # Safety
    ///
    /// `code` must point at executable code following this signature.
    unsafe fn from_code(code: *const u8) -> Self;

    /// Calls through the pointer with arguments taken from a slice.
    /// Returns `None` if `args.len() != ARITY`.
    fn invoke(self, args: &[f64]) -> Option<f64>;
}

macro_rules! signatures {
    (@f64 $arg:ident) => { f64 };
    (@count) => { 0 };
    (@count $head:ident $($tail:ident)*) => { 1 + signatures!(@count $($tail)*) };
    ($($(#[$meta:meta])* $name:ident($($arg:ident),*);)*) => {$(
        $(#[$meta])*
        pub type $name = extern "C" fn($(signatures!(@f64 $arg)),*) -> f64;

        unsafe impl Signature for $name {
            const ARITY: usize = signatures!(@count $($arg)*);

            unsafe fn from_code(code: *const u8) -> Self {
                unsafe { std::mem::transmute::<*const u8, $name>(code) }
            }

            #[allow(unused_variables)]
            fn invoke(self, args: &[f64]) -> Option<f64> {
                match *args {
                    [$($arg),*] => Some(self($($arg),*)),
                    _ => None,
                }
            }
        }
    )*};
}

signatures! {
    /// `() -> f64`
    Fn0();
    /// `(f64) -> f64`
    Fn1(a0);
    Fn2(a0, a1);
    Fn3(a0, a1, a2);
    Fn4(a0, a1, a2, a3);
    Fn5(a0, a1, a2, a3, a4);
    Fn6(a0, a1, a2, a3, a4, a5);
    Fn7(a0, a1, a2, a3, a4, a5, a6);
    Fn8(a0, a1, a2, a3, a4, a5, a6, a7);
}
