use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

/// Name-to-value bindings consulted by [`evaluate`](crate::evaluate).
///
/// Implement this trait to evaluate against your own variable storage.
/// Lookups are read-only, so one environment can serve any number of
/// evaluations.
pub trait Environment {
    /// Returns the value bound to `name`, or `None` if it is unbound.
    fn lookup(&self, name: &str) -> Option<f64>;
}

impl<S: BuildHasher> Environment for HashMap<String, f64, S> {
    fn lookup(&self, name: &str) -> Option<f64> {
        self.get(name).copied()
    }
}

impl Environment for BTreeMap<String, f64> {
    fn lookup(&self, name: &str) -> Option<f64> {
        self.get(name).copied()
    }
}

impl Environment for [(&str, f64)] {
    fn lookup(&self, name: &str) -> Option<f64> {
        self.iter().find(|(n, _)| *n == name).map(|&(_, v)| v)
    }
}

impl<const N: usize> Environment for [(&str, f64); N] {
    fn lookup(&self, name: &str) -> Option<f64> {
        self.as_slice().lookup(name)
    }
}

/// An environment with no bindings.
#[derive(Clone, Copy, Debug, Default)]
pub struct EmptyEnv;

impl Environment for EmptyEnv {
    fn lookup(&self, _name: &str) -> Option<f64> {
        None
    }
}

impl<F: Fn(&str) -> Option<f64>> Environment for F {
    fn lookup(&self, name: &str) -> Option<f64> {
        self(name)
    }
}
