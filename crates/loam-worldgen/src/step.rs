//! The generator step abstraction.

use std::fmt;

use crate::context::GeneratorContext;
use crate::error::StepError;

/// One named, ordered stage of chunk generation.
///
/// Steps are shared between worker threads and must be deterministic: the
/// same chunk coordinates, world seed and registry must always produce the
/// same writes. Randomness comes from [`GeneratorContext::rng`].
pub trait GeneratorStep: Send + Sync {
    /// Name used for removal and in error reports.
    fn name(&self) -> &str;

    /// Mutates the chunk behind `ctx`. An error aborts the remaining steps.
    fn generate(&self, ctx: &mut GeneratorContext<'_>) -> Result<(), StepError>;
}

type StepFn = dyn Fn(&mut GeneratorContext<'_>) -> Result<(), StepError> + Send + Sync;

/// A step backed by a closure, for scripted or ad hoc generation logic.
pub struct FnStep {
    name: String,
    func: Box<StepFn>,
}

impl FnStep {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&mut GeneratorContext<'_>) -> Result<(), StepError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Box::new(func),
        }
    }
}

impl GeneratorStep for FnStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn generate(&self, ctx: &mut GeneratorContext<'_>) -> Result<(), StepError> {
        (self.func)(ctx)
    }
}

impl fmt::Debug for FnStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnStep").field("name", &self.name).finish()
    }
}
