//!
//! src/fallback.rs  Andrew Belles  Oct 3rd, 2026
//!
//! Ordered extraction strategies for a single field. Each adapter
//! declares one chain per drifting field and the first strategy that
//! yields a value wins.
//!

use tracing::trace;

type Strategy<'f, I, O> = Box<dyn Fn(&I) -> Option<O> + 'f>;

pub struct FallbackChain<'f, I: ?Sized, O> {
    field: &'static str,
    steps: Vec<(&'static str, Strategy<'f, I, O>)>
}

impl<'f, I: ?Sized, O> FallbackChain<'f, I, O> {
    pub fn new(field: &'static str) -> Self {
        Self { field, steps: Vec::new() }
    }

    /// Appends a strategy, tried after every strategy already added.
    pub fn or<F>(mut self, name: &'static str, strategy: F) -> Self
    where
        F: Fn(&I) -> Option<O> + 'f
    {
        self.steps.push((name, Box::new(strategy)));
        self
    }

    /// Value of the first strategy that hits, along with its name.
    pub fn resolve_named(&self, input: &I) -> Option<(&'static str, O)> {
        for (name, step) in &self.steps {
            if let Some(value) = step(input) {
                trace!(field = self.field, strategy = *name, "fallback.hit");
                return Some((*name, value));
            }
        }
        trace!(field = self.field, "fallback.miss");
        None
    }

    pub fn resolve(&self, input: &I) -> Option<O> {
        self.resolve_named(input).map(|(_, v)| v)
    }
}
