//! The process-wide critical-section gate (C1).

use std::sync::Arc;

use abi::Scheduler;

/// Wraps a [`Scheduler`]'s enter/exit critical section calls in an RAII
/// guard, so every engine operation releases the gate on every return path
/// -- including through `?`.
pub struct Gate {
    scheduler: Arc<dyn Scheduler>,
}

impl Gate {
    pub fn new(scheduler: Arc<dyn Scheduler>) -> Self {
        Self { scheduler }
    }

    #[must_use = "the gate is released when the guard is dropped"]
    pub fn enter(&self) -> GateGuard<'_> {
        self.scheduler.enter_critical_section();
        GateGuard { scheduler: &*self.scheduler }
    }

    pub fn scheduler(&self) -> &Arc<dyn Scheduler> {
        &self.scheduler
    }
}

pub struct GateGuard<'a> {
    scheduler: &'a dyn Scheduler,
}

impl Drop for GateGuard<'_> {
    fn drop(&mut self) {
        self.scheduler.exit_critical_section();
    }
}
