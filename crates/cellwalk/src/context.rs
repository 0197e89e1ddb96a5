//! Evaluation context configuration

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Configuration for an evaluator.
///
/// Counters driven by this configuration (ticks, the interrupt countdown,
/// call depth) live in each [`Evaluator`](crate::Evaluator), so several
/// evaluators can run side by side with different settings.
#[derive(Debug, Clone)]
pub struct EvalContext {
    /// Maximum number of nested action invocations
    pub max_call_depth: usize,

    /// Interrupt flag - set to true to abort evaluation
    pub interrupt: Arc<AtomicBool>,

    /// Steps between checks of the interrupt flag
    pub signal_interval: u32,

    /// Whether to emit per-step trace events
    pub trace: bool,
}

impl Default for EvalContext {
    fn default() -> Self {
        Self {
            max_call_depth: 128,
            interrupt: Arc::new(AtomicBool::new(false)),
            signal_interval: 64,
            trace: false,
        }
    }
}

impl EvalContext {
    /// Create a new context with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context with a custom call depth limit.
    pub fn with_max_call_depth(max_depth: usize) -> Self {
        Self {
            max_call_depth: max_depth,
            ..Default::default()
        }
    }

    /// Builder: check the interrupt flag every `interval` steps.
    pub fn signal_interval(mut self, interval: u32) -> Self {
        self.signal_interval = interval.max(1);
        self
    }

    /// Builder: turn per-step tracing on or off.
    pub fn trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    /// Check if evaluation has been interrupted.
    pub fn is_interrupted(&self) -> bool {
        self.interrupt.load(Ordering::Relaxed)
    }

    /// Request interruption of evaluation.
    pub fn interrupt(&self) {
        self.interrupt.store(true, Ordering::Relaxed);
    }

    /// Reset the interrupt flag.
    pub fn reset_interrupt(&self) {
        self.interrupt.store(false, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interrupt_round_trip() {
        let ctx = EvalContext::new();
        assert!(!ctx.is_interrupted());
        ctx.interrupt();
        assert!(ctx.is_interrupted());
        ctx.reset_interrupt();
        assert!(!ctx.is_interrupted());
    }

    #[test]
    fn test_signal_interval_never_zero() {
        let ctx = EvalContext::new().signal_interval(0);
        assert_eq!(ctx.signal_interval, 1);
    }
}
