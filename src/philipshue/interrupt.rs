//! Interrupts that arrive while a command is running.
//!
//! The line editor turns Ctrl-C at the prompt into [`crate::input::ReadOutcome::Interrupted`].
//! While a command is being evaluated the terminal is in cooked mode, so Ctrl-C arrives as
//! SIGINT instead. The binary's signal handler calls [`InterruptFlag::raise`]; when a command
//! is in flight the signal is recorded and the session drops that command's result.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct InterruptFlag {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    armed: AtomicBool,
    raised: AtomicBool,
}

impl InterruptFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the start of a command; clears any earlier interrupt.
    pub fn arm(&self) {
        self.inner.raised.store(false, Ordering::SeqCst);
        self.inner.armed.store(true, Ordering::SeqCst);
    }

    /// Marks the end of a command. Returns true if it was interrupted.
    pub fn disarm(&self) -> bool {
        self.inner.armed.store(false, Ordering::SeqCst);
        self.inner.raised.swap(false, Ordering::SeqCst)
    }

    /// Records an interrupt. Returns false when no command is running, in which case the
    /// caller decides what the signal means.
    pub fn raise(&self) -> bool {
        if self.inner.armed.load(Ordering::SeqCst) {
            self.inner.raised.store(true, Ordering::SeqCst);
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raise_only_counts_while_armed() {
        let flag = InterruptFlag::new();
        assert!(!flag.raise());

        flag.arm();
        assert!(!flag.disarm());

        flag.arm();
        assert!(flag.clone().raise());
        assert!(flag.disarm());
        assert!(!flag.disarm());
    }

    #[test]
    fn test_arm_clears_a_stale_interrupt() {
        let flag = InterruptFlag::new();
        flag.arm();
        flag.raise();
        flag.arm();
        assert!(!flag.disarm());
    }
}
