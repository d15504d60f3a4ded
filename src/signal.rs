//! Interrupt handling for scan cancellation.
//!
//! The interrupt handler never talks to the device. It only raises a
//! [`CancelFlag`], which the acquisition loop polls between chunk reads and
//! turns into a device cancel on the acquisition thread.
//!
//! A second interrupt while a cancellation is still pending terminates the
//! process immediately, without cleanup. This is the way out when a device
//! stops responding to cancel requests.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use crate::error::Result;

/// Exit code used when the process is terminated by a second interrupt.
/// Unix convention: 128 + SIGINT.
pub const EXIT_CODE_INTERRUPTED: i32 = 130;

/// What an interrupt should do, given the current cancellation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptAction {
    /// First interrupt: the flag was raised, the scan will be cancelled.
    Cancel,
    /// A cancellation was already pending: terminate now.
    Terminate,
}

/// Shared "cancel requested" flag.
///
/// Cloning shares the flag.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    flag: Arc<AtomicBool>,
}

impl CancelFlag {
    /// New flag, not raised.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether cancellation has been requested.
    #[must_use]
    pub fn is_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Request cancellation.
    pub fn request(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Clear the flag so the next scan can run.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }

    /// Record an interrupt and decide what to do about it.
    ///
    /// Only touches the atomic flag, so it is safe to call from a signal
    /// context.
    #[must_use]
    pub fn on_interrupt(&self) -> InterruptAction {
        if self.flag.swap(true, Ordering::SeqCst) {
            InterruptAction::Terminate
        } else {
            InterruptAction::Cancel
        }
    }
}

static GLOBAL_FLAG: OnceLock<CancelFlag> = OnceLock::new();

/// Install the process interrupt handler (SIGINT, SIGTERM, SIGHUP).
///
/// Returns the flag the handler raises. Calling this again returns the
/// already installed flag, reset.
pub fn install_handler() -> Result<CancelFlag> {
    if let Some(flag) = GLOBAL_FLAG.get() {
        flag.reset();
        return Ok(flag.clone());
    }

    let flag = CancelFlag::new();
    let handler_flag = flag.clone();

    ctrlc::set_handler(move || match handler_flag.on_interrupt() {
        InterruptAction::Cancel => {
            let _ = writeln!(std::io::stderr(), "\nInterrupted. Stopping scanner...");
            let _ = std::io::stderr().flush();
        }
        InterruptAction::Terminate => {
            let _ = writeln!(std::io::stderr(), "\nAborting");
            std::process::exit(EXIT_CODE_INTERRUPTED);
        }
    })?;

    let _ = GLOBAL_FLAG.set(flag.clone());
    log::debug!("Interrupt handler installed");
    Ok(flag)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_flag_not_requested() {
        let flag = CancelFlag::new();
        assert!(!flag.is_requested());
    }

    #[test]
    fn test_request_and_reset() {
        let flag = CancelFlag::new();
        flag.request();
        assert!(flag.is_requested());
        flag.reset();
        assert!(!flag.is_requested());
    }

    #[test]
    fn test_clone_shares_flag() {
        let flag = CancelFlag::new();
        let cloned = flag.clone();
        flag.request();
        assert!(cloned.is_requested());
    }

    #[test]
    fn test_first_interrupt_cancels() {
        let flag = CancelFlag::new();
        assert_eq!(flag.on_interrupt(), InterruptAction::Cancel);
        assert!(flag.is_requested());
    }

    #[test]
    fn test_second_interrupt_terminates() {
        let flag = CancelFlag::new();
        assert_eq!(flag.on_interrupt(), InterruptAction::Cancel);
        assert_eq!(flag.on_interrupt(), InterruptAction::Terminate);
        assert_eq!(flag.on_interrupt(), InterruptAction::Terminate);
    }

    #[test]
    fn test_interrupt_after_reset_cancels_again() {
        let flag = CancelFlag::new();
        let _ = flag.on_interrupt();
        flag.reset();
        assert_eq!(flag.on_interrupt(), InterruptAction::Cancel);
    }

    #[test]
    fn test_exit_code_interrupted() {
        assert_eq!(EXIT_CODE_INTERRUPTED, 130);
    }

    #[test]
    fn test_cancel_flag_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CancelFlag>();
    }
}
