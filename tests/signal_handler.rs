//! Process-wide interrupt handler installation.
//!
//! The handler can only be installed once per process, so these tests run
//! serially in their own test binary.

use piescan_capture::signal::{install_handler, InterruptAction};
use serial_test::serial;

#[test]
#[serial]
fn test_install_handler_returns_shared_flag() {
    let first = install_handler().expect("first install should succeed");
    assert!(!first.is_requested());

    first.request();
    let second = install_handler().expect("second install should reuse the handler");
    assert!(!second.is_requested(), "reinstalling resets the flag");
    assert!(!first.is_requested(), "both handles share one flag");
}

#[test]
#[serial]
fn test_installed_flag_escalates() {
    let flag = install_handler().expect("install should succeed");
    assert_eq!(flag.on_interrupt(), InterruptAction::Cancel);
    assert_eq!(flag.on_interrupt(), InterruptAction::Terminate);
    flag.reset();
}
