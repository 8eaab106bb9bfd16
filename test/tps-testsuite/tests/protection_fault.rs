//! Scenario: a thread dereferences a raw pointer into its own TPS page
//! outside of `read`/`write`. The page is `PROT_NONE` at that point, so
//! this must fault; the signal handler is expected to print a diagnostic
//! to stderr before the process dies by signal.
//!
//! This has to run out-of-process (via the `tps-demo --fault` binary)
//! since it deliberately crashes -- running it in this test binary would
//! take the whole suite down with it.

use std::os::unix::process::ExitStatusExt;
use std::process::Command;

#[test]
fn raw_write_through_a_protected_page_is_caught_and_reported() {
    let exe = env!("CARGO_BIN_EXE_tps-demo");
    let output = Command::new(exe)
        .arg("--fault")
        .output()
        .expect("failed to run tps-demo --fault");

    assert!(
        !output.status.success(),
        "tps-demo --fault should not exit successfully"
    );
    assert!(
        output.status.signal() == Some(libc::SIGSEGV) || output.status.signal() == Some(libc::SIGBUS),
        "expected SIGSEGV or SIGBUS, got {:?}",
        output.status
    );

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("TPS protection error!"),
        "expected the fault diagnostic on stderr, got: {stderr}"
    );
}
