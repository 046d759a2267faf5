//! Process-group signaling primitives
//!
//! Non-blocking OS calls only: a signal-0 liveness probe and a graceful
//! SIGTERM addressed to the negated process-group id so children spawned by
//! the command are reached too.

use std::io;

/// Result of attempting to signal a process group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalOutcome {
    /// Signal accepted by the kernel
    Delivered,
    /// ESRCH: the process group no longer exists
    NoSuchProcess,
}

/// Probe whether a process with the given pid is still alive.
///
/// EPERM counts as alive: the process exists even if we may not signal it.
#[cfg(unix)]
pub fn process_alive(pid: i32) -> bool {
    if pid <= 0 {
        return false;
    }
    let rc = unsafe { libc::kill(pid, 0) };
    if rc == 0 {
        return true;
    }
    io::Error::last_os_error().raw_os_error() != Some(libc::ESRCH)
}

/// Send SIGTERM to the whole process group led by `pgid`.
///
/// ESRCH is reported as an outcome, not an error: a vanished group is an
/// expected terminal condition. Any other failure (e.g. permission) is
/// returned so the caller can surface it and retry.
#[cfg(unix)]
pub fn terminate_group(pgid: i32) -> io::Result<SignalOutcome> {
    let rc = unsafe { libc::kill(-pgid, libc::SIGTERM) };
    if rc == 0 {
        return Ok(SignalOutcome::Delivered);
    }
    let err = io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::ESRCH) {
        Ok(SignalOutcome::NoSuchProcess)
    } else {
        Err(err)
    }
}

#[cfg(not(unix))]
pub fn process_alive(_pid: i32) -> bool {
    false
}

#[cfg(not(unix))]
pub fn terminate_group(_pgid: i32) -> io::Result<SignalOutcome> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "process-group signaling requires a unix platform",
    ))
}
