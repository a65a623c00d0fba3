// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::io::{Error, ErrorKind};

use crate::RecoveryInfo;

/// Classifies an [`io::Error`][std::io::Error] for use with
/// [`Guard::execute_with`][crate::Guard::execute_with].
///
/// Connection level failures, unreachable hosts or networks, and timeouts are transient and classified as
/// [`RecoveryKind::Retry`][crate::RecoveryKind::Retry]. Everything else (invalid input,
/// missing files, permission errors, ...) is classified as
/// [`RecoveryKind::Never`][crate::RecoveryKind::Never] and is not counted against the dependency.
///
/// # Examples
///
/// ```rust
/// use std::io;
///
/// use bulwark::{RecoveryKind, classify_io_error};
///
/// let reset = io::Error::from(io::ErrorKind::ConnectionReset);
/// assert_eq!(classify_io_error(&reset).kind(), RecoveryKind::Retry);
///
/// let denied = io::Error::from(io::ErrorKind::PermissionDenied);
/// assert_eq!(classify_io_error(&denied).kind(), RecoveryKind::Never);
/// ```
#[must_use]
pub fn classify_io_error(error: &Error) -> RecoveryInfo {
    match error.kind() {
        ErrorKind::TimedOut
        | ErrorKind::ConnectionRefused
        | ErrorKind::ConnectionReset
        | ErrorKind::ConnectionAborted
        | ErrorKind::NotConnected
        | ErrorKind::HostUnreachable
        | ErrorKind::NetworkUnreachable
        | ErrorKind::NetworkDown
        | ErrorKind::BrokenPipe
        | ErrorKind::Interrupted
        | ErrorKind::WouldBlock
        | ErrorKind::UnexpectedEof => RecoveryInfo::retry(),
        _ => RecoveryInfo::never(),
    }
}
