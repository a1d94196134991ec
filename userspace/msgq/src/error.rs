// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Error taxonomy shared by every message queue operation.

use thiserror::Error;

use crate::config::ConfigError;
use crate::usercopy::TransferError;

/// Result alias for message queue operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Errors surfaced to callers of the message queue subsystem.
///
/// Every variant is returned only after partial state has been unwound: no
/// header or segment claimed by the failing call stays allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    /// Malformed identifier, message type below one, or illegal capacity.
    #[error("invalid argument")]
    InvalidArgument,
    /// No queue is registered under the requested key.
    #[error("no queue for key")]
    NotFound,
    /// Identifier names a slot that is free or belongs to a later incarnation.
    #[error("stale queue identifier")]
    Stale,
    /// Queue vanished while the caller was blocked on it.
    #[error("queue removed")]
    Removed,
    /// Exclusive create collided with an existing queue.
    #[error("queue already exists")]
    AlreadyExists,
    /// Mode bits deny the requested access.
    #[error("permission denied")]
    PermissionDenied,
    /// Caller lacks the privilege required, or IPC is gated off for it.
    #[error("operation not permitted")]
    NotPermitted,
    /// No free table slot is available.
    #[error("out of queue resources")]
    OutOfResources,
    /// Non-blocking send could not be admitted immediately.
    #[error("operation would block")]
    WouldBlock,
    /// Non-blocking receive found no eligible message.
    #[error("no message of the desired type")]
    NoMessage,
    /// Blocking wait was interrupted.
    #[error("interrupted")]
    Interrupted,
    /// Receive buffer is smaller than the message and truncation was not requested.
    #[error("message too large for receive buffer")]
    MessageTooLarge,
    /// Payload copy across the user boundary failed.
    #[error("payload transfer failed: {0}")]
    PayloadTransferFailed(#[from] TransferError),
    /// Shutdown refused while queues are still allocated or in use.
    #[error("subsystem busy")]
    Busy,
    /// Subsystem has been shut down.
    #[error("subsystem offline")]
    Offline,
}

/// Classic SVID errno values (BSD numbering).
pub mod errno {
    /// Operation not permitted.
    pub const EPERM: i32 = 1;
    /// No such key.
    pub const ENOENT: i32 = 2;
    /// Interrupted wait.
    pub const EINTR: i32 = 4;
    /// Message larger than the receive buffer.
    pub const E2BIG: i32 = 7;
    /// Mode bits deny access.
    pub const EACCES: i32 = 13;
    /// Bad user address.
    pub const EFAULT: i32 = 14;
    /// Resource busy.
    pub const EBUSY: i32 = 16;
    /// Key already exists.
    pub const EEXIST: i32 = 17;
    /// Invalid argument.
    pub const EINVAL: i32 = 22;
    /// No table slot left.
    pub const ENOSPC: i32 = 28;
    /// Would block.
    pub const EAGAIN: i32 = 35;
    /// Facility unavailable.
    pub const ENOSYS: i32 = 78;
    /// Identifier removed.
    pub const EIDRM: i32 = 82;
    /// No message of the desired type.
    pub const ENOMSG: i32 = 83;
}

impl Error {
    /// Returns the errno a syscall front-end would report for this error.
    pub const fn errno(self) -> i32 {
        match self {
            Self::InvalidArgument | Self::Stale => errno::EINVAL,
            Self::NotFound => errno::ENOENT,
            Self::Removed => errno::EIDRM,
            Self::AlreadyExists => errno::EEXIST,
            Self::PermissionDenied => errno::EACCES,
            Self::NotPermitted => errno::EPERM,
            Self::OutOfResources => errno::ENOSPC,
            Self::WouldBlock => errno::EAGAIN,
            Self::NoMessage => errno::ENOMSG,
            Self::Interrupted => errno::EINTR,
            Self::MessageTooLarge => errno::E2BIG,
            Self::PayloadTransferFailed(_) => errno::EFAULT,
            Self::Busy => errno::EBUSY,
            Self::Offline => errno::ENOSYS,
        }
    }
}

/// Failures while bringing the subsystem up.
#[derive(Debug, Error)]
pub enum StartupError {
    /// Limits failed validation.
    #[error("invalid limits: {0}")]
    Config(#[from] ConfigError),
    /// Backing storage for a pool could not be reserved.
    #[error("cannot allocate {pool} pool ({len} entries)")]
    Allocation {
        /// Pool that failed.
        pool: &'static str,
        /// Requested entry count.
        len: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_and_invalid_share_einval() {
        assert_eq!(Error::Stale.errno(), errno::EINVAL);
        assert_eq!(Error::InvalidArgument.errno(), errno::EINVAL);
        assert_eq!(Error::Removed.errno(), errno::EIDRM);
    }

    #[test]
    fn transfer_error_converts() {
        let err: Error = TransferError { offset: 12 }.into();
        assert_eq!(err, Error::PayloadTransferFailed(TransferError { offset: 12 }));
        assert_eq!(err.errno(), errno::EFAULT);
    }
}
