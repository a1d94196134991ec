// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Request flags for the queue operations.

use bitflags::bitflags;

bitflags! {
    #[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
    /// Flags accepted by `create_or_lookup`.
    pub struct GetFlags: u32 {
        /// Create the queue if the key is unknown.
        const CREATE = 0o1000;
        /// With `CREATE`, fail if the key already exists.
        const EXCLUSIVE = 0o2000;
    }
}

bitflags! {
    #[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
    /// Flags accepted by `send`.
    pub struct SendFlags: u32 {
        /// Fail with `WouldBlock` instead of waiting for resources.
        const NOWAIT = 0o4000;
    }
}

bitflags! {
    #[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
    /// Flags accepted by `receive`.
    pub struct RecvFlags: u32 {
        /// Fail with `NoMessage` instead of waiting.
        const NOWAIT = 0o4000;
        /// Truncate oversized messages instead of failing.
        const NOERROR = 0o10000;
    }
}
