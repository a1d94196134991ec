// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Caller identity and interruption state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// User and group identity of a caller.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Credentials {
    /// Effective user id.
    pub uid: u32,
    /// Effective group id.
    pub gid: u32,
    /// Supplementary groups.
    pub groups: Vec<u32>,
}

impl Credentials {
    /// Credentials without supplementary groups.
    pub fn new(uid: u32, gid: u32) -> Self {
        Self { uid, gid, groups: Vec::new() }
    }

    /// Returns true when `gid` is the effective or a supplementary group.
    pub fn in_group(&self, gid: u32) -> bool {
        self.gid == gid || self.groups.contains(&gid)
    }
}

/// Pending-interrupt flag shared between a blocked caller and whoever cancels it.
///
/// Raise through [`MsgSystem::interrupt`](crate::MsgSystem::interrupt) so the
/// sleeping thread is woken; a pending signal is consumed by the wait that
/// observes it.
#[derive(Debug, Clone, Default)]
pub struct Signal(Arc<AtomicBool>);

impl Signal {
    /// Creates a signal with nothing pending.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the signal pending without waking anyone.
    pub fn raise(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Returns true if a signal is pending.
    pub fn is_pending(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Consumes a pending signal.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }
}

/// Everything the subsystem needs to know about the calling thread.
#[derive(Debug, Clone)]
pub struct Caller {
    /// Identity used for permission checks.
    pub cred: Credentials,
    /// Process id recorded as last sender or receiver.
    pub pid: u32,
    /// Interruption flag for blocking waits.
    pub signal: Signal,
}

impl Caller {
    /// Builds a caller with a fresh signal.
    pub fn new(cred: Credentials, pid: u32) -> Self {
        Self { cred, pid, signal: Signal::new() }
    }

    /// Privileged caller (uid 0) with the given pid.
    pub fn root(pid: u32) -> Self {
        Self::new(Credentials::new(0, 0), pid)
    }
}
