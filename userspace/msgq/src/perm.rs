// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Ownership record and permission checks for queues
//! PUBLIC API: IpcPerm, Access, Authority, UnixAuthority
//! INVARIANTS: Manage access only for owner, creator or privileged callers;
//!   mode bits checked owner, then group, then other

use serde::Serialize;

use crate::cred::Credentials;
use crate::error::{Error, Result};
use crate::id::Key;

/// Owner read bit.
pub const MODE_READ: u16 = 0o400;
/// Owner write bit.
pub const MODE_WRITE: u16 = 0o200;
/// Bits a caller may set on a queue.
pub const MODE_MASK: u16 = 0o777;

/// Ownership and mode of one queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IpcPerm {
    /// Key the queue was created under.
    pub key: Key,
    /// Creator uid.
    pub cuid: u32,
    /// Creator gid.
    pub cgid: u32,
    /// Owner uid.
    pub uid: u32,
    /// Owner gid.
    pub gid: u32,
    /// Access mode, low nine bits.
    pub mode: u16,
    /// Reuse sequence of the slot.
    pub seq: u16,
}

impl IpcPerm {
    pub(crate) const fn vacant() -> Self {
        Self { key: Key::Private, cuid: 0, cgid: 0, uid: 0, gid: 0, mode: 0, seq: 0 }
    }

    fn owned_by(&self, cred: &Credentials) -> bool {
        cred.uid == self.uid || cred.uid == self.cuid
    }
}

/// Access requested against a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Owner-relative mode bits (`0o400` read, `0o200` write); zero always passes.
    Mode(u16),
    /// Administrative change (set limits, remove).
    Manage,
}

impl Access {
    /// Read access.
    pub const READ: Self = Self::Mode(MODE_READ);
    /// Write access.
    pub const WRITE: Self = Self::Mode(MODE_WRITE);
}

/// Credential primitive consulted before any queue state is touched.
pub trait Authority: Send + Sync {
    /// Grants or denies `access` to `perm` for `cred`.
    fn check(&self, perm: &IpcPerm, cred: &Credentials, access: Access) -> Result<()>;

    /// Returns true when `cred` may exceed ordinary limits.
    fn is_privileged(&self, cred: &Credentials) -> bool;

    /// Gate evaluated before every operation; `false` yields `NotPermitted`.
    fn ipc_allowed(&self, _cred: &Credentials) -> bool {
        true
    }
}

/// Classic owner/group/other rules with uid 0 as the privileged user.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnixAuthority;

impl Authority for UnixAuthority {
    fn check(&self, perm: &IpcPerm, cred: &Credentials, access: Access) -> Result<()> {
        if self.is_privileged(cred) {
            return Ok(());
        }
        let wanted = match access {
            Access::Manage => {
                return if perm.owned_by(cred) { Ok(()) } else { Err(Error::NotPermitted) };
            }
            Access::Mode(bits) => bits & 0o700,
        };
        let granted = if perm.owned_by(cred) {
            perm.mode & 0o700
        } else if cred.in_group(perm.gid) || cred.in_group(perm.cgid) {
            (perm.mode & 0o070) << 3
        } else {
            (perm.mode & 0o007) << 6
        };
        if granted & wanted == wanted {
            Ok(())
        } else {
            Err(Error::PermissionDenied)
        }
    }

    fn is_privileged(&self, cred: &Credentials) -> bool {
        cred.uid == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn perm(mode: u16) -> IpcPerm {
        IpcPerm { key: Key::Public(1), cuid: 100, cgid: 10, uid: 200, gid: 20, mode, seq: 1 }
    }

    #[test]
    fn owner_group_other_bits() {
        let auth = UnixAuthority;
        let p = perm(0o640);
        assert!(auth.check(&p, &Credentials::new(200, 99), Access::WRITE).is_ok());
        assert!(auth.check(&p, &Credentials::new(100, 99), Access::READ).is_ok());
        assert!(auth.check(&p, &Credentials::new(300, 20), Access::READ).is_ok());
        assert_eq!(
            auth.check(&p, &Credentials::new(300, 20), Access::WRITE),
            Err(Error::PermissionDenied)
        );
        assert_eq!(
            auth.check(&p, &Credentials::new(300, 30), Access::READ),
            Err(Error::PermissionDenied)
        );
    }

    #[test]
    fn creator_group_counts_as_group() {
        let auth = UnixAuthority;
        let cred = Credentials { uid: 300, gid: 1, groups: vec![10] };
        assert!(auth.check(&perm(0o040), &cred, Access::READ).is_ok());
    }

    #[test]
    fn manage_needs_owner_or_creator() {
        let auth = UnixAuthority;
        let p = perm(0o777);
        assert!(auth.check(&p, &Credentials::new(100, 0), Access::Manage).is_ok());
        assert!(auth.check(&p, &Credentials::new(200, 0), Access::Manage).is_ok());
        assert_eq!(
            auth.check(&p, &Credentials::new(300, 20), Access::Manage),
            Err(Error::NotPermitted)
        );
        assert!(auth.check(&p, &Credentials::new(0, 0), Access::Manage).is_ok());
    }

    proptest! {
        #[test]
        fn empty_request_always_passes(mode in 0u16..0o1000, uid in 1u32..1000, gid in 1u32..1000) {
            let auth = UnixAuthority;
            prop_assert!(auth.check(&perm(mode), &Credentials::new(uid, gid), Access::Mode(0)).is_ok());
        }

        #[test]
        fn root_bypasses_mode(mode in 0u16..0o1000) {
            let auth = UnixAuthority;
            prop_assert!(auth.check(&perm(mode), &Credentials::new(0, 0), Access::WRITE).is_ok());
        }
    }
}
