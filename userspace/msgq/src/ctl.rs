// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Control operations: stat, set limits, remove.

use log::{debug, info, warn};

use crate::clock::Clock;
use crate::cred::Caller;
use crate::error::{Error, Result};
use crate::fault::consistency_fault;
use crate::id::{MsqId, SEQ_MASK};
use crate::perm::{Access, Authority, MODE_MASK};
use crate::queue::QueueStat;
use crate::system::{release_message, MsgSystem};

/// New ownership, mode and capacity for [`MsgSystem::set_limits`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueSettings {
    /// Byte capacity; clamped to the configured ceiling without privilege.
    pub qbytes: usize,
    /// New owner uid.
    pub uid: u32,
    /// New owner gid.
    pub gid: u32,
    /// New mode; only the low nine bits are applied.
    pub mode: u16,
}

impl QueueSettings {
    /// Current settings of a queue, as a base for edits.
    pub fn from_stat(stat: &QueueStat) -> Self {
        Self { qbytes: stat.qbytes, uid: stat.perm.uid, gid: stat.perm.gid, mode: stat.perm.mode }
    }
}

impl<A: Authority, C: Clock> MsgSystem<A, C> {
    /// Snapshot of `id`; needs read access.
    pub fn stat(&self, caller: &Caller, id: MsqId) -> Result<QueueStat> {
        let state = self.enter(caller)?;
        let slot = state.decode(id)?;
        let queue = &state.queues[slot];
        self.authority.check(&queue.perm, &caller.cred, Access::READ)?;
        Ok(queue.snapshot(slot))
    }

    /// Changes owner, mode and capacity of `id`; needs owner or creator.
    ///
    /// Without privilege a capacity above the configured ceiling is clamped to it.
    pub fn set_limits(&self, caller: &Caller, id: MsqId, settings: QueueSettings) -> Result<()> {
        let mut state = self.enter(caller)?;
        let slot = state.decode(id)?;
        let now = self.clock.now();
        let queue = &mut state.queues[slot];
        self.authority.check(&queue.perm, &caller.cred, Access::Manage)?;

        let mut qbytes = settings.qbytes;
        if qbytes > self.limits.max_queue_bytes && !self.authority.is_privileged(&caller.cred) {
            warn!(
                "msgctl {}: capacity {} above ceiling, clamped to {}",
                id, qbytes, self.limits.max_queue_bytes
            );
            qbytes = self.limits.max_queue_bytes;
        }
        if qbytes == 0 {
            debug!("msgctl {}: zero capacity", id);
            return Err(Error::InvalidArgument);
        }

        queue.perm.uid = settings.uid;
        queue.perm.gid = settings.gid;
        queue.perm.mode = (queue.perm.mode & !MODE_MASK) | (settings.mode & MODE_MASK);
        queue.qbytes = qbytes;
        queue.ctime = now;
        self.wakeup(slot);
        Ok(())
    }

    /// Frees every queued message, retires the identifier and wakes all waiters.
    pub fn remove(&self, caller: &Caller, id: MsqId) -> Result<()> {
        let mut state = self.enter(caller)?;
        let slot = state.decode(id)?;
        self.authority.check(&state.queues[slot].perm, &caller.cred, Access::Manage)?;

        let st = &mut *state;
        let queue = &mut st.queues[slot];
        let mut cursor = queue.first.take();
        while let Some(idx) = cursor {
            let header = *st.headers.get(idx);
            cursor = header.next;
            if queue.cbytes < header.len || queue.qnum == 0 {
                consistency_fault!("queue {} accounting underflow during removal", id);
            }
            queue.cbytes -= header.len;
            queue.qnum -= 1;
            release_message(&mut st.segments, &mut st.headers, idx);
        }
        if queue.cbytes != 0 || queue.qnum != 0 {
            consistency_fault!(
                "queue {} not empty after removal ({} bytes, {} msgs)",
                id,
                queue.cbytes,
                queue.qnum
            );
        }
        queue.last = None;
        queue.qbytes = 0;
        queue.perm.seq = (queue.perm.seq + 1) & SEQ_MASK;
        self.wakeup(slot);
        info!("msgq: removed queue {} (slot {})", id, slot);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::Limits;
    use crate::cred::Credentials;
    use crate::flags::{GetFlags, RecvFlags, SendFlags};
    use crate::id::Key;
    use crate::perm::UnixAuthority;

    fn setup() -> (MsgSystem<UnixAuthority, ManualClock>, Caller, MsqId) {
        let sys =
            MsgSystem::start_with(Limits::default(), UnixAuthority, ManualClock::new(100)).unwrap();
        let owner = Caller::new(Credentials::new(5, 5), 1);
        let id = sys.create_or_lookup(&owner, Key::Public(1), GetFlags::CREATE, 0o644).unwrap();
        (sys, owner, id)
    }

    #[test]
    fn stat_needs_read() {
        let (sys, owner, id) = setup();
        let stranger = Caller::new(Credentials::new(9, 9), 2);
        assert_eq!(sys.stat(&stranger, id).unwrap().perm.mode, 0o644);
        let base = QueueSettings::from_stat(&sys.stat(&owner, id).unwrap());
        sys.set_limits(&owner, id, QueueSettings { mode: 0o600, ..base }).unwrap();
        assert_eq!(sys.stat(&stranger, id), Err(Error::PermissionDenied));
    }

    #[test]
    fn ceiling_binds_only_unprivileged_callers() {
        let (sys, owner, id) = setup();
        let base = QueueSettings::from_stat(&sys.stat(&owner, id).unwrap());
        sys.set_limits(&owner, id, QueueSettings { qbytes: 100, ..base }).unwrap();
        assert_eq!(sys.stat(&owner, id).unwrap().qbytes, 100);
        sys.set_limits(&owner, id, QueueSettings { qbytes: 1 << 20, ..base }).unwrap();
        assert_eq!(sys.stat(&owner, id).unwrap().qbytes, 2048);
        sys.set_limits(&Caller::root(3), id, QueueSettings { qbytes: 4096, ..base }).unwrap();
        assert_eq!(sys.stat(&owner, id).unwrap().qbytes, 4096);
    }

    #[test]
    fn zero_capacity_rejected() {
        let (sys, owner, id) = setup();
        let base = QueueSettings::from_stat(&sys.stat(&owner, id).unwrap());
        assert_eq!(
            sys.set_limits(&Caller::root(3), id, QueueSettings { qbytes: 0, ..base }),
            Err(Error::InvalidArgument)
        );
        assert_eq!(sys.stat(&owner, id).unwrap().qbytes, 2048);
    }

    #[test]
    fn set_limits_updates_owner_mode_and_ctime() {
        let (sys, owner, id) = setup();
        sys.clock.advance(50);
        let settings = QueueSettings { qbytes: 1024, uid: 6, gid: 7, mode: 0o7640 };
        sys.set_limits(&owner, id, settings).unwrap();
        let stat = sys.stat(&Caller::root(1), id).unwrap();
        assert_eq!((stat.perm.uid, stat.perm.gid, stat.perm.mode), (6, 7, 0o640));
        assert_eq!((stat.perm.cuid, stat.perm.cgid), (5, 5));
        assert_eq!(stat.ctime, 150);
        // Creator keeps management rights after handing the queue over.
        sys.set_limits(&owner, id, settings).unwrap();
    }

    #[test]
    fn only_owner_or_creator_manages() {
        let (sys, _owner, id) = setup();
        let stranger = Caller::new(Credentials::new(9, 5), 2);
        assert_eq!(sys.remove(&stranger, id), Err(Error::NotPermitted));
    }

    #[test]
    fn remove_frees_messages_and_retires_id() {
        let (sys, owner, id) = setup();
        for mtype in 1..=3 {
            sys.send(&owner, id, mtype, [0u8; 30].as_slice(), SendFlags::empty()).unwrap();
        }
        sys.remove(&owner, id).unwrap();
        let usage = sys.pool_usage();
        assert_eq!(usage.free_segments, usage.total_segments);
        assert_eq!(usage.free_headers, usage.total_headers);
        assert_eq!(sys.stat(&owner, id), Err(Error::Stale));
        assert_eq!(sys.receive_message(&owner, id, 64, 0, RecvFlags::NOWAIT), Err(Error::Stale));

        let again = sys.create_or_lookup(&owner, Key::Public(1), GetFlags::CREATE, 0o644).unwrap();
        assert_eq!(again.index(), id.index());
        assert_ne!(again, id);
        assert_eq!(again.seq(), id.seq() + 2);
    }
}
