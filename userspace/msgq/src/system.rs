// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Process-wide message queue context and queue table
//! OWNERS: @runtime
//! PUBLIC API: MsgSystem::{start, start_with, create_or_lookup, decode, dump,
//!   pool_usage, interrupt, shutdown}
//! INVARIANTS:
//!   - One mutex guards the table and both pools; payload copies run unlocked
//!   - Each slot has its own wait channel; wakeups are broadcast
//!   - Shutdown only with every slot free and unmarked, no parked caller and full pools

use log::{debug, info};
use parking_lot::{Condvar, Mutex, MutexGuard};

use crate::clock::{Clock, SystemClock};
use crate::config::Limits;
use crate::cred::{Caller, Signal};
use crate::error::{Error, Result, StartupError};
use crate::flags::GetFlags;
use crate::header::{HeaderIndex, HeaderPool};
use crate::id::{Key, MsqId, SEQ_MASK};
use crate::perm::{Access, Authority, IpcPerm, UnixAuthority, MODE_MASK};
use crate::queue::{QueueDescriptor, QueueStat, Ticket};
use crate::segment::SegmentPool;

pub(crate) struct State {
    pub(crate) queues: Vec<QueueDescriptor>,
    pub(crate) segments: SegmentPool,
    pub(crate) headers: HeaderPool,
    next_ticket: Ticket,
    /// Callers parked on a wait channel.
    waiters: usize,
    online: bool,
}

impl State {
    /// Returns a message's segments and then its header to the pools.
    pub(crate) fn free_message(&mut self, idx: HeaderIndex) {
        release_message(&mut self.segments, &mut self.headers, idx);
    }

    pub(crate) fn ticket(&mut self) -> Ticket {
        self.next_ticket += 1;
        self.next_ticket
    }

    /// Resolves `id` to a live slot.
    pub(crate) fn decode(&self, id: MsqId) -> Result<usize> {
        let slot = id.index();
        let Some(queue) = self.queues.get(slot) else {
            debug!("msqid {} out of range (0<=slot<{})", id, self.queues.len());
            return Err(Error::InvalidArgument);
        };
        if !queue.is_allocated() {
            debug!("msqid {}: no such queue", id);
            return Err(Error::Stale);
        }
        if queue.perm.seq != id.seq() {
            debug!("msqid {}: wrong sequence (current {})", id, queue.perm.seq);
            return Err(Error::Stale);
        }
        Ok(slot)
    }
}

pub(crate) fn release_message(segments: &mut SegmentPool, headers: &mut HeaderPool, idx: HeaderIndex) {
    let header = *headers.get(idx);
    segments.release_chain(header.spot, header.len);
    headers.release(idx);
}

/// Free-list occupancy of the two pools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct PoolUsage {
    /// Segments on the free list.
    pub free_segments: usize,
    /// Segments in the arena.
    pub total_segments: usize,
    /// Headers on the free list.
    pub free_headers: usize,
    /// Headers in the pool.
    pub total_headers: usize,
}

/// Message queue subsystem: queue table, segment pool and header pool.
///
/// Share it between threads behind an `Arc`; every operation takes the
/// caller's identity explicitly.
pub struct MsgSystem<A = UnixAuthority, C = SystemClock> {
    pub(crate) limits: Limits,
    pub(crate) state: Mutex<State>,
    wakeups: Vec<Condvar>,
    pub(crate) authority: A,
    pub(crate) clock: C,
}

impl MsgSystem {
    /// Starts a subsystem with classic permission rules and the system clock.
    pub fn start(limits: Limits) -> core::result::Result<Self, StartupError> {
        Self::start_with(limits, UnixAuthority, SystemClock)
    }
}

impl<A: Authority, C: Clock> MsgSystem<A, C> {
    /// Validates `limits` and allocates every pool up front.
    pub fn start_with(
        limits: Limits,
        authority: A,
        clock: C,
    ) -> core::result::Result<Self, StartupError> {
        limits.validate()?;
        let segments = SegmentPool::new(limits.segment_size, limits.segment_count)?;
        let headers = HeaderPool::new(limits.max_headers)?;
        let mut queues = Vec::new();
        queues
            .try_reserve_exact(limits.max_queues)
            .map_err(|_| StartupError::Allocation { pool: "queue table", len: limits.max_queues })?;
        queues.extend((0..limits.max_queues).map(|_| QueueDescriptor::vacant()));
        let wakeups = (0..limits.max_queues).map(|_| Condvar::new()).collect();
        info!(
            "msgq: started ({} queues, {} headers, {}x{} byte segments)",
            limits.max_queues, limits.max_headers, limits.segment_count, limits.segment_size
        );
        Ok(Self {
            limits,
            state: Mutex::new(State { queues, segments, headers, next_ticket: 0, waiters: 0, online: true }),
            wakeups,
            authority,
            clock,
        })
    }

    /// Limits this instance was started with.
    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Gate check and lock acquisition shared by every operation.
    pub(crate) fn enter(&self, caller: &Caller) -> Result<MutexGuard<'_, State>> {
        if !self.authority.ipc_allowed(&caller.cred) {
            return Err(Error::NotPermitted);
        }
        let state = self.state.lock();
        if !state.online {
            return Err(Error::Offline);
        }
        Ok(state)
    }

    /// Blocks on `slot`'s wait channel; a pending or arriving signal aborts the wait.
    pub(crate) fn sleep(
        &self,
        state: &mut MutexGuard<'_, State>,
        slot: usize,
        caller: &Caller,
    ) -> Result<()> {
        if caller.signal.take() {
            return Err(Error::Interrupted);
        }
        debug!("msgq: pid {} sleeping on slot {}", caller.pid, slot);
        state.waiters += 1;
        self.wakeups[slot].wait(state);
        state.waiters -= 1;
        if caller.signal.take() {
            debug!("msgq: pid {} interrupted", caller.pid);
            return Err(Error::Interrupted);
        }
        Ok(())
    }

    /// Wakes every caller blocked on `slot`.
    pub(crate) fn wakeup(&self, slot: usize) {
        self.wakeups[slot].notify_all();
    }

    /// Raises `signal` and wakes all waiters so its owner observes the interruption.
    pub fn interrupt(&self, signal: &Signal) {
        signal.raise();
        let _state = self.state.lock();
        for channel in &self.wakeups {
            channel.notify_all();
        }
    }

    /// Returns the identifier for `key`, creating the queue when asked to.
    ///
    /// An existing key requires the owner-relative access in `mode & 0o700`.
    /// A new queue gets `mode & 0o777`, the caller as creator and owner, and
    /// the default byte capacity.
    pub fn create_or_lookup(
        &self,
        caller: &Caller,
        key: Key,
        flags: GetFlags,
        mode: u16,
    ) -> Result<MsqId> {
        let mut state = self.enter(caller)?;
        if key != Key::Private {
            let found = state.queues.iter().position(|q| q.is_allocated() && q.perm.key == key);
            if let Some(slot) = found {
                if flags.contains(GetFlags::CREATE | GetFlags::EXCLUSIVE) {
                    debug!("msgget {:?}: not exclusive", key);
                    return Err(Error::AlreadyExists);
                }
                let perm = state.queues[slot].perm;
                self.authority.check(&perm, &caller.cred, Access::Mode(mode & 0o700))?;
                return Ok(MsqId::new(slot, perm.seq));
            }
        }
        if key != Key::Private && !flags.contains(GetFlags::CREATE) {
            debug!("msgget {:?}: not found and not asked to create", key);
            return Err(Error::NotFound);
        }

        // A free slot may still be marked by a sender unwinding from a removal.
        let Some(slot) =
            state.queues.iter().position(|q| !q.is_allocated() && !q.mutation.is_locked())
        else {
            debug!("msgget {:?}: no free queue slots", key);
            return Err(Error::OutOfResources);
        };
        let now = self.clock.now();
        let queue = &mut state.queues[slot];
        let seq = (queue.perm.seq + 1) & SEQ_MASK;
        *queue = QueueDescriptor::vacant();
        queue.perm = IpcPerm {
            key,
            cuid: caller.cred.uid,
            cgid: caller.cred.gid,
            uid: caller.cred.uid,
            gid: caller.cred.gid,
            mode: mode & MODE_MASK,
            seq,
        };
        queue.qbytes = self.limits.max_queue_bytes;
        queue.ctime = now;
        let id = MsqId::new(slot, seq);
        info!("msgq: created queue {} (slot {}, key {:?})", id, slot, key);
        Ok(id)
    }

    /// Resolves `id` to its table slot.
    pub fn decode(&self, id: MsqId) -> Result<usize> {
        let state = self.state.lock();
        if !state.online {
            return Err(Error::Offline);
        }
        state.decode(id)
    }

    /// Snapshot of every table slot, free ones included.
    pub fn dump(&self) -> Vec<QueueStat> {
        let state = self.state.lock();
        if !state.online {
            return Vec::new();
        }
        state.queues.iter().enumerate().map(|(slot, q)| q.snapshot(slot)).collect()
    }

    /// Current pool occupancy.
    pub fn pool_usage(&self) -> PoolUsage {
        let state = self.state.lock();
        PoolUsage {
            free_segments: state.segments.free_count(),
            total_segments: state.segments.capacity(),
            free_headers: state.headers.free_count(),
            total_headers: state.headers.capacity(),
        }
    }

    /// Releases the pools if nothing is in use; later calls fail `Offline`.
    pub fn shutdown(&self) -> Result<()> {
        let mut state = self.state.lock();
        if !state.online {
            return Err(Error::Offline);
        }
        // A woken waiter still indexes its slot, so the table must outlive it.
        let busy = state.waiters != 0
            || state.queues.iter().any(|q| q.is_allocated() || q.mutation.is_locked())
            || state.headers.free_count() != state.headers.capacity()
            || state.segments.free_count() != state.segments.capacity();
        if busy {
            debug!("msgq: shutdown refused, queues in use");
            return Err(Error::Busy);
        }
        state.online = false;
        state.queues = Vec::new();
        state.segments = SegmentPool::empty(self.limits.segment_size);
        state.headers = HeaderPool::empty();
        info!("msgq: shut down");
        Ok(())
    }
}
