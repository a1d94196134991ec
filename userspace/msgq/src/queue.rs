// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Queue descriptor, its message list and the sender mutation state
//! PUBLIC API: QueueStat, Mutation
//! INVARIANTS:
//!   - qbytes == 0 iff the slot is free
//!   - cbytes == sum of header lengths on the list; qnum == list length
//!   - at most one sender holds the mutation mark, and only it clears it

use serde::Serialize;

use crate::fault::consistency_fault;
use crate::header::{HeaderIndex, HeaderPool};
use crate::id::MsqId;
use crate::perm::IpcPerm;

/// Identifies one in-flight send call.
pub(crate) type Ticket = u64;

/// Who, if anyone, holds a queue's mid-mutation mark.
///
/// `Idle -> ResourceWait -> Idle` while a blocked sender owns resource
/// negotiation; `Idle -> Admitting -> Idle` while a sender copies its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Mutation {
    /// No sender holds the mark.
    #[default]
    Idle,
    /// A blocked sender reserved the right to claim resources next.
    ResourceWait {
        /// Holding send call.
        owner: u64,
    },
    /// A sender is moving its payload into claimed segments.
    Admitting {
        /// Holding send call.
        owner: u64,
    },
}

impl Mutation {
    /// True while any sender holds the mark.
    pub const fn is_locked(self) -> bool {
        !matches!(self, Self::Idle)
    }
}

/// Selects the next message to receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Selector {
    Head,
    Exact(i64),
    AtMost(i64),
}

impl Selector {
    pub(crate) fn from_raw(raw: i64) -> Self {
        match raw {
            0 => Self::Head,
            t if t > 0 => Self::Exact(t),
            t => Self::AtMost(t.checked_neg().unwrap_or(i64::MAX)),
        }
    }

    fn accepts(self, mtype: i64) -> bool {
        match self {
            Self::Head => true,
            Self::Exact(t) => mtype == t,
            Self::AtMost(t) => mtype <= t,
        }
    }
}

pub(crate) struct QueueDescriptor {
    pub(crate) perm: IpcPerm,
    pub(crate) qbytes: usize,
    pub(crate) cbytes: usize,
    pub(crate) qnum: usize,
    pub(crate) first: Option<HeaderIndex>,
    pub(crate) last: Option<HeaderIndex>,
    pub(crate) lspid: u32,
    pub(crate) lrpid: u32,
    pub(crate) stime: u64,
    pub(crate) rtime: u64,
    pub(crate) ctime: u64,
    pub(crate) mutation: Mutation,
}

impl QueueDescriptor {
    pub(crate) const fn vacant() -> Self {
        Self {
            perm: IpcPerm::vacant(),
            qbytes: 0,
            cbytes: 0,
            qnum: 0,
            first: None,
            last: None,
            lspid: 0,
            lrpid: 0,
            stime: 0,
            rtime: 0,
            ctime: 0,
            mutation: Mutation::Idle,
        }
    }

    pub(crate) fn is_allocated(&self) -> bool {
        self.qbytes != 0
    }

    /// Allocated and still the incarnation `id` was issued for.
    pub(crate) fn matches(&self, id: MsqId) -> bool {
        self.is_allocated() && self.perm.seq == id.seq()
    }

    /// Marks a blocked sender as the resource-wait owner if nobody holds the mark.
    pub(crate) fn claim_wait(&mut self, ticket: Ticket) -> bool {
        if self.mutation.is_locked() {
            return false;
        }
        self.mutation = Mutation::ResourceWait { owner: ticket };
        true
    }

    /// Clears a resource-wait mark held by `ticket`.
    pub(crate) fn release_wait(&mut self, ticket: Ticket) {
        if self.mutation == (Mutation::ResourceWait { owner: ticket }) {
            self.mutation = Mutation::Idle;
        }
    }

    pub(crate) fn begin_admit(&mut self, ticket: Ticket) {
        if self.mutation.is_locked() {
            consistency_fault!("admission started on locked queue ({:?})", self.mutation);
        }
        self.mutation = Mutation::Admitting { owner: ticket };
    }

    pub(crate) fn end_admit(&mut self, ticket: Ticket) {
        if self.mutation != (Mutation::Admitting { owner: ticket }) {
            consistency_fault!("admission mark lost ({:?}, ticket {})", self.mutation, ticket);
        }
        self.mutation = Mutation::Idle;
    }

    /// Appends `idx` to the tail and charges its length.
    pub(crate) fn push_back(&mut self, headers: &mut HeaderPool, idx: HeaderIndex) {
        headers.get_mut(idx).next = None;
        match self.last {
            Some(last) => headers.get_mut(last).next = Some(idx),
            None => self.first = Some(idx),
        }
        self.last = Some(idx);
        self.cbytes += headers.get(idx).len;
        self.qnum += 1;
    }

    /// First message in list order accepted by `selector`, with its predecessor.
    pub(crate) fn find(
        &self,
        headers: &HeaderPool,
        selector: Selector,
    ) -> Option<(Option<HeaderIndex>, HeaderIndex)> {
        let mut prev = None;
        let mut cursor = self.first;
        while let Some(idx) = cursor {
            let header = headers.get(idx);
            if selector.accepts(header.mtype) {
                return Some((prev, idx));
            }
            prev = Some(idx);
            cursor = header.next;
        }
        None
    }

    /// Detaches `idx` (whose predecessor is `prev`) and uncharges its length.
    pub(crate) fn unlink(
        &mut self,
        headers: &mut HeaderPool,
        prev: Option<HeaderIndex>,
        idx: HeaderIndex,
    ) {
        let next = headers.get(idx).next;
        match prev {
            Some(p) => headers.get_mut(p).next = next,
            None => {
                if self.first != Some(idx) {
                    consistency_fault!("queue head mismatch unlinking header {}", idx);
                }
                self.first = next;
            }
        }
        if self.last == Some(idx) {
            if next.is_some() {
                consistency_fault!("queue tail {} has a successor", idx);
            }
            self.last = prev;
        }
        headers.get_mut(idx).next = None;
        let len = headers.get(idx).len;
        if self.cbytes < len || self.qnum == 0 {
            consistency_fault!("queue accounting underflow ({} bytes, {} msgs)", self.cbytes, self.qnum);
        }
        self.cbytes -= len;
        self.qnum -= 1;
    }

    pub(crate) fn snapshot(&self, slot: usize) -> QueueStat {
        QueueStat {
            slot,
            id: MsqId::new(slot, self.perm.seq),
            perm: self.perm,
            qbytes: self.qbytes,
            cbytes: self.cbytes,
            qnum: self.qnum,
            lspid: self.lspid,
            lrpid: self.lrpid,
            stime: self.stime,
            rtime: self.rtime,
            ctime: self.ctime,
            mutation: self.mutation,
        }
    }
}

/// Point-in-time copy of a queue descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QueueStat {
    /// Table slot.
    pub slot: usize,
    /// Identifier of the current (or last) incarnation.
    pub id: MsqId,
    /// Ownership and mode.
    pub perm: IpcPerm,
    /// Byte capacity; zero for a free slot.
    pub qbytes: usize,
    /// Bytes currently queued.
    pub cbytes: usize,
    /// Messages currently queued.
    pub qnum: usize,
    /// Pid of the last successful sender.
    pub lspid: u32,
    /// Pid of the last successful receiver.
    pub lrpid: u32,
    /// Time of the last send.
    pub stime: u64,
    /// Time of the last receive.
    pub rtime: u64,
    /// Time of the last create or change.
    pub ctime: u64,
    /// Sender mutation mark.
    pub mutation: Mutation,
}

impl QueueStat {
    /// True when the slot holds a live queue.
    pub fn is_allocated(&self) -> bool {
        self.qbytes != 0
    }
}
