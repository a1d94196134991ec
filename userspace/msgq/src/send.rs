// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Send protocol
//! INVARIANTS:
//!   - Admission is re-validated after every wake; nothing is claimed while blocked
//!   - Claimed header and segments are released on every failure path
//!   - The admission mark is cleared only by the send call that set it

use log::debug;
use parking_lot::MutexGuard;

use crate::clock::Clock;
use crate::cred::Caller;
use crate::error::{Error, Result};
use crate::fault::consistency_fault;
use crate::flags::SendFlags;
use crate::header::HeaderIndex;
use crate::id::MsqId;
use crate::perm::{Access, Authority};
use crate::queue::Ticket;
use crate::system::{MsgSystem, State};
use crate::usercopy::CopyIn;

impl<A: Authority, C: Clock> MsgSystem<A, C> {
    /// Enqueues a `payload.len()` byte message of type `mtype` on `id`.
    ///
    /// Blocks while the message exceeds the queue's free capacity, the pools
    /// are short or another sender holds the admission mark, unless
    /// [`SendFlags::NOWAIT`] is given. A payload larger than the whole segment
    /// pool can never be admitted and fails `InvalidArgument`.
    pub fn send<S: CopyIn + ?Sized>(
        &self,
        caller: &Caller,
        id: MsqId,
        mtype: i64,
        payload: &S,
        flags: SendFlags,
    ) -> Result<()> {
        let mut state = self.enter(caller)?;
        let slot = state.decode(id)?;
        self.authority.check(&state.queues[slot].perm, &caller.cred, Access::WRITE)?;

        let len = payload.len();
        if len > self.limits.max_message_bytes() {
            debug!("msgsnd {}: {} bytes exceeds the segment pool", id, len);
            return Err(Error::InvalidArgument);
        }
        let needed = self.limits.segments_for(len);
        let ticket = state.ticket();

        loop {
            let queue = &state.queues[slot];
            // Larger than qbytes is not an error: set_limits may still raise the capacity.
            let blocked = queue.mutation.is_locked()
                || queue.cbytes + len > queue.qbytes
                || needed > state.segments.free_count()
                || !state.headers.has_free();
            if !blocked {
                break;
            }
            if flags.contains(SendFlags::NOWAIT) {
                debug!("msgsnd {}: would block", id);
                return Err(Error::WouldBlock);
            }
            let owner = state.queues[slot].claim_wait(ticket);
            let slept = self.sleep(&mut state, slot, caller);
            if owner {
                state.queues[slot].release_wait(ticket);
                self.wakeup(slot);
            }
            slept?;
            if !state.queues[slot].matches(id) {
                debug!("msgsnd {}: queue removed while waiting", id);
                return Err(Error::Removed);
            }
        }

        state.queues[slot].begin_admit(ticket);
        let Some(hdr) = state.headers.alloc() else {
            consistency_fault!("no message header after admission");
        };
        let spot = state.segments.alloc_chain(needed);
        {
            let header = state.headers.get_mut(hdr);
            header.len = len;
            header.spot = spot;
        }

        if mtype < 1 {
            self.abandon(&mut state, slot, hdr, ticket);
            debug!("msgsnd {}: message type {} below one", id, mtype);
            return Err(Error::InvalidArgument);
        }
        state.headers.get_mut(hdr).mtype = mtype;

        let seg_size = self.limits.segment_size;
        let mut chunk = vec![0u8; seg_size.min(len)];
        let mut offset = 0;
        let mut next = spot;
        while offset < len {
            let tlen = seg_size.min(len - offset);
            let Some(seg) = next else {
                consistency_fault!("segment chain ran out at offset {} of {}", offset, len);
            };
            let copied = MutexGuard::unlocked(&mut state, || {
                payload.copy_in(offset, &mut chunk[..tlen])
            });
            if let Err(err) = copied {
                self.abandon(&mut state, slot, hdr, ticket);
                debug!("msgsnd {}: {}", id, err);
                return Err(err.into());
            }
            state.segments.bytes_mut(seg)[..tlen].copy_from_slice(&chunk[..tlen]);
            offset += tlen;
            next = state.segments.next_of(seg);
        }
        if next.is_some() {
            consistency_fault!("segment chain longer than {} bytes", len);
        }

        state.queues[slot].end_admit(ticket);
        if !state.queues[slot].matches(id) {
            state.free_message(hdr);
            self.wakeup(slot);
            debug!("msgsnd {}: queue removed during copy", id);
            return Err(Error::Removed);
        }

        let now = self.clock.now();
        let st = &mut *state;
        let queue = &mut st.queues[slot];
        queue.push_back(&mut st.headers, hdr);
        queue.lspid = caller.pid;
        queue.stime = now;
        self.wakeup(slot);
        Ok(())
    }

    /// Unwinds a claimed message and clears this call's admission mark.
    fn abandon(&self, state: &mut State, slot: usize, hdr: HeaderIndex, ticket: Ticket) {
        state.free_message(hdr);
        state.queues[slot].end_admit(ticket);
        self.wakeup(slot);
    }
}
