// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Receive protocol
//! INVARIANTS:
//!   - A message is unlinked and uncharged before its payload leaves the pool
//!   - An oversized message without truncation stays queued
//!   - The header and its segments are freed on success and on copy failure

use log::debug;
use parking_lot::MutexGuard;

use crate::clock::Clock;
use crate::cred::Caller;
use crate::error::{Error, Result};
use crate::fault::consistency_fault;
use crate::flags::RecvFlags;
use crate::id::MsqId;
use crate::perm::{Access, Authority};
use crate::queue::Selector;
use crate::system::MsgSystem;
use crate::usercopy::{CopyOut, MessageBuf};

/// Outcome of a successful receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Received {
    /// Type of the delivered message.
    pub mtype: i64,
    /// Payload bytes delivered, after truncation.
    pub len: usize,
}

impl<A: Authority, C: Clock> MsgSystem<A, C> {
    /// Dequeues the first message on `id` matching `selector`.
    ///
    /// `selector` zero takes the head, a positive value the first message of
    /// exactly that type, a negative value the first message whose type is at
    /// most its magnitude. At most `max_bytes` payload bytes are delivered;
    /// longer messages need [`RecvFlags::NOERROR`].
    pub fn receive<D: CopyOut + ?Sized>(
        &self,
        caller: &Caller,
        id: MsqId,
        dst: &mut D,
        max_bytes: usize,
        selector: i64,
        flags: RecvFlags,
    ) -> Result<Received> {
        let mut state = self.enter(caller)?;
        let slot = state.decode(id)?;
        self.authority.check(&state.queues[slot].perm, &caller.cred, Access::READ)?;
        let selector = Selector::from_raw(selector);

        let hdr = loop {
            let st = &mut *state;
            let queue = &mut st.queues[slot];
            if let Some((prev, idx)) = queue.find(&st.headers, selector) {
                let len = st.headers.get(idx).len;
                if len > max_bytes && !flags.contains(RecvFlags::NOERROR) {
                    debug!("msgrcv {}: {} byte message, buffer holds {}", id, len, max_bytes);
                    return Err(Error::MessageTooLarge);
                }
                queue.unlink(&mut st.headers, prev, idx);
                break idx;
            }
            if flags.contains(RecvFlags::NOWAIT) {
                debug!("msgrcv {}: no message of type {:?}", id, selector);
                return Err(Error::NoMessage);
            }
            self.sleep(&mut state, slot, caller)?;
            if !state.queues[slot].matches(id) {
                debug!("msgrcv {}: queue removed while waiting", id);
                return Err(Error::Removed);
            }
        };

        let now = self.clock.now();
        let queue = &mut state.queues[slot];
        queue.lrpid = caller.pid;
        queue.rtime = now;

        let header = *state.headers.get(hdr);
        let len = header.len.min(max_bytes);
        let typed = MutexGuard::unlocked(&mut state, || dst.put_type(header.mtype));
        if let Err(err) = typed {
            state.free_message(hdr);
            self.wakeup(slot);
            debug!("msgrcv {}: {}", id, err);
            return Err(err.into());
        }

        let seg_size = self.limits.segment_size;
        let mut chunk = vec![0u8; seg_size.min(len)];
        let mut offset = 0;
        let mut next = header.spot;
        while offset < len {
            let tlen = seg_size.min(len - offset);
            let Some(seg) = next else {
                consistency_fault!("segment chain ran out at offset {} of {}", offset, len);
            };
            chunk[..tlen].copy_from_slice(&state.segments.bytes(seg)[..tlen]);
            let copied = MutexGuard::unlocked(&mut state, || dst.copy_out(offset, &chunk[..tlen]));
            if let Err(err) = copied {
                state.free_message(hdr);
                self.wakeup(slot);
                debug!("msgrcv {}: {}", id, err);
                return Err(err.into());
            }
            offset += tlen;
            next = state.segments.next_of(seg);
        }

        state.free_message(hdr);
        self.wakeup(slot);
        Ok(Received { mtype: header.mtype, len })
    }

    /// Receives into an owned buffer of at most `max_bytes` payload bytes.
    pub fn receive_message(
        &self,
        caller: &Caller,
        id: MsqId,
        max_bytes: usize,
        selector: i64,
        flags: RecvFlags,
    ) -> Result<MessageBuf> {
        let mut buf = MessageBuf::default();
        self.receive(caller, id, &mut buf, max_bytes, selector, flags)?;
        Ok(buf)
    }
}
