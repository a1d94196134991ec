// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Message header records and their free list.

use crate::error::StartupError;
use crate::fault::consistency_fault;
use crate::segment::SegmentIndex;

/// Index of a header in the pool.
pub type HeaderIndex = usize;

/// Metadata anchoring one message.
///
/// A header is on the free list, on exactly one queue's list, or owned by
/// the send or receive call currently moving its payload.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct MessageHeader {
    pub(crate) mtype: i64,
    pub(crate) len: usize,
    pub(crate) spot: Option<SegmentIndex>,
    pub(crate) next: Option<HeaderIndex>,
}

pub(crate) struct HeaderPool {
    headers: Vec<MessageHeader>,
    free_head: Option<HeaderIndex>,
    nfree: usize,
}

impl HeaderPool {
    pub(crate) fn new(count: usize) -> Result<Self, StartupError> {
        let mut headers = Vec::new();
        headers
            .try_reserve_exact(count)
            .map_err(|_| StartupError::Allocation { pool: "message header", len: count })?;
        for i in 0..count {
            let next = if i + 1 < count { Some(i + 1) } else { None };
            headers.push(MessageHeader { next, ..MessageHeader::default() });
        }
        Ok(Self { headers, free_head: if count > 0 { Some(0) } else { None }, nfree: count })
    }

    pub(crate) fn empty() -> Self {
        Self { headers: Vec::new(), free_head: None, nfree: 0 }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.headers.len()
    }

    pub(crate) fn free_count(&self) -> usize {
        self.nfree
    }

    pub(crate) fn has_free(&self) -> bool {
        self.free_head.is_some()
    }

    /// Pops the free list head; the header comes back zeroed and unlinked.
    pub(crate) fn alloc(&mut self) -> Option<HeaderIndex> {
        let idx = self.free_head?;
        self.free_head = self.get(idx).next;
        self.nfree -= 1;
        self.headers[idx] = MessageHeader::default();
        Some(idx)
    }

    /// Pushes a header whose segments were already returned.
    pub(crate) fn release(&mut self, idx: HeaderIndex) {
        let free_head = self.free_head;
        let header = self.get_mut(idx);
        header.mtype = 0;
        header.spot = None;
        header.next = free_head;
        self.free_head = Some(idx);
        self.nfree += 1;
    }

    pub(crate) fn get(&self, idx: HeaderIndex) -> &MessageHeader {
        match self.headers.get(idx) {
            Some(header) => header,
            None => consistency_fault!("header {} out of range", idx),
        }
    }

    pub(crate) fn get_mut(&mut self, idx: HeaderIndex) -> &mut MessageHeader {
        let count = self.headers.len();
        match self.headers.get_mut(idx) {
            Some(header) => header,
            None => consistency_fault!("header {} out of range (count={})", idx, count),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhausts_then_recycles() {
        let mut pool = HeaderPool::new(2).unwrap();
        let a = pool.alloc().unwrap();
        let b = pool.alloc().unwrap();
        assert_ne!(a, b);
        assert!(pool.alloc().is_none());
        assert!(!pool.has_free());
        pool.release(a);
        assert_eq!(pool.free_count(), 1);
        assert_eq!(pool.alloc(), Some(a));
    }

    #[test]
    fn allocated_header_is_clean() {
        let mut pool = HeaderPool::new(1).unwrap();
        let idx = pool.alloc().unwrap();
        pool.get_mut(idx).mtype = 9;
        pool.get_mut(idx).len = 30;
        pool.release(idx);
        let again = pool.alloc().unwrap();
        assert_eq!(pool.get(again).mtype, 0);
        assert_eq!(pool.get(again).len, 0);
        assert!(pool.get(again).next.is_none());
    }
}
