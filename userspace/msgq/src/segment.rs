// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Fixed byte arena carved into equal segments
//! PUBLIC API: SegmentIndex
//! INVARIANTS: free_count + segments held by messages == capacity;
//!   a chain released for `len` bytes has exactly ceil(len / segment_size) links

use crate::error::StartupError;
use crate::fault::consistency_fault;

/// Index of a segment in the arena.
pub type SegmentIndex = u16;

/// Segment arena with an index-linked free list.
///
/// A message payload is a singly linked chain threaded through `next`; free
/// segments are threaded through the same links.
pub(crate) struct SegmentPool {
    segment_size: usize,
    arena: Vec<u8>,
    next: Vec<Option<SegmentIndex>>,
    free_head: Option<SegmentIndex>,
    nfree: usize,
}

impl SegmentPool {
    pub(crate) fn new(segment_size: usize, count: usize) -> Result<Self, StartupError> {
        let bytes = segment_size * count;
        let mut arena = Vec::new();
        arena
            .try_reserve_exact(bytes)
            .map_err(|_| StartupError::Allocation { pool: "segment arena", len: bytes })?;
        arena.resize(bytes, 0);

        let mut next = Vec::new();
        next.try_reserve_exact(count)
            .map_err(|_| StartupError::Allocation { pool: "segment map", len: count })?;
        for i in 0..count {
            let link = if i + 1 < count { Some((i + 1) as SegmentIndex) } else { None };
            next.push(link);
        }
        Ok(Self {
            segment_size,
            arena,
            next,
            free_head: if count > 0 { Some(0) } else { None },
            nfree: count,
        })
    }

    pub(crate) fn empty(segment_size: usize) -> Self {
        Self { segment_size, arena: Vec::new(), next: Vec::new(), free_head: None, nfree: 0 }
    }

    /// Total number of segments.
    pub(crate) fn capacity(&self) -> usize {
        self.next.len()
    }

    /// Segments currently on the free list.
    pub(crate) fn free_count(&self) -> usize {
        self.nfree
    }

    /// Claims `count` segments and links them into one chain.
    ///
    /// Admission must have checked `free_count() >= count`; running dry here
    /// is a consistency fault. Returns `None` for an empty chain.
    pub(crate) fn alloc_chain(&mut self, count: usize) -> Option<SegmentIndex> {
        let mut head = None;
        for _ in 0..count {
            if self.nfree == 0 {
                consistency_fault!("segment pool exhausted during claim");
            }
            let Some(seg) = self.free_head else {
                consistency_fault!("free segment list empty with {} free", self.nfree);
            };
            self.check(seg);
            self.free_head = self.next[seg as usize];
            self.nfree -= 1;
            self.next[seg as usize] = head;
            head = Some(seg);
        }
        head
    }

    /// Returns a chain that carried `len` payload bytes to the free list.
    pub(crate) fn release_chain(&mut self, head: Option<SegmentIndex>, len: usize) {
        let mut remaining = len;
        let mut spot = head;
        while remaining > 0 {
            let Some(seg) = spot else {
                consistency_fault!("segment chain shorter than {} bytes", len);
            };
            self.check(seg);
            spot = self.next[seg as usize];
            self.next[seg as usize] = self.free_head;
            self.free_head = Some(seg);
            self.nfree += 1;
            remaining = remaining.saturating_sub(self.segment_size);
        }
        if spot.is_some() {
            consistency_fault!("segment chain longer than {} bytes", len);
        }
    }

    /// Segment following `seg` in its chain.
    pub(crate) fn next_of(&self, seg: SegmentIndex) -> Option<SegmentIndex> {
        self.check(seg);
        self.next[seg as usize]
    }

    pub(crate) fn bytes(&self, seg: SegmentIndex) -> &[u8] {
        self.check(seg);
        let start = seg as usize * self.segment_size;
        &self.arena[start..start + self.segment_size]
    }

    pub(crate) fn bytes_mut(&mut self, seg: SegmentIndex) -> &mut [u8] {
        self.check(seg);
        let start = seg as usize * self.segment_size;
        &mut self.arena[start..start + self.segment_size]
    }

    fn check(&self, seg: SegmentIndex) {
        if seg as usize >= self.next.len() {
            consistency_fault!("segment {} out of range (count={})", seg, self.next.len());
        }
    }
}
