// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Boundary between caller memory and the segment pool
//!
//! Payloads cross this boundary one segment-sized chunk at a time with the
//! subsystem lock released, so an implementation may block or fault. A fault
//! is reported as [`TransferError`] carrying the payload offset of the failed
//! chunk; the protocol unwinds everything it claimed before surfacing it.

use thiserror::Error;

/// A chunk could not be moved across the caller boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("caller memory fault at payload offset {offset}")]
pub struct TransferError {
    /// Payload offset of the failing chunk.
    pub offset: usize,
}

/// Source of a message payload.
pub trait CopyIn {
    /// Total payload length in bytes.
    fn len(&self) -> usize;

    /// Returns true for an empty payload.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fills `dst` from payload offset `offset`.
    fn copy_in(&self, offset: usize, dst: &mut [u8]) -> Result<(), TransferError>;
}

/// Destination of a received message.
pub trait CopyOut {
    /// Stores the message type; called once before any payload chunk.
    fn put_type(&mut self, mtype: i64) -> Result<(), TransferError>;

    /// Writes `src` at payload offset `offset`.
    fn copy_out(&mut self, offset: usize, src: &[u8]) -> Result<(), TransferError>;
}

impl CopyIn for [u8] {
    fn len(&self) -> usize {
        <[u8]>::len(self)
    }

    fn copy_in(&self, offset: usize, dst: &mut [u8]) -> Result<(), TransferError> {
        let end = offset.checked_add(dst.len()).ok_or(TransferError { offset })?;
        let src = self.get(offset..end).ok_or(TransferError { offset })?;
        dst.copy_from_slice(src);
        Ok(())
    }
}

impl CopyIn for Vec<u8> {
    fn len(&self) -> usize {
        self.as_slice().len()
    }

    fn copy_in(&self, offset: usize, dst: &mut [u8]) -> Result<(), TransferError> {
        self.as_slice().copy_in(offset, dst)
    }
}

impl CopyOut for Vec<u8> {
    /// Starts a new message; bytes from an earlier one are dropped.
    fn put_type(&mut self, _mtype: i64) -> Result<(), TransferError> {
        self.clear();
        Ok(())
    }

    fn copy_out(&mut self, offset: usize, src: &[u8]) -> Result<(), TransferError> {
        let end = offset + src.len();
        if self.len() < end {
            self.resize(end, 0);
        }
        self[offset..end].copy_from_slice(src);
        Ok(())
    }
}

/// Owned copy of a received message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageBuf {
    /// Message type.
    pub mtype: i64,
    /// Payload bytes, possibly truncated.
    pub data: Vec<u8>,
}

impl CopyOut for MessageBuf {
    fn put_type(&mut self, mtype: i64) -> Result<(), TransferError> {
        self.mtype = mtype;
        self.data.put_type(mtype)
    }

    fn copy_out(&mut self, offset: usize, src: &[u8]) -> Result<(), TransferError> {
        self.data.copy_out(offset, src)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_copy_in_rejects_overrun() {
        let payload = [1u8, 2, 3, 4, 5];
        let mut chunk = [0u8; 4];
        payload[..].copy_in(0, &mut chunk).unwrap();
        assert_eq!(chunk, [1, 2, 3, 4]);
        assert_eq!(payload[..].copy_in(4, &mut chunk), Err(TransferError { offset: 4 }));
    }

    #[test]
    fn vec_copy_out_grows() {
        let mut out = Vec::new();
        out.copy_out(0, b"abc").unwrap();
        out.copy_out(3, b"de").unwrap();
        assert_eq!(out, b"abcde");
    }

    #[test]
    fn reused_vec_holds_only_the_new_message() {
        let mut out = b"stale payload".to_vec();
        out.put_type(1).unwrap();
        out.copy_out(0, b"new").unwrap();
        assert_eq!(out, b"new");
        out.put_type(2).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn message_buf_records_type() {
        let mut buf = MessageBuf::default();
        buf.put_type(7).unwrap();
        buf.copy_out(0, b"xy").unwrap();
        assert_eq!(buf, MessageBuf { mtype: 7, data: b"xy".to_vec() });
    }
}
