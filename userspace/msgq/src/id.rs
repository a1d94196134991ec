// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Queue identifiers and lookup keys.
//!
//! An identifier packs the table slot and that slot's reuse sequence as
//! `(seq << 16) | (index & 0xffff)`. A slot bumps its sequence every time it
//! is handed out or torn down, so identifiers from an earlier incarnation stop
//! resolving.

use core::fmt;

use serde::Serialize;

/// Reuse sequences are kept to 15 bits so raw identifiers stay positive.
pub const SEQ_MASK: u16 = 0x7fff;

/// Opaque external handle for a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct MsqId(u32);

impl MsqId {
    /// Builds the identifier for `index` at reuse sequence `seq`.
    pub const fn new(index: usize, seq: u16) -> Self {
        Self(((seq as u32) << 16) | (index as u32 & 0xffff))
    }

    /// Wraps a raw identifier received from a caller.
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw wire value.
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Table slot encoded in the identifier.
    pub const fn index(self) -> usize {
        (self.0 & 0xffff) as usize
    }

    /// Reuse sequence encoded in the identifier.
    pub const fn seq(self) -> u16 {
        (self.0 >> 16) as u16
    }
}

impl fmt::Display for MsqId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lookup key for [`create_or_lookup`](crate::MsgSystem::create_or_lookup).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Key {
    /// Anonymous queue; never matches an existing one.
    Private,
    /// Named queue shared by every caller using the same value.
    Public(i64),
}

impl Key {
    /// Maps the classic integer encoding, where zero means private.
    pub const fn from_raw(raw: i64) -> Self {
        if raw == 0 {
            Self::Private
        } else {
            Self::Public(raw)
        }
    }

    /// Integer encoding of the key.
    pub const fn raw(self) -> i64 {
        match self {
            Self::Private => 0,
            Self::Public(raw) => raw,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn wire_layout() {
        let id = MsqId::new(3, 0x12);
        assert_eq!(id.raw(), 0x0012_0003);
        assert_eq!(MsqId::from_raw(0x0012_0003), id);
    }

    #[test]
    fn zero_key_is_private() {
        assert_eq!(Key::from_raw(0), Key::Private);
        assert_eq!(Key::from_raw(-7), Key::Public(-7));
        assert_eq!(Key::Public(42).raw(), 42);
    }

    proptest! {
        #[test]
        fn index_and_seq_survive_packing(index in 0usize..0x1_0000, seq in 0u16..=SEQ_MASK) {
            let id = MsqId::new(index, seq);
            prop_assert_eq!(id.index(), index);
            prop_assert_eq!(id.seq(), seq);
            prop_assert!((id.raw() as i32) >= 0);
        }
    }
}
