// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! SVID-style message queues for host-first userspace.
//!
//! A [`MsgSystem`] owns a fixed table of queue descriptors, a pool of message
//! headers and a byte arena carved into equal segments. Callers create or
//! look up queues by [`Key`], then send typed messages and receive them by
//! type selector, blocking until space or a matching message is available.
//! Every call names its [`Caller`]; permission checks go through an
//! [`Authority`] and timestamps come from a [`Clock`].
//!
//! Payloads are moved through the [`CopyIn`]/[`CopyOut`] boundary one segment
//! at a time with the subsystem lock released.

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(missing_docs)]

mod clock;
pub mod cli;
mod config;
mod cred;
mod ctl;
mod error;
mod fault;
mod flags;
mod header;
mod id;
mod perm;
mod queue;
mod recv;
mod segment;
mod send;
mod system;
mod usercopy;

pub use cli::{execute, help, run};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, Limits, MAX_QUEUES, MAX_SEGMENT_COUNT, MAX_SEGMENT_SIZE, MIN_SEGMENT_SIZE};
pub use cred::{Caller, Credentials, Signal};
pub use ctl::QueueSettings;
pub use error::{errno, Error, Result, StartupError};
pub use flags::{GetFlags, RecvFlags, SendFlags};
pub use id::{Key, MsqId, SEQ_MASK};
pub use perm::{Access, Authority, IpcPerm, UnixAuthority, MODE_MASK, MODE_READ, MODE_WRITE};
pub use queue::{Mutation, QueueStat};
pub use recv::Received;
pub use system::{MsgSystem, PoolUsage};
pub use usercopy::{CopyIn, CopyOut, MessageBuf, TransferError};
