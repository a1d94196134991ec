// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Consistency faults: shared queue state is corrupt and must not be used further.

/// Logs the fault and panics; release profiles abort on panic.
macro_rules! consistency_fault {
    ($($arg:tt)*) => {{
        log::error!("msgq consistency fault: {}", format_args!($($arg)*));
        panic!("msgq consistency fault: {}", format_args!($($arg)*))
    }};
}

pub(crate) use consistency_fault;
