// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Binary entrypoint for the `msgq` inspection tool.

fn main() {
    env_logger::init();
    nexus_msgq::run();
}
