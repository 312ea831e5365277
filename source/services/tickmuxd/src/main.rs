// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: tickmuxd daemon entrypoint (host stub)
//! OWNERS: @runtime
//! PUBLIC API: main() (host stub)
//! DEPENDS_ON: tickmuxd::std_server::service_main_loop

#![forbid(unsafe_code)]

fn main() {
    println!(
        "tickmuxd: host mode - {} timers, control channel '{}'; use crate tests",
        tickmuxd::TOTAL_TIMERS,
        tickmuxd::CONTROL_FILE_NAME
    );
}
