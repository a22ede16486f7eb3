// Copyright (C) 2025 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::io::{self, Write};

use tracing::info;

/// User-facing notices. These are the messages a musician at the terminal is
/// meant to see (download finished, audio failed to load), as opposed to the
/// structured logs that go through tracing. Kept separate so log filtering
/// never hides them.
pub fn notice(message: &str) {
    info!(message, "notice");
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "* {}", message);
}

/// A notice for failures. Goes to stderr so it survives stdout redirection.
pub fn error_notice(message: &str) {
    tracing::error!(message, "notice");
    let mut stderr = io::stderr().lock();
    let _ = writeln!(stderr, "! {}", message);
}
