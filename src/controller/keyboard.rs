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
use std::io;

use tokio::{sync::mpsc::Sender, task::JoinHandle};
use tracing::{info, span, warn, Level};

use super::Event;

const TRACK: &str = "track";
const PLAY: &str = "play";
const STOP: &str = "stop";
const BPM: &str = "bpm";
const PITCH: &str = "pitch";
const SEEK: &str = "seek";
const STATUS: &str = "status";
const QUIT: &str = "quit";

/// A controller that controls the player using the keyboard.
///
/// Commands are one per line. `bpm` and `pitch` take either an absolute
/// value (`bpm 140`) or a signed nudge (`bpm +5`, `pitch -1`).
pub struct Driver {}

impl Driver {
    pub fn new() -> Driver {
        Driver {}
    }

    fn monitor_io<R, W>(
        events_tx: &Sender<Event>,
        mut reader: R,
        mut writer: W,
    ) -> Result<(), io::Error>
    where
        R: io::BufRead,
        W: io::Write,
    {
        write!(
            writer,
            "Command ({} <id>, {}, {}, {} <value>, {} <semitones>, {} <pct>, {}, {}): ",
            TRACK, PLAY, STOP, BPM, PITCH, SEEK, STATUS, QUIT,
        )?;
        writer.flush()?;
        let mut input: String = String::default();
        reader.read_line(&mut input)?;

        let event = match parse_line(&input) {
            Some(event) => event,
            None => {
                warn!(input = input.trim(), "Unrecognized input");
                return Ok(());
            }
        };

        events_tx
            .blocking_send(event)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        Ok(())
    }
}

/// Parses one input line into an event.
fn parse_line(input: &str) -> Option<Event> {
    let input = input.trim().to_lowercase();
    let mut parts = input.split_whitespace();
    let command = parts.next()?;
    let argument = parts.next();

    match (command, argument) {
        (TRACK, Some(id)) => id.parse().ok().map(Event::Track),
        (PLAY, None) => Some(Event::Toggle),
        (STOP, None) => Some(Event::Stop),
        (BPM, Some(value)) => parse_adjustment(value, Event::SetBpm, Event::AdjustBpm),
        (PITCH, Some(value)) => parse_adjustment(value, Event::SetPitch, Event::AdjustPitch),
        (SEEK, Some(pct)) => pct.parse().ok().map(Event::Seek),
        (STATUS, None) => Some(Event::Status),
        (QUIT, None) => Some(Event::Quit),
        _ => None,
    }
}

/// A leading sign means a relative nudge; a bare number is absolute.
fn parse_adjustment<T: std::str::FromStr>(
    value: &str,
    set: impl FnOnce(T) -> Event,
    adjust: impl FnOnce(T) -> Event,
) -> Option<Event> {
    let relative = value.starts_with('+') || value.starts_with('-');
    let parsed: T = value.trim_start_matches('+').parse().ok()?;
    if relative {
        Some(adjust(parsed))
    } else {
        Some(set(parsed))
    }
}

impl super::Driver for Driver {
    fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>> {
        tokio::task::spawn_blocking(move || {
            let span = span!(Level::INFO, "keyboard driver");
            let _enter = span.enter();

            info!("Keyboard driver started.");

            loop {
                Self::monitor_io(&events_tx, io::stdin().lock(), io::stdout())?;
            }
        })
    }
}

#[cfg(test)]
mod test {
    use crate::controller::Event;

    use super::parse_line;

    #[test]
    fn test_parse_commands() {
        assert_eq!(Some(Event::Track(3)), parse_line("track 3\n"));
        assert_eq!(Some(Event::Toggle), parse_line("play\n"));
        assert_eq!(Some(Event::Stop), parse_line("stop\n"));
        assert_eq!(Some(Event::Status), parse_line("status\n"));
        assert_eq!(Some(Event::Quit), parse_line("quit\n"));
        assert_eq!(Some(Event::Seek(50.0)), parse_line("seek 50\n"));
    }

    #[test]
    fn test_parse_absolute_and_relative() {
        assert_eq!(Some(Event::SetBpm(140.0)), parse_line("bpm 140\n"));
        assert_eq!(Some(Event::AdjustBpm(5.0)), parse_line("bpm +5\n"));
        assert_eq!(Some(Event::AdjustBpm(-5.0)), parse_line("bpm -5\n"));
        assert_eq!(Some(Event::SetPitch(2)), parse_line("pitch 2\n"));
        assert_eq!(Some(Event::AdjustPitch(-1)), parse_line("pitch -1\n"));
        assert_eq!(Some(Event::AdjustPitch(1)), parse_line("PITCH +1\n"));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(None, parse_line("\n"));
        assert_eq!(None, parse_line("dance\n"));
        assert_eq!(None, parse_line("track\n"));
        assert_eq!(None, parse_line("track seven\n"));
        assert_eq!(None, parse_line("bpm\n"));
        assert_eq!(None, parse_line("bpm fast\n"));
        assert_eq!(None, parse_line("play now\n"));
    }
}
