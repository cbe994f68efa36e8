//! Splitting a raw report into battle blocks.

use chrono::NaiveDateTime;
use tracing::debug;

use super::grammar::{elapsed_time, last_round};
use crate::models::Battle;

const HEADER_OPEN: &str = "Kampfinformationen [Kampfbeginn: ";

/// Start label of a battle synthesised for event lines before any header
pub const IMPLICIT_START: &str = "Kampfinformationen";

/// Self-heal ("bandaging") sections start at the line containing this word
const BANDAGING_MARKER: &str = "versorgt";

const START_FORMATS: [&str; 4] = [
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
    "%d.%m.%y %H:%M:%S",
    "%d.%m.%y %H:%M",
];

/// A `Kampfinformationen [Kampfbeginn: <label>]` header found in the input
struct Header<'a> {
    at: usize,
    end: usize,
    label: &'a str,
}

fn find_headers(input: &str) -> Vec<Header<'_>> {
    let mut headers: Vec<Header<'_>> = Vec::new();
    for (at, _) in input.match_indices(HEADER_OPEN) {
        // a match inside the previous header's label belongs to that label
        if headers.last().is_some_and(|previous| at < previous.end) {
            continue;
        }
        let label_start = at + HEADER_OPEN.len();
        let line_end = input[label_start..]
            .find('\n')
            .map_or(input.len(), |offset| label_start + offset);
        // the label runs to the last `]` of the header line
        let Some(close) = input[label_start..line_end].rfind(']') else {
            continue;
        };
        let close = close + label_start;
        headers.push(Header {
            at,
            end: close + 1,
            label: &input[label_start..close],
        });
    }
    headers
}

fn has_event_line(text: &str) -> bool {
    text.lines().any(|line| {
        let line = line.trim_start();
        matches!(elapsed_time(line), Ok((rest, _)) if rest.starts_with(char::is_whitespace))
    })
}

fn cut_bandaging(body: &str) -> &str {
    match body.find(BANDAGING_MARKER) {
        Some(at) => &body[..body[..at].rfind('\n').unwrap_or(0)],
        None => body,
    }
}

fn line_of(input: &str, offset: usize) -> usize {
    input[..offset].matches('\n').count()
}

/// Read a battle label such as `24.12.2023 18:30:05` as a timestamp
pub fn parse_start(label: &str) -> Option<NaiveDateTime> {
    START_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(label.trim(), format).ok())
}

fn battle(input: &str, start: &str, from: usize, to: usize, show_bandaging: bool) -> Battle {
    let full = &input[from..to];
    let body = if show_bandaging { full } else { cut_bandaging(full) };
    let to = from + body.len();
    let start = if start.trim().is_empty() { IMPLICIT_START } else { start };
    Battle {
        start: start.to_string(),
        started_at: parse_start(start),
        body: body.to_string(),
        last_round: last_round(body),
        byte_range: from..to,
        line_range: line_of(input, from)..line_of(input, to),
    }
}

/// Split `input` into battles, one per header plus a leading implicit battle
/// when event lines precede the first header.
///
/// With `show_bandaging` off, each body ends before the line that starts the
/// bandaging section.
pub fn split_battles(input: &str, show_bandaging: bool) -> Vec<Battle> {
    let headers = find_headers(input);
    let mut battles = Vec::with_capacity(headers.len() + 1);

    let leading_end = headers.first().map_or(input.len(), |h| h.at);
    if has_event_line(&input[..leading_end]) {
        battles.push(battle(input, IMPLICIT_START, 0, leading_end, show_bandaging));
    }

    for (index, header) in headers.iter().enumerate() {
        let to = headers.get(index + 1).map_or(input.len(), |next| next.at);
        battles.push(battle(input, header.label, header.end, to, show_bandaging));
    }

    debug!(battles = battles.len(), "split report into battles");
    battles
}
