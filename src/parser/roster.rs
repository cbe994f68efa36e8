//! Participant roster and last active rounds.

use indexmap::IndexMap;
use nom::{
    bytes::complete::{tag, take_until},
    character::complete::space1,
    sequence::{terminated, tuple},
    IResult,
};
use tracing::debug;

use super::grammar::{elapsed_time, event_line, parse_number, round_header, DEFEAT_PHRASE};
use crate::models::{ElapsedTime, ParticipantStats};

const ROSTER_MARKER: &str = "[?]";

fn is_level(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| c.is_ascii_digit())
}

fn is_life(token: &str) -> bool {
    token
        .strip_suffix('%')
        .is_some_and(|digits| is_level(digits.strip_prefix('+').unwrap_or(digits)))
}

/// Experience needs at least two digits (`12`, `1.5`); a lone digit is not EXP
fn parse_exp(token: &str) -> Option<f64> {
    let valid = match token.split_once('.') {
        Some((whole, fraction)) => is_level(whole) && is_level(fraction),
        None => is_level(token) && token.len() >= 2,
    };
    valid.then(|| token.parse().ok()).flatten()
}

/// `[?] <name> <level> <status> [<life%> [+<life%>]] [<exp>]`
fn roster_row(line: &str) -> Option<ParticipantStats> {
    let rest = line.trim_start().strip_prefix(ROSTER_MARKER)?;
    let tokens: Vec<(usize, &str)> = rest
        .split_whitespace()
        .map(|token| (token.as_ptr() as usize - rest.as_ptr() as usize, token))
        .collect();

    // the name runs up to the first numeric token that is followed by a status
    let level_at = (1..tokens.len().saturating_sub(1)).find(|&i| is_level(tokens[i].1))?;
    let name_end = tokens[level_at - 1].0 + tokens[level_at - 1].1.len();
    let name = rest[tokens[0].0..name_end].to_string();
    let level = parse_number(tokens[level_at].1);
    let status = tokens[level_at + 1].1.to_string();

    let mut remaining = tokens[level_at + 2..].iter().map(|(_, token)| *token).peekable();
    let life_percent = match remaining.peek() {
        Some(token) if is_life(token) && !token.starts_with('+') => {
            let mut life = remaining.next().map(str::to_string).unwrap_or_default();
            if let Some(bonus) = remaining.next_if(|t| t.starts_with('+') && is_life(t)) {
                life = format!("{life} {bonus}");
            }
            Some(life)
        }
        _ => None,
    };
    let exp = remaining.next().and_then(parse_exp);

    Some(ParticipantStats {
        name,
        level,
        status,
        life_percent,
        exp,
        last_round: None,
    })
}

/// `<M:SS> <name> sinkt kampfunfähig zu Boden.`
fn defeat_line(input: &str) -> IResult<&str, (ElapsedTime, &str)> {
    let (rest, (time, _, name)) = tuple((
        elapsed_time,
        space1,
        terminated(take_until(DEFEAT_PHRASE), tag(DEFEAT_PHRASE)),
    ))(input)?;
    Ok((rest, (time, name.trim())))
}

/// Round a defeat at `time` belongs to.
///
/// A defeat on the first second of a round shares its timestamp with the round
/// boundary. It counts for the previous round when the line before it is the
/// round header, or when no earlier line with the same timestamp targets the
/// defeated participant.
fn defeat_round(lines: &[&str], index: usize, time: ElapsedTime, name: &str) -> u32 {
    let round = time.round();
    if !time.starts_round() {
        return round;
    }

    let previous = lines[index - 1];
    let after_header = previous
        .match_indices("Runde")
        .any(|(at, _)| round_header(&previous[at..]).is_ok());
    if after_header {
        debug!(name, %time, "defeat at round transition");
        return round - 1;
    }

    let targeted_earlier = lines[..index].iter().any(|line| {
        let line = line.trim_start();
        match event_line(line) {
            Ok((_, event)) => event.time == time && event.target == Some(name),
            Err(_) => false,
        }
    });
    if targeted_earlier {
        round
    } else {
        debug!(name, %time, "no earlier target in the same second, moving defeat back");
        round - 1
    }
}

/// Roster of one battle keyed by instance name, with the last round each
/// participant was active in.
///
/// Participants without a defeat line stay active until the last round header.
pub fn extract_roster(body: &str) -> IndexMap<String, ParticipantStats> {
    let mut roster: IndexMap<String, ParticipantStats> = body
        .lines()
        .filter_map(roster_row)
        .map(|stats| (stats.name.clone(), stats))
        .collect();
    if roster.is_empty() {
        return roster;
    }

    let max_round = body
        .lines()
        .filter_map(|line| round_header(line.trim_start()).ok())
        .map(|(_, round)| round)
        .max()
        .unwrap_or(0);

    let lines: Vec<&str> = body.lines().collect();
    for index in 1..lines.len() {
        let Ok((_, (time, name))) = defeat_line(lines[index].trim_start()) else {
            continue;
        };
        let round = defeat_round(&lines, index, time, name);
        match roster.get_mut(name) {
            Some(stats) => stats.last_round = Some(round),
            None => debug!(name, "defeated participant missing from roster"),
        }
    }

    for stats in roster.values_mut() {
        // round 0 means "defeated before the first round": treat as unknown
        if stats.last_round.unwrap_or(0) == 0 {
            stats.last_round = Some(max_round);
        }
    }
    roster
}
