//! Event line grammar.
//!
//! Every production is a small `nom` parser over one line of a battle body.
//! Lines that match no production are not part of the combat grammar and are
//! skipped by the caller.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_until, take_while1, take_while_m_n},
    character::complete::{char, digit1, one_of, space1},
    combinator::{all_consuming, map, opt, value, verify},
    multi::many_m_n,
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};
use tracing::warn;

use crate::models::*;

pub const MOVE_PHRASE: &str = "nähert sich";
pub const DEFEAT_PHRASE: &str = "sinkt kampfunfähig zu Boden";
const SWAP_PHRASE: &str = "wechselt in den";

/// Words a name may grow by after its first word
const MAX_NAME_EXTENSION: usize = 5;

/// A matched event line, borrowing from the battle body
#[derive(Debug, Clone, PartialEq)]
pub struct EventLine<'a> {
    pub time: ElapsedTime,
    pub participant: Option<&'a str>,
    pub action: Action,
    pub target: Option<&'a str>,
    pub amount: Option<Amount>,
    pub outcome: Option<Outcome>,
    pub critical: Option<Critical>,
    pub absorbed: Option<Absorb>,
}

impl EventLine<'_> {
    pub fn into_raw(self, battle: &str, line: usize) -> RawEvent {
        RawEvent {
            battle: battle.to_string(),
            line,
            time: self.time,
            participant: self.participant.map(str::to_string),
            action: self.action,
            target: self.target.map(str::to_string),
            amount: self.amount,
            outcome: self.outcome,
            critical: self.critical,
            absorbed: self.absorbed,
            attribution: Attribution::Explicit,
        }
    }
}

/// Parse decimal digits, falling back to 0 on overflow
pub fn parse_number<T: std::str::FromStr + Default>(digits: &str) -> T {
    digits.parse().unwrap_or_default()
}

/// `M:SS`
pub fn elapsed_time(input: &str) -> IResult<&str, ElapsedTime> {
    let (rest, (minutes, _, seconds)) = tuple((
        digit1,
        char(':'),
        take_while_m_n(2, 2, |c: char| c.is_ascii_digit()),
    ))(input)?;
    Ok((rest, ElapsedTime::new(parse_number(minutes), parse_number(seconds))))
}

/// `Runde N`
pub fn round_header(input: &str) -> IResult<&str, u32> {
    map(preceded(pair(tag("Runde"), space1), digit1), |n: &str| {
        parse_number::<u32>(n)
    })(input)
}

/// Highest `Runde N` anywhere in `text`, 0 if there is none
pub fn last_round(text: &str) -> u32 {
    text.match_indices("Runde")
        .filter_map(|(at, _)| round_header(&text[at..]).ok())
        .map(|(_, round)| round)
        .max()
        .unwrap_or(0)
}

fn is_name_char(c: char) -> bool {
    c.is_alphabetic() || c == '´'
}

fn is_capitalised(word: &str) -> bool {
    word.chars()
        .next()
        .is_some_and(|c| c.is_uppercase() || c == 'ß')
}

fn name_word(input: &str) -> IResult<&str, &str> {
    take_while1(is_name_char)(input)
}

/// A participant or monster name: a capitalised word, optionally grown by up
/// to five space- or dash-separated words of which only the first two may be
/// lower case and the last must be capitalised ("Graf von Drakenfels"),
/// optionally followed by an instance suffix ` #N`.
pub fn participant_name(input: &str) -> IResult<&str, &str> {
    let (mut rest, _) = verify(name_word, |word: &str| is_capitalised(word))(input)?;
    let mut cursor = rest;
    for index in 0..MAX_NAME_EXTENSION {
        let extension: IResult<&str, (char, &str)> = pair(one_of(" -"), name_word)(cursor);
        let Ok((after, (_, word))) = extension else {
            break;
        };
        let capitalised = is_capitalised(word);
        if index >= 2 && !capitalised {
            break;
        }
        cursor = after;
        if capitalised {
            rest = after;
        }
    }
    let (rest, _) = opt(pair(tag(" #"), digit1))(rest)?;
    let consumed = input.len() - rest.len();
    Ok((rest, &input[..consumed]))
}

fn lower_word(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_lowercase())(input)
}

fn stance(input: &str) -> IResult<&str, Stance> {
    alt((
        value(Stance::Melee, tag("Nahkampf")),
        value(Stance::Ranged, tag("Fernkampf")),
    ))(input)
}

/// `<name> nähert sich [<target>]`, `<name> sinkt kampfunfähig zu Boden`,
/// `<name> wechselt in den Nahkampf|Fernkampf`
fn marker(input: &str) -> IResult<&str, (Option<&str>, Action, Option<&str>)> {
    fn named<'a>(
        phrase: &'static str,
    ) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
        move |input: &'a str| {
            let (rest, name) = take_until(phrase)(input)?;
            let (_, name) = all_consuming(participant_name)(name.trim_end())?;
            let (rest, _) = tag(phrase)(rest)?;
            Ok((rest, name))
        }
    }

    alt((
        map(
            pair(
                named(MOVE_PHRASE),
                opt(preceded(space1, participant_name)),
            ),
            |(name, target)| (Some(name), Action::Move, target),
        ),
        map(named(DEFEAT_PHRASE), |name| (Some(name), Action::Defeat, None)),
        map(
            pair(named(SWAP_PHRASE), preceded(space1, stance)),
            |(name, stance)| (Some(name), Action::Swap(stance), None),
        ),
    ))(input)
}

/// `[<participant> <verb>] [<ability>] <verb> [<verb>] [<target>]`
fn ability(input: &str) -> IResult<&str, (Option<&str>, Action, Option<&str>)> {
    let (rest, prefix) = take_until("[")(input)?;
    let (rest, label) = delimited(char('['), take_until("]"), char(']'))(rest)?;
    let (rest, _) = opt(preceded(space1, many_m_n(1, 2, terminated(lower_word, space1))))(rest)?;
    let (rest, target) = opt(participant_name)(rest)?;

    let participant = participant_name(prefix).ok().map(|(_, name)| name);
    let label = label.trim();
    let label = (!label.is_empty()).then(|| label.to_string());
    Ok((rest, (participant, Action::Ability(label), target)))
}

fn amount_clause(input: &str) -> IResult<&str, Amount> {
    alt((
        map(preceded(tag("verursacht "), digit1), |n| Amount::Damage(parse_number(n))),
        map(preceded(tag("heilt "), digit1), |n| Amount::Heal(parse_number(n))),
    ))(input)
}

fn outcome_keyword(input: &str) -> IResult<&str, Outcome> {
    alt((
        value(Outcome::NoDamage, tag("kein Schaden")),
        value(Outcome::Successful, tag("erfolgreich")),
        value(Outcome::Missed, tag("verfehlt")),
        value(Outcome::Failed, tag("misslingt")),
        value(Outcome::Dodged, tag("weicht aus")),
    ))(input)
}

#[derive(Clone)]
enum Annotation {
    Critical(Critical),
    Absorb(Absorb),
}

fn annotation(input: &str) -> IResult<&str, Annotation> {
    alt((
        value(Annotation::Critical(Critical::Critical), tag("krit. Treffer")),
        value(Annotation::Critical(Critical::Excellent), tag("exzellenter Treffer")),
        map(terminated(digit1, tag(" Schaden geblockt")), |n| {
            Annotation::Absorb(Absorb::Block(parse_number(n)))
        }),
        map(terminated(digit1, tag(" Schaden pariert")), |n| {
            Annotation::Absorb(Absorb::Parry(parse_number(n)))
        }),
    ))(input)
}

fn parenthesized(input: &str) -> IResult<&str, &str> {
    preceded(
        take_until("("),
        delimited(char('('), take_until(")"), char(')')),
    )(input)
}

/// Qualifiers in parentheses after the outcome; the first of each kind wins
fn annotations(mut input: &str) -> (Option<Critical>, Option<Absorb>) {
    let mut critical = None;
    let mut absorbed = None;
    while let Ok((rest, content)) = parenthesized(input) {
        match annotation(content) {
            Ok((_, Annotation::Critical(c))) => {
                critical.get_or_insert(c);
            }
            Ok((_, Annotation::Absorb(a))) => {
                absorbed.get_or_insert(a);
            }
            Err(_) => {}
        }
        input = rest;
    }
    (critical, absorbed)
}

/// A complete event line starting with its elapsed time
pub fn event_line(input: &str) -> IResult<&str, EventLine<'_>> {
    let (rest, time) = terminated(elapsed_time, space1)(input)?;
    let (rest, (participant, action, target)) = alt((marker, ability))(rest)?;
    let (rest, _) = opt(terminated(take_until(": "), tag(": ")))(rest)?;
    let (rest, amount) = opt(amount_clause)(rest)?;
    let (rest, outcome) = match amount {
        Some(_) => (rest, None),
        None => opt(outcome_keyword)(rest)?,
    };
    let (critical, absorbed) = annotations(rest);
    Ok((
        "",
        EventLine {
            time,
            participant,
            action,
            target,
            amount,
            outcome,
            critical,
            absorbed,
        },
    ))
}

/// All events of one battle, in line order
pub fn extract_events(battle: &Battle) -> Vec<RawEvent> {
    battle
        .body
        .lines()
        .enumerate()
        .filter_map(|(index, line)| {
            let line = line.trim_start();
            let (_, parsed) = event_line(line).ok()?;
            if parsed.action == Action::Ability(None) {
                warn!(battle = %battle.start, line = index, raw = line, "event without ability label");
            }
            Some(parsed.into_raw(&battle.start, index))
        })
        .collect()
}
