//! Report parsing: battle blocks in, events, roster, loot and defeats out.
//!
//! Every battle runs through its own pass of extraction, caster resolution
//! and normalisation; only the results are merged, in battle order.

pub mod battles;
pub mod defeats;
pub mod grammar;
pub mod loot;
pub mod normalize;
pub mod resolver;
pub mod roster;

use std::time::Instant;

use indexmap::IndexMap;
use tracing::{debug, info};

use crate::models::{Analysis, ParticipantStats, Rows};
use crate::options::ReportOptions;
use crate::report::aggregate;

pub use battles::split_battles;
pub use grammar::extract_events;
pub use normalize::normalize;
pub use resolver::resolve_casters;

/// `EXP` and `Runden` of every roster entry that reports experience
fn exp_rows(roster: &IndexMap<String, ParticipantStats>) -> Rows {
    roster
        .iter()
        .filter_map(|(name, stats)| {
            let exp = stats.exp.filter(|&exp| exp != 0.0)?;
            let rounds = f64::from(stats.last_round.unwrap_or(0));
            let columns = IndexMap::from([
                (loot::EXP_COLUMN.to_string(), exp),
                (loot::ROUNDS_COLUMN.to_string(), rounds),
            ]);
            Some((name.clone(), columns))
        })
        .collect()
}

/// Analyse a complete raw report.
///
/// Never fails: unknown lines are skipped, unparsable numbers read as 0 and
/// events without a resolvable actor stay in the report as unresolved.
pub fn analyse(text: &str, options: &ReportOptions) -> Analysis {
    let started = Instant::now();
    let battles = split_battles(text, options.show_bandaging);

    let mut battle_loot = Vec::with_capacity(battles.len());
    let mut exp = Vec::with_capacity(battles.len());
    let mut participants: IndexMap<String, ParticipantStats> = IndexMap::new();
    let mut tally = defeats::DefeatTally::default();
    let mut events = Vec::new();
    let mut total_rounds = 0u32;

    for battle in &battles {
        battle_loot.push(loot::extract_loot(&battle.body));

        let battle_roster = roster::extract_roster(&battle.body);
        exp.push(exp_rows(&battle_roster));
        total_rounds = total_rounds.saturating_add(battle.last_round);

        let raw = extract_events(battle);
        tally.record_battle(&raw, &battle_roster);
        let resolved = resolve_casters(&raw);
        let normalized = normalize(&resolved);
        debug!(
            battle = %battle.start,
            events = normalized.len(),
            participants = battle_roster.len(),
            "parsed battle"
        );
        events.extend(normalized);

        for (name, stats) in battle_roster {
            participants.entry(name).or_insert(stats);
        }
    }

    let ledgers = loot::summarise(
        &battle_loot,
        &exp,
        total_rounds,
        options.action_points_per_round,
    );
    let report = aggregate(&events, &options.group_by);

    info!(
        battles = battles.len(),
        events = events.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "analysed report"
    );

    Analysis {
        battles,
        report,
        loot: ledgers.loot,
        value: ledgers.value,
        uvp: ledgers.uvp,
        exp: ledgers.exp,
        participants,
        defeats: tally.defeats,
        defeats_by_key: tally.defeats_by_key,
        damage_before: tally.damage_before,
        damage_before_by_key: tally.damage_before_by_key,
    }
}
