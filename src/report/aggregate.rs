//! Recursive group-by of normalised events.

use indexmap::{IndexMap, IndexSet};

use crate::models::{Aggregation, Children, Group, GroupField, NormalizedEvent, Report, RoundRef};

/// `part / whole * 100`, clamped to `0..=100`; 0 when `whole` is 0
fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    (part as f64 / whole as f64 * 100.0).clamp(0.0, 100.0)
}

/// Sum the counters of `events` and derive extremes and rates.
///
/// Movement, defeat and swap markers only add their round.
pub fn summarize<'a>(events: impl IntoIterator<Item = &'a NormalizedEvent>) -> Aggregation {
    let mut stats = Aggregation::default();
    let mut rounds: IndexSet<RoundRef> = IndexSet::new();
    let mut damage: Option<(u64, u64)> = None;
    let mut critical: Option<(u64, u64)> = None;

    for event in events {
        rounds.insert(RoundRef {
            battle: event.battle.clone(),
            round: event.round,
        });
        if event.weapon.is_marker() {
            continue;
        }

        let counters = &event.counters;
        if counters.dmg > 0 {
            let extremes = if counters.crit > 0 { &mut critical } else { &mut damage };
            let (min, max) = extremes.get_or_insert((counters.dmg, counters.dmg));
            *min = (*min).min(counters.dmg);
            *max = (*max).max(counters.dmg);
        }
        stats.totals += *counters;
    }

    stats.rounds = rounds.into_iter().collect();
    (stats.min_dmg, stats.max_dmg) = damage.unwrap_or_default();
    (stats.min_crit, stats.max_crit) = critical.unwrap_or_default();

    let t = &stats.totals;
    stats.miss_percent = percent(t.miss, t.attack);
    stats.dodged_percent = percent(t.dodged, t.attack.saturating_sub(t.miss));
    stats.crit_percent = percent(t.crit, t.hit + t.healed);
    stats.block_percent = percent(t.blocked, t.hit);
    stats.parry_percent = percent(t.parried, t.hit);
    stats
}

/// Group `events` by `fields`, outermost first.
///
/// Buckets keep the order in which their key first appears. An empty field
/// list yields an empty report.
pub fn aggregate(events: &[NormalizedEvent], fields: &[GroupField]) -> Report {
    let Some((&field, rest)) = fields.split_first() else {
        return Report::new();
    };

    let mut buckets: IndexMap<String, Vec<NormalizedEvent>> = IndexMap::new();
    for event in events {
        buckets
            .entry(field.key_of(event))
            .or_default()
            .push(event.clone());
    }

    buckets
        .into_iter()
        .map(|(key, members)| {
            let stats = summarize(&members);
            let children = if rest.is_empty() {
                Children::Leaf(members)
            } else {
                Children::Node(aggregate(&members, rest))
            };
            (
                key,
                Group {
                    field,
                    stats,
                    children,
                },
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Ability, Attribution, Counters, ElapsedTime, UNKNOWN_KEY};

    fn event(participant: Option<&str>, weapon: Ability, round: u32, counters: Counters) -> NormalizedEvent {
        NormalizedEvent {
            participant: participant.map(Into::into),
            weapon,
            target: Some("Ork".into()),
            round,
            time: ElapsedTime::new(0, (round - 1) * 24 % 60),
            battle: "Test".into(),
            attribution: Attribution::Explicit,
            counters,
        }
    }

    fn named(name: &str) -> Ability {
        Ability::Named(name.into())
    }

    fn hit(dmg: u64, crit: u64) -> Counters {
        Counters {
            hit: 1,
            attack: 1,
            dmg,
            crit,
            ..Counters::default()
        }
    }

    #[test]
    fn test_percent_guards() {
        assert_eq!(percent(1, 0), 0.0);
        assert_eq!(percent(1, 4), 25.0);
        assert_eq!(percent(5, 4), 100.0);
    }

    #[test]
    fn test_rounds_are_deduplicated_per_battle() {
        let mut other = event(Some("Krieger"), named("Schlag"), 1, hit(5, 0));
        other.battle = "Zweiter".into();
        let events = vec![
            event(Some("Krieger"), named("Schlag"), 1, hit(5, 0)),
            event(Some("Krieger"), named("Schlag"), 1, hit(7, 0)),
            event(Some("Krieger"), named("Schlag"), 3, hit(9, 0)),
            other,
        ];
        let stats = summarize(&events);
        assert_eq!(stats.rounds.len(), 3);
        assert_eq!(stats.round_numbers(), vec![1, 3, 1]);
    }

    #[test]
    fn test_extremes_track_crits_separately() {
        let events = vec![
            event(Some("Krieger"), named("Schlag"), 1, hit(5, 0)),
            event(Some("Krieger"), named("Schlag"), 1, hit(40, 1)),
            event(Some("Krieger"), named("Schlag"), 2, hit(12, 0)),
            event(Some("Krieger"), named("Schlag"), 2, hit(0, 0)),
            event(Some("Krieger"), named("Schlag"), 2, hit(25, 1)),
        ];
        let stats = summarize(&events);
        assert_eq!((stats.min_dmg, stats.max_dmg), (5, 12));
        assert_eq!((stats.min_crit, stats.max_crit), (25, 40));
        assert_eq!(stats.totals.dmg, 82);
        assert_eq!(stats.crit_percent, 40.0);
    }

    #[test]
    fn test_markers_only_add_rounds() {
        let events = vec![
            event(Some("Krieger"), named("Schlag"), 1, hit(5, 0)),
            event(Some("Krieger"), Ability::Movement, 2, Counters { attack: 1, ..Counters::default() }),
            event(Some("Ork"), Ability::Defeat, 3, Counters { attack: 1, ..Counters::default() }),
        ];
        let stats = summarize(&events);
        assert_eq!(stats.round_numbers(), vec![1, 2, 3]);
        assert_eq!(stats.totals.attack, 1);
    }

    #[test]
    fn test_rates() {
        let events = vec![
            event(Some("Krieger"), named("Schlag"), 1, Counters { attack: 1, miss: 1, ..Counters::default() }),
            event(Some("Krieger"), named("Schlag"), 1, Counters { attack: 1, dodged: 1, ..Counters::default() }),
            event(Some("Krieger"), named("Schlag"), 1, Counters { blocked: 1, block: 3, ..hit(4, 0) }),
            event(Some("Krieger"), named("Schlag"), 1, Counters { parried: 1, parry: 2, ..hit(6, 1) }),
        ];
        let stats = summarize(&events);
        assert_eq!(stats.miss_percent, 25.0);
        assert!((stats.dodged_percent - 100.0 / 3.0).abs() < 1e-9);
        assert_eq!(stats.crit_percent, 50.0);
        assert_eq!(stats.block_percent, 50.0);
        assert_eq!(stats.parry_percent, 50.0);
    }

    #[test]
    fn test_nested_grouping() {
        let events = vec![
            event(Some("Krieger"), named("Schlag"), 1, hit(5, 0)),
            event(Some("Magier"), named("Blitz"), 1, hit(9, 0)),
            event(Some("Krieger"), named("Tritt"), 2, hit(3, 0)),
            event(None, named("Gift"), 2, Counters { activate: 1, ..Counters::default() }),
        ];
        let report = aggregate(&events, &[GroupField::Participant, GroupField::Weapon]);
        assert_eq!(
            report.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["Krieger", "Magier", UNKNOWN_KEY]
        );

        let krieger = &report["Krieger"];
        assert_eq!(krieger.field, GroupField::Participant);
        assert_eq!(krieger.stats.totals.dmg, 8);
        let weapons = krieger.report().unwrap();
        assert_eq!(weapons["Tritt"].field, GroupField::Weapon);
        assert_eq!(weapons["Tritt"].events().unwrap().len(), 1);
        assert_eq!(report[UNKNOWN_KEY].stats.totals.activate, 1);
    }

    #[test]
    fn test_no_fields_no_report() {
        let events = vec![event(Some("Krieger"), named("Schlag"), 1, hit(5, 0))];
        assert!(aggregate(&events, &[]).is_empty());
    }
}
