use kampfbericht::models::{ElapsedTime, Group, Report};
use kampfbericht::{analyse, ReportOptions};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Line {
    Damage(u32, bool),
    Heal(u32),
    NoDamage(u32),
    Cast,
    Miss,
    Dodge,
    Tick(u32),
}

fn line() -> impl Strategy<Value = Line> {
    prop_oneof![
        (0u32..500, any::<bool>()).prop_map(|(n, crit)| Line::Damage(n, crit)),
        (0u32..500).prop_map(Line::Heal),
        (0u32..50).prop_map(Line::NoDamage),
        Just(Line::Cast),
        Just(Line::Miss),
        Just(Line::Dodge),
        (0u32..50).prop_map(Line::Tick),
    ]
}

fn render(actor: &str, seconds: u32, line: &Line) -> String {
    let time = format!("{}:{:02}", seconds / 60, seconds % 60);
    match line {
        Line::Damage(n, true) => {
            format!("{time} {actor} [Hieb] greift Ork an: verursacht {n} Schaden (krit. Treffer).")
        }
        Line::Damage(n, false) => format!("{time} {actor} [Hieb] greift Ork an: verursacht {n} Schaden."),
        Line::Heal(n) => format!("{time} {actor} zaubert [Heilung] auf Ork: heilt {n} LP."),
        Line::NoDamage(n) => {
            format!("{time} {actor} [Hieb] greift Ork an: kein Schaden ({n} Schaden pariert).")
        }
        Line::Cast => format!("{time} {actor} zaubert [Gift] auf Ork: erfolgreich."),
        Line::Miss => format!("{time} {actor} [Hieb] greift Ork an: verfehlt."),
        Line::Dodge => format!("{time} {actor} [Hieb] greift Ork an: weicht aus."),
        Line::Tick(n) => format!("{time} [Gift] wirkt auf Ork: verursacht {n} Schaden."),
    }
}

fn report_text(lines: &[(u8, u32, Line)]) -> String {
    let mut seconds = 0;
    let mut text = String::from("Runde 1\n");
    for (actor, step, line) in lines {
        seconds += step;
        let actor = if actor % 2 == 0 { "Magier" } else { "Krieger" };
        text.push_str(&render(actor, seconds, line));
        text.push('\n');
    }
    text
}

fn all_groups(report: &Report) -> Vec<&Group> {
    let mut groups = Vec::new();
    for group in report.values() {
        groups.push(group);
        if let Some(nested) = group.report() {
            groups.extend(all_groups(nested));
        }
    }
    groups
}

proptest! {
    #[test]
    fn percentages_stay_in_range(lines in prop::collection::vec((any::<u8>(), 0u32..30, line()), 0..60)) {
        let analysis = analyse(&report_text(&lines), &ReportOptions::default());
        for group in all_groups(&analysis.report) {
            let stats = &group.stats;
            for percent in [
                stats.miss_percent,
                stats.dodged_percent,
                stats.crit_percent,
                stats.block_percent,
                stats.parry_percent,
            ] {
                prop_assert!(percent.is_finite());
                prop_assert!((0.0..=100.0).contains(&percent), "{percent}");
            }
        }
    }

    #[test]
    fn rounds_are_never_counted_twice(lines in prop::collection::vec((any::<u8>(), 0u32..30, line()), 1..60)) {
        let analysis = analyse(&report_text(&lines), &ReportOptions::default());
        for group in all_groups(&analysis.report) {
            let mut rounds = group.stats.round_numbers();
            let total = rounds.len();
            rounds.sort_unstable();
            rounds.dedup();
            prop_assert_eq!(rounds.len(), total);
        }
    }

    #[test]
    fn round_is_monotonic_in_time(a in 0u32..6000, b in 0u32..6000) {
        let (early, late) = (a.min(b), a.max(b));
        let early = ElapsedTime::new(early / 60, early % 60);
        let late = ElapsedTime::new(late / 60, late % 60);
        prop_assert!(early <= late);
        prop_assert!(early.round() <= late.round());
    }
}
