use kampfbericht::models::{Attribution, Children, GroupField, Report};
use kampfbericht::parser::loot::SUM_ROW;
use kampfbericht::{analyse, ReportOptions};

fn by_weapon() -> ReportOptions {
    ReportOptions {
        group_by: vec![GroupField::Participant, GroupField::Weapon],
        ..ReportOptions::default()
    }
}

fn weapons<'a>(report: &'a Report, participant: &str) -> &'a Report {
    report[participant]
        .report()
        .expect("participant level should have weapon children")
}

/// `M:SS` of the first second of `round`
fn round_start(round: u32) -> String {
    let seconds = (round - 1) * 24;
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

#[test]
fn combines_rounds() {
    let text = "
    Runde 1
    0:00 Magier zaubert [Buff] auf Verbündeter: erfolgreich.
    Runde 2
    0:42 Magier [Dmg] greift Gegner an: verursacht 12 Schaden
    Runde 3
    0:54 Magier [Dmg] greift Gegner an: verursacht 49 Schaden
    ";
    let analysis = analyse(text, &by_weapon());

    let magier = &analysis.report["Magier"];
    assert_eq!(magier.stats.round_numbers(), vec![1, 2, 3]);
    let spells = weapons(&analysis.report, "Magier");
    assert_eq!(spells["Buff"].stats.round_numbers(), vec![1]);
    assert_eq!(spells["Dmg"].stats.round_numbers(), vec![2, 3]);
    assert_eq!(spells["Dmg"].stats.totals.dmg, 61);
    assert_eq!((spells["Dmg"].stats.min_dmg, spells["Dmg"].stats.max_dmg), (12, 49));
}

#[test]
fn combines_rounds_over_six_rounds() {
    let text = "
    Runde 1
    0:00 Magier zaubert [Buff] auf Fimani: erfolgreich.
    0:08 Magier zaubert [Debuff] auf Gegner: erfolgreich.
    0:16 Magier zaubert [Heal] auf Verbündeter: heilt 31 LP.

    Runde 2
    0:26 Magier zaubert [Buff] auf Verbündeter: erfolgreich.
    0:34 Magier zaubert [Debuff] auf Gegner: erfolgreich.
    0:42 Magier [Dmg] greift Gegner an: verursacht 12 Schaden.

    Runde 3
    0:54 Magier [Dmg] greift Gegner an: verursacht 21 Schaden.
    1:06 Magier zaubert [Heal] auf Verbündeter: misslingt.

    Runde 4
    1:16 Magier [Dmg] greift Gegner an: verursacht 29 Schaden.
    1:28 Magier zaubert [Debuff] auf Gegner: erfolgreich.

    Runde 5
    1:36 Magier zaubert [Heal] auf Verbündeter: heilt 32 LP.

    Runde 6
    2:04 Magier zaubert [Buff] auf Verbündeter: erfolgreich.
    2:12 Magier [Dmg] greift Gegner an: verursacht 84 Schaden.
    ";
    let analysis = analyse(text, &by_weapon());

    assert_eq!(
        analysis.report["Magier"].stats.round_numbers(),
        vec![1, 2, 3, 4, 5, 6]
    );
    let spells = weapons(&analysis.report, "Magier");
    assert_eq!(spells["Buff"].stats.round_numbers(), vec![1, 2, 6]);
    assert_eq!(spells["Debuff"].stats.round_numbers(), vec![1, 2, 4]);
    assert_eq!(spells["Heal"].stats.round_numbers(), vec![1, 3, 5]);
    assert_eq!(spells["Dmg"].stats.round_numbers(), vec![2, 3, 4, 6]);

    let heal = &spells["Heal"].stats;
    assert_eq!(heal.totals.heal, 63);
    assert_eq!(heal.totals.miss, 1);
    assert!((heal.miss_percent - 100.0 / 3.0).abs() < 1e-9);
}

#[test]
fn rounds_only_include_rounds_with_events() {
    let mut text = String::new();
    for round in 1..=150 {
        text.push_str(&format!("Runde {round}\n"));
        if round == 1 || round == 150 {
            text.push_str(&format!(
                "{} Magier [Dmg] greift Gegner an: verursacht 5 Schaden.\n",
                round_start(round)
            ));
        }
    }
    let analysis = analyse(&text, &by_weapon());

    assert_eq!(analysis.battles[0].last_round, 150);
    assert_eq!(analysis.report["Magier"].stats.round_numbers(), vec![1, 150]);
}

#[test]
fn one_attack_in_each_of_150_rounds() {
    let mut text = String::new();
    for round in 1..=150 {
        text.push_str(&format!(
            "Runde {round}\n{} Magier [Dmg] greift Gegner an: verursacht 5 Schaden.\n",
            round_start(round)
        ));
    }
    let analysis = analyse(&text, &by_weapon());

    let rounds = analysis.report["Magier"].stats.round_numbers();
    assert_eq!(rounds.len(), 150);
    assert_eq!(rounds.first(), Some(&1));
    assert_eq!(rounds.last(), Some(&150));
    assert_eq!(analysis.report["Magier"].stats.totals.dmg, 750);
}

#[test]
fn area_heal_tick_goes_to_its_caster() {
    let text = "
    Runde 1
    0:00 Alrik zaubert [Flächen-Regeneration I] auf Bjarne: erfolgreich.
    0:04 Bjarne zaubert [Flächen-Regeneration I] auf Alrik: erfolgreich.
    Runde 2
    0:24 [Flächen-Regeneration I] wirkt auf Bjarne: heilt 7 LP.
    0:24 [Flächen-Regeneration I] wirkt auf Alrik: heilt 9 LP.
    ";
    let options = ReportOptions {
        group_by: vec![GroupField::Participant, GroupField::Target],
        ..ReportOptions::default()
    };
    let analysis = analyse(text, &options);

    let alrik = &analysis.report["Alrik"];
    assert_eq!(alrik.stats.totals.heal, 7);
    assert_eq!(alrik.report().unwrap()["Bjarne"].stats.totals.heal, 7);
    let bjarne = &analysis.report["Bjarne"];
    assert_eq!(bjarne.stats.totals.heal, 9);

    let Children::Leaf(ticks) = &alrik.report().unwrap()["Bjarne"].children else {
        panic!("target level should hold events");
    };
    assert!(ticks
        .iter()
        .any(|event| event.attribution == Attribution::Backtracked));
}

#[test]
fn unresolved_tick_is_kept_but_inert() {
    let text = "
    Runde 1
    0:05 [Gift] wirkt auf Ork: verursacht 6 Schaden.
    ";
    let analysis = analyse(text, &by_weapon());

    let unknown = &analysis.report["?"];
    assert_eq!(unknown.stats.totals.dmg, 0);
    assert_eq!(unknown.stats.totals.activate, 1);
    let events = weapons(&analysis.report, "?")["Gift"].events().unwrap();
    assert_eq!(events[0].attribution, Attribution::Unresolved);
}

#[test]
fn loot_is_merged_across_battles() {
    let text = "Kampfinformationen [Kampfbeginn: 02.03.2024 19:00]
Runde 1
0:00 Magier [Dmg] greift Gegner an: verursacht 5 Schaden.
Sieger\tBeuteverteilung\tUVP
Magier\t2 Wolfsfell, 1 Zahn\t10
Krieger\t1 Wolfsfell\t4
Kampfinformationen [Kampfbeginn: 02.03.2024 19:10]
Runde 1
0:00 Krieger [Schlag] greift Gegner an: verursacht 7 Schaden.
Sieger\tBeuteverteilung\tUVP
Krieger\t3 Zahn, 2 Wolfsfell\t6
Magier\t1 Wolfsfell\t2
";
    let analysis = analyse(text, &ReportOptions::default());
    let loot = &analysis.loot;

    assert_eq!(loot.get("Magier", "Wolfsfell"), Some(3.0));
    assert_eq!(loot.get("Magier", "Zahn"), Some(1.0));
    assert_eq!(loot.get("Krieger", "Wolfsfell"), Some(3.0));
    assert_eq!(loot.get("Krieger", "Zahn"), Some(3.0));
    assert_eq!(loot.get(SUM_ROW, "Wolfsfell"), Some(6.0));
    assert_eq!(loot.get(SUM_ROW, "Zahn"), Some(4.0));
    assert_eq!(loot.get(SUM_ROW, "# UVP"), Some(22.0));
    assert_eq!(
        loot.rows.keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["Magier", "Krieger", SUM_ROW]
    );
    assert_eq!(&loot.categories[..3], ["Wolfsfell", "Zahn", "# UVP"]);
    assert_eq!(analysis.uvp.get("Magier", "# UVP"), Some(12.0));
}

#[test]
fn no_damage_blocked_attack() {
    let text = "
    Runde 1
    0:10 Krieger [Schlag] greift Ork an: kein Schaden (7 Schaden geblockt).
    ";
    let analysis = analyse(text, &by_weapon());
    let totals = &weapons(&analysis.report, "Krieger")["Schlag"].stats.totals;

    assert_eq!(totals.hit, 1);
    assert_eq!(totals.block, 7);
    assert_eq!(totals.blocked, 1);
    assert_eq!(totals.dmg, 0);
    assert_eq!(analysis.report["Krieger"].stats.block_percent, 100.0);
}

#[test]
fn bandaging_section_is_dropped_unless_requested() {
    let text = "Kampfinformationen [Kampfbeginn: 02.03.2024 19:00]
Runde 1
0:00 Magier [Dmg] greift Gegner an: verursacht 5 Schaden.
Runde 2
0:30 Magier versorgt Krieger.
0:31 Magier zaubert [Verband] auf Krieger: heilt 20 LP.
";
    let hidden = analyse(text, &by_weapon());
    assert!(!weapons(&hidden.report, "Magier").contains_key("Verband"));
    assert_eq!(hidden.battles[0].last_round, 2);

    let shown = analyse(
        text,
        &ReportOptions {
            show_bandaging: true,
            ..by_weapon()
        },
    );
    assert_eq!(
        weapons(&shown.report, "Magier")["Verband"].stats.totals.heal,
        20
    );
}

#[test]
fn defeats_are_counted_per_name_and_level() {
    let text = "Kampfinformationen [Kampfbeginn: 02.03.2024 19:00]
[?] Krieger 9 aktiv 70% 80
[?] Ork #1 4 besiegt
[?] Ork #2 5 besiegt
Runde 1
0:02 Krieger [Schlag] greift Ork #1 an: verursacht 11 Schaden.
0:03 Ork #1 sinkt kampfunfähig zu Boden.
0:05 Krieger [Schlag] greift Ork #2 an: verursacht 13 Schaden (krit. Treffer).
0:06 Ork #2 sinkt kampfunfähig zu Boden.
";
    let analysis = analyse(text, &by_weapon());

    assert_eq!(analysis.defeats["Ork"], 2);
    assert_eq!(analysis.defeats_by_key["Ork|4"], 1);
    assert_eq!(analysis.defeats_by_key["Ork|5"], 1);
    assert_eq!(analysis.damage_before["Ork"], vec![11, 13]);
    assert_eq!(analysis.damage_before_by_key["Ork|5"], vec![13]);

    // the defeat lines are credited to the attacker as a marker
    let krieger = weapons(&analysis.report, "Krieger");
    assert_eq!(krieger["(Kampfunfähig)"].stats.totals.dmg, 0);
    assert_eq!(krieger["Schlag"].stats.max_crit, 13);
    assert_eq!(analysis.participants["Ork #1"].last_round, Some(1));
}
