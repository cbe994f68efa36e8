//! Loot table rows and the ledgers merged from them.

use indexmap::IndexMap;

use super::grammar::participant_name;
use crate::models::{Ledger, Rows};

pub const SUM_ROW: &str = "# Summe";
pub const UVP_COLUMN: &str = "# UVP";
pub const EXP_COLUMN: &str = "EXP";
pub const ROUNDS_COLUMN: &str = "Runden";

const HEADER_FIRST: &str = "Sieger";
const HEADER_SECOND: &str = "Beuteverteilung";

/// Loot, monetary value and UVP of one battle
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BattleLoot {
    pub loot: Rows,
    pub value: Rows,
    pub uvp: Rows,
}

fn is_header(line: &str) -> bool {
    let mut words = line.split_whitespace();
    words.next() == Some(HEADER_FIRST) && words.next() == Some(HEADER_SECOND)
}

/// `"3 Wolfsfell"` -> (3, "Wolfsfell"); `"Schwert"` -> (1, "Schwert")
fn loot_entry(entry: &str) -> Option<(f64, &str)> {
    let entry = entry.trim();
    let parsed = entry
        .split_once(char::is_whitespace)
        .and_then(|(amount, item)| Some((amount.parse::<u64>().ok()?, item.trim())));
    match parsed {
        Some((amount, item)) if !item.is_empty() => Some((amount as f64, item)),
        Some(_) => None,
        None if entry.is_empty() => None,
        None => Some((1.0, entry)),
    }
}

fn collect_entries(rows: &mut Rows, participant: &str, list: &str) {
    for (amount, item) in list.split(", ").filter_map(loot_entry) {
        rows.entry(participant.to_string())
            .or_default()
            .insert(item.to_string(), amount);
    }
}

/// Rows of the victory table: `<participant>\t<loot list>\t<uvp>[\t<value list>]`
pub fn extract_loot(body: &str) -> BattleLoot {
    let mut collected = BattleLoot::default();
    for line in body.lines() {
        if is_header(line) {
            continue;
        }
        let mut fields = line.split('\t');
        let (Some(participant), Some(loot)) = (fields.next(), fields.next()) else {
            continue;
        };
        let participant = participant.trim();
        let Ok(("", participant)) = participant_name(participant) else {
            continue;
        };
        if !loot.starts_with(|c: char| c.is_ascii_digit()) {
            continue;
        }

        if let Some(Ok(uvp)) = fields.next().map(|field| field.trim().parse::<u64>()) {
            collected
                .uvp
                .entry(participant.to_string())
                .or_default()
                .insert(UVP_COLUMN.to_string(), uvp as f64);
        }
        if let Some(value) = fields.next() {
            collect_entries(&mut collected.value, participant, value.trim_start_matches('\t'));
        }
        collect_entries(&mut collected.loot, participant, loot);
    }
    collected
}

/// Sum per-battle rows per participant and column, keeping first-appearance
/// order, and append a `sum_row` with the column totals when given.
pub fn merge<'a>(tables: impl IntoIterator<Item = &'a Rows>, sum_row: Option<&str>) -> Ledger {
    let mut ledger = Ledger::default();
    let mut sum: IndexMap<String, f64> = IndexMap::new();
    for table in tables {
        for (participant, columns) in table {
            let row = ledger.rows.entry(participant.clone()).or_default();
            for (column, amount) in columns {
                if !ledger.categories.contains(column) {
                    ledger.categories.push(column.clone());
                }
                *row.entry(column.clone()).or_default() += amount;
                *sum.entry(column.clone()).or_default() += amount;
            }
        }
    }
    if let Some(label) = sum_row {
        if !sum.is_empty() {
            ledger.rows.insert(label.to_string(), sum);
        }
    }
    ledger
}

fn per_action_point(label: &str, action_points_per_round: u32) -> String {
    let unit = if action_points_per_round > 1 { "AP" } else { "Runde" };
    format!("# {label} pro {unit}")
}

/// All ledgers of a run
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Ledgers {
    pub loot: Ledger,
    pub value: Ledger,
    pub uvp: Ledger,
    pub exp: Ledger,
}

/// Merge loot, value, UVP and experience over all battles.
///
/// `exp` holds one table per battle with the `EXP` and `Runden` columns of
/// each participant; `total_rounds` is the sum of the battles' last rounds.
pub fn summarise(
    battles: &[BattleLoot],
    exp: &[Rows],
    total_rounds: u32,
    action_points_per_round: u32,
) -> Ledgers {
    let ap = f64::from(action_points_per_round.max(1));
    let exp_per_ap = per_action_point(EXP_COLUMN, action_points_per_round);
    let uvp_per_ap = per_action_point("UVP", action_points_per_round);

    let mut loot = merge(
        battles
            .iter()
            .map(|b| &b.loot)
            .chain(battles.iter().map(|b| &b.uvp)),
        Some(SUM_ROW),
    );
    let value = merge(battles.iter().map(|b| &b.value), Some(SUM_ROW));
    let uvp = merge(battles.iter().map(|b| &b.uvp), Some(SUM_ROW));
    let mut exp = merge(exp, None);

    let mut wrote_uvp_per_ap = false;
    for (participant, columns) in exp.rows.iter_mut() {
        let rounds = columns.get(ROUNDS_COLUMN).copied().unwrap_or(0.0).max(1.0);
        let gained = columns.get(EXP_COLUMN).copied().unwrap_or(0.0);
        columns.insert(exp_per_ap.clone(), gained / rounds / ap);

        let looted = loot.rows.get_mut(participant);
        if let Some(row) = looted {
            if let Some(total) = row.get(UVP_COLUMN).copied() {
                row.insert(uvp_per_ap.clone(), total / rounds / ap);
                wrote_uvp_per_ap = true;
            }
        }
    }

    let participants = loot.rows.len().saturating_sub(1).max(1) as f64;
    if let Some(sum) = loot.rows.get_mut(SUM_ROW) {
        if let Some(total) = sum.get(UVP_COLUMN).copied() {
            let rounds = f64::from(total_rounds.max(1));
            sum.insert(uvp_per_ap.clone(), total / rounds / participants / ap);
            wrote_uvp_per_ap = true;
        }
    }
    if wrote_uvp_per_ap {
        loot.categories.push(uvp_per_ap);
    }
    if !exp.rows.is_empty() {
        exp.categories.push(exp_per_ap);
    }

    Ledgers {
        loot,
        value,
        uvp,
        exp,
    }
}
