//! Multi-key ordering of report levels.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::KampfberichtError;
use crate::models::{Aggregation, Children, Group, Report};

/// Numeric value of an [`Aggregation`] addressable by name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum Metric {
    Cast,
    Crit,
    Dmg,
    Heal,
    Hit,
    Healed,
    Miss,
    Dodged,
    Activate,
    Attack,
    Blocked,
    Block,
    Parried,
    Parry,
    MinDmg,
    MaxDmg,
    MinCrit,
    MaxCrit,
    MissPercent,
    DodgedPercent,
    CritPercent,
    BlockPercent,
    ParryPercent,
    /// Number of distinct rounds
    Rounds,
    DmgPerRound,
    HealPerRound,
}

impl Metric {
    pub const ALL: [Metric; 26] = [
        Metric::Cast,
        Metric::Crit,
        Metric::Dmg,
        Metric::Heal,
        Metric::Hit,
        Metric::Healed,
        Metric::Miss,
        Metric::Dodged,
        Metric::Activate,
        Metric::Attack,
        Metric::Blocked,
        Metric::Block,
        Metric::Parried,
        Metric::Parry,
        Metric::MinDmg,
        Metric::MaxDmg,
        Metric::MinCrit,
        Metric::MaxCrit,
        Metric::MissPercent,
        Metric::DodgedPercent,
        Metric::CritPercent,
        Metric::BlockPercent,
        Metric::ParryPercent,
        Metric::Rounds,
        Metric::DmgPerRound,
        Metric::HealPerRound,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Metric::Cast => "cast",
            Metric::Crit => "crit",
            Metric::Dmg => "dmg",
            Metric::Heal => "heal",
            Metric::Hit => "hit",
            Metric::Healed => "healed",
            Metric::Miss => "miss",
            Metric::Dodged => "dodged",
            Metric::Activate => "activate",
            Metric::Attack => "attack",
            Metric::Blocked => "blocked",
            Metric::Block => "block",
            Metric::Parried => "parried",
            Metric::Parry => "parry",
            Metric::MinDmg => "min_dmg",
            Metric::MaxDmg => "max_dmg",
            Metric::MinCrit => "min_crit",
            Metric::MaxCrit => "max_crit",
            Metric::MissPercent => "miss_percent",
            Metric::DodgedPercent => "dodged_percent",
            Metric::CritPercent => "crit_percent",
            Metric::BlockPercent => "block_percent",
            Metric::ParryPercent => "parry_percent",
            Metric::Rounds => "rounds",
            Metric::DmgPerRound => "dmg_per_round",
            Metric::HealPerRound => "heal_per_round",
        }
    }

    pub fn value(&self, stats: &Aggregation) -> f64 {
        let totals = &stats.totals;
        let rounds = stats.rounds.len() as f64;
        let per_round = |total: u64| if rounds > 0.0 { total as f64 / rounds } else { 0.0 };
        match self {
            Metric::Cast => totals.cast as f64,
            Metric::Crit => totals.crit as f64,
            Metric::Dmg => totals.dmg as f64,
            Metric::Heal => totals.heal as f64,
            Metric::Hit => totals.hit as f64,
            Metric::Healed => totals.healed as f64,
            Metric::Miss => totals.miss as f64,
            Metric::Dodged => totals.dodged as f64,
            Metric::Activate => totals.activate as f64,
            Metric::Attack => totals.attack as f64,
            Metric::Blocked => totals.blocked as f64,
            Metric::Block => totals.block as f64,
            Metric::Parried => totals.parried as f64,
            Metric::Parry => totals.parry as f64,
            Metric::MinDmg => stats.min_dmg as f64,
            Metric::MaxDmg => stats.max_dmg as f64,
            Metric::MinCrit => stats.min_crit as f64,
            Metric::MaxCrit => stats.max_crit as f64,
            Metric::MissPercent => stats.miss_percent,
            Metric::DodgedPercent => stats.dodged_percent,
            Metric::CritPercent => stats.crit_percent,
            Metric::BlockPercent => stats.block_percent,
            Metric::ParryPercent => stats.parry_percent,
            Metric::Rounds => rounds,
            Metric::DmgPerRound => per_round(totals.dmg),
            Metric::HealPerRound => per_round(totals.heal),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Accepts `miss_percent`, `missPercent` and `MISS_PERCENT` alike
impl FromStr for Metric {
    type Err = KampfberichtError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let folded: String = name
            .trim()
            .chars()
            .filter(|&c| c != '_')
            .map(|c| c.to_ascii_lowercase())
            .collect();
        Metric::ALL
            .into_iter()
            .find(|metric| metric.name().replace('_', "") == folded)
            .ok_or_else(|| KampfberichtError::UnknownField {
                name: name.trim().to_string(),
            })
    }
}

impl TryFrom<String> for Metric {
    type Error = KampfberichtError;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        name.parse()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Asc,
    #[default]
    Desc,
}

impl FromStr for Direction {
    type Err = KampfberichtError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(Direction::Asc),
            "desc" => Ok(Direction::Desc),
            _ => Err(KampfberichtError::UnknownDirection {
                name: name.trim().to_string(),
            }),
        }
    }
}

/// A named sort key with its direction, as accepted from callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSpec {
    pub key: Metric,
    #[serde(default)]
    pub direction: Direction,
}

/// Scoring function over a whole group
pub type Score = Arc<dyn Fn(&Aggregation) -> f64 + Send + Sync>;

#[derive(Clone)]
pub enum SortKey {
    Metric(Metric),
    Score(Score),
}

impl SortKey {
    pub fn score<F>(score: F) -> Self
    where
        F: Fn(&Aggregation) -> f64 + Send + Sync + 'static,
    {
        SortKey::Score(Arc::new(score))
    }

    fn value(&self, stats: &Aggregation) -> f64 {
        match self {
            SortKey::Metric(metric) => metric.value(stats),
            SortKey::Score(score) => score(stats),
        }
    }
}

impl fmt::Debug for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortKey::Metric(metric) => f.debug_tuple("Metric").field(metric).finish(),
            SortKey::Score(_) => f.write_str("Score(..)"),
        }
    }
}

impl From<OrderSpec> for (SortKey, Direction) {
    fn from(spec: OrderSpec) -> Self {
        (SortKey::Metric(spec.key), spec.direction)
    }
}

/// `dmg` descending
pub fn default_order() -> Vec<(SortKey, Direction)> {
    vec![(SortKey::Metric(Metric::Dmg), Direction::Desc)]
}

fn compare(a: &Aggregation, b: &Aggregation, order: &[(SortKey, Direction)]) -> Ordering {
    order
        .iter()
        .map(|(key, direction)| {
            let ordering = key.value(a).total_cmp(&key.value(b));
            match direction {
                Direction::Asc => ordering,
                Direction::Desc => ordering.reverse(),
            }
        })
        .find(|ordering| ordering.is_ne())
        .unwrap_or(Ordering::Equal)
}

/// Reorder the siblings of every level of `report`.
///
/// Keys are applied as a composite ordering, first key first. Equal groups
/// keep their relative order and leaf event lists are left untouched.
pub fn order_report(report: &Report, order: &[(SortKey, Direction)]) -> Report {
    let mut entries: Vec<(&String, &Group)> = report.iter().collect();
    entries.sort_by(|(_, a), (_, b)| compare(&a.stats, &b.stats, order));

    entries
        .into_iter()
        .map(|(key, group)| {
            let children = match &group.children {
                Children::Node(nested) => Children::Node(order_report(nested, order)),
                Children::Leaf(events) => Children::Leaf(events.clone()),
            };
            let ordered = Group {
                field: group.field,
                stats: group.stats.clone(),
                children,
            };
            (key.clone(), ordered)
        })
        .collect()
}
