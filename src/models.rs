use std::fmt;
use std::ops::{AddAssign, Range};

use chrono::NaiveDateTime;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize, Serializer};

/// Seconds per combat round; the game's fixed tempo.
pub const SECONDS_PER_ROUND: u32 = 24;

/// Group key used when an event carries no value for the grouping field
pub const UNKNOWN_KEY: &str = "?";

/// One battle block cut out of a raw report
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Battle {
    /// Label captured from `Kampfinformationen [Kampfbeginn: <label>]`
    pub start: String,
    /// `start` read as a German date, when it is one
    pub started_at: Option<NaiveDateTime>,
    #[serde(skip)]
    pub body: String,
    /// Highest `Runde N` seen in the body
    pub last_round: u32,
    pub byte_range: Range<usize>,
    pub line_range: Range<usize>,
}

/// Elapsed time of an event since the battle started, written `M:SS` in the log
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ElapsedTime {
    minutes: u32,
    seconds: u32,
}

impl ElapsedTime {
    pub fn new(minutes: u32, seconds: u32) -> Self {
        ElapsedTime { minutes, seconds }
    }

    pub fn total_seconds(&self) -> u32 {
        self.minutes.saturating_mul(60).saturating_add(self.seconds)
    }

    /// Round the event falls into: `floor(seconds / 24) + 1`
    pub fn round(&self) -> u32 {
        self.total_seconds() / SECONDS_PER_ROUND + 1
    }

    /// True for the first second of a round (where headers and events share a timestamp)
    pub fn starts_round(&self) -> bool {
        self.total_seconds() % SECONDS_PER_ROUND == 0
    }
}

impl fmt::Display for ElapsedTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:02}", self.minutes, self.seconds)
    }
}

impl Serialize for ElapsedTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// What a log line describes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// `[<ability>]`; `None` when the brackets are empty
    Ability(Option<String>),
    Move,
    Defeat,
    Swap(Stance),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stance {
    Melee,
    Ranged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Amount {
    Damage(u32),
    Heal(u32),
}

/// Outcome keyword following the `: ` of an event line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// "kein Schaden"
    NoDamage,
    /// "erfolgreich"
    Successful,
    /// "misslingt"
    Failed,
    /// "verfehlt"
    Missed,
    /// "weicht aus"
    Dodged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Critical {
    /// "krit. Treffer"
    Critical,
    /// "exzellenter Treffer"
    Excellent,
}

/// Damage absorbed, from `(N Schaden geblockt)` or `(N Schaden pariert)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Absorb {
    Block(u32),
    Parry(u32),
}

/// How the acting participant of an event was determined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Attribution {
    /// Named on the log line
    #[default]
    Explicit,
    /// Inherited from a preceding cast of the same ability on the same target
    Backtracked,
    /// Taken from the special ability table
    Inferred,
    /// No actor could be found
    Unresolved,
}

/// One matched event line, before caster resolution
#[derive(Debug, Clone, PartialEq)]
pub struct RawEvent {
    /// Start label of the owning battle
    pub battle: String,
    /// Zero-based line index inside the battle body
    pub line: usize,
    pub time: ElapsedTime,
    pub participant: Option<String>,
    pub action: Action,
    pub target: Option<String>,
    pub amount: Option<Amount>,
    pub outcome: Option<Outcome>,
    pub critical: Option<Critical>,
    pub absorbed: Option<Absorb>,
    pub attribution: Attribution,
}

impl RawEvent {
    pub fn ability(&self) -> Option<&str> {
        match &self.action {
            Action::Ability(label) => label.as_deref(),
            _ => None,
        }
    }

    pub fn damage(&self) -> Option<u32> {
        match self.amount {
            Some(Amount::Damage(value)) => Some(value),
            _ => None,
        }
    }

    pub fn heal(&self) -> Option<u32> {
        match self.amount {
            Some(Amount::Heal(value)) => Some(value),
            _ => None,
        }
    }
}

/// Ability column of a normalised event
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Ability {
    Named(String),
    Movement,
    Defeat,
    Swap,
    Unlabelled,
}

impl Ability {
    pub fn label(&self) -> &str {
        match self {
            Ability::Named(name) => name,
            Ability::Movement => "(In Bewegung)",
            Ability::Defeat => "(Kampfunfähig)",
            Ability::Swap => "(Waffenwechsel)",
            Ability::Unlabelled => UNKNOWN_KEY,
        }
    }

    /// Synthetic categories only count towards rounds, never towards totals
    pub fn is_marker(&self) -> bool {
        matches!(self, Ability::Movement | Ability::Defeat | Ability::Swap)
    }
}

impl From<&Action> for Ability {
    fn from(action: &Action) -> Self {
        match action {
            Action::Ability(Some(name)) => Ability::Named(name.clone()),
            Action::Ability(None) => Ability::Unlabelled,
            Action::Move => Ability::Movement,
            Action::Defeat => Ability::Defeat,
            Action::Swap(_) => Ability::Swap,
        }
    }
}

impl Serialize for Ability {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// Per-event counters, summed by the aggregator
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq, Default)]
pub struct Counters {
    pub cast: u64,
    pub crit: u64,
    pub dmg: u64,
    pub heal: u64,
    pub hit: u64,
    pub healed: u64,
    pub miss: u64,
    pub dodged: u64,
    pub activate: u64,
    pub attack: u64,
    /// Number of blocked hits
    pub blocked: u64,
    /// Damage absorbed by blocking
    pub block: u64,
    /// Number of parried hits
    pub parried: u64,
    /// Damage absorbed by parrying
    pub parry: u64,
}

impl AddAssign for Counters {
    fn add_assign(&mut self, other: Counters) {
        self.cast += other.cast;
        self.crit += other.crit;
        self.dmg += other.dmg;
        self.heal += other.heal;
        self.hit += other.hit;
        self.healed += other.healed;
        self.miss += other.miss;
        self.dodged += other.dodged;
        self.activate += other.activate;
        self.attack += other.attack;
        self.blocked += other.blocked;
        self.block += other.block;
        self.parried += other.parried;
        self.parry += other.parry;
    }
}

/// A resolved event with numeric counters
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct NormalizedEvent {
    pub participant: Option<String>,
    pub weapon: Ability,
    pub target: Option<String>,
    pub round: u32,
    pub time: ElapsedTime,
    pub battle: String,
    pub attribution: Attribution,
    #[serde(flatten)]
    pub counters: Counters,
}

/// Event fields a report can be grouped by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupField {
    Participant,
    Weapon,
    Target,
    Round,
    Time,
    Battle,
}

impl GroupField {
    pub const ALL: [GroupField; 6] = [
        GroupField::Participant,
        GroupField::Weapon,
        GroupField::Target,
        GroupField::Round,
        GroupField::Time,
        GroupField::Battle,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            GroupField::Participant => "participant",
            GroupField::Weapon => "weapon",
            GroupField::Target => "target",
            GroupField::Round => "round",
            GroupField::Time => "time",
            GroupField::Battle => "battle",
        }
    }

    /// Bucket key of `event` for this field
    pub fn key_of(&self, event: &NormalizedEvent) -> String {
        match self {
            GroupField::Participant => event
                .participant
                .clone()
                .unwrap_or_else(|| UNKNOWN_KEY.to_string()),
            GroupField::Weapon => event.weapon.label().to_string(),
            GroupField::Target => event
                .target
                .clone()
                .unwrap_or_else(|| UNKNOWN_KEY.to_string()),
            GroupField::Round => event.round.to_string(),
            GroupField::Time => event.time.to_string(),
            GroupField::Battle => event.battle.clone(),
        }
    }
}

/// A (battle, round) pair touched by at least one event
#[derive(Debug, Serialize, Clone, PartialEq, Eq, Hash)]
pub struct RoundRef {
    pub battle: String,
    pub round: u32,
}

/// Summed counters of a group of events plus derived rates
#[derive(Debug, Serialize, Clone, PartialEq, Default)]
pub struct Aggregation {
    /// Distinct rounds in order of first appearance
    pub rounds: Vec<RoundRef>,
    #[serde(flatten)]
    pub totals: Counters,
    pub min_dmg: u64,
    pub max_dmg: u64,
    pub min_crit: u64,
    pub max_crit: u64,
    pub miss_percent: f64,
    pub dodged_percent: f64,
    pub crit_percent: f64,
    pub block_percent: f64,
    pub parry_percent: f64,
}

impl Aggregation {
    pub fn round_numbers(&self) -> Vec<u32> {
        self.rounds.iter().map(|r| r.round).collect()
    }
}

/// Either another grouping level or the events of an exhausted grouping
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Children {
    Node(Report),
    Leaf(Vec<NormalizedEvent>),
}

/// A tree node of the report
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Group {
    pub field: GroupField,
    #[serde(flatten)]
    pub stats: Aggregation,
    pub children: Children,
}

impl Group {
    /// Nested report, `None` on leaf level
    pub fn report(&self) -> Option<&Report> {
        match &self.children {
            Children::Node(report) => Some(report),
            Children::Leaf(_) => None,
        }
    }

    /// Contributing events, `None` above leaf level
    pub fn events(&self) -> Option<&[NormalizedEvent]> {
        match &self.children {
            Children::Leaf(events) => Some(events),
            Children::Node(_) => None,
        }
    }
}

/// One level of the aggregation tree, keyed by group value
pub type Report = IndexMap<String, Group>;

/// Row label -> column label -> amount
pub type Rows = IndexMap<String, IndexMap<String, f64>>;

/// Table of amounts merged over all battles
#[derive(Debug, Serialize, Clone, PartialEq, Default)]
pub struct Ledger {
    pub rows: Rows,
    /// Column labels in order of first appearance
    pub categories: Vec<String>,
}

impl Ledger {
    pub fn get(&self, row: &str, column: &str) -> Option<f64> {
        self.rows.get(row).and_then(|columns| columns.get(column)).copied()
    }
}

/// One roster row: `[?] <name> <level> <status> [<life%>] [<exp>]`
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ParticipantStats {
    pub name: String,
    pub level: u32,
    pub status: String,
    pub life_percent: Option<String>,
    pub exp: Option<f64>,
    /// Last round the participant was active in
    pub last_round: Option<u32>,
}

/// Everything extracted from one raw report
#[derive(Debug, Serialize, Clone, PartialEq, Default)]
pub struct Analysis {
    pub battles: Vec<Battle>,
    pub report: Report,
    pub loot: Ledger,
    pub value: Ledger,
    pub uvp: Ledger,
    pub exp: Ledger,
    pub participants: IndexMap<String, ParticipantStats>,
    pub defeats: IndexMap<String, u32>,
    pub defeats_by_key: IndexMap<String, u32>,
    pub damage_before: IndexMap<String, Vec<i64>>,
    pub damage_before_by_key: IndexMap<String, Vec<i64>>,
}
