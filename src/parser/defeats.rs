//! Defeat counts and the damage a participant took before each defeat.

use indexmap::IndexMap;

use crate::models::{Action, ParticipantStats, RawEvent};

/// Instance name without its ` #N` suffix
pub fn base_name(name: &str) -> &str {
    match name.rsplit_once(" #") {
        Some((base, suffix)) if !suffix.is_empty() && suffix.chars().all(|c| c.is_ascii_digit()) => base,
        _ => name,
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DefeatTally {
    pub defeats: IndexMap<String, u32>,
    /// Keyed by `name|level`
    pub defeats_by_key: IndexMap<String, u32>,
    pub damage_before: IndexMap<String, Vec<i64>>,
    pub damage_before_by_key: IndexMap<String, Vec<i64>>,
}

impl DefeatTally {
    /// Count the defeats of one battle; `events` must be in line order.
    pub fn record_battle(
        &mut self,
        events: &[RawEvent],
        roster: &IndexMap<String, ParticipantStats>,
    ) {
        // damage minus healing per target instance since its last defeat
        let mut balance: IndexMap<&str, i64> = IndexMap::new();

        for event in events {
            if let Some(target) = event.target.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
                let change = i64::from(event.damage().unwrap_or(0)) - i64::from(event.heal().unwrap_or(0));
                if change != 0 {
                    *balance.entry(target).or_default() += change;
                }
            }

            if event.action != Action::Defeat {
                continue;
            }
            let Some(name) = event.participant.as_deref().map(str::trim).filter(|n| !n.is_empty()) else {
                continue;
            };
            let normalized = base_name(name);
            let level = roster
                .get(name)
                .map(|stats| stats.level.to_string())
                .unwrap_or_default();
            let key = format!("{normalized}|{level}");
            let before = balance.get(name).copied().unwrap_or(0);

            *self.defeats.entry(normalized.to_string()).or_default() += 1;
            *self.defeats_by_key.entry(key.clone()).or_default() += 1;
            self.damage_before
                .entry(normalized.to_string())
                .or_default()
                .push(before);
            self.damage_before_by_key.entry(key).or_default().push(before);

            balance.insert(name, 0);
        }
    }
}
