//! Conversion of resolved raw events into numeric records.

use crate::models::{
    Absorb, Ability, Action, Amount, Attribution, Counters, NormalizedEvent, Outcome, RawEvent,
};

/// Counters of one event as read off its line
fn counters(event: &RawEvent) -> Counters {
    let mut counters = Counters {
        crit: u64::from(event.critical.is_some()),
        ..Counters::default()
    };
    match event.amount {
        Some(Amount::Damage(value)) => {
            counters.hit = 1;
            counters.dmg = u64::from(value);
        }
        Some(Amount::Heal(value)) => {
            counters.healed = 1;
            counters.heal = u64::from(value);
        }
        None => {}
    }
    match event.absorbed {
        Some(Absorb::Block(value)) => {
            counters.blocked = 1;
            counters.block = u64::from(value);
        }
        Some(Absorb::Parry(value)) => {
            counters.parried = 1;
            counters.parry = u64::from(value);
        }
        None => {}
    }

    match event.attribution {
        Attribution::Explicit => {
            counters.attack = 1;
            match event.outcome {
                Some(Outcome::NoDamage) => {
                    counters.hit += 1;
                    counters.dmg = 0;
                }
                Some(Outcome::Successful) => counters.cast = 1,
                Some(Outcome::Missed | Outcome::Failed) => counters.miss = 1,
                Some(Outcome::Dodged) => counters.dodged = 1,
                None => {}
            }
        }
        // the actor is a guess: keep the amounts, drop the hit statistics
        Attribution::Inferred => {
            counters.hit = 0;
            counters.healed = 0;
            counters.blocked = 0;
            counters.parried = 0;
            counters.crit = 0;
            counters.activate = 1;
        }
        Attribution::Backtracked => counters.activate = 1,
        Attribution::Unresolved => {
            counters = Counters {
                activate: 1,
                ..Counters::default()
            }
        }
    }
    counters
}

/// Normalise the resolved events of one battle, in line order.
///
/// A defeat line gets its own participant as target; when the line before
/// it hit that participant, the defeat is credited to the attacker.
pub fn normalize(events: &[RawEvent]) -> Vec<NormalizedEvent> {
    let mut normalized: Vec<NormalizedEvent> = Vec::with_capacity(events.len());
    for event in events {
        let mut participant = event.participant.clone();
        let mut target = event.target.clone();

        if target.is_none() && event.action == Action::Defeat {
            target = participant.clone();
            if let Some(previous) = normalized.last() {
                if previous.target == participant && previous.participant.is_some() {
                    participant = previous.participant.clone();
                }
            }
        }

        normalized.push(NormalizedEvent {
            participant,
            weapon: Ability::from(&event.action),
            target,
            round: event.time.round(),
            time: event.time,
            battle: event.battle.clone(),
            attribution: event.attribution,
            counters: counters(event),
        });
    }
    normalized
}
