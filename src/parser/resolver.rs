//! Caster resolution for events whose log line omits the actor.
//!
//! Damage and heal ticks of earlier casts ("[Gift] trifft Ork: ...") carry no
//! participant. A handful of abilities name their actor indirectly; everything
//! else inherits the participant of the cast that put the effect on the target.

use tracing::error;

use crate::models::{Attribution, Outcome, RawEvent};

/// How an event without participant gets one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributionPolicy {
    /// The target acts on itself
    FromTarget,
    /// The target of the preceding line is the actor
    FromPreviousTarget,
    /// The actor of the preceding line is the actor
    FromPreviousActor,
    /// Search back for a successful cast of the same ability on the same target
    NearestMatchingCast,
}

const SPECIAL_ABILITIES: [(&str, AttributionPolicy); 4] = [
    ("Letztes Aufgebot", AttributionPolicy::FromTarget),
    ("Vampirismus", AttributionPolicy::FromTarget),
    ("Bluttransfer", AttributionPolicy::FromPreviousTarget),
    ("Blutritual", AttributionPolicy::FromPreviousActor),
];

pub fn policy_for(ability: Option<&str>) -> AttributionPolicy {
    ability
        .and_then(|name| {
            SPECIAL_ABILITIES
                .iter()
                .find(|(special, _)| *special == name)
                .map(|(_, policy)| *policy)
        })
        .unwrap_or(AttributionPolicy::NearestMatchingCast)
}

fn same_effect(candidate: &RawEvent, event: &RawEvent) -> bool {
    candidate.ability() == event.ability() && candidate.target == event.target
}

/// Participant of the preceding line when it applied the same effect to the
/// same target no later than `event`
fn from_predecessor(predecessor: Option<&RawEvent>, event: &RawEvent) -> Option<String> {
    predecessor
        .filter(|p| same_effect(p, event) && p.time <= event.time)
        .and_then(|p| p.participant.clone())
}

/// Participant of the most recent successful cast of the same effect
fn from_casts(casts: &[&RawEvent], event: &RawEvent) -> Option<String> {
    casts
        .iter()
        .find(|cast| same_effect(cast, event) && cast.time <= event.time && cast.participant.is_some())
        .and_then(|cast| cast.participant.clone())
}

/// Fill in the participant of every event of one battle that has none.
///
/// Events that cannot be attributed keep `participant: None` and are tagged
/// [`Attribution::Unresolved`].
pub fn resolve_casters(events: &[RawEvent]) -> Vec<RawEvent> {
    // successful casts, most recent first; equal times keep later lines first
    let mut casts: Vec<&RawEvent> = events
        .iter()
        .filter(|e| e.outcome == Some(Outcome::Successful))
        .collect();
    casts.sort_by_key(|e| e.time);
    casts.reverse();

    events
        .iter()
        .enumerate()
        .map(|(index, event)| {
            if event.participant.is_some() {
                return event.clone();
            }
            let previous = index.checked_sub(1).map(|i| &events[i]);

            let policy = policy_for(event.ability());
            let (participant, attribution) = match policy {
                AttributionPolicy::FromTarget => (event.target.clone(), Attribution::Inferred),
                AttributionPolicy::FromPreviousTarget => (
                    previous.and_then(|p| p.target.clone()),
                    Attribution::Inferred,
                ),
                AttributionPolicy::FromPreviousActor => (
                    previous.and_then(|p| p.participant.clone()),
                    Attribution::Inferred,
                ),
                AttributionPolicy::NearestMatchingCast => (
                    from_predecessor(previous, event).or_else(|| from_casts(&casts, event)),
                    Attribution::Backtracked,
                ),
            };

            match participant {
                Some(participant) => RawEvent {
                    participant: Some(participant),
                    attribution,
                    ..event.clone()
                },
                None => {
                    error!(?event, ?policy, "cannot find participant");
                    RawEvent {
                        attribution: Attribution::Unresolved,
                        ..event.clone()
                    }
                }
            }
        })
        .collect()
}
