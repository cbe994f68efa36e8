use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{KampfberichtError, Result};
use crate::models::GroupField;
use crate::report::order::{Direction, Metric, OrderSpec};

/// Action points a participant has per round unless told otherwise
pub const DEFAULT_ACTION_POINTS: u32 = 2;

/// Caller-supplied knobs of one analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportOptions {
    /// Grouping levels of the report tree, outermost first
    pub group_by: Vec<GroupField>,
    /// Keep the self-heal section at the end of each battle
    pub show_bandaging: bool,
    /// Divisor of the `pro AP` ledger columns
    pub action_points_per_round: u32,
}

impl Default for ReportOptions {
    fn default() -> Self {
        ReportOptions {
            group_by: vec![GroupField::Participant, GroupField::Weapon, GroupField::Target],
            show_bandaging: false,
            action_points_per_round: DEFAULT_ACTION_POINTS,
        }
    }
}

impl ReportOptions {
    pub fn validate(&self) -> Result<()> {
        if self.group_by.is_empty() {
            return Err(KampfberichtError::EmptyGrouping);
        }
        Ok(())
    }
}

impl FromStr for GroupField {
    type Err = KampfberichtError;

    fn from_str(name: &str) -> Result<Self> {
        let wanted = name.trim();
        GroupField::ALL
            .into_iter()
            .find(|field| field.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| KampfberichtError::UnknownField {
                name: wanted.to_string(),
            })
    }
}

/// `participant,weapon,target`
pub fn parse_group_by(text: &str) -> Result<Vec<GroupField>> {
    let fields = text
        .split(',')
        .filter(|part| !part.trim().is_empty())
        .map(str::parse)
        .collect::<Result<Vec<GroupField>>>()?;
    if fields.is_empty() {
        return Err(KampfberichtError::EmptyGrouping);
    }
    Ok(fields)
}

/// `dmg:desc,miss_percent:asc`; a key without direction sorts descending
pub fn parse_order(text: &str) -> Result<Vec<OrderSpec>> {
    text.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| -> Result<OrderSpec> {
            let (key, direction) = match part.split_once(':') {
                Some((key, direction)) => (key, direction.parse::<Direction>()?),
                None => (part, Direction::Desc),
            };
            Ok(OrderSpec {
                key: key.parse::<Metric>()?,
                direction,
            })
        })
        .collect()
}
