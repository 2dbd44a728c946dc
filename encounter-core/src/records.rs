//! Reference records as the record store supplies them.
//!
//! These are plain data. Combat state is never written back into a record;
//! combatants copy what they need at construction.

use crate::dice::{DiceError, DiceExpression, RollResult};
use crate::stats::{
    AbilityScores, Alignment, ChallengeRating, DamageAffinity, DamageType, ProficiencyLevel,
    SaveProficiencies,
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Key of a record in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub u32);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Fields shared by player and monster records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatureRecord {
    pub name: String,
    pub ac: u8,
    pub size: String,
    pub alignment: Alignment,
    pub languages: Vec<String>,
    /// Movement speeds in feet, walking speed first.
    pub speed: Vec<u32>,
    pub ability_scores: AbilityScores,
    pub saves: SaveProficiencies,
    /// Skill identifier to proficiency tier.
    pub skills: HashMap<String, ProficiencyLevel>,
    /// Sense name to range in feet.
    pub senses: BTreeMap<String, u32>,
    pub damage_types: BTreeMap<DamageType, DamageAffinity>,
    pub notes: String,
}

/// A player character record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    #[serde(flatten)]
    pub creature: CreatureRecord,
    pub level: u8,
    /// Class name to levels taken in that class.
    pub class: BTreeMap<String, u8>,
    pub species: String,
    pub hp: i32,
}

/// A monster record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonsterRecord {
    #[serde(flatten)]
    pub creature: CreatureRecord,
    pub cr: ChallengeRating,
    pub xp: u32,
    #[serde(rename = "type")]
    pub monster_type: String,
    pub actions: BTreeMap<String, ActionRecord>,
    pub special_traits: BTreeMap<String, String>,
    pub legendary: bool,
    pub legendary_actions: BTreeMap<String, String>,
    pub legendary_resistances: u32,
    pub lair_actions: BTreeMap<String, String>,
    /// Hit points as dice, optionally with a stored average (`"12:3d6+2"`).
    pub hp: String,
}

impl MonsterRecord {
    /// Parse the hit point expression.
    pub fn hit_dice(&self) -> Result<DiceExpression, DiceError> {
        DiceExpression::parse(&self.hp, self.has_average_hp())
    }

    pub fn has_average_hp(&self) -> bool {
        self.hp.contains(':')
    }
}

// ============================================================================
// Actions
// ============================================================================

/// Who an action can hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ActionTargets {
    #[default]
    #[serde(rename = "Single Target")]
    SingleTarget,
    #[serde(rename = "Area of Effect")]
    AreaOfEffect,
}

/// A monster action such as a weapon attack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub range: u32,
    pub hit_bonus: i32,
    #[serde(default)]
    pub targets: ActionTargets,
    /// Damage entries like `"(2d6 + 3)Slashing"` or `"(4)Fire"`.
    #[serde(default)]
    pub damage: Vec<String>,
    #[serde(default)]
    pub extra: String,
}

impl ActionRecord {
    /// Roll to hit: `d20 + hit_bonus`.
    pub fn attack_roll(&self) -> RollResult {
        self.attack_roll_with_rng(&mut rand::thread_rng())
    }

    pub fn attack_roll_with_rng<R: Rng>(&self, rng: &mut R) -> RollResult {
        DiceExpression::d20()
            .plus(self.hit_bonus)
            .roll_with_rng(rng)
    }

    /// Parse every damage entry.
    pub fn damage_rolls(&self) -> Result<Vec<DamageRoll>, DiceError> {
        self.damage.iter().map(|d| DamageRoll::parse(d)).collect()
    }

    /// Roll all damage entries.
    pub fn roll_damage_with_rng<R: Rng>(
        &self,
        rng: &mut R,
    ) -> Result<Vec<(DamageType, RollResult)>, DiceError> {
        Ok(self
            .damage_rolls()?
            .into_iter()
            .map(|d| (d.damage_type, d.expression.roll_with_rng(rng)))
            .collect())
    }
}

/// One typed damage entry of an action.
#[derive(Debug, Clone, PartialEq)]
pub struct DamageRoll {
    pub expression: DiceExpression,
    pub damage_type: DamageType,
}

impl DamageRoll {
    /// Parse `"(<dice> [+|-] <n>)<Type>"`.
    pub fn parse(entry: &str) -> Result<Self, DiceError> {
        let invalid = || DiceError::InvalidNotation(entry.to_string());

        let inner_start = entry.find('(').ok_or_else(invalid)?;
        let inner_end = entry.rfind(')').ok_or_else(invalid)?;
        if inner_end <= inner_start {
            return Err(invalid());
        }
        let inner = &entry[inner_start + 1..inner_end];
        let damage_type: DamageType = entry[inner_end + 1..].parse().map_err(|_| invalid())?;

        // The dice evaluator only adds, so a subtracted modifier is split off
        let expression = match inner.split_once('-') {
            Some((dice, penalty)) => {
                let penalty: i32 = penalty.trim().parse().map_err(|_| invalid())?;
                DiceExpression::parse(dice, false)?.plus(-penalty)
            }
            None => DiceExpression::parse(inner, false)?,
        };

        Ok(Self {
            expression,
            damage_type,
        })
    }
}

impl fmt::Display for DamageRoll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}){}",
            self.expression.dice_notation(),
            self.damage_type
        )
    }
}
