//! Reference lookups the combat layer depends on.
//!
//! A skill roll needs to know which ability governs the skill and under which
//! identifier a creature's proficiency tier is stored. That knowledge lives in
//! the reference store, behind the [`SkillLookup`] trait. [`SkillTable`] is the
//! in-memory implementation, and [`SkillTable::standard`] holds the eighteen
//! skills of the 5e rules.

use crate::stats::Ability;
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors from reference lookups.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("Skill not found: {0}")]
    SkillNotFound(String),

    #[error("Unknown ability: {0}")]
    UnknownAbility(String),
}

// ============================================================================
// Skills
// ============================================================================

/// D&D 5e skills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Skill {
    Athletics,
    Acrobatics,
    SleightOfHand,
    Stealth,
    Arcana,
    History,
    Investigation,
    Nature,
    Religion,
    AnimalHandling,
    Insight,
    Medicine,
    Perception,
    Survival,
    Deception,
    Intimidation,
    Performance,
    Persuasion,
}

impl Skill {
    pub fn ability(&self) -> Ability {
        match self {
            Skill::Athletics => Ability::Strength,
            Skill::Acrobatics | Skill::SleightOfHand | Skill::Stealth => Ability::Dexterity,
            Skill::Arcana
            | Skill::History
            | Skill::Investigation
            | Skill::Nature
            | Skill::Religion => Ability::Intelligence,
            Skill::AnimalHandling
            | Skill::Insight
            | Skill::Medicine
            | Skill::Perception
            | Skill::Survival => Ability::Wisdom,
            Skill::Deception | Skill::Intimidation | Skill::Performance | Skill::Persuasion => {
                Ability::Charisma
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Skill::Athletics => "Athletics",
            Skill::Acrobatics => "Acrobatics",
            Skill::SleightOfHand => "Sleight of Hand",
            Skill::Stealth => "Stealth",
            Skill::Arcana => "Arcana",
            Skill::History => "History",
            Skill::Investigation => "Investigation",
            Skill::Nature => "Nature",
            Skill::Religion => "Religion",
            Skill::AnimalHandling => "Animal Handling",
            Skill::Insight => "Insight",
            Skill::Medicine => "Medicine",
            Skill::Perception => "Perception",
            Skill::Survival => "Survival",
            Skill::Deception => "Deception",
            Skill::Intimidation => "Intimidation",
            Skill::Performance => "Performance",
            Skill::Persuasion => "Persuasion",
        }
    }

    pub fn all() -> [Skill; 18] {
        [
            Skill::Athletics,
            Skill::Acrobatics,
            Skill::SleightOfHand,
            Skill::Stealth,
            Skill::Arcana,
            Skill::History,
            Skill::Investigation,
            Skill::Nature,
            Skill::Religion,
            Skill::AnimalHandling,
            Skill::Insight,
            Skill::Medicine,
            Skill::Perception,
            Skill::Survival,
            Skill::Deception,
            Skill::Intimidation,
            Skill::Performance,
            Skill::Persuasion,
        ]
    }
}

impl fmt::Display for Skill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A skill as the reference store describes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillReference {
    /// Key under which creature records store their proficiency tier.
    pub id: String,
    pub name: String,
    pub ability: Ability,
}

impl From<Skill> for SkillReference {
    fn from(skill: Skill) -> Self {
        Self {
            id: skill.name().to_string(),
            name: skill.name().to_string(),
            ability: skill.ability(),
        }
    }
}

/// Resolves a skill name to its governing ability and proficiency key.
pub trait SkillLookup {
    fn skill(&self, name: &str) -> Result<&SkillReference, LookupError>;
}

/// In-memory skill table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SkillTable {
    skills: Vec<SkillReference>,
}

lazy_static! {
    static ref STANDARD_SKILLS: SkillTable = SkillTable::standard();
}

impl SkillTable {
    pub fn new(skills: Vec<SkillReference>) -> Self {
        Self { skills }
    }

    /// The eighteen standard skills, keyed by name.
    pub fn standard() -> Self {
        Self::new(Skill::all().into_iter().map(SkillReference::from).collect())
    }

    /// A process-wide copy of [`SkillTable::standard`].
    pub fn shared() -> &'static SkillTable {
        &STANDARD_SKILLS
    }

    pub fn iter(&self) -> impl Iterator<Item = &SkillReference> {
        self.skills.iter()
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }
}

impl Default for SkillTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl SkillLookup for SkillTable {
    /// Matches the display name or the identifier, ignoring case.
    fn skill(&self, name: &str) -> Result<&SkillReference, LookupError> {
        let wanted = name.trim();
        self.skills
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(wanted) || s.id.eq_ignore_ascii_case(wanted))
            .ok_or_else(|| LookupError::SkillNotFound(name.to_string()))
    }
}

// ============================================================================
// Conditions
// ============================================================================

/// D&D 5e conditions.
///
/// Combatants carry conditions as free-form tags so that homebrew entries from
/// the reference store work too; these are the tags the rules define.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Condition {
    Blinded,
    Charmed,
    Deafened,
    Exhaustion,
    Frightened,
    Grappled,
    Incapacitated,
    Invisible,
    Paralyzed,
    Petrified,
    Poisoned,
    Prone,
    Restrained,
    Stunned,
    Unconscious,
}

impl Condition {
    pub fn name(&self) -> &'static str {
        match self {
            Condition::Blinded => "Blinded",
            Condition::Charmed => "Charmed",
            Condition::Deafened => "Deafened",
            Condition::Exhaustion => "Exhaustion",
            Condition::Frightened => "Frightened",
            Condition::Grappled => "Grappled",
            Condition::Incapacitated => "Incapacitated",
            Condition::Invisible => "Invisible",
            Condition::Paralyzed => "Paralyzed",
            Condition::Petrified => "Petrified",
            Condition::Poisoned => "Poisoned",
            Condition::Prone => "Prone",
            Condition::Restrained => "Restrained",
            Condition::Stunned => "Stunned",
            Condition::Unconscious => "Unconscious",
        }
    }

    pub fn is_incapacitating(&self) -> bool {
        matches!(
            self,
            Condition::Incapacitated
                | Condition::Paralyzed
                | Condition::Petrified
                | Condition::Stunned
                | Condition::Unconscious
        )
    }

    pub fn all() -> [Condition; 15] {
        [
            Condition::Blinded,
            Condition::Charmed,
            Condition::Deafened,
            Condition::Exhaustion,
            Condition::Frightened,
            Condition::Grappled,
            Condition::Incapacitated,
            Condition::Invisible,
            Condition::Paralyzed,
            Condition::Petrified,
            Condition::Poisoned,
            Condition::Prone,
            Condition::Restrained,
            Condition::Stunned,
            Condition::Unconscious,
        ]
    }

    /// The standard condition named by `tag`, if any.
    pub fn from_tag(tag: &str) -> Option<Condition> {
        Condition::all()
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(tag.trim()))
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A catalogue entry for a condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionReference {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl From<Condition> for ConditionReference {
    fn from(condition: Condition) -> Self {
        Self {
            name: condition.name().to_string(),
            description: String::new(),
        }
    }
}

/// The standard conditions as catalogue entries.
pub fn standard_conditions() -> Vec<ConditionReference> {
    Condition::all().into_iter().map(Into::into).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_lookup() {
        let table = SkillTable::standard();
        assert_eq!(table.len(), 18);

        let stealth = table.skill("stealth").unwrap();
        assert_eq!(stealth.ability, Ability::Dexterity);
        assert_eq!(stealth.id, "Stealth");

        let handling = table.skill("Animal Handling").unwrap();
        assert_eq!(handling.ability, Ability::Wisdom);
    }

    #[test]
    fn test_missing_skill() {
        let err = SkillTable::shared().skill("Basket Weaving").unwrap_err();
        assert_eq!(err, LookupError::SkillNotFound("Basket Weaving".to_string()));
    }

    #[test]
    fn test_custom_table_by_id() {
        let table = SkillTable::new(vec![SkillReference {
            id: "7".to_string(),
            name: "Investigation".to_string(),
            ability: Ability::Intelligence,
        }]);
        assert_eq!(table.skill("7").unwrap().name, "Investigation");
        assert!(table.skill("Stealth").is_err());
    }

    #[test]
    fn test_condition_tags() {
        assert_eq!(Condition::from_tag("prone"), Some(Condition::Prone));
        assert_eq!(Condition::from_tag("Hexed"), None);
        assert!(Condition::Stunned.is_incapacitating());
        assert!(!Condition::Prone.is_incapacitating());
        assert_eq!(standard_conditions().len(), 15);
    }
}
