//! Creature statistics shared by players and monsters.
//!
//! Ability scores, saving throw flags, proficiency tiers, challenge rating,
//! damage types and alignment, in the shapes the record store hands them over.

use crate::reference::LookupError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Abilities
// ============================================================================

/// The six ability scores, in record order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ability {
    Strength,
    Dexterity,
    Constitution,
    Intelligence,
    Wisdom,
    Charisma,
}

impl Ability {
    pub fn abbreviation(&self) -> &'static str {
        match self {
            Ability::Strength => "STR",
            Ability::Dexterity => "DEX",
            Ability::Constitution => "CON",
            Ability::Intelligence => "INT",
            Ability::Wisdom => "WIS",
            Ability::Charisma => "CHA",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Ability::Strength => "Strength",
            Ability::Dexterity => "Dexterity",
            Ability::Constitution => "Constitution",
            Ability::Intelligence => "Intelligence",
            Ability::Wisdom => "Wisdom",
            Ability::Charisma => "Charisma",
        }
    }

    /// Position of the ability in record lists.
    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn all() -> [Ability; 6] {
        [
            Ability::Strength,
            Ability::Dexterity,
            Ability::Constitution,
            Ability::Intelligence,
            Ability::Wisdom,
            Ability::Charisma,
        ]
    }
}

impl fmt::Display for Ability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.abbreviation())
    }
}

impl FromStr for Ability {
    type Err = LookupError;

    /// Accepts full names or abbreviations, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Ability::all()
            .into_iter()
            .find(|a| {
                a.name().eq_ignore_ascii_case(wanted)
                    || a.abbreviation().eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| LookupError::UnknownAbility(s.to_string()))
    }
}

/// Ability scores container.
///
/// Serialized as the ordered list `[Str, Dex, Con, Int, Wis, Cha]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[u8; 6]", into = "[u8; 6]")]
pub struct AbilityScores {
    pub strength: u8,
    pub dexterity: u8,
    pub constitution: u8,
    pub intelligence: u8,
    pub wisdom: u8,
    pub charisma: u8,
}

impl AbilityScores {
    pub fn new(str: u8, dex: u8, con: u8, int: u8, wis: u8, cha: u8) -> Self {
        Self {
            strength: str,
            dexterity: dex,
            constitution: con,
            intelligence: int,
            wisdom: wis,
            charisma: cha,
        }
    }

    pub fn get(&self, ability: Ability) -> u8 {
        match ability {
            Ability::Strength => self.strength,
            Ability::Dexterity => self.dexterity,
            Ability::Constitution => self.constitution,
            Ability::Intelligence => self.intelligence,
            Ability::Wisdom => self.wisdom,
            Ability::Charisma => self.charisma,
        }
    }

    pub fn modifier(&self, ability: Ability) -> i32 {
        ability_modifier(self.get(ability))
    }
}

impl Default for AbilityScores {
    fn default() -> Self {
        Self::new(10, 10, 10, 10, 10, 10)
    }
}

impl From<[u8; 6]> for AbilityScores {
    fn from(s: [u8; 6]) -> Self {
        Self::new(s[0], s[1], s[2], s[3], s[4], s[5])
    }
}

impl From<AbilityScores> for [u8; 6] {
    fn from(s: AbilityScores) -> Self {
        [
            s.strength,
            s.dexterity,
            s.constitution,
            s.intelligence,
            s.wisdom,
            s.charisma,
        ]
    }
}

/// `floor((score - 10) / 2)`: 8-9 is -1, 10-11 is 0, 12-13 is +1.
pub fn ability_modifier(score: u8) -> i32 {
    (score as i32 - 10).div_euclid(2)
}

/// Proficiency bonus for a character level: `2 + (level - 1) / 4`, truncated.
pub fn proficiency_bonus(level: u8) -> i32 {
    2 + (level as i32 - 1) / 4
}

// ============================================================================
// Saving Throws
// ============================================================================

/// Per-ability saving throw proficiency, serialized as six 0/1 flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "[u8; 6]", into = "[u8; 6]")]
pub struct SaveProficiencies([bool; 6]);

impl SaveProficiencies {
    pub fn new(flags: [bool; 6]) -> Self {
        Self(flags)
    }

    pub fn is_proficient(&self, ability: Ability) -> bool {
        self.0[ability.index()]
    }

    pub fn set(&mut self, ability: Ability, proficient: bool) {
        self.0[ability.index()] = proficient;
    }
}

impl From<[u8; 6]> for SaveProficiencies {
    fn from(flags: [u8; 6]) -> Self {
        Self(flags.map(|f| f != 0))
    }
}

impl From<SaveProficiencies> for [u8; 6] {
    fn from(saves: SaveProficiencies) -> Self {
        saves.0.map(u8::from)
    }
}

// ============================================================================
// Proficiency
// ============================================================================

/// Proficiency tier for a skill: 0 none, 1 proficient, 2 expertise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(try_from = "u8", into = "u8")]
pub enum ProficiencyLevel {
    #[default]
    None,
    Proficient,
    Expertise,
}

impl ProficiencyLevel {
    pub fn bonus(&self, proficiency_bonus: i32) -> i32 {
        match self {
            ProficiencyLevel::None => 0,
            ProficiencyLevel::Proficient => proficiency_bonus,
            ProficiencyLevel::Expertise => proficiency_bonus * 2,
        }
    }
}

impl TryFrom<u8> for ProficiencyLevel {
    type Error = String;

    fn try_from(tier: u8) -> Result<Self, Self::Error> {
        match tier {
            0 => Ok(ProficiencyLevel::None),
            1 => Ok(ProficiencyLevel::Proficient),
            2 => Ok(ProficiencyLevel::Expertise),
            other => Err(format!("invalid proficiency tier {other}, expected 0, 1 or 2")),
        }
    }
}

impl From<ProficiencyLevel> for u8 {
    fn from(level: ProficiencyLevel) -> Self {
        match level {
            ProficiencyLevel::None => 0,
            ProficiencyLevel::Proficient => 1,
            ProficiencyLevel::Expertise => 2,
        }
    }
}

// ============================================================================
// Challenge Rating
// ============================================================================

/// A monster's challenge rating. Fractional ratings (1/8, 1/4, 1/2) are
/// accepted as numbers or as fraction strings.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "RatingRepr", into = "f32")]
pub struct ChallengeRating(f32);

#[derive(Deserialize)]
#[serde(untagged)]
enum RatingRepr {
    Number(f32),
    Text(String),
}

impl ChallengeRating {
    pub fn new(rating: f32) -> Self {
        Self(rating)
    }

    pub fn value(&self) -> f32 {
        self.0
    }

    /// Same formula as character level, truncated toward zero, so every
    /// rating below 5 gives +2.
    pub fn proficiency_bonus(&self) -> i32 {
        2 + ((self.0 - 1.0) / 4.0).trunc() as i32
    }
}

impl TryFrom<RatingRepr> for ChallengeRating {
    type Error = String;

    fn try_from(repr: RatingRepr) -> Result<Self, Self::Error> {
        match repr {
            RatingRepr::Number(n) => Ok(Self(n)),
            RatingRepr::Text(text) => text.parse(),
        }
    }
}

impl From<ChallengeRating> for f32 {
    fn from(cr: ChallengeRating) -> Self {
        cr.0
    }
}

impl FromStr for ChallengeRating {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || format!("invalid challenge rating: {s}");
        let s = s.trim();
        match s.split_once('/') {
            Some((num, den)) => {
                let num: f32 = num.trim().parse().map_err(|_| invalid())?;
                let den: f32 = den.trim().parse().map_err(|_| invalid())?;
                if den == 0.0 {
                    return Err(invalid());
                }
                Ok(Self(num / den))
            }
            None => s.parse().map(Self).map_err(|_| invalid()),
        }
    }
}

impl fmt::Display for ChallengeRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            r if r == 0.125 => write!(f, "1/8"),
            r if r == 0.25 => write!(f, "1/4"),
            r if r == 0.5 => write!(f, "1/2"),
            r => write!(f, "{r}"),
        }
    }
}

// ============================================================================
// Damage
// ============================================================================

/// Damage types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DamageType {
    Piercing,
    Bludgeoning,
    Slashing,
    Cold,
    Fire,
    Lightning,
    Thunder,
    Poison,
    Acid,
    Necrotic,
    Radiant,
    Force,
    Psychic,
}

impl DamageType {
    pub fn name(&self) -> &'static str {
        match self {
            DamageType::Piercing => "Piercing",
            DamageType::Bludgeoning => "Bludgeoning",
            DamageType::Slashing => "Slashing",
            DamageType::Cold => "Cold",
            DamageType::Fire => "Fire",
            DamageType::Lightning => "Lightning",
            DamageType::Thunder => "Thunder",
            DamageType::Poison => "Poison",
            DamageType::Acid => "Acid",
            DamageType::Necrotic => "Necrotic",
            DamageType::Radiant => "Radiant",
            DamageType::Force => "Force",
            DamageType::Psychic => "Psychic",
        }
    }

    pub fn all() -> [DamageType; 13] {
        [
            DamageType::Piercing,
            DamageType::Bludgeoning,
            DamageType::Slashing,
            DamageType::Cold,
            DamageType::Fire,
            DamageType::Lightning,
            DamageType::Thunder,
            DamageType::Poison,
            DamageType::Acid,
            DamageType::Necrotic,
            DamageType::Radiant,
            DamageType::Force,
            DamageType::Psychic,
        ]
    }
}

impl fmt::Display for DamageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for DamageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        DamageType::all()
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("unknown damage type: {s}"))
    }
}

/// How a creature responds to a damage type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DamageAffinity {
    Resistant,
    Immune,
    Vulnerable,
}

impl DamageAffinity {
    pub fn apply(&self, amount: i32) -> i32 {
        match self {
            DamageAffinity::Resistant => amount / 2,
            DamageAffinity::Immune => 0,
            DamageAffinity::Vulnerable => amount.saturating_mul(2),
        }
    }
}

// ============================================================================
// Alignment
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Alignment {
    #[default]
    Unaligned,
    #[serde(rename = "Lawful Good")]
    LawfulGood,
    #[serde(rename = "Lawful Neutral")]
    LawfulNeutral,
    #[serde(rename = "Lawful Evil")]
    LawfulEvil,
    #[serde(rename = "Neutral Good")]
    NeutralGood,
    #[serde(rename = "True Neutral")]
    TrueNeutral,
    #[serde(rename = "Neutral Evil")]
    NeutralEvil,
    #[serde(rename = "Chaotic Good")]
    ChaoticGood,
    #[serde(rename = "Chaotic Neutral")]
    ChaoticNeutral,
    #[serde(rename = "Chaotic Evil")]
    ChaoticEvil,
}

impl Alignment {
    pub fn name(&self) -> &'static str {
        match self {
            Alignment::Unaligned => "Unaligned",
            Alignment::LawfulGood => "Lawful Good",
            Alignment::LawfulNeutral => "Lawful Neutral",
            Alignment::LawfulEvil => "Lawful Evil",
            Alignment::NeutralGood => "Neutral Good",
            Alignment::TrueNeutral => "True Neutral",
            Alignment::NeutralEvil => "Neutral Evil",
            Alignment::ChaoticGood => "Chaotic Good",
            Alignment::ChaoticNeutral => "Chaotic Neutral",
            Alignment::ChaoticEvil => "Chaotic Evil",
        }
    }
}

impl fmt::Display for Alignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
