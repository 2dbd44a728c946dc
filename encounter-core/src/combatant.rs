//! Live combatants.
//!
//! A [`Combatant`] is built from a player or monster record when an encounter
//! starts. It copies the record's combat statistics, then tracks the state that
//! only exists for the length of a fight: hit points, temporary hit points,
//! conditions, concentration, consciousness and initiative.
//!
//! Hit point edits use the same small grammar everywhere: `"+N"` heals,
//! `"-N"` damages and a bare `"N"` assigns. Characters other than digits and
//! signs are dropped first, so `"-7 hp"` reads as `-7`.

use crate::dice::{self, DiceError, DiceExpression, RollResult};
use crate::records::{ActionRecord, CreatureRecord, MonsterRecord, PlayerRecord};
use crate::reference::{Condition, LookupError, SkillLookup};
use crate::stats::{
    proficiency_bonus, Ability, AbilityScores, Alignment, ChallengeRating, DamageAffinity,
    DamageType, ProficiencyLevel, SaveProficiencies,
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Errors from combatant operations.
#[derive(Debug, Error)]
pub enum CombatError {
    #[error("Unexpected syntax in hit point expression: {0:?}")]
    UnexpectedSyntax(String),

    #[error("{name} does not have the condition {condition:?}")]
    ConditionNotPresent { name: String, condition: String },

    #[error("{0} is not a player character")]
    NotAPlayer(String),

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error(transparent)]
    Dice(#[from] DiceError),
}

/// Unique identifier for a combatant within an encounter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CombatantId(pub Uuid);

impl CombatantId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CombatantId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CombatantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a monster's maximum hit points are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum HpMode {
    /// Use the stored average, or the expected value of the dice.
    Average,
    /// Roll the hit dice.
    #[default]
    Rolled,
}

// ============================================================================
// Hit Points
// ============================================================================

/// A parsed hit point edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HpAdjustment {
    Heal(i32),
    Damage(i32),
    Set(i32),
}

impl FromStr for HpAdjustment {
    type Err = CombatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let cleaned: String = s
            .chars()
            .filter(|c| c.is_ascii_digit() || matches!(c, '+' | '-'))
            .collect();
        let syntax = || CombatError::UnexpectedSyntax(s.to_string());

        let amount = |digits: &str| -> Result<i32, CombatError> {
            if digits.is_empty() || digits.contains(&['+', '-'][..]) {
                return Err(syntax());
            }
            digits.parse().map_err(|_| syntax())
        };

        match cleaned.chars().next() {
            Some('+') => amount(&cleaned[1..]).map(HpAdjustment::Heal),
            Some('-') => amount(&cleaned[1..]).map(HpAdjustment::Damage),
            Some(_) => amount(&cleaned).map(HpAdjustment::Set),
            None => Err(syntax()),
        }
    }
}

/// Hit points tracking.
///
/// `0 <= current <= maximum` and `temporary >= 0` hold after every edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitPoints {
    current: i32,
    maximum: i32,
    temporary: i32,
}

impl HitPoints {
    pub fn new(maximum: i32) -> Self {
        let maximum = maximum.max(0);
        Self {
            current: maximum,
            maximum,
            temporary: 0,
        }
    }

    pub fn with_current(maximum: i32, current: i32) -> Self {
        let mut hp = Self::new(maximum);
        hp.current = current.clamp(0, hp.maximum);
        hp
    }

    pub fn current(&self) -> i32 {
        self.current
    }

    pub fn maximum(&self) -> i32 {
        self.maximum
    }

    pub fn temporary(&self) -> i32 {
        self.temporary
    }

    fn apply(&mut self, adjustment: HpAdjustment) {
        self.current = match adjustment {
            HpAdjustment::Heal(n) => self.current.saturating_add(n),
            HpAdjustment::Damage(n) => self.current.saturating_sub(n),
            HpAdjustment::Set(n) => n,
        }
        .clamp(0, self.maximum);
    }

    fn apply_temporary(&mut self, adjustment: HpAdjustment) {
        self.temporary = match adjustment {
            HpAdjustment::Heal(n) => self.temporary.saturating_add(n),
            HpAdjustment::Damage(n) => self.temporary.saturating_sub(n),
            HpAdjustment::Set(n) => n,
        }
        .max(0);
    }

    fn set_maximum(&mut self, maximum: i32) {
        self.maximum = maximum.max(0);
        self.current = self.current.min(self.maximum);
    }

    pub fn ratio(&self) -> f32 {
        if self.maximum == 0 {
            return 0.0;
        }
        self.current as f32 / self.maximum as f32
    }
}

impl fmt::Display for HitPoints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.current, self.maximum)?;
        if self.temporary > 0 {
            write!(f, " (+{} temp)", self.temporary)?;
        }
        Ok(())
    }
}

/// What a hit point edit did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HpChange {
    pub previous: i32,
    pub current: i32,
    /// The edit took the combatant from conscious to unconscious.
    pub knocked_out: bool,
    /// The edit took the combatant from 0 hit points back above 0.
    pub revived: bool,
    /// Experience the encounter should credit for this edit.
    pub experience_awarded: u32,
    /// Constitution save DC to keep concentrating, if concentration is at risk.
    pub concentration_dc: Option<i32>,
}

impl HpChange {
    pub fn delta(&self) -> i32 {
        self.current - self.previous
    }
}

/// Death saving throws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeathSaves {
    pub failures: u8,
    pub successes: u8,
}

impl DeathSaves {
    pub fn reset(&mut self) {
        self.failures = 0;
        self.successes = 0;
    }
}

// ============================================================================
// Variants
// ============================================================================

/// State only player characters have.
#[derive(Debug, Clone)]
pub struct PlayerState {
    pub level: u8,
    pub classes: BTreeMap<String, u8>,
    pub species: String,
    pub death_saves: DeathSaves,
    pub record: Arc<PlayerRecord>,
}

/// State only monsters have.
#[derive(Debug, Clone)]
pub struct MonsterState {
    pub challenge_rating: ChallengeRating,
    pub experience: u32,
    pub monster_type: String,
    pub actions: BTreeMap<String, ActionRecord>,
    pub special_traits: BTreeMap<String, String>,
    pub legendary: bool,
    pub legendary_actions: BTreeMap<String, String>,
    pub legendary_resistances: u32,
    pub lair_actions: BTreeMap<String, String>,
    pub record: Arc<MonsterRecord>,
    experience_credited: bool,
}

impl MonsterState {
    /// Whether this monster's experience has already been handed out.
    pub fn experience_credited(&self) -> bool {
        self.experience_credited
    }
}

/// The closed set of combatant variants.
#[derive(Debug, Clone)]
pub enum CombatantKind {
    Player(PlayerState),
    Monster(MonsterState),
}

// ============================================================================
// Combatant
// ============================================================================

/// Combat participant.
#[derive(Debug, Clone)]
pub struct Combatant {
    pub id: CombatantId,
    pub name: String,
    pub armor_class: u8,
    pub size: String,
    pub alignment: Alignment,
    pub languages: Vec<String>,
    pub speed: Vec<u32>,
    pub ability_scores: AbilityScores,
    pub saving_throws: SaveProficiencies,
    pub skills: HashMap<String, ProficiencyLevel>,
    pub senses: BTreeMap<String, u32>,
    pub damage_types: BTreeMap<DamageType, DamageAffinity>,
    pub notes: String,
    pub conditions: Vec<String>,
    pub concentrating: bool,
    pub conscious: bool,
    pub proficiency_bonus: i32,
    pub kind: CombatantKind,
    initiative: f64,
    hit_points: HitPoints,
}

impl Combatant {
    fn from_creature(
        creature: &CreatureRecord,
        initiative: i32,
        hit_points: HitPoints,
        proficiency_bonus: i32,
        kind: CombatantKind,
    ) -> Self {
        let mut combatant = Self {
            id: CombatantId::new(),
            name: creature.name.clone(),
            armor_class: creature.ac,
            size: creature.size.clone(),
            alignment: creature.alignment,
            languages: creature.languages.clone(),
            speed: creature.speed.clone(),
            ability_scores: creature.ability_scores,
            saving_throws: creature.saves,
            skills: creature.skills.clone(),
            senses: creature.senses.clone(),
            damage_types: creature.damage_types.clone(),
            notes: creature.notes.clone(),
            conditions: Vec::new(),
            concentrating: false,
            conscious: hit_points.current() > 0,
            proficiency_bonus,
            kind,
            initiative: 0.0,
            hit_points,
        };
        combatant.update_initiative(initiative);
        combatant
    }

    /// Build a player combatant. `current_hp` defaults to the record's maximum.
    pub fn player(record: Arc<PlayerRecord>, initiative: i32, current_hp: Option<i32>) -> Self {
        let hit_points = match current_hp {
            Some(current) => HitPoints::with_current(record.hp, current),
            None => HitPoints::new(record.hp),
        };
        let kind = CombatantKind::Player(PlayerState {
            level: record.level,
            classes: record.class.clone(),
            species: record.species.clone(),
            death_saves: DeathSaves::default(),
            record: Arc::clone(&record),
        });
        Self::from_creature(
            &record.creature,
            initiative,
            hit_points,
            proficiency_bonus(record.level),
            kind,
        )
    }

    /// Build a monster combatant, evaluating its hit dice.
    pub fn monster(
        record: Arc<MonsterRecord>,
        initiative: i32,
        hp_mode: HpMode,
    ) -> Result<Self, CombatError> {
        Self::monster_with_rng(record, initiative, hp_mode, &mut rand::thread_rng())
    }

    pub fn monster_with_rng<R: Rng>(
        record: Arc<MonsterRecord>,
        initiative: i32,
        hp_mode: HpMode,
        rng: &mut R,
    ) -> Result<Self, CombatError> {
        let maximum = match hp_mode {
            HpMode::Average if !record.has_average_hp() => record.hit_dice()?.average(),
            _ => dice::evaluate_with_rng(
                &record.hp,
                record.has_average_hp(),
                hp_mode == HpMode::Average,
                rng,
            )?,
        };
        Ok(Self::monster_with_max_hp(record, initiative, maximum))
    }

    /// Build a monster combatant with an already chosen maximum.
    pub fn monster_with_max_hp(record: Arc<MonsterRecord>, initiative: i32, max_hp: i32) -> Self {
        let kind = CombatantKind::Monster(MonsterState {
            challenge_rating: record.cr,
            experience: record.xp,
            monster_type: record.monster_type.clone(),
            actions: record.actions.clone(),
            special_traits: record.special_traits.clone(),
            legendary: record.legendary,
            legendary_actions: record.legendary_actions.clone(),
            legendary_resistances: record.legendary_resistances,
            lair_actions: record.lair_actions.clone(),
            record: Arc::clone(&record),
            experience_credited: false,
        });
        Self::from_creature(
            &record.creature,
            initiative,
            HitPoints::new(max_hp),
            record.cr.proficiency_bonus(),
            kind,
        )
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn is_player(&self) -> bool {
        matches!(self.kind, CombatantKind::Player(_))
    }

    pub fn is_monster(&self) -> bool {
        matches!(self.kind, CombatantKind::Monster(_))
    }

    pub fn as_player(&self) -> Option<&PlayerState> {
        match &self.kind {
            CombatantKind::Player(p) => Some(p),
            CombatantKind::Monster(_) => None,
        }
    }

    pub fn as_monster(&self) -> Option<&MonsterState> {
        match &self.kind {
            CombatantKind::Monster(m) => Some(m),
            CombatantKind::Player(_) => None,
        }
    }

    /// Initiative with the dexterity tie-break folded in.
    pub fn initiative(&self) -> f64 {
        self.initiative
    }

    pub fn hit_points(&self) -> &HitPoints {
        &self.hit_points
    }

    pub fn current_hp(&self) -> i32 {
        self.hit_points.current()
    }

    pub fn max_hp(&self) -> i32 {
        self.hit_points.maximum()
    }

    pub fn temp_hp(&self) -> i32 {
        self.hit_points.temporary()
    }

    pub fn has_condition(&self, tag: &str) -> bool {
        self.conditions.iter().any(|c| c == tag)
    }

    /// Whether any active condition is one of the incapacitating ones.
    pub fn is_incapacitated(&self) -> bool {
        self.conditions
            .iter()
            .filter_map(|c| Condition::from_tag(c))
            .any(|c| c.is_incapacitating())
    }

    // ------------------------------------------------------------------------
    // Hit points
    // ------------------------------------------------------------------------

    /// Apply a hit point expression (`"+N"`, `"-N"` or `"N"`).
    ///
    /// For a monster, the returned [`HpChange`] carries the experience to
    /// credit when this edit is the one that defeats it.
    pub fn set_current_hp(&mut self, expr: &str) -> Result<HpChange, CombatError> {
        let adjustment: HpAdjustment = expr.parse()?;
        Ok(self.adjust_hp(adjustment))
    }

    /// Apply an already parsed hit point edit.
    pub fn adjust_hp(&mut self, adjustment: HpAdjustment) -> HpChange {
        let previous = self.hit_points.current();
        let was_conscious = self.conscious;
        self.hit_points.apply(adjustment);

        let mut change = self.settle_hp(previous, was_conscious);
        let lost = previous - change.current;
        change.concentration_dc = (self.concentrating && lost > 0).then(|| (lost / 2).max(10));
        change
    }

    /// Update consciousness, death saves and experience after current hit
    /// points moved from `previous`.
    fn settle_hp(&mut self, previous: i32, was_conscious: bool) -> HpChange {
        let current = self.hit_points.current();

        if current == 0 {
            self.conscious = false;
        }

        let revived = previous == 0 && current > 0;
        if revived {
            self.conscious = true;
            if let CombatantKind::Player(player) = &mut self.kind {
                player.death_saves.reset();
            }
        }

        let knocked_out = was_conscious && !self.conscious;
        let experience_awarded = match &mut self.kind {
            CombatantKind::Monster(monster) if knocked_out && !monster.experience_credited => {
                monster.experience_credited = true;
                monster.experience
            }
            _ => 0,
        };

        HpChange {
            previous,
            current,
            knocked_out,
            revived,
            experience_awarded,
            concentration_dc: None,
        }
    }

    /// Apply a temporary hit point expression. Returns the new temporary HP.
    pub fn update_temp_hp(&mut self, expr: &str) -> Result<i32, CombatError> {
        let adjustment: HpAdjustment = expr.parse()?;
        self.hit_points.apply_temporary(adjustment);
        Ok(self.hit_points.temporary())
    }

    /// Take typed damage: affinities apply first, then temporary hit points
    /// soak what they can, and the rest comes off current hit points.
    pub fn take_damage(&mut self, amount: i32, damage_type: Option<DamageType>) -> HpChange {
        let amount = damage_type
            .and_then(|t| self.damage_types.get(&t))
            .map_or(amount, |affinity| affinity.apply(amount))
            .max(0);

        let absorbed = amount.min(self.hit_points.temporary());
        self.hit_points.apply_temporary(HpAdjustment::Damage(absorbed));

        let mut change = self.adjust_hp(HpAdjustment::Damage(amount - absorbed));
        // The whole hit counts toward the DC, soaked or not
        change.concentration_dc = (self.concentrating && amount > 0).then(|| (amount / 2).max(10));
        change
    }

    /// Temporarily override maximum hit points (not written back to the record).
    ///
    /// Current hit points are clamped to the new maximum, so a lowered
    /// maximum can knock the combatant out and award experience.
    pub fn set_max_hp(&mut self, maximum: i32) -> HpChange {
        let previous = self.hit_points.current();
        let was_conscious = self.conscious;
        self.hit_points.set_maximum(maximum);
        self.settle_hp(previous, was_conscious)
    }

    pub fn set_conscious(&mut self, conscious: bool) {
        self.conscious = conscious;
    }

    // ------------------------------------------------------------------------
    // Rolls
    // ------------------------------------------------------------------------

    pub fn saving_throw_bonus(&self, ability: Ability) -> i32 {
        let mut bonus = self.ability_scores.modifier(ability);
        if self.saving_throws.is_proficient(ability) {
            bonus += self.proficiency_bonus;
        }
        bonus
    }

    /// Roll a saving throw: `d20 + modifier`, plus proficiency when proficient.
    pub fn roll_save(&self, ability: Ability) -> RollResult {
        self.roll_save_with_rng(ability, &mut rand::thread_rng())
    }

    pub fn roll_save_with_rng<R: Rng>(&self, ability: Ability, rng: &mut R) -> RollResult {
        let mut expr = DiceExpression::d20().plus(self.ability_scores.modifier(ability));
        if self.saving_throws.is_proficient(ability) {
            expr = expr.plus(self.proficiency_bonus);
        }
        expr.roll_with_rng(rng)
    }

    pub fn skill_bonus(&self, skill: &str, lookup: &impl SkillLookup) -> Result<i32, CombatError> {
        let reference = lookup.skill(skill)?;
        let tier = self.skills.get(&reference.id).copied().unwrap_or_default();
        Ok(self.ability_scores.modifier(reference.ability) + tier.bonus(self.proficiency_bonus))
    }

    /// Roll a skill check. Proficiency is added once when proficient and
    /// twice with expertise.
    pub fn roll_skill(
        &self,
        skill: &str,
        lookup: &impl SkillLookup,
    ) -> Result<RollResult, CombatError> {
        self.roll_skill_with_rng(skill, lookup, &mut rand::thread_rng())
    }

    pub fn roll_skill_with_rng<R: Rng>(
        &self,
        skill: &str,
        lookup: &impl SkillLookup,
        rng: &mut R,
    ) -> Result<RollResult, CombatError> {
        let reference = lookup.skill(skill)?;
        let tier = self.skills.get(&reference.id).copied().unwrap_or_default();

        let mut expr = DiceExpression::d20().plus(self.ability_scores.modifier(reference.ability));
        match tier {
            ProficiencyLevel::None => {}
            ProficiencyLevel::Proficient => expr = expr.plus(self.proficiency_bonus),
            ProficiencyLevel::Expertise => {
                expr = expr
                    .plus(self.proficiency_bonus)
                    .plus(self.proficiency_bonus)
            }
        }
        Ok(expr.roll_with_rng(rng))
    }

    /// Record a death saving throw. With `roll` set, `value` is replaced by a
    /// live d20. A 10 or higher is a success.
    pub fn death_save(&mut self, value: i32, roll: bool) -> Result<DeathSaves, CombatError> {
        self.death_save_with_rng(value, roll, &mut rand::thread_rng())
    }

    pub fn death_save_with_rng<R: Rng>(
        &mut self,
        value: i32,
        roll: bool,
        rng: &mut R,
    ) -> Result<DeathSaves, CombatError> {
        let CombatantKind::Player(player) = &mut self.kind else {
            return Err(CombatError::NotAPlayer(self.name.clone()));
        };

        let value = if roll {
            DiceExpression::d20().roll_with_rng(rng).total
        } else {
            value
        };

        if value >= 10 {
            player.death_saves.successes = player.death_saves.successes.saturating_add(1);
        } else {
            player.death_saves.failures = player.death_saves.failures.saturating_add(1);
        }
        Ok(player.death_saves)
    }

    // ------------------------------------------------------------------------
    // Field mutators
    // ------------------------------------------------------------------------

    /// Re-roll initiative. Dexterity / 100 is added so ties sort by dexterity.
    pub fn update_initiative(&mut self, roll: i32) {
        self.initiative = roll as f64 + self.ability_scores.dexterity as f64 / 100.0;
    }

    pub fn update_notes(&mut self, text: impl Into<String>) {
        self.notes = text.into();
    }

    pub fn update_concentration(&mut self, concentrating: bool) {
        self.concentrating = concentrating;
    }

    /// Add a condition tag. Returns false if it was already active.
    pub fn add_condition(&mut self, tag: impl Into<String>) -> bool {
        let tag = tag.into();
        if self.has_condition(&tag) {
            return false;
        }
        self.conditions.push(tag);
        true
    }

    /// Remove a condition tag. Removing a tag that is not active is an error.
    pub fn remove_condition(&mut self, tag: &str) -> Result<(), CombatError> {
        let pos = self
            .conditions
            .iter()
            .position(|c| c == tag)
            .ok_or_else(|| CombatError::ConditionNotPresent {
                name: self.name.clone(),
                condition: tag.to_string(),
            })?;
        self.conditions.remove(pos);
        Ok(())
    }
}

impl fmt::Display for Combatant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (AC {}, HP {})",
            self.name, self.armor_class, self.hit_points
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::SkillTable;
    use crate::testing::{sample_fighter, sample_goblin, UnreachableRng};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn fighter() -> Combatant {
        Combatant::player(Arc::new(sample_fighter()), 12, None)
    }

    fn goblin() -> Combatant {
        let record = Arc::new(sample_goblin());
        Combatant::monster_with_rng(record, 10, HpMode::Average, &mut UnreachableRng).unwrap()
    }

    #[test]
    fn test_hp_grammar() {
        assert_eq!("+5".parse::<HpAdjustment>().unwrap(), HpAdjustment::Heal(5));
        assert_eq!("-12".parse::<HpAdjustment>().unwrap(), HpAdjustment::Damage(12));
        assert_eq!("30".parse::<HpAdjustment>().unwrap(), HpAdjustment::Set(30));
        assert_eq!(" - 7 hp".parse::<HpAdjustment>().unwrap(), HpAdjustment::Damage(7));

        for bad in ["", "hp", "+", "-", "+5+2", "-5-2", "+5-2", "5-2", "5+2", "--3"] {
            assert!(
                matches!(bad.parse::<HpAdjustment>(), Err(CombatError::UnexpectedSyntax(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_player_construction() {
        let fighter = fighter();
        assert_eq!(fighter.max_hp(), 28);
        assert_eq!(fighter.current_hp(), 28);
        assert_eq!(fighter.temp_hp(), 0);
        assert_eq!(fighter.proficiency_bonus, 2);
        assert!(fighter.conscious);
        assert!(!fighter.concentrating);
        assert!(fighter.conditions.is_empty());
        assert!((fighter.initiative() - 12.14).abs() < 1e-9);

        let wounded = Combatant::player(Arc::new(sample_fighter()), 12, Some(40));
        assert_eq!(wounded.current_hp(), 28);

        let down = Combatant::player(Arc::new(sample_fighter()), 12, Some(0));
        assert!(!down.conscious);
    }

    #[test]
    fn test_monster_average_hp_is_deterministic() {
        for _ in 0..10 {
            let goblin = goblin();
            assert_eq!(goblin.max_hp(), 7);
            assert_eq!(goblin.current_hp(), 7);
        }
    }

    #[test]
    fn test_average_without_stored_value() {
        let mut record = sample_goblin();
        record.hp = "2d8+2".to_string();
        let monster =
            Combatant::monster_with_rng(Arc::new(record), 10, HpMode::Average, &mut UnreachableRng)
                .unwrap();
        assert_eq!(monster.max_hp(), 11);
    }

    #[test]
    fn test_monster_rolled_hp() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..50 {
            let goblin =
                Combatant::monster_with_rng(Arc::new(sample_goblin()), 10, HpMode::Rolled, &mut rng)
                    .unwrap();
            assert!((2..=12).contains(&goblin.max_hp()));
            assert_eq!(goblin.current_hp(), goblin.max_hp());
        }
    }

    #[test]
    fn test_heal_clamps_to_max() {
        let mut fighter = fighter();
        fighter.set_current_hp("-10").unwrap();
        let change = fighter.set_current_hp("+50").unwrap();
        assert_eq!(change.current, 28);
        assert_eq!(change.delta(), 10);
    }

    #[test]
    fn test_damage_floors_at_zero_and_knocks_out() {
        let mut fighter = fighter();
        let change = fighter.set_current_hp("-40").unwrap();
        assert_eq!(fighter.current_hp(), 0);
        assert!(!fighter.conscious);
        assert!(change.knocked_out);
        assert_eq!(change.experience_awarded, 0);
    }

    #[test]
    fn test_damage_above_zero_keeps_consciousness() {
        let mut fighter = fighter();
        let change = fighter.set_current_hp("-27").unwrap();
        assert_eq!(fighter.current_hp(), 1);
        assert!(fighter.conscious);
        assert!(!change.knocked_out);
    }

    #[test]
    fn test_absolute_assignment() {
        let mut fighter = fighter();
        fighter.set_current_hp("15").unwrap();
        assert_eq!(fighter.current_hp(), 15);

        fighter.set_current_hp("99").unwrap();
        assert_eq!(fighter.current_hp(), 28);

        fighter.set_current_hp("0").unwrap();
        assert!(!fighter.conscious);
    }

    #[test]
    fn test_bad_syntax_leaves_state_alone() {
        let mut fighter = fighter();
        assert!(fighter.set_current_hp("+5-2").is_err());
        assert_eq!(fighter.current_hp(), 28);
        assert!(fighter.update_temp_hp("").is_err());
    }

    #[test]
    fn test_healing_from_zero_revives() {
        let mut fighter = fighter();
        fighter.set_current_hp("-30").unwrap();
        fighter.death_save(3, false).unwrap();
        fighter.death_save(15, false).unwrap();

        let change = fighter.set_current_hp("+4").unwrap();
        assert!(change.revived);
        assert!(fighter.conscious);
        assert_eq!(fighter.as_player().unwrap().death_saves, DeathSaves::default());
    }

    #[test]
    fn test_monster_experience_once() {
        let mut goblin = goblin();
        let change = goblin.set_current_hp("-20").unwrap();
        assert_eq!(change.experience_awarded, 50);

        let change = goblin.set_current_hp("-5").unwrap();
        assert_eq!(change.experience_awarded, 0);
        assert!(!change.knocked_out);

        // Revived and dropped again: still no second award
        goblin.set_current_hp("+3").unwrap();
        let change = goblin.set_current_hp("-3").unwrap();
        assert!(change.knocked_out);
        assert_eq!(change.experience_awarded, 0);
        assert!(goblin.as_monster().unwrap().experience_credited());
    }

    #[test]
    fn test_temp_hp_never_negative() {
        let mut fighter = fighter();
        assert_eq!(fighter.update_temp_hp("+5").unwrap(), 5);
        assert_eq!(fighter.update_temp_hp("-8").unwrap(), 0);
        assert_eq!(fighter.update_temp_hp("250").unwrap(), 250);
        assert!(fighter.conscious);
        assert_eq!(fighter.current_hp(), 28);
    }

    #[test]
    fn test_take_damage_uses_temp_hp_and_affinities() {
        let mut goblin = goblin();
        goblin.damage_types.insert(DamageType::Fire, DamageAffinity::Vulnerable);
        goblin.damage_types.insert(DamageType::Poison, DamageAffinity::Immune);

        goblin.update_temp_hp("3").unwrap();
        let change = goblin.take_damage(2, Some(DamageType::Fire));
        assert_eq!(goblin.temp_hp(), 0);
        assert_eq!(change.current, 6);

        let change = goblin.take_damage(50, Some(DamageType::Poison));
        assert_eq!(change.current, 6);

        let change = goblin.take_damage(6, None);
        assert!(change.knocked_out);
        assert_eq!(change.experience_awarded, 50);
    }

    #[test]
    fn test_concentration_dc() {
        let mut fighter = fighter();
        fighter.update_concentration(true);
        assert_eq!(fighter.set_current_hp("-4").unwrap().concentration_dc, Some(10));
        assert_eq!(fighter.set_current_hp("-22").unwrap().concentration_dc, Some(11));
        assert_eq!(fighter.set_current_hp("+5").unwrap().concentration_dc, None);
    }

    #[test]
    fn test_set_max_hp_clamps_current() {
        let mut fighter = fighter();
        let change = fighter.set_max_hp(20);
        assert_eq!(fighter.current_hp(), 20);
        assert_eq!(fighter.max_hp(), 20);
        assert_eq!(change.delta(), -8);
        assert!(!change.knocked_out);
    }

    #[test]
    fn test_zero_max_hp_defeats_monster() {
        let mut goblin = goblin();
        let change = goblin.set_max_hp(0);
        assert!(change.knocked_out);
        assert_eq!(change.experience_awarded, 50);
        assert!(!goblin.conscious);
        assert!(goblin.as_monster().unwrap().experience_credited());

        // Already down, nothing more to award
        let change = goblin.set_current_hp("-5").unwrap();
        assert_eq!(change.experience_awarded, 0);
    }

    #[test]
    fn test_concentration_dc_counts_soaked_damage() {
        let mut fighter = fighter();
        fighter.update_concentration(true);

        fighter.update_temp_hp("10").unwrap();
        let change = fighter.take_damage(30, None);
        assert_eq!(fighter.temp_hp(), 0);
        assert_eq!(change.current, 8);
        assert_eq!(change.concentration_dc, Some(15));

        fighter.update_temp_hp("30").unwrap();
        let change = fighter.take_damage(30, None);
        assert_eq!(change.current, 8);
        assert_eq!(change.concentration_dc, Some(15));

        let change = fighter.take_damage(0, None);
        assert_eq!(change.concentration_dc, None);
    }

    #[test]
    fn test_save_proficiency_adds_bonus() {
        let fighter = fighter();
        // Strength save is proficient, Dexterity is not
        let mut rng_a = StdRng::seed_from_u64(21);
        let mut rng_b = StdRng::seed_from_u64(21);
        let strength = fighter.roll_save_with_rng(Ability::Strength, &mut rng_a);
        let natural = strength.component_results[0].subtotal as i32;
        assert_eq!(strength.total, natural + 3 + 2);

        let mut unproficient = fighter.clone();
        unproficient.saving_throws.set(Ability::Strength, false);
        let plain = unproficient.roll_save_with_rng(Ability::Strength, &mut rng_b);
        assert_eq!(strength.total - plain.total, fighter.proficiency_bonus);
    }

    #[test]
    fn test_negative_modifier_save() {
        let fighter = fighter();
        let mut rng = StdRng::seed_from_u64(4);
        // Charisma 8 gives -1 and no proficiency
        let save = fighter.roll_save_with_rng(Ability::Charisma, &mut rng);
        let natural = save.component_results[0].subtotal as i32;
        assert_eq!(save.total, natural - 1);
        assert_eq!(fighter.saving_throw_bonus(Ability::Charisma), -1);
        assert_eq!(fighter.saving_throw_bonus(Ability::Constitution), 4);
    }

    #[test]
    fn test_skill_tiers() {
        let table = SkillTable::standard();
        let fighter = fighter();

        // Athletics proficient (+3 STR, +2), Perception expertise (+1 WIS, +4),
        // Stealth untrained (+2 DEX)
        assert_eq!(fighter.skill_bonus("Athletics", &table).unwrap(), 5);
        assert_eq!(fighter.skill_bonus("Perception", &table).unwrap(), 5);
        assert_eq!(fighter.skill_bonus("Stealth", &table).unwrap(), 2);

        let mut rng = StdRng::seed_from_u64(8);
        let roll = fighter.roll_skill_with_rng("perception", &table, &mut rng).unwrap();
        let natural = roll.component_results[0].subtotal as i32;
        assert_eq!(roll.total, natural + 5);
    }

    #[test]
    fn test_unknown_skill() {
        let table = SkillTable::standard();
        let err = fighter().roll_skill("Juggling", &table).unwrap_err();
        assert!(matches!(err, CombatError::Lookup(LookupError::SkillNotFound(_))));
    }

    #[test]
    fn test_conditions() {
        let mut fighter = fighter();
        assert!(fighter.add_condition("Prone"));
        assert!(!fighter.add_condition("Prone"));
        assert!(fighter.add_condition("Stunned"));
        assert!(fighter.is_incapacitated());

        fighter.remove_condition("Stunned").unwrap();
        assert!(!fighter.is_incapacitated());
        assert_eq!(fighter.conditions, vec!["Prone".to_string()]);

        let err = fighter.remove_condition("Charmed").unwrap_err();
        assert!(matches!(err, CombatError::ConditionNotPresent { .. }));
    }

    #[test]
    fn test_notes_and_concentration() {
        let mut goblin = goblin();
        goblin.update_notes("Carries a stolen locket");
        goblin.update_concentration(true);
        assert_eq!(goblin.notes, "Carries a stolen locket");
        assert!(goblin.concentrating);
    }

    #[test]
    fn test_death_saves() {
        let mut fighter = fighter();
        fighter.death_save(10, false).unwrap();
        fighter.death_save(9, false).unwrap();
        let saves = fighter.death_save(1, false).unwrap();
        assert_eq!(saves, DeathSaves { failures: 2, successes: 1 });

        let mut rng = StdRng::seed_from_u64(2);
        let saves = fighter.death_save_with_rng(0, true, &mut rng).unwrap();
        assert_eq!(saves.failures + saves.successes, 4);
    }

    #[test]
    fn test_death_save_rejects_monsters() {
        let mut goblin = goblin();
        assert!(matches!(
            goblin.death_save(12, false),
            Err(CombatError::NotAPlayer(_))
        ));
    }
}
