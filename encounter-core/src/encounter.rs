//! Encounter and initiative tracking.
//!
//! An [`Encounter`] owns its combatants, keeps them sorted by initiative
//! (highest first) and tracks whose turn it is. Hit point edits go through the
//! encounter so that experience for defeated monsters lands in the running
//! total instead of being dropped on the floor.

use crate::combatant::{CombatError, Combatant, CombatantId, HpChange, HpMode};
use crate::records::{MonsterRecord, PlayerRecord};
use crate::stats::DamageType;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Errors from encounter operations.
#[derive(Debug, Error)]
pub enum EncounterError {
    #[error("No combatant with id {0}")]
    CombatantNotFound(CombatantId),

    #[error(transparent)]
    Combat(#[from] CombatError),
}

/// Which combatants get a turn when the cursor advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TurnPolicy {
    /// Unconscious combatants keep their place in the order but are passed over.
    #[default]
    SkipUnconscious,
    /// Every combatant gets a turn.
    VisitAll,
}

/// Configuration for running an encounter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EncounterConfig {
    /// How monster hit points are chosen at construction.
    pub monster_hp: HpMode,

    /// Turn advance policy.
    pub turn_policy: TurnPolicy,
}

impl EncounterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_monster_hp(mut self, mode: HpMode) -> Self {
        self.monster_hp = mode;
        self
    }

    pub fn with_turn_policy(mut self, policy: TurnPolicy) -> Self {
        self.turn_policy = policy;
        self
    }
}

/// One participant to add to an encounter.
#[derive(Debug, Clone)]
pub enum EncounterEntry {
    Player {
        record: Arc<PlayerRecord>,
        initiative: i32,
        /// Starting hit points; the record's maximum when absent.
        current_hp: Option<i32>,
    },
    Monster {
        record: Arc<MonsterRecord>,
        initiative: i32,
        /// Maximum hit points chosen up front; otherwise the hit dice are
        /// evaluated according to [`EncounterConfig::monster_hp`].
        max_hp: Option<i32>,
    },
}

impl EncounterEntry {
    pub fn player(record: Arc<PlayerRecord>, initiative: i32) -> Self {
        EncounterEntry::Player {
            record,
            initiative,
            current_hp: None,
        }
    }

    pub fn monster(record: Arc<MonsterRecord>, initiative: i32) -> Self {
        EncounterEntry::Monster {
            record,
            initiative,
            max_hp: None,
        }
    }

    /// Set the starting hit points of a player entry. No effect on monsters.
    pub fn with_current_hp(mut self, hp: i32) -> Self {
        if let EncounterEntry::Player { current_hp, .. } = &mut self {
            *current_hp = Some(hp);
        }
        self
    }

    /// Set the maximum hit points of a monster entry. No effect on players.
    pub fn with_max_hp(mut self, hp: i32) -> Self {
        if let EncounterEntry::Monster { max_hp, .. } = &mut self {
            *max_hp = Some(hp);
        }
        self
    }

    fn build<R: Rng>(
        self,
        config: &EncounterConfig,
        rng: &mut R,
    ) -> Result<Combatant, CombatError> {
        match self {
            EncounterEntry::Player {
                record,
                initiative,
                current_hp,
            } => Ok(Combatant::player(record, initiative, current_hp)),
            EncounterEntry::Monster {
                record,
                initiative,
                max_hp: Some(max_hp),
            } => Ok(Combatant::monster_with_max_hp(record, initiative, max_hp)),
            EncounterEntry::Monster {
                record,
                initiative,
                max_hp: None,
            } => Combatant::monster_with_rng(record, initiative, config.monster_hp, rng),
        }
    }
}

/// A running encounter.
#[derive(Debug, Clone)]
pub struct Encounter {
    combatants: Vec<Combatant>,
    current_index: usize,
    round: u32,
    experience: u32,
    config: EncounterConfig,
}

impl Encounter {
    /// Build an encounter from tagged entries.
    pub fn new(
        entries: Vec<EncounterEntry>,
        config: EncounterConfig,
    ) -> Result<Self, EncounterError> {
        Self::with_rng(entries, config, &mut rand::thread_rng())
    }

    pub fn with_rng<R: Rng>(
        entries: Vec<EncounterEntry>,
        config: EncounterConfig,
        rng: &mut R,
    ) -> Result<Self, EncounterError> {
        let mut combatants = entries
            .into_iter()
            .map(|entry| entry.build(&config, &mut *rng))
            .collect::<Result<Vec<_>, _>>()?;
        sort_by_initiative(&mut combatants);

        debug!(
            combatants = combatants.len(),
            order = ?combatants.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
            "Encounter assembled"
        );

        Ok(Self {
            combatants,
            current_index: 0,
            round: 1,
            experience: 0,
            config,
        })
    }

    pub fn combatants(&self) -> &[Combatant] {
        &self.combatants
    }

    pub fn config(&self) -> &EncounterConfig {
        &self.config
    }

    /// Combatant whose turn it is.
    pub fn current(&self) -> Option<&Combatant> {
        self.combatants.get(self.current_index)
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    /// Experience earned from defeated monsters so far.
    pub fn experience(&self) -> u32 {
        self.experience
    }

    pub fn get(&self, id: CombatantId) -> Option<&Combatant> {
        self.combatants.iter().find(|c| c.id == id)
    }

    /// Mutable access for notes, conditions, concentration, rolls and death
    /// saves. Hit point edits should use the encounter's own methods so that
    /// experience is credited.
    pub fn get_mut(&mut self, id: CombatantId) -> Option<&mut Combatant> {
        self.combatants.iter_mut().find(|c| c.id == id)
    }

    fn require_mut(&mut self, id: CombatantId) -> Result<&mut Combatant, EncounterError> {
        self.get_mut(id).ok_or(EncounterError::CombatantNotFound(id))
    }

    // ------------------------------------------------------------------------
    // Hit points
    // ------------------------------------------------------------------------

    /// Apply a hit point expression to a combatant.
    pub fn set_current_hp(
        &mut self,
        id: CombatantId,
        expr: &str,
    ) -> Result<HpChange, EncounterError> {
        let change = self.require_mut(id)?.set_current_hp(expr)?;
        self.credit(id, &change);
        Ok(change)
    }

    /// Apply a temporary hit point expression to a combatant.
    pub fn update_temp_hp(&mut self, id: CombatantId, expr: &str) -> Result<i32, EncounterError> {
        Ok(self.require_mut(id)?.update_temp_hp(expr)?)
    }

    /// Deal typed damage to a combatant.
    pub fn take_damage(
        &mut self,
        id: CombatantId,
        amount: i32,
        damage_type: Option<DamageType>,
    ) -> Result<HpChange, EncounterError> {
        let change = self.require_mut(id)?.take_damage(amount, damage_type);
        self.credit(id, &change);
        Ok(change)
    }

    /// Override a combatant's maximum hit points for this encounter.
    pub fn set_max_hp(
        &mut self,
        id: CombatantId,
        maximum: i32,
    ) -> Result<HpChange, EncounterError> {
        let change = self.require_mut(id)?.set_max_hp(maximum);
        self.credit(id, &change);
        Ok(change)
    }

    fn credit(&mut self, id: CombatantId, change: &HpChange) {
        if change.knocked_out {
            if let Some(combatant) = self.get(id) {
                info!(name = %combatant.name, "Combatant dropped to 0 hit points");
            }
        }
        if change.experience_awarded > 0 {
            self.experience = self.experience.saturating_add(change.experience_awarded);
            info!(
                awarded = change.experience_awarded,
                total = self.experience,
                "Experience credited"
            );
        }
    }

    // ------------------------------------------------------------------------
    // Turn order
    // ------------------------------------------------------------------------

    /// Advance to the next combatant, wrapping into a new round.
    ///
    /// Under [`TurnPolicy::SkipUnconscious`] unconscious combatants are passed
    /// over. If nobody is conscious the cursor goes around one full round and
    /// stays where it was.
    pub fn next_turn(&mut self) -> Option<&Combatant> {
        let len = self.combatants.len();
        if len == 0 {
            return None;
        }

        self.land_on(self.current_index + 1);

        let current = &self.combatants[self.current_index];
        debug!(round = self.round, name = %current.name, "Turn advanced");
        Some(current)
    }

    /// Move the cursor to `index`, or to the first combatant after it that
    /// may act under the turn policy. Running off the end wraps into a new
    /// round.
    fn land_on(&mut self, mut index: usize) {
        let len = self.combatants.len();
        if len == 0 {
            self.current_index = 0;
            return;
        }

        for step in 0..len {
            if index >= len {
                index = 0;
                self.round += 1;
            }
            if self.config.turn_policy == TurnPolicy::VisitAll || self.combatants[index].conscious {
                break;
            }
            if step + 1 < len {
                index += 1;
            }
        }
        self.current_index = index;
    }

    /// Re-roll one combatant's initiative and re-sort, keeping the turn with
    /// whoever currently has it.
    pub fn update_initiative(&mut self, id: CombatantId, roll: i32) -> Result<(), EncounterError> {
        self.require_mut(id)?.update_initiative(roll);
        self.resort();
        Ok(())
    }

    /// Add a combatant mid-fight. It slots in by initiative after anyone it
    /// ties with, and the current turn does not move.
    pub fn add_combatant(&mut self, entry: EncounterEntry) -> Result<CombatantId, EncounterError> {
        self.add_combatant_with_rng(entry, &mut rand::thread_rng())
    }

    pub fn add_combatant_with_rng<R: Rng>(
        &mut self,
        entry: EncounterEntry,
        rng: &mut R,
    ) -> Result<CombatantId, EncounterError> {
        let combatant = entry.build(&self.config, rng)?;
        let id = combatant.id;
        debug!(name = %combatant.name, initiative = combatant.initiative(), "Combatant joined");
        self.combatants.push(combatant);
        self.resort();
        Ok(id)
    }

    /// Remove a combatant (fled, dismissed). The turn stays with the current
    /// combatant. Removing the current combatant passes the turn on the same
    /// way [`Encounter::next_turn`] does.
    pub fn remove_combatant(&mut self, id: CombatantId) -> Result<Combatant, EncounterError> {
        let pos = self
            .combatants
            .iter()
            .position(|c| c.id == id)
            .ok_or(EncounterError::CombatantNotFound(id))?;
        let removed = self.combatants.remove(pos);

        match pos.cmp(&self.current_index) {
            Ordering::Less => self.current_index -= 1,
            Ordering::Equal => self.land_on(pos),
            Ordering::Greater => {}
        }

        debug!(name = %removed.name, "Combatant removed");
        Ok(removed)
    }

    /// True once every monster is unconscious (and at least one took part).
    pub fn all_monsters_defeated(&self) -> bool {
        let mut monsters = self.combatants.iter().filter(|c| c.is_monster()).peekable();
        monsters.peek().is_some() && monsters.all(|m| !m.conscious)
    }

    fn resort(&mut self) {
        let current_id = self.current().map(|c| c.id);
        sort_by_initiative(&mut self.combatants);
        if let Some(id) = current_id {
            self.current_index = self
                .combatants
                .iter()
                .position(|c| c.id == id)
                .unwrap_or(0);
        }
        debug!(
            order = ?self.combatants.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
            "Initiative order updated"
        );
    }
}

/// Highest initiative first. The sort is stable, so exact ties keep insertion
/// order.
fn sort_by_initiative(combatants: &mut [Combatant]) {
    combatants.sort_by(|a, b| b.initiative().total_cmp(&a.initiative()));
}
