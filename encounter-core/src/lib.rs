//! D&D 5e encounter engine.
//!
//! This crate provides:
//! - A dice expression evaluator with stored averages
//! - Player and monster combatants with hit points, saves, skills and conditions
//! - An initiative tracker that credits experience for defeated monsters
//! - A JSON reference library of player and monster records
//!
//! # Quick Start
//!
//! ```ignore
//! use encounter_core::{Encounter, EncounterConfig, HpMode, RecordId, ReferenceLibrary};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let library = ReferenceLibrary::load_json("library.json").await?;
//!     let config = EncounterConfig::new().with_monster_hp(HpMode::Average);
//!
//!     let mut encounter = Encounter::new(
//!         vec![
//!             library.player_entry(RecordId(1), 17)?,
//!             library.monster_entry(RecordId(4), 12)?,
//!         ],
//!         config,
//!     )?;
//!
//!     let goblin = encounter.combatants()[1].id;
//!     encounter.set_current_hp(goblin, "-9")?;
//!     encounter.next_turn();
//!     println!("{} XP earned", encounter.experience());
//!     Ok(())
//! }
//! ```

pub mod combatant;
pub mod dice;
pub mod encounter;
pub mod library;
pub mod records;
pub mod reference;
pub mod stats;
pub mod testing;

// Primary public API
pub use combatant::{
    CombatError, Combatant, CombatantId, CombatantKind, DeathSaves, HitPoints, HpAdjustment,
    HpChange, HpMode,
};
pub use dice::{evaluate, DiceError, DiceExpression, RollResult};
pub use encounter::{Encounter, EncounterConfig, EncounterEntry, EncounterError, TurnPolicy};
pub use library::{LibraryError, ReferenceLibrary};
pub use records::{MonsterRecord, PlayerRecord, RecordId};
pub use reference::{LookupError, SkillLookup, SkillTable};
pub use stats::{Ability, DamageType};
