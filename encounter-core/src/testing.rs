//! Testing utilities for the encounter engine.
//!
//! Sample records with known stats, a small reference library built from
//! them, and [`UnreachableRng`] for asserting that a code path never rolls.

use crate::library::{ReferenceEntry, ReferenceLibrary};
use crate::records::{
    ActionRecord, ActionTargets, CreatureRecord, MonsterRecord, PlayerRecord, RecordId,
};
use crate::stats::{AbilityScores, Alignment, ChallengeRating, ProficiencyLevel, SaveProficiencies};
use rand::RngCore;
use std::collections::{BTreeMap, HashMap};

/// A random source that panics when drawn from.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnreachableRng;

impl RngCore for UnreachableRng {
    fn next_u32(&mut self) -> u32 {
        unreachable!("random number drawn on a deterministic path")
    }

    fn next_u64(&mut self) -> u64 {
        unreachable!("random number drawn on a deterministic path")
    }

    fn fill_bytes(&mut self, _dest: &mut [u8]) {
        unreachable!("random bytes drawn on a deterministic path")
    }

    fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> Result<(), rand::Error> {
        unreachable!("random bytes drawn on a deterministic path")
    }
}

fn creature(name: &str, ac: u8, alignment: Alignment, scores: AbilityScores) -> CreatureRecord {
    CreatureRecord {
        name: name.to_string(),
        ac,
        size: "Medium".to_string(),
        alignment,
        languages: vec!["Common".to_string()],
        speed: vec![30],
        ability_scores: scores,
        saves: SaveProficiencies::default(),
        skills: HashMap::new(),
        senses: BTreeMap::new(),
        damage_types: BTreeMap::new(),
        notes: String::new(),
    }
}

/// Level 3 human fighter, 28 hit points.
///
/// STR 16, DEX 14, CON 14, INT 10, WIS 12, CHA 8. Proficient in Strength and
/// Constitution saves and Athletics; expertise in Perception.
pub fn sample_fighter() -> PlayerRecord {
    let mut creature = creature(
        "Roland",
        18,
        Alignment::LawfulGood,
        AbilityScores::new(16, 14, 14, 10, 12, 8),
    );
    creature.saves = SaveProficiencies::new([true, false, true, false, false, false]);
    creature
        .skills
        .insert("Athletics".to_string(), ProficiencyLevel::Proficient);
    creature
        .skills
        .insert("Perception".to_string(), ProficiencyLevel::Expertise);

    PlayerRecord {
        creature,
        level: 3,
        class: BTreeMap::from([("Fighter".to_string(), 3)]),
        species: "Human".to_string(),
        hp: 28,
    }
}

/// Level 3 elf wizard, 17 hit points, DEX 12.
pub fn sample_wizard() -> PlayerRecord {
    let mut creature = creature(
        "Mira",
        12,
        Alignment::NeutralGood,
        AbilityScores::new(8, 12, 14, 16, 12, 10),
    );
    creature.saves = SaveProficiencies::new([false, false, false, true, true, false]);
    creature
        .skills
        .insert("Arcana".to_string(), ProficiencyLevel::Proficient);
    creature.languages.push("Elvish".to_string());
    creature.senses.insert("Darkvision".to_string(), 60);

    PlayerRecord {
        creature,
        level: 3,
        class: BTreeMap::from([("Wizard".to_string(), 3)]),
        species: "Elf".to_string(),
        hp: 17,
    }
}

/// CR 1/4 goblin worth 50 XP, hit points `"7:2d6"`, DEX 14.
pub fn sample_goblin() -> MonsterRecord {
    let mut creature = creature(
        "Goblin",
        15,
        Alignment::NeutralEvil,
        AbilityScores::new(8, 14, 10, 10, 8, 8),
    );
    creature.size = "Small".to_string();
    creature.languages.push("Goblin".to_string());
    creature
        .skills
        .insert("Stealth".to_string(), ProficiencyLevel::Expertise);
    creature.senses.insert("Darkvision".to_string(), 60);

    let scimitar = ActionRecord {
        range: 5,
        hit_bonus: 4,
        targets: ActionTargets::SingleTarget,
        damage: vec!["(1d6 + 2)Slashing".to_string()],
        extra: String::new(),
    };
    let shortbow = ActionRecord {
        range: 80,
        hit_bonus: 4,
        targets: ActionTargets::SingleTarget,
        damage: vec!["(1d6 + 2)Piercing".to_string()],
        extra: "Long range 320 ft.".to_string(),
    };

    MonsterRecord {
        creature,
        cr: ChallengeRating::new(0.25),
        xp: 50,
        monster_type: "Humanoid".to_string(),
        actions: BTreeMap::from([
            ("Scimitar".to_string(), scimitar),
            ("Shortbow".to_string(), shortbow),
        ]),
        special_traits: BTreeMap::from([(
            "Nimble Escape".to_string(),
            "Disengage or Hide as a bonus action.".to_string(),
        )]),
        legendary: false,
        legendary_actions: BTreeMap::new(),
        legendary_resistances: 0,
        lair_actions: BTreeMap::new(),
        hp: "7:2d6".to_string(),
    }
}

/// Fighter and wizard as players #1 and #2, goblin as monster #1.
pub fn sample_library() -> ReferenceLibrary {
    let mut library = ReferenceLibrary::new();
    library.insert_player(RecordId(1), sample_fighter());
    library.insert_player(RecordId(2), sample_wizard());
    library.insert_monster(RecordId(1), sample_goblin());
    library.species = vec![ReferenceEntry::new("Human"), ReferenceEntry::new("Elf")];
    library.classes = vec![ReferenceEntry::new("Fighter"), ReferenceEntry::new("Wizard")];
    library.monster_types = vec![ReferenceEntry::new("Humanoid"), ReferenceEntry::new("Undead")];
    library
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::SkillLookup;

    #[test]
    #[should_panic(expected = "deterministic path")]
    fn test_unreachable_rng_panics() {
        let mut rng = UnreachableRng;
        rng.next_u32();
    }

    #[test]
    fn test_sample_library() {
        let library = sample_library();
        assert_eq!(library.players.len(), 2);
        assert_eq!(library.monsters.len(), 1);
        assert!(library.validate().is_empty());
        assert!(library.skill("Perception").is_ok());
    }
}
