//! QA tests for loading reference libraries from disk.
//!
//! Run with: `cargo test -p encounter-core --test qa_library`

use encounter_core::testing::UnreachableRng;
use encounter_core::{
    Ability, Encounter, EncounterConfig, HpMode, LibraryError, RecordId, ReferenceLibrary,
    SkillLookup,
};
use tempfile::TempDir;

const LIBRARY_JSON: &str = r#"{
    "players": {
        "3": {
            "name": "Brakka",
            "ac": 16,
            "size": "Medium",
            "alignment": "Chaotic Good",
            "languages": ["Common", "Dwarvish"],
            "speed": [25],
            "ability_scores": [15, 10, 16, 8, 13, 12],
            "saves": [0, 0, 1, 0, 1, 0],
            "skills": {"Medicine": 1, "Religion": 2},
            "senses": {"Darkvision": 60},
            "damage_types": {"Poison": "Resistant"},
            "notes": "",
            "level": 5,
            "class": {"Cleric": 5},
            "species": "Dwarf",
            "hp": 38
        }
    },
    "monsters": {
        "12": {
            "name": "Skeleton",
            "ac": 13,
            "size": "Medium",
            "alignment": "Lawful Evil",
            "languages": [],
            "speed": [30],
            "ability_scores": [10, 14, 15, 6, 8, 5],
            "saves": [0, 0, 0, 0, 0, 0],
            "skills": {},
            "senses": {"Darkvision": 60},
            "damage_types": {"Bludgeoning": "Vulnerable", "Poison": "Immune"},
            "notes": "",
            "cr": 0.25,
            "xp": 50,
            "type": "Undead",
            "actions": {
                "Shortsword": {
                    "range": 5,
                    "hit_bonus": 4,
                    "targets": "Single Target",
                    "damage": ["(1d6 + 2)Piercing"],
                    "extra": ""
                }
            },
            "special_traits": {},
            "legendary": false,
            "legendary_actions": {},
            "legendary_resistances": 0,
            "lair_actions": {},
            "hp": "13:2d8+4"
        }
    },
    "species": [{"name": "Dwarf"}],
    "classes": [{"name": "Cleric", "description": "Divine caster"}],
    "monster_types": [{"name": "Undead"}]
}"#;

#[tokio::test]
async fn test_load_library_and_fight() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("library.json");
    tokio::fs::write(&path, LIBRARY_JSON).await.unwrap();

    let library = ReferenceLibrary::load_json(&path).await.unwrap();
    assert!(library.validate().is_empty());
    assert_eq!(library.skill("Religion").unwrap().ability, Ability::Intelligence);

    let mut encounter = Encounter::with_rng(
        vec![
            library.player_entry(RecordId(3), 11).unwrap(),
            library.monster_entry(RecordId(12), 11).unwrap(),
        ],
        EncounterConfig::new().with_monster_hp(HpMode::Average),
        &mut UnreachableRng,
    )
    .unwrap();

    // Skeleton has the higher dexterity
    assert_eq!(encounter.current().unwrap().name, "Skeleton");
    let skeleton = encounter.current().unwrap().id;
    assert_eq!(encounter.current().unwrap().max_hp(), 13);

    // Vulnerable to bludgeoning: 7 becomes 14
    let change = encounter
        .take_damage(skeleton, 7, Some(encounter_core::DamageType::Bludgeoning))
        .unwrap();
    assert!(change.knocked_out);
    assert_eq!(encounter.experience(), 50);

    let cleric = encounter.combatants()[1].id;
    let brakka = encounter.get(cleric).unwrap();
    assert_eq!(brakka.proficiency_bonus, 3);
    // Religion expertise: INT -1, proficiency twice
    assert_eq!(brakka.skill_bonus("Religion", &library).unwrap(), 5);
}

#[tokio::test]
async fn test_round_trip_through_disk() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("copy.json");

    let library = ReferenceLibrary::from_json_str(LIBRARY_JSON).unwrap();
    library.save_json(&path).await.unwrap();
    let reloaded = ReferenceLibrary::load_json(&path).await.unwrap();

    assert_eq!(
        reloaded.monster(RecordId(12)).unwrap(),
        library.monster(RecordId(12)).unwrap()
    );
    assert_eq!(
        reloaded.player(RecordId(3)).unwrap(),
        library.player(RecordId(3)).unwrap()
    );
}

#[tokio::test]
async fn test_unknown_monster_type_is_reported() {
    let json = LIBRARY_JSON.replace("\"type\": \"Undead\"", "\"type\": \"Construct\"");
    let library = ReferenceLibrary::from_json_str(&json).unwrap();
    let issues = library.validate();
    assert_eq!(issues.len(), 1);
    assert!(issues[0].to_string().contains("Construct"));

    assert!(matches!(
        library.player_entry(RecordId(12), 1),
        Err(LibraryError::PlayerNotFound(_))
    ));
}
