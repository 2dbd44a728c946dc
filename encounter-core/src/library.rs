//! Reference library persistence.
//!
//! A [`ReferenceLibrary`] is the read-only record store an encounter is built
//! from: player and monster records keyed by id, plus the skill, condition,
//! species, class and monster type catalogues. It is stored as one
//! human-readable JSON document.

use crate::encounter::EncounterEntry;
use crate::records::{MonsterRecord, PlayerRecord, RecordId};
use crate::reference::{
    standard_conditions, ConditionReference, LookupError, SkillLookup, SkillReference, SkillTable,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::fs;
use tracing::{debug, warn};

/// Errors from library operations.
#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Player record {0} not found")]
    PlayerNotFound(RecordId),

    #[error("Monster record {0} not found")]
    MonsterNotFound(RecordId),
}

/// A named catalogue entry (species, class, monster type).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceEntry {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl ReferenceEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
        }
    }
}

/// A record that points at a catalogue entry that does not exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    UnknownSpecies { record: RecordId, species: String },
    UnknownClass { record: RecordId, class: String },
    UnknownMonsterType { record: RecordId, monster_type: String },
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationIssue::UnknownSpecies { record, species } => {
                write!(f, "player {record} has unknown species '{species}'")
            }
            ValidationIssue::UnknownClass { record, class } => {
                write!(f, "player {record} has unknown class '{class}'")
            }
            ValidationIssue::UnknownMonsterType {
                record,
                monster_type,
            } => write!(f, "monster {record} has unknown type '{monster_type}'"),
        }
    }
}

/// The record store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReferenceLibrary {
    #[serde(default)]
    pub players: BTreeMap<RecordId, Arc<PlayerRecord>>,

    #[serde(default)]
    pub monsters: BTreeMap<RecordId, Arc<MonsterRecord>>,

    /// Missing from a file means the standard eighteen skills.
    #[serde(default)]
    pub skills: SkillTable,

    #[serde(default = "standard_conditions")]
    pub conditions: Vec<ConditionReference>,

    /// Empty catalogues are not checked by [`ReferenceLibrary::validate`].
    #[serde(default)]
    pub species: Vec<ReferenceEntry>,

    #[serde(default)]
    pub classes: Vec<ReferenceEntry>,

    #[serde(default)]
    pub monster_types: Vec<ReferenceEntry>,
}

impl ReferenceLibrary {
    /// An empty library with the standard skills and conditions.
    pub fn new() -> Self {
        Self {
            conditions: standard_conditions(),
            ..Self::default()
        }
    }

    /// Parse a library from a JSON string.
    pub fn from_json_str(content: &str) -> Result<Self, LibraryError> {
        let library: Self = serde_json::from_str(content)?;
        debug!(
            players = library.players.len(),
            monsters = library.monsters.len(),
            skills = library.skills.len(),
            "Reference library parsed"
        );
        Ok(library)
    }

    /// Load from a JSON file.
    pub async fn load_json(path: impl AsRef<Path>) -> Result<Self, LibraryError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).await?;
        debug!(path = %path.display(), "Loading reference library");
        Self::from_json_str(&content)
    }

    /// Save to a JSON file.
    pub async fn save_json(&self, path: impl AsRef<Path>) -> Result<(), LibraryError> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).await?;
        Ok(())
    }

    pub fn insert_player(&mut self, id: RecordId, record: PlayerRecord) {
        self.players.insert(id, Arc::new(record));
    }

    pub fn insert_monster(&mut self, id: RecordId, record: MonsterRecord) {
        self.monsters.insert(id, Arc::new(record));
    }

    pub fn player(&self, id: RecordId) -> Result<Arc<PlayerRecord>, LibraryError> {
        self.players
            .get(&id)
            .cloned()
            .ok_or(LibraryError::PlayerNotFound(id))
    }

    pub fn monster(&self, id: RecordId) -> Result<Arc<MonsterRecord>, LibraryError> {
        self.monsters
            .get(&id)
            .cloned()
            .ok_or(LibraryError::MonsterNotFound(id))
    }

    /// An encounter entry for a stored player at full hit points.
    pub fn player_entry(
        &self,
        id: RecordId,
        initiative: i32,
    ) -> Result<EncounterEntry, LibraryError> {
        Ok(EncounterEntry::player(self.player(id)?, initiative))
    }

    /// An encounter entry for a stored monster.
    pub fn monster_entry(
        &self,
        id: RecordId,
        initiative: i32,
    ) -> Result<EncounterEntry, LibraryError> {
        Ok(EncounterEntry::monster(self.monster(id)?, initiative))
    }

    /// Find records that name a species, class or monster type missing from
    /// the catalogues.
    pub fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        for (&record, player) in &self.players {
            if !self.species.is_empty() && !contains(&self.species, &player.species) {
                issues.push(ValidationIssue::UnknownSpecies {
                    record,
                    species: player.species.clone(),
                });
            }
            if !self.classes.is_empty() {
                for class in player.class.keys() {
                    if !contains(&self.classes, class) {
                        issues.push(ValidationIssue::UnknownClass {
                            record,
                            class: class.clone(),
                        });
                    }
                }
            }
        }

        if !self.monster_types.is_empty() {
            for (&record, monster) in &self.monsters {
                if !contains(&self.monster_types, &monster.monster_type) {
                    issues.push(ValidationIssue::UnknownMonsterType {
                        record,
                        monster_type: monster.monster_type.clone(),
                    });
                }
            }
        }

        for issue in &issues {
            warn!(%issue, "Reference library validation");
        }
        issues
    }
}

fn contains(entries: &[ReferenceEntry], name: &str) -> bool {
    entries.iter().any(|e| e.name.eq_ignore_ascii_case(name))
}

impl SkillLookup for ReferenceLibrary {
    fn skill(&self, name: &str) -> Result<&SkillReference, LookupError> {
        self.skills.skill(name)
    }
}
