// Persona system for companion calls
//
// A persona is the script the assistant follows on a check-in call (who it
// pretends to be, how it talks, what it asks about). The set of personas is
// closed: `PersonaKind` enumerates every one and each ships as a TOML file
// under data/personas/.

pub mod registry;

pub use registry::{PendingContext, PersonaRegistry, RegistryLimits, CONTEXT_HEADER};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::CoreError;

/// The fixed set of personas the assistant can play
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonaKind {
    Mom,
    Dad,
    FemaleFriend,
    MaleFriend,
}

impl PersonaKind {
    pub const ALL: [PersonaKind; 4] = [
        PersonaKind::Mom,
        PersonaKind::Dad,
        PersonaKind::FemaleFriend,
        PersonaKind::MaleFriend,
    ];

    /// Canonical lowercase key used on the wire and in config files
    pub fn key(self) -> &'static str {
        match self {
            PersonaKind::Mom => "mom",
            PersonaKind::Dad => "dad",
            PersonaKind::FemaleFriend => "female_friend",
            PersonaKind::MaleFriend => "male_friend",
        }
    }

    fn builtin_source(self) -> &'static str {
        match self {
            PersonaKind::Mom => include_str!("../../data/personas/mom.toml"),
            PersonaKind::Dad => include_str!("../../data/personas/dad.toml"),
            PersonaKind::FemaleFriend => include_str!("../../data/personas/female_friend.toml"),
            PersonaKind::MaleFriend => include_str!("../../data/personas/male_friend.toml"),
        }
    }
}

impl fmt::Display for PersonaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for PersonaKind {
    type Err = CoreError;

    /// Case-insensitive; anything other than the four canonical keys is unknown.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mom" => Ok(PersonaKind::Mom),
            "dad" => Ok(PersonaKind::Dad),
            "female_friend" => Ok(PersonaKind::FemaleFriend),
            "male_friend" => Ok(PersonaKind::MaleFriend),
            _ => Err(CoreError::UnknownPersona(s.to_string())),
        }
    }
}

/// A built-in persona definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Persona {
    /// Name the assistant introduces itself with (e.g., "Mom", "Sophie")
    pub name: String,

    /// One-line summary shown by `safewalk personas`
    pub description: String,

    /// Voice the assistant speaks with when this persona is active
    pub voice_id: String,

    /// Base system prompt, before any caller-supplied context
    pub system_prompt: String,
}

impl Persona {
    /// Load the built-in definition for `kind`
    pub fn load_builtin(kind: PersonaKind) -> Result<Self> {
        let persona: Persona = toml::from_str(kind.builtin_source())
            .with_context(|| format!("Failed to parse builtin persona: {}", kind))?;

        if persona.system_prompt.trim().is_empty() {
            anyhow::bail!("Builtin persona '{}' has an empty system prompt", kind);
        }

        Ok(persona)
    }

    /// Load every built-in persona, in `PersonaKind::ALL` order
    pub fn load_all_builtin() -> Result<Vec<(PersonaKind, Self)>> {
        PersonaKind::ALL
            .iter()
            .map(|&kind| Ok((kind, Self::load_builtin(kind)?)))
            .collect()
    }
}
