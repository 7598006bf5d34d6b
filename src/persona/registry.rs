// Persona registry: owns the live prompt text for every persona
//
// The key set is fixed when the registry is built. Only the text behind a key
// changes, and only by appending caller context through `augment`.

use anyhow::Result;
use dashmap::DashMap;
use std::collections::{BTreeSet, HashMap};

use super::{Persona, PersonaKind};
use crate::errors::{CoreError, CoreResult};

/// Header line that introduces every appended context fragment
pub const CONTEXT_HEADER: &str = "* Additional user context:";

/// Size limits applied by `augment`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryLimits {
    /// Longest accepted fragment, in characters, after normalization
    pub max_fragment_chars: usize,
    /// Longest persona text (base prompt plus all context), in characters
    pub max_persona_chars: usize,
}

impl Default for RegistryLimits {
    fn default() -> Self {
        Self {
            max_fragment_chars: 1_000,
            max_persona_chars: 16_000,
        }
    }
}

/// A merged persona text that has been computed but not stored yet
#[derive(Debug, Clone)]
pub struct PendingContext {
    kind: PersonaKind,
    fragment: String,
    base: String,
    merged: String,
}

impl PendingContext {
    pub fn persona(&self) -> PersonaKind {
        self.kind
    }

    /// Full text the persona will have once committed
    pub fn text(&self) -> &str {
        &self.merged
    }
}

pub struct PersonaRegistry {
    /// Current text per persona; `get_mut` holds the shard lock for the whole
    /// read-modify-write in `augment` and `commit`
    texts: DashMap<PersonaKind, String>,
    /// Default voice per persona (only known for built-in definitions)
    voices: HashMap<PersonaKind, String>,
    limits: RegistryLimits,
}

impl PersonaRegistry {
    /// Registry holding every built-in persona
    pub fn builtin() -> Result<Self> {
        let personas = Persona::load_all_builtin()?;
        Ok(Self::with_personas(personas))
    }

    /// Registry holding exactly the given persona definitions
    pub fn with_personas(personas: impl IntoIterator<Item = (PersonaKind, Persona)>) -> Self {
        let texts = DashMap::new();
        let mut voices = HashMap::new();
        for (kind, persona) in personas {
            voices.insert(kind, persona.voice_id);
            texts.insert(kind, persona.system_prompt);
        }
        Self {
            texts,
            voices,
            limits: RegistryLimits::default(),
        }
    }

    /// Registry holding raw prompt texts with no voice information
    pub fn with_texts<S: Into<String>>(texts: impl IntoIterator<Item = (PersonaKind, S)>) -> Self {
        Self {
            texts: texts.into_iter().map(|(k, t)| (k, t.into())).collect(),
            voices: HashMap::new(),
            limits: RegistryLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: RegistryLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn limits(&self) -> RegistryLimits {
        self.limits
    }

    /// Parse `key` and confirm it belongs to this registry
    pub fn lookup(&self, key: &str) -> CoreResult<PersonaKind> {
        let kind: PersonaKind = key.parse()?;
        if self.texts.contains_key(&kind) {
            Ok(kind)
        } else {
            Err(CoreError::UnknownPersona(key.to_string()))
        }
    }

    /// Current text for `key` (case-insensitive)
    pub fn resolve(&self, key: &str) -> CoreResult<String> {
        let kind = self.lookup(key)?;
        self.texts
            .get(&kind)
            .map(|text| text.value().clone())
            .ok_or_else(|| CoreError::UnknownPersona(key.to_string()))
    }

    /// Append `fragment` to the persona's text and return the new full text.
    ///
    /// Repeated calls keep stacking fragments; earlier ones are never
    /// rewritten. On any error the stored text is left untouched.
    pub fn augment(&self, key: &str, fragment: &str) -> CoreResult<String> {
        let kind = self.lookup(key)?;
        let fragment = normalize_fragment(fragment, self.limits.max_fragment_chars)?;

        let mut text = self
            .texts
            .get_mut(&kind)
            .ok_or_else(|| CoreError::UnknownPersona(key.to_string()))?;
        let merged = self.merge(kind, text.as_str(), &fragment)?;
        *text = merged.clone();
        drop(text);

        tracing::debug!(
            persona = %kind,
            chars = merged.chars().count(),
            "Persona context augmented"
        );
        Ok(merged)
    }

    /// Compute what `augment` would store, without storing it.
    ///
    /// Used when the merged text has to be accepted somewhere else (the
    /// assistant platform) before it may become the persona's text.
    pub fn preview_augment(&self, key: &str, fragment: &str) -> CoreResult<PendingContext> {
        let kind = self.lookup(key)?;
        let fragment = normalize_fragment(fragment, self.limits.max_fragment_chars)?;
        let base = self
            .texts
            .get(&kind)
            .map(|text| text.value().clone())
            .ok_or_else(|| CoreError::UnknownPersona(key.to_string()))?;
        let merged = self.merge(kind, &base, &fragment)?;

        Ok(PendingContext {
            kind,
            fragment,
            base,
            merged,
        })
    }

    /// Store a previewed merge. If the persona changed since the preview, the
    /// fragment is appended to the current text instead.
    pub fn commit(&self, pending: PendingContext) -> CoreResult<String> {
        let mut text = self
            .texts
            .get_mut(&pending.kind)
            .ok_or_else(|| CoreError::UnknownPersona(pending.kind.key().to_string()))?;

        let merged = if *text == pending.base {
            pending.merged
        } else {
            self.merge(pending.kind, text.as_str(), &pending.fragment)?
        };
        *text = merged.clone();
        drop(text);

        tracing::debug!(
            persona = %pending.kind,
            chars = merged.chars().count(),
            "Persona context committed"
        );
        Ok(merged)
    }

    fn merge(&self, kind: PersonaKind, current: &str, fragment: &str) -> CoreResult<String> {
        let merged = format!("{}\n{}\n- {}", current, CONTEXT_HEADER, fragment);
        let len = merged.chars().count();
        if len > self.limits.max_persona_chars {
            return Err(CoreError::ContextBudgetExceeded {
                persona: kind.key().to_string(),
                len,
                limit: self.limits.max_persona_chars,
            });
        }
        Ok(merged)
    }

    /// Default voice for `key`, if the persona came with one
    pub fn voice_for(&self, key: &str) -> CoreResult<Option<&str>> {
        let kind = self.lookup(key)?;
        Ok(self.voices.get(&kind).map(String::as_str))
    }

    /// The fixed set of persona keys
    pub fn list_keys(&self) -> BTreeSet<String> {
        self.texts.iter().map(|e| e.key().key().to_string()).collect()
    }
}

/// Fold the fragment onto a single line (every Unicode whitespace run becomes
/// one space) and remove any copy of the context header, so a fragment can
/// neither open a new list item nor imitate the framing of a later one.
fn normalize_fragment(fragment: &str, max_chars: usize) -> CoreResult<String> {
    let needle = CONTEXT_HEADER.to_ascii_lowercase();
    let mut folded = collapse_whitespace(fragment);
    // ASCII lowercasing keeps byte offsets, so positions carry over
    while let Some(pos) = folded.to_ascii_lowercase().find(&needle) {
        folded.replace_range(pos..pos + needle.len(), " ");
        folded = collapse_whitespace(&folded);
    }

    if folded.is_empty() {
        return Err(CoreError::InvalidFragment("fragment is empty".to_string()));
    }

    let chars = folded.chars().count();
    if chars > max_chars {
        return Err(CoreError::InvalidFragment(format!(
            "fragment is {} chars, limit is {}",
            chars, max_chars
        )));
    }

    Ok(folded)
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
