//! Voice registry: immutable voice-id lookup.

use std::collections::HashMap;

use tts_core::{TtsError, TtsResult, Voice};

/// Registry of selectable voices.
///
/// Built once at startup from configuration and read-only afterwards, so
/// concurrent lookups need no synchronization. An unknown id is a normal
/// `None` outcome, not an error.
#[derive(Debug)]
pub struct VoiceRegistry {
    voices: Vec<Voice>,
    index: HashMap<String, usize>,
}

impl VoiceRegistry {
    /// Build a registry from a voice list, preserving order.
    ///
    /// Duplicate ids are a configuration error.
    pub fn new(voices: Vec<Voice>) -> TtsResult<Self> {
        let mut index = HashMap::with_capacity(voices.len());
        for (i, voice) in voices.iter().enumerate() {
            if index.insert(voice.id.clone(), i).is_some() {
                return Err(TtsError::config(format!(
                    "duplicate voice id '{}'",
                    voice.id
                )));
            }
        }
        Ok(Self { voices, index })
    }

    /// Look up a voice by id.
    pub fn resolve(&self, id: &str) -> Option<&Voice> {
        self.index.get(id).map(|&i| &self.voices[i])
    }

    /// All voices in registration order.
    pub fn list(&self) -> &[Voice] {
        &self.voices
    }

    /// Number of registered voices.
    pub fn len(&self) -> usize {
        self.voices.len()
    }

    /// Whether the registry has no voices.
    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tts_core::config::default_voices;

    #[test]
    fn test_resolve_known_voice() {
        let registry = VoiceRegistry::new(default_voices()).unwrap();
        let voice = registry.resolve("default").unwrap();
        assert_eq!(voice.display_name, "Default");
        assert_eq!(voice.sample_rate, 24000);
    }

    #[test]
    fn test_resolve_unknown_voice() {
        let registry = VoiceRegistry::new(default_voices()).unwrap();
        assert!(registry.resolve("does-not-exist").is_none());
    }

    #[test]
    fn test_list_preserves_order() {
        let registry = VoiceRegistry::new(default_voices()).unwrap();
        let ids: Vec<_> = registry.list().iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, ["default", "male", "female"]);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let voices = vec![
            Voice::new("twin", "Twin A", 24000),
            Voice::new("twin", "Twin B", 24000),
        ];
        assert!(matches!(
            VoiceRegistry::new(voices),
            Err(TtsError::Config(_))
        ));
    }

    #[test]
    fn test_empty_registry() {
        let registry = VoiceRegistry::new(Vec::new()).unwrap();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
    }
}
