//! Safety Classifier
//!
//! Deterministic red-flag detection over inbound and outbound text. The
//! phrase tables are process-wide immutable configuration, built once at
//! startup and passed in explicitly so tests can substitute their own.
//!
//! The classifier is pure and infallible: identical input always yields an
//! identical [`SafetyVerdict`], and malformed or empty input classifies as
//! [`SafetyLevel::None`] rather than erroring, so a classifier problem can
//! never suppress emergency detection by raising.

use serde::{Deserialize, Serialize};

use crate::types::{SafetyLevel, SafetyVerdict};

/// One named category and its trigger phrases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyCategory {
    /// Stable category id (e.g. "cardiac").
    pub name: String,
    /// Trigger phrases, matched case-insensitively as substrings.
    pub phrases: Vec<String>,
}

impl SafetyCategory {
    pub fn new(name: impl Into<String>, phrases: &[&str]) -> Self {
        Self {
            name: name.into(),
            phrases: phrases.iter().map(|p| p.to_lowercase()).collect(),
        }
    }
}

/// Fixed mapping from emergency and caution categories to trigger phrases.
///
/// Emergency categories are always evaluated before the caution tier; a
/// match in both yields `Emergency`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyPhraseTable {
    pub emergency: Vec<SafetyCategory>,
    pub caution: Vec<SafetyCategory>,
}

impl Default for SafetyPhraseTable {
    fn default() -> Self {
        Self {
            emergency: vec![
                SafetyCategory::new("cardiac", &["chest pain", "heart attack", "crushing pressure in chest"]),
                SafetyCategory::new(
                    "respiratory",
                    &[
                        "shortness of breath",
                        "can't breathe",
                        "cannot breathe",
                        "not breathing",
                        "blue lips",
                    ],
                ),
                SafetyCategory::new(
                    "neurological",
                    &[
                        "stroke",
                        "seizure",
                        "loss of consciousness",
                        "severe headache",
                        "sudden weakness",
                        "confusion",
                        "face drooping",
                        "slurred speech",
                    ],
                ),
                SafetyCategory::new("self_harm", &["suicidal", "want to die", "kill myself"]),
                SafetyCategory::new(
                    "allergic_reaction",
                    &["anaphylaxis", "severe allergic", "throat swelling"],
                ),
                SafetyCategory::new("overdose", &["overdose", "took too many pills"]),
                SafetyCategory::new("bleeding", &["severe bleeding", "bleeding won't stop"]),
            ],
            caution: vec![
                SafetyCategory::new(
                    "persistent_symptoms",
                    &[
                        "for more than a week",
                        "getting worse",
                        "won't go away",
                        "keeps coming back",
                    ],
                ),
                SafetyCategory::new(
                    "medication",
                    &[
                        "drug interaction",
                        "medication interaction",
                        "mixing medications",
                        "double dose",
                    ],
                ),
            ],
        }
    }
}

/// Scans text against a frozen phrase table.
#[derive(Debug, Clone, Default)]
pub struct SafetyClassifier {
    table: SafetyPhraseTable,
}

impl SafetyClassifier {
    /// Classifier over the built-in phrase table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Classifier over a caller-supplied table (configuration or tests).
    pub fn with_table(table: SafetyPhraseTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &SafetyPhraseTable {
        &self.table
    }

    /// Scan `text` and return a structured verdict.
    ///
    /// Emergency categories win over caution categories regardless of match
    /// order within the text; the first matching category is reported and
    /// every matched phrase is recorded in table order.
    pub fn classify(&self, text: &str) -> SafetyVerdict {
        let lowered = text.to_lowercase();
        if lowered.trim().is_empty() {
            return SafetyVerdict::none();
        }

        if let Some(verdict) = Self::scan_tier(&self.table.emergency, &lowered, SafetyLevel::Emergency)
        {
            return verdict;
        }
        if let Some(verdict) = Self::scan_tier(&self.table.caution, &lowered, SafetyLevel::Caution) {
            return verdict;
        }
        SafetyVerdict::none()
    }

    fn scan_tier(
        categories: &[SafetyCategory],
        lowered: &str,
        level: SafetyLevel,
    ) -> Option<SafetyVerdict> {
        let mut matched_category: Option<String> = None;
        let mut matched_terms: Vec<String> = Vec::new();

        for category in categories {
            for phrase in &category.phrases {
                if lowered.contains(phrase.as_str()) {
                    if matched_category.is_none() {
                        matched_category = Some(category.name.clone());
                    }
                    matched_terms.push(phrase.clone());
                }
            }
        }

        matched_category.map(|category| SafetyVerdict {
            level,
            matched_category: Some(category),
            matched_terms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn benign_text_classifies_as_none() {
        let classifier = SafetyClassifier::new();
        let verdict = classifier.classify("what foods help with mild headaches");
        assert_eq!(verdict.level, SafetyLevel::None);
        assert!(verdict.matched_category.is_none());
        assert!(verdict.matched_terms.is_empty());
    }

    #[test]
    fn empty_and_whitespace_input_never_errors() {
        let classifier = SafetyClassifier::new();
        assert_eq!(classifier.classify("").level, SafetyLevel::None);
        assert_eq!(classifier.classify("   \n\t").level, SafetyLevel::None);
    }

    #[test]
    fn chest_pain_is_a_cardiac_emergency() {
        let classifier = SafetyClassifier::new();
        let verdict = classifier.classify("I have crushing chest pain and can't breathe");
        assert_eq!(verdict.level, SafetyLevel::Emergency);
        let category = verdict.matched_category.as_deref().unwrap();
        assert!(category == "cardiac" || category == "respiratory");
        assert!(verdict.matched_terms.contains(&"chest pain".to_string()));
        assert!(verdict.matched_terms.contains(&"can't breathe".to_string()));
    }

    #[test]
    fn every_core_red_flag_phrase_escalates_to_emergency() {
        // The baseline triage set; none of these may ever classify below
        // Emergency with the built-in table.
        let phrases = [
            "chest pain",
            "shortness of breath",
            "severe bleeding",
            "loss of consciousness",
            "stroke",
            "seizure",
            "suicidal",
            "overdose",
            "severe headache",
            "sudden weakness",
            "confusion",
            "blue lips",
            "not breathing",
            "severe allergic",
            "anaphylaxis",
        ];
        let classifier = SafetyClassifier::new();
        for phrase in phrases {
            let verdict = classifier.classify(&format!("my father has {phrase} and a fever"));
            assert_eq!(
                verdict.level,
                SafetyLevel::Emergency,
                "phrase '{phrase}' must escalate"
            );
        }
    }

    #[test]
    fn matching_is_case_insensitive() {
        let classifier = SafetyClassifier::new();
        let verdict = classifier.classify("SEVERE BLEEDING after a fall");
        assert_eq!(verdict.level, SafetyLevel::Emergency);
        assert_eq!(verdict.matched_category.as_deref(), Some("bleeding"));
    }

    #[test]
    fn emergency_wins_over_caution() {
        let classifier = SafetyClassifier::new();
        let verdict = classifier
            .classify("my cough is getting worse and now I have shortness of breath");
        assert_eq!(verdict.level, SafetyLevel::Emergency);
        assert_eq!(verdict.matched_category.as_deref(), Some("respiratory"));
    }

    #[test]
    fn caution_tier_matches_without_emergency() {
        let classifier = SafetyClassifier::new();
        let verdict = classifier.classify("this rash keeps coming back every month");
        assert_eq!(verdict.level, SafetyLevel::Caution);
        assert_eq!(
            verdict.matched_category.as_deref(),
            Some("persistent_symptoms")
        );
    }

    #[test]
    fn custom_table_replaces_builtin_phrases() {
        let table = SafetyPhraseTable {
            emergency: vec![SafetyCategory::new("test", &["trigger phrase"])],
            caution: vec![],
        };
        let classifier = SafetyClassifier::with_table(table);
        assert_eq!(
            classifier.classify("a trigger phrase appears").level,
            SafetyLevel::Emergency
        );
        // Built-in phrases are gone.
        assert_eq!(classifier.classify("chest pain").level, SafetyLevel::None);
    }

    proptest! {
        /// Identical input always yields an identical verdict.
        #[test]
        fn classification_is_deterministic(text in ".{0,200}") {
            let classifier = SafetyClassifier::new();
            let first = classifier.classify(&text);
            let second = classifier.classify(&text);
            prop_assert_eq!(first, second);
        }

        /// Any configured emergency phrase forces an emergency verdict,
        /// regardless of surrounding text.
        #[test]
        fn embedded_emergency_phrase_always_flags(
            prefix in "[a-z ]{0,40}",
            suffix in "[a-z ]{0,40}",
            category_idx in 0usize..7,
        ) {
            let classifier = SafetyClassifier::new();
            let category = &classifier.table().emergency[category_idx];
            let phrase = &category.phrases[0];
            let text = format!("{prefix} {phrase} {suffix}");
            prop_assert_eq!(classifier.classify(&text).level, SafetyLevel::Emergency);
        }
    }
}
