use std::ops::{BitOr, BitOrAssign};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::dictionary_database::TermEntry;

/// Part-of-speech categories a term or rule is compatible with, encoded as
/// disjoint bit flags. This is a closed set: new grammatical categories
/// require a coordinated reasons-table update.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuleFlags(u32);

impl RuleFlags {
    /// No constraint; matches anything.
    pub const NONE: RuleFlags = RuleFlags(0);
    /// Ichidan verbs.
    pub const V1: RuleFlags = RuleFlags(0b0000_0001);
    /// Godan verbs.
    pub const V5: RuleFlags = RuleFlags(0b0000_0010);
    /// Suru verbs.
    pub const VS: RuleFlags = RuleFlags(0b0000_0100);
    /// Kuru verbs.
    pub const VK: RuleFlags = RuleFlags(0b0000_1000);
    /// I-adjectives.
    pub const ADJ_I: RuleFlags = RuleFlags(0b0001_0000);
    /// Intermediate -iru form produced by progressive contractions.
    pub const IRU: RuleFlags = RuleFlags(0b0010_0000);

    /// Unknown names map to `None` and are ignored by callers, so older
    /// tables keep working against newer rule sets.
    pub fn from_name(name: &str) -> Option<RuleFlags> {
        match name {
            "v1" => Some(Self::V1),
            "v5" => Some(Self::V5),
            "vs" => Some(Self::VS),
            "vk" => Some(Self::VK),
            "adj-i" => Some(Self::ADJ_I),
            "iru" => Some(Self::IRU),
            _ => None,
        }
    }

    pub fn from_names<S: AsRef<str>>(names: &[S]) -> RuleFlags {
        names
            .iter()
            .filter_map(|name| Self::from_name(name.as_ref()))
            .fold(Self::NONE, BitOr::bitor)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn intersects(self, other: RuleFlags) -> bool {
        self.0 & other.0 != 0
    }

    /// Whether a candidate carrying this mask accepts `other`. An empty
    /// mask is the unmodified input and accepts everything.
    pub fn accepts(self, other: RuleFlags) -> bool {
        self.is_empty() || self.intersects(other)
    }
}

impl BitOr for RuleFlags {
    type Output = RuleFlags;

    fn bitor(self, rhs: RuleFlags) -> RuleFlags {
        RuleFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for RuleFlags {
    fn bitor_assign(&mut self, rhs: RuleFlags) {
        self.0 |= rhs.0;
    }
}

/// One substitution variant of a reason, as authored: an inflected ending,
/// the base ending that replaces it, and the named rule sets it applies
/// between.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReasonVariant {
    pub kana_in: String,
    pub kana_out: String,
    pub rules_in: Vec<String>,
    pub rules_out: Vec<String>,
}

/// Reason name (grammatical inflection) to its substitution variants.
pub type ReasonsTable = IndexMap<String, Vec<ReasonVariant>>;

#[derive(Clone, Debug)]
struct NormalizedVariant {
    kana_in: String,
    kana_out: String,
    rules_in: RuleFlags,
    rules_out: RuleFlags,
}

/// A base-form candidate produced by reversing inflections.
///
/// `database_entries` starts empty and is populated by the orchestrator
/// once store lookups return; everything else is fixed at creation.
#[derive(Clone, Debug, PartialEq)]
pub struct Deinflection {
    /// The transformed text the candidate was derived from.
    pub source: String,
    /// The original-text substring behind `source`.
    pub raw_source: String,
    /// The candidate base form to look up.
    pub term: String,
    /// Rule constraint carried forward from the last applied variant.
    pub rules: RuleFlags,
    /// Reasons applied to reach this candidate, most recent first.
    pub reasons: Vec<String>,
    pub database_entries: Vec<TermEntry>,
}

impl Deinflection {
    fn new(
        source: &str,
        raw_source: &str,
        term: String,
        rules: RuleFlags,
        reasons: Vec<String>,
    ) -> Self {
        Self {
            source: source.to_string(),
            raw_source: raw_source.to_string(),
            term,
            rules,
            reasons,
            database_entries: Vec::new(),
        }
    }
}

/// Reverses productive inflectional morphology by repeatedly stripping
/// known endings.
#[derive(Clone, Debug)]
pub struct Deinflector {
    reasons: Vec<(String, Vec<NormalizedVariant>)>,
}

impl Deinflector {
    pub fn new(table: &ReasonsTable) -> Self {
        let reasons = table
            .iter()
            .map(|(reason, variants)| {
                let normalized = variants
                    .iter()
                    .map(|v| NormalizedVariant {
                        kana_in: v.kana_in.clone(),
                        kana_out: v.kana_out.clone(),
                        rules_in: RuleFlags::from_names(&v.rules_in),
                        rules_out: RuleFlags::from_names(&v.rules_out),
                    })
                    .collect();
                (reason.clone(), normalized)
            })
            .collect();
        Self { reasons }
    }

    /// Computes the deinflection closure of `source`.
    ///
    /// The result vector doubles as the work queue: candidates are consumed
    /// by index while new ones are appended, so iteration reaches a
    /// fixpoint exactly when a pass adds nothing. The first candidate is
    /// always the untouched input with an empty mask.
    pub fn deinflect(&self, source: &str, raw_source: &str) -> Vec<Deinflection> {
        let mut results = vec![Deinflection::new(
            source,
            raw_source,
            source.to_string(),
            RuleFlags::NONE,
            Vec::new(),
        )];
        let mut index = 0;
        while index < results.len() {
            let (term, rules, reasons) = {
                let candidate = &results[index];
                (
                    candidate.term.clone(),
                    candidate.rules,
                    candidate.reasons.clone(),
                )
            };
            for (reason, variants) in &self.reasons {
                for variant in variants {
                    if !rules.accepts(variant.rules_in)
                        || !term.ends_with(variant.kana_in.as_str())
                    {
                        continue;
                    }
                    let stem_len = term.len() - variant.kana_in.len();
                    if stem_len + variant.kana_out.len() == 0 {
                        continue;
                    }
                    let mut next_term = String::with_capacity(stem_len + variant.kana_out.len());
                    next_term.push_str(&term[..stem_len]);
                    next_term.push_str(&variant.kana_out);
                    let mut chain = Vec::with_capacity(reasons.len() + 1);
                    chain.push(reason.clone());
                    chain.extend_from_slice(&reasons);
                    results.push(Deinflection::new(
                        source,
                        raw_source,
                        next_term,
                        variant.rules_out,
                        chain,
                    ));
                }
            }
            index += 1;
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    use super::*;

    fn variant(
        kana_in: &str,
        kana_out: &str,
        rules_in: &[&str],
        rules_out: &[&str],
    ) -> ReasonVariant {
        ReasonVariant {
            kana_in: kana_in.to_string(),
            kana_out: kana_out.to_string(),
            rules_in: rules_in.iter().map(|s| s.to_string()).collect(),
            rules_out: rules_out.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn past_table() -> ReasonsTable {
        let mut table = ReasonsTable::new();
        table.insert(
            "past".to_string(),
            vec![variant("た", "る", &["v1"], &["v1"])],
        );
        table
    }

    #[test]
    fn rule_flags_compatibility() {
        assert!(RuleFlags::NONE.accepts(RuleFlags::V5));
        assert!(RuleFlags::V1.accepts(RuleFlags::V1 | RuleFlags::V5));
        assert!(!RuleFlags::V1.accepts(RuleFlags::V5));
        assert_eq!(RuleFlags::from_names(&["v1", "bogus"]), RuleFlags::V1);
    }

    #[test]
    fn deinflects_past_form() {
        let deinflector = Deinflector::new(&past_table());
        let results = deinflector.deinflect("見た", "見た");
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].term, "見た");
        assert_eq!(results[0].rules, RuleFlags::NONE);
        assert!(results[0].reasons.is_empty());
        assert_eq!(results[1].term, "見る");
        assert_eq!(results[1].rules, RuleFlags::V1);
        assert_eq!(results[1].reasons, vec!["past".to_string()]);
    }

    #[test]
    fn incompatible_mask_blocks_chaining() {
        let mut table = past_table();
        table.insert(
            "passive".to_string(),
            vec![variant("られる", "る", &["v1"], &["v1"])],
        );
        let deinflector = Deinflector::new(&table);
        // 見られた: past strips た→る giving 見られる (v1), then the
        // passive rule applies because v1 ∩ v1 ≠ ∅.
        let results = deinflector.deinflect("見られた", "見られた");
        let terms: Vec<&str> = results.iter().map(|r| r.term.as_str()).collect();
        assert_eq!(terms, vec!["見られた", "見られる", "見る"]);
        assert_eq!(
            results[2].reasons,
            vec!["passive".to_string(), "past".to_string()]
        );
    }

    #[test]
    fn empty_result_terms_are_skipped() {
        let mut table = ReasonsTable::new();
        table.insert("strip".to_string(), vec![variant("た", "", &[], &["v5"])]);
        let deinflector = Deinflector::new(&table);
        let results = deinflector.deinflect("た", "た");
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn multiple_variants_yield_multiple_candidates() {
        let mut table = ReasonsTable::new();
        table.insert(
            "past".to_string(),
            vec![
                variant("った", "う", &[], &["v5"]),
                variant("った", "つ", &[], &["v5"]),
                variant("った", "る", &[], &["v5"]),
            ],
        );
        let deinflector = Deinflector::new(&table);
        let results = deinflector.deinflect("言った", "言った");
        let terms: Vec<&str> = results.iter().map(|r| r.term.as_str()).collect();
        assert_eq!(terms, vec!["言った", "言う", "言つ", "言る"]);
    }

    #[test]
    fn reasons_table_deserializes_camel_case() {
        let json = r#"{"past": [{"kanaIn": "た", "kanaOut": "る", "rulesIn": ["v1"], "rulesOut": ["v1"]}]}"#;
        let table: ReasonsTable = serde_json::from_str(json).unwrap();
        assert_eq!(table["past"][0].kana_in, "た");
        assert_eq!(table["past"][0].rules_out, vec!["v1".to_string()]);
    }

    proptest! {
        /// With no length-increasing variants the closure terminates and
        /// never grows a candidate beyond its input.
        #[test]
        fn closure_terminates_and_shrinks(input in "[あ-ん]{1,6}") {
            let mut table = ReasonsTable::new();
            table.insert(
                "a".to_string(),
                vec![
                    variant("た", "る", &[], &["v1"]),
                    variant("った", "う", &[], &["v5"]),
                    variant("ない", "る", &[], &["v1"]),
                ],
            );
            table.insert(
                "b".to_string(),
                vec![variant("る", "た", &["v1"], &["v1"])],
            );
            let deinflector = Deinflector::new(&table);
            let results = deinflector.deinflect(&input, &input);
            // Bounded: candidate count below the worst-case closure size
            prop_assert!(results.len() <= 4096);
            for candidate in &results {
                prop_assert!(!candidate.term.is_empty());
                prop_assert!(candidate.term.chars().count() <= input.chars().count());
            }
        }
    }
}
