use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

pub use crate::language::ja::japanese::FuriganaSegment;

/// Which database field the source term was matched against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TermSourceMatchSource {
    Term,
    Reading,
    Sequence,
}

/// How the search term relates to the matched entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TermSourceMatchType {
    Exact,
    Prefix,
    Suffix,
}

/// Brief information about part of a dictionary entry, expanded from a bare
/// tag name via the store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// The full name the entry carried, including any `category:` prefix.
    pub name: String,
    pub category: String,
    pub notes: String,
    /// Sorting order declared by the dictionary; ties break on `name`.
    pub order: i64,
    pub score: i64,
    pub dictionary: String,
}

/// Corpus frequency of a term in one dictionary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermFrequency {
    pub expression: String,
    pub frequency: i64,
    pub dictionary: String,
}

/// Pitch accent information for one reading of a term.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermPitch {
    pub reading: String,
    pub pitches: Vec<PitchAccentInfo>,
    pub dictionary: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PitchAccentInfo {
    /// Mora index of the downstep, 0 for heiban.
    pub position: u8,
    pub tags: Vec<Tag>,
}

/// Coarse popularity label derived from the summed term-tag scores.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TermFrequencyLabel {
    Popular,
    Normal,
    Rare,
}

impl TermFrequencyLabel {
    pub fn from_score(score: i64) -> Self {
        match score {
            s if s > 0 => Self::Popular,
            s if s < 0 => Self::Rare,
            _ => Self::Normal,
        }
    }
}

/// A single dictionary match, flattened per deinflection candidate.
///
/// `source` is the matched substring of the transformed text, `raw_source`
/// the corresponding substring of the caller's original text, and `reasons`
/// the chain of inflections that was reversed to reach the entry,
/// most-recently-applied first.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TermDefinition {
    pub id: u64,
    pub source: String,
    pub raw_source: String,
    pub expression: String,
    pub reading: String,
    pub furigana_segments: Vec<FuriganaSegment>,
    pub reasons: Vec<String>,
    pub definition_tags: Vec<Tag>,
    pub term_tags: Vec<Tag>,
    pub glossary: Vec<String>,
    pub score: i64,
    pub sequence: i64,
    pub dictionary: String,
    pub dictionary_priority: i64,
    pub frequencies: Vec<TermFrequency>,
    pub pitches: Vec<TermPitch>,
}

/// Definitions sharing a `(source, expression, reasons, reading)` key,
/// with display fields taken from the most relevant member.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroupedDefinition {
    pub definitions: Vec<TermDefinition>,
    pub expression: String,
    pub reading: String,
    pub furigana_segments: Vec<FuriganaSegment>,
    pub reasons: Vec<String>,
    pub term_tags: Vec<Tag>,
    pub score: i64,
    pub source: String,
    pub raw_source: String,
    pub dictionary_priority: i64,
    pub frequencies: Vec<TermFrequency>,
    pub pitches: Vec<TermPitch>,
}

/// One headword variant of a merged result, with its own term tags and
/// metadata.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExpressionDetails {
    pub expression: String,
    pub reading: String,
    pub term_tags: Vec<Tag>,
    pub term_frequency: TermFrequencyLabel,
    pub frequencies: Vec<TermFrequency>,
    pub pitches: Vec<TermPitch>,
}

/// One glossary-deduplicated sense inside a merged result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GlossaryDefinition {
    pub dictionary: String,
    pub glossary: Vec<String>,
    pub definition_tags: Vec<Tag>,
    pub expression: IndexSet<String>,
    pub reading: IndexSet<String>,
    /// Expressions and readings this sense is restricted to: populated only
    /// when the sense's sets are strict subsets of the merged aggregate.
    pub only: Vec<String>,
    pub id: u64,
    pub score: i64,
}

/// Senses of one dictionary sequence (plus secondary-search matches),
/// merged across dictionaries.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MergedDefinition {
    pub expression: IndexSet<String>,
    pub reading: IndexSet<String>,
    pub expressions: Vec<ExpressionDetails>,
    pub definitions: Vec<GlossaryDefinition>,
    pub reasons: Vec<String>,
    pub score: i64,
    pub source: String,
    pub raw_source: String,
    pub dictionary_priority: i64,
}

/// A kanji statistic: a resolved tag paired with the entry's value for it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KanjiStat {
    pub name: String,
    pub category: String,
    pub notes: String,
    pub order: i64,
    pub score: i64,
    pub dictionary: String,
    pub value: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KanjiFrequency {
    pub character: char,
    pub frequency: i64,
    pub dictionary: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KanjiDefinition {
    pub character: char,
    pub onyomi: Vec<String>,
    pub kunyomi: Vec<String>,
    pub tags: Vec<Tag>,
    pub stats: IndexMap<String, Vec<KanjiStat>>,
    pub meanings: Vec<String>,
    pub frequencies: Vec<KanjiFrequency>,
    pub dictionary: String,
}
