use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::{
    dictionary::{TermSourceMatchSource, TermSourceMatchType},
    errors::StoreError,
    translation::TermEnabledDictionaryMap,
};

/// A term row returned by the store. The engine treats it as read-only
/// input; `index` correlates the row with the bulk-request item it
/// answered.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TermEntry {
    pub index: usize,
    pub match_source: TermSourceMatchSource,
    pub expression: String,
    pub reading: String,
    pub definition_tags: Vec<String>,
    pub term_tags: Vec<String>,
    /// Part-of-speech rule names this entry conjugates under.
    pub rules: Vec<String>,
    pub glossary: Vec<String>,
    pub score: i64,
    pub dictionary: String,
    pub id: u64,
    /// Groups senses of the same headword; negative when absent.
    pub sequence: i64,
}

/// A tag row as stored, before expansion into a display tag.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRecord {
    pub name: String,
    pub category: String,
    pub order: i64,
    pub notes: String,
    pub score: i64,
    pub dictionary: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PitchAccent {
    pub position: u8,
    pub tags: Vec<String>,
}

/// Auxiliary term metadata payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TermMetaData {
    Frequency {
        value: i64,
        /// When present, the metadatum only applies to this reading.
        reading: Option<String>,
    },
    Pitch {
        reading: String,
        pitches: Vec<PitchAccent>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermMetaEntry {
    pub index: usize,
    pub expression: String,
    pub data: TermMetaData,
    pub dictionary: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KanjiEntry {
    pub index: usize,
    pub character: char,
    pub onyomi: Vec<String>,
    pub kunyomi: Vec<String>,
    pub tags: Vec<String>,
    pub meanings: Vec<String>,
    /// Stat name to raw value; names resolve through the tag table.
    pub stats: IndexMap<String, String>,
    pub dictionary: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KanjiMetaEntry {
    pub index: usize,
    pub character: char,
    pub frequency: i64,
    pub dictionary: String,
}

/// A positional exact-match request: expression and reading must both
/// match.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermExactRequest {
    pub term: String,
    pub reading: String,
}

/// The dictionary store the engine collaborates with.
///
/// All lookups are batched; every returned record carries the `index` of
/// the request item it answered. Implementations own all persistence,
/// timeout, and retry concerns. When the store's contents change (import,
/// deletion), the owner must call
/// [`Translator::clear_tag_caches`](crate::translator::Translator::clear_tag_caches).
pub trait DictionaryDatabase {
    /// Matches each term against expressions and readings of entries in the
    /// enabled dictionaries. `Prefix` and `Suffix` match on the expression
    /// only, via a range scan in indexed implementations.
    fn find_terms_bulk(
        &self,
        terms: &[String],
        enabled: &TermEnabledDictionaryMap,
        match_type: TermSourceMatchType,
    ) -> Result<Vec<TermEntry>, StoreError>;

    fn find_terms_exact_bulk(
        &self,
        items: &[TermExactRequest],
        dictionaries: &IndexSet<String>,
    ) -> Result<Vec<TermEntry>, StoreError>;

    fn find_terms_by_sequence_bulk(
        &self,
        sequences: &[i64],
        main_dictionary: &str,
    ) -> Result<Vec<TermEntry>, StoreError>;

    fn find_tag_for_title(
        &self,
        name: &str,
        dictionary: &str,
    ) -> Result<Option<TagRecord>, StoreError>;

    fn find_term_meta_bulk(
        &self,
        expressions: &[String],
        dictionaries: &IndexSet<String>,
    ) -> Result<Vec<TermMetaEntry>, StoreError>;

    fn find_kanji_bulk(
        &self,
        characters: &[char],
        dictionaries: &IndexSet<String>,
    ) -> Result<Vec<KanjiEntry>, StoreError>;

    fn find_kanji_meta_bulk(
        &self,
        characters: &[char],
        dictionaries: &IndexSet<String>,
    ) -> Result<Vec<KanjiMetaEntry>, StoreError>;
}

/// A term row as held by [`MemoryDictionaryDatabase`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TermRecord {
    pub expression: String,
    pub reading: String,
    pub definition_tags: Vec<String>,
    pub term_tags: Vec<String>,
    pub rules: Vec<String>,
    pub glossary: Vec<String>,
    pub score: i64,
    pub dictionary: String,
    pub id: u64,
    pub sequence: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TermMetaRecord {
    pub expression: String,
    pub data: TermMetaData,
    pub dictionary: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KanjiRecord {
    pub character: char,
    pub onyomi: Vec<String>,
    pub kunyomi: Vec<String>,
    pub tags: Vec<String>,
    pub meanings: Vec<String>,
    pub stats: IndexMap<String, String>,
    pub dictionary: String,
}

impl Default for KanjiRecord {
    fn default() -> Self {
        Self {
            character: '\u{3007}',
            onyomi: Vec::new(),
            kunyomi: Vec::new(),
            tags: Vec::new(),
            meanings: Vec::new(),
            stats: IndexMap::new(),
            dictionary: String::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KanjiMetaRecord {
    pub character: char,
    pub frequency: i64,
    pub dictionary: String,
}

/// An in-memory [`DictionaryDatabase`] over plain vectors.
///
/// Lookups are linear scans; this is the reference implementation used by
/// the test suite and suitable for embedding small dictionaries. Persistent
/// backends live outside this crate.
#[derive(Clone, Debug, Default)]
pub struct MemoryDictionaryDatabase {
    terms: Vec<TermRecord>,
    tags: Vec<TagRecord>,
    term_meta: Vec<TermMetaRecord>,
    kanji: Vec<KanjiRecord>,
    kanji_meta: Vec<KanjiMetaRecord>,
}

impl MemoryDictionaryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_term(&mut self, record: TermRecord) {
        self.terms.push(record);
    }

    pub fn add_tag(&mut self, record: TagRecord) {
        self.tags.push(record);
    }

    pub fn add_term_meta(&mut self, record: TermMetaRecord) {
        self.term_meta.push(record);
    }

    pub fn add_kanji(&mut self, record: KanjiRecord) {
        self.kanji.push(record);
    }

    pub fn add_kanji_meta(&mut self, record: KanjiMetaRecord) {
        self.kanji_meta.push(record);
    }

    fn term_entry(record: &TermRecord, index: usize, match_source: TermSourceMatchSource) -> TermEntry {
        TermEntry {
            index,
            match_source,
            expression: record.expression.clone(),
            reading: record.reading.clone(),
            definition_tags: record.definition_tags.clone(),
            term_tags: record.term_tags.clone(),
            rules: record.rules.clone(),
            glossary: record.glossary.clone(),
            score: record.score,
            dictionary: record.dictionary.clone(),
            id: record.id,
            sequence: record.sequence,
        }
    }
}

impl DictionaryDatabase for MemoryDictionaryDatabase {
    fn find_terms_bulk(
        &self,
        terms: &[String],
        enabled: &TermEnabledDictionaryMap,
        match_type: TermSourceMatchType,
    ) -> Result<Vec<TermEntry>, StoreError> {
        let mut results = Vec::new();
        for (index, term) in terms.iter().enumerate() {
            for record in &self.terms {
                if !enabled.contains_key(&record.dictionary) {
                    continue;
                }
                let matched = match match_type {
                    TermSourceMatchType::Exact => {
                        if record.expression == *term {
                            Some(TermSourceMatchSource::Term)
                        } else if record.reading == *term {
                            Some(TermSourceMatchSource::Reading)
                        } else {
                            None
                        }
                    }
                    TermSourceMatchType::Prefix => record
                        .expression
                        .starts_with(term.as_str())
                        .then_some(TermSourceMatchSource::Term),
                    TermSourceMatchType::Suffix => record
                        .expression
                        .ends_with(term.as_str())
                        .then_some(TermSourceMatchSource::Term),
                };
                if let Some(match_source) = matched {
                    results.push(Self::term_entry(record, index, match_source));
                }
            }
        }
        Ok(results)
    }

    fn find_terms_exact_bulk(
        &self,
        items: &[TermExactRequest],
        dictionaries: &IndexSet<String>,
    ) -> Result<Vec<TermEntry>, StoreError> {
        let mut results = Vec::new();
        for (index, item) in items.iter().enumerate() {
            for record in &self.terms {
                if dictionaries.contains(&record.dictionary)
                    && record.expression == item.term
                    && record.reading == item.reading
                {
                    results.push(Self::term_entry(record, index, TermSourceMatchSource::Term));
                }
            }
        }
        Ok(results)
    }

    fn find_terms_by_sequence_bulk(
        &self,
        sequences: &[i64],
        main_dictionary: &str,
    ) -> Result<Vec<TermEntry>, StoreError> {
        let mut results = Vec::new();
        for (index, &sequence) in sequences.iter().enumerate() {
            for record in &self.terms {
                if record.sequence == sequence && record.dictionary == main_dictionary {
                    results.push(Self::term_entry(
                        record,
                        index,
                        TermSourceMatchSource::Sequence,
                    ));
                }
            }
        }
        Ok(results)
    }

    fn find_tag_for_title(
        &self,
        name: &str,
        dictionary: &str,
    ) -> Result<Option<TagRecord>, StoreError> {
        Ok(self
            .tags
            .iter()
            .find(|tag| tag.name == name && tag.dictionary == dictionary)
            .cloned())
    }

    fn find_term_meta_bulk(
        &self,
        expressions: &[String],
        dictionaries: &IndexSet<String>,
    ) -> Result<Vec<TermMetaEntry>, StoreError> {
        let mut results = Vec::new();
        for (index, expression) in expressions.iter().enumerate() {
            for record in &self.term_meta {
                if record.expression == *expression && dictionaries.contains(&record.dictionary) {
                    results.push(TermMetaEntry {
                        index,
                        expression: record.expression.clone(),
                        data: record.data.clone(),
                        dictionary: record.dictionary.clone(),
                    });
                }
            }
        }
        Ok(results)
    }

    fn find_kanji_bulk(
        &self,
        characters: &[char],
        dictionaries: &IndexSet<String>,
    ) -> Result<Vec<KanjiEntry>, StoreError> {
        let mut results = Vec::new();
        for (index, &character) in characters.iter().enumerate() {
            for record in &self.kanji {
                if record.character == character && dictionaries.contains(&record.dictionary) {
                    results.push(KanjiEntry {
                        index,
                        character: record.character,
                        onyomi: record.onyomi.clone(),
                        kunyomi: record.kunyomi.clone(),
                        tags: record.tags.clone(),
                        meanings: record.meanings.clone(),
                        stats: record.stats.clone(),
                        dictionary: record.dictionary.clone(),
                    });
                }
            }
        }
        Ok(results)
    }

    fn find_kanji_meta_bulk(
        &self,
        characters: &[char],
        dictionaries: &IndexSet<String>,
    ) -> Result<Vec<KanjiMetaEntry>, StoreError> {
        let mut results = Vec::new();
        for (index, &character) in characters.iter().enumerate() {
            for record in &self.kanji_meta {
                if record.character == character && dictionaries.contains(&record.dictionary) {
                    results.push(KanjiMetaEntry {
                        index,
                        character: record.character,
                        frequency: record.frequency,
                        dictionary: record.dictionary.clone(),
                    });
                }
            }
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::translation::FindTermDictionary;

    fn store_with(records: Vec<TermRecord>) -> MemoryDictionaryDatabase {
        let mut db = MemoryDictionaryDatabase::new();
        for record in records {
            db.add_term(record);
        }
        db
    }

    fn enabled(names: &[&str]) -> TermEnabledDictionaryMap {
        names
            .iter()
            .enumerate()
            .map(|(index, name)| {
                (
                    name.to_string(),
                    FindTermDictionary {
                        index,
                        ..Default::default()
                    },
                )
            })
            .collect()
    }

    #[test]
    fn bulk_lookup_matches_expression_and_reading() {
        let db = store_with(vec![
            TermRecord {
                expression: "見る".into(),
                reading: "みる".into(),
                dictionary: "jmdict".into(),
                id: 1,
                ..Default::default()
            },
            TermRecord {
                expression: "観る".into(),
                reading: "みる".into(),
                dictionary: "disabled".into(),
                id: 2,
                ..Default::default()
            },
        ]);
        let entries = db
            .find_terms_bulk(
                &["みる".to_string()],
                &enabled(&["jmdict"]),
                TermSourceMatchType::Exact,
            )
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].expression, "見る");
        assert_eq!(entries[0].match_source, TermSourceMatchSource::Reading);
        assert_eq!(entries[0].index, 0);
    }

    #[test]
    fn prefix_lookup_scans_expressions() {
        let db = store_with(vec![
            TermRecord {
                expression: "食べ物".into(),
                dictionary: "jmdict".into(),
                id: 1,
                ..Default::default()
            },
            TermRecord {
                expression: "食べる".into(),
                dictionary: "jmdict".into(),
                id: 2,
                ..Default::default()
            },
        ]);
        let entries = db
            .find_terms_bulk(
                &["食べ".to_string()],
                &enabled(&["jmdict"]),
                TermSourceMatchType::Prefix,
            )
            .unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn sequence_lookup_restricted_to_main_dictionary() {
        let db = store_with(vec![
            TermRecord {
                expression: "打つ".into(),
                sequence: 7,
                dictionary: "main".into(),
                id: 1,
                ..Default::default()
            },
            TermRecord {
                expression: "撃つ".into(),
                sequence: 7,
                dictionary: "other".into(),
                id: 2,
                ..Default::default()
            },
        ]);
        let entries = db.find_terms_by_sequence_bulk(&[7], "main").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].match_source, TermSourceMatchSource::Sequence);
    }
}
