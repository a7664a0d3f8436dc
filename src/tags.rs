use std::cmp::Ordering;

use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::{
    dictionary::{KanjiStat, Tag},
    dictionary_database::{DictionaryDatabase, TagRecord},
    errors::LookupError,
};

/// A provenance tag carrying the dictionary a definition came from.
pub(crate) fn build_dictionary_tag(dictionary: &str) -> Tag {
    Tag {
        name: dictionary.to_string(),
        category: "dictionary".to_string(),
        notes: String::new(),
        order: 100,
        score: 0,
        dictionary: dictionary.to_string(),
    }
}

/// Expands bare tag names into full tag records via the store, caching per
/// dictionary title.
///
/// Misses are cached as `None` so repeated unknown names cost one store
/// call. Population is idempotent, so concurrent lookups only need the
/// lock for the individual cache-slot reads and writes.
#[derive(Debug, Default)]
pub struct TagResolver {
    cache: RwLock<IndexMap<String, IndexMap<String, Option<TagRecord>>>>,
}

impl TagResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every cached record. Call when the store's contents change.
    pub fn invalidate(&self) {
        self.cache.write().clear();
    }

    /// Expands each name into a tag. Names may carry a `category:base`
    /// form; only the base resolves against the store, but the full name is
    /// preserved on the result. Unresolvable names degrade to a default
    /// tag, never an error.
    pub fn expand_tags<S: DictionaryDatabase>(
        &self,
        store: &S,
        names: &[String],
        dictionary: &str,
    ) -> Result<Vec<Tag>, LookupError> {
        names
            .iter()
            .map(|name| {
                let record = self.tag_record(store, name, dictionary)?;
                Ok(match record {
                    Some(record) => Tag {
                        name: name.clone(),
                        category: record.category,
                        notes: record.notes,
                        order: record.order,
                        score: record.score,
                        dictionary: dictionary.to_string(),
                    },
                    None => Tag {
                        name: name.clone(),
                        category: "default".to_string(),
                        notes: String::new(),
                        order: 0,
                        score: 0,
                        dictionary: dictionary.to_string(),
                    },
                })
            })
            .collect()
    }

    /// Resolves kanji statistics (`stat name -> value`) and groups them by
    /// the resolved tag's category. Names that do not resolve are dropped.
    /// Groups are sorted by the tag's `notes` interpreted numerically,
    /// ascending, which orders stroke-count-like statistics.
    pub fn expand_stats<S: DictionaryDatabase>(
        &self,
        store: &S,
        items: &IndexMap<String, String>,
        dictionary: &str,
    ) -> Result<IndexMap<String, Vec<KanjiStat>>, LookupError> {
        let mut stats: IndexMap<String, Vec<KanjiStat>> = IndexMap::new();
        for (name, value) in items {
            let Some(record) = self.tag_record(store, name, dictionary)? else {
                continue;
            };
            stats.entry(record.category.clone()).or_default().push(KanjiStat {
                name: name.clone(),
                category: record.category,
                notes: record.notes,
                order: record.order,
                score: record.score,
                dictionary: dictionary.to_string(),
                value: value.clone(),
            });
        }
        for group in stats.values_mut() {
            group.sort_by(|a, b| {
                numeric_notes(a)
                    .partial_cmp(&numeric_notes(b))
                    .unwrap_or(Ordering::Equal)
            });
        }
        Ok(stats)
    }

    fn tag_record<S: DictionaryDatabase>(
        &self,
        store: &S,
        name: &str,
        dictionary: &str,
    ) -> Result<Option<TagRecord>, LookupError> {
        let base = name_base(name);
        if let Some(cached) = self
            .cache
            .read()
            .get(dictionary)
            .and_then(|slots| slots.get(base))
        {
            return Ok(cached.clone());
        }
        let record = store.find_tag_for_title(base, dictionary)?;
        self.cache
            .write()
            .entry(dictionary.to_string())
            .or_default()
            .insert(base.to_string(), record.clone());
        Ok(record)
    }
}

/// The portion of a tag name before the first `:`.
fn name_base(name: &str) -> &str {
    match name.find(':') {
        Some(position) => &name[..position],
        None => name,
    }
}

fn numeric_notes(stat: &KanjiStat) -> f64 {
    stat.notes.trim().parse().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

    use indexmap::{IndexMap, IndexSet};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        dictionary::TermSourceMatchType,
        dictionary_database::{
            KanjiEntry, KanjiMetaEntry, MemoryDictionaryDatabase, TermEntry, TermExactRequest,
            TermMetaEntry,
        },
        errors::StoreError,
        translation::TermEnabledDictionaryMap,
    };

    /// Wraps a store and counts tag lookups.
    struct CountingStore {
        inner: MemoryDictionaryDatabase,
        tag_calls: AtomicUsize,
    }

    impl CountingStore {
        fn new(inner: MemoryDictionaryDatabase) -> Self {
            Self {
                inner,
                tag_calls: AtomicUsize::new(0),
            }
        }
    }

    impl DictionaryDatabase for CountingStore {
        fn find_terms_bulk(
            &self,
            terms: &[String],
            enabled: &TermEnabledDictionaryMap,
            match_type: TermSourceMatchType,
        ) -> Result<Vec<TermEntry>, StoreError> {
            self.inner.find_terms_bulk(terms, enabled, match_type)
        }

        fn find_terms_exact_bulk(
            &self,
            items: &[TermExactRequest],
            dictionaries: &IndexSet<String>,
        ) -> Result<Vec<TermEntry>, StoreError> {
            self.inner.find_terms_exact_bulk(items, dictionaries)
        }

        fn find_terms_by_sequence_bulk(
            &self,
            sequences: &[i64],
            main_dictionary: &str,
        ) -> Result<Vec<TermEntry>, StoreError> {
            self.inner
                .find_terms_by_sequence_bulk(sequences, main_dictionary)
        }

        fn find_tag_for_title(
            &self,
            name: &str,
            dictionary: &str,
        ) -> Result<Option<TagRecord>, StoreError> {
            self.tag_calls.fetch_add(1, AtomicOrdering::SeqCst);
            self.inner.find_tag_for_title(name, dictionary)
        }

        fn find_term_meta_bulk(
            &self,
            expressions: &[String],
            dictionaries: &IndexSet<String>,
        ) -> Result<Vec<TermMetaEntry>, StoreError> {
            self.inner.find_term_meta_bulk(expressions, dictionaries)
        }

        fn find_kanji_bulk(
            &self,
            characters: &[char],
            dictionaries: &IndexSet<String>,
        ) -> Result<Vec<KanjiEntry>, StoreError> {
            self.inner.find_kanji_bulk(characters, dictionaries)
        }

        fn find_kanji_meta_bulk(
            &self,
            characters: &[char],
            dictionaries: &IndexSet<String>,
        ) -> Result<Vec<KanjiMetaEntry>, StoreError> {
            self.inner.find_kanji_meta_bulk(characters, dictionaries)
        }
    }

    fn store_with_tags() -> CountingStore {
        let mut db = MemoryDictionaryDatabase::new();
        db.add_tag(TagRecord {
            name: "n".to_string(),
            category: "partOfSpeech".to_string(),
            order: 2,
            notes: "noun".to_string(),
            score: 0,
            dictionary: "jmdict".to_string(),
        });
        db.add_tag(TagRecord {
            name: "P".to_string(),
            category: "popular".to_string(),
            order: 1,
            notes: "popular term".to_string(),
            score: 10,
            dictionary: "jmdict".to_string(),
        });
        CountingStore::new(db)
    }

    #[test]
    fn expands_and_caches_tags() {
        let store = store_with_tags();
        let resolver = TagResolver::new();
        let names = vec!["n".to_string(), "P".to_string(), "n".to_string()];
        let tags = resolver.expand_tags(&store, &names, "jmdict").unwrap();
        assert_eq!(tags.len(), 3);
        assert_eq!(tags[0].category, "partOfSpeech");
        assert_eq!(tags[1].score, 10);
        // Third expansion of "n" hit the cache
        assert_eq!(store.tag_calls.load(AtomicOrdering::SeqCst), 2);

        resolver.expand_tags(&store, &names, "jmdict").unwrap();
        assert_eq!(store.tag_calls.load(AtomicOrdering::SeqCst), 2);

        resolver.invalidate();
        resolver.expand_tags(&store, &names, "jmdict").unwrap();
        assert_eq!(store.tag_calls.load(AtomicOrdering::SeqCst), 4);
    }

    #[test]
    fn category_prefix_resolves_base_but_keeps_name() {
        let store = store_with_tags();
        let resolver = TagResolver::new();
        let tags = resolver
            .expand_tags(&store, &["name:n".to_string()], "jmdict")
            .unwrap();
        assert_eq!(tags[0].name, "name:n");
        assert_eq!(tags[0].category, "partOfSpeech");
    }

    #[test]
    fn unknown_names_degrade_to_default_and_cache_the_miss() {
        let store = store_with_tags();
        let resolver = TagResolver::new();
        let names = vec!["mystery".to_string(), "mystery".to_string()];
        let tags = resolver.expand_tags(&store, &names, "jmdict").unwrap();
        assert_eq!(tags[0].category, "default");
        assert_eq!(tags[0].order, 0);
        assert_eq!(store.tag_calls.load(AtomicOrdering::SeqCst), 1);
    }

    #[test]
    fn stats_group_by_category_and_sort_numerically() {
        let mut db = MemoryDictionaryDatabase::new();
        for (name, notes) in [("strokes", "12"), ("grade", "3"), ("heisig", "not-a-number")] {
            db.add_tag(TagRecord {
                name: name.to_string(),
                category: "misc".to_string(),
                order: 0,
                notes: notes.to_string(),
                score: 0,
                dictionary: "kanjidic".to_string(),
            });
        }
        let resolver = TagResolver::new();
        let mut items = IndexMap::new();
        items.insert("strokes".to_string(), "12".to_string());
        items.insert("grade".to_string(), "3".to_string());
        items.insert("heisig".to_string(), "77".to_string());
        items.insert("unknown".to_string(), "x".to_string());
        let stats = resolver.expand_stats(&db, &items, "kanjidic").unwrap();
        assert_eq!(stats.len(), 1);
        let misc = &stats["misc"];
        assert_eq!(misc.len(), 3);
        // non-numeric notes sort as 0, ahead of 3 and 12
        assert_eq!(misc[0].name, "heisig");
        assert_eq!(misc[1].name, "grade");
        assert_eq!(misc[2].name, "strokes");
        assert_eq!(misc[2].value, "12");
    }
}
