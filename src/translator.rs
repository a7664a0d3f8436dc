use std::{cmp::Ordering, sync::LazyLock};

use fancy_regex::Regex;
use icu::{
    collator::{options::CollatorOptions, Collator, CollatorBorrowed},
    locale::locale,
};
use indexmap::{map::Entry, IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use tracing::{debug, debug_span};

use crate::{
    deinflector::{Deinflection, Deinflector, ReasonsTable, RuleFlags},
    dictionary::{
        ExpressionDetails, GlossaryDefinition, GroupedDefinition, KanjiDefinition, KanjiFrequency,
        MergedDefinition, Tag, TermDefinition, TermFrequency, TermFrequencyLabel, TermPitch,
        TermSourceMatchType, PitchAccentInfo,
    },
    dictionary_database::{DictionaryDatabase, TermEntry, TermExactRequest, TermMetaData},
    errors::LookupError,
    language::ja::japanese::{distribute_furigana, japanese_only_prefix},
    reasons::japanese_reasons,
    tags::{build_dictionary_tag, TagResolver},
    text_variants::{expand_text_variants, TextVariant},
    translation::{
        FindKanjiOptions, FindTermsDetails, FindTermsMode, FindTermsOptions, FindTermsWildcard,
        SearchResolution, TermEnabledDictionaryMap,
    },
    translation_internal::{MergedDefinitionBuilder, RelevanceKey, SortKey},
};

static NEXT_SUBSTRING_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^\p{L}][\p{L}\p{N}]*$").expect("invalid next-substring pattern")
});

/// Term lookup results, shaped by the requested mode.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum TermSearchResults {
    Simple(Vec<TermDefinition>),
    Split(Vec<TermDefinition>),
    Grouped(Vec<GroupedDefinition>),
    Merged(Vec<MergedDefinition>),
}

impl TermSearchResults {
    fn empty(mode: FindTermsMode) -> Self {
        match mode {
            FindTermsMode::Simple => Self::Simple(Vec::new()),
            FindTermsMode::Split => Self::Split(Vec::new()),
            FindTermsMode::Group => Self::Grouped(Vec::new()),
            FindTermsMode::Merge => Self::Merged(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Simple(items) | Self::Split(items) => items.len(),
            Self::Grouped(items) => items.len(),
            Self::Merged(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FindTermsResult {
    pub results: TermSearchResults,
    /// Characters of the input consumed by the longest surviving match,
    /// 0 when nothing matched.
    pub original_text_length: usize,
}

/// Finds term and kanji dictionary entries for text.
///
/// The engine is stateless per call apart from the deinflection rule table
/// (loaded once, immutable) and the tag cache, which persists across calls
/// until [`clear_tag_caches`](Translator::clear_tag_caches) is invoked.
pub struct Translator<S> {
    db: S,
    deinflector: Deinflector,
    tag_resolver: TagResolver,
    /// Invariant locale, matching comparisons across platforms.
    string_comparer: CollatorBorrowed<'static>,
}

impl<S: DictionaryDatabase> Translator<S> {
    /// Creates a translator over `db` with the built-in Japanese reasons
    /// table.
    pub fn new(db: S) -> Self {
        Self::with_reasons(db, &japanese_reasons())
    }

    pub fn with_reasons(db: S, table: &ReasonsTable) -> Self {
        Self {
            db,
            deinflector: Deinflector::new(table),
            tag_resolver: TagResolver::new(),
            string_comparer: Collator::try_new(locale!("en-US").into(), CollatorOptions::default())
                .expect("en-US collator data is compiled in"),
        }
    }

    /// Clears the tag cache. Call when the store's contents change.
    pub fn clear_tag_caches(&self) {
        self.tag_resolver.invalidate();
    }

    /// Finds term definitions for `text`, shaping the output per `mode`.
    ///
    /// An empty input short-circuits to an empty result without touching
    /// the store. Store failures in any phase fail the whole call.
    pub fn find_terms(
        &self,
        mode: FindTermsMode,
        text: &str,
        details: &FindTermsDetails,
        options: &FindTermsOptions,
    ) -> Result<FindTermsResult, LookupError> {
        let span = debug_span!("find_terms", ?mode);
        let _enter = span.enter();

        let text = if options.remove_non_japanese_characters {
            japanese_only_prefix(text)
        } else {
            text
        };
        if text.is_empty() {
            return Ok(FindTermsResult {
                results: TermSearchResults::empty(mode),
                original_text_length: 0,
            });
        }

        let deinflections = match details.wildcard {
            Some(wildcard) => self.find_terms_wildcard(text, options, wildcard)?,
            None => self.find_term_deinflections(text, options)?,
        };
        debug!(candidates = deinflections.len(), "deinflections with matches");

        let mut definitions = self.create_definitions(&deinflections, options)?;
        let original_text_length = definitions
            .iter()
            .map(|definition| definition.raw_source.chars().count())
            .max()
            .unwrap_or(0);
        self.sort_by_relevance(&mut definitions);

        let titles = enabled_titles(&options.enabled_dictionary_map);
        let results = match mode {
            FindTermsMode::Simple => TermSearchResults::Simple(definitions),
            FindTermsMode::Split => {
                self.add_definition_meta(&mut definitions, &titles)?;
                TermSearchResults::Split(definitions)
            }
            FindTermsMode::Group => {
                let mut groups = self.group_definitions(definitions);
                if options.compact_tags {
                    for group in &mut groups {
                        self.compress_definition_tags(&mut group.definitions);
                    }
                }
                self.add_group_meta(&mut groups, &titles)?;
                TermSearchResults::Grouped(groups)
            }
            FindTermsMode::Merge => {
                TermSearchResults::Merged(self.merge_definitions(text, definitions, options)?)
            }
        };
        Ok(FindTermsResult {
            results,
            original_text_length,
        })
    }

    /// String-keyed variant of [`find_terms`](Translator::find_terms) for
    /// user-controlled configuration; unrecognized mode names yield an
    /// empty result instead of an error.
    pub fn find_terms_by_mode_name(
        &self,
        mode_name: &str,
        text: &str,
        details: &FindTermsDetails,
        options: &FindTermsOptions,
    ) -> Result<FindTermsResult, LookupError> {
        match FindTermsMode::from_name(mode_name) {
            Some(mode) => self.find_terms(mode, text, details, options),
            None => {
                debug!(mode = mode_name, "unrecognized find-terms mode");
                Ok(FindTermsResult {
                    results: TermSearchResults::Simple(Vec::new()),
                    original_text_length: 0,
                })
            }
        }
    }

    /// Finds kanji definitions for every unique character of `text`.
    pub fn find_kanji(
        &self,
        text: &str,
        options: &FindKanjiOptions,
    ) -> Result<Vec<KanjiDefinition>, LookupError> {
        let span = debug_span!("find_kanji");
        let _enter = span.enter();

        let titles: IndexSet<String> = options.enabled_dictionary_map.keys().cloned().collect();
        let unique: IndexSet<char> = text.chars().collect();
        let characters: Vec<char> = unique.into_iter().collect();
        if characters.is_empty() {
            return Ok(Vec::new());
        }

        let mut entries = self.db.find_kanji_bulk(&characters, &titles)?;
        entries.sort_by_key(|entry| entry.index);

        let metas = self.db.find_kanji_meta_bulk(&characters, &titles)?;
        let mut frequencies_by_index: IndexMap<usize, Vec<KanjiFrequency>> = IndexMap::new();
        for meta in metas {
            frequencies_by_index
                .entry(meta.index)
                .or_default()
                .push(KanjiFrequency {
                    character: meta.character,
                    frequency: meta.frequency,
                    dictionary: meta.dictionary,
                });
        }

        let mut definitions = Vec::new();
        for entry in entries {
            let mut tags = self
                .tag_resolver
                .expand_tags(&self.db, &entry.tags, &entry.dictionary)?;
            tags.push(build_dictionary_tag(&entry.dictionary));
            self.sort_tags(&mut tags);
            let stats = self
                .tag_resolver
                .expand_stats(&self.db, &entry.stats, &entry.dictionary)?;
            let frequencies = frequencies_by_index
                .get(&entry.index)
                .cloned()
                .unwrap_or_default();
            definitions.push(KanjiDefinition {
                character: entry.character,
                onyomi: entry.onyomi,
                kunyomi: entry.kunyomi,
                tags,
                stats,
                meanings: entry.meanings,
                frequencies,
                dictionary: entry.dictionary,
            });
        }
        Ok(definitions)
    }

    fn find_terms_wildcard(
        &self,
        text: &str,
        options: &FindTermsOptions,
        wildcard: FindTermsWildcard,
    ) -> Result<Vec<Deinflection>, LookupError> {
        let match_type = match wildcard {
            FindTermsWildcard::Prefix => TermSourceMatchType::Prefix,
            FindTermsWildcard::Suffix => TermSourceMatchType::Suffix,
        };
        // Wildcard hits skip the part-of-speech filter entirely.
        let database_entries = self.db.find_terms_bulk(
            &[text.to_string()],
            &options.enabled_dictionary_map,
            match_type,
        )?;
        Ok(vec![Deinflection {
            source: text.to_string(),
            raw_source: text.to_string(),
            term: text.to_string(),
            rules: RuleFlags::NONE,
            reasons: Vec::new(),
            database_entries,
        }])
    }

    fn find_term_deinflections(
        &self,
        text: &str,
        options: &FindTermsOptions,
    ) -> Result<Vec<Deinflection>, LookupError> {
        let variants = expand_text_variants(text, &options.text_conversions);
        let mut deinflections = Vec::new();
        let mut used: IndexSet<String> = IndexSet::new();
        for TextVariant {
            text: variant_text,
            source_map,
        } in &variants
        {
            let chars: Vec<char> = variant_text.chars().collect();
            let mut length = chars.len();
            while length > 0 {
                let prefix: String = chars[..length].iter().collect();
                if !used.insert(prefix.clone()) {
                    // Shorter prefixes of an already-seen string were
                    // handled when it was first seen.
                    break;
                }
                let raw_source = source_map.source_substring(length);
                deinflections.extend(self.deinflector.deinflect(&prefix, &raw_source));
                length = next_prefix_length(options.search_resolution, &prefix, length);
            }
        }
        self.add_entries_to_deinflections(&mut deinflections, options)?;
        deinflections.retain(|deinflection| !deinflection.database_entries.is_empty());
        Ok(deinflections)
    }

    /// Issues one batched lookup over the unique candidate terms and
    /// distributes the entries back onto compatible candidates. An entry is
    /// accepted only when its part-of-speech rules share a bit with the
    /// candidate's mask; mask 0 accepts everything.
    fn add_entries_to_deinflections(
        &self,
        deinflections: &mut [Deinflection],
        options: &FindTermsOptions,
    ) -> Result<(), LookupError> {
        if deinflections.is_empty() {
            return Ok(());
        }
        let mut unique_terms: IndexMap<String, Vec<usize>> = IndexMap::new();
        for (index, deinflection) in deinflections.iter().enumerate() {
            unique_terms
                .entry(deinflection.term.clone())
                .or_default()
                .push(index);
        }
        let terms: Vec<String> = unique_terms.keys().cloned().collect();
        let entries = self.db.find_terms_bulk(
            &terms,
            &options.enabled_dictionary_map,
            TermSourceMatchType::Exact,
        )?;
        debug!(
            unique_terms = terms.len(),
            entries = entries.len(),
            "bulk term lookup"
        );
        for entry in entries {
            let entry_flags = RuleFlags::from_names(&entry.rules);
            let Some((_, candidate_indices)) = unique_terms.get_index(entry.index) else {
                continue;
            };
            for &index in candidate_indices {
                if deinflections[index].rules.accepts(entry_flags) {
                    deinflections[index].database_entries.push(entry.clone());
                }
            }
        }
        Ok(())
    }

    /// Flattens accepted matches into definition records, deduplicating by
    /// id; on duplicate ids the variant with the longer matched expression
    /// survives.
    fn create_definitions(
        &self,
        deinflections: &[Deinflection],
        options: &FindTermsOptions,
    ) -> Result<Vec<TermDefinition>, LookupError> {
        let mut unduped: IndexMap<u64, TermDefinition> = IndexMap::new();
        for deinflection in deinflections {
            for entry in &deinflection.database_entries {
                let definition = self.create_definition(
                    entry,
                    &deinflection.source,
                    &deinflection.raw_source,
                    &deinflection.reasons,
                    options,
                )?;
                match unduped.entry(definition.id) {
                    Entry::Occupied(mut existing) => {
                        if definition.expression.chars().count()
                            > existing.get().expression.chars().count()
                        {
                            existing.insert(definition);
                        }
                    }
                    Entry::Vacant(slot) => {
                        slot.insert(definition);
                    }
                }
            }
        }
        Ok(unduped.into_values().collect())
    }

    fn create_definition(
        &self,
        entry: &TermEntry,
        source: &str,
        raw_source: &str,
        reasons: &[String],
        options: &FindTermsOptions,
    ) -> Result<TermDefinition, LookupError> {
        let mut definition_tags =
            self.tag_resolver
                .expand_tags(&self.db, &entry.definition_tags, &entry.dictionary)?;
        definition_tags.push(build_dictionary_tag(&entry.dictionary));
        self.sort_tags(&mut definition_tags);
        let mut term_tags =
            self.tag_resolver
                .expand_tags(&self.db, &entry.term_tags, &entry.dictionary)?;
        self.sort_tags(&mut term_tags);
        let dictionary_priority = options
            .enabled_dictionary_map
            .get(&entry.dictionary)
            .map(|dictionary| dictionary.priority)
            .unwrap_or(0);
        Ok(TermDefinition {
            id: entry.id,
            source: source.to_string(),
            raw_source: raw_source.to_string(),
            expression: entry.expression.clone(),
            reading: entry.reading.clone(),
            furigana_segments: distribute_furigana(&entry.expression, &entry.reading),
            reasons: reasons.to_vec(),
            definition_tags,
            term_tags,
            glossary: entry.glossary.clone(),
            score: entry.score,
            sequence: entry.sequence,
            dictionary: entry.dictionary.clone(),
            dictionary_priority,
            frequencies: Vec::new(),
            pitches: Vec::new(),
        })
    }

    /// Partitions definitions by `(source, expression, reasons, reading)`,
    /// sorting within each group and across groups.
    fn group_definitions(&self, definitions: Vec<TermDefinition>) -> Vec<GroupedDefinition> {
        let mut groups: IndexMap<String, Vec<TermDefinition>> = IndexMap::new();
        for definition in definitions {
            let mut key_parts: Vec<&str> = vec![&definition.source, &definition.expression];
            key_parts.extend(definition.reasons.iter().map(String::as_str));
            if !definition.reading.is_empty() {
                key_parts.push(&definition.reading);
            }
            let key = serde_json::to_string(&key_parts).expect("group key serialization");
            groups.entry(key).or_default().push(definition);
        }
        let mut results = Vec::new();
        for (_, mut members) in groups {
            self.sort_by_relevance(&mut members);
            let score = members
                .iter()
                .map(|member| member.score)
                .max()
                .unwrap_or(i64::MIN);
            let first = members[0].clone();
            results.push(GroupedDefinition {
                definitions: members,
                expression: first.expression,
                reading: first.reading,
                furigana_segments: first.furigana_segments,
                reasons: first.reasons,
                term_tags: first.term_tags,
                score,
                source: first.source,
                raw_source: first.raw_source,
                dictionary_priority: first.dictionary_priority,
                frequencies: Vec::new(),
                pitches: Vec::new(),
            });
        }
        self.sort_by_relevance(&mut results);
        results
    }

    /// Drops a tag category from an entry when it repeats the immediately
    /// preceding entry's set for that category, tracked across
    /// (dictionary, part-of-speech) transitions.
    fn compress_definition_tags(&self, definitions: &mut [TermDefinition]) {
        let mut last_dictionary = String::new();
        let mut last_part_of_speech = String::new();
        for definition in definitions {
            let dictionary_key = tag_names_key(&definition.definition_tags, "dictionary");
            let part_of_speech_key = tag_names_key(&definition.definition_tags, "partOfSpeech");
            let mut remove_categories: Vec<&str> = Vec::new();
            if last_dictionary == dictionary_key {
                remove_categories.push("dictionary");
            } else {
                last_dictionary = dictionary_key;
                last_part_of_speech.clear();
            }
            if last_part_of_speech == part_of_speech_key {
                remove_categories.push("partOfSpeech");
            } else {
                last_part_of_speech = part_of_speech_key;
            }
            if !remove_categories.is_empty() {
                definition
                    .definition_tags
                    .retain(|tag| !remove_categories.contains(&tag.category.as_str()));
            }
        }
    }

    /// Merge mode. Phase 1 buckets main-dictionary definitions by sequence
    /// and retrieves each sequence's complete entry set; phase 2 merges by
    /// normalized glossary across related entries, unsequenced matches, and
    /// secondary-search results. Unclaimed definitions are grouped and
    /// appended.
    fn merge_definitions(
        &self,
        text: &str,
        definitions: Vec<TermDefinition>,
        options: &FindTermsOptions,
    ) -> Result<Vec<MergedDefinition>, LookupError> {
        let secondary_titles: IndexSet<String> = options
            .enabled_dictionary_map
            .iter()
            .filter(|(_, dictionary)| dictionary.allow_secondary_searches)
            .map(|(name, _)| name.clone())
            .collect();

        let mut builders: IndexMap<i64, MergedDefinitionBuilder> = IndexMap::new();
        let mut default_definitions: Vec<TermDefinition> = Vec::new();
        for definition in definitions {
            if definition.dictionary == options.main_dictionary && definition.sequence >= 0 {
                builders
                    .entry(definition.sequence)
                    .or_insert_with(|| MergedDefinitionBuilder::from_definition(&definition));
            } else {
                default_definitions.push(definition);
            }
        }

        let sequences: Vec<i64> = builders.keys().copied().collect();
        let mut related: Vec<Vec<TermDefinition>> = vec![Vec::new(); sequences.len()];
        if !sequences.is_empty() {
            let entries = self
                .db
                .find_terms_by_sequence_bulk(&sequences, &options.main_dictionary)?;
            debug!(
                sequences = sequences.len(),
                entries = entries.len(),
                "sequence lookup"
            );
            for entry in entries {
                let Some((_, builder)) = builders.get_index(entry.index) else {
                    continue;
                };
                let definition = self.create_definition(
                    &entry,
                    &builder.source,
                    &builder.raw_source,
                    &[],
                    options,
                )?;
                if let Some(bucket) = related.get_mut(entry.index) {
                    bucket.push(definition);
                }
            }
        }

        let mut merged_default_indices: IndexSet<usize> = IndexSet::new();
        let mut results: Vec<MergedDefinition> = Vec::new();
        for (bucket_index, (_, mut builder)) in builders.into_iter().enumerate() {
            let mut by_gloss: IndexMap<String, GlossaryDefinition> = IndexMap::new();
            merge_by_glossary_primary(&mut builder, &related[bucket_index], &mut by_gloss);

            let mut secondary_definitions: Vec<TermDefinition> = Vec::new();
            if !secondary_titles.is_empty() {
                let mut requests = Vec::new();
                for (expression, readings) in &builder.expressions {
                    if expression == text {
                        // Covered by the primary lookup already
                        continue;
                    }
                    for reading in readings.keys() {
                        requests.push(TermExactRequest {
                            term: expression.clone(),
                            reading: reading.clone(),
                        });
                    }
                }
                if !requests.is_empty() {
                    let entries = self.db.find_terms_exact_bulk(&requests, &secondary_titles)?;
                    for entry in entries {
                        secondary_definitions.push(self.create_definition(
                            &entry,
                            &builder.source,
                            &builder.raw_source,
                            &[],
                            options,
                        )?);
                    }
                }
            }
            merge_by_glossary_secondary(
                &mut builder,
                &default_definitions,
                &secondary_definitions,
                &mut by_gloss,
                &mut merged_default_indices,
            );

            for (_, mut gloss_definition) in by_gloss {
                gloss_definition.only = compute_only(&gloss_definition, &builder);
                self.sort_tags(&mut gloss_definition.definition_tags);
                builder.definitions.push(gloss_definition);
            }
            self.sort_glossary_definitions(&mut builder.definitions, options);
            results.push(builder.finish());
        }

        let strays: Vec<TermDefinition> = default_definitions
            .into_iter()
            .enumerate()
            .filter(|(index, _)| !merged_default_indices.contains(index))
            .map(|(_, definition)| definition)
            .collect();
        for group in self.group_definitions(strays) {
            results.push(merged_from_group(group));
        }

        let titles = enabled_titles(&options.enabled_dictionary_map);
        self.add_merged_meta(&mut results, &titles)?;
        self.sort_by_relevance(&mut results);
        Ok(results)
    }

    fn add_definition_meta(
        &self,
        definitions: &mut [TermDefinition],
        titles: &IndexSet<String>,
    ) -> Result<(), LookupError> {
        let keys: Vec<(String, String)> = definitions
            .iter()
            .map(|definition| (definition.expression.clone(), definition.reading.clone()))
            .collect();
        let meta = self.collect_term_meta(&keys, titles)?;
        for (definition, (frequencies, pitches)) in definitions.iter_mut().zip(meta) {
            definition.frequencies = frequencies;
            definition.pitches = pitches;
        }
        Ok(())
    }

    fn add_group_meta(
        &self,
        groups: &mut [GroupedDefinition],
        titles: &IndexSet<String>,
    ) -> Result<(), LookupError> {
        let keys: Vec<(String, String)> = groups
            .iter()
            .map(|group| (group.expression.clone(), group.reading.clone()))
            .collect();
        let meta = self.collect_term_meta(&keys, titles)?;
        for (group, (frequencies, pitches)) in groups.iter_mut().zip(meta) {
            group.frequencies = frequencies;
            group.pitches = pitches;
        }
        Ok(())
    }

    fn add_merged_meta(
        &self,
        results: &mut [MergedDefinition],
        titles: &IndexSet<String>,
    ) -> Result<(), LookupError> {
        let mut keys = Vec::new();
        let mut owners = Vec::new();
        for (result_index, result) in results.iter().enumerate() {
            for (expression_index, details) in result.expressions.iter().enumerate() {
                keys.push((details.expression.clone(), details.reading.clone()));
                owners.push((result_index, expression_index));
            }
        }
        let meta = self.collect_term_meta(&keys, titles)?;
        for ((result_index, expression_index), (frequencies, pitches)) in
            owners.into_iter().zip(meta)
        {
            let details = &mut results[result_index].expressions[expression_index];
            details.frequencies = frequencies;
            details.pitches = pitches;
        }
        Ok(())
    }

    /// Resolves frequency and pitch metadata for (expression, reading)
    /// pairs. A metadatum declaring a reading that differs from the pair's
    /// reading (expression when the reading is empty) is silently skipped:
    /// it may legitimately apply to a different reading of a shared
    /// expression.
    fn collect_term_meta(
        &self,
        keys: &[(String, String)],
        titles: &IndexSet<String>,
    ) -> Result<Vec<(Vec<TermFrequency>, Vec<TermPitch>)>, LookupError> {
        let mut results = vec![(Vec::new(), Vec::new()); keys.len()];
        if keys.is_empty() {
            return Ok(results);
        }
        let mut unique: IndexMap<&str, Vec<usize>> = IndexMap::new();
        for (index, (expression, _)) in keys.iter().enumerate() {
            unique.entry(expression.as_str()).or_default().push(index);
        }
        let expressions: Vec<String> = unique.keys().map(|s| s.to_string()).collect();
        let metas = self.db.find_term_meta_bulk(&expressions, titles)?;
        for meta in metas {
            let Some((_, key_indices)) = unique.get_index(meta.index) else {
                continue;
            };
            for &key_index in key_indices {
                let (expression, reading) = &keys[key_index];
                let term_reading = if reading.is_empty() {
                    expression
                } else {
                    reading
                };
                match &meta.data {
                    TermMetaData::Frequency { value, reading } => {
                        if let Some(required) = reading {
                            if required != term_reading {
                                continue;
                            }
                        }
                        results[key_index].0.push(TermFrequency {
                            expression: meta.expression.clone(),
                            frequency: *value,
                            dictionary: meta.dictionary.clone(),
                        });
                    }
                    TermMetaData::Pitch { reading, pitches } => {
                        if reading != term_reading {
                            continue;
                        }
                        let mut pitch_infos = Vec::with_capacity(pitches.len());
                        for pitch in pitches {
                            let mut tags = self.tag_resolver.expand_tags(
                                &self.db,
                                &pitch.tags,
                                &meta.dictionary,
                            )?;
                            self.sort_tags(&mut tags);
                            pitch_infos.push(PitchAccentInfo {
                                position: pitch.position,
                                tags,
                            });
                        }
                        results[key_index].1.push(TermPitch {
                            reading: reading.clone(),
                            pitches: pitch_infos,
                            dictionary: meta.dictionary.clone(),
                        });
                    }
                }
            }
        }
        Ok(results)
    }

    /// Stable ordering shared by every output mode: dictionary priority,
    /// matched source length, inflection count, score, expression length,
    /// collated expression.
    fn sort_by_relevance<T: RelevanceKey>(&self, items: &mut [T]) {
        items.sort_by(|a, b| self.compare_relevance(&a.sort_key(), &b.sort_key()));
    }

    fn compare_relevance(&self, a: &SortKey<'_>, b: &SortKey<'_>) -> Ordering {
        b.dictionary_priority
            .cmp(&a.dictionary_priority)
            .then_with(|| b.source_length.cmp(&a.source_length))
            .then_with(|| a.reason_count.cmp(&b.reason_count))
            .then_with(|| b.score.cmp(&a.score))
            .then_with(|| {
                b.expression
                    .chars()
                    .count()
                    .cmp(&a.expression.chars().count())
            })
            .then_with(|| self.string_comparer.compare(a.expression, b.expression))
    }

    fn sort_glossary_definitions(
        &self,
        definitions: &mut [GlossaryDefinition],
        options: &FindTermsOptions,
    ) {
        definitions.sort_by(|a, b| {
            let priority_a = options
                .enabled_dictionary_map
                .get(&a.dictionary)
                .map(|dictionary| dictionary.priority)
                .unwrap_or(0);
            let priority_b = options
                .enabled_dictionary_map
                .get(&b.dictionary)
                .map(|dictionary| dictionary.priority)
                .unwrap_or(0);
            priority_b
                .cmp(&priority_a)
                .then_with(|| b.score.cmp(&a.score))
        });
    }

    fn sort_tags(&self, tags: &mut [Tag]) {
        tags.sort_by(|a, b| {
            a.order
                .cmp(&b.order)
                .then_with(|| self.string_comparer.compare(&a.name, &b.name))
        });
    }
}

fn enabled_titles(map: &TermEnabledDictionaryMap) -> IndexSet<String> {
    map.keys().cloned().collect()
}

fn next_prefix_length(resolution: SearchResolution, prefix: &str, current: usize) -> usize {
    match resolution {
        SearchResolution::Letter => current - 1,
        SearchResolution::Word => match NEXT_SUBSTRING_REGEX.find(prefix) {
            Ok(Some(found)) => prefix[..found.start()].chars().count(),
            _ => 0,
        },
    }
}

fn tag_names_key(tags: &[Tag], category: &str) -> String {
    let mut names: Vec<&str> = tags
        .iter()
        .filter(|tag| tag.category == category)
        .map(|tag| tag.name.as_str())
        .collect();
    names.sort_unstable();
    serde_json::to_string(&names).expect("tag key serialization")
}

/// The glossary dedup key: identical glossary content from the same
/// dictionary merges into one sense.
fn gloss_key(definition: &TermDefinition) -> String {
    serde_json::to_string(&(&definition.glossary, &definition.dictionary))
        .expect("glossary key serialization")
}

fn new_gloss_definition(definition: &TermDefinition) -> GlossaryDefinition {
    GlossaryDefinition {
        dictionary: definition.dictionary.clone(),
        glossary: definition.glossary.clone(),
        definition_tags: Vec::new(),
        expression: IndexSet::new(),
        reading: IndexSet::new(),
        only: Vec::new(),
        id: definition.id,
        score: definition.score,
    }
}

fn merge_gloss_member(gloss: &mut GlossaryDefinition, definition: &TermDefinition) {
    gloss.expression.insert(definition.expression.clone());
    gloss.reading.insert(definition.reading.clone());
    for tag in &definition.definition_tags {
        if !gloss
            .definition_tags
            .iter()
            .any(|existing| existing.name == tag.name)
        {
            gloss.definition_tags.push(tag.clone());
        }
    }
}

/// Phase-1 merge over a sequence's complete entry set: every definition
/// opens or joins a gloss group and contributes its headword to the
/// aggregate sets.
fn merge_by_glossary_primary(
    builder: &mut MergedDefinitionBuilder,
    definitions: &[TermDefinition],
    by_gloss: &mut IndexMap<String, GlossaryDefinition>,
) {
    for definition in definitions {
        let gloss = by_gloss
            .entry(gloss_key(definition))
            .or_insert_with(|| new_gloss_definition(definition));
        merge_gloss_member(gloss, definition);
        builder.track_headword(definition);
    }
}

/// Phase-2 merge over unsequenced matches and secondary-search results.
/// A definition may only open a new gloss group when its headword is
/// already part of the merged family; consumed defaults are recorded so
/// strays can be identified.
fn merge_by_glossary_secondary(
    builder: &mut MergedDefinitionBuilder,
    default_definitions: &[TermDefinition],
    secondary_definitions: &[TermDefinition],
    by_gloss: &mut IndexMap<String, GlossaryDefinition>,
    merged_default_indices: &mut IndexSet<usize>,
) {
    for (index, definition) in default_definitions.iter().enumerate() {
        if merged_default_indices.contains(&index) {
            continue;
        }
        if merge_one_secondary(builder, definition, by_gloss) {
            merged_default_indices.insert(index);
        }
    }
    for definition in secondary_definitions {
        merge_one_secondary(builder, definition, by_gloss);
    }
}

fn merge_one_secondary(
    builder: &mut MergedDefinitionBuilder,
    definition: &TermDefinition,
    by_gloss: &mut IndexMap<String, GlossaryDefinition>,
) -> bool {
    let key = gloss_key(definition);
    let gloss = match by_gloss.entry(key) {
        Entry::Occupied(entry) => entry.into_mut(),
        Entry::Vacant(entry) => {
            if !builder.expression.contains(&definition.expression)
                || !builder.reading.contains(&definition.reading)
            {
                return false;
            }
            entry.insert(new_gloss_definition(definition))
        }
    };
    merge_gloss_member(gloss, definition);
    true
}

/// A member restricts to `only` exactly when its expression or reading set
/// is a strict subset of the merged aggregate.
fn compute_only(gloss: &GlossaryDefinition, builder: &MergedDefinitionBuilder) -> Vec<String> {
    let mut only = Vec::new();
    if gloss.expression != builder.expression {
        only.extend(gloss.expression.intersection(&builder.expression).cloned());
    }
    if gloss.reading != builder.reading {
        only.extend(gloss.reading.intersection(&builder.reading).cloned());
    }
    only
}

/// Lifts an unclaimed group into the merged result shape with a single
/// headword.
fn merged_from_group(group: GroupedDefinition) -> MergedDefinition {
    let tag_score: i64 = group.term_tags.iter().map(|tag| tag.score).sum();
    let expression_details = ExpressionDetails {
        expression: group.expression.clone(),
        reading: group.reading.clone(),
        term_tags: group.term_tags.clone(),
        term_frequency: TermFrequencyLabel::from_score(tag_score),
        frequencies: Vec::new(),
        pitches: Vec::new(),
    };
    let definitions = group
        .definitions
        .iter()
        .map(|definition| {
            let mut expression = IndexSet::new();
            expression.insert(definition.expression.clone());
            let mut reading = IndexSet::new();
            reading.insert(definition.reading.clone());
            GlossaryDefinition {
                dictionary: definition.dictionary.clone(),
                glossary: definition.glossary.clone(),
                definition_tags: definition.definition_tags.clone(),
                expression,
                reading,
                only: Vec::new(),
                id: definition.id,
                score: definition.score,
            }
        })
        .collect();
    let mut expression = IndexSet::new();
    expression.insert(group.expression);
    let mut reading = IndexSet::new();
    reading.insert(group.reading);
    MergedDefinition {
        expression,
        reading,
        expressions: vec![expression_details],
        definitions,
        reasons: group.reasons,
        score: group.score,
        source: group.source,
        raw_source: group.raw_source,
        dictionary_priority: group.dictionary_priority,
    }
}
