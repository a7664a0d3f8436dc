use indexmap::{IndexMap, IndexSet};

use crate::dictionary::{
    ExpressionDetails, GlossaryDefinition, GroupedDefinition, MergedDefinition, Tag,
    TermDefinition, TermFrequencyLabel,
};

/// The key columns of the global relevance comparator. Extracted per item
/// so every result shape sorts through the same ordering.
pub(crate) struct SortKey<'a> {
    pub dictionary_priority: i64,
    pub source_length: usize,
    pub reason_count: usize,
    pub score: i64,
    pub expression: &'a str,
}

pub(crate) trait RelevanceKey {
    fn sort_key(&self) -> SortKey<'_>;
}

impl RelevanceKey for TermDefinition {
    fn sort_key(&self) -> SortKey<'_> {
        SortKey {
            dictionary_priority: self.dictionary_priority,
            source_length: self.source.chars().count(),
            reason_count: self.reasons.len(),
            score: self.score,
            expression: &self.expression,
        }
    }
}

impl RelevanceKey for GroupedDefinition {
    fn sort_key(&self) -> SortKey<'_> {
        SortKey {
            dictionary_priority: self.dictionary_priority,
            source_length: self.source.chars().count(),
            reason_count: self.reasons.len(),
            score: self.score,
            expression: &self.expression,
        }
    }
}

impl RelevanceKey for MergedDefinition {
    fn sort_key(&self) -> SortKey<'_> {
        SortKey {
            dictionary_priority: self.dictionary_priority,
            source_length: self.source.chars().count(),
            reason_count: self.reasons.len(),
            score: self.score,
            expression: self
                .expression
                .first()
                .map(String::as_str)
                .unwrap_or_default(),
        }
    }
}

/// Accumulates one merged result while senses are folded in; the
/// `expressions` map tracks `expression -> reading -> term tags` with
/// first-wins semantics until [`finish`](MergedDefinitionBuilder::finish)
/// flattens it.
pub(crate) struct MergedDefinitionBuilder {
    pub reasons: Vec<String>,
    pub score: i64,
    pub source: String,
    pub raw_source: String,
    pub dictionary_priority: i64,
    pub expression: IndexSet<String>,
    pub reading: IndexSet<String>,
    pub expressions: IndexMap<String, IndexMap<String, Vec<Tag>>>,
    pub definitions: Vec<GlossaryDefinition>,
}

impl MergedDefinitionBuilder {
    /// Seeds the builder from the most relevant definition of a sequence
    /// bucket; the definition list is already sorted, so the first member
    /// supplies the representative fields.
    pub fn from_definition(definition: &TermDefinition) -> Self {
        Self {
            reasons: definition.reasons.clone(),
            score: definition.score,
            source: definition.source.clone(),
            raw_source: definition.raw_source.clone(),
            dictionary_priority: definition.dictionary_priority,
            expression: IndexSet::new(),
            reading: IndexSet::new(),
            expressions: IndexMap::new(),
            definitions: Vec::new(),
        }
    }

    /// Records one constituent's headword, keeping the first term-tag set
    /// seen per (expression, reading).
    pub fn track_headword(&mut self, definition: &TermDefinition) {
        self.expression.insert(definition.expression.clone());
        self.reading.insert(definition.reading.clone());
        self.expressions
            .entry(definition.expression.clone())
            .or_default()
            .entry(definition.reading.clone())
            .or_insert_with(|| definition.term_tags.clone());
    }

    pub fn finish(self) -> MergedDefinition {
        let mut expressions = Vec::new();
        for (expression, readings) in self.expressions {
            for (reading, term_tags) in readings {
                let tag_score: i64 = term_tags.iter().map(|tag| tag.score).sum();
                expressions.push(ExpressionDetails {
                    expression: expression.clone(),
                    reading,
                    term_tags,
                    term_frequency: TermFrequencyLabel::from_score(tag_score),
                    frequencies: Vec::new(),
                    pitches: Vec::new(),
                });
            }
        }
        MergedDefinition {
            expression: self.expression,
            reading: self.reading,
            expressions,
            definitions: self.definitions,
            reasons: self.reasons,
            score: self.score,
            source: self.source,
            raw_source: self.raw_source,
            dictionary_priority: self.dictionary_priority,
        }
    }
}
