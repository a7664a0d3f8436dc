use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// The format of a term lookup's results.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FindTermsMode {
    Simple,
    Split,
    Group,
    Merge,
}

impl FindTermsMode {
    /// Resolves a configuration string. `None` for unrecognized names;
    /// callers treat that as an empty result set rather than an error since
    /// mode names are user-controlled.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "simple" => Some(Self::Simple),
            "split" => Some(Self::Split),
            "group" => Some(Self::Group),
            "merge" => Some(Self::Merge),
            _ => None,
        }
    }
}

/// Wildcard matching against the literal text, skipping deinflection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FindTermsWildcard {
    Prefix,
    Suffix,
}

/// Per-lookup details supplied by the caller alongside the text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindTermsDetails {
    pub wildcard: Option<FindTermsWildcard>,
}

/// Details about one enabled term dictionary.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindTermDictionary {
    /// Position of the dictionary in the user's configured order.
    pub index: usize,
    /// Sorting priority; higher sorts first. Absent dictionaries count as 0.
    pub priority: i64,
    /// Whether exact-match secondary searches may pull this dictionary's
    /// entries into another dictionary's merged groups.
    pub allow_secondary_searches: bool,
}

/// Details about one enabled kanji dictionary.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindKanjiDictionary {
    pub index: usize,
    pub priority: i64,
}

pub type TermEnabledDictionaryMap = IndexMap<String, FindTermDictionary>;
pub type KanjiEnabledDictionaryMap = IndexMap<String, FindKanjiDictionary>;

/// Whether a text conversion is applied to the lookup text.
/// `Variant` searches both the converted and unconverted forms.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TranslationConvertType {
    #[default]
    False,
    True,
    Variant,
}

impl TranslationConvertType {
    pub(crate) fn variants(self) -> &'static [bool] {
        match self {
            Self::False => &[false],
            Self::True => &[true],
            Self::Variant => &[false, true],
        }
    }
}

/// Emphatic-sequence collapsing is additive: `True` also searches the
/// collapsed form, `Full` additionally searches the fully collapsed form.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TranslationCollapseEmphaticSequences {
    #[default]
    False,
    True,
    Full,
}

impl TranslationCollapseEmphaticSequences {
    pub(crate) fn variants(self) -> &'static [(bool, bool)] {
        match self {
            Self::False => &[(false, false)],
            Self::True => &[(false, false), (true, false)],
            Self::Full => &[(false, false), (true, false), (true, true)],
        }
    }
}

/// Orthographic normalizations tried before deinflection, in application
/// order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextConversionOptions {
    pub normalize_combining_characters: TranslationConvertType,
    pub convert_half_width_characters: TranslationConvertType,
    pub convert_numeric_characters: TranslationConvertType,
    pub convert_alphabetic_characters: TranslationConvertType,
    pub convert_katakana_to_hiragana: TranslationConvertType,
    pub convert_hiragana_to_katakana: TranslationConvertType,
    pub collapse_emphatic_sequences: TranslationCollapseEmphaticSequences,
}

/// How far the matched prefix shrinks between lookup attempts.
///
/// `Letter`: A dog → _"A dog"_ | _"A do"_ | _"A d"_ | _"A"_.
///
/// `Word`: A dog → _"A dog"_ | _"A"_.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchResolution {
    #[default]
    Letter,
    Word,
}

/// An options object for use with `Translator::find_terms`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FindTermsOptions {
    /// The name of the primary dictionary whose sequence numbers drive
    /// merge mode.
    pub main_dictionary: String,
    /// The mapping of dictionaries to search for terms in.
    /// The key is the dictionary name.
    pub enabled_dictionary_map: TermEnabledDictionaryMap,
    /// Whether the input is trimmed to its leading Japanese run first.
    pub remove_non_japanese_characters: bool,
    /// Whether redundant tag categories are dropped from grouped results.
    pub compact_tags: bool,
    pub search_resolution: SearchResolution,
    pub text_conversions: TextConversionOptions,
}

/// An options object for use with `Translator::find_kanji`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FindKanjiOptions {
    pub enabled_dictionary_map: KanjiEnabledDictionaryMap,
}
