//! Term deinflection and dictionary-matching engine for Japanese lookups.
//!
//! Given raw input text, [`Translator`] generates base-form candidates by
//! reversing productive inflectional morphology, queries a
//! [`DictionaryDatabase`](dictionary_database::DictionaryDatabase)
//! collaborator for exact matches, and reconciles the results under one of
//! four output modes (simple, split, grouped, merged). Matches are enriched
//! with resolved tags, furigana segmentation, and frequency/pitch metadata
//! from the same store.
//!
//! ```no_run
//! use jiten_rs::{
//!     dictionary_database::MemoryDictionaryDatabase,
//!     translation::{FindTermsDetails, FindTermsMode, FindTermsOptions},
//!     Translator,
//! };
//!
//! let translator = Translator::new(MemoryDictionaryDatabase::new());
//! let result = translator.find_terms(
//!     FindTermsMode::Group,
//!     "食べた",
//!     &FindTermsDetails::default(),
//!     &FindTermsOptions::default(),
//! )?;
//! # Ok::<(), jiten_rs::errors::LookupError>(())
//! ```

pub mod deinflector;
pub mod dictionary;
pub mod dictionary_database;
pub mod errors;
pub mod language;
pub mod reasons;
pub mod tags;
pub mod text_source_map;
pub mod text_variants;
pub mod translation;
mod translation_internal;
pub mod translator;

pub use deinflector::{Deinflection, Deinflector, ReasonsTable, RuleFlags};
pub use errors::{LookupError, StoreError};
pub use reasons::japanese_reasons;
pub use translator::{FindTermsResult, TermSearchResults, Translator};
