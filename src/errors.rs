use thiserror::Error;

/// Failures reported by a [`DictionaryDatabase`](crate::dictionary_database::DictionaryDatabase)
/// implementation. The engine never retries these; retry and backoff policy
/// belongs to the store itself.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("query err: {0}")]
    Query(String),
}

/// All error paths of a term or kanji lookup.
///
/// A store failure during any phase of a lookup, including the secondary
/// phases of merge mode, fails the whole call; no partial results are
/// returned.
#[derive(Error, Debug)]
pub enum LookupError {
    #[error("store err: {0}")]
    Store(#[from] StoreError),
}
