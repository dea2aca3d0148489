//! Transfer metadata: how many arrays a call carries and how many chunks
//! each one was cut into.
//!
//! Carried as call metadata, ahead of the first data chunk:
//!
//! ```text
//! full-vectors    = N
//! vec1-messages   = chunks in array 1
//! ...
//! vecN-messages   = chunks in array N
//! ```
//!
//! Matrices use `full-matrices` and `mat<i>-messages`. Indices are 1-based.

use crate::array::ArrayKind;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MetadataError {
    #[error("missing metadata key {key}")]
    Missing { key: String },
    #[error("metadata key {key} has non-numeric value {value:?}")]
    Invalid { key: String, value: String },
    #[error("metadata declares zero arrays")]
    NoArrays,
    #[error("metadata key {key} declares zero chunks")]
    ZeroChunks { key: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferMetadata {
    kind: ArrayKind,
    chunk_counts: Vec<usize>,
}

impl TransferMetadata {
    pub fn new(kind: ArrayKind, chunk_counts: Vec<usize>) -> Self {
        Self { kind, chunk_counts }
    }

    /// `full-vectors` or `full-matrices`.
    pub fn full_key(kind: ArrayKind) -> String {
        format!("full-{}", kind.plural())
    }

    /// Key for the chunk count of the array at zero-based `index`.
    pub fn messages_key(kind: ArrayKind, index: usize) -> String {
        format!("{}{}-messages", kind.abbrev(), index + 1)
    }

    pub fn kind(&self) -> ArrayKind {
        self.kind
    }

    pub fn array_count(&self) -> usize {
        self.chunk_counts.len()
    }

    pub fn chunk_count(&self, index: usize) -> Option<usize> {
        self.chunk_counts.get(index).copied()
    }

    pub fn chunk_counts(&self) -> &[usize] {
        &self.chunk_counts
    }

    pub fn total_chunks(&self) -> usize {
        self.chunk_counts.iter().sum()
    }

    /// Key/value pairs in emission order: the count key first, then one
    /// key per array in argument order.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::with_capacity(self.chunk_counts.len() + 1);
        pairs.push((Self::full_key(self.kind), self.chunk_counts.len().to_string()));
        for (i, count) in self.chunk_counts.iter().enumerate() {
            pairs.push((Self::messages_key(self.kind, i), count.to_string()));
        }
        pairs
    }

    /// Read metadata for `kind` through `lookup`, which returns the value
    /// stored under a key. Unrelated keys are ignored.
    pub fn parse<F>(kind: ArrayKind, lookup: F) -> Result<Self, MetadataError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let full_key = Self::full_key(kind);
        let arrays = read_count(&full_key, &lookup)?;
        if arrays == 0 {
            return Err(MetadataError::NoArrays);
        }

        // Grow as keys are found; the declared count is untrusted.
        let mut chunk_counts = Vec::new();
        for i in 0..arrays {
            let key = Self::messages_key(kind, i);
            let count = read_count(&key, &lookup)?;
            if count == 0 {
                return Err(MetadataError::ZeroChunks { key });
            }
            chunk_counts.push(count);
        }
        Ok(Self { kind, chunk_counts })
    }

    pub fn from_pairs(kind: ArrayKind, pairs: &[(String, String)]) -> Result<Self, MetadataError> {
        Self::parse(kind, |key| {
            pairs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
        })
    }
}

fn read_count<F>(key: &str, lookup: &F) -> Result<usize, MetadataError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = lookup(key).ok_or_else(|| MetadataError::Missing { key: key.to_string() })?;
    value.trim().parse().map_err(|_| MetadataError::Invalid {
        key: key.to_string(),
        value,
    })
}
