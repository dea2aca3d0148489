//! Chunk planning: where each array is cut into wire messages.
//!
//! A plan is a list of element end-offsets per array. Offsets strictly
//! increase and the last one equals the element count, so consecutive
//! offsets give the `[start, end)` range of each chunk.

/// Default per-message payload limit: 3 MiB.
pub const MAX_CHUNK_BYTES: usize = 3 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    #[error("chunk limit of {limit} bytes cannot hold one {width}-byte element")]
    LimitTooSmall { limit: usize, width: usize },
}

/// End offsets for one array of `count` elements, `width` bytes each.
///
/// An array that fits the limit (including an empty one) is a single chunk.
/// Otherwise every chunk holds `limit / width` elements except possibly the
/// last, which holds the remainder.
pub fn chunk_boundaries(count: usize, width: usize, limit: usize) -> Result<Vec<usize>, PlanError> {
    let max_elems = limit / width;
    if max_elems == 0 {
        return Err(PlanError::LimitTooSmall { limit, width });
    }
    if count <= max_elems {
        return Ok(vec![count]);
    }

    let full = count / max_elems;
    let mut bounds: Vec<usize> = (1..=full).map(|i| i * max_elems).collect();
    if count % max_elems != 0 {
        bounds.push(count);
    }
    Ok(bounds)
}

/// Plans for every array in one transfer, in argument order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkPlan {
    arrays: Vec<Vec<usize>>,
}

impl ChunkPlan {
    /// Plan each `(element_count, element_width)` pair against `limit`.
    pub fn for_arrays<I>(arrays: I, limit: usize) -> Result<Self, PlanError>
    where
        I: IntoIterator<Item = (usize, usize)>,
    {
        let arrays = arrays
            .into_iter()
            .map(|(count, width)| chunk_boundaries(count, width, limit))
            .collect::<Result<_, _>>()?;
        Ok(Self { arrays })
    }

    pub fn chunk_counts(&self) -> Vec<usize> {
        self.arrays.iter().map(Vec::len).collect()
    }

    pub fn total_chunks(&self) -> usize {
        self.arrays.iter().map(Vec::len).sum()
    }

    /// `[start, end)` element range of one chunk, or `None` past the end.
    pub fn range(&self, array: usize, chunk: usize) -> Option<(usize, usize)> {
        let bounds = self.arrays.get(array)?;
        let end = *bounds.get(chunk)?;
        let start = match chunk {
            0 => 0,
            c => bounds[c - 1],
        };
        Some((start, end))
    }

    /// `[start, end)` element ranges for one array.
    pub fn ranges(&self, array: usize) -> impl Iterator<Item = (usize, usize)> + '_ {
        let chunks = self.arrays.get(array).map_or(0, Vec::len);
        (0..chunks).filter_map(move |chunk| self.range(array, chunk))
    }
}
