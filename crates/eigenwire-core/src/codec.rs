//! Chunked stream codec.
//!
//! The encoder turns a list of arrays into transfer metadata plus a lazy
//! sequence of wire chunks. The decoder takes that metadata and the chunk
//! sequence and rebuilds the arrays, failing the whole transfer on any
//! inconsistency. Neither side performs I/O; the transport supplies the
//! chunk type through [`WireChunk`].

use std::iter::FusedIterator;
use std::marker::PhantomData;

use crate::array::{ArrayKind, NumericArray, Shape, Values};
use crate::element::{append_le, write_le, ElementType};
use crate::metadata::TransferMetadata;
use crate::plan::{ChunkPlan, PlanError};

/// A transport message carrying one slice of one array.
pub trait WireChunk: Sized {
    /// The array kind this message type carries.
    const KIND: ArrayKind;

    fn build(element_type: ElementType, shape: Shape, payload: Vec<u8>) -> Self;

    /// Raw element-type tag as received.
    fn element_tag(&self) -> i32;

    /// Shape declared by this chunk. Errors if the declared dimensions
    /// cannot be represented on this platform.
    fn declared_shape(&self) -> Result<Shape, DecodeError>;

    fn payload(&self) -> &[u8];
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    #[error("no arrays to send")]
    Empty,
    #[error("argument {index} is a {found}, expected a {expected}")]
    WrongKind {
        index: usize,
        expected: ArrayKind,
        found: ArrayKind,
    },
    #[error(transparent)]
    Plan(#[from] PlanError),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("metadata describes {found} but the stream carries {expected} chunks")]
    KindMismatch {
        expected: ArrayKind,
        found: ArrayKind,
    },
    #[error("unknown element type tag {0}")]
    UnknownElementType(i32),
    #[error("declared dimension {0} is too large")]
    DimensionOverflow(u64),
    #[error("array {array} chunk {chunk}: element type {found}, first chunk had {expected}")]
    ElementTypeChanged {
        array: usize,
        chunk: usize,
        expected: ElementType,
        found: ElementType,
    },
    #[error("array {array} chunk {chunk}: declares {found}, first chunk declared {expected}")]
    ShapeChanged {
        array: usize,
        chunk: usize,
        expected: Shape,
        found: Shape,
    },
    #[error("array {array} chunk {chunk}: {len} bytes is not a whole number of {width}-byte elements")]
    PartialElement {
        array: usize,
        chunk: usize,
        len: usize,
        width: usize,
    },
    #[error("array {array}: received {actual} elements, declared {expected}")]
    SizeMismatch {
        array: usize,
        expected: usize,
        actual: usize,
    },
    #[error("chunk received after all {expected} declared chunks")]
    UnexpectedChunk { expected: usize },
    #[error("stream ended after {received} of {expected} chunks")]
    MissingChunks { received: usize, expected: usize },
    #[error("decoder already failed")]
    AlreadyFailed,
}

// ── Encoding ──────────────────────────────────────────────────────────────────

/// Plan `arrays` against `limit` and return the metadata to send ahead of
/// the stream together with the stream itself.
pub fn encode<C: WireChunk>(
    arrays: Vec<NumericArray>,
    limit: usize,
) -> Result<(TransferMetadata, EncodedStream<C>), EncodeError> {
    if arrays.is_empty() {
        return Err(EncodeError::Empty);
    }
    if let Some((index, a)) = arrays.iter().enumerate().find(|(_, a)| a.kind() != C::KIND) {
        return Err(EncodeError::WrongKind {
            index,
            expected: C::KIND,
            found: a.kind(),
        });
    }

    let plan = ChunkPlan::for_arrays(
        arrays.iter().map(|a| (a.len(), a.element_type().width())),
        limit,
    )?;
    let metadata = TransferMetadata::new(C::KIND, plan.chunk_counts());
    let remaining = plan.total_chunks();

    Ok((
        metadata,
        EncodedStream {
            arrays,
            plan,
            array: 0,
            chunk: 0,
            remaining,
            _chunk: PhantomData,
        },
    ))
}

/// Finite, non-restartable iterator of wire chunks in transfer order.
///
/// Payload bytes are produced one chunk at a time, so only one chunk's
/// worth of serialized data exists at once.
pub struct EncodedStream<C> {
    arrays: Vec<NumericArray>,
    plan: ChunkPlan,
    array: usize,
    chunk: usize,
    remaining: usize,
    _chunk: PhantomData<fn() -> C>,
}

impl<C: WireChunk> Iterator for EncodedStream<C> {
    type Item = C;

    fn next(&mut self) -> Option<C> {
        while self.array < self.arrays.len() {
            let Some((start, end)) = self.plan.range(self.array, self.chunk) else {
                self.array += 1;
                self.chunk = 0;
                continue;
            };
            self.chunk += 1;
            self.remaining -= 1;

            let source = &self.arrays[self.array];
            let mut payload = Vec::new();
            match source.values() {
                Values::Integer(v) => write_le(&v[start..end], &mut payload),
                Values::Double(v) => write_le(&v[start..end], &mut payload),
            }
            return Some(C::build(source.element_type(), source.shape(), payload));
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<C: WireChunk> ExactSizeIterator for EncodedStream<C> {}

impl<C: WireChunk> FusedIterator for EncodedStream<C> {}

// ── Decoding ──────────────────────────────────────────────────────────────────

/// Outcome of feeding one chunk to a [`StreamDecoder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// The current array still expects chunks.
    NeedMore,
    /// Array `index` was validated; the next chunk starts array `index + 1`.
    ArrayComplete { index: usize },
    /// Every declared array was rebuilt.
    Done,
}

struct Assembly {
    element_type: ElementType,
    shape: Shape,
    values: Values,
    chunks: usize,
}

impl Assembly {
    fn new(element_type: ElementType, shape: Shape) -> Self {
        let values = match element_type {
            ElementType::Integer => Values::Integer(Vec::new()),
            ElementType::Double => Values::Double(Vec::new()),
        };
        Self {
            element_type,
            shape,
            values,
            chunks: 0,
        }
    }

    fn append(&mut self, payload: &[u8]) -> bool {
        match &mut self.values {
            Values::Integer(v) => append_le(payload, v),
            Values::Double(v) => append_le(payload, v),
        }
    }
}

enum DecodeState {
    Processing {
        index: usize,
        assembly: Option<Assembly>,
    },
    Done,
    Failed,
}

/// Rebuilds arrays from chunks, driven by transfer metadata.
///
/// The first chunk of each array fixes its element type and declared shape;
/// every later chunk of that array must repeat them. Any error poisons the
/// decoder and no arrays are returned.
pub struct StreamDecoder<C> {
    metadata: TransferMetadata,
    completed: Vec<NumericArray>,
    state: DecodeState,
    received: usize,
    _chunk: PhantomData<fn(C)>,
}

impl<C: WireChunk> StreamDecoder<C> {
    pub fn new(metadata: TransferMetadata) -> Result<Self, DecodeError> {
        if metadata.kind() != C::KIND {
            return Err(DecodeError::KindMismatch {
                expected: C::KIND,
                found: metadata.kind(),
            });
        }
        let state = if metadata.array_count() == 0 {
            DecodeState::Done
        } else {
            DecodeState::Processing {
                index: 0,
                assembly: None,
            }
        };
        Ok(Self {
            metadata,
            completed: Vec::new(),
            state,
            received: 0,
            _chunk: PhantomData,
        })
    }

    pub fn metadata(&self) -> &TransferMetadata {
        &self.metadata
    }

    pub fn is_done(&self) -> bool {
        matches!(self.state, DecodeState::Done)
    }

    /// Chunks accepted so far.
    pub fn received(&self) -> usize {
        self.received
    }

    pub fn push(&mut self, chunk: C) -> Result<Progress, DecodeError> {
        match self.step(&chunk) {
            Ok(progress) => {
                self.received += 1;
                Ok(progress)
            }
            Err(e) => {
                self.state = DecodeState::Failed;
                self.completed.clear();
                Err(e)
            }
        }
    }

    fn step(&mut self, chunk: &C) -> Result<Progress, DecodeError> {
        let (index, pending) = match &mut self.state {
            DecodeState::Processing { index, assembly } => (*index, assembly.take()),
            DecodeState::Done => {
                return Err(DecodeError::UnexpectedChunk {
                    expected: self.metadata.total_chunks(),
                })
            }
            DecodeState::Failed => return Err(DecodeError::AlreadyFailed),
        };

        let tag = chunk.element_tag();
        let element_type = ElementType::from_tag(tag).ok_or(DecodeError::UnknownElementType(tag))?;
        let shape = chunk.declared_shape()?;

        let mut assembly = match pending {
            None => Assembly::new(element_type, shape),
            Some(a) => {
                if a.element_type != element_type {
                    return Err(DecodeError::ElementTypeChanged {
                        array: index,
                        chunk: a.chunks,
                        expected: a.element_type,
                        found: element_type,
                    });
                }
                if a.shape != shape {
                    return Err(DecodeError::ShapeChanged {
                        array: index,
                        chunk: a.chunks,
                        expected: a.shape,
                        found: shape,
                    });
                }
                a
            }
        };

        let payload = chunk.payload();
        let width = element_type.width();
        if payload.len() % width != 0 {
            return Err(DecodeError::PartialElement {
                array: index,
                chunk: assembly.chunks,
                len: payload.len(),
                width,
            });
        }
        let declared = shape.element_count();
        let total = assembly.values.len() + payload.len() / width;
        if total > declared {
            return Err(DecodeError::SizeMismatch {
                array: index,
                expected: declared,
                actual: total,
            });
        }
        assembly.append(payload);
        assembly.chunks += 1;

        // Metadata construction guarantees an entry for every index below
        // array_count, and the state never advances past it.
        let expected_chunks = self.metadata.chunk_count(index).unwrap_or(0);
        if assembly.chunks < expected_chunks {
            self.state = DecodeState::Processing {
                index,
                assembly: Some(assembly),
            };
            return Ok(Progress::NeedMore);
        }

        let actual = assembly.values.len();
        let array = NumericArray::new(assembly.shape, assembly.values).map_err(|_| {
            DecodeError::SizeMismatch {
                array: index,
                expected: declared,
                actual,
            }
        })?;
        self.completed.push(array);

        if index + 1 == self.metadata.array_count() {
            self.state = DecodeState::Done;
            Ok(Progress::Done)
        } else {
            self.state = DecodeState::Processing {
                index: index + 1,
                assembly: None,
            };
            Ok(Progress::ArrayComplete { index })
        }
    }

    /// Close the stream and return the arrays in argument order.
    pub fn finish(self) -> Result<Vec<NumericArray>, DecodeError> {
        match self.state {
            DecodeState::Done => Ok(self.completed),
            DecodeState::Failed => Err(DecodeError::AlreadyFailed),
            DecodeState::Processing { .. } => Err(DecodeError::MissingChunks {
                received: self.received,
                expected: self.metadata.total_chunks(),
            }),
        }
    }
}

/// Pull-style decode: consume `chunks` and rebuild every declared array.
/// The iterator must end exactly after the last declared chunk.
pub fn decode<C, I>(metadata: TransferMetadata, chunks: I) -> Result<Vec<NumericArray>, DecodeError>
where
    C: WireChunk,
    I: IntoIterator<Item = C>,
{
    let mut decoder = StreamDecoder::new(metadata)?;
    let mut chunks = chunks.into_iter();
    while !decoder.is_done() {
        match chunks.next() {
            Some(chunk) => {
                decoder.push(chunk)?;
            }
            None => break,
        }
    }
    if decoder.is_done() && chunks.next().is_some() {
        return Err(DecodeError::UnexpectedChunk {
            expected: decoder.metadata().total_chunks(),
        });
    }
    decoder.finish()
}
