//! Binding between protobuf chunk messages and the core codec.

use tonic::metadata::{AsciiMetadataKey, AsciiMetadataValue, MetadataMap};
use tonic::{Status, Streaming};

use eigenwire_core::array::{ArrayKind, NumericArray, Shape};
use eigenwire_core::codec::{DecodeError, StreamDecoder, WireChunk};
use eigenwire_core::element::ElementType;
use eigenwire_core::metadata::{MetadataError, TransferMetadata};
use eigenwire_core::size::human_size;

use crate::proto::{Matrix, Vector};

fn dimension(value: u64) -> Result<usize, DecodeError> {
    usize::try_from(value).map_err(|_| DecodeError::DimensionOverflow(value))
}

impl WireChunk for Vector {
    const KIND: ArrayKind = ArrayKind::Vector;

    fn build(element_type: ElementType, shape: Shape, payload: Vec<u8>) -> Self {
        Vector {
            data_type: element_type.tag(),
            vector_size: shape.element_count() as u64,
            vector_as_chunk: payload,
        }
    }

    fn element_tag(&self) -> i32 {
        self.data_type
    }

    fn declared_shape(&self) -> Result<Shape, DecodeError> {
        Ok(Shape::Vector {
            len: dimension(self.vector_size)?,
        })
    }

    fn payload(&self) -> &[u8] {
        &self.vector_as_chunk
    }
}

impl WireChunk for Matrix {
    const KIND: ArrayKind = ArrayKind::Matrix;

    fn build(element_type: ElementType, shape: Shape, payload: Vec<u8>) -> Self {
        // The encoder only hands matrices to a matrix chunk.
        let (rows, cols) = match shape {
            Shape::Matrix { rows, cols } => (rows, cols),
            Shape::Vector { len } => (1, len),
        };
        Matrix {
            data_type: element_type.tag(),
            matrix_rows: rows as u64,
            matrix_cols: cols as u64,
            matrix_as_chunk: payload,
        }
    }

    fn element_tag(&self) -> i32 {
        self.data_type
    }

    fn declared_shape(&self) -> Result<Shape, DecodeError> {
        Ok(Shape::Matrix {
            rows: dimension(self.matrix_rows)?,
            cols: dimension(self.matrix_cols)?,
        })
    }

    fn payload(&self) -> &[u8] {
        &self.matrix_as_chunk
    }
}

// ── Metadata ──────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
#[error("cannot encode metadata entry {key}={value}")]
pub struct InvalidMetadataEntry {
    pub key: String,
    pub value: String,
}

/// Insert the transfer metadata pairs into gRPC call metadata.
pub fn write_metadata(
    metadata: &TransferMetadata,
    map: &mut MetadataMap,
) -> Result<(), InvalidMetadataEntry> {
    for (key, value) in metadata.to_pairs() {
        let parsed = AsciiMetadataKey::from_bytes(key.as_bytes())
            .ok()
            .zip(value.parse::<AsciiMetadataValue>().ok());
        match parsed {
            Some((k, v)) => {
                map.insert(k, v);
            }
            None => return Err(InvalidMetadataEntry { key, value }),
        }
    }
    Ok(())
}

/// Read transfer metadata for `kind` from gRPC call metadata.
pub fn read_metadata(kind: ArrayKind, map: &MetadataMap) -> Result<TransferMetadata, MetadataError> {
    TransferMetadata::parse(kind, |key| {
        map.get(key)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
    })
}

// ── Receiving ─────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ReceiveError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("stream failed: {}", .0.message())]
    Transport(#[from] Status),
}

/// Drain a chunk stream through a decoder. The stream must end right
/// after the last declared chunk.
pub async fn receive<C>(
    metadata: TransferMetadata,
    stream: &mut Streaming<C>,
) -> Result<Vec<NumericArray>, ReceiveError>
where
    C: WireChunk + Send + 'static,
{
    let mut decoder = StreamDecoder::<C>::new(metadata)?;
    while !decoder.is_done() {
        let Some(chunk) = stream.message().await? else {
            break;
        };
        tracing::debug!(
            chunk = decoder.received() + 1,
            of = decoder.metadata().total_chunks(),
            size = %human_size(chunk.payload().len() as u64),
            "chunk received"
        );
        decoder.push(chunk)?;
    }
    if decoder.is_done() && stream.message().await?.is_some() {
        return Err(DecodeError::UnexpectedChunk {
            expected: decoder.metadata().total_chunks(),
        }
        .into());
    }
    Ok(decoder.finish()?)
}
