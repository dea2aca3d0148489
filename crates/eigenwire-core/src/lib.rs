//! eigenwire-core: array types, chunk planning, and the chunked stream codec.
//! The gRPC and REST crates depend on this one; it performs no I/O.

pub mod array;
pub mod codec;
pub mod config;
pub mod element;
pub mod json;
pub mod metadata;
pub mod ops;
pub mod plan;
pub mod size;

pub use array::{ArrayError, ArrayKind, NumericArray, Shape, Values};
pub use codec::{decode, encode, DecodeError, EncodeError, EncodedStream, StreamDecoder, WireChunk};
pub use element::{Element, ElementType};
pub use metadata::{MetadataError, TransferMetadata};
pub use ops::{OpError, Operation};
pub use plan::{ChunkPlan, PlanError, MAX_CHUNK_BYTES};
