use eigenwire_core::codec::{DecodeError, EncodeError};
use eigenwire_core::metadata::MetadataError;

use crate::wire::{InvalidMetadataEntry, ReceiveError};

/// Errors surfaced by [`crate::ArrayClient`].
///
/// `Connect` means the server was never reached; `Status` means it was
/// reached and rejected the call. The rest are local protocol failures.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("unable to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: tonic::transport::Error,
    },
    #[error("invalid server address {0}")]
    InvalidAddress(String),
    #[error("server rejected call: {} ({:?})", .0.message(), .0.code())]
    Status(#[from] tonic::Status),
    #[error("cannot send arrays: {0}")]
    Encode(#[from] EncodeError),
    #[error("malformed response: {0}")]
    Decode(#[from] DecodeError),
    #[error("malformed response metadata: {0}")]
    Metadata(#[from] MetadataError),
    #[error(transparent)]
    InvalidMetadata(#[from] InvalidMetadataEntry),
    #[error("expected one result array, got {0}")]
    UnexpectedResultCount(usize),
}

impl From<ReceiveError> for ClientError {
    fn from(e: ReceiveError) -> Self {
        match e {
            ReceiveError::Decode(d) => ClientError::Decode(d),
            ReceiveError::Transport(s) => ClientError::Status(s),
        }
    }
}
