//! Client side of `eigenwire.v1.ArrayOps`: arrays in, array out.

use std::time::Duration;

use tonic::transport::{Channel, Endpoint};
use tonic::{Request, Response, Streaming};

use eigenwire_core::array::NumericArray;
use eigenwire_core::codec::{encode, EncodedStream, WireChunk};
use eigenwire_core::config::message_limit;
use eigenwire_core::plan::MAX_CHUNK_BYTES;

use crate::error::ClientError;
use crate::proto::array_ops_client::ArrayOpsClient;
use crate::proto::{HelloRequest, Matrix, Vector};
use crate::wire::{read_metadata, receive, write_metadata};

type ChunkRequest<C> = Request<futures::stream::Iter<EncodedStream<C>>>;

/// One connection to an ArrayOps server. Calls run one at a time.
pub struct ArrayClient {
    inner: ArrayOpsClient<Channel>,
    max_chunk_bytes: usize,
}

impl ArrayClient {
    /// Connect with the default 3 MiB chunk limit.
    pub async fn connect(host: &str, port: u16, timeout: Duration) -> Result<Self, ClientError> {
        Self::connect_with_limit(host, port, timeout, MAX_CHUNK_BYTES).await
    }

    pub async fn connect_with_limit(
        host: &str,
        port: u16,
        timeout: Duration,
        max_chunk_bytes: usize,
    ) -> Result<Self, ClientError> {
        let addr = format!("http://{host}:{port}");
        let endpoint = Endpoint::from_shared(addr.clone())
            .map_err(|_| ClientError::InvalidAddress(addr.clone()))?
            .connect_timeout(timeout);
        let channel = endpoint
            .connect()
            .await
            .map_err(|source| ClientError::Connect {
                addr: addr.clone(),
                source,
            })?;
        tracing::debug!(%addr, "connected");

        let limit = message_limit(max_chunk_bytes);
        let inner = ArrayOpsClient::new(channel)
            .max_decoding_message_size(limit)
            .max_encoding_message_size(limit);
        Ok(Self {
            inner,
            max_chunk_bytes,
        })
    }

    pub async fn say_hello(&mut self, name: &str) -> Result<String, ClientError> {
        let reply = self
            .inner
            .say_hello(HelloRequest { name: name.to_string() })
            .await?;
        Ok(reply.into_inner().message)
    }

    pub async fn flip_vector(&mut self, vector: NumericArray) -> Result<NumericArray, ClientError> {
        let request = self.prepare::<Vector>(vec![vector])?;
        let response = self.inner.flip_vector(request).await?;
        single_result(response).await
    }

    /// Element-wise sum of one or more vectors.
    pub async fn add_vectors(&mut self, vectors: Vec<NumericArray>) -> Result<NumericArray, ClientError> {
        let request = self.prepare::<Vector>(vectors)?;
        let response = self.inner.add_vectors(request).await?;
        single_result(response).await
    }

    /// Dot product, returned as a one-element vector.
    pub async fn multiply_vectors(
        &mut self,
        a: NumericArray,
        b: NumericArray,
    ) -> Result<NumericArray, ClientError> {
        let request = self.prepare::<Vector>(vec![a, b])?;
        let response = self.inner.multiply_vectors(request).await?;
        single_result(response).await
    }

    pub async fn add_matrices(&mut self, matrices: Vec<NumericArray>) -> Result<NumericArray, ClientError> {
        let request = self.prepare::<Matrix>(matrices)?;
        let response = self.inner.add_matrices(request).await?;
        single_result(response).await
    }

    pub async fn multiply_matrices(
        &mut self,
        a: NumericArray,
        b: NumericArray,
    ) -> Result<NumericArray, ClientError> {
        let request = self.prepare::<Matrix>(vec![a, b])?;
        let response = self.inner.multiply_matrices(request).await?;
        single_result(response).await
    }

    fn prepare<C: WireChunk>(&self, arrays: Vec<NumericArray>) -> Result<ChunkRequest<C>, ClientError> {
        let (metadata, chunks) = encode::<C>(arrays, self.max_chunk_bytes)?;
        tracing::debug!(
            arrays = metadata.array_count(),
            chunks = metadata.total_chunks(),
            "sending"
        );
        let mut request = Request::new(futures::stream::iter(chunks));
        write_metadata(&metadata, request.metadata_mut())?;
        Ok(request)
    }
}

async fn single_result<C>(response: Response<Streaming<C>>) -> Result<NumericArray, ClientError>
where
    C: WireChunk + Send + 'static,
{
    let metadata = read_metadata(C::KIND, response.metadata())?;
    let mut stream = response.into_inner();
    let mut arrays = receive(metadata, &mut stream).await?;
    if arrays.len() != 1 {
        return Err(ClientError::UnexpectedResultCount(arrays.len()));
    }
    arrays
        .pop()
        .ok_or(ClientError::UnexpectedResultCount(0))
}
