//! Server side of `eigenwire.v1.ArrayOps`.
//!
//! Each streaming call reads its operands through the chunk decoder, runs
//! one [`Operation`] on the blocking pool, and streams the result back
//! with its chunk counts as response metadata. A semaphore bounds how many
//! calls are in flight at once.

use std::pin::Pin;
use std::sync::Arc;

use futures::Stream;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, OwnedSemaphorePermit, Semaphore};
use tokio_stream::wrappers::TcpListenerStream;
use tonic::{Request, Response, Status, Streaming};

use eigenwire_core::array::NumericArray;
use eigenwire_core::codec::{encode, WireChunk};
use eigenwire_core::config::message_limit;
use eigenwire_core::ops::Operation;
use eigenwire_core::size::human_size;

use crate::proto::array_ops_server::{ArrayOps, ArrayOpsServer};
use crate::proto::{HelloReply, HelloRequest, Matrix, Vector};
use crate::wire::{read_metadata, receive, write_metadata, ReceiveError};

pub type ChunkStream<C> = Pin<Box<dyn Stream<Item = Result<C, Status>> + Send>>;

#[derive(Clone)]
pub struct ArrayOpsService {
    workers: Arc<Semaphore>,
    max_chunk_bytes: usize,
}

impl ArrayOpsService {
    pub fn new(max_concurrent_calls: usize, max_chunk_bytes: usize) -> Self {
        Self {
            workers: Arc::new(Semaphore::new(max_concurrent_calls)),
            max_chunk_bytes,
        }
    }

    pub fn max_chunk_bytes(&self) -> usize {
        self.max_chunk_bytes
    }

    /// Stop admitting calls. In-flight calls finish; new ones get `UNAVAILABLE`.
    pub fn close(&self) {
        self.workers.close();
    }

    async fn dispatch<C>(
        &self,
        op: Operation,
        request: Request<Streaming<C>>,
    ) -> Result<Response<ChunkStream<C>>, Status>
    where
        C: WireChunk + Send + 'static,
    {
        let permit = self
            .workers
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| Status::unavailable("worker pool closed"))?;

        let metadata = read_metadata(C::KIND, request.metadata())
            .map_err(|e| Status::invalid_argument(e.to_string()))?;
        tracing::debug!(
            op = op.name(),
            arrays = metadata.array_count(),
            chunks = metadata.total_chunks(),
            "call started"
        );

        let mut stream = request.into_inner();
        let operands = receive(metadata, &mut stream).await.map_err(|e| match e {
            ReceiveError::Decode(d) => Status::data_loss(d.to_string()),
            ReceiveError::Transport(s) => s,
        })?;

        let result = tokio::task::spawn_blocking(move || op.apply(&operands))
            .await
            .map_err(|e| Status::internal(format!("worker failed: {e}")))?
            .map_err(|e| {
                tracing::debug!(op = op.name(), error = %e, "operation rejected");
                Status::failed_precondition(e.to_string())
            })?;

        stream_result(op, result, self.max_chunk_bytes, permit)
    }
}

/// Encode `result` as the response stream. Chunks are serialized lazily,
/// so `permit` lives as long as the stream does.
fn stream_result<C>(
    op: Operation,
    result: NumericArray,
    max_chunk_bytes: usize,
    permit: OwnedSemaphorePermit,
) -> Result<Response<ChunkStream<C>>, Status>
where
    C: WireChunk + Send + 'static,
{
    let (metadata, chunks) =
        encode::<C>(vec![result], max_chunk_bytes).map_err(|e| Status::internal(e.to_string()))?;
    tracing::info!(
        op = op.name(),
        chunks = metadata.total_chunks(),
        "call complete"
    );

    let outgoing = futures::stream::iter(chunks.map(move |chunk: C| {
        let _held = &permit;
        tracing::debug!(size = %human_size(chunk.payload().len() as u64), "chunk sent");
        Ok(chunk)
    }));
    let mut response = Response::new(Box::pin(outgoing) as ChunkStream<C>);
    write_metadata(&metadata, response.metadata_mut())
        .map_err(|e| Status::internal(e.to_string()))?;
    Ok(response)
}

#[tonic::async_trait]
impl ArrayOps for ArrayOpsService {
    async fn say_hello(
        &self,
        request: Request<HelloRequest>,
    ) -> Result<Response<HelloReply>, Status> {
        let name = request.into_inner().name;
        tracing::debug!(name, "hello");
        Ok(Response::new(HelloReply {
            message: format!("Hello, {name}!"),
        }))
    }

    type FlipVectorStream = ChunkStream<Vector>;

    async fn flip_vector(
        &self,
        request: Request<Streaming<Vector>>,
    ) -> Result<Response<Self::FlipVectorStream>, Status> {
        self.dispatch(Operation::Flip, request).await
    }

    type AddVectorsStream = ChunkStream<Vector>;

    async fn add_vectors(
        &self,
        request: Request<Streaming<Vector>>,
    ) -> Result<Response<Self::AddVectorsStream>, Status> {
        self.dispatch(Operation::Add, request).await
    }

    type MultiplyVectorsStream = ChunkStream<Vector>;

    async fn multiply_vectors(
        &self,
        request: Request<Streaming<Vector>>,
    ) -> Result<Response<Self::MultiplyVectorsStream>, Status> {
        self.dispatch(Operation::Dot, request).await
    }

    type AddMatricesStream = ChunkStream<Matrix>;

    async fn add_matrices(
        &self,
        request: Request<Streaming<Matrix>>,
    ) -> Result<Response<Self::AddMatricesStream>, Status> {
        self.dispatch(Operation::Add, request).await
    }

    type MultiplyMatricesStream = ChunkStream<Matrix>;

    async fn multiply_matrices(
        &self,
        request: Request<Streaming<Matrix>>,
    ) -> Result<Response<Self::MultiplyMatricesStream>, Status> {
        self.dispatch(Operation::MatMul, request).await
    }
}

/// Serve `service` on an already-bound listener until `shutdown` fires.
pub async fn serve(
    listener: TcpListener,
    service: ArrayOpsService,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<(), tonic::transport::Error> {
    let limit = message_limit(service.max_chunk_bytes());
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, max_message = %human_size(limit as u64), "gRPC server listening");
    }

    let server = ArrayOpsServer::new(service.clone())
        .max_decoding_message_size(limit)
        .max_encoding_message_size(limit);

    tonic::transport::Server::builder()
        .add_service(server)
        .serve_with_incoming_shutdown(TcpListenerStream::new(listener), async move {
            let _ = shutdown.recv().await;
            service.close();
            tracing::info!("gRPC server shutting down");
        })
        .await
}
