use crate::*;

use eigenwire_core::array::{NumericArray, Shape};
use eigenwire_grpc::ClientError;
use tonic::Code;

fn status_code(err: &ClientError) -> Option<Code> {
    match err {
        ClientError::Status(status) => Some(status.code()),
        _ => None,
    }
}

#[tokio::test]
async fn hello_round_trip() {
    let servers = Servers::start().await.unwrap();
    let mut client = servers.grpc_client().await.unwrap();
    assert_eq!(client.say_hello("eigenwire").await.unwrap(), "Hello, eigenwire!");
}

#[tokio::test]
async fn integer_vectors_add() {
    let servers = Servers::start().await.unwrap();
    let mut client = servers.grpc_client().await.unwrap();

    let sum = client
        .add_vectors(vec![
            NumericArray::vector(vec![1i32, 2, 3, 4]),
            NumericArray::vector(vec![5i32, 4, 2, 0]),
        ])
        .await
        .unwrap();
    assert_eq!(sum.shape(), Shape::Vector { len: 4 });
    assert_eq!(sum.into_vec::<i32>().unwrap(), vec![6, 6, 5, 4]);
}

#[tokio::test]
async fn integer_dot_product_is_one_element() {
    let servers = Servers::start().await.unwrap();
    let mut client = servers.grpc_client().await.unwrap();

    let dot = client
        .multiply_vectors(
            NumericArray::vector(vec![1i32, 2, 3, 4]),
            NumericArray::vector(vec![5i32, 4, 2, 0]),
        )
        .await
        .unwrap();
    assert_eq!(dot.into_vec::<i32>().unwrap(), vec![19]);
}

#[tokio::test]
async fn double_matrix_product() {
    let servers = Servers::start().await.unwrap();
    let mut client = servers.grpc_client().await.unwrap();

    let a = NumericArray::from_rows(vec![vec![1.0f64, 2.0], vec![3.0, 4.0]]).unwrap();
    let b = NumericArray::from_rows(vec![vec![5.0f64, 4.0], vec![2.0, 0.0]]).unwrap();
    let product = client.multiply_matrices(a, b).await.unwrap();
    assert_eq!(product.shape(), Shape::Matrix { rows: 2, cols: 2 });
    assert_eq!(product.into_vec::<f64>().unwrap(), vec![9.0, 4.0, 23.0, 12.0]);
}

#[tokio::test]
async fn four_vectors_sum_to_zero() {
    let servers = Servers::start().await.unwrap();
    let mut client = servers.grpc_client().await.unwrap();

    let sum = client
        .add_vectors(vec![
            NumericArray::vector(vec![1.5f64, -2.0, 3.0]),
            NumericArray::vector(vec![-1.5f64, 2.0, -3.0]),
            NumericArray::vector(vec![4.0f64, 0.5, -7.0]),
            NumericArray::vector(vec![-4.0f64, -0.5, 7.0]),
        ])
        .await
        .unwrap();
    assert_eq!(sum.into_vec::<f64>().unwrap(), vec![0.0; 3]);
}

#[tokio::test]
async fn four_integer_vectors_cancel() {
    let servers = Servers::start().await.unwrap();
    let mut client = servers.grpc_client().await.unwrap();

    let sum = client
        .add_vectors(vec![
            NumericArray::vector(vec![1i32, 2, 3, 4]),
            NumericArray::vector(vec![5i32, 4, 2, 0]),
            NumericArray::vector(vec![-5i32, -4, -2, 0]),
            NumericArray::vector(vec![-1i32, -2, -3, -4]),
        ])
        .await
        .unwrap();
    assert_eq!(sum.into_vec::<i32>().unwrap(), vec![0, 0, 0, 0]);
}

#[tokio::test]
async fn flip_reverses() {
    let servers = Servers::start().await.unwrap();
    let mut client = servers.grpc_client().await.unwrap();

    let flipped = client
        .flip_vector(NumericArray::vector(vec![1.0f64, 2.0, 3.0]))
        .await
        .unwrap();
    assert_eq!(flipped.into_vec::<f64>().unwrap(), vec![3.0, 2.0, 1.0]);
}

#[tokio::test]
async fn large_vector_spans_many_chunks() {
    let servers = Servers::start().await.unwrap();
    let mut client = servers.grpc_client().await.unwrap();

    // 5M i32s is 20 MB, well over the 3 MiB chunk limit in each direction.
    let n = 5_000_000;
    let data: Vec<i32> = (0..n).collect();
    let flipped = client
        .flip_vector(NumericArray::vector(data))
        .await
        .unwrap();
    let flipped = flipped.into_vec::<i32>().unwrap();
    assert_eq!(flipped.len(), n as usize);
    assert_eq!(flipped[0], n - 1);
    assert_eq!(flipped[flipped.len() - 1], 0);
    assert!(flipped.windows(2).all(|w| w[0] == w[1] + 1));
}

#[tokio::test]
async fn small_chunk_limit_still_reassembles() {
    let servers = Servers::start_with_limit(64).await.unwrap();
    let mut client = servers.grpc_client().await.unwrap();

    let rows: Vec<Vec<f64>> = (0..7)
        .map(|r| (0..7).map(|c| (r * 7 + c) as f64).collect())
        .collect();
    let a = NumericArray::from_rows(rows.clone()).unwrap();
    let b = NumericArray::from_rows(rows).unwrap();
    let sum = client.add_matrices(vec![a, b]).await.unwrap();
    assert_eq!(sum.shape(), Shape::Matrix { rows: 7, cols: 7 });
    let expected: Vec<f64> = (0..49).map(|i| 2.0 * i as f64).collect();
    assert_eq!(sum.into_vec::<f64>().unwrap(), expected);
}

#[tokio::test]
async fn mismatched_shapes_fail_precondition() {
    let servers = Servers::start().await.unwrap();
    let mut client = servers.grpc_client().await.unwrap();

    let err = client
        .add_vectors(vec![
            NumericArray::vector(vec![1.0f64, 2.0]),
            NumericArray::vector(vec![1.0f64, 2.0, 3.0]),
        ])
        .await
        .unwrap_err();
    assert_eq!(status_code(&err), Some(Code::FailedPrecondition), "{err}");
}

#[tokio::test]
async fn non_square_product_fails_precondition() {
    let servers = Servers::start().await.unwrap();
    let mut client = servers.grpc_client().await.unwrap();

    let a = NumericArray::matrix(2, 3, vec![1i32; 6]).unwrap();
    let b = NumericArray::matrix(2, 3, vec![1i32; 6]).unwrap();
    let err = client.multiply_matrices(a, b).await.unwrap_err();
    assert_eq!(status_code(&err), Some(Code::FailedPrecondition), "{err}");
}

#[tokio::test]
async fn mixed_element_types_fail_precondition() {
    let servers = Servers::start().await.unwrap();
    let mut client = servers.grpc_client().await.unwrap();

    let err = client
        .multiply_vectors(
            NumericArray::vector(vec![1i32, 2]),
            NumericArray::vector(vec![1.0f64, 2.0]),
        )
        .await
        .unwrap_err();
    assert_eq!(status_code(&err), Some(Code::FailedPrecondition), "{err}");
}

#[tokio::test]
async fn connecting_to_nothing_is_a_connect_error() {
    let port = closed_port();
    let err = ArrayClient::connect(HOST, port, CONNECT_TIMEOUT)
        .await
        .err()
        .unwrap();
    assert!(matches!(err, ClientError::Connect { .. }), "{err}");
}
