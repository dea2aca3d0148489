use crate::*;

use eigenwire_core::array::NumericArray;
use eigenwire_rest::{RestClientError, RestResult};
use serde_json::{json, Value};

fn vector(values: &[f64]) -> NumericArray {
    NumericArray::vector(values.to_vec())
}

fn matrix(rows: &[&[f64]]) -> NumericArray {
    NumericArray::from_rows(rows.iter().map(|r| r.to_vec()).collect()).unwrap()
}

#[tokio::test]
async fn vector_arithmetic() {
    let servers = Servers::start().await.unwrap();
    let client = servers.rest_client();
    let a = vector(&[1.0, 2.0, 3.0, 4.0]);
    let b = vector(&[5.0, 4.0, 2.0, 0.0]);

    assert_eq!(
        client.add(&a, &b).await.unwrap(),
        RestResult::Array(vector(&[6.0, 6.0, 5.0, 4.0]))
    );
    assert_eq!(
        client.subtract(&a, &b).await.unwrap(),
        RestResult::Array(vector(&[-4.0, -2.0, 1.0, 4.0]))
    );
    assert_eq!(client.multiply(&a, &b).await.unwrap(), RestResult::Scalar(19.0));
}

#[tokio::test]
async fn matrix_arithmetic() {
    let servers = Servers::start().await.unwrap();
    let client = servers.rest_client();
    let a = matrix(&[&[1.0, 2.0], &[3.0, 4.0]]);
    let b = matrix(&[&[5.0, 4.0], &[2.0, 0.0]]);

    assert_eq!(
        client.add(&a, &b).await.unwrap(),
        RestResult::Array(matrix(&[&[6.0, 6.0], &[5.0, 4.0]]))
    );
    assert_eq!(
        client.subtract(&a, &b).await.unwrap(),
        RestResult::Array(matrix(&[&[-4.0, -2.0], &[1.0, 4.0]]))
    );
    assert_eq!(
        client.multiply(&a, &b).await.unwrap(),
        RestResult::Array(matrix(&[&[9.0, 4.0], &[23.0, 12.0]]))
    );
}

#[tokio::test]
async fn payloads_over_two_megabytes_are_accepted() {
    let servers = Servers::start().await.unwrap();
    let client = servers.rest_client();

    // 400k doubles render to well over 2 MB of JSON.
    let values: Vec<f64> = (0..400_000).map(|i| i as f64 + 0.25).collect();
    let body = serde_json::to_vec(&json!({ "value": &values })).unwrap();
    assert!(body.len() > 2 * 1024 * 1024, "{}", body.len());

    let a = NumericArray::vector(values.clone());
    let sum = client.add(&a, &a).await.unwrap();
    let expected: Vec<f64> = values.iter().map(|v| v * 2.0).collect();
    assert_eq!(sum, RestResult::Array(NumericArray::vector(expected)));
}

#[tokio::test]
async fn posted_ids_increase() {
    let servers = Servers::start().await.unwrap();
    let http = reqwest::Client::new();

    let mut ids = Vec::new();
    for value in [json!([1.0, 2.0]), json!([3.0, 4.0])] {
        let resp = http
            .post(servers.rest_url("/Vectors"))
            .json(&json!({ "value": value }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 201);
        let body: Value = resp.json().await.unwrap();
        ids.push(body["vector"]["id"].as_i64().unwrap());
    }
    assert!(ids[1] > ids[0], "{ids:?}");
}

#[tokio::test]
async fn unknown_ids_are_a_bad_request() {
    let servers = Servers::start().await.unwrap();
    let resp = reqwest::Client::new()
        .get(servers.rest_url("/add/Matrices"))
        .json(&json!({ "id1": 41, "id2": 42 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(
        body["message"],
        "Unexpected error... No values in the database for ID 41 and type Matrix."
    );
}

#[tokio::test]
async fn missing_body_is_a_bad_request() {
    let servers = Servers::start().await.unwrap();
    let resp = reqwest::Client::new()
        .post(servers.rest_url("/Vectors"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(
        body["message"],
        "No JSON-format (i.e. application/json) body was provided in the request."
    );
}

#[tokio::test]
async fn server_side_shape_errors_surface_as_server_errors() {
    let servers = Servers::start().await.unwrap();
    let client = servers.rest_client();
    let a = matrix(&[&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]]);

    let err = client.multiply(&a, &a).await.unwrap_err();
    assert!(
        matches!(err, RestClientError::Server { status: 400, .. }),
        "{err}"
    );
}

#[tokio::test]
async fn unreachable_api_is_a_connect_error() {
    let client = eigenwire_rest::RestClient::new(HOST, closed_port());
    let v = vector(&[1.0]);
    let err = client.add(&v, &v).await.unwrap_err();
    assert!(matches!(err, RestClientError::Connect { .. }), "{err}");
}
