//! HTTP handlers: array resources and operations on stored arrays.
//!
//! Bodies are read as raw bytes and parsed here, so every malformed
//! request gets the same `400 {"message": ...}` shape.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Map, Value};

use eigenwire_core::array::{ArrayKind, NumericArray};
use eigenwire_core::element::ElementType;
use eigenwire_core::json::{parse_array, to_json};
use eigenwire_core::ops::Operation;
use eigenwire_core::size::human_size;

use crate::store::{ArrayStore, StoreError};

#[derive(Clone)]
pub struct ApiState {
    pub store: ArrayStore,
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        tracing::error!(error = %e, "store failure");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "message": self.message }))).into_response()
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Run a handler body on the blocking pool. SQLite access and the math
/// both block.
async fn blocking<T, F>(work: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
{
    tokio::task::spawn_blocking(work).await.map_err(|e| ApiError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        message: format!("worker failed: {e}"),
    })?
}

const NO_BODY: &str = "No JSON-format (i.e. application/json) body was provided in the request.";

fn json_object(body: &Bytes) -> Result<Map<String, Value>, ApiError> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        _ => Err(ApiError::bad_request(NO_BODY)),
    }
}

fn capitalized(kind: ArrayKind) -> &'static str {
    match kind {
        ArrayKind::Vector => "Vector",
        ArrayKind::Matrix => "Matrix",
    }
}

#[derive(Clone, Copy)]
enum RestOp {
    Addition,
    Multiplication,
}

impl RestOp {
    fn name(self) -> &'static str {
        match self {
            RestOp::Addition => "addition",
            RestOp::Multiplication => "multiplication",
        }
    }

    fn operation(self, kind: ArrayKind) -> Operation {
        match (self, kind) {
            (RestOp::Addition, _) => Operation::Add,
            (RestOp::Multiplication, ArrayKind::Vector) => Operation::Dot,
            (RestOp::Multiplication, ArrayKind::Matrix) => Operation::MatMul,
        }
    }
}

// ── POST /Vectors, /Matrices ──────────────────────────────────────────────────

fn post_array(
    state: &ApiState,
    kind: ArrayKind,
    body: &Bytes,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let map = json_object(body)?;
    let value = map.get("value").filter(|v| !v.is_null()).ok_or_else(|| {
        ApiError::bad_request(format!(
            "No {} has been provided. Expected key: 'value'.",
            kind.singular()
        ))
    })?;

    let array = parse_array(value, ElementType::Double).map_err(|e| {
        ApiError::bad_request(format!(
            "Error encountered when transforming 'value' into a numeric array: {e}"
        ))
    })?;
    if array.kind() != kind {
        return Err(ApiError::bad_request(format!(
            "Expected a {}, got a {}.",
            kind.singular(),
            array.shape()
        )));
    }

    let id = state.store.insert(kind, &to_json(&array))?;
    tracing::info!(
        kind = kind.singular(),
        id,
        size = %human_size(body.len() as u64),
        "array stored"
    );
    Ok((StatusCode::CREATED, Json(json!({ kind.singular(): { "id": id } }))))
}

pub async fn handle_post_vector(
    State(state): State<ApiState>,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    blocking(move || post_array(&state, ArrayKind::Vector, &body)).await
}

pub async fn handle_post_matrix(
    State(state): State<ApiState>,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    blocking(move || post_array(&state, ArrayKind::Matrix, &body)).await
}

// ── GET /{add,multiply}/{Vectors,Matrices} ────────────────────────────────────

fn load(state: &ApiState, id: i64, kind: ArrayKind) -> Result<NumericArray, ApiError> {
    let missing = || {
        ApiError::bad_request(format!(
            "Unexpected error... No values in the database for ID {id} and type {}.",
            capitalized(kind)
        ))
    };
    let value = state.store.fetch(id, kind)?.ok_or_else(missing)?;
    parse_array(&value, ElementType::Double).map_err(|_| missing())
}

fn run_operation(
    state: &ApiState,
    kind: ArrayKind,
    op: RestOp,
    body: &Bytes,
) -> Result<Json<Value>, ApiError> {
    let map = json_object(body)?;
    let ids = map
        .get("id1")
        .and_then(Value::as_i64)
        .zip(map.get("id2").and_then(Value::as_i64));
    let Some((id1, id2)) = ids else {
        return Err(ApiError::bad_request(format!(
            "Arguments for {} operation with {} are not provided. Expected keys: 'id1', 'id2'.",
            op.name(),
            kind.singular()
        )));
    };

    let a = load(state, id1, kind)?;
    let b = load(state, id2, kind)?;
    let result = op
        .operation(kind)
        .apply(&[a, b])
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    // Vector multiplication is a dot product and answers with a scalar.
    let rendered = match (op, kind) {
        (RestOp::Multiplication, ArrayKind::Vector) => result
            .as_slice::<f64>()
            .and_then(|s| s.first().copied())
            .map(Value::from)
            .unwrap_or(Value::Null),
        _ => to_json(&result),
    };
    tracing::info!(kind = kind.singular(), op = op.name(), id1, id2, "operation served");

    let key = format!("{}-{}", kind.singular(), op.name());
    Ok(Json(json!({ key: { "result": rendered } })))
}

pub async fn handle_add_vectors(State(state): State<ApiState>, body: Bytes) -> Result<Json<Value>, ApiError> {
    blocking(move || run_operation(&state, ArrayKind::Vector, RestOp::Addition, &body)).await
}

pub async fn handle_multiply_vectors(
    State(state): State<ApiState>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    blocking(move || run_operation(&state, ArrayKind::Vector, RestOp::Multiplication, &body)).await
}

pub async fn handle_add_matrices(State(state): State<ApiState>, body: Bytes) -> Result<Json<Value>, ApiError> {
    blocking(move || run_operation(&state, ArrayKind::Matrix, RestOp::Addition, &body)).await
}

pub async fn handle_multiply_matrices(
    State(state): State<ApiState>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    blocking(move || run_operation(&state, ArrayKind::Matrix, RestOp::Multiplication, &body)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> ApiState {
        ApiState {
            store: ArrayStore::open_in_memory().unwrap(),
        }
    }

    fn body(v: Value) -> Bytes {
        Bytes::from(serde_json::to_vec(&v).unwrap())
    }

    fn post(state: &ApiState, kind: ArrayKind, value: Value) -> i64 {
        let (status, Json(resp)) = post_array(state, kind, &body(json!({ "value": value }))).unwrap();
        assert_eq!(status, StatusCode::CREATED);
        resp[kind.singular()]["id"].as_i64().unwrap()
    }

    #[test]
    fn vector_dot_product_is_a_scalar() {
        let s = state();
        let id1 = post(&s, ArrayKind::Vector, json!([1, 2, 3, 4]));
        let id2 = post(&s, ArrayKind::Vector, json!([5, 4, 2, 0]));
        let Json(resp) = run_operation(
            &s,
            ArrayKind::Vector,
            RestOp::Multiplication,
            &body(json!({ "id1": id1, "id2": id2 })),
        )
        .unwrap();
        assert_eq!(resp, json!({ "vector-multiplication": { "result": 19.0 } }));
    }

    #[test]
    fn matrix_product() {
        let s = state();
        let id1 = post(&s, ArrayKind::Matrix, json!([[1, 2], [3, 4]]));
        let id2 = post(&s, ArrayKind::Matrix, json!([[5, 4], [2, 0]]));
        let Json(resp) = run_operation(
            &s,
            ArrayKind::Matrix,
            RestOp::Multiplication,
            &body(json!({ "id1": id1, "id2": id2 })),
        )
        .unwrap();
        assert_eq!(
            resp,
            json!({ "matrix-multiplication": { "result": [[9.0, 4.0], [23.0, 12.0]] } })
        );
    }

    #[test]
    fn post_errors_carry_messages() {
        let s = state();
        let err = post_array(&s, ArrayKind::Matrix, &Bytes::new()).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, NO_BODY);

        let err = post_array(&s, ArrayKind::Matrix, &body(json!({ "mycar": 2 }))).unwrap_err();
        assert_eq!(err.message, "No matrix has been provided. Expected key: 'value'.");

        let err = post_array(&s, ArrayKind::Matrix, &body(json!({ "value": "a string" }))).unwrap_err();
        assert!(err.message.starts_with("Error encountered when transforming"));

        let err = post_array(&s, ArrayKind::Matrix, &body(json!({ "value": [1, 2] }))).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn operation_errors_carry_messages() {
        let s = state();
        let id = post(&s, ArrayKind::Matrix, json!([[1, 2], [3, 4]]));

        let err = run_operation(&s, ArrayKind::Matrix, RestOp::Addition, &Bytes::new()).unwrap_err();
        assert_eq!(err.message, NO_BODY);

        let err = run_operation(
            &s,
            ArrayKind::Matrix,
            RestOp::Addition,
            &body(json!({ "id1": id, "value": "a string" })),
        )
        .unwrap_err();
        assert_eq!(
            err.message,
            "Arguments for addition operation with matrix are not provided. Expected keys: 'id1', 'id2'."
        );

        let err = run_operation(
            &s,
            ArrayKind::Matrix,
            RestOp::Addition,
            &body(json!({ "id1": 0, "id2": id })),
        )
        .unwrap_err();
        assert_eq!(
            err.message,
            "Unexpected error... No values in the database for ID 0 and type Matrix."
        );
    }

    #[test]
    fn mismatched_shapes_are_rejected() {
        let s = state();
        let id1 = post(&s, ArrayKind::Vector, json!([1, 2]));
        let id2 = post(&s, ArrayKind::Vector, json!([1, 2, 3]));
        let err = run_operation(
            &s,
            ArrayKind::Vector,
            RestOp::Addition,
            &body(json!({ "id1": id1, "id2": id2 })),
        )
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn zero_width_matrix_stays_a_matrix() {
        let s = state();
        let (status, Json(resp)) =
            handle_post_matrix(State(s.clone()), body(json!({ "value": [[], []] })))
                .await
                .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        let id = resp["matrix"]["id"].as_i64().unwrap();

        let Json(resp) = handle_add_matrices(State(s), body(json!({ "id1": id, "id2": id })))
            .await
            .unwrap();
        assert_eq!(resp, json!({ "matrix-addition": { "result": [[], []] } }));
    }

    #[tokio::test]
    async fn handler_errors_come_back_from_the_blocking_pool() {
        let err = handle_multiply_vectors(State(state()), body(json!({ "id1": 1, "id2": 2 })))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(
            err.message,
            "Unexpected error... No values in the database for ID 1 and type Vector."
        );
    }
}
