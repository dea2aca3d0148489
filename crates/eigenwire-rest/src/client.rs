//! Client for the REST API: posts both operands, then asks for the result.

use serde_json::{json, Value};

use eigenwire_core::array::{ArrayKind, NumericArray, Shape};
use eigenwire_core::element::ElementType;
use eigenwire_core::json::{parse_array, to_json};

#[derive(Debug, thiserror::Error)]
pub enum RestClientError {
    #[error("could not connect to {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("server answered {status}: {message}")]
    Server { status: u16, message: String },
    #[error("{which} operand is not an array of doubles")]
    NotDouble { which: &'static str },
    #[error("operands have different shapes: {0} and {1}")]
    ShapeMismatch(Shape, Shape),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

/// Result of a REST operation. Vector multiplication yields a scalar.
#[derive(Debug, Clone, PartialEq)]
pub enum RestResult {
    Scalar(f64),
    Array(NumericArray),
}

#[derive(Clone, Copy)]
enum Verb {
    Add,
    Multiply,
}

impl Verb {
    fn path(self) -> &'static str {
        match self {
            Verb::Add => "add",
            Verb::Multiply => "multiply",
        }
    }

    fn result_name(self) -> &'static str {
        match self {
            Verb::Add => "addition",
            Verb::Multiply => "multiplication",
        }
    }
}

fn resource(kind: ArrayKind) -> &'static str {
    match kind {
        ArrayKind::Vector => "Vectors",
        ArrayKind::Matrix => "Matrices",
    }
}

pub struct RestClient {
    http: reqwest::Client,
    base: String,
}

impl RestClient {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            http: reqwest::Client::new(),
            base: format!("http://{host}:{port}"),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    pub async fn add(&self, a: &NumericArray, b: &NumericArray) -> Result<RestResult, RestClientError> {
        self.perform(a, b, Verb::Add).await
    }

    /// `a - b`, sent as `a + (-b)`.
    pub async fn subtract(&self, a: &NumericArray, b: &NumericArray) -> Result<RestResult, RestClientError> {
        self.perform(a, &b.negated(), Verb::Add).await
    }

    pub async fn multiply(&self, a: &NumericArray, b: &NumericArray) -> Result<RestResult, RestClientError> {
        self.perform(a, b, Verb::Multiply).await
    }

    async fn perform(
        &self,
        a: &NumericArray,
        b: &NumericArray,
        verb: Verb,
    ) -> Result<RestResult, RestClientError> {
        let kind = check_operands(a, b)?;
        let id1 = self.post(kind, a).await?;
        let id2 = self.post(kind, b).await?;

        let url = format!("{}/{}/{}", self.base, verb.path(), resource(kind));
        let body = self
            .send(&url, self.http.get(&url).json(&json!({ "id1": id1, "id2": id2 })))
            .await?;
        let key = format!("{}-{}", kind.singular(), verb.result_name());
        let result = body
            .get(&key)
            .and_then(|v| v.get("result"))
            .ok_or_else(|| RestClientError::MalformedResponse(format!("missing {key}.result")))?;

        match result {
            Value::Number(n) => n
                .as_f64()
                .map(RestResult::Scalar)
                .ok_or_else(|| RestClientError::MalformedResponse(n.to_string())),
            other => parse_array(other, ElementType::Double)
                .map(RestResult::Array)
                .map_err(|e| RestClientError::MalformedResponse(e.to_string())),
        }
    }

    async fn post(&self, kind: ArrayKind, array: &NumericArray) -> Result<i64, RestClientError> {
        let url = format!("{}/{}", self.base, resource(kind));
        let body = self
            .send(&url, self.http.post(&url).json(&json!({ "value": to_json(array) })))
            .await?;
        body.get(kind.singular())
            .and_then(|v| v.get("id"))
            .and_then(Value::as_i64)
            .ok_or_else(|| RestClientError::MalformedResponse(format!("missing {}.id", kind.singular())))
    }

    async fn send(&self, url: &str, request: reqwest::RequestBuilder) -> Result<Value, RestClientError> {
        let response = request.send().await.map_err(|source| {
            if source.is_connect() {
                RestClientError::Connect {
                    url: url.to_string(),
                    source,
                }
            } else {
                RestClientError::Http {
                    url: url.to_string(),
                    source,
                }
            }
        })?;

        let status = response.status();
        let body: Value = response.json().await.map_err(|source| RestClientError::Http {
            url: url.to_string(),
            source,
        })?;
        if !status.is_success() {
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("no message")
                .to_string();
            return Err(RestClientError::Server {
                status: status.as_u16(),
                message,
            });
        }
        Ok(body)
    }
}

/// Local checks before anything is sent: both operands must be double
/// arrays of the same shape.
fn check_operands(a: &NumericArray, b: &NumericArray) -> Result<ArrayKind, RestClientError> {
    if a.element_type() != ElementType::Double {
        return Err(RestClientError::NotDouble { which: "first" });
    }
    if b.element_type() != ElementType::Double {
        return Err(RestClientError::NotDouble { which: "second" });
    }
    if a.shape() != b.shape() {
        return Err(RestClientError::ShapeMismatch(a.shape(), b.shape()));
    }
    Ok(a.kind())
}
