//! The response envelope returned by every endpoint.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};

/// Application-level outcome of an operation.
///
/// Transport status is always HTTP 200; this field carries the real outcome.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
    /// Partial success.
    Fail,
    Loading,
    #[default]
    Unknown,
}

impl std::fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResponseStatus::Success => write!(f, "success"),
            ResponseStatus::Error => write!(f, "error"),
            ResponseStatus::Fail => write!(f, "fail"),
            ResponseStatus::Loading => write!(f, "loading"),
            ResponseStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// Sort direction for list queries.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Comparison applied by a [`DataFilter`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FilterOperator {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "<=")]
    Lte,
    #[serde(rename = "like")]
    Like,
    #[serde(rename = "not like")]
    NotLike,
    #[serde(rename = "in")]
    In,
    #[serde(rename = "not in")]
    NotIn,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FilterValue {
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
    Numbers(Vec<serde_json::Number>),
    Texts(Vec<String>),
}

/// One `field operator value` condition of a list query.
///
/// ```json
/// { "field": "status", "operator": "in", "value": ["draft", "active"] }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DataFilter {
    pub field: String,
    pub operator: FilterOperator,
    pub value: FilterValue,
}

/// Paging metadata attached to list responses.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IndexMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changed_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<SortOrder>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<Vec<DataFilter>>,
}

/// Normalised result of a server operation.
///
/// ```json
/// { "status": "error", "message": "", "code": "TOKEN_ERROR", "expose": false }
/// ```
///
/// `internal` is diagnostic data for in-process callers. It is never
/// serialised, so it cannot leave the server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T = Value> {
    pub status: ResponseStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Machine-readable error code; see [`crate::codes`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    /// Whether `message` is meant for the end user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expose: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Map<String, Value>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_meta: Option<IndexMeta>,

    #[serde(skip)]
    pub internal: Option<Value>,
}

impl<T> Envelope<T> {
    fn with_status(status: ResponseStatus) -> Self {
        Self {
            status,
            data: None,
            message: None,
            code: None,
            expose: None,
            meta: None,
            index_meta: None,
            internal: None,
        }
    }

    /// `status: success` carrying `data`.
    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            ..Self::with_status(ResponseStatus::Success)
        }
    }

    /// `status: success` without data.
    pub fn ok() -> Self {
        Self::with_status(ResponseStatus::Success)
    }

    /// `status: error` with the given client-facing message.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::with_status(ResponseStatus::Error)
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_expose(mut self, expose: bool) -> Self {
        self.expose = Some(expose);
        self
    }

    pub fn with_meta(mut self, meta: Map<String, Value>) -> Self {
        self.meta = Some(meta);
        self
    }

    pub fn with_index_meta(mut self, index_meta: IndexMeta) -> Self {
        self.index_meta = Some(index_meta);
        self
    }

    pub fn with_internal(mut self, internal: Value) -> Self {
        self.internal = Some(internal);
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }

    /// Transform the payload, keeping every other field.
    pub fn map_data<U>(self, f: impl FnOnce(T) -> U) -> Envelope<U> {
        match self.try_map_data(|data| Ok::<_, std::convert::Infallible>(f(data))) {
            Ok(env) => env,
            Err(never) => match never {},
        }
    }

    /// Fallible [`Envelope::map_data`].
    pub fn try_map_data<U, E>(self, f: impl FnOnce(T) -> Result<U, E>) -> Result<Envelope<U>, E> {
        Ok(Envelope {
            status: self.status,
            data: self.data.map(f).transpose()?,
            message: self.message,
            code: self.code,
            expose: self.expose,
            meta: self.meta,
            index_meta: self.index_meta,
            internal: self.internal,
        })
    }
}

impl<T: Serialize> Envelope<T> {
    /// Erase the payload type to JSON.
    pub fn into_value(self) -> Result<Envelope<Value>, serde_json::Error> {
        self.try_map_data(serde_json::to_value)
    }
}

impl Envelope<Value> {
    /// Decode a JSON payload into a concrete type.
    pub fn decode_data<T: DeserializeOwned>(self) -> Result<Envelope<T>, serde_json::Error> {
        self.try_map_data(serde_json::from_value)
    }
}
