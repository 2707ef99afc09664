//! Wire message types.
//!
//! Outbound requests are `{"id", "method", "params", ...extras}` envelopes.
//! Inbound responses echo the request `id` and carry either a `result`
//! (object or array) or an `error`, optionally with `rateLimits`.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// API method names.
pub mod methods {
    pub const SESSION_LOGON: &str = "session.logon";
    pub const ORDER_PLACE: &str = "order.place";
    pub const ORDER_CANCEL: &str = "order.cancel";
    pub const OPEN_ORDERS_CANCEL_ALL: &str = "openOrders.cancelAll";
}

/// Order statuses routed to the order consumer.
pub const ROUTED_ORDER_STATUSES: [&str; 2] = ["NEW", "CANCELED"];

// ============================================================================
// Request (Outgoing)
// ============================================================================

/// Outbound request envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestEnvelope {
    pub id: String,
    pub method: String,
    pub params: Map<String, Value>,
    /// Additional top-level fields merged into the envelope.
    #[serde(flatten)]
    pub extras: BTreeMap<String, String>,
}

impl RequestEnvelope {
    /// Reserved envelope keys that extras may not replace.
    pub const RESERVED_KEYS: [&'static str; 3] = ["id", "method", "params"];

    pub fn new(id: String, method: impl Into<String>, params: Map<String, Value>) -> Self {
        Self {
            id,
            method: method.into(),
            params,
            extras: BTreeMap::new(),
        }
    }

    /// Merge extras, skipping any that collide with reserved keys.
    ///
    /// Returns the names of the skipped keys.
    pub fn with_extras(mut self, extras: BTreeMap<String, String>) -> (Self, Vec<String>) {
        let mut skipped = Vec::new();
        for (key, value) in extras {
            if Self::RESERVED_KEYS.contains(&key.as_str()) {
                skipped.push(key);
            } else {
                self.extras.insert(key, value);
            }
        }
        (self, skipped)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

// ============================================================================
// Response (Incoming)
// ============================================================================

/// Accepts a string, number or null request ID.
fn deserialize_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(other) => Ok(Some(other.to_string())),
    }
}

/// Request-weight or order-count usage reported by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RateLimit {
    pub rate_limit_type: String,
    pub interval: String,
    pub interval_num: u32,
    pub limit: u32,
    pub count: u32,
}

/// Error body of a failed request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ErrorDetail {
    pub code: i64,
    pub msg: String,
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.msg, self.code)
    }
}

/// A request the server rejected.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    #[serde(default, deserialize_with = "deserialize_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<u16>,
    pub error: ErrorDetail,
    #[serde(default)]
    pub rate_limits: Vec<RateLimit>,
}

/// Session details returned by a logon, status or logout request.
///
/// `api_key` and `authorized_since` are null once the session is logged out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoginResult {
    pub api_key: Option<String>,
    pub authorized_since: Option<i64>,
    pub connected_since: i64,
    pub return_rate_limits: bool,
    pub server_time: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    #[serde(default, deserialize_with = "deserialize_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<u16>,
    pub result: LoginResult,
    #[serde(default)]
    pub rate_limits: Vec<RateLimit>,
}

/// One order as reported by the exchange.
///
/// Prices and quantities stay in their decimal string form. Fields the
/// struct does not name are kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrderResult {
    pub order_id: i64,
    pub symbol: String,
    pub status: String,
    pub client_order_id: String,
    pub orig_client_order_id: String,
    pub price: String,
    pub avg_price: String,
    pub orig_qty: String,
    pub executed_qty: String,
    pub cum_qty: String,
    pub cum_quote: String,
    pub time_in_force: String,
    #[serde(rename = "type")]
    pub order_type: String,
    pub reduce_only: bool,
    pub close_position: bool,
    pub side: String,
    pub position_side: String,
    pub stop_price: String,
    pub working_type: String,
    pub price_protect: bool,
    pub orig_type: String,
    pub price_match: String,
    pub self_trade_prevention_mode: String,
    pub good_till_date: i64,
    pub update_time: i64,
    /// Trailing-stop activation price, when set.
    pub activate_price: Option<String>,
    /// Trailing-stop callback rate, when set.
    pub price_rate: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    #[serde(default, deserialize_with = "deserialize_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<u16>,
    pub result: OrderResult,
    #[serde(default)]
    pub rate_limits: Vec<RateLimit>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderArrayResponse {
    #[serde(default, deserialize_with = "deserialize_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<u16>,
    pub result: Vec<OrderResult>,
    #[serde(default)]
    pub rate_limits: Vec<RateLimit>,
}

// ============================================================================
// Classification
// ============================================================================

/// Textual shape of an inbound payload, decided before decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeShape {
    /// `result` is absent or an object.
    Scalar,
    /// `result` is a list.
    Array,
}

impl EnvelopeShape {
    pub fn detect(text: &str) -> Self {
        if text.contains(r#""result":["#) || text.contains(r#""result": ["#) {
            Self::Array
        } else {
            Self::Scalar
        }
    }
}

/// Why a well-formed message reached no consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    /// Scalar envelope without an object `result`.
    NoResult,
    /// Order result with a status outside [`ROUTED_ORDER_STATUSES`].
    FilteredStatus(String),
    /// Object `result` that is neither a logon nor an order.
    UnrecognizedResult,
    /// Array envelope with an empty or missing list.
    EmptyArray,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoResult => write!(f, "no result object"),
            Self::FilteredStatus(status) => write!(f, "order status {status} not routed"),
            Self::UnrecognizedResult => write!(f, "unrecognized result"),
            Self::EmptyArray => write!(f, "empty result list"),
        }
    }
}

/// A classified inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Error(ApiError),
    Login(LoginResponse),
    Order(OrderResponse),
    OrderArray(OrderArrayResponse),
    Dropped(DropReason),
}

/// Classify one inbound payload.
///
/// Rules, first match wins:
/// 1. a non-null `error` is an API error
/// 2. scalar: `result.authorizedSince` present is a session report; a
///    non-null value confirms a logon, null means logged out
/// 3. scalar: `result.status` of `NEW` or `CANCELED` is an order response;
///    any other status is dropped
/// 4. array: a non-empty `result` list is an order array response, with no
///    status filtering
///
/// Anything else is dropped. Malformed JSON, or a payload whose fields do not
/// fit the chosen type, is a decode error.
pub fn classify(shape: EnvelopeShape, text: &str) -> serde_json::Result<Inbound> {
    let value: Value = serde_json::from_str(text)?;

    if value.get("error").is_some_and(|e| !e.is_null()) {
        return Ok(Inbound::Error(serde_json::from_value(value)?));
    }

    match shape {
        EnvelopeShape::Scalar => {
            let Some(result) = value.get("result").and_then(Value::as_object) else {
                return Ok(Inbound::Dropped(DropReason::NoResult));
            };
            if result.contains_key("authorizedSince") {
                return Ok(Inbound::Login(serde_json::from_value(value)?));
            }
            match result.get("status").and_then(Value::as_str) {
                Some(status) if ROUTED_ORDER_STATUSES.contains(&status) => {
                    Ok(Inbound::Order(serde_json::from_value(value)?))
                }
                Some(status) => Ok(Inbound::Dropped(DropReason::FilteredStatus(
                    status.to_string(),
                ))),
                None => Ok(Inbound::Dropped(DropReason::UnrecognizedResult)),
            }
        }
        EnvelopeShape::Array => match value.get("result").and_then(Value::as_array) {
            Some(list) if !list.is_empty() => {
                Ok(Inbound::OrderArray(serde_json::from_value(value)?))
            }
            _ => Ok(Inbound::Dropped(DropReason::EmptyArray)),
        },
    }
}

/// Detect the shape of `text` and classify it.
pub fn classify_text(text: &str) -> serde_json::Result<Inbound> {
    classify(EnvelopeShape::detect(text), text)
}
