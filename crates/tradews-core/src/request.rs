//! Order request parameters for the trading WebSocket API.
//!
//! Each request serializes to the `params` object of an outbound envelope.
//! A zero `timestamp` is stamped with the current time when the request is
//! turned into parameters.

use crate::decimal::{Price, Size};
use crate::error::{CoreError, Result};
use crate::order::{ClientOrderId, OrderSide, OrderType, PositionSide, ResponseType, TimeInForce};
use serde::Serialize;
use serde_json::{Map, Value};

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn to_params<T: Serialize>(request: &T) -> Result<Map<String, Value>> {
    match serde_json::to_value(request)? {
        Value::Object(map) => Ok(map),
        other => Err(CoreError::InvalidRequest(format!(
            "request did not serialize to an object: {other}"
        ))),
    }
}

fn stamp(timestamp: &mut i64) {
    if *timestamp == 0 {
        *timestamp = now_ms();
    }
}

/// Parameters of an `order.place` request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrder {
    pub new_client_order_id: ClientOrderId,
    pub symbol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Price>,
    pub quantity: Size,
    pub side: OrderSide,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_in_force: Option<TimeInForce>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_order_resp_type: Option<ResponseType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position_side: Option<PositionSide>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reduce_only: Option<bool>,
    pub timestamp: i64,
}

impl PlaceOrder {
    /// A limit order with GTC time in force and a fresh client order ID.
    pub fn limit(symbol: impl Into<String>, side: OrderSide, quantity: Size, price: Price) -> Self {
        Self {
            new_client_order_id: ClientOrderId::new(),
            symbol: symbol.into(),
            price: Some(price),
            quantity,
            side,
            order_type: OrderType::Limit,
            time_in_force: Some(TimeInForce::GoodTilCancelled),
            new_order_resp_type: None,
            position_side: None,
            reduce_only: None,
            timestamp: 0,
        }
    }

    /// A market order with a fresh client order ID.
    pub fn market(symbol: impl Into<String>, side: OrderSide, quantity: Size) -> Self {
        Self {
            new_client_order_id: ClientOrderId::new(),
            symbol: symbol.into(),
            price: None,
            quantity,
            side,
            order_type: OrderType::Market,
            time_in_force: None,
            new_order_resp_type: None,
            position_side: None,
            reduce_only: None,
            timestamp: 0,
        }
    }

    /// Serialize into request parameters, stamping the timestamp if unset.
    pub fn into_params(mut self) -> Result<Map<String, Value>> {
        stamp(&mut self.timestamp);
        to_params(&self)
    }
}

/// Parameters of an `order.cancel` request.
///
/// At least one of `order_id` and `orig_client_order_id` must be set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelOrder {
    pub symbol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orig_client_order_id: Option<String>,
    pub timestamp: i64,
}

impl CancelOrder {
    /// Cancel by the client order ID chosen at placement.
    pub fn by_client_order_id(symbol: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            order_id: None,
            orig_client_order_id: Some(id.into()),
            timestamp: 0,
        }
    }

    /// Cancel by exchange order ID.
    pub fn by_order_id(symbol: impl Into<String>, order_id: i64) -> Self {
        Self {
            symbol: symbol.into(),
            order_id: Some(order_id),
            orig_client_order_id: None,
            timestamp: 0,
        }
    }

    /// Serialize into request parameters, stamping the timestamp if unset.
    pub fn into_params(mut self) -> Result<Map<String, Value>> {
        if self.order_id.is_none() && self.orig_client_order_id.is_none() {
            return Err(CoreError::InvalidRequest(
                "cancel needs orderId or origClientOrderId".to_string(),
            ));
        }
        stamp(&mut self.timestamp);
        to_params(&self)
    }
}

/// Parameters of an `openOrders.cancelAll` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelAllOrders {
    pub symbol: String,
    pub timestamp: i64,
}

impl CancelAllOrders {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            timestamp: 0,
        }
    }

    /// Serialize into request parameters, stamping the timestamp if unset.
    pub fn into_params(mut self) -> Result<Map<String, Value>> {
        stamp(&mut self.timestamp);
        to_params(&self)
    }
}
