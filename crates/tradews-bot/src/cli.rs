//! Command-line arguments.

use crate::error::{AppError, AppResult};
use clap::{Args as ClapArgs, Parser, Subcommand};
use tradews_core::{
    CancelAllOrders, CancelOrder, ClientOrderId, OrderSide, OrderType, PlaceOrder, Price, Size,
    TimeInForce,
};

/// Authenticated trading WebSocket client
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Configuration file path (can also be set via TRADEWS_CONFIG env var)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Args {
    /// The command to run; `run` when none is given.
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Run)
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Stay connected and authorized, logging every event until Ctrl-C
    Run,
    /// Place one order
    Place(PlaceArgs),
    /// Cancel one order by exchange or client order ID
    Cancel {
        #[arg(long)]
        symbol: String,
        #[arg(long, conflicts_with = "client_order_id")]
        order_id: Option<i64>,
        #[arg(long)]
        client_order_id: Option<String>,
        /// Seconds to keep logging responses after sending
        #[arg(long, default_value_t = 5)]
        wait_secs: u64,
    },
    /// Cancel every open order on a symbol
    CancelAll {
        #[arg(long)]
        symbol: String,
        #[arg(long, default_value_t = 5)]
        wait_secs: u64,
    },
}

#[derive(ClapArgs, Debug, Clone, PartialEq)]
pub struct PlaceArgs {
    #[arg(long)]
    pub symbol: String,
    /// BUY or SELL
    #[arg(long)]
    pub side: OrderSide,
    #[arg(long = "type", default_value = "LIMIT")]
    pub order_type: OrderType,
    #[arg(long)]
    pub quantity: Size,
    #[arg(long)]
    pub price: Option<Price>,
    /// GTC, IOC, FOK or GTX; defaults to GTC for limit orders
    #[arg(long)]
    pub tif: Option<TimeInForce>,
    #[arg(long)]
    pub client_order_id: Option<String>,
    #[arg(long, default_value_t = 5)]
    pub wait_secs: u64,
}

impl PlaceArgs {
    pub fn into_order(self) -> AppResult<PlaceOrder> {
        if !self.quantity.is_positive() {
            return Err(AppError::InvalidArgs("quantity must be positive".to_string()));
        }

        let mut order = match (self.order_type.requires_price(), self.price) {
            (true, None) => {
                return Err(AppError::InvalidArgs(format!(
                    "{} orders need --price",
                    self.order_type
                )))
            }
            (true, Some(price)) => {
                let mut order = PlaceOrder::limit(self.symbol, self.side, self.quantity, price);
                order.order_type = self.order_type;
                order
            }
            (false, price) => {
                let mut order = PlaceOrder::market(self.symbol, self.side, self.quantity);
                order.order_type = self.order_type;
                order.price = price;
                order
            }
        };

        if let Some(tif) = self.tif {
            order.time_in_force = Some(tif);
        }
        if let Some(id) = self.client_order_id {
            order.new_client_order_id = ClientOrderId::from_string(id);
        }
        Ok(order)
    }
}

/// Build a cancel request from `cancel` arguments.
pub fn cancel_request(
    symbol: String,
    order_id: Option<i64>,
    client_order_id: Option<String>,
) -> AppResult<CancelOrder> {
    match (order_id, client_order_id) {
        (Some(id), _) => Ok(CancelOrder::by_order_id(symbol, id)),
        (None, Some(id)) => Ok(CancelOrder::by_client_order_id(symbol, id)),
        (None, None) => Err(AppError::InvalidArgs(
            "cancel needs --order-id or --client-order-id".to_string(),
        )),
    }
}

pub fn cancel_all_request(symbol: String) -> CancelAllOrders {
    CancelAllOrders::new(symbol)
}
