//! Order management tools (signed).

use super::{DefaultValue, ExchangeTool, Method, Param};

const CATEGORY: &str = "Product type - linear, inverse, spot, option";
const POSITION_IDX: &str = "0=one-way, 1=hedge-buy, 2=hedge-sell";

fn category() -> Param {
    Param::string("category", "category", CATEGORY).required()
}

fn order_ids() -> [Param; 2] {
    [
        Param::string("order_id", "orderId", "Order ID"),
        Param::string("order_link_id", "orderLinkId", "Custom order ID"),
    ]
}

pub(super) fn tools() -> Vec<ExchangeTool> {
    vec![
        ExchangeTool::private(
            "place_order",
            Method::Post,
            "/v5/order/create",
            "Place a new order (market, limit, conditional, with optional TP/SL).",
        )
        .with_params([
            category(),
            Param::string("symbol", "symbol", "Trading pair e.g. BTCUSDT").required(),
            Param::string("side", "side", "Buy or Sell").required(),
            Param::string("order_type", "orderType", "Market or Limit").required(),
            Param::string("qty", "qty", "Order quantity as string").required(),
            Param::string("price", "price", "Limit price (required for Limit orders)"),
            Param::string("time_in_force", "timeInForce", "GTC, IOC, FOK, or PostOnly"),
            Param::string(
                "trigger_price",
                "triggerPrice",
                "Trigger price for conditional orders",
            ),
            Param::integer(
                "trigger_direction",
                "triggerDirection",
                "1=price rises to trigger, 2=price falls to trigger",
            ),
            Param::string("take_profit", "takeProfit", "Take profit price"),
            Param::string("stop_loss", "stopLoss", "Stop loss price"),
            Param::boolean(
                "reduce_only",
                "reduceOnly",
                "Only reduce an existing position",
            ),
            Param::integer("position_idx", "positionIdx", POSITION_IDX).or(DefaultValue::Int(0)),
            Param::string("order_link_id", "orderLinkId", "Custom order ID"),
            Param::string("tp_order_type", "tpOrderType", "Market or Limit"),
            Param::string("sl_order_type", "slOrderType", "Market or Limit"),
            Param::string("tp_limit_price", "tpLimitPrice", "Limit price for TP order"),
            Param::string("sl_limit_price", "slLimitPrice", "Limit price for SL order"),
            Param::integer(
                "is_leverage",
                "isLeverage",
                "0=spot, 1=margin trading (spot category only)",
            ),
        ]),
        ExchangeTool::private(
            "cancel_order",
            Method::Post,
            "/v5/order/cancel",
            "Cancel an active order by order ID or custom order ID.",
        )
        .with_params([
            category(),
            Param::string("symbol", "symbol", "Trading pair").required(),
        ])
        .with_params(order_ids()),
        ExchangeTool::private(
            "cancel_all_orders",
            Method::Post,
            "/v5/order/cancel-all",
            "Cancel all open orders for a category, optionally for one symbol.",
        )
        .with_params([
            category(),
            Param::string("symbol", "symbol", "Trading pair filter"),
        ]),
        ExchangeTool::private(
            "amend_order",
            Method::Post,
            "/v5/order/amend",
            "Modify an active order's quantity, price, trigger or TP/SL.",
        )
        .with_params([
            category(),
            Param::string("symbol", "symbol", "Trading pair").required(),
        ])
        .with_params(order_ids())
        .with_params([
            Param::string("qty", "qty", "New quantity"),
            Param::string("price", "price", "New price"),
            Param::string("trigger_price", "triggerPrice", "New trigger price"),
            Param::string("take_profit", "takeProfit", "New take profit price"),
            Param::string("stop_loss", "stopLoss", "New stop loss price"),
        ]),
        ExchangeTool::private(
            "get_open_orders",
            Method::Get,
            "/v5/order/realtime",
            "Get open and partially filled orders.",
        )
        .with_params([
            category(),
            Param::string("symbol", "symbol", "Trading pair filter"),
            Param::integer("limit", "limit", "Results per page 1-50").or(DefaultValue::Int(20)),
        ])
        .with_params(order_ids()),
        ExchangeTool::private(
            "get_order_history",
            Method::Get,
            "/v5/order/history",
            "Get historical orders (filled, cancelled, rejected).",
        )
        .with_params([
            category(),
            Param::string("symbol", "symbol", "Trading pair filter"),
            Param::string(
                "order_status",
                "orderStatus",
                "Filled, Cancelled, Rejected, etc.",
            ),
            Param::integer("limit", "limit", "Results per page 1-50").or(DefaultValue::Int(20)),
            Param::integer("start_time", "startTime", "Start timestamp in milliseconds"),
            Param::integer("end_time", "endTime", "End timestamp in milliseconds"),
        ]),
        ExchangeTool::private(
            "batch_place_orders",
            Method::Post,
            "/v5/order/create-batch",
            "Place multiple orders in a single request (up to 20 orders).",
        )
        .with_params([
            category(),
            Param::array(
                "orders",
                "request",
                "Order objects. Each must have: symbol, side, orderType, qty. \
                 Optional: price, timeInForce, positionIdx, etc.",
            )
            .required(),
        ]),
        ExchangeTool::private(
            "batch_cancel_orders",
            Method::Post,
            "/v5/order/cancel-batch",
            "Cancel multiple orders in a single request.",
        )
        .with_params([
            category(),
            Param::array(
                "orders",
                "request",
                "Objects with symbol and either orderId or orderLinkId",
            )
            .required(),
        ]),
    ]
}
