//! Position tools (signed).

use super::{DefaultValue, ExchangeTool, Method, Param};

const CATEGORY: &str = "Product type - linear or inverse";
const POSITION_IDX: &str = "0=one-way, 1=hedge-buy, 2=hedge-sell";

fn category() -> Param {
    Param::string("category", "category", CATEGORY).required()
}

fn symbol() -> Param {
    Param::string("symbol", "symbol", "Trading pair e.g. BTCUSDT").required()
}

fn position_idx() -> Param {
    Param::integer("position_idx", "positionIdx", POSITION_IDX).or(DefaultValue::Int(0))
}

pub(super) fn tools() -> Vec<ExchangeTool> {
    vec![
        ExchangeTool::private(
            "get_positions",
            Method::Get,
            "/v5/position/list",
            "Get open positions with size, entry price, PnL, and liquidation price.",
        )
        .with_params([
            Param::string(
                "category",
                "category",
                "Product type - linear, inverse, option",
            )
            .required(),
            Param::string("symbol", "symbol", "Trading pair filter"),
            Param::string(
                "settle_coin",
                "settleCoin",
                "Settlement coin filter e.g. USDT, USDC",
            ),
            Param::integer("limit", "limit", "Results per page 1-200").or(DefaultValue::Int(20)),
        ]),
        ExchangeTool::private(
            "set_leverage",
            Method::Post,
            "/v5/position/set-leverage",
            "Set leverage for a symbol.",
        )
        .with_params([
            category(),
            symbol(),
            Param::string(
                "buy_leverage",
                "buyLeverage",
                "Buy side leverage e.g. \"10\"",
            )
            .required(),
            Param::string(
                "sell_leverage",
                "sellLeverage",
                "Sell side leverage e.g. \"10\"",
            )
            .required(),
        ]),
        ExchangeTool::private(
            "set_trading_stop",
            Method::Post,
            "/v5/position/trading-stop",
            "Set take profit, stop loss, or trailing stop for a position.",
        )
        .with_params([
            category(),
            symbol(),
            Param::string("take_profit", "takeProfit", "TP price (\"0\" to cancel)"),
            Param::string("stop_loss", "stopLoss", "SL price (\"0\" to cancel)"),
            Param::string(
                "tp_trigger_by",
                "tpTriggerBy",
                "LastPrice, IndexPrice, or MarkPrice",
            ),
            Param::string(
                "sl_trigger_by",
                "slTriggerBy",
                "LastPrice, IndexPrice, or MarkPrice",
            ),
            Param::string("tpsl_mode", "tpslMode", "Full (entire position) or Partial")
                .or(DefaultValue::Str("Full")),
            Param::string("tp_order_type", "tpOrderType", "Market or Limit"),
            Param::string("sl_order_type", "slOrderType", "Market or Limit"),
            Param::string("tp_limit_price", "tpLimitPrice", "Limit price for TP order"),
            Param::string("sl_limit_price", "slLimitPrice", "Limit price for SL order"),
            position_idx(),
        ]),
        ExchangeTool::private(
            "switch_position_mode",
            Method::Post,
            "/v5/position/switch-mode",
            "Switch between one-way and hedge position mode.",
        )
        .with_params([
            category(),
            Param::integer(
                "mode",
                "mode",
                "0=Merged (one-way), 3=Both Sides (hedge mode)",
            )
            .required(),
            Param::string("symbol", "symbol", "Trading pair (required for linear)"),
            Param::string("coin", "coin", "Coin (required for inverse)"),
        ]),
        ExchangeTool::private(
            "set_auto_add_margin",
            Method::Post,
            "/v5/position/set-auto-add-margin",
            "Enable or disable automatic margin top-up for a position.",
        )
        .with_params([
            category(),
            symbol(),
            Param::integer("auto_add_margin", "autoAddMargin", "0=disable, 1=enable").required(),
            position_idx(),
        ]),
        ExchangeTool::private(
            "get_closed_pnl",
            Method::Get,
            "/v5/position/closed-pnl",
            "Get closed profit and loss records.",
        )
        .with_params([
            category(),
            Param::string("symbol", "symbol", "Trading pair filter"),
            Param::integer("limit", "limit", "Results per page 1-100").or(DefaultValue::Int(20)),
            Param::integer("start_time", "startTime", "Start timestamp in milliseconds"),
            Param::integer("end_time", "endTime", "End timestamp in milliseconds"),
        ]),
    ]
}
