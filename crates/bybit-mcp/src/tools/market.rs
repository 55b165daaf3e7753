//! Market data tools (public, no credentials needed).

use super::{DefaultValue, ExchangeTool, Param};

const CATEGORY: &str = "Product type - spot, linear, inverse, or option";
const SYMBOL: &str = "Trading pair e.g. BTCUSDT";
const INTERVAL: &str = "Candle interval - 1,3,5,15,30,60,120,240,360,720,D,W,M";

fn category_default_linear() -> Param {
    Param::string("category", "category", CATEGORY).or(DefaultValue::Str("linear"))
}

fn klines(name: &'static str, path: &'static str, description: &'static str) -> ExchangeTool {
    ExchangeTool::public(name, path, description).with_params([
        Param::string("symbol", "symbol", SYMBOL).required(),
        Param::string("interval", "interval", INTERVAL).required(),
        category_default_linear(),
        Param::integer("limit", "limit", "Results per page 1-1000").or(DefaultValue::Int(200)),
        Param::integer("start", "start", "Start timestamp in milliseconds"),
        Param::integer("end", "end", "End timestamp in milliseconds"),
    ])
}

pub(super) fn tools() -> Vec<ExchangeTool> {
    vec![
        ExchangeTool::public(
            "get_tickers",
            "/v5/market/tickers",
            "Get real-time ticker data including price, volume, 24h change, and funding rate.",
        )
        .with_params([
            Param::string("category", "category", CATEGORY).required(),
            Param::string(
                "symbol",
                "symbol",
                "Trading pair e.g. BTCUSDT (required for option)",
            ),
        ]),
        klines(
            "get_klines",
            "/v5/market/kline",
            "Get candlestick/kline historical data.",
        ),
        ExchangeTool::public(
            "get_orderbook",
            "/v5/market/orderbook",
            "Get order book depth data (bids and asks).",
        )
        .with_params([
            Param::string("symbol", "symbol", SYMBOL).required(),
            category_default_linear(),
            Param::integer(
                "limit",
                "limit",
                "Depth limit - spot:1-200, linear/inverse:1-500, option:1-25",
            )
            .or(DefaultValue::Int(25)),
        ]),
        ExchangeTool::public(
            "get_recent_trades",
            "/v5/market/recent-trade",
            "Get recent public trades for a symbol.",
        )
        .with_params([
            Param::string("symbol", "symbol", SYMBOL).required(),
            category_default_linear(),
            Param::integer("limit", "limit", "Number of trades 1-1000").or(DefaultValue::Int(60)),
        ]),
        ExchangeTool::public(
            "get_instruments",
            "/v5/market/instruments-info",
            "Get instrument specifications (tick size, lot size, leverage, trading rules).",
        )
        .with_params([
            Param::string("category", "category", CATEGORY).required(),
            Param::string("symbol", "symbol", "Trading pair (returns all if omitted)"),
            Param::string(
                "status",
                "status",
                "Trading, Settling, Delivering, or Closed",
            ),
            Param::integer("limit", "limit", "Results per page").or(DefaultValue::Int(500)),
        ]),
        ExchangeTool::public(
            "get_funding_rate_history",
            "/v5/market/funding/history",
            "Get historical funding rate data.",
        )
        .with_params([
            Param::string("symbol", "symbol", SYMBOL).required(),
            category_default_linear(),
            Param::integer("limit", "limit", "Results per page 1-200").or(DefaultValue::Int(200)),
            Param::integer("start_time", "startTime", "Start timestamp in milliseconds"),
            Param::integer("end_time", "endTime", "End timestamp in milliseconds"),
        ]),
        klines(
            "get_mark_price_kline",
            "/v5/market/mark-price-kline",
            "Get mark price kline/candlestick data.",
        ),
        ExchangeTool::public(
            "get_open_interest",
            "/v5/market/open-interest",
            "Get historical open interest data.",
        )
        .with_params([
            Param::string("symbol", "symbol", SYMBOL).required(),
            Param::string(
                "interval_time",
                "intervalTime",
                "Interval - 5min, 15min, 30min, 1h, 4h, 1d",
            )
            .required(),
            category_default_linear(),
            Param::integer("limit", "limit", "Results per page 1-200").or(DefaultValue::Int(200)),
            Param::integer("start_time", "startTime", "Start timestamp in milliseconds"),
            Param::integer("end_time", "endTime", "End timestamp in milliseconds"),
        ]),
        ExchangeTool::public(
            "get_server_time",
            "/v5/market/time",
            "Get Bybit server time. Useful for checking connectivity and time sync.",
        ),
    ]
}
