//! Account tools (signed).

use super::{DefaultValue, ExchangeTool, Method, Param};

pub(super) fn tools() -> Vec<ExchangeTool> {
    vec![
        ExchangeTool::private(
            "get_wallet_balance",
            Method::Get,
            "/v5/account/wallet-balance",
            "Get wallet balance, equity, and margin info for the unified account.",
        )
        .with_params([
            Param::string("account_type", "accountType", "UNIFIED or CONTRACT")
                .or(DefaultValue::Str("UNIFIED")),
            Param::string(
                "coin",
                "coin",
                "Coin filter e.g. USDT (comma-separated for multiple)",
            ),
        ]),
        ExchangeTool::private(
            "get_fee_rate",
            Method::Get,
            "/v5/account/fee-rate",
            "Get trading fee rates for a product type.",
        )
        .with_params([
            Param::string(
                "category",
                "category",
                "Product type - spot, linear, inverse, option",
            )
            .required(),
            Param::string("symbol", "symbol", "Trading pair filter"),
        ]),
        ExchangeTool::private(
            "get_account_info",
            Method::Get,
            "/v5/account/info",
            "Get account information (margin mode, account type, SMP group, etc.).",
        ),
        ExchangeTool::private(
            "get_transaction_log",
            Method::Get,
            "/v5/account/transaction-log",
            "Get transaction log (trades, funding, transfers, etc.).",
        )
        .with_params([
            Param::string("category", "category", "Product type filter"),
            Param::string("coin", "coin", "Coin filter e.g. USDT"),
            Param::string(
                "type",
                "type",
                "TRANSFER_IN, TRANSFER_OUT, TRADE, FEE, etc.",
            ),
            Param::integer("limit", "limit", "Results per page 1-50").or(DefaultValue::Int(20)),
            Param::integer("start_time", "startTime", "Start timestamp in milliseconds"),
            Param::integer("end_time", "endTime", "End timestamp in milliseconds"),
        ]),
    ]
}
