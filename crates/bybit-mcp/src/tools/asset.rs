//! Asset tools (signed).

use super::{DefaultValue, ExchangeTool, Method, Param};

fn records(name: &'static str, path: &'static str, description: &'static str) -> ExchangeTool {
    ExchangeTool::private(name, Method::Get, path, description).with_params([
        Param::string("coin", "coin", "Coin filter e.g. USDT"),
        Param::integer("limit", "limit", "Results per page 1-50").or(DefaultValue::Int(50)),
        Param::integer("start_time", "startTime", "Start timestamp in milliseconds"),
        Param::integer("end_time", "endTime", "End timestamp in milliseconds"),
    ])
}

pub(super) fn tools() -> Vec<ExchangeTool> {
    vec![
        ExchangeTool::private(
            "get_coin_balance",
            Method::Get,
            "/v5/asset/transfer/query-account-coins-balance",
            "Get coin balances for an account type.",
        )
        .with_params([
            Param::string(
                "account_type",
                "accountType",
                "UNIFIED, CONTRACT, SPOT, INVESTMENT, OPTION, or FUND",
            )
            .or(DefaultValue::Str("UNIFIED")),
            Param::string("coin", "coin", "Coin name e.g. USDT, BTC"),
            Param::string(
                "member_id",
                "memberId",
                "Sub-account member ID (master account only)",
            ),
            Param::integer(
                "with_bonus",
                "withBonus",
                "0=exclude bonus, 1=include bonus",
            ),
        ]),
        ExchangeTool::private(
            "internal_transfer",
            Method::Post,
            "/v5/asset/transfer/inter-transfer",
            "Transfer funds between account types (e.g. FUND to UNIFIED).",
        )
        .with_params([
            Param::string(
                "transfer_id",
                "transferId",
                "Custom UUID (auto-generated if omitted)",
            )
            .or(DefaultValue::Uuid),
            Param::string("coin", "coin", "Coin to transfer e.g. USDT").required(),
            Param::string("amount", "amount", "Amount to transfer as string").required(),
            Param::string(
                "from_account_type",
                "fromAccountType",
                "Source account type",
            )
            .required(),
            Param::string(
                "to_account_type",
                "toAccountType",
                "Destination account type",
            )
            .required(),
        ]),
        records(
            "get_deposit_records",
            "/v5/asset/deposit/query-record",
            "Get deposit history.",
        ),
        records(
            "get_withdrawal_records",
            "/v5/asset/withdraw/query-record",
            "Get withdrawal history.",
        ),
    ]
}
