//! Message formatting for Telegram notifications.

use rust_decimal::Decimal;

use crate::domain::TokenWatch;
use crate::port::Event;

/// Format an event into a Telegram `MarkdownV2` message.
pub fn format_event_message(event: &Event) -> String {
    match event {
        Event::WatchStarted(e) => {
            let cap = market_cap_text(e.market_cap);
            format!(
                "🎉 *New Token Added to Watchlist\\!*\n\
                \n\
                📝 *Token Name:* {}\n\
                🌐 *Chain:* {}\n\
                🔗 *Contract Address:* `{}`\n\
                💰 *Current Market Cap:* {}\n\
                📈 *Buy Zone:* {}\n\
                {}",
                escape_markdown(&e.watch.name),
                escape_markdown(&e.watch.chain),
                escape_markdown(&e.watch.contract_address),
                escape_markdown(&cap),
                escape_markdown(&zone_text(&e.watch)),
                liquidity_and_tax_lines(&e.watch)
            )
        }
        Event::BuyZoneEntered(e) => format!(
            "🚀 *Buy Zone Entered\\!*\n\
            \n\
            🔹 *Token Name:* {}\n\
            🌐 *Chain:* {}\n\
            🔹 *Contract Address:* `{}`\n\
            💰 *Current Market Cap:* {}\n\
            📈 *Buy Zone:* {}",
            escape_markdown(&e.watch.name),
            escape_markdown(&e.watch.chain),
            escape_markdown(&e.watch.contract_address),
            escape_markdown(&money(e.market_cap)),
            escape_markdown(&zone_text(&e.watch)),
        ),
        Event::MultipleAchieved(e) => {
            let anchor = e
                .watch
                .initial_market_cap
                .map_or_else(|| "N/A".to_string(), money);
            format!(
                "🎉 *{}x Achieved\\!*\n\
                \n\
                🔹 *Token Name:* {}\n\
                🌐 *Chain:* {}\n\
                🔹 *Contract Address:* `{}`\n\
                💰 *Initial Market Cap:* {}\n\
                💰 *Current Market Cap:* {}\n\
                📈 *Gain:* {}x",
                e.multiple,
                escape_markdown(&e.watch.name),
                escape_markdown(&e.watch.chain),
                escape_markdown(&e.watch.contract_address),
                escape_markdown(&anchor),
                escape_markdown(&money(e.market_cap)),
                e.multiple
            )
        }
    }
}

fn liquidity_and_tax_lines(watch: &TokenWatch) -> String {
    format!(
        "🔐 *Liquidity Locked:* {}\n\
        🔏 *Ownership Renounced:* {}\n\
        🔥 *Liquidity Burned:* {}\n\
        💰 *Buy Tax:* {}%\n\
        💸 *Sell Tax:* {}%\n\
        💼 *Transfer Tax:* {}%",
        yes_no(watch.liquidity.locked),
        yes_no(watch.liquidity.ownership_renounced),
        yes_no(watch.liquidity.burned),
        escape_markdown(&watch.taxes.buy.to_string()),
        escape_markdown(&watch.taxes.sell.to_string()),
        escape_markdown(&watch.taxes.transfer.to_string()),
    )
}

/// "$1,234.56", or "N/A" for an unavailable cap.
pub fn market_cap_text(market_cap: Option<Decimal>) -> String {
    market_cap.map_or_else(|| "N/A".to_string(), money)
}

/// Dollar amount with thousands separators and two decimal places.
pub fn money(value: Decimal) -> String {
    let rounded = value.round_dp(2);
    let raw = format!("{rounded:.2}");
    let (int_part, frac_part) = raw.split_once('.').unwrap_or((raw.as_str(), "00"));

    let (sign, digits) = match int_part.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", int_part),
    };

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    format!("{sign}${grouped}.{frac_part}")
}

/// "yes"/"no" rendering for the liquidity flags.
pub fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

fn zone_text(watch: &TokenWatch) -> String {
    format!(
        "{} - {}",
        money(watch.buy_zone.low()),
        money(watch.buy_zone.high())
    )
}

/// Escape special characters for Telegram `MarkdownV2`.
pub fn escape_markdown(text: &str) -> String {
    let special_chars = [
        '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
    ];
    let mut result = String::with_capacity(text.len() * 2);

    for c in text.chars() {
        if special_chars.contains(&c) {
            result.push('\\');
        }
        result.push(c);
    }

    result
}
