//! Display formatting for amounts stored in minor currency units

/// Symbols for the ISO 4217 codes we bill in
const CURRENCY_SYMBOLS: &[(&str, &str)] = &[
    ("USD", "$"),
    ("EUR", "€"),
    ("GBP", "£"),
    ("JPY", "¥"),
    ("CAD", "CA$"),
    ("AUD", "A$"),
    ("CHF", "CHF "),
    ("INR", "₹"),
    ("KRW", "₩"),
];

/// Currencies without a fractional display unit
const ZERO_DECIMAL: &[&str] = &["JPY", "KRW"];

/// Format `amount` (cents etc.) for display: `format_minor_units(123456, "usd")` -> `"$1,234.56"`
///
/// Unknown codes are rendered as `"XYZ 1,234.56"`.
pub fn format_minor_units(amount: i64, currency: &str) -> String {
    format_with(amount, currency, |_| true)
}

/// Like [`format_minor_units`], but symbols the PDF base-14 fonts cannot
/// draw fall back to the ISO code: `"INR 1,234.56"`
pub fn format_minor_units_win_ansi(amount: i64, currency: &str) -> String {
    format_with(amount, currency, |symbol| symbol.chars().all(is_win_ansi))
}

/// Characters representable in WinAnsiEncoding
fn is_win_ansi(c: char) -> bool {
    c.is_ascii() || ('\u{A0}'..='\u{FF}').contains(&c) || c == '€'
}

fn format_with(amount: i64, currency: &str, accept_symbol: impl Fn(&str) -> bool) -> String {
    let code = currency.trim().to_ascii_uppercase();
    let negative = amount < 0;
    let abs = amount.unsigned_abs();

    let number = if ZERO_DECIMAL.contains(&code.as_str()) {
        // Whole units, rounded half up on the absolute value
        group_thousands((abs + 50) / 100)
    } else {
        format!("{}.{:02}", group_thousands(abs / 100), abs % 100)
    };

    let prefix = CURRENCY_SYMBOLS
        .iter()
        .find(|(c, symbol)| *c == code && accept_symbol(*symbol))
        .map(|(_, symbol)| symbol.to_string())
        .unwrap_or_else(|| format!("{} ", code));

    format!("{}{}{}", if negative { "-" } else { "" }, prefix, number)
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
