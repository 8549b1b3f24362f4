//! Coercion of free-form numeric input into token counts and costs.
//!
//! Invalid input is never rejected: commas are stripped and anything that
//! does not parse becomes zero.

/// Parse a token count such as `"12,500"`.
///
/// Leading digits are taken (`"300k"` is 300); no leading digit yields 0 and
/// an overlong number saturates.
pub fn parse_token_count(raw: &str) -> u64 {
    let digits: String = raw
        .trim()
        .chars()
        .filter(|c| *c != ',')
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if digits.is_empty() {
        return 0;
    }
    digits.parse().unwrap_or(u64::MAX)
}

/// Parse a per-million-token cost, clamped to `>= 0` and rounded to cents.
pub fn parse_cost(raw: &str) -> f64 {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    match cleaned.parse::<f64>() {
        Ok(v) if v.is_finite() => ((v * 100.0).round() / 100.0).max(0.0),
        _ => 0.0,
    }
}

/// Render a count with thousands separators, e.g. `1,000,000`.
pub fn format_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
