use std::fmt;

/// Money is a single floating-point currency unit. Balances and amounts share
/// this type; the sign of a transaction amount carries its direction.
pub type Amount = f64;

/// Format an amount with two decimals.
/// Example: 1500.0 -> "1500.00", -300.5 -> "-300.50"
pub fn format_amount(amount: Amount) -> String {
    // Avoid rendering "-0.00" for values that round to zero.
    let rounded = (amount * 100.0).round() / 100.0;
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    format!("{:.2}", rounded)
}

/// Parse a user-supplied decimal string into an amount.
/// Example: "50.00" -> 50.0, "12.5" -> 12.5, "100" -> 100.0
pub fn parse_amount(input: &str) -> Result<Amount, ParseAmountError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ParseAmountError::Empty);
    }

    // Accept a decimal comma as well as a decimal point
    let normalized = input.replace(',', ".");
    let amount: Amount = normalized
        .parse()
        .map_err(|_| ParseAmountError::InvalidFormat(input.to_string()))?;

    if !amount.is_finite() {
        return Err(ParseAmountError::NotFinite(input.to_string()));
    }
    Ok(amount)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseAmountError {
    Empty,
    InvalidFormat(String),
    NotFinite(String),
}

impl fmt::Display for ParseAmountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseAmountError::Empty => write!(f, "amount is empty"),
            ParseAmountError::InvalidFormat(s) => write!(f, "invalid amount format: {}", s),
            ParseAmountError::NotFinite(s) => write!(f, "amount must be a finite number: {}", s),
        }
    }
}

impl std::error::Error for ParseAmountError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(1500.0), "1500.00");
        assert_eq!(format_amount(12.346), "12.35");
        assert_eq!(format_amount(0.5), "0.50");
        assert_eq!(format_amount(0.0), "0.00");
        assert_eq!(format_amount(-300.0), "-300.00");
        assert_eq!(format_amount(-0.001), "0.00");
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("50.00"), Ok(50.0));
        assert_eq!(parse_amount("50"), Ok(50.0));
        assert_eq!(parse_amount("12,5"), Ok(12.5));
        assert_eq!(parse_amount(" .25 "), Ok(0.25));
        assert_eq!(parse_amount("-10"), Ok(-10.0));
    }

    #[test]
    fn test_parse_amount_invalid() {
        assert_eq!(parse_amount(""), Err(ParseAmountError::Empty));
        assert!(matches!(
            parse_amount("abc"),
            Err(ParseAmountError::InvalidFormat(_))
        ));
        assert!(matches!(
            parse_amount("12.34.56"),
            Err(ParseAmountError::InvalidFormat(_))
        ));
        assert!(matches!(
            parse_amount("inf"),
            Err(ParseAmountError::NotFinite(_))
        ));
        assert!(matches!(
            parse_amount("NaN"),
            Err(ParseAmountError::NotFinite(_))
        ));
    }
}
