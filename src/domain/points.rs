use std::fmt;

/// Points are whole units; there is no fractional denomination.
pub type Points = i64;

/// Users are identified by a positive integer.
pub type UserId = i64;

/// Format points with thousands separators.
/// Example: 100000 -> "100,000", -1234 -> "-1,234"
pub fn format_points(points: Points) -> String {
    let sign = if points < 0 { "-" } else { "" };
    let digits = points.unsigned_abs().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("{}{}", sign, grouped)
}

/// Parse a points amount, accepting `,` or `_` as digit separators.
/// Example: "100,000" -> 100000, "1_000" -> 1000, "-5" -> -5
///
/// Sign and range are not checked here; that is the ledger's job.
pub fn parse_points(input: &str) -> Result<Points, ParsePointsError> {
    let cleaned: String = input
        .trim()
        .chars()
        .filter(|c| *c != ',' && *c != '_')
        .collect();

    if cleaned.is_empty() || cleaned == "-" {
        return Err(ParsePointsError::InvalidFormat);
    }

    cleaned
        .parse::<Points>()
        .map_err(|_| ParsePointsError::InvalidFormat)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsePointsError {
    InvalidFormat,
}

impl fmt::Display for ParsePointsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParsePointsError::InvalidFormat => write!(f, "invalid points format"),
        }
    }
}

impl std::error::Error for ParsePointsError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_points() {
        assert_eq!(format_points(0), "0");
        assert_eq!(format_points(999), "999");
        assert_eq!(format_points(1000), "1,000");
        assert_eq!(format_points(100_000), "100,000");
        assert_eq!(format_points(1_234_567), "1,234,567");
        assert_eq!(format_points(-1234), "-1,234");
    }

    #[test]
    fn test_parse_points() {
        assert_eq!(parse_points("1000"), Ok(1000));
        assert_eq!(parse_points("100,000"), Ok(100_000));
        assert_eq!(parse_points("1_000"), Ok(1000));
        assert_eq!(parse_points(" 42 "), Ok(42));
        assert_eq!(parse_points("-5"), Ok(-5));
        assert_eq!(parse_points("0"), Ok(0));
    }

    #[test]
    fn test_parse_points_invalid() {
        assert!(parse_points("").is_err());
        assert!(parse_points("-").is_err());
        assert!(parse_points("abc").is_err());
        assert!(parse_points("12.5").is_err());
    }
}
