//! Lenient parsing of free-form user input.
//!
//! Front ends accept things like `"250ml"` or `"72.35 kg"`; these helpers strip
//! everything but digits and the decimal point, round, and then apply the same
//! bounds as the domain validators.

use crate::profile::validate_weight;
use crate::records::validate_amount;
use crate::ValidationError;

fn numeric_part(input: &str) -> String {
    input
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect()
}

fn parse_number(field: &'static str, input: &str) -> Result<f64, ValidationError> {
    let cleaned = numeric_part(input);
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ValidationError::Unparseable {
            field,
            input: input.to_string(),
        })
}

/// Parse a water amount in whole millilitres
pub fn sanitize_water_amount(input: &str) -> Result<i64, ValidationError> {
    let amount = parse_number("water amount", input)?.round() as i64;
    validate_amount(amount)?;
    Ok(amount)
}

/// Parse a body weight, keeping one decimal place
pub fn sanitize_weight(input: &str) -> Result<f64, ValidationError> {
    let weight = (parse_number("weight", input)? * 10.0).round() / 10.0;
    validate_weight(weight)?;
    Ok(weight)
}

/// Parse a whole number (goal, height, interval) after stripping units
pub fn sanitize_whole(field: &'static str, input: &str) -> Result<i64, ValidationError> {
    Ok(parse_number(field, input)?.round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_water_amount_with_units() {
        assert_eq!(sanitize_water_amount("250ml"), Ok(250));
        assert_eq!(sanitize_water_amount(" 330 ml "), Ok(330));
        assert_eq!(sanitize_water_amount("499.6"), Ok(500));
    }

    #[test]
    fn test_water_amount_out_of_range() {
        assert_eq!(sanitize_water_amount("0"), Err(ValidationError::Amount(0)));
        assert_eq!(
            sanitize_water_amount("6000"),
            Err(ValidationError::Amount(6000))
        );
    }

    #[test]
    fn test_water_amount_garbage() {
        assert!(matches!(
            sanitize_water_amount("a glass"),
            Err(ValidationError::Unparseable { .. })
        ));
        assert!(matches!(
            sanitize_water_amount("1.2.3"),
            Err(ValidationError::Unparseable { .. })
        ));
    }

    #[test]
    fn test_weight_keeps_one_decimal() {
        assert_eq!(sanitize_weight("72.36kg"), Ok(72.4));
        assert_eq!(sanitize_weight("80"), Ok(80.0));
    }

    #[test]
    fn test_weight_uses_profile_bound() {
        assert!(sanitize_weight("250").is_ok());
        assert!(matches!(
            sanitize_weight("280"),
            Err(ValidationError::Weight(_))
        ));
    }

    #[test]
    fn test_whole_number() {
        assert_eq!(sanitize_whole("daily goal", "2,500 ml"), Ok(2500));
    }
}
