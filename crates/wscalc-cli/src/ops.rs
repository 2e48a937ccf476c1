//! Shorthand operator syntax used by scenario files: `moka(3)`, `michiru(2)`,
//! `woody(4)`, a bare number for a plain damage check, a number suffixed with
//! `t` for a triggered check, and `+` to join operators into one group.

use thiserror::Error;
use wscalc_core::model::{Operator, OperatorGroup};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OpParseError {
    #[error("unrecognized operator '{0}'")]
    Unrecognized(String),
    #[error("operator '{0}' has an amount out of range")]
    BadAmount(String),
    #[error("operator group '{0}' is empty")]
    EmptyGroup(String),
}

pub fn parse_operator(text: &str) -> Result<Operator, OpParseError> {
    let raw = text.trim();
    let lowered = raw.to_ascii_lowercase();

    for (name, build) in [
        ("moka", Operator::Moka as fn(u32) -> Operator),
        ("michiru", Operator::Michiru),
        ("woody", Operator::Woody),
    ] {
        if let Some(rest) = lowered.strip_prefix(name) {
            let inner = rest
                .strip_prefix('(')
                .and_then(|r| r.strip_suffix(')'))
                .ok_or_else(|| OpParseError::Unrecognized(raw.to_string()))?;
            return Ok(build(parse_amount(inner, raw)?));
        }
    }

    if let Some(digits) = lowered.strip_suffix('t') {
        return Ok(Operator::Trigger(parse_amount(digits, raw)?));
    }
    Ok(Operator::Damage(parse_amount(&lowered, raw)?))
}

pub fn parse_group(text: &str) -> Result<OperatorGroup, OpParseError> {
    let parts: Vec<&str> = text
        .split('+')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect();
    if parts.is_empty() {
        return Err(OpParseError::EmptyGroup(text.to_string()));
    }
    let mut operators = Vec::with_capacity(parts.len());
    for part in parts {
        operators.push(parse_operator(part)?);
    }
    Ok(OperatorGroup::new(operators))
}

pub fn parse_sequence(items: &[String]) -> Result<Vec<Operator>, OpParseError> {
    items.iter().map(|item| parse_operator(item)).collect()
}

pub fn parse_groups(items: &[String]) -> Result<Vec<OperatorGroup>, OpParseError> {
    items.iter().map(|item| parse_group(item)).collect()
}

fn parse_amount(digits: &str, original: &str) -> Result<u32, OpParseError> {
    if digits.is_empty() || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(OpParseError::Unrecognized(original.to_string()));
    }
    digits
        .parse()
        .map_err(|_| OpParseError::BadAmount(original.to_string()))
}

#[cfg(test)]
mod tests {
    use super::{OpParseError, parse_group, parse_operator};
    use wscalc_core::model::{Operator, OperatorGroup};

    #[test]
    fn parses_every_shorthand_form() {
        assert_eq!(parse_operator("moka(3)").unwrap(), Operator::Moka(3));
        assert_eq!(parse_operator("MICHIRU(2)").unwrap(), Operator::Michiru(2));
        assert_eq!(parse_operator("woody(4)").unwrap(), Operator::Woody(4));
        assert_eq!(parse_operator("5").unwrap(), Operator::Damage(5));
        assert_eq!(parse_operator("3t").unwrap(), Operator::Trigger(3));
        assert_eq!(parse_operator(" 3T ").unwrap(), Operator::Trigger(3));
    }

    #[test]
    fn parses_groups_joined_with_plus() {
        let group = parse_group("moka(3) + 2 + 3t").unwrap();
        assert_eq!(
            group,
            OperatorGroup::new(vec![
                Operator::Moka(3),
                Operator::Damage(2),
                Operator::Trigger(3),
            ])
        );
    }

    #[test]
    fn rejects_malformed_operators() {
        assert_eq!(
            parse_operator("moka[3]"),
            Err(OpParseError::Unrecognized("moka[3]".to_string()))
        );
        assert_eq!(
            parse_operator("slam(2)"),
            Err(OpParseError::Unrecognized("slam(2)".to_string()))
        );
        assert_eq!(
            parse_operator("99999999999999"),
            Err(OpParseError::BadAmount("99999999999999".to_string()))
        );
        assert_eq!(
            parse_group(" + "),
            Err(OpParseError::EmptyGroup(" + ".to_string()))
        );
    }
}
