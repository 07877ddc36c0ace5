//! The SCIM attribute comparison operators.

use std::fmt;

/// Operator of a comparison filter, e.g. the `co` in
/// `name.first co "Bob"`.
///
/// Operator tokens match case-insensitively at parse time; `pr` is not in
/// this set because a presence test carries no comparison value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOperator {
    Equal,
    NotEqual,
    Contains,
    StartsWith,
    EndsWith,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
}

impl ComparisonOperator {
    /// Resolves an operator token, or returns `None` if the token is not
    /// one of the nine comparison operators.
    pub fn from_token(token: &str) -> Option<Self> {
        let operator = match token.to_ascii_lowercase().as_str() {
            "eq" => Self::Equal,
            "ne" => Self::NotEqual,
            "co" => Self::Contains,
            "sw" => Self::StartsWith,
            "ew" => Self::EndsWith,
            "gt" => Self::GreaterThan,
            "ge" => Self::GreaterThanOrEqual,
            "lt" => Self::LessThan,
            "le" => Self::LessThanOrEqual,
            _ => return None,
        };
        Some(operator)
    }

    /// The operator's textual form, lowercased.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equal => "eq",
            Self::NotEqual => "ne",
            Self::Contains => "co",
            Self::StartsWith => "sw",
            Self::EndsWith => "ew",
            Self::GreaterThan => "gt",
            Self::GreaterThanOrEqual => "ge",
            Self::LessThan => "lt",
            Self::LessThanOrEqual => "le",
        }
    }
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_case_insensitively() {
        assert_eq!(ComparisonOperator::from_token("eq"), Some(ComparisonOperator::Equal));
        assert_eq!(ComparisonOperator::from_token("EQ"), Some(ComparisonOperator::Equal));
        assert_eq!(ComparisonOperator::from_token("Le"), Some(ComparisonOperator::LessThanOrEqual));
    }

    #[test]
    fn rejects_unknown_operators() {
        assert_eq!(ComparisonOperator::from_token("pr"), None);
        assert_eq!(ComparisonOperator::from_token("equals"), None);
        assert_eq!(ComparisonOperator::from_token(""), None);
    }
}
