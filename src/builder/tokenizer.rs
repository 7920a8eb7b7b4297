//! Tokenizer for override conditions.
//!
//! An override token is a CLI-style `key<delim>value` string:
//! - `key=value`: equality, or `IN (...)` when the value is a comma list
//! - `key~value`: substring match (`LIKE '%value%'`)
//! - `key^value`: inequality, or `NOT IN (...)` when the value is a comma list

use std::fmt;

use crate::error::{AthqError, Result};

/// The comparison requested by an override token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `=`
    Equals,
    /// `~`
    Like,
    /// `^`
    NotEquals,
}

impl Operator {
    /// Delimiters in the order they are checked.
    const PRIORITY: [Operator; 3] = [Operator::Equals, Operator::Like, Operator::NotEquals];

    /// Returns the delimiter character for this operator.
    pub fn delimiter(&self) -> char {
        match self {
            Self::Equals => '=',
            Self::Like => '~',
            Self::NotEquals => '^',
        }
    }

    fn from_delimiter(c: char) -> Option<Self> {
        Self::PRIORITY.into_iter().find(|op| op.delimiter() == c)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.delimiter())
    }
}

/// A parsed override token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub key: String,
    pub op: Operator,
    pub value: String,
}

impl Condition {
    /// Returns the list items if the value is a comma list.
    ///
    /// Items are trimmed of surrounding whitespace.
    pub fn list_values(&self) -> Option<Vec<&str>> {
        if self.value.contains(',') {
            Some(self.value.split(',').map(str::trim).collect())
        } else {
            None
        }
    }
}

/// Parses a single `key<delim>value` token.
///
/// Exactly one delimiter character from `=`, `~`, `^` must be present.
pub fn parse_condition(token: &str) -> Result<Condition> {
    let delimiters: Vec<(usize, Operator)> = token
        .char_indices()
        .filter_map(|(i, c)| Operator::from_delimiter(c).map(|op| (i, op)))
        .collect();

    let (index, op) = match delimiters.as_slice() {
        [] => {
            return Err(AthqError::malformed(format!(
                "'{token}' has no operator, expected one of key=value, key~value, key^value"
            )))
        }
        [single] => *single,
        _ => {
            return Err(AthqError::malformed(format!(
                "'{token}' has more than one operator"
            )))
        }
    };

    let key = token[..index].trim();
    if key.is_empty() {
        return Err(AthqError::malformed(format!("'{token}' has an empty key")));
    }

    Ok(Condition {
        key: key.to_string(),
        op,
        value: token[index + op.delimiter().len_utf8()..].to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_equals() {
        let cond = parse_condition("status=open").unwrap();
        assert_eq!(cond.key, "status");
        assert_eq!(cond.op, Operator::Equals);
        assert_eq!(cond.value, "open");
        assert!(cond.list_values().is_none());
    }

    #[test]
    fn test_parse_like() {
        let cond = parse_condition("name~foo").unwrap();
        assert_eq!(cond.op, Operator::Like);
        assert_eq!(cond.value, "foo");
    }

    #[test]
    fn test_parse_not_equals() {
        let cond = parse_condition("env^dev").unwrap();
        assert_eq!(cond.op, Operator::NotEquals);
        assert_eq!(cond.key, "env");
    }

    #[test]
    fn test_list_values_are_trimmed() {
        let cond = parse_condition("status=open, closed ,stale").unwrap();
        assert_eq!(
            cond.list_values(),
            Some(vec!["open", "closed", "stale"])
        );
    }

    #[test]
    fn test_no_delimiter_is_malformed() {
        let err = parse_condition("status").unwrap_err();
        assert!(matches!(err, AthqError::MalformedParameter(_)));
    }

    #[test]
    fn test_multiple_delimiters_are_malformed() {
        assert!(parse_condition("a=b=c").is_err());
        assert!(parse_condition("a=b~c").is_err());
        assert!(parse_condition("a^b~c").is_err());
    }

    #[test]
    fn test_empty_key_is_malformed() {
        assert!(parse_condition("=open").is_err());
        assert!(parse_condition("  ~open").is_err());
    }

    #[test]
    fn test_empty_value_is_allowed() {
        let cond = parse_condition("note=").unwrap();
        assert_eq!(cond.value, "");
    }
}
