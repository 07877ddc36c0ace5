//! Extraction of JSON comparison literals from the middle of a filter
//! string.

use serde_json::Value;

use crate::cursor::Cursor;
use crate::error::{Error, ErrorKind};

/// Characters that end an unquoted literal in the surrounding token
/// syntax.
const DELIMITERS: &[char] = &[' ', '(', ')', ']'];

/// Reads exactly one JSON scalar at the cursor position and leaves the
/// cursor on the first character after it.
///
/// The stream deserializer gets a view of the input bounded at the next
/// token delimiter: numbers and the `true`/`false`/`null` keywords are not
/// self-delimiting, and serde_json would otherwise reject e.g. the `1` in
/// `(a eq 1)` for its trailing parenthesis. Strings are self-delimiting
/// and may legitimately contain any delimiter, so they see the whole
/// remaining input. Only the byte count the deserializer reports as
/// consumed is skipped, which puts the cursor exactly where tokenization
/// must resume.
///
/// A JSON `null` is a valid literal; `None` from the deserializer means
/// the input ended with no value at all.
pub(crate) fn read_literal<'a>(cursor: &mut Cursor<'a>) -> Result<Value, Error<'a>> {
    cursor.mark();
    let rest = cursor.remaining();

    let spaces = rest.len() - rest.trim_start_matches(' ').len();
    let body = &rest[spaces..];
    let chunk = if body.starts_with('"') {
        rest
    } else {
        match body.find(DELIMITERS) {
            Some(end) => &rest[..spaces + end],
            None => rest,
        }
    };

    let mut values = serde_json::Deserializer::from_str(chunk).into_iter::<Value>();
    let value = match values.next() {
        None => {
            return Err(Error::new(
                cursor.input(),
                cursor.position(),
                ErrorKind::UnexpectedEndOfInput,
            ))
        }
        Some(Err(e)) => {
            return Err(Error::new(
                cursor.input(),
                cursor.marked(),
                ErrorKind::InvalidComparisonValue(e.to_string()),
            ))
        }
        Some(Ok(value)) => value,
    };

    if value.is_array() || value.is_object() {
        return Err(Error::new(
            cursor.input(),
            cursor.marked(),
            ErrorKind::InvalidComparisonValue(
                "expected a string, number, boolean or null".to_string(),
            ),
        ));
    }

    let consumed = values.byte_offset();
    cursor.reset();
    cursor.skip(consumed);
    Ok(value)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn extract(input: &str) -> (Value, String) {
        let mut cursor = Cursor::new(input);
        let value = read_literal(&mut cursor).unwrap();
        (value, cursor.remaining().to_string())
    }

    #[test]
    fn string_literal() {
        let (value, rest) = extract("\"work\" and primary pr");
        assert_eq!(value, json!("work"));
        assert_eq!(rest, " and primary pr");
    }

    #[test]
    fn string_may_contain_delimiters() {
        let (value, rest) = extract("\"a) b]\" and c pr");
        assert_eq!(value, json!("a) b]"));
        assert_eq!(rest, " and c pr");
    }

    #[test]
    fn number_stops_at_a_parenthesis() {
        let (value, rest) = extract("175.6)");
        assert_eq!(value, json!(175.6));
        assert_eq!(rest, ")");
    }

    #[test]
    fn keyword_stops_at_a_brace() {
        let (value, rest) = extract("true]");
        assert_eq!(value, json!(true));
        assert_eq!(rest, "]");
    }

    #[test]
    fn leading_spaces_are_consumed() {
        let (value, rest) = extract("  42 and x pr");
        assert_eq!(value, json!(42));
        assert_eq!(rest, " and x pr");
    }

    #[test]
    fn null_is_a_value_not_the_end() {
        let (value, rest) = extract("null");
        assert_eq!(value, Value::Null);
        assert_eq!(rest, "");

        let mut cursor = Cursor::new("");
        let err = read_literal(&mut cursor).unwrap_err();
        assert_eq!(*err.kind(), ErrorKind::UnexpectedEndOfInput);
    }

    #[test]
    fn arrays_and_malformed_values_are_rejected() {
        let mut cursor = Cursor::new("[1, 2]");
        let err = read_literal(&mut cursor).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidComparisonValue(_)));

        let mut cursor = Cursor::new("tru ");
        let err = read_literal(&mut cursor).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidComparisonValue(_)));
    }
}
