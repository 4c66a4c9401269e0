//! Tokenizer for the engine's textual option grammar.
//!
//! Top-level grammar: `key '=' value (delim key '=' value)*`, where `value` is either a bare token
//! or a brace-nested block that itself recurses into the same grammar. This module never
//! interprets the *meaning* of a token — that's the primitive/composite codecs' job — it only
//! knows how to find token boundaries while respecting nested `{}`.

use crate::error::{ConfigError, ConfigResult};

/// Result of [`next_token`]: either a token was read, or the input was already exhausted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    Value { text: &'a str, end: usize },
    Exhausted,
}

/// Reads one token from `input` starting at `start`, honoring brace nesting.
///
/// Leading whitespace from `start` is skipped. If the next non-space character is `{`, the token
/// is everything up to the matching `}` (trimmed), and the character immediately following the
/// closing brace must be end-of-input or `delimiter`. Otherwise the token runs to the next
/// `delimiter` or end-of-input, trimmed.
pub fn next_token(input: &str, delimiter: char, start: usize) -> ConfigResult<Token<'_>> {
    let bytes = input.as_bytes();
    let mut pos = start;
    while pos < bytes.len() && (bytes[pos] as char).is_whitespace() {
        pos += 1;
    }
    if pos >= bytes.len() {
        return Ok(Token::Exhausted);
    }

    if input[pos..].starts_with('{') {
        let mut depth = 0usize;
        let mut close = None;
        for (offset, ch) in input[pos..].char_indices() {
            match ch {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        close = Some(pos + offset);
                        break;
                    }
                }
                _ => {}
            }
        }
        let close = close.ok_or_else(|| ConfigError::invalid_argument("Mismatched curly braces"))?;
        let interior = input[pos + 1..close].trim();
        let after = close + 1;
        let next_significant = input[after..].find(|ch: char| !ch.is_whitespace());
        let boundary_ok = match next_significant {
            None => true,
            Some(offset) => input[after + offset..].starts_with(delimiter),
        };
        if !boundary_ok {
            return Err(ConfigError::invalid_argument(
                "Unexpected chars after nested options",
            ));
        }
        let end = match next_significant {
            None => input.len(),
            Some(offset) => after + offset + delimiter.len_utf8(),
        };
        return Ok(Token::Value {
            text: interior,
            end,
        });
    }

    let rest = &input[pos..];
    let end = rest.find(delimiter).map_or(input.len(), |idx| pos + idx);
    let text = input[pos..end].trim();
    let new_end = if end < input.len() {
        end + delimiter.len_utf8()
    } else {
        end
    };
    Ok(Token::Value {
        text,
        end: new_end,
    })
}

/// Peels any number of outer matched `{}` layers and whitespace from `input`.
fn peel_outer_braces(input: &str) -> ConfigResult<&str> {
    let mut current = input.trim();
    loop {
        if !current.starts_with('{') {
            return Ok(current);
        }
        let mut depth = 0usize;
        let mut close = None;
        for (offset, ch) in current.char_indices() {
            match ch {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        close = Some(offset);
                        break;
                    }
                }
                _ => {}
            }
        }
        let close = close.ok_or_else(|| ConfigError::invalid_argument("Mismatched curly braces"))?;
        if close != current.len() - 1 {
            // Not a single enclosing pair; stop peeling.
            return Ok(current);
        }
        current = current[1..close].trim();
    }
}

/// Parses a `key=value;key=value` style mapping using [`next_token`] for the value side.
///
/// `input` may be wrapped in any number of matched `{}` layers (which are peeled before parsing
/// begins). Preserves the original left-to-right ordering of keys so callers needing a stable
/// emission order can rely on it.
pub fn string_to_map(input: &str, delimiter: char) -> ConfigResult<Vec<(String, String)>> {
    let body = peel_outer_braces(input)?;
    let mut pairs = Vec::new();
    let mut pos = 0usize;
    loop {
        while pos < body.len() && body.as_bytes()[pos].is_ascii_whitespace() {
            pos += 1;
        }
        if pos >= body.len() {
            break;
        }
        let eq = body[pos..]
            .find('=')
            .ok_or_else(|| ConfigError::invalid_argument("Missing '=' in option pair"))?;
        let key = body[pos..pos + eq].trim();
        if key.is_empty() {
            return Err(ConfigError::invalid_argument("Empty option key"));
        }
        let value_start = pos + eq + 1;
        match next_token(body, delimiter, value_start)? {
            Token::Exhausted => {
                pairs.push((key.to_owned(), String::new()));
                break;
            }
            Token::Value { text, end } => {
                pairs.push((key.to_owned(), text.to_owned()));
                pos = end;
            }
        }
    }
    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_plain_tokens_on_delimiter() {
        let tok = next_token("a=1;b=2", ';', 2).unwrap();
        assert_eq!(tok, Token::Value { text: "1", end: 4 });
    }

    #[test]
    fn reads_nested_braces_as_one_token() {
        let input = "x={a=1;b=2};y=3";
        let tok = next_token(input, ';', 2).unwrap();
        assert_eq!(
            tok,
            Token::Value {
                text: "a=1;b=2",
                end: 12
            }
        );
    }

    #[test]
    fn nested_braces_can_nest_arbitrarily_deep() {
        let input = "{a={b={c=1}}}";
        let tok = next_token(input, ';', 0).unwrap();
        assert_eq!(
            tok,
            Token::Value {
                text: "a={b={c=1}}",
                end: input.len()
            }
        );
    }

    #[test]
    fn unbalanced_braces_fail() {
        let err = next_token("x={a=1;b=2", ';', 2).unwrap_err();
        assert!(err.to_string().contains("Mismatched curly braces"));
    }

    #[test]
    fn trailing_chars_after_nested_block_fail() {
        let err = next_token("x={a=1}extra", ';', 2).unwrap_err();
        assert!(err.to_string().contains("Unexpected chars"));
    }

    #[test]
    fn exhausted_at_end_of_input() {
        assert_eq!(next_token("a=1", ';', 3).unwrap(), Token::Exhausted);
    }

    #[test]
    fn string_to_map_ignores_outer_whitespace_and_braces() {
        let pairs = string_to_map("  {{ a=1;b=2 }}  ", ';').unwrap();
        assert_eq!(
            pairs,
            vec![("a".to_owned(), "1".to_owned()), ("b".to_owned(), "2".to_owned())]
        );
    }

    #[test]
    fn string_to_map_rejects_empty_key() {
        assert!(string_to_map("=1", ';').is_err());
    }

    #[test]
    fn string_to_map_rejects_missing_equals() {
        assert!(string_to_map("a", ';').is_err());
    }

    #[test]
    fn string_to_map_handles_nested_struct_values() {
        let pairs = string_to_map("s={x=3;y=4};t=5", ';').unwrap();
        assert_eq!(
            pairs,
            vec![
                ("s".to_owned(), "x=3;y=4".to_owned()),
                ("t".to_owned(), "5".to_owned())
            ]
        );
    }
}
