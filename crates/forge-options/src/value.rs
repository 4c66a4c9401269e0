//! Primitive value representation and textual escaping.
//!
//! The engine's value model is deliberately flat: every leaf option resolves to one of the
//! variants of [`PrimitiveValue`] before it is handed to a field's accessor closures. This mirrors
//! the closed `TypeTag` primitive set from the engine's metadata model rather than a general JSON
//! object model, since the textual grammar this engine parses has no native notion of numbers vs.
//! strings beyond what a field's declared type tag says.

use std::fmt;

use secrecy::{ExposeSecret, SecretString};

use crate::error::{ConfigError, ConfigResult};

/// A parsed, typed primitive.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum PrimitiveValue {
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    /// A size/count expressed in bytes, accepting the same `K`/`M`/`G`/`T` suffixes as unsigned
    /// integers but kept as a distinct tag so descriptors can document intent.
    Size(u64),
    Double(f64),
    Str(String),
    /// A string value that must never appear in logs or `Debug` output, such as a credential held
    /// by a `Customizable` storage backend. Parses and serializes like [`Self::Str`]; only its
    /// display/debug rendering differs.
    Secret(SecretString),
    /// A legacy prefix-extractor descriptor, parsed from one of the fixed textual forms in
    /// [`PrefixTransform::parse`].
    PrefixTransform(PrefixTransform),
}

impl PartialEq for PrimitiveValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::I8(a), Self::I8(b)) => a == b,
            (Self::I16(a), Self::I16(b)) => a == b,
            (Self::I32(a), Self::I32(b)) => a == b,
            (Self::I64(a), Self::I64(b)) => a == b,
            (Self::U8(a), Self::U8(b)) => a == b,
            (Self::U16(a), Self::U16(b)) => a == b,
            (Self::U32(a), Self::U32(b)) => a == b,
            (Self::U64(a), Self::U64(b)) => a == b,
            (Self::Size(a), Self::Size(b)) => a == b,
            (Self::Double(a), Self::Double(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Secret(a), Self::Secret(b)) => a.expose_secret() == b.expose_secret(),
            (Self::PrefixTransform(a), Self::PrefixTransform(b)) => a == b,
            _ => false,
        }
    }
}

/// A legacy prefix extractor, historically configured via a handful of fixed textual spellings
/// rather than a general-purpose grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixTransform {
    /// The null sentinel: no prefix extraction.
    None,
    /// `rocksdb.Noop`: an extractor that is installed but extracts nothing.
    Noop,
    /// `fixed:N` or the long-form `rocksdb.FixedPrefix.N`: extracts a fixed-width prefix.
    Fixed(usize),
    /// `capped:N` or the long-form `rocksdb.CappedPrefix.N`: extracts a prefix of at most `N`
    /// bytes, shorter keys passing through unmodified.
    Capped(usize),
}

impl PrefixTransform {
    /// Parses one of the five accepted forms. Unknown forms fail.
    pub fn parse(token: &str) -> ConfigResult<Self> {
        let trimmed = token.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("null") || trimmed == "nil" {
            return Ok(Self::None);
        }
        if trimmed == "rocksdb.Noop" {
            return Ok(Self::Noop);
        }
        if let Some(n) = trimmed.strip_prefix("fixed:") {
            return Self::parse_len(n).map(Self::Fixed);
        }
        if let Some(n) = trimmed.strip_prefix("capped:") {
            return Self::parse_len(n).map(Self::Capped);
        }
        if let Some(n) = trimmed.strip_prefix("rocksdb.FixedPrefix.") {
            return Self::parse_len(n).map(Self::Fixed);
        }
        if let Some(n) = trimmed.strip_prefix("rocksdb.CappedPrefix.") {
            return Self::parse_len(n).map(Self::Capped);
        }
        Err(ConfigError::invalid_argument(format!(
            "'{token}' is not a recognized prefix transform"
        )))
    }

    fn parse_len(token: &str) -> ConfigResult<usize> {
        token
            .parse()
            .map_err(|_| ConfigError::invalid_argument(format!("'{token}' is not a valid prefix length")))
    }

    pub fn serialize(&self) -> String {
        match self {
            Self::None => "null".to_owned(),
            Self::Noop => "rocksdb.Noop".to_owned(),
            Self::Fixed(n) => format!("fixed:{n}"),
            Self::Capped(n) => format!("capped:{n}"),
        }
    }
}

impl fmt::Display for PrefixTransform {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.serialize())
    }
}

/// The absolute tolerance used when comparing [`PrimitiveValue::Double`] values.
pub const DOUBLE_EPSILON: f64 = 1e-5;

impl PrimitiveValue {
    /// Structural equality per the engine's primitive codec: doubles compare within
    /// [`DOUBLE_EPSILON`], everything else compares exactly.
    pub fn approx_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Double(a), Self::Double(b)) => (a - b).abs() <= DOUBLE_EPSILON,
            _ => self == other,
        }
    }
}

/// Wraps `raw` as a [`PrimitiveValue::Secret`], matching the engine's own string escaping rules on
/// the way in (the secret is still subject to the grammar, just never echoed back out).
pub fn parse_secret(token: &str) -> ConfigResult<SecretString> {
    Ok(SecretString::from(token.to_owned()))
}

/// Parses a boolean per the engine grammar: case-insensitive `true|false|1|0|on|off`.
pub fn parse_bool(token: &str) -> ConfigResult<bool> {
    match token.to_ascii_lowercase().as_str() {
        "true" | "1" | "on" => Ok(true),
        "false" | "0" | "off" => Ok(false),
        _ => Err(ConfigError::invalid_argument(format!(
            "'{token}' is not a valid boolean"
        ))),
    }
}

pub fn serialize_bool(value: bool) -> String {
    if value { "true" } else { "false" }.to_owned()
}

/// Parses a signed/unsigned integer or size, accepting a trailing `K`/`M`/`G`/`T` multiplier
/// (binary, i.e. powers of 1024), as the storage library historically does for memory sizes.
pub fn parse_scaled_integer(token: &str) -> ConfigResult<i128> {
    let token = token.trim();
    if token.is_empty() {
        return Err(ConfigError::invalid_argument("empty integer"));
    }
    let (digits, multiplier) = match token.as_bytes()[token.len() - 1] {
        b'K' | b'k' => (&token[..token.len() - 1], 1024i128),
        b'M' | b'm' => (&token[..token.len() - 1], 1024i128 * 1024),
        b'G' | b'g' => (&token[..token.len() - 1], 1024i128 * 1024 * 1024),
        b'T' | b't' => (&token[..token.len() - 1], 1024i128 * 1024 * 1024 * 1024),
        _ => (token, 1i128),
    };
    let base: i128 = digits
        .trim()
        .parse()
        .map_err(|_| ConfigError::invalid_argument(format!("'{token}' is not a valid integer")))?;
    base.checked_mul(multiplier)
        .ok_or_else(|| ConfigError::invalid_argument(format!("'{token}' overflows")))
}

macro_rules! impl_scaled_int {
    ($name:ident, $ty:ty) => {
        pub fn $name(token: &str) -> ConfigResult<$ty> {
            let raw = parse_scaled_integer(token)?;
            <$ty>::try_from(raw)
                .map_err(|_| ConfigError::invalid_argument(format!("'{token}' does not fit into {}", stringify!($ty))))
        }
    };
}

impl_scaled_int!(parse_i8, i8);
impl_scaled_int!(parse_i16, i16);
impl_scaled_int!(parse_i32, i32);
impl_scaled_int!(parse_i64, i64);
impl_scaled_int!(parse_u8, u8);
impl_scaled_int!(parse_u16, u16);
impl_scaled_int!(parse_u32, u32);
impl_scaled_int!(parse_u64, u64);

pub fn parse_double(token: &str) -> ConfigResult<f64> {
    token
        .trim()
        .parse()
        .map_err(|_| ConfigError::invalid_argument(format!("'{token}' is not a valid double")))
}

pub fn serialize_double(value: f64) -> String {
    // Matches the precision round-trip tests rely on; avoids scientific notation for typical
    // option ranges.
    let mut text = format!("{value}");
    if !text.contains('.') && !text.contains('e') && !text.contains("inf") && !text.contains("nan")
    {
        text.push_str(".0");
    }
    text
}

const CHARS_REQUIRING_ESCAPE: &[char] = &[';', '=', '{', '}', '#', '\\'];

/// Escapes a string value so that it survives being embedded in an option string: `;`, `=`, `{`,
/// `}`, `#`, and leading/trailing whitespace are backslash-escaped.
pub fn escape_string(raw: &str) -> String {
    let needs_escape = raw.is_empty()
        || raw.starts_with(char::is_whitespace)
        || raw.ends_with(char::is_whitespace)
        || raw.chars().any(|ch| CHARS_REQUIRING_ESCAPE.contains(&ch));
    if !needs_escape {
        return raw.to_owned();
    }
    let mut out = String::with_capacity(raw.len() + 2);
    for ch in raw.chars() {
        if CHARS_REQUIRING_ESCAPE.contains(&ch) {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Inverse of [`escape_string`]: un-escapes backslash-escaped characters. Applied to the whole
/// token before parsing when `InvocationContext::input_strings_escaped` is set.
pub fn unescape_string(escaped: &str) -> ConfigResult<String> {
    let mut out = String::with_capacity(escaped.len());
    let mut chars = escaped.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some(next) => out.push(next),
                None => {
                    return Err(ConfigError::invalid_argument(
                        "dangling escape character at end of value",
                    ))
                }
            }
        } else {
            out.push(ch);
        }
    }
    Ok(out)
}

impl fmt::Display for PrimitiveValue {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => formatter.write_str(&serialize_bool(*v)),
            Self::I8(v) => write!(formatter, "{v}"),
            Self::I16(v) => write!(formatter, "{v}"),
            Self::I32(v) => write!(formatter, "{v}"),
            Self::I64(v) => write!(formatter, "{v}"),
            Self::U8(v) => write!(formatter, "{v}"),
            Self::U16(v) => write!(formatter, "{v}"),
            Self::U32(v) => write!(formatter, "{v}"),
            Self::U64(v) => write!(formatter, "{v}"),
            Self::Size(v) => write!(formatter, "{v}"),
            Self::Double(v) => formatter.write_str(&serialize_double(*v)),
            Self::Str(v) => formatter.write_str(&escape_string(v)),
            Self::Secret(_) => formatter.write_str("[REDACTED]"),
            Self::PrefixTransform(v) => fmt::Display::fmt(v, formatter),
        }
    }
}
