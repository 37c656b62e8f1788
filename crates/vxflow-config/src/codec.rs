//! Conversions between strings and typed values
//!
//! Layer sources and the shell-facing output files carry scalars and
//! lists as strings. Decoding turns those encodings into native values;
//! encoding is the left inverse used when producing shell-consumable
//! output. Decoding never fails: a string that matches no rule is kept
//! as-is.

use chrono::{NaiveDate, NaiveDateTime};

use crate::tree::ConfigValue;

/// Canonical timestamp rendering, `YYYYMMDDHHMM`.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M";

/// How much typing [`decode`] applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodeMode {
    /// Decode every recognized form.
    #[default]
    Typed,
    /// Return the input string unchanged (after quote stripping).
    Raw,
    /// Decode everything except fixed-width date-times, which stay strings.
    RawTimestamps,
}

/// Decode a string into a scalar or list value.
///
/// A trimmed input bounded by a matching `(`…`)` or `[`…`]` pair is
/// treated as an encoded list: delimiters are stripped, commas become
/// spaces, tokens split respecting quotes, and an `index=` prefix on a
/// token (indexed shell-array syntax) is dropped before each token is
/// scalar-decoded. Empty or whitespace-only input decodes to null.
pub fn decode(s: &str, mode: DecodeMode) -> ConfigValue {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return ConfigValue::Null;
    }

    let bytes = trimmed.as_bytes();
    let bracketed = (bytes[0] == b'(' && bytes[bytes.len() - 1] == b')')
        || (bytes[0] == b'[' && bytes[bytes.len() - 1] == b']');
    if bracketed {
        let inner = trimmed[1..trimmed.len() - 1].replace(',', " ");
        let mut items = Vec::new();
        for token in split_quoted(&inner) {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            // shell arrays may be stored with explicit indices: [0]=value
            let token = match token.find('=') {
                Some(idx) => &token[idx + 1..],
                None => token,
            };
            items.push(decode_scalar(token, mode));
        }
        return ConfigValue::List(items);
    }

    decode_scalar(trimmed, mode)
}

/// Decode a single scalar string.
///
/// Tried in order after stripping one layer of surrounding quotes:
/// boolean keywords, literal null, fixed-width date-times of length
/// 8/10/12/14 (`YYYYMMDD[HH[MM[SS]]]`), integer, float. A numeral with a
/// leading zero and more than one digit stays a string so zone-padded
/// identifiers survive.
pub fn decode_scalar(s: &str, mode: DecodeMode) -> ConfigValue {
    let s = strip_quotes(s);
    if mode == DecodeMode::Raw {
        return ConfigValue::Str(s.to_string());
    }

    match s.to_ascii_lowercase().as_str() {
        "true" | "yes" | "yeah" => return ConfigValue::Bool(true),
        "false" | "no" | "nope" => return ConfigValue::Bool(false),
        _ => {}
    }
    if s == "None" || s == "null" {
        return ConfigValue::Null;
    }
    if let Some(ts) = parse_timestamp(s) {
        if mode == DecodeMode::RawTimestamps {
            return ConfigValue::Str(s.to_string());
        }
        return ConfigValue::Timestamp(ts);
    }
    if let Ok(i) = s.parse::<i64>() {
        if s.len() > 1 && s.starts_with('0') {
            return ConfigValue::Str(s.to_string());
        }
        return ConfigValue::Int(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        return ConfigValue::Float(f);
    }
    ConfigValue::Str(s.to_string())
}

/// Encode a scalar value into its string form.
pub fn encode_scalar(v: &ConfigValue) -> String {
    match v {
        ConfigValue::Null => String::new(),
        ConfigValue::Bool(true) => "TRUE".to_string(),
        ConfigValue::Bool(false) => "FALSE".to_string(),
        ConfigValue::Int(i) => i.to_string(),
        ConfigValue::Float(f) => f.to_string(),
        ConfigValue::Timestamp(t) => encode_timestamp(t, TIMESTAMP_FORMAT),
        ConfigValue::Str(s) => s.clone(),
        ConfigValue::List(_) => encode(v, true),
        ConfigValue::Map(_) => serde_yaml::to_string(&v.to_yaml())
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

/// Format a timestamp with a caller-specified subset of [`TIMESTAMP_FORMAT`].
pub fn encode_timestamp(t: &NaiveDateTime, format: &str) -> String {
    t.format(format).to_string()
}

/// Encode a value for the right-hand side of a shell variable.
///
/// Strings pass through unchanged. Lists render each element through
/// [`encode_scalar`], quoted and parenthesized: up to four elements (or
/// an explicit one-line request) on a single line, longer lists one
/// element per backslash-continued line.
pub fn encode(v: &ConfigValue, oneline: bool) -> String {
    match v {
        ConfigValue::Str(s) => s.clone(),
        ConfigValue::List(items) => {
            let parts: Vec<String> = items.iter().map(encode_scalar).collect();
            if oneline || parts.len() <= 4 {
                format!("( \"{}\" )", parts.join("\" \""))
            } else {
                format!("( \\\n\"{}\" \\\n)", parts.join("\" \\\n\""))
            }
        }
        other => encode_scalar(other),
    }
}

fn strip_quotes(s: &str) -> &str {
    let bytes = s.as_bytes();
    if bytes.len() >= 2 && (bytes[0] == b'"' || bytes[0] == b'\'') && bytes[bytes.len() - 1] == bytes[0]
    {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    if !matches!(s.len(), 8 | 10 | 12 | 14) || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let date = NaiveDate::parse_from_str(&s[..8], "%Y%m%d").ok()?;
    let field = |range: std::ops::Range<usize>| -> u32 {
        s.get(range)
            .and_then(|f| f.parse().ok())
            .unwrap_or_default()
    };
    date.and_hms_opt(field(8..10), field(10..12), field(12..14))
}

/// Split on whitespace, keeping single- or double-quoted runs together.
fn split_quoted(s: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut in_token = false;

    for c in s.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None if c == '"' || c == '\'' => {
                quote = Some(c);
                in_token = true;
            }
            None if c.is_whitespace() => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            None => {
                current.push(c);
                in_token = true;
            }
        }
    }
    if in_token {
        tokens.push(current);
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("true", ConfigValue::Bool(true))]
    #[case("Yes", ConfigValue::Bool(true))]
    #[case("YEAH", ConfigValue::Bool(true))]
    #[case("false", ConfigValue::Bool(false))]
    #[case("no", ConfigValue::Bool(false))]
    #[case("nope", ConfigValue::Bool(false))]
    #[case("None", ConfigValue::Null)]
    #[case("null", ConfigValue::Null)]
    #[case("42", ConfigValue::Int(42))]
    #[case("-7", ConfigValue::Int(-7))]
    #[case("2.5", ConfigValue::Float(2.5))]
    #[case("hello", ConfigValue::Str("hello".into()))]
    fn decodes_scalars(#[case] input: &str, #[case] expected: ConfigValue) {
        assert_eq!(decode(input, DecodeMode::Typed), expected);
    }

    #[test]
    fn zero_padded_numerals_stay_strings() {
        assert_eq!(
            decode("012", DecodeMode::Typed),
            ConfigValue::Str("012".into())
        );
        assert_eq!(decode("0", DecodeMode::Typed), ConfigValue::Int(0));
    }

    #[test]
    fn fixed_width_datetimes_decode() {
        let d = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        assert_eq!(
            decode("20240601", DecodeMode::Typed),
            ConfigValue::Timestamp(d.and_hms_opt(0, 0, 0).unwrap())
        );
        assert_eq!(
            decode("2024060112", DecodeMode::Typed),
            ConfigValue::Timestamp(d.and_hms_opt(12, 0, 0).unwrap())
        );
        assert_eq!(
            decode("202406011230", DecodeMode::Typed),
            ConfigValue::Timestamp(d.and_hms_opt(12, 30, 0).unwrap())
        );
        assert_eq!(
            decode("20240601123045", DecodeMode::Typed),
            ConfigValue::Timestamp(d.and_hms_opt(12, 30, 45).unwrap())
        );
    }

    #[test]
    fn eight_digit_non_dates_fall_through_to_int() {
        // month 99 is not a date, so the numeral survives as an integer
        assert_eq!(
            decode("20249901", DecodeMode::Typed),
            ConfigValue::Int(20_249_901)
        );
    }

    #[test]
    fn raw_mode_returns_strings_untouched() {
        assert_eq!(
            decode("true", DecodeMode::Raw),
            ConfigValue::Str("true".into())
        );
        assert_eq!(
            decode("20240601", DecodeMode::Raw),
            ConfigValue::Str("20240601".into())
        );
    }

    #[test]
    fn raw_timestamps_mode_only_spares_datetimes() {
        assert_eq!(
            decode("20240601", DecodeMode::RawTimestamps),
            ConfigValue::Str("20240601".into())
        );
        assert_eq!(decode("42", DecodeMode::RawTimestamps), ConfigValue::Int(42));
    }

    #[test]
    fn surrounding_quotes_are_stripped_once() {
        assert_eq!(
            decode("\"quoted\"", DecodeMode::Typed),
            ConfigValue::Str("quoted".into())
        );
        assert_eq!(
            decode_scalar("'\"inner\"'", DecodeMode::Typed),
            ConfigValue::Str("\"inner\"".into())
        );
    }

    #[test]
    fn empty_input_decodes_to_null() {
        assert_eq!(decode("", DecodeMode::Typed), ConfigValue::Null);
        assert_eq!(decode("   ", DecodeMode::Typed), ConfigValue::Null);
    }

    #[test]
    fn list_decode_handles_quotes_commas_and_indices() {
        let decoded = decode("( \"a b\", 2, [0]=hello )", DecodeMode::Typed);
        assert_eq!(
            decoded,
            ConfigValue::List(vec![
                ConfigValue::Str("a b".into()),
                ConfigValue::Int(2),
                ConfigValue::Str("hello".into()),
            ])
        );

        let bracketed = decode("[x, y]", DecodeMode::Typed);
        assert_eq!(
            bracketed,
            ConfigValue::List(vec![
                ConfigValue::Str("x".into()),
                ConfigValue::Str("y".into()),
            ])
        );
    }

    #[test]
    fn encode_renders_shell_tokens() {
        assert_eq!(encode_scalar(&ConfigValue::Bool(true)), "TRUE");
        assert_eq!(encode_scalar(&ConfigValue::Bool(false)), "FALSE");
        assert_eq!(encode_scalar(&ConfigValue::Null), "");
        assert_eq!(encode_scalar(&ConfigValue::Int(3)), "3");
        let ts = NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(12, 30, 0)
            .unwrap();
        assert_eq!(encode_scalar(&ConfigValue::Timestamp(ts)), "202406011230");
    }

    #[test]
    fn short_lists_encode_on_one_line() {
        let list = ConfigValue::List(vec![
            ConfigValue::Str("a".into()),
            ConfigValue::Int(2),
        ]);
        assert_eq!(encode(&list, false), "( \"a\" \"2\" )");
    }

    #[test]
    fn long_lists_encode_across_lines() {
        let list = ConfigValue::List(
            ["a", "b", "c", "d", "e"]
                .iter()
                .map(|s| ConfigValue::Str((*s).into()))
                .collect(),
        );
        let encoded = encode(&list, false);
        assert_eq!(encoded, "( \\\n\"a\" \\\n\"b\" \\\n\"c\" \\\n\"d\" \\\n\"e\" \\\n)");
        // forcing one line overrides the length rule
        assert_eq!(encode(&list, true), "( \"a\" \"b\" \"c\" \"d\" \"e\" )");
    }

    #[rstest]
    #[case("yes")]
    #[case("TRUE")]
    #[case("17")]
    #[case("3.25")]
    #[case("202406011230")]
    #[case("plain text")]
    fn decode_encode_decode_is_stable(#[case] input: &str) {
        let first = decode(input, DecodeMode::Typed);
        let second = decode(&encode(&first, false), DecodeMode::Typed);
        assert_eq!(first, second);
    }

    #[test]
    fn short_list_round_trips_through_encode() {
        let list = ConfigValue::List(vec![
            ConfigValue::Str("alpha".into()),
            ConfigValue::Int(5),
            ConfigValue::Bool(true),
        ]);
        let decoded = decode(&encode(&list, false), DecodeMode::Typed);
        assert_eq!(
            decoded,
            ConfigValue::List(vec![
                ConfigValue::Str("alpha".into()),
                ConfigValue::Int(5),
                ConfigValue::Bool(true),
            ])
        );
    }
}
