//! FILENAME: crosstab-engine/src/mapping.rs
//! Value Mapping Parser - decodes pipe-delimited response-value mappings.
//!
//! A mapping string such as `"7:Love|5,6:Like|1-3:Dislike"` names groups of
//! raw response values. Each `|`-separated entry is `[!]values:name`, where
//! `values` is a comma-separated list of integers or a dash-separated
//! inclusive range. Negative endpoints use a leading `-` escape, so
//! `-3--1:Low` reads as the range -3..=-1. A leading `!` inverts the entry
//! ("not these values").

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use model::ConfigurationError;

// ============================================================================
// PARSED ENTRY
// ============================================================================

/// One decoded mapping entry, in final column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueMapping {
    /// Column name for this group.
    pub name: String,

    /// Matching values; for a range, the two inclusive endpoints.
    pub values: SmallVec<[i64; 4]>,

    /// Whether `values` holds range endpoints rather than a discrete list.
    pub is_range: bool,

    /// Selects "not these values" instead.
    pub inverted: bool,
}

// ============================================================================
// PARSER
// ============================================================================

/// Parses an encoded mapping string into ordered entries.
///
/// Entries are re-ordered by the leading numeric prefix of their value spec
/// (ignoring `!`); entries with no parseable prefix sort last, keeping their
/// original order. The result is a deterministic, human-curated column order
/// independent of any map iteration order.
pub fn parse_value_mappings(encoded: &str) -> Result<Vec<ValueMapping>, ConfigurationError> {
    let mut entries: Vec<(Option<i64>, ValueMapping)> = Vec::new();

    for raw in encoded.split('|') {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }

        let (spec, name) = raw
            .split_once(':')
            .ok_or_else(|| ConfigurationError::MalformedMappingEntry(raw.to_string()))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(ConfigurationError::MalformedMappingEntry(raw.to_string()));
        }

        let spec = spec.trim();
        let (inverted, spec) = match spec.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, spec),
        };

        let (values, is_range) = parse_value_spec(spec)?;
        entries.push((
            leading_numeric_prefix(spec),
            ValueMapping {
                name: name.to_string(),
                values,
                is_range,
                inverted,
            },
        ));
    }

    // Stable sort: prefixed entries ascending, unprefixed last in original order.
    entries.sort_by_key(|(prefix, _)| match prefix {
        Some(p) => (false, *p),
        None => (true, 0),
    });

    Ok(entries.into_iter().map(|(_, entry)| entry).collect())
}

/// Parses a value spec into (values, is_range).
fn parse_value_spec(spec: &str) -> Result<(SmallVec<[i64; 4]>, bool), ConfigurationError> {
    if spec.contains(',') {
        let mut values = SmallVec::new();
        for part in spec.split(',') {
            let value = part.trim().parse::<i64>().map_err(|_| {
                ConfigurationError::MalformedMappingEntry(spec.to_string())
            })?;
            values.push(value);
        }
        return Ok((values, false));
    }

    if let Ok(value) = spec.parse::<i64>() {
        return Ok((SmallVec::from_slice(&[value]), false));
    }

    let (lo, hi) = parse_range(spec)?;
    if hi < lo {
        return Err(ConfigurationError::DescendingRange {
            spec: spec.to_string(),
            lo,
            hi,
        });
    }
    Ok((SmallVec::from_slice(&[lo, hi]), true))
}

/// Splits a dash-separated range spec into its endpoints.
///
/// The dash count disambiguates negative endpoints:
/// - `"1-3"`   -> (1, 3)
/// - `"-3-5"`  -> (-3, 5)
/// - `"1--3"`  -> (1, -3) (then rejected as descending)
/// - `"-3--1"` -> (-3, -1)
fn parse_range(spec: &str) -> Result<(i64, i64), ConfigurationError> {
    let malformed = |reason: &str| ConfigurationError::MalformedRange {
        spec: spec.to_string(),
        reason: reason.to_string(),
    };

    let dashes = spec.matches('-').count();
    if dashes > 3 {
        return Err(malformed("more than 3 dashes is ambiguous"));
    }

    let (lo_str, hi_str) = match dashes {
        1 => spec
            .split_once('-')
            .ok_or_else(|| malformed("missing range separator"))?,
        2 => {
            if let Some(rest) = spec.strip_prefix('-') {
                // "-a-b": the separator is the second dash.
                let idx = rest
                    .find('-')
                    .ok_or_else(|| malformed("missing range separator"))?;
                (&spec[..idx + 1], &rest[idx + 1..])
            } else {
                // "a--b": the separator is the first dash.
                let idx = spec
                    .find('-')
                    .ok_or_else(|| malformed("missing range separator"))?;
                (&spec[..idx], &spec[idx + 1..])
            }
        }
        3 => {
            if !spec.starts_with('-') {
                return Err(malformed("cannot place 3 dashes in one range"));
            }
            let idx = spec
                .find("--")
                .ok_or_else(|| malformed("cannot place 3 dashes in one range"))?;
            (&spec[..idx], &spec[idx + 1..])
        }
        _ => return Err(malformed("not a number or range")),
    };

    let lo = lo_str
        .parse::<i64>()
        .map_err(|_| malformed("range start is not a number"))?;
    let hi = hi_str
        .parse::<i64>()
        .map_err(|_| malformed("range end is not a number"))?;
    Ok((lo, hi))
}

/// Extracts the leading numeric prefix of a value spec (optional sign, then
/// digits). Used only as a sort key.
fn leading_numeric_prefix(spec: &str) -> Option<i64> {
    let mut end = 0;
    for (i, c) in spec.char_indices() {
        if i == 0 && c == '-' {
            end = 1;
            continue;
        }
        if c.is_ascii_digit() {
            end = i + 1;
        } else {
            break;
        }
    }
    spec[..end].parse::<i64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_reads_signed_digits() {
        assert_eq!(leading_numeric_prefix("1-3"), Some(1));
        assert_eq!(leading_numeric_prefix("-3-5"), Some(-3));
        assert_eq!(leading_numeric_prefix("5,6"), Some(5));
        assert_eq!(leading_numeric_prefix("high"), None);
        assert_eq!(leading_numeric_prefix("-"), None);
    }

    #[test]
    fn negative_ranges_split_on_the_right_dash() {
        assert_eq!(parse_range("-3-5").unwrap(), (-3, 5));
        assert_eq!(parse_range("-3--1").unwrap(), (-3, -1));
        assert_eq!(parse_range("1-3").unwrap(), (1, 3));
    }

    #[test]
    fn three_dashes_without_leading_sign_is_rejected() {
        assert!(parse_range("1-2-3-4").is_err());
    }
}
