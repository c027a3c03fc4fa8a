//! Resolution of the `message_index` / `range` query parameters.
//!
//! Indices are 1-based: 1 is the most recent message of the window,
//! [`MAX_MESSAGES`] the oldest retrievable one.

use thiserror::Error;

use crate::constants::MAX_MESSAGES;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("Message index must be between 1 and {}", MAX_MESSAGES)]
    IndexOutOfRange,
    #[error("Invalid range format. Use \"start-end\" (e.g., \"1-5\")")]
    InvalidRangeFormat,
    #[error("Start index must be less than or equal to end index")]
    RangeReversed,
}

/// Which messages of the window a request asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    All,
    /// 1-based indices, in the order they should be returned.
    Indices(Vec<usize>),
}

impl Selection {
    /// Resolve the selection from the raw query values.
    ///
    /// `range` takes precedence over `message_index`; with neither, every
    /// retrieved message is selected.
    ///
    /// # Errors
    ///
    /// Returns a [`SelectionError`] if the chosen parameter fails validation.
    pub fn from_params(
        range: Option<&str>,
        message_index: Option<&str>,
    ) -> Result<Self, SelectionError> {
        if let Some(range) = range {
            let (start, end) = validate_range(range)?;
            Ok(Self::Indices((start..=end).collect()))
        } else if let Some(index) = message_index {
            Ok(Self::Indices(vec![parse_index(index)?]))
        } else {
            Ok(Self::All)
        }
    }
}

/// Check that a 1-based index lies inside the message window.
///
/// # Errors
///
/// Returns [`SelectionError::IndexOutOfRange`] for 0 or anything above [`MAX_MESSAGES`].
pub fn validate_index(index: usize) -> Result<usize, SelectionError> {
    if (1..=MAX_MESSAGES).contains(&index) {
        Ok(index)
    } else {
        Err(SelectionError::IndexOutOfRange)
    }
}

/// Parse and validate a single index given as a query string value.
///
/// # Errors
///
/// Non-numeric input is reported the same way as an out-of-range index.
pub fn parse_index(value: &str) -> Result<usize, SelectionError> {
    let index = value
        .trim()
        .parse::<usize>()
        .map_err(|_| SelectionError::IndexOutOfRange)?;
    validate_index(index)
}

/// Parse a `"start-end"` range into its inclusive bounds.
///
/// # Errors
///
/// Returns an error for malformed syntax, out-of-window bounds, or `start > end`.
pub fn validate_range(range: &str) -> Result<(usize, usize), SelectionError> {
    let (start, end) = range
        .split_once('-')
        .ok_or(SelectionError::InvalidRangeFormat)?;

    let start = start
        .trim()
        .parse::<usize>()
        .map_err(|_| SelectionError::InvalidRangeFormat)?;
    let end = end
        .trim()
        .parse::<usize>()
        .map_err(|_| SelectionError::InvalidRangeFormat)?;

    validate_index(start)?;
    validate_index(end)?;

    if start > end {
        return Err(SelectionError::RangeReversed);
    }

    Ok((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_index_bounds() {
        assert_eq!(validate_index(1), Ok(1));
        assert_eq!(validate_index(20), Ok(20));
        assert_eq!(validate_index(0), Err(SelectionError::IndexOutOfRange));
        assert_eq!(validate_index(21), Err(SelectionError::IndexOutOfRange));
    }

    #[test]
    fn test_parse_index_rejects_non_numeric() {
        assert_eq!(parse_index("abc"), Err(SelectionError::IndexOutOfRange));
        assert_eq!(parse_index("-1"), Err(SelectionError::IndexOutOfRange));
        assert_eq!(parse_index("5"), Ok(5));
    }

    #[test]
    fn test_validate_range_every_valid_pair() {
        for a in 1..=MAX_MESSAGES {
            for b in a..=MAX_MESSAGES {
                assert_eq!(validate_range(&format!("{a}-{b}")), Ok((a, b)));

                let Selection::Indices(indices) =
                    Selection::from_params(Some(&format!("{a}-{b}")), None).unwrap()
                else {
                    panic!("expected indices");
                };
                assert_eq!(indices.len(), b - a + 1);
                assert!(indices.windows(2).all(|w| w[0] < w[1]));
                assert!(indices.iter().all(|i| (1..=MAX_MESSAGES).contains(i)));
            }
        }
    }

    #[test]
    fn test_validate_range_errors() {
        assert_eq!(validate_range("5"), Err(SelectionError::InvalidRangeFormat));
        assert_eq!(validate_range("a-b"), Err(SelectionError::InvalidRangeFormat));
        assert_eq!(validate_range("1-"), Err(SelectionError::InvalidRangeFormat));
        assert_eq!(validate_range("1-2-3"), Err(SelectionError::InvalidRangeFormat));
        assert_eq!(validate_range("0-3"), Err(SelectionError::IndexOutOfRange));
        assert_eq!(validate_range("1-21"), Err(SelectionError::IndexOutOfRange));
        assert_eq!(validate_range("5-3"), Err(SelectionError::RangeReversed));
    }

    #[test]
    fn test_selection_precedence() {
        assert_eq!(
            Selection::from_params(Some("2-3"), Some("7")),
            Ok(Selection::Indices(vec![2, 3]))
        );
        assert_eq!(
            Selection::from_params(None, Some("7")),
            Ok(Selection::Indices(vec![7]))
        );
        assert_eq!(Selection::from_params(None, None), Ok(Selection::All));
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            SelectionError::IndexOutOfRange.to_string(),
            "Message index must be between 1 and 20"
        );
        assert_eq!(
            SelectionError::InvalidRangeFormat.to_string(),
            r#"Invalid range format. Use "start-end" (e.g., "1-5")"#
        );
    }
}
