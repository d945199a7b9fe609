//! Formatting and parsing of `prefix ‖ zero-padded suffix` codes.

/// A code split into its prefix and numeric suffix.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParsedCode<'a> {
    pub prefix: &'a str,
    pub suffix: &'a str,
    pub value: u64,
}

impl<'a> ParsedCode<'a> {
    /// Splits `code` under `prefix`.
    ///
    /// Returns `None` when the code does not start with the exact prefix or when the remainder
    /// is not a non-empty run of ASCII digits fitting in a `u64`.
    pub fn split(prefix: &'a str, code: &'a str) -> Option<Self> {
        let suffix = code.strip_prefix(prefix)?;
        if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let value = suffix.parse::<u64>().ok()?;
        Some(Self {
            prefix,
            suffix,
            value,
        })
    }
}

/// Renders `prefix` followed by `value` left-padded with zeros to `width` digits.
///
/// Values wider than `width` are rendered in full.
pub fn format_code(prefix: &str, value: u64, width: usize) -> String {
    format!("{prefix}{value:0width$}")
}

/// Where the sequence of a scope picks up, given the most recent code seen in it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SequenceStart {
    /// No record exists in the scope.
    Empty,
    /// The last code parsed under the current prefix.
    Continue(u64),
    /// The last code did not parse under the current prefix.
    Reset,
}

impl SequenceStart {
    pub fn from_last(prefix: &str, last_code: Option<&str>) -> Self {
        match last_code {
            None => SequenceStart::Empty,
            Some(code) => match ParsedCode::split(prefix, code) {
                Some(parsed) => SequenceStart::Continue(parsed.value),
                None => SequenceStart::Reset,
            },
        }
    }

    /// First numeric value to try; `None` on `u64` overflow.
    pub fn next_value(self) -> Option<u64> {
        match self {
            SequenceStart::Empty | SequenceStart::Reset => Some(1),
            SequenceStart::Continue(last) => last.checked_add(1),
        }
    }
}
