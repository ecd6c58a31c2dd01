//! Parsing of selection expressions such as `1,3,5-8`.

use crate::types::ProcError;
use std::collections::BTreeSet;

/// Unique 1-based row indices, iterated in ascending order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet(BTreeSet<usize>);

impl SelectionSet {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, index: usize) -> bool {
        self.0.contains(&index)
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().copied()
    }

    /// Resolve the indices against the list they were parsed for.
    pub fn pick<'a, T>(&self, rows: &'a [T]) -> Vec<&'a T> {
        self.iter()
            .filter_map(|i| i.checked_sub(1).and_then(|i| rows.get(i)))
            .collect()
    }
}

impl FromIterator<usize> for SelectionSet {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        SelectionSet(iter.into_iter().collect())
    }
}

/// Parse `input` against a list of `max_index` rows.
///
/// Blank input is an empty selection, not an error.
pub fn parse_selection(input: &str, max_index: usize) -> Result<SelectionSet, ProcError> {
    let mut selected = BTreeSet::new();
    if input.trim().is_empty() {
        return Ok(SelectionSet(selected));
    }

    for token in input.split(',').map(str::trim) {
        if token.is_empty() {
            return Err(invalid("empty entry between commas"));
        }

        let (start, end) = match token.split_once('-') {
            Some((a, b)) => (parse_index(a, token)?, parse_index(b, token)?),
            None => {
                let n = parse_index(token, token)?;
                (n, n)
            }
        };

        if start > end {
            return Err(invalid(format!("range '{token}' is reversed")));
        }
        if start == 0 || end > max_index {
            return Err(invalid(format!(
                "'{token}' is outside 1-{max_index}"
            )));
        }
        selected.extend(start..=end);
    }

    Ok(SelectionSet(selected))
}

fn parse_index(raw: &str, token: &str) -> Result<usize, ProcError> {
    let raw = raw.trim();
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid(format!("'{token}' is not a number or range")));
    }
    raw.parse::<usize>()
        .map_err(|_| invalid(format!("'{token}' is too large")))
}

fn invalid(msg: impl Into<String>) -> ProcError {
    ProcError::InvalidSelection(msg.into())
}
