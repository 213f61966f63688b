//! Candidate selection after an ambiguous search.

use crate::error::SelectionError;

/// Parse the number a user typed to pick a candidate.
pub fn parse_index(input: &str) -> Result<i64, SelectionError> {
    input
        .trim()
        .parse()
        .map_err(|_| SelectionError::NotANumber {
            input: input.to_string(),
        })
}

/// Map a 1-based `index` onto a list of `count` candidates.
pub fn resolve_index(index: i64, count: usize) -> Result<usize, SelectionError> {
    let out_of_range = || SelectionError::OutOfRange { index, max: count };
    let position = usize::try_from(index).map_err(|_| out_of_range())?;
    if (1..=count).contains(&position) {
        Ok(position - 1)
    } else {
        Err(out_of_range())
    }
}
