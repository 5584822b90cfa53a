//! FILENAME: crosstab-engine/src/expand.rs
//! Cartesian Expander - combines simultaneous filter dimensions into tuples.
//!
//! Given N independent dimension lists, produces every combinatorial tuple
//! with the leftmost dimension varying slowest. The product size is checked
//! against a caller-supplied cap BEFORE materialization; exceeding it is a
//! fatal capacity error, never silent truncation. Callers wanting a subset
//! must ask for a page window explicitly.

use model::CrosstabError;

use crate::definition::PageWindow;

/// Expands the cross product of `dimensions`, capped at `cap` tuples.
pub fn expand_cartesian<T: Clone>(
    dimensions: &[Vec<T>],
    cap: usize,
) -> Result<Vec<Vec<T>>, CrosstabError> {
    let mut total: usize = 1;
    for dimension in dimensions {
        total = total
            .checked_mul(dimension.len())
            .ok_or(CrosstabError::Capacity {
                actual: usize::MAX,
                cap,
            })?;
    }
    if total > cap {
        log::warn!("cartesian product of {total} tuples exceeds the cap of {cap}");
        return Err(CrosstabError::Capacity { actual: total, cap });
    }

    let mut tuples: Vec<Vec<T>> = vec![Vec::new()];
    for dimension in dimensions {
        let mut next = Vec::with_capacity(tuples.len() * dimension.len());
        for tuple in &tuples {
            for item in dimension {
                let mut extended = Vec::with_capacity(tuple.len() + 1);
                extended.extend_from_slice(tuple);
                extended.push(item.clone());
                next.push(extended);
            }
        }
        tuples = next;
    }

    Ok(tuples)
}

/// Returns the 1-based page `window` of `tuples`, clamped to the available
/// tuple count.
pub fn page_window<T>(mut tuples: Vec<T>, window: &PageWindow) -> Vec<T> {
    let start = window
        .number
        .saturating_sub(1)
        .saturating_mul(window.size)
        .min(tuples.len());
    let end = start.saturating_add(window.size).min(tuples.len());
    tuples.drain(..start);
    tuples.truncate(end - start);
    tuples
}
