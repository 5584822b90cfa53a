//! FILENAME: crosstab-engine/src/significance.rs
//! Significance Engine - comparative statistics over assembled tables.
//!
//! Two mutually exclusive comparison modes (vs-total, within-break) plus
//! independent index scores. The t-score math itself lives behind the
//! external `SignificanceTester` seam; this module only routes the right
//! cell pairs through it and writes the annotations back.
//!
//! Within-break comparisons and index scores operate on the sibling leaf
//! groups recorded at tree-build time, so nothing here counts tree levels
//! to skip the synthetic roots.

use model::{CrosstabError, Measure, MeasureKind, SignificanceTester};

use crate::view::{CrosstabTable, TOTAL_COLUMN_ID};

/// Everything the comparison passes need besides the table itself.
pub struct SignificanceContext<'a> {
    pub measure: &'a Measure,
    pub tester: &'a dyn SignificanceTester,
    pub confidence_level: f64,
}

// ============================================================================
// VS-TOTAL
// ============================================================================

/// Compares every non-Total column against the row's Total column, mutating
/// t-scores, verdicts, and the "±N% vs Total" explanation in place. Rows
/// with fewer than two columns have nothing to compare and are skipped.
pub fn annotate_vs_total(
    table: &mut CrosstabTable,
    ctx: &SignificanceContext,
) -> Result<(), CrosstabError> {
    if ctx.measure.kind == MeasureKind::Text {
        return Ok(());
    }

    for row in &mut table.rows {
        if row.cells.len() < 2 {
            continue;
        }
        let total = row
            .cells
            .get(TOTAL_COLUMN_ID)
            .cloned()
            .ok_or_else(|| {
                CrosstabError::Invariant(format!(
                    "total column missing from result map of row '{}'",
                    row.label
                ))
            })?;

        for (column_id, cell) in row.cells.iter_mut() {
            if column_id == TOTAL_COLUMN_ID {
                continue;
            }
            let verdict = ctx
                .tester
                .significance(ctx.measure, cell, &total, ctx.confidence_level);
            cell.t_score = Some(verdict.t_score);
            cell.significant = Some(verdict.significant);
            cell.explanation = Some(vs_total_explanation(
                ctx.measure,
                cell.value - total.value,
            ));
        }
    }

    Ok(())
}

fn vs_total_explanation(measure: &Measure, difference: f64) -> String {
    let rounded = difference.round() as i64;
    match measure.kind {
        MeasureKind::YesNo => format!("{:+}% vs Total", rounded),
        _ => format!("{:+} vs Total", rounded),
    }
}

// ============================================================================
// WITHIN-BREAK
// ============================================================================

/// Compares every ordered column pair within each sibling leaf group. A
/// significant difference appends the other column's significance letter to
/// this column's list for that row. Rows with fewer than two columns are
/// skipped entirely. A group's comparand, when set, restricts comparisons to
/// pairs against that column only.
pub fn annotate_within_break(
    table: &mut CrosstabTable,
    ctx: &SignificanceContext,
) -> Result<(), CrosstabError> {
    if ctx.measure.kind == MeasureKind::Text {
        return Ok(());
    }

    for row in table.rows.iter_mut() {
        if row.cells.len() < 2 {
            continue;
        }

        for group in table.leaf_groups.iter() {
            if group.columns.len() < 2 {
                continue;
            }

            for this in &group.columns {
                for other in &group.columns {
                    if this.id == other.id {
                        continue;
                    }
                    if let Some(comparand) = &group.comparand {
                        if &other.id != comparand {
                            continue;
                        }
                    }

                    let other_cell = row.cells.get(&other.id).cloned().ok_or_else(|| {
                        CrosstabError::Invariant(format!(
                            "column '{}' missing from result map of row '{}'",
                            other.id, row.label
                        ))
                    })?;
                    let this_cell = row.cells.get_mut(&this.id).ok_or_else(|| {
                        CrosstabError::Invariant(format!(
                            "column '{}' missing from result map of row '{}'",
                            this.id, row.label
                        ))
                    })?;

                    let verdict = ctx.tester.significance(
                        ctx.measure,
                        this_cell,
                        &other_cell,
                        ctx.confidence_level,
                    );
                    if verdict.significant {
                        this_cell.significant_against.push(other.letter);
                    }
                }
            }
        }
    }

    Ok(())
}

// ============================================================================
// INDEX SCORES
// ============================================================================

/// A column's value as a percentage of the row total, rounded half away
/// from zero. Zero on either side yields 0 rather than a division artifact.
pub fn index_score(value: f64, total: f64) -> i64 {
    if value == 0.0 || total == 0.0 {
        return 0;
    }
    (value / total * 100.0).round() as i64
}

/// Computes index scores for every sibling-group column, relative to the
/// row's Total cell. Independent of the significance mode.
pub fn apply_index_scores(table: &mut CrosstabTable) -> Result<(), CrosstabError> {
    for row in table.rows.iter_mut() {
        let total = row
            .cells
            .get(TOTAL_COLUMN_ID)
            .map(|cell| cell.value)
            .ok_or_else(|| {
                CrosstabError::Invariant(format!(
                    "total column missing from result map of row '{}'",
                    row.label
                ))
            })?;

        for group in table.leaf_groups.iter() {
            for column in &group.columns {
                let cell = row.cells.get_mut(&column.id).ok_or_else(|| {
                    CrosstabError::Invariant(format!(
                        "column '{}' missing from result map of row '{}'",
                        column.id, row.label
                    ))
                })?;
                cell.index_score = Some(index_score(cell.value, total));
            }
        }
    }

    Ok(())
}
