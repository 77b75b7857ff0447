//! A tiny rule engine for scanning grids row by row.
//!
//! Each sheet shape is described by an ordered list of `RowRule`s. For every row the first rule
//! whose predicate matches decides what happens to that row; rows that no rule matches are ignored.
//! Keeping the rules as data means each sentinel (`TOTAL`, `GRAND TOTAL`, `MoM...`) can be tested
//! on its own and the order of precedence is visible in one place.

use crate::model::{cell_at, parse_int, parse_number, Cell};

/// What the scan should do after a rule has handled a row.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) enum Flow {
    Next,
    Stop,
}

/// A borrowed view of one grid row with positional accessors that tolerate short rows.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Row<'a> {
    cells: &'a [Cell],
}

impl<'a> Row<'a> {
    pub(crate) fn new(cells: &'a [Cell]) -> Self {
        Self { cells }
    }

    pub(crate) fn cell(&self, ix: usize) -> &'a Cell {
        cell_at(self.cells, ix)
    }

    /// The first cell, trimmed. This is where the sheets put their row labels and sentinels.
    pub(crate) fn label(&self) -> String {
        self.cell(0).trimmed()
    }

    pub(crate) fn text(&self, ix: usize) -> String {
        self.cell(ix).to_string()
    }

    pub(crate) fn number(&self, ix: usize) -> f64 {
        parse_number(self.cell(ix))
    }

    pub(crate) fn int(&self, ix: usize) -> i64 {
        parse_int(self.cell(ix))
    }

    /// Up to `len` cells starting at column `start`. Fewer are returned if the row is short.
    pub(crate) fn span(&self, start: usize, len: usize) -> impl Iterator<Item = &'a Cell> {
        self.cells.iter().skip(start).take(len)
    }

    pub(crate) fn numbers(&self, start: usize, len: usize) -> Vec<f64> {
        self.span(start, len).map(parse_number).collect()
    }
}

/// A predicate and the action to take on rows that satisfy it.
pub(crate) struct RowRule<S> {
    pub(crate) name: &'static str,
    pub(crate) when: fn(&Row<'_>) -> bool,
    pub(crate) then: fn(&mut S, &Row<'_>) -> Flow,
}

/// Runs `rules` over `rows`, first match wins, until the rows run out or a rule says `Stop`.
pub(crate) fn apply_rules<S>(rows: &[Vec<Cell>], rules: &[RowRule<S>], state: &mut S) {
    for cells in rows {
        let row = Row::new(cells);
        let Some(rule) = rules.iter().find(|rule| (rule.when)(&row)) else {
            continue;
        };
        if (rule.then)(state, &row) == Flow::Stop {
            tracing::trace!("Stopped scanning at the '{}' rule", rule.name);
            break;
        }
    }
}

// Predicates shared by several sheet shapes.

/// The first cell is missing or empty.
pub(crate) fn is_blank(row: &Row<'_>) -> bool {
    row.cell(0).is_blank()
}

/// The first cell is only whitespace, so it has no usable label.
pub(crate) fn has_no_label(row: &Row<'_>) -> bool {
    row.label().is_empty()
}

pub(crate) fn is_total(row: &Row<'_>) -> bool {
    row.label() == "TOTAL"
}

pub(crate) fn is_grand_total(row: &Row<'_>) -> bool {
    row.label() == "GRAND TOTAL"
}

pub(crate) fn always(_: &Row<'_>) -> bool {
    true
}

pub(crate) fn skip<S>(_: &mut S, _: &Row<'_>) -> Flow {
    Flow::Next
}

pub(crate) fn stop<S>(_: &mut S, _: &Row<'_>) -> Flow {
    Flow::Stop
}
