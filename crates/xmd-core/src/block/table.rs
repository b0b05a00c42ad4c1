use super::{BlockContext, BlockRule};
use crate::cursor::{InputCursor, Point};
use crate::state_change::StateChange;
use crate::token::BlockToken;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
enum Align {
    #[default]
    Left,
    Center,
    Right,
}

impl Align {
    fn style(self) -> &'static str {
        match self {
            Align::Left => "text-align: left",
            Align::Center => "text-align: center",
            Align::Right => "text-align: right",
        }
    }
}

fn is_row(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.len() >= 2 && trimmed.starts_with('|') && trimmed.ends_with('|')
}

fn cells(line: &str) -> Vec<&str> {
    let trimmed = line.trim();
    let inner = trimmed.strip_prefix('|').unwrap_or(trimmed);
    let inner = inner.strip_suffix('|').unwrap_or(inner);
    inner.split('|').map(str::trim).collect()
}

fn alignments(line: &str) -> Option<Vec<Align>> {
    if !line.trim_start().starts_with('|') {
        return None;
    }
    cells(line)
        .into_iter()
        .map(|cell| {
            let left = cell.starts_with(':');
            let right = cell.ends_with(':') && cell.len() > 1;
            let dashes = cell.trim_start_matches(':').trim_end_matches(':');
            if dashes.is_empty() || !dashes.bytes().all(|b| b == b'-') {
                return None;
            }
            Some(match (left, right) {
                (true, true) => Align::Center,
                (false, true) => Align::Right,
                _ => Align::Left,
            })
        })
        .collect()
}

/// Pipe tables: header row, alignment row, body rows.
pub struct Table;

impl Table {
    fn row(
        &self,
        change: &mut StateChange,
        at: Point,
        line: &str,
        cell_tag: &str,
        aligns: &[Align],
    ) {
        change.add_token(BlockToken::open("tr", at, self.name(), 2));
        for (column, cell) in cells(line).into_iter().enumerate() {
            let align = aligns.get(column).copied().unwrap_or_default();
            change.add_token(
                BlockToken::wrapped(cell_tag, at, self.name(), cell, 3)
                    .with_attribute("style", align.style()),
            );
        }
        change.add_token(BlockToken::close("tr", at, self.name(), 2));
    }
}

impl BlockRule for Table {
    fn name(&self) -> &'static str {
        "table"
    }

    fn process(
        &self,
        _ctx: &BlockContext<'_>,
        cursor: &mut InputCursor,
        change: &mut StateChange,
    ) -> bool {
        if !is_row(cursor.current_line()) {
            return false;
        }
        let Some(aligns) = cursor.peek_line().and_then(alignments) else {
            return false;
        };
        let name = self.name();
        let start = cursor.current_point();

        change.add_token(BlockToken::open("table", start, name, 0));
        change.add_token(BlockToken::open("thead", start, name, 1));
        let header = cursor.current_line().to_string();
        self.row(change, start, &header, "th", &aligns);
        change.add_token(BlockToken::close("thead", start, name, 1));

        cursor.next_line();
        let mut body_open = false;
        while let Some(line) = cursor.next_line() {
            if !is_row(line) {
                break;
            }
            let line = line.to_string();
            let at = cursor.current_point();
            if !body_open {
                change.add_token(BlockToken::open("tbody", at, name, 1));
                body_open = true;
            }
            self.row(change, at, &line, "td", &aligns);
        }
        let end = cursor.current_point();
        if body_open {
            change.add_token(BlockToken::close("tbody", end, name, 1));
        }
        change.add_token(BlockToken::close("table", end, name, 0));
        true
    }
}
