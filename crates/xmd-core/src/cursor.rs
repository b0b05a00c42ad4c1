/// A position inside the input document.
///
/// `line` and `column` are 1-based, `offset` is the 0-based byte offset into the
/// tab-expanded content. Points are plain values: every accessor hands out a
/// copy, never a view of the live cursor.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub struct Point {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

impl Point {
    pub fn new(line: usize, column: usize, offset: usize) -> Self {
        Self {
            line,
            column,
            offset,
        }
    }
}

const TAB_WIDTH: usize = 4;

/// Line-oriented view of a document with a single movable position.
///
/// Block rules are the only code that advances it, and only through the
/// driver that owns it.
#[derive(Clone, Debug)]
pub struct InputCursor {
    lines: Vec<String>,
    point: Point,
    is_empty: bool,
}

impl InputCursor {
    pub fn new(content: &str) -> Self {
        let expanded = content.replace('\t', &" ".repeat(TAB_WIDTH));
        let lines = expanded
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
            .collect();
        let is_empty = content.is_empty();
        Self {
            lines,
            point: Point::new(if is_empty { 0 } else { 1 }, 1, 0),
            is_empty,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.is_empty
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn current_point(&self) -> Point {
        self.point
    }

    /// Rewinds to a point previously obtained from this cursor.
    pub fn reset_to(&mut self, point: Point) {
        self.point = point;
    }

    pub fn is_at_eof(&self) -> bool {
        self.point.line > self.lines.len()
    }

    pub fn has_next(&self) -> bool {
        self.point.line < self.lines.len()
    }

    pub fn current_line(&self) -> &str {
        self.line(0)
    }

    /// Line relative to the current one. Panics when out of range.
    pub fn line(&self, relative: isize) -> &str {
        let index = self.index(relative);
        assert!(
            index.is_some_and(|index| index < self.lines.len()),
            "line {} relative {} is outside the document ({} lines)",
            self.point.line,
            relative,
            self.lines.len()
        );
        &self.lines[index.unwrap_or_default()]
    }

    /// Moves to the next line. Returns `None` once the cursor walks past the
    /// last line; the cursor still advances so `is_at_eof` becomes true.
    pub fn next_line(&mut self) -> Option<&str> {
        let width = self.existing(0).map(|line| line.len() + 1);
        self.point.offset += width.unwrap_or_default();
        self.point.line += 1;
        self.point.column = 1;
        self.existing(0)
    }

    pub fn peek_line(&self) -> Option<&str> {
        self.existing(1)
    }

    pub fn previous_line(&self) -> Option<&str> {
        self.existing(-1)
    }

    /// Blank lines and lines outside the document both count as empty.
    pub fn is_empty_line(&self, relative: isize) -> bool {
        self.existing(relative)
            .is_none_or(|line| line.trim().is_empty())
    }

    /// Point of the first non-whitespace column of a line together with the
    /// line stripped of its leading whitespace. The cursor does not move.
    pub fn line_skip_whitespace(&self, relative: isize) -> (Point, &str) {
        let line = self.line(relative);
        let trimmed = line.trim_start();
        let skipped = line.len() - trimmed.len();
        let mut point = self.point;
        if relative != 0 {
            point.line = self.point.line.saturating_add_signed(relative);
            point.offset = self.line_offset(point.line);
        }
        point.column = 1 + skipped;
        point.offset += skipped;
        (point, trimmed)
    }

    pub fn leading_whitespaces(&self, relative: isize) -> usize {
        self.existing(relative).map_or(0, leading_whitespaces)
    }

    pub fn trailing_whitespaces(&self, relative: isize) -> usize {
        self.existing(relative).map_or(0, trailing_whitespaces)
    }

    /// Advances over blank lines; returns the first non-blank line or `None`
    /// at the end of the document.
    pub fn skip_to_first_non_empty_line(&mut self) -> Option<&str> {
        while !self.is_at_eof() && self.is_empty_line(0) {
            self.next_line();
        }
        self.existing(0)
    }

    /// Joins the 1-based, inclusive line range `start..=end`.
    pub fn slice(&self, start: usize, end: usize) -> String {
        if start == 0 || start > end {
            return String::new();
        }
        let last = end.min(self.lines.len());
        if start > last {
            return String::new();
        }
        self.lines[start - 1..last].join("\n")
    }

    fn index(&self, relative: isize) -> Option<usize> {
        self.point
            .line
            .checked_sub(1)?
            .checked_add_signed(relative)
    }

    fn existing(&self, relative: isize) -> Option<&str> {
        let index = self.index(relative)?;
        self.lines.get(index).map(String::as_str)
    }

    fn line_offset(&self, line: usize) -> usize {
        self.lines
            .iter()
            .take(line.saturating_sub(1))
            .map(|line| line.len() + 1)
            .sum()
    }
}

/// Leading whitespace width; a tab counts as four columns.
pub fn leading_whitespaces(line: &str) -> usize {
    let mut count = 0;
    for ch in line.chars() {
        match ch {
            ' ' => count += 1,
            '\t' => count += TAB_WIDTH,
            _ => break,
        }
    }
    count
}

pub fn trailing_whitespaces(line: &str) -> usize {
    line.len() - line.trim_end().len()
}
