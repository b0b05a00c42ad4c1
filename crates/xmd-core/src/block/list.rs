use super::{BlockContext, BlockMath, BlockRule, CodeBlock, FootnoteDef, Heading, probe_terminators};
use crate::cursor::{InputCursor, Point, leading_whitespaces};
use crate::state_change::StateChange;
use crate::token::BlockToken;

const INDENT_PER_LEVEL: usize = 2;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum ListTag {
    Ordered,
    Unordered,
}

impl ListTag {
    fn as_str(self) -> &'static str {
        match self {
            ListTag::Ordered => "ol",
            ListTag::Unordered => "ul",
        }
    }
}

#[derive(Debug, Eq, PartialEq)]
struct ItemLine<'a> {
    tag: ListTag,
    depth: usize,
    marker: &'a str,
    content: &'a str,
}

fn item_line(line: &str) -> Option<ItemLine<'_>> {
    let trimmed = line.trim();
    let (tag, marker_len) = match trimmed.as_bytes().first()? {
        b'-' | b'*' | b'+' => (ListTag::Unordered, 1),
        b'0'..=b'9' => {
            let digits = trimmed.bytes().take_while(u8::is_ascii_digit).count();
            if trimmed.as_bytes().get(digits) != Some(&b'.') {
                return None;
            }
            (ListTag::Ordered, digits + 1)
        }
        _ => return None,
    };
    let (marker, rest) = trimmed.split_at(marker_len);
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some(ItemLine {
        tag,
        depth: leading_whitespaces(line) / INDENT_PER_LEVEL,
        marker,
        content: rest.trim(),
    })
}

/// Open lists, innermost last.
struct ListStack {
    open: Vec<(usize, ListTag, String)>,
}

impl ListStack {
    fn new() -> Self {
        Self { open: Vec::new() }
    }

    fn top(&self) -> &(usize, ListTag, String) {
        self.open.last().expect("list stack is never empty while a list is open")
    }

    fn open(&mut self, change: &mut StateChange, item: &ItemLine<'_>, at: Point) {
        change.add_token(BlockToken::open(item.tag.as_str(), at, List.name(), item.depth));
        self.open.push((item.depth, item.tag, item.marker.to_string()));
    }

    fn close_top(&mut self, change: &mut StateChange, at: Point) {
        let (depth, tag, _) = self.open.pop().expect("closing a list that was never opened");
        change.add_token(BlockToken::close(tag.as_str(), at, List.name(), depth));
    }

    fn close_all(&mut self, change: &mut StateChange, at: Point) {
        while !self.open.is_empty() {
            self.close_top(change, at);
        }
    }

    /// Reshapes the stack for the next item line.
    fn enter(&mut self, change: &mut StateChange, item: &ItemLine<'_>, at: Point) {
        if item.depth > self.top().0 {
            self.open(change, item, at);
            return;
        }
        while self.open.len() > 1 && self.top().0 > item.depth {
            self.close_top(change, at);
        }
        let (depth, tag, marker) = self.top();
        if *depth < item.depth {
            self.open(change, item, at);
        } else if *tag != item.tag || (item.tag == ListTag::Unordered && marker != item.marker) {
            self.close_top(change, at);
            self.open(change, item, at);
        }
    }

    /// Joins the item's non-empty lines with single spaces.
    fn add_item(&self, change: &mut StateChange, lines: &[String], at: Point) {
        let content = lines
            .iter()
            .filter(|line| !line.is_empty())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ");
        let depth = self.top().0 + 1;
        change.add_token(BlockToken::wrapped("li", at, List.name(), content, depth));
    }
}

/// `-`, `*`, `+` and `1.` items; two columns of indentation per level.
pub struct List;

impl BlockRule for List {
    fn name(&self) -> &'static str {
        "list"
    }

    fn terminated_by(&self) -> &'static [&'static dyn BlockRule] {
        &[&Heading, &CodeBlock, &FootnoteDef, &BlockMath]
    }

    fn process(
        &self,
        ctx: &BlockContext<'_>,
        cursor: &mut InputCursor,
        change: &mut StateChange,
    ) -> bool {
        let Some(first) = item_line(cursor.current_line()) else {
            return false;
        };
        let mut stack = ListStack::new();
        stack.open(change, &first, cursor.current_point());

        loop {
            let at = cursor.current_point();
            let mut content = match item_line(cursor.current_line()) {
                Some(item) => {
                    stack.enter(change, &item, at);
                    vec![item.content.to_string()]
                }
                None => unreachable!("list loop entered on a non-item line"),
            };

            while !cursor.is_empty_line(1) && item_line(cursor.line(1)).is_none() {
                cursor.next_line();
                if let Some(probe) = probe_terminators(ctx, cursor, self) {
                    stack.add_item(change, &content, at);
                    stack.close_all(change, probe.start());
                    change.merge(probe);
                    return true;
                }
                content.push(cursor.current_line().trim().to_string());
            }
            stack.add_item(change, &content, at);
            cursor.next_line();

            let after_item = cursor.current_point();
            if cursor.skip_to_first_non_empty_line().is_none()
                || item_line(cursor.current_line()).is_none()
            {
                cursor.reset_to(after_item);
                break;
            }
        }

        stack.close_all(change, cursor.current_point());
        true
    }
}
