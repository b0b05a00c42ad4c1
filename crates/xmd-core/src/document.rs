//! Per-parse cross-cutting state: link references, footnotes and heading ids.
//!
//! Citations can precede their definitions, so resolution is deferred: the
//! state remembers which tokens wait for a label and, once the label becomes
//! known, queues [`Patch`]es against them. The parser drains and applies those
//! patches; that is the only place committed tokens change after creation.

use std::collections::HashMap;
use std::fmt;

use crate::cursor::Point;
use crate::diagnostic::{Diagnostic, W_FOOTNOTE_MISSING, W_REF_MISSING};
use crate::label::{heading_id, normalize_label};
use crate::token::Token;

/// Address of a committed (or about to be committed) token.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum TokenRef {
    /// Index into the main token list.
    Body(usize),
    /// Index into the footnote footer list.
    Footer(usize),
    /// Inline token of a body token, identified by its start position.
    Inline { block: usize, start: usize },
}

/// Invoked with the footnote number once it is known.
pub type OnNumber = Box<dyn FnOnce(usize, &mut Token)>;

pub enum Patch {
    Attribute {
        target: TokenRef,
        key: &'static str,
        value: String,
    },
    Number {
        target: TokenRef,
        number: usize,
        apply: OnNumber,
    },
    /// Turns the token back into the literal source text it covers.
    Literal { target: TokenRef },
}

impl fmt::Debug for Patch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Patch::Attribute { target, key, value } => f
                .debug_struct("Attribute")
                .field("target", target)
                .field("key", key)
                .field("value", value)
                .finish(),
            Patch::Number { target, number, .. } => f
                .debug_struct("Number")
                .field("target", target)
                .field("number", number)
                .finish_non_exhaustive(),
            Patch::Literal { target } => f.debug_struct("Literal").field("target", target).finish(),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Reference {
    pub label: String,
    pub url: String,
    pub title: Option<String>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HeadingEntry {
    pub id: String,
    pub text: String,
    pub level: u8,
    pub line: usize,
}

/// A reference-link citation whose label is not defined yet.
#[derive(Clone, Copy, Debug)]
pub struct PendingLink {
    pub open: TokenRef,
    pub close: TokenRef,
    pub point: Point,
}

struct FootnoteEntry {
    destination: TokenRef,
    on_number: Option<OnNumber>,
}

struct PendingCitation {
    token: TokenRef,
    point: Point,
}

/// Result of citing a footnote.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Citation {
    pub number: usize,
    /// True for the first citation of the label in the document.
    pub first: bool,
}

#[derive(Default)]
pub struct DocumentState {
    references: HashMap<String, Reference>,
    pending_links: HashMap<String, Vec<PendingLink>>,
    footnotes: HashMap<String, FootnoteEntry>,
    footnote_numbers: HashMap<String, usize>,
    pending_citations: HashMap<String, Vec<PendingCitation>>,
    footnote_count: usize,
    headings: Vec<HeadingEntry>,
    heading_ids: HashMap<String, usize>,
    diagnostics: Vec<Diagnostic>,
    patches: Vec<Patch>,
}

impl DocumentState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_reference(&mut self, label: &str, url: &str, title: Option<&str>) {
        let key = normalize_label(label);
        let reference = Reference {
            label: key.clone(),
            url: url.to_string(),
            title: title.map(str::to_string),
        };
        for pending in self.pending_links.remove(&key).unwrap_or_default() {
            Self::link_patches(&mut self.patches, pending.open, &reference);
        }
        self.references.insert(key, reference);
    }

    /// Resolves a reference-link citation now, or parks it until the label is defined.
    pub fn resolve_reference(&mut self, label: &str, link: PendingLink) {
        let key = normalize_label(label);
        match self.references.get(&key) {
            Some(reference) => Self::link_patches(&mut self.patches, link.open, reference),
            None => self.pending_links.entry(key).or_default().push(link),
        }
    }

    fn link_patches(patches: &mut Vec<Patch>, target: TokenRef, reference: &Reference) {
        patches.push(Patch::Attribute {
            target,
            key: "href",
            value: reference.url.clone(),
        });
        if let Some(title) = &reference.title {
            patches.push(Patch::Attribute {
                target,
                key: "title",
                value: title.clone(),
            });
        }
    }

    pub fn reference(&self, label: &str) -> Option<&Reference> {
        self.references.get(&normalize_label(label))
    }

    pub fn has_footnote(&self, label: &str) -> bool {
        self.footnotes.contains_key(&normalize_label(label))
    }

    /// Registers a footnote definition. The first definition of a label wins;
    /// later ones are ignored and reported as `false`.
    pub fn register_footnote_def(
        &mut self,
        label: &str,
        destination: TokenRef,
        on_number: OnNumber,
    ) -> bool {
        let key = normalize_label(label);
        if self.footnotes.contains_key(&key) {
            return false;
        }
        self.patches.push(Patch::Attribute {
            target: destination,
            key: "id",
            value: format!("def-{key}"),
        });
        for citation in self.pending_citations.remove(&key).unwrap_or_default() {
            self.patches.push(Patch::Attribute {
                target: citation.token,
                key: "href",
                value: format!("#def-{key}"),
            });
        }
        let on_number = match self.footnote_numbers.get(&key) {
            Some(&number) => {
                self.patches.push(Patch::Number {
                    target: destination,
                    number,
                    apply: on_number,
                });
                None
            }
            None => Some(on_number),
        };
        self.footnotes.insert(
            key,
            FootnoteEntry {
                destination,
                on_number,
            },
        );
        true
    }

    /// Numbers a footnote citation. Numbers follow citation order.
    pub fn resolve_footnote_ref(&mut self, label: &str, citation: TokenRef, point: Point) -> Citation {
        let key = normalize_label(label);
        let (number, first) = match self.footnote_numbers.get(&key) {
            Some(&number) => (number, false),
            None => {
                self.footnote_count += 1;
                let number = self.footnote_count;
                self.footnote_numbers.insert(key.clone(), number);
                (number, true)
            }
        };
        match self.footnotes.get_mut(&key) {
            Some(entry) => {
                self.patches.push(Patch::Attribute {
                    target: citation,
                    key: "href",
                    value: format!("#def-{key}"),
                });
                if let Some(apply) = entry.on_number.take() {
                    self.patches.push(Patch::Number {
                        target: entry.destination,
                        number,
                        apply,
                    });
                }
            }
            None => self
                .pending_citations
                .entry(key)
                .or_default()
                .push(PendingCitation {
                    token: citation,
                    point,
                }),
        }
        Citation { number, first }
    }

    /// Assigns a unique id to a heading and queues it onto `token`.
    pub fn register_heading(&mut self, text: &str, level: u8, line: usize, token: TokenRef) -> String {
        let base = heading_id(text);
        let seen = self.heading_ids.entry(base.clone()).or_insert(0);
        let id = if *seen == 0 {
            base
        } else {
            format!("{base}-{seen}")
        };
        *seen += 1;
        self.headings.push(HeadingEntry {
            id: id.clone(),
            text: text.to_string(),
            level,
            line,
        });
        self.patches.push(Patch::Attribute {
            target: token,
            key: "id",
            value: id.clone(),
        });
        id
    }

    pub fn headings(&self) -> &[HeadingEntry] {
        &self.headings
    }

    pub fn push_diagnostic(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn take_patches(&mut self) -> Vec<Patch> {
        std::mem::take(&mut self.patches)
    }

    /// Gives up on everything still unresolved once the document is complete.
    pub fn finish(&mut self) -> Vec<Patch> {
        let mut links: Vec<(String, PendingLink)> = self
            .pending_links
            .drain()
            .flat_map(|(label, links)| links.into_iter().map(move |link| (label.clone(), link)))
            .collect();
        links.sort_by_key(|(_, link)| (link.point.line, link.point.column));
        for (label, link) in links {
            self.diagnostics.push(Diagnostic::warning(
                link.point,
                W_REF_MISSING,
                format!("reference `{label}` is never defined"),
            ));
            self.patches.push(Patch::Literal { target: link.open });
            self.patches.push(Patch::Literal { target: link.close });
        }

        let mut citations: Vec<(String, Point)> = self
            .pending_citations
            .drain()
            .flat_map(|(label, pending)| {
                pending
                    .into_iter()
                    .map(move |citation| (label.clone(), citation.point))
            })
            .collect();
        citations.sort_by_key(|(_, point)| (point.line, point.column));
        for (label, point) in citations {
            self.diagnostics.push(Diagnostic::warning(
                point,
                W_FOOTNOTE_MISSING,
                format!("footnote `{label}` is cited but never defined"),
            ));
        }
        self.take_patches()
    }

    pub fn into_parts(self) -> (Vec<HeadingEntry>, Vec<Reference>, Vec<Diagnostic>) {
        let mut references: Vec<Reference> = self.references.into_values().collect();
        references.sort_by(|a, b| a.label.cmp(&b.label));
        (self.headings, references, self.diagnostics)
    }
}
