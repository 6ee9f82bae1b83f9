//! Line-oriented markdown parsing into blocks
//!
//! Headings, images, todos, fenced code and paragraphs always land at the
//! document root. Bulleted and numbered items nest by indentation using an
//! explicit stack of open items.

use once_cell::sync::Lazy;
use regex::Regex;

use super::inline::parse_inline;
use crate::blocks::{Block, Document, HeadingLevel};

/// Language assigned to fences without an info string
pub const DEFAULT_CODE_LANGUAGE: &str = "plain text";

/// Columns a tab expands to when measuring list indentation
const TAB_WIDTH: usize = 4;

const FENCE: &str = "```";

static IMAGE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^!\[([^\]]*)\]\(([^)]+)\)").unwrap());

static TODO_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^- \[([ xX])\] ?").unwrap());

static LIST_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([ \t]*)([-*]|\d+\.) (.*)$").unwrap());

/// An open list item that may still receive children
struct Frame {
    indent: usize,
    item: Block,
}

/// Builds the block forest line by line
struct TreeBuilder {
    root: Document,
    stack: Vec<Frame>,
}

impl TreeBuilder {
    fn new() -> Self {
        Self {
            root: Vec::new(),
            stack: Vec::new(),
        }
    }

    /// Close every open list item and append `block` to the root
    fn push_root(&mut self, block: Block) {
        self.close_while(|_| true);
        self.root.push(block);
    }

    /// Attach a list item under the nearest open item with smaller indent
    fn push_list_item(&mut self, indent: usize, item: Block) {
        self.close_while(|frame| frame.indent >= indent);
        self.stack.push(Frame { indent, item });
    }

    fn close_while(&mut self, mut should_close: impl FnMut(&Frame) -> bool) {
        while self.stack.last().is_some_and(&mut should_close) {
            if let Some(frame) = self.stack.pop() {
                self.attach(frame.item);
            }
        }
    }

    fn attach(&mut self, block: Block) {
        match self.stack.last_mut().and_then(|parent| parent.item.children_mut()) {
            Some(children) => children.push(block),
            None => self.root.push(block),
        }
    }

    fn finish(mut self) -> Document {
        self.close_while(|_| true);
        self.root
    }
}

/// Buffered fenced code block
struct OpenFence {
    /// Indentation of the opening fence; only a fence at most this deep closes
    indent: usize,
    language: String,
    lines: Vec<String>,
}

impl OpenFence {
    fn new(indent: usize, info: &str) -> Self {
        let language = match info.trim() {
            "" => DEFAULT_CODE_LANGUAGE.to_string(),
            lang => lang.to_string(),
        };
        Self {
            indent,
            language,
            lines: Vec::new(),
        }
    }

    /// Whether `line` ends this block
    fn closes_on(&self, line: &str) -> bool {
        fence_line(line).is_some_and(|(indent, _)| indent <= self.indent)
    }

    fn into_block(self) -> Block {
        Block::Code {
            language: self.language,
            content: self.lines.join("\n"),
        }
    }
}

/// Parse markdown text into a block forest. Never fails.
pub fn parse(text: &str) -> Document {
    let mut tree = TreeBuilder::new();
    let mut fence: Option<OpenFence> = None;

    for line in text.lines() {
        match fence.take() {
            Some(open) if open.closes_on(line) => tree.push_root(open.into_block()),
            Some(mut open) => {
                open.lines.push(line.to_string());
                fence = Some(open);
            }
            None => match fence_line(line) {
                Some((indent, info)) => fence = Some(OpenFence::new(indent, info)),
                None => parse_line(&mut tree, line),
            },
        }
    }

    // Unterminated fence keeps its content
    if let Some(open) = fence {
        tree.push_root(open.into_block());
    }

    tree.finish()
}

fn parse_line(tree: &mut TreeBuilder, line: &str) {
    if let Some(caps) = IMAGE_REGEX.captures(line) {
        tree.push_root(Block::Image {
            url: caps[2].to_string(),
            caption: caps[1].to_string(),
        });
    } else if let Some((level, rest)) = heading_prefix(line) {
        tree.push_root(Block::heading(level, parse_inline(rest)));
    } else if let Some(caps) = TODO_REGEX.captures(line) {
        let checked = &caps[1] != " ";
        let rest = &line[caps.get(0).map_or(0, |m| m.end())..];
        tree.push_root(Block::todo(parse_inline(rest), checked));
    } else if let Some(caps) = LIST_REGEX.captures(line) {
        let indent = indent_width(&caps[1]);
        let text = parse_inline(&caps[3]);
        let item = if caps[2].ends_with('.') {
            Block::numbered(text)
        } else {
            Block::bulleted(text)
        };
        tree.push_list_item(indent, item);
    } else if !line.trim().is_empty() {
        tree.push_root(Block::paragraph(parse_inline(line)));
    }
}

fn heading_prefix(line: &str) -> Option<(HeadingLevel, &str)> {
    if let Some(rest) = line.strip_prefix("# ") {
        Some((HeadingLevel::H1, rest))
    } else if let Some(rest) = line.strip_prefix("## ") {
        Some((HeadingLevel::H2, rest))
    } else {
        line.strip_prefix("### ").map(|rest| (HeadingLevel::H3, rest))
    }
}

/// Indentation and info string of a fence line, if `line` is one
pub(super) fn fence_line(line: &str) -> Option<(usize, &str)> {
    let trimmed = line.trim_start();
    let info = trimmed.strip_prefix(FENCE)?;
    let indent = indent_width(&line[..line.len() - trimmed.len()]);
    Some((indent, info))
}

fn indent_width(leading: &str) -> usize {
    leading
        .chars()
        .map(|c| if c == '\t' { TAB_WIDTH } else { 1 })
        .sum()
}
