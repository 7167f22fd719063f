//! Block-level markdown classification
//!
//! The body of a document is split into a flat sequence of [`Block`]s. Which
//! block a line starts is decided from the line's own prefix alone; the only
//! lookahead is the alignment row that turns a `|` line into a table header.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref IMAGE_LINE: Regex =
        Regex::new(r#"^!\[([^\]]*)\]\(\s*<?([^\s>)]*)>?(?:\s+"([^"]*)")?\s*\)\s*$"#).unwrap();
    static ref LINK_REFERENCE_LINE: Regex =
        Regex::new(r#"^\[([^\]]+)\]:\s*<?([^\s>]+)>?(?:\s+(?:"([^"]*)"|'([^']*)'|\(([^)]*)\)))?\s*$"#)
            .unwrap();
    static ref ALIGNMENT_CELL: Regex = Regex::new(r"^:?-+:?$").unwrap();
}

/// A classified span of body text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading { level: u8, text: String },
    Paragraph(String),
    BlockQuote(Vec<Block>),
    CodeBlock { lang: Option<String>, code: String },
    List(List),
    Table(Table),
    Rule,
    /// Raw HTML, passed through untouched
    Html(String),
    Image {
        alt: String,
        url: String,
        title: Option<String>,
    },
    /// `[label]: url` definition; renders nothing itself
    LinkReference {
        label: String,
        url: String,
        title: Option<String>,
    },
}

/// An ordered or unordered list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct List {
    pub ordered: bool,
    pub items: Vec<ListItem>,
}

/// One list item with its nested sub-lists
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListItem {
    /// 1-based position within the list, whatever digits the source used
    pub number: usize,
    pub text: String,
    /// Indented fenced code belonging to the item
    pub blocks: Vec<Block>,
    pub children: Vec<List>,
}

/// Column alignment from a table's delimiter row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    None,
    Left,
    Center,
    Right,
}

impl Alignment {
    fn from_cell(cell: &str) -> Self {
        match (cell.starts_with(':'), cell.ends_with(':')) {
            (true, true) => Alignment::Center,
            (true, false) => Alignment::Left,
            (false, true) => Alignment::Right,
            (false, false) => Alignment::None,
        }
    }

    /// CSS `text-align` value, if any
    pub fn as_css(&self) -> Option<&'static str> {
        match self {
            Alignment::None => None,
            Alignment::Left => Some("left"),
            Alignment::Center => Some("center"),
            Alignment::Right => Some("right"),
        }
    }
}

/// A pipe table. Rows keep whatever cell count the source had.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub header: Vec<String>,
    pub alignments: Vec<Alignment>,
    pub rows: Vec<Vec<String>>,
}

/// What kind of block a line opens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineKind {
    Heading,
    Quote,
    Fence,
    ListItem,
    Table,
    Rule,
    Image,
    LinkReference,
    Html,
    Text,
}

/// Lazy iterator over the blocks of a markdown body
///
/// Cloning gives an independent cursor; [`Blocks::new`] on the same text
/// always yields the same sequence.
#[derive(Debug, Clone)]
pub struct Blocks<'a> {
    lines: Vec<&'a str>,
    pos: usize,
}

impl<'a> Blocks<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            lines: text.lines().collect(),
            pos: 0,
        }
    }

    fn peek(&self, offset: usize) -> Option<&'a str> {
        self.lines.get(self.pos + offset).copied()
    }

    fn read_block(&mut self, line: &'a str) -> Block {
        match classify(line, self.peek(1)) {
            LineKind::Heading => {
                self.pos += 1;
                let (level, text) = heading(line).unwrap_or((1, line));
                Block::Heading {
                    level,
                    text: text.to_string(),
                }
            }
            LineKind::Quote => self.read_quote(),
            LineKind::Fence => self.read_fence(line),
            LineKind::ListItem => self.read_list(),
            LineKind::Table => self.read_table(line),
            LineKind::Rule => {
                self.pos += 1;
                Block::Rule
            }
            LineKind::Image => {
                self.pos += 1;
                image(line).unwrap_or_else(|| Block::Paragraph(line.trim().to_string()))
            }
            LineKind::LinkReference => {
                self.pos += 1;
                link_reference(line).unwrap_or_else(|| Block::Paragraph(line.trim().to_string()))
            }
            LineKind::Html => self.read_html(),
            LineKind::Text => self.read_paragraph(),
        }
    }

    fn read_quote(&mut self) -> Block {
        let mut inner = Vec::new();
        while let Some(line) = self.peek(0) {
            let Some(rest) = line.trim_start().strip_prefix('>') else {
                break;
            };
            inner.push(rest.strip_prefix(' ').unwrap_or(rest));
            self.pos += 1;
        }
        let inner = inner.join("\n");
        Block::BlockQuote(Blocks::new(&inner).collect())
    }

    fn read_fence(&mut self, opening: &str) -> Block {
        let indent = indent_width(opening);
        let opening = opening.trim();
        let fence_len = opening.chars().take_while(|c| *c == '`').count();
        let lang = opening[fence_len..]
            .split_whitespace()
            .next()
            .map(str::to_string);
        self.pos += 1;

        // Unterminated fences run to the end of the document
        let mut code = String::new();
        while let Some(line) = self.peek(0) {
            self.pos += 1;
            let trimmed = line.trim();
            if trimmed.len() >= fence_len && trimmed.chars().all(|c| c == '`') {
                break;
            }
            code.push_str(dedent(line, indent));
            code.push('\n');
        }

        Block::CodeBlock { lang, code }
    }

    fn read_list(&mut self) -> Block {
        let mut entries: Vec<ListEntry> = Vec::new();
        let mut root_depth = usize::MAX;
        let mut root_ordered = false;

        while let Some(line) = self.peek(0) {
            if is_blank(line) {
                // Loose list: only carry on if another item of this list follows
                let mut ahead = 1;
                while self.peek(ahead).is_some_and(is_blank) {
                    ahead += 1;
                }
                let next = self.peek(ahead);
                if !entries.is_empty() && next.is_some_and(is_item_fence) {
                    self.pos += ahead;
                    continue;
                }
                match next.and_then(list_item) {
                    Some(item) if item.depth > root_depth || item.ordered == root_ordered => {
                        self.pos += ahead;
                        continue;
                    }
                    _ => break,
                }
            }

            if let Some(item) = list_item(line) {
                if entries.is_empty() {
                    root_ordered = item.ordered;
                } else if item.depth <= root_depth && item.ordered != root_ordered {
                    break;
                }
                root_depth = root_depth.min(item.depth);
                entries.push(ListEntry {
                    depth: item.depth,
                    ordered: item.ordered,
                    text: item.text.trim_end().to_string(),
                    blocks: Vec::new(),
                });
                self.pos += 1;
                continue;
            }

            if is_item_fence(line) {
                if let Some(last) = entries.last_mut() {
                    let code = self.read_fence(line);
                    last.blocks.push(code);
                    continue;
                }
            }

            // Indented plain text continues the previous item
            let continues = indent_width(line) > 0 && classify(line, self.peek(1)) == LineKind::Text;
            match entries.last_mut() {
                Some(last) if continues => {
                    last.text.push('\n');
                    last.text.push_str(line.trim());
                    self.pos += 1;
                }
                _ => break,
            }
        }

        let levels = normalize_depths(&entries);
        let mut index = 0;
        let list = build_lists(&entries, &levels, 0, &mut index)
            .into_iter()
            .next()
            .unwrap_or(List {
                ordered: root_ordered,
                items: Vec::new(),
            });
        Block::List(list)
    }

    fn read_table(&mut self, header_line: &str) -> Block {
        let header = split_row(header_line);
        let alignments = self
            .peek(1)
            .map(|row| {
                split_row(row)
                    .iter()
                    .map(|cell| Alignment::from_cell(cell))
                    .collect()
            })
            .unwrap_or_default();
        self.pos += 2;

        let mut rows = Vec::new();
        while let Some(line) = self.peek(0) {
            if is_blank(line) || !line.contains('|') {
                break;
            }
            rows.push(split_row(line));
            self.pos += 1;
        }

        Block::Table(Table {
            header,
            alignments,
            rows,
        })
    }

    fn read_html(&mut self) -> Block {
        let mut lines = Vec::new();
        while let Some(line) = self.peek(0) {
            if is_blank(line) {
                break;
            }
            lines.push(line);
            self.pos += 1;
        }
        Block::Html(lines.join("\n"))
    }

    fn read_paragraph(&mut self) -> Block {
        let mut lines = Vec::new();
        while let Some(line) = self.peek(0) {
            if is_blank(line) || (!lines.is_empty() && classify(line, self.peek(1)) != LineKind::Text) {
                break;
            }
            lines.push(line.trim());
            self.pos += 1;
        }
        Block::Paragraph(lines.join("\n"))
    }
}

impl Iterator for Blocks<'_> {
    type Item = Block;

    fn next(&mut self) -> Option<Block> {
        loop {
            let line = self.peek(0)?;
            if is_blank(line) {
                self.pos += 1;
                continue;
            }
            return Some(self.read_block(line));
        }
    }
}

/// Collect every link reference definition, including those inside quotes
pub fn link_references(blocks: impl IntoIterator<Item = Block>) -> Vec<(String, String, Option<String>)> {
    let mut refs = Vec::new();
    for block in blocks {
        match block {
            Block::LinkReference { label, url, title } => refs.push((label, url, title)),
            Block::BlockQuote(inner) => refs.extend(link_references(inner)),
            _ => {}
        }
    }
    refs
}

fn classify(line: &str, next: Option<&str>) -> LineKind {
    let rest = line.trim_start();

    if heading(line).is_some() {
        LineKind::Heading
    } else if rest.starts_with('>') {
        LineKind::Quote
    } else if is_fence_open(rest) {
        LineKind::Fence
    } else if list_item(line).is_some() {
        LineKind::ListItem
    } else if line.contains('|') && next.is_some_and(is_alignment_row) {
        LineKind::Table
    } else if is_rule(rest) {
        LineKind::Rule
    } else if rest.starts_with("![") && IMAGE_LINE.is_match(rest.trim_end()) {
        LineKind::Image
    } else if rest.starts_with('[') && LINK_REFERENCE_LINE.is_match(rest.trim_end()) {
        LineKind::LinkReference
    } else if rest.starts_with('<') {
        LineKind::Html
    } else {
        LineKind::Text
    }
}

/// Three or more backticks, then at most an info string without backticks
fn is_fence_open(rest: &str) -> bool {
    let ticks = rest.bytes().take_while(|b| *b == b'`').count();
    ticks >= 3 && !rest[ticks..].contains('`')
}

/// An indented fence opener, which belongs to the list item above it
fn is_item_fence(line: &str) -> bool {
    indent_width(line) > 0 && is_fence_open(line.trim_start())
}

/// Strip up to `width` columns of leading whitespace
fn dedent(line: &str, width: usize) -> &str {
    let mut columns = 0;
    for (i, c) in line.char_indices() {
        if columns >= width || !c.is_whitespace() {
            return &line[i..];
        }
        columns += if c == '\t' { 4 } else { 1 };
    }
    ""
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// Leading whitespace width; a tab counts as four columns
fn indent_width(line: &str) -> usize {
    line.chars()
        .take_while(|c| c.is_whitespace())
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum()
}

fn heading(line: &str) -> Option<(u8, &str)> {
    let rest = line.trim_start();
    let hashes = rest.bytes().take_while(|b| *b == b'#').count();
    if (1..=6).contains(&hashes) && rest[hashes..].starts_with(' ') {
        Some((hashes as u8, rest[hashes..].trim()))
    } else {
        None
    }
}

fn is_rule(rest: &str) -> bool {
    let rest = rest.trim_end();
    let mut chars = rest.chars();
    match chars.next() {
        Some(marker @ ('*' | '-' | '_')) => rest.len() >= 3 && chars.all(|c| c == marker),
        _ => false,
    }
}

fn is_alignment_row(line: &str) -> bool {
    line.contains('|') && {
        let cells = split_row(line);
        !cells.is_empty() && cells.iter().all(|cell| ALIGNMENT_CELL.is_match(cell))
    }
}

/// Split a `|`-delimited row into trimmed cells, honouring `\|` escapes
fn split_row(line: &str) -> Vec<String> {
    let trimmed = line.trim();
    let trimmed = trimmed.strip_prefix('|').unwrap_or(trimmed);
    let trimmed = match trimmed.strip_suffix('|') {
        Some(inner) if !inner.ends_with('\\') => inner,
        _ => trimmed,
    };

    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut chars = trimmed.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'|') => {
                cell.push('|');
                chars.next();
            }
            '|' => cells.push(std::mem::take(&mut cell).trim().to_string()),
            _ => cell.push(c),
        }
    }
    cells.push(cell.trim().to_string());
    cells
}

fn image(line: &str) -> Option<Block> {
    let caps = IMAGE_LINE.captures(line.trim())?;
    Some(Block::Image {
        alt: caps[1].to_string(),
        url: caps[2].to_string(),
        title: caps.get(3).map(|m| m.as_str().to_string()),
    })
}

fn link_reference(line: &str) -> Option<Block> {
    let caps = LINK_REFERENCE_LINE.captures(line.trim())?;
    let title = caps
        .get(3)
        .or_else(|| caps.get(4))
        .or_else(|| caps.get(5))
        .map(|m| m.as_str().to_string());
    Some(Block::LinkReference {
        label: caps[1].to_string(),
        url: caps[2].to_string(),
        title,
    })
}

struct ListMarker<'a> {
    depth: usize,
    ordered: bool,
    text: &'a str,
}

fn list_item(line: &str) -> Option<ListMarker<'_>> {
    let depth = indent_width(line) / 2;
    let rest = line.trim_start();

    if let Some(text) = ["* ", "- ", "+ "]
        .iter()
        .find_map(|marker| rest.strip_prefix(marker))
    {
        return Some(ListMarker {
            depth,
            ordered: false,
            text: text.trim_start(),
        });
    }

    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if (1..=9).contains(&digits) {
        if let Some(text) = rest[digits..].strip_prefix(". ") {
            return Some(ListMarker {
                depth,
                ordered: true,
                text: text.trim_start(),
            });
        }
    }

    None
}

struct ListEntry {
    depth: usize,
    ordered: bool,
    text: String,
    blocks: Vec<Block>,
}

/// Map raw indentation depths to nesting levels.
///
/// An item only ever nests one level below the item before it, however far
/// it is indented; shallower items close levels until one fits.
fn normalize_depths(entries: &[ListEntry]) -> Vec<usize> {
    let mut open: Vec<usize> = Vec::new();
    entries
        .iter()
        .map(|entry| {
            while open.last().is_some_and(|top| *top > entry.depth) {
                open.pop();
            }
            if open.last() != Some(&entry.depth) {
                open.push(entry.depth);
            }
            open.len() - 1
        })
        .collect()
}

fn build_lists(entries: &[ListEntry], levels: &[usize], level: usize, index: &mut usize) -> Vec<List> {
    let mut lists: Vec<List> = Vec::new();

    while *index < entries.len() && levels[*index] >= level {
        let entry = &entries[*index];
        *index += 1;
        let children = build_lists(entries, levels, level + 1, index);

        let item = ListItem {
            number: 0,
            text: entry.text.clone(),
            blocks: entry.blocks.clone(),
            children,
        };
        match lists.last_mut() {
            Some(list) if list.ordered == entry.ordered => list.items.push(item),
            _ => lists.push(List {
                ordered: entry.ordered,
                items: vec![item],
            }),
        }
    }

    for list in &mut lists {
        for (n, item) in list.items.iter_mut().enumerate() {
            item.number = n + 1;
        }
    }
    lists
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Vec<Block> {
        Blocks::new(text).collect()
    }

    fn paragraph(text: &str) -> Block {
        Block::Paragraph(text.to_string())
    }

    #[test]
    fn test_heading_levels() {
        assert_eq!(
            parse("### Title"),
            vec![Block::Heading {
                level: 3,
                text: "Title".to_string()
            }]
        );
        assert_eq!(
            parse("###### Six"),
            vec![Block::Heading {
                level: 6,
                text: "Six".to_string()
            }]
        );
        assert_eq!(parse("####### Seven"), vec![paragraph("####### Seven")]);
        assert_eq!(parse("#hashtag"), vec![paragraph("#hashtag")]);
    }

    #[test]
    fn test_paragraph_runs_and_blank_lines() {
        let blocks = parse("first line\nsecond line\n\nnext paragraph\n");
        assert_eq!(
            blocks,
            vec![paragraph("first line\nsecond line"), paragraph("next paragraph")]
        );
    }

    #[test]
    fn test_heading_interrupts_paragraph() {
        let blocks = parse("some text\n## Next\nmore");
        assert_eq!(blocks.len(), 3);
        assert!(matches!(blocks[1], Block::Heading { level: 2, .. }));
    }

    #[test]
    fn test_block_quote_with_blank_marker_lines() {
        let blocks = parse("> first\n>\n> second\n\nafter");
        assert_eq!(
            blocks,
            vec![
                Block::BlockQuote(vec![paragraph("first"), paragraph("second")]),
                paragraph("after"),
            ]
        );
    }

    #[test]
    fn test_fenced_code_is_literal() {
        let blocks = parse("```java\n### Title\n- not a list\n```\n");
        assert_eq!(
            blocks,
            vec![Block::CodeBlock {
                lang: Some("java".to_string()),
                code: "### Title\n- not a list\n".to_string()
            }]
        );
    }

    #[test]
    fn test_backticks_inside_opener_are_not_a_fence() {
        let blocks = parse("```inline``` code here\nmore\n");
        assert_eq!(blocks, vec![paragraph("```inline``` code here\nmore")]);
    }

    #[test]
    fn test_indented_fence_stays_in_list_item() {
        let blocks = parse("1. a\n   ```sh\n   ls -la\n   ```\n1. b\n");
        assert_eq!(blocks.len(), 1, "{:?}", blocks);
        let Block::List(list) = &blocks[0] else {
            panic!("expected a list, got {:?}", blocks);
        };
        assert_eq!(list.items.len(), 2);
        assert_eq!(
            list.items[0].blocks,
            vec![Block::CodeBlock {
                lang: Some("sh".to_string()),
                code: "ls -la\n".to_string()
            }]
        );
        assert_eq!(list.items[1].number, 2);
    }

    #[test]
    fn test_unterminated_fence_runs_to_end() {
        let blocks = parse("```\nline one\n\n# still code\n");
        assert_eq!(
            blocks,
            vec![Block::CodeBlock {
                lang: None,
                code: "line one\n\n# still code\n".to_string()
            }]
        );
    }

    #[test]
    fn test_ordered_list_renumbers() {
        let blocks = parse("1. a\n1. b\n1. c\n1. d\n");
        let Block::List(list) = &blocks[0] else {
            panic!("expected a list, got {:?}", blocks);
        };
        assert!(list.ordered);
        let numbers: Vec<_> = list.items.iter().map(|i| i.number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_nested_unordered_list() {
        let blocks = parse("* top\n  * child\n    * grandchild\n* second\n");
        let Block::List(list) = &blocks[0] else {
            panic!("expected a list");
        };
        assert!(!list.ordered);
        assert_eq!(list.items.len(), 2);
        let child = &list.items[0].children[0];
        assert_eq!(child.items[0].text, "child");
        assert_eq!(child.items[0].children[0].items[0].text, "grandchild");
        assert!(list.items[1].children.is_empty());
    }

    #[test]
    fn test_deep_indent_is_not_inferred() {
        let blocks = parse("- top\n        - way down\n- next\n");
        let Block::List(list) = &blocks[0] else {
            panic!("expected a list");
        };
        assert_eq!(list.items[0].children.len(), 1);
        let child = &list.items[0].children[0];
        assert_eq!(child.items[0].text, "way down");
        assert!(child.items[0].children.is_empty());
    }

    #[test]
    fn test_mixed_nested_list_kinds() {
        let blocks = parse("- setup\n  1. pull image\n  2. start container\n- teardown\n");
        let Block::List(list) = &blocks[0] else {
            panic!("expected a list");
        };
        let nested = &list.items[0].children[0];
        assert!(nested.ordered);
        assert_eq!(nested.items.len(), 2);
    }

    #[test]
    fn test_loose_list_continues_over_blank_lines() {
        let blocks = parse("1. one\n\n1. two\n\nparagraph");
        assert_eq!(blocks.len(), 2);
        let Block::List(list) = &blocks[0] else {
            panic!("expected a list");
        };
        assert_eq!(list.items.len(), 2);
        assert_eq!(list.items[1].number, 2);
    }

    #[test]
    fn test_list_item_continuation_line() {
        let blocks = parse("- a long item\n  wrapped here\n- next");
        let Block::List(list) = &blocks[0] else {
            panic!("expected a list");
        };
        assert_eq!(list.items[0].text, "a long item\nwrapped here");
    }

    #[test]
    fn test_table_with_alignment() {
        let blocks = parse("| Tool | Speed |\n|:---:|---:|\n| Docker | fast |\n| VM | slow | extra |\nafter");
        let Block::Table(table) = &blocks[0] else {
            panic!("expected a table, got {:?}", blocks);
        };
        assert_eq!(table.header, vec!["Tool", "Speed"]);
        assert_eq!(table.alignments, vec![Alignment::Center, Alignment::Right]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1], vec!["VM", "slow", "extra"]);
        assert_eq!(blocks[1], paragraph("after"));
    }

    #[test]
    fn test_pipe_without_alignment_row_is_text() {
        assert_eq!(parse("a | b\nc | d"), vec![paragraph("a | b\nc | d")]);
    }

    #[test]
    fn test_horizontal_rules() {
        for rule in ["---", "***", "___", "-----"] {
            assert_eq!(parse(rule), vec![Block::Rule], "{}", rule);
        }
        assert_eq!(parse("--"), vec![paragraph("--")]);
        assert_eq!(parse("-*-"), vec![paragraph("-*-")]);
    }

    #[test]
    fn test_image_reference() {
        let blocks = parse("![container diagram](/images/docker.png \"Layout\")");
        assert_eq!(
            blocks,
            vec![Block::Image {
                alt: "container diagram".to_string(),
                url: "/images/docker.png".to_string(),
                title: Some("Layout".to_string()),
            }]
        );
        // Not the whole line: falls back to a paragraph
        assert_eq!(
            parse("![a](b.png) and text"),
            vec![paragraph("![a](b.png) and text")]
        );
    }

    #[test]
    fn test_link_reference_definition() {
        let blocks = parse("[repo]: https://example.com/repo 'The repo'");
        assert_eq!(
            blocks,
            vec![Block::LinkReference {
                label: "repo".to_string(),
                url: "https://example.com/repo".to_string(),
                title: Some("The repo".to_string()),
            }]
        );
        assert_eq!(link_references(blocks).len(), 1);
    }

    #[test]
    fn test_raw_html_definition_list() {
        let text = "<dl>\n<dt>Container</dt>\n<dd>An isolated process</dd>\n</dl>\n\nAfter.";
        let blocks = parse(text);
        assert_eq!(
            blocks,
            vec![
                Block::Html("<dl>\n<dt>Container</dt>\n<dd>An isolated process</dd>\n</dl>".to_string()),
                paragraph("After."),
            ]
        );
    }

    #[test]
    fn test_blocks_are_restartable() {
        let text = "# A\n\ntext\n\n- item\n";
        let blocks = Blocks::new(text);
        let first: Vec<_> = blocks.clone().collect();
        let second: Vec<_> = blocks.collect();
        assert_eq!(first, second);
        assert_eq!(first, parse(text));
    }
}
