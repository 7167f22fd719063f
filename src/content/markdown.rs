//! Markdown rendering with syntax highlighting

use pulldown_cmark::{html, Event, Options, Parser, Tag, TagEnd};
use serde::Serialize;
use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use syntect::highlighting::ThemeSet;
use syntect::html::highlighted_html_for_string;
use syntect::parsing::SyntaxSet;

use super::blocks::{self, Block, Blocks, List, Table};
use crate::config::MarkdownConfig;

/// A heading collected while rendering, for tables of contents
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TocEntry {
    pub level: u8,
    pub id: String,
    pub text: String,
}

/// Rendered HTML body plus the headings found in it
#[derive(Debug, Clone, Default)]
pub struct RenderedBody {
    pub html: String,
    pub toc: Vec<TocEntry>,
}

/// Markdown renderer with syntax highlighting
pub struct MarkdownRenderer {
    syntax_set: SyntaxSet,
    theme_set: ThemeSet,
    theme_name: String,
    line_numbers: bool,
    heading_ids: bool,
}

impl MarkdownRenderer {
    /// Create a new markdown renderer
    pub fn new() -> Self {
        Self::with_options("base16-ocean.dark", false)
    }

    /// Create with custom settings
    pub fn with_options(theme: &str, line_numbers: bool) -> Self {
        Self {
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme_set: ThemeSet::load_defaults(),
            theme_name: theme.to_string(),
            line_numbers,
            heading_ids: true,
        }
    }

    pub fn from_config(config: &MarkdownConfig) -> Self {
        let mut renderer = Self::with_options(&config.highlight_theme, config.line_numbers);
        renderer.heading_ids = config.heading_ids;
        renderer
    }

    /// Lazily render a body, one HTML fragment per block
    pub fn rendered<'r, 'a>(&'r self, markdown: &'a str) -> RenderedBlocks<'r, 'a> {
        let references = blocks::link_references(Blocks::new(markdown))
            .into_iter()
            .map(|(label, url, title)| {
                let title = title
                    .map(|t| format!(" \"{}\"", t.replace('"', "\\\"")))
                    .unwrap_or_default();
                format!("[{}]: <{}>{}\n", label, url, title)
            })
            .collect();

        RenderedBlocks {
            renderer: self,
            blocks: Blocks::new(markdown),
            state: RenderState {
                references,
                seen_ids: HashMap::new(),
                issued_ids: HashSet::new(),
                toc: Vec::new(),
            },
        }
    }

    /// Render markdown to HTML
    pub fn render(&self, markdown: &str) -> RenderedBody {
        let mut blocks = self.rendered(markdown);
        let mut html = String::new();
        for fragment in &mut blocks {
            html.push_str(&fragment);
        }
        RenderedBody {
            html,
            toc: blocks.state.toc,
        }
    }

    fn render_block(&self, block: &Block, state: &mut RenderState, out: &mut String) {
        match block {
            Block::Heading { level, text } => {
                let id = if self.heading_ids {
                    state.unique_id(text)
                } else {
                    String::new()
                };
                let inner = state.inline(text);
                if id.is_empty() {
                    out.push_str(&format!("<h{level}>{inner}</h{level}>\n"));
                } else {
                    out.push_str(&format!("<h{level} id=\"{id}\">{inner}</h{level}>\n"));
                }
                state.toc.push(TocEntry {
                    level: *level,
                    id,
                    text: strip_tags(&inner),
                });
            }
            Block::Paragraph(text) => {
                out.push_str(&format!("<p>{}</p>\n", state.inline(text)));
            }
            Block::BlockQuote(inner) => {
                out.push_str("<blockquote>\n");
                for block in inner {
                    self.render_block(block, state, out);
                }
                out.push_str("</blockquote>\n");
            }
            Block::CodeBlock { lang, code } => {
                out.push_str(&self.highlight_code(code, lang.as_deref()));
                out.push('\n');
            }
            Block::List(list) => self.render_list(list, state, out),
            Block::Table(table) => render_table(table, state, out),
            Block::Rule => out.push_str("<hr />\n"),
            Block::Html(raw) => {
                out.push_str(raw);
                out.push('\n');
            }
            Block::Image { alt, url, title } => {
                let title = title
                    .as_ref()
                    .map(|t| format!(" title=\"{}\"", html_escape(t)))
                    .unwrap_or_default();
                out.push_str(&format!(
                    "<p><img src=\"{}\" alt=\"{}\"{} /></p>\n",
                    html_escape(url),
                    html_escape(alt),
                    title
                ));
            }
            Block::LinkReference { .. } => {}
        }
    }

    fn render_list(&self, list: &List, state: &mut RenderState, out: &mut String) {
        let tag = if list.ordered { "ol" } else { "ul" };
        out.push_str(&format!("<{}>\n", tag));
        for item in &list.items {
            if list.ordered {
                out.push_str(&format!("<li value=\"{}\">", item.number));
            } else {
                out.push_str("<li>");
            }
            out.push_str(&state.inline(&item.text));
            if !item.blocks.is_empty() || !item.children.is_empty() {
                out.push('\n');
                for block in &item.blocks {
                    self.render_block(block, state, out);
                }
                for child in &item.children {
                    self.render_list(child, state, out);
                }
            }
            out.push_str("</li>\n");
        }
        out.push_str(&format!("</{}>\n", tag));
    }

    /// Highlight a code block
    fn highlight_code(&self, code: &str, lang: Option<&str>) -> String {
        let lang = lang.unwrap_or("text");
        let class = html_escape(lang);

        // Try to find syntax for the language
        let syntax = self
            .syntax_set
            .find_syntax_by_token(lang)
            .or_else(|| self.syntax_set.find_syntax_by_extension(lang))
            .unwrap_or_else(|| self.syntax_set.find_syntax_plain_text());

        let theme = self
            .theme_set
            .themes
            .get(&self.theme_name)
            .or_else(|| self.theme_set.themes.values().next());

        let highlighted = theme
            .and_then(|theme| highlighted_html_for_string(code, &self.syntax_set, syntax, theme).ok());

        let Some(highlighted) = highlighted else {
            // Fallback to plain code block
            return format!(
                r#"<pre><code class="language-{}">{}</code></pre>"#,
                class,
                html_escape(code)
            );
        };

        if self.line_numbers {
            let gutter = (1..=code.lines().count().max(1))
                .map(|n| format!(r#"<span class="line-number">{}</span>"#, n))
                .collect::<Vec<_>>()
                .join("\n");
            format!(
                r#"<figure class="highlight language-{}"><table><tr><td class="gutter"><pre>{}</pre></td><td class="code">{}</td></tr></table></figure>"#,
                class, gutter, highlighted
            )
        } else {
            format!(
                r#"<figure class="highlight language-{}">{}</figure>"#,
                class, highlighted
            )
        }
    }
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-document state threaded through block rendering
#[derive(Debug, Clone)]
struct RenderState {
    /// Link reference definitions, re-serialized as markdown
    references: String,
    /// Next suffix to try, per slug
    seen_ids: HashMap<String, usize>,
    issued_ids: HashSet<String>,
    toc: Vec<TocEntry>,
}

impl RenderState {
    fn unique_id(&mut self, text: &str) -> String {
        let base = slug::slugify(text);
        let base = if base.is_empty() {
            "section".to_string()
        } else {
            base
        };

        // A suffixed id can clash with the slug of a later heading, so
        // check against every id handed out so far
        let count = self.seen_ids.entry(base.clone()).or_insert(0);
        loop {
            let id = if *count == 0 {
                base.clone()
            } else {
                format!("{}-{}", base, count)
            };
            *count += 1;
            if self.issued_ids.insert(id.clone()) {
                return id;
            }
        }
    }

    /// Render inline spans (emphasis, code, links) of a single block's text.
    ///
    /// The text is fed to pulldown-cmark on its own. If it would parse as
    /// anything other than one paragraph, it is emitted escaped instead.
    fn inline(&self, text: &str) -> String {
        if text.is_empty() {
            return String::new();
        }

        let text_source = escape_setext_underlines(text);
        let source = if self.references.is_empty() || !text.contains('[') {
            text_source
        } else {
            Cow::Owned(format!("{}\n\n{}", text_source, self.references))
        };

        let options = Options::ENABLE_STRIKETHROUGH | Options::ENABLE_SMART_PUNCTUATION;
        let mut parser = Parser::new_ext(&source, options);

        if !matches!(parser.next(), Some(Event::Start(Tag::Paragraph))) {
            return html_escape(text);
        }

        let mut events = Vec::new();
        for event in parser.by_ref() {
            if matches!(event, Event::End(TagEnd::Paragraph)) {
                break;
            }
            events.push(event);
        }

        // Anything after the paragraph means the text was split into blocks
        if parser.next().is_some() {
            return html_escape(text);
        }

        let mut html_output = String::new();
        html::push_html(&mut html_output, events.into_iter());
        html_output
    }
}

/// Lazy sequence of rendered block fragments, in source order
#[derive(Clone)]
pub struct RenderedBlocks<'r, 'a> {
    renderer: &'r MarkdownRenderer,
    blocks: Blocks<'a>,
    state: RenderState,
}

impl RenderedBlocks<'_, '_> {
    /// Headings rendered so far
    pub fn toc(&self) -> &[TocEntry] {
        &self.state.toc
    }
}

impl Iterator for RenderedBlocks<'_, '_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let block = self.blocks.next()?;
        let mut out = String::new();
        self.renderer.render_block(&block, &mut self.state, &mut out);
        Some(out)
    }
}

fn render_table(table: &Table, state: &RenderState, out: &mut String) {
    let cell = |tag: &str, index: usize, text: &str| {
        let style = table
            .alignments
            .get(index)
            .and_then(|a| a.as_css())
            .map(|align| format!(" style=\"text-align: {}\"", align))
            .unwrap_or_default();
        format!("<{tag}{style}>{}</{tag}>\n", state.inline(text))
    };

    out.push_str("<table>\n<thead>\n<tr>\n");
    for (index, text) in table.header.iter().enumerate() {
        out.push_str(&cell("th", index, text));
    }
    out.push_str("</tr>\n</thead>\n");

    if !table.rows.is_empty() {
        out.push_str("<tbody>\n");
        for row in &table.rows {
            out.push_str("<tr>\n");
            for (index, text) in row.iter().enumerate() {
                out.push_str(&cell("td", index, text));
            }
            out.push_str("</tr>\n");
        }
        out.push_str("</tbody>\n");
    }
    out.push_str("</table>\n");
}

/// Escape lines made only of `=` or `-` so a paragraph's continuation line
/// is not read as a setext heading underline
fn escape_setext_underlines(text: &str) -> Cow<'_, str> {
    let is_underline = |line: &str| {
        let line = line.trim();
        !line.is_empty() && (line.chars().all(|c| c == '=') || line.chars().all(|c| c == '-'))
    };
    if !text.lines().skip(1).any(is_underline) {
        return Cow::Borrowed(text);
    }

    let escaped: Vec<String> = text
        .lines()
        .enumerate()
        .map(|(i, line)| {
            if i > 0 && is_underline(line) {
                format!("\\{}", line.trim())
            } else {
                line.to_string()
            }
        })
        .collect();
    Cow::Owned(escaped.join("\n"))
}

/// Simple HTML escaping
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Strip HTML tags from rendered inline content
fn strip_tags(html: &str) -> String {
    let mut result = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => result.push(c),
            _ => {}
        }
    }
    result
}
