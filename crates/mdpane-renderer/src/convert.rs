//! Markdown event stream to HTML tree conversion.

use std::collections::HashMap;

use pulldown_cmark::{
    Alignment, BlockQuoteKind, CodeBlockKind, Event, HeadingLevel, LinkType, Options, Parser, Tag,
    TagEnd,
};

use mdpane_tree::{Element, Fragment, Node};

/// Convert markdown source to an HTML tree.
///
/// Raw HTML in the source passes through as [`Node::Raw`]; the raw-merge pass
/// resolves it afterwards. Tree building itself cannot fail.
pub(crate) fn convert(markdown: &str) -> Fragment {
    let options = Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_MATH
        | Options::ENABLE_GFM;
    let parser = Parser::new_ext(markdown, options);

    let mut builder = TreeBuilder::new();
    for event in parser {
        builder.process_event(event);
    }
    builder.finish()
}

/// Builds the tree from the event stream with an explicit element stack.
struct TreeBuilder {
    /// Completed top-level nodes.
    root: Vec<Node>,
    /// Open elements; the last entry is the innermost.
    stack: Vec<Element>,
    /// Column alignments and cursor for the current table.
    table: TableState,
    /// Alt text capture for the image currently being collected.
    image: Option<AltCapture>,
    /// Footnote numbering and collected definitions.
    footnotes: FootnoteTracker,
    /// Name of the footnote definition currently collecting, if any.
    open_definition: Option<String>,
    /// Inside a metadata block; its text is dropped.
    in_metadata: bool,
}

#[derive(Default)]
struct TableState {
    alignments: Vec<Alignment>,
    in_head: bool,
    cell_index: usize,
}

impl TableState {
    fn alignment_attr(&self) -> Option<&'static str> {
        match self.alignments.get(self.cell_index) {
            Some(Alignment::Left) => Some("left"),
            Some(Alignment::Center) => Some("center"),
            Some(Alignment::Right) => Some("right"),
            _ => None,
        }
    }
}

/// Pending image: markdown inside the alt text is flattened to plain text.
struct AltCapture {
    src: String,
    title: String,
    alt: String,
    /// Nesting depth of images inside the alt text.
    depth: usize,
}

#[derive(Default)]
struct FootnoteTracker {
    /// Footnote names in first-reference order; position + 1 is the number.
    order: Vec<String>,
    /// Reference count per name, for repeat-reference id suffixes.
    references: HashMap<String, usize>,
    /// Collected definition items keyed by name.
    definitions: HashMap<String, Element>,
}

impl FootnoteTracker {
    /// Record a reference and return `(number, occurrence)`.
    fn reference(&mut self, name: &str) -> (usize, usize) {
        let occurrence = self.references.entry(name.to_owned()).or_insert(0);
        *occurrence += 1;
        let occurrence = *occurrence;

        let number = match self.order.iter().position(|n| n == name) {
            Some(position) => position + 1,
            None => {
                self.order.push(name.to_owned());
                self.order.len()
            }
        };
        (number, occurrence)
    }

    /// Assemble the trailing footnote section, if anything was referenced.
    fn into_section(mut self) -> Option<Element> {
        if self.order.is_empty() {
            for name in self.definitions.keys() {
                tracing::debug!(footnote = %name, "dropping unreferenced footnote definition");
            }
            return None;
        }

        let mut list = Element::new("ol");
        for name in &self.order {
            let item = self.definitions.remove(name).unwrap_or_else(|| {
                let mut item = Element::new("li").with_attr("id", format!("fn-{name}"));
                append_backref(&mut item, name);
                item
            });
            list.push(Node::Element(item));
        }
        for name in self.definitions.keys() {
            tracing::debug!(footnote = %name, "dropping unreferenced footnote definition");
        }

        let heading = Element::new("h2")
            .with_class("sr-only")
            .with_attr("id", "footnote-label")
            .with_text("Footnotes");
        Some(
            Element::new("section")
                .with_class("footnotes")
                .with_attr("data-footnotes", "")
                .with_children(vec![Node::Element(heading), Node::Element(list)]),
        )
    }
}

/// Attach the back-reference link to a definition item, inside its trailing
/// paragraph when there is one.
fn append_backref(item: &mut Element, name: &str) {
    let backref = Element::new("a")
        .with_class("footnote-backref")
        .with_attr("href", format!("#fnref-{name}"))
        .with_text("\u{21a9}");
    match item.children.last_mut() {
        Some(Node::Element(paragraph)) if paragraph.tag == "p" => {
            paragraph.push_text(" ");
            paragraph.push(Node::Element(backref));
        }
        _ => item.push(Node::Element(backref)),
    }
}

impl TreeBuilder {
    fn new() -> Self {
        Self {
            root: Vec::new(),
            stack: Vec::new(),
            table: TableState::default(),
            image: None,
            footnotes: FootnoteTracker::default(),
            open_definition: None,
            in_metadata: false,
        }
    }

    fn process_event(&mut self, event: Event<'_>) {
        if self.image.is_some() {
            self.alt_text_event(event);
            return;
        }

        match event {
            Event::Start(tag) => self.start_tag(tag),
            Event::End(tag) => self.end_tag(tag),
            Event::Text(text) => {
                if !self.in_metadata {
                    self.push_text(&text);
                }
            }
            Event::Code(code) => {
                self.push_node(Node::Element(Element::new("code").with_text(code.as_ref())));
            }
            Event::InlineMath(latex) => self.math(&latex, false),
            Event::DisplayMath(latex) => self.math(&latex, true),
            Event::Html(html) | Event::InlineHtml(html) => self.push_raw(&html),
            Event::FootnoteReference(name) => self.footnote_reference(&name),
            Event::SoftBreak => self.push_text("\n"),
            Event::HardBreak => {
                self.push_node(Node::Element(Element::new("br")));
                self.push_text("\n");
            }
            Event::Rule => self.push_node(Node::Element(Element::new("hr"))),
            Event::TaskListMarker(checked) => self.task_list_marker(checked),
        }
    }

    #[allow(clippy::too_many_lines)]
    fn start_tag(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => self.open(Element::new("p")),
            Tag::Heading { level, .. } => self.open(Element::new(heading_tag(level))),
            Tag::BlockQuote(None) => self.open(Element::new("blockquote")),
            Tag::BlockQuote(Some(kind)) => {
                let (class, label) = alert_parts(kind);
                let title = Element::new("p")
                    .with_class("markdown-alert-title")
                    .with_text(label);
                self.open(
                    Element::new("blockquote")
                        .with_class("markdown-alert")
                        .with_class(class)
                        .with_children(vec![Node::Element(title)]),
                );
            }
            Tag::CodeBlock(kind) => {
                self.open(Element::new("pre"));
                let mut code = Element::new("code");
                if let CodeBlockKind::Fenced(info) = &kind
                    && let Some(language) = info.split_whitespace().next()
                {
                    code = code.with_class(format!("language-{language}"));
                }
                self.open(code);
            }
            Tag::List(None) => self.open(Element::new("ul")),
            Tag::List(Some(1)) => self.open(Element::new("ol")),
            Tag::List(Some(start)) => {
                self.open(Element::new("ol").with_attr("start", start.to_string()));
            }
            Tag::Item => self.open(Element::new("li")),
            Tag::FootnoteDefinition(name) => {
                self.open_definition = Some(name.to_string());
                self.open(Element::new("li").with_attr("id", format!("fn-{name}")));
            }
            Tag::DefinitionList => self.open(Element::new("dl")),
            Tag::DefinitionListTitle => self.open(Element::new("dt")),
            Tag::DefinitionListDefinition => self.open(Element::new("dd")),
            Tag::Table(alignments) => {
                self.table = TableState {
                    alignments,
                    ..TableState::default()
                };
                self.open(Element::new("table"));
            }
            Tag::TableHead => {
                self.table.in_head = true;
                self.table.cell_index = 0;
                self.open(Element::new("thead"));
                self.open(Element::new("tr"));
            }
            Tag::TableRow => {
                self.table.cell_index = 0;
                self.open(Element::new("tr"));
            }
            Tag::TableCell => {
                let tag = if self.table.in_head { "th" } else { "td" };
                let mut cell = Element::new(tag);
                if let Some(align) = self.table.alignment_attr() {
                    cell = cell.with_attr("align", align);
                }
                self.open(cell);
            }
            Tag::Emphasis => self.open(Element::new("em")),
            Tag::Strong => self.open(Element::new("strong")),
            Tag::Strikethrough => self.open(Element::new("del")),
            Tag::Superscript => self.open(Element::new("sup")),
            Tag::Subscript => self.open(Element::new("sub")),
            Tag::Link {
                link_type,
                dest_url,
                title,
                ..
            } => {
                let href = if link_type == LinkType::Email {
                    format!("mailto:{dest_url}")
                } else {
                    dest_url.to_string()
                };
                let mut link = Element::new("a").with_attr("href", href);
                if !title.is_empty() {
                    link = link.with_attr("title", title.to_string());
                }
                self.open(link);
            }
            Tag::Image {
                dest_url, title, ..
            } => {
                self.image = Some(AltCapture {
                    src: dest_url.to_string(),
                    title: title.to_string(),
                    alt: String::new(),
                    depth: 0,
                });
            }
            Tag::HtmlBlock => {}
            Tag::MetadataBlock(_) => self.in_metadata = true,
        }
    }

    fn end_tag(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph
            | TagEnd::Heading(_)
            | TagEnd::BlockQuote(_)
            | TagEnd::List(_)
            | TagEnd::Item
            | TagEnd::DefinitionList
            | TagEnd::DefinitionListTitle
            | TagEnd::DefinitionListDefinition
            | TagEnd::TableRow
            | TagEnd::Emphasis
            | TagEnd::Strong
            | TagEnd::Strikethrough
            | TagEnd::Superscript
            | TagEnd::Subscript
            | TagEnd::Link => self.close_element(),
            TagEnd::CodeBlock => {
                self.close_element(); // code
                self.close_element(); // pre
            }
            TagEnd::FootnoteDefinition => {
                if let (Some(name), Some(mut item)) = (self.open_definition.take(), self.stack.pop())
                {
                    append_backref(&mut item, &name);
                    self.footnotes.definitions.insert(name, item);
                }
            }
            TagEnd::TableHead => {
                self.close_element(); // tr
                self.close_element(); // thead
                self.table.in_head = false;
                // Body rows collect in here; dropped again when none arrive.
                self.open(Element::new("tbody"));
            }
            TagEnd::Table => {
                if let Some(tbody) = self.stack.pop()
                    && !tbody.children.is_empty()
                {
                    self.push_node(Node::Element(tbody));
                }
                self.close_element(); // table
                self.table = TableState::default();
            }
            TagEnd::TableCell => {
                self.close_element();
                self.table.cell_index += 1;
            }
            // End(Image) is consumed by the alt capture.
            TagEnd::Image | TagEnd::HtmlBlock => {}
            TagEnd::MetadataBlock(_) => self.in_metadata = false,
        }
    }

    /// Events arriving while an image's alt text is being collected.
    fn alt_text_event(&mut self, event: Event<'_>) {
        if matches!(event, Event::End(TagEnd::Image)) {
            let Some(mut capture) = self.image.take() else {
                return;
            };
            if capture.depth == 0 {
                self.push_image(capture);
            } else {
                capture.depth -= 1;
                self.image = Some(capture);
            }
            return;
        }

        let Some(capture) = self.image.as_mut() else {
            return;
        };
        match event {
            Event::Start(Tag::Image { .. }) => capture.depth += 1,
            Event::Text(text)
            | Event::Code(text)
            | Event::InlineMath(text)
            | Event::DisplayMath(text) => capture.alt.push_str(&text),
            Event::SoftBreak | Event::HardBreak => capture.alt.push(' '),
            _ => {}
        }
    }

    fn push_image(&mut self, capture: AltCapture) {
        let mut image = Element::new("img")
            .with_attr("src", capture.src)
            .with_attr("alt", capture.alt);
        if !capture.title.is_empty() {
            image = image.with_attr("title", capture.title);
        }
        self.push_node(Node::Element(image));
    }

    fn math(&mut self, latex: &str, display: bool) {
        let wrapper = if display {
            Element::new("div").with_class("math").with_class("math-display")
        } else {
            Element::new("span").with_class("math").with_class("math-inline")
        };
        self.push_node(Node::Element(wrapper.with_text(latex)));
    }

    fn footnote_reference(&mut self, name: &str) {
        let (number, occurrence) = self.footnotes.reference(name);
        let id = if occurrence == 1 {
            format!("fnref-{name}")
        } else {
            format!("fnref-{name}-{occurrence}")
        };
        let link = Element::new("a")
            .with_class("footnote-ref")
            .with_attr("href", format!("#fn-{name}"))
            .with_attr("id", id)
            .with_text(number.to_string());
        self.push_node(Node::Element(
            Element::new("sup").with_children(vec![Node::Element(link)]),
        ));
    }

    fn task_list_marker(&mut self, checked: bool) {
        let mut input = Element::new("input").with_attr("type", "checkbox");
        if checked {
            input = input.with_attr("checked", "");
        }
        input = input.with_attr("disabled", "");
        self.push_node(Node::Element(input));
        self.push_text(" ");
        self.mark_task_list();
    }

    /// Class the enclosing item and list of a task list marker.
    fn mark_task_list(&mut self) {
        let mut saw_item = false;
        for element in self.stack.iter_mut().rev() {
            if !saw_item && element.tag == "li" {
                if !element.has_class("task-list-item") {
                    element.classes.push("task-list-item".to_owned());
                }
                saw_item = true;
            } else if saw_item && (element.tag == "ul" || element.tag == "ol") {
                if !element.has_class("contains-task-list") {
                    element.classes.push("contains-task-list".to_owned());
                }
                break;
            }
        }
    }

    fn open(&mut self, element: Element) {
        self.stack.push(element);
    }

    fn close_element(&mut self) {
        if let Some(element) = self.stack.pop() {
            self.push_node(Node::Element(element));
        }
    }

    fn current_children(&mut self) -> &mut Vec<Node> {
        match self.stack.last_mut() {
            Some(parent) => &mut parent.children,
            None => &mut self.root,
        }
    }

    fn push_node(&mut self, node: Node) {
        self.current_children().push(node);
    }

    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let children = self.current_children();
        if let Some(Node::Text(existing)) = children.last_mut() {
            existing.push_str(text);
        } else {
            children.push(Node::Text(text.to_owned()));
        }
    }

    fn push_raw(&mut self, html: &str) {
        let children = self.current_children();
        if let Some(Node::Raw(existing)) = children.last_mut() {
            existing.push_str(html);
        } else {
            children.push(Node::Raw(html.to_owned()));
        }
    }

    fn finish(mut self) -> Fragment {
        // Event streams are balanced, but a leftover element is still
        // attached rather than lost.
        while let Some(element) = self.stack.pop() {
            let node = Node::Element(element);
            match self.stack.last_mut() {
                Some(parent) => parent.children.push(node),
                None => self.root.push(node),
            }
        }

        if let Some(section) = std::mem::take(&mut self.footnotes).into_section() {
            self.root.push(Node::Element(section));
        }
        Fragment::new(self.root)
    }
}

fn heading_tag(level: HeadingLevel) -> &'static str {
    match level {
        HeadingLevel::H1 => "h1",
        HeadingLevel::H2 => "h2",
        HeadingLevel::H3 => "h3",
        HeadingLevel::H4 => "h4",
        HeadingLevel::H5 => "h5",
        HeadingLevel::H6 => "h6",
    }
}

fn alert_parts(kind: BlockQuoteKind) -> (&'static str, &'static str) {
    match kind {
        BlockQuoteKind::Note => ("markdown-alert-note", "Note"),
        BlockQuoteKind::Tip => ("markdown-alert-tip", "Tip"),
        BlockQuoteKind::Important => ("markdown-alert-important", "Important"),
        BlockQuoteKind::Warning => ("markdown-alert-warning", "Warning"),
        BlockQuoteKind::Caution => ("markdown-alert-caution", "Caution"),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn convert_html(markdown: &str) -> String {
        convert(markdown).to_html()
    }

    #[test]
    fn test_paragraph() {
        assert_eq!(convert_html("Hello, world!"), "<p>Hello, world!</p>");
    }

    #[test]
    fn test_headings_have_no_ids() {
        assert_eq!(convert_html("## Section Title"), "<h2>Section Title</h2>");
        assert_eq!(convert_html("###### Deep"), "<h6>Deep</h6>");
    }

    #[test]
    fn test_inline_formatting() {
        assert_eq!(
            convert_html("*i* **b** ~~gone~~"),
            "<p><em>i</em> <strong>b</strong> <del>gone</del></p>"
        );
    }

    #[test]
    fn test_inline_code() {
        assert_eq!(
            convert_html("run `cargo doc` now"),
            "<p>run <code>cargo doc</code> now</p>"
        );
    }

    #[test]
    fn test_fenced_code_block() {
        assert_eq!(
            convert_html("```rust\nfn main() {}\n```"),
            "<pre><code class=\"language-rust\">fn main() {}\n</code></pre>"
        );
    }

    #[test]
    fn test_code_block_without_language() {
        assert_eq!(
            convert_html("```\nplain\n```"),
            "<pre><code>plain\n</code></pre>"
        );
    }

    #[test]
    fn test_lists() {
        assert_eq!(
            convert_html("- a\n- b"),
            "<ul><li>a</li><li>b</li></ul>"
        );
        assert_eq!(
            convert_html("1. a\n2. b"),
            "<ol><li>a</li><li>b</li></ol>"
        );
    }

    #[test]
    fn test_ordered_list_start() {
        assert_eq!(
            convert_html("3. a\n4. b"),
            "<ol start=\"3\"><li>a</li><li>b</li></ol>"
        );
    }

    #[test]
    fn test_task_list() {
        assert_eq!(
            convert_html("- [x] Done\n- [ ] Later"),
            concat!(
                "<ul class=\"contains-task-list\">",
                "<li class=\"task-list-item\">",
                "<input type=\"checkbox\" checked=\"\" disabled=\"\"> Done</li>",
                "<li class=\"task-list-item\">",
                "<input type=\"checkbox\" disabled=\"\"> Later</li>",
                "</ul>"
            )
        );
    }

    #[test]
    fn test_blockquote() {
        assert_eq!(
            convert_html("> quoted"),
            "<blockquote><p>quoted</p></blockquote>"
        );
    }

    #[test]
    fn test_alert_blockquote() {
        assert_eq!(
            convert_html("> [!NOTE]\n> Useful context."),
            concat!(
                "<blockquote class=\"markdown-alert markdown-alert-note\">",
                "<p class=\"markdown-alert-title\">Note</p>",
                "<p>Useful context.</p>",
                "</blockquote>"
            )
        );
    }

    #[test]
    fn test_table_with_alignment() {
        let markdown = "| A | B |\n|---|:-:|\n| 1 | 2 |";
        assert_eq!(
            convert_html(markdown),
            concat!(
                "<table>",
                "<thead><tr><th>A</th><th align=\"center\">B</th></tr></thead>",
                "<tbody><tr><td>1</td><td align=\"center\">2</td></tr></tbody>",
                "</table>"
            )
        );
    }

    #[test]
    fn test_header_only_table_has_no_tbody() {
        let markdown = "| A | B |\n|---|---|";
        assert_eq!(
            convert_html(markdown),
            "<table><thead><tr><th>A</th><th>B</th></tr></thead></table>"
        );
    }

    #[test]
    fn test_links() {
        assert_eq!(
            convert_html("[docs](https://example.com \"The docs\")"),
            "<p><a href=\"https://example.com\" title=\"The docs\">docs</a></p>"
        );
    }

    #[test]
    fn test_email_autolink() {
        assert_eq!(
            convert_html("<user@example.com>"),
            "<p><a href=\"mailto:user@example.com\">user@example.com</a></p>"
        );
    }

    #[test]
    fn test_image_flattens_alt_markdown() {
        assert_eq!(
            convert_html("![the *big* one](shot.png \"Screen\")"),
            "<p><img src=\"shot.png\" alt=\"the big one\" title=\"Screen\"></p>"
        );
    }

    #[test]
    fn test_hard_and_soft_breaks() {
        assert_eq!(convert_html("a\\\nb"), "<p>a<br>\nb</p>");
        assert_eq!(convert_html("a\nb"), "<p>a\nb</p>");
    }

    #[test]
    fn test_rule() {
        assert_eq!(convert_html("---"), "<hr>");
    }

    #[test]
    fn test_math() {
        assert_eq!(
            convert_html("so $x^2$ holds"),
            "<p>so <span class=\"math math-inline\">x^2</span> holds</p>"
        );
        assert_eq!(
            convert_html("$$E = mc^2$$"),
            "<p><div class=\"math math-display\">E = mc^2</div></p>"
        );
    }

    #[test]
    fn test_raw_html_becomes_raw_nodes() {
        let fragment = convert("before <kbd>F1</kbd> after");
        let Node::Element(paragraph) = &fragment.children[0] else {
            panic!("expected paragraph");
        };
        assert!(paragraph.children.iter().any(Node::is_raw));
        assert_eq!(fragment.to_html(), "<p>before <kbd>F1</kbd> after</p>");
    }

    #[test]
    fn test_footnotes() {
        let markdown = "ref[^a] and again[^a]\n\n[^a]: the note";
        assert_eq!(
            convert_html(markdown),
            concat!(
                "<p>ref<sup><a href=\"#fn-a\" id=\"fnref-a\" class=\"footnote-ref\">1</a></sup>",
                " and again",
                "<sup><a href=\"#fn-a\" id=\"fnref-a-2\" class=\"footnote-ref\">1</a></sup></p>",
                "<section data-footnotes=\"\" class=\"footnotes\">",
                "<h2 id=\"footnote-label\" class=\"sr-only\">Footnotes</h2>",
                "<ol><li id=\"fn-a\"><p>the note ",
                "<a href=\"#fnref-a\" class=\"footnote-backref\">\u{21a9}</a></p></li></ol>",
                "</section>"
            )
        );
    }

    #[test]
    fn test_footnotes_numbered_by_first_reference() {
        let markdown = "x[^b] y[^a]\n\n[^a]: first defined\n[^b]: second defined";
        let html = convert_html(markdown);
        let b = html.find("id=\"fn-b\"").unwrap();
        let a = html.find("id=\"fn-a\"").unwrap();
        assert!(b < a, "items follow reference order: {html}");
        assert!(html.contains(">1</a></sup> y<sup>"));
        assert!(html.contains("id=\"fnref-a\" class=\"footnote-ref\">2</a>"));
    }

    #[test]
    fn test_unreferenced_definition_dropped() {
        assert_eq!(convert_html("[^a]: orphan"), "");
    }
}
