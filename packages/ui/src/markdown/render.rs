use pulldown_cmark::{CodeBlockKind, CowStr, Event, Options, Parser, Tag};

/// Semantic element kinds a rendered post can contain.
#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    Heading(u8),
    Paragraph,
    BlockQuote,
    CodeBlock { language: Option<String> },
    /// `start` is `Some` for ordered lists.
    List { start: Option<u64> },
    ListItem,
    Table,
    TableHead,
    TableRow,
    TableCell,
    Emphasis,
    Strong,
    Strikethrough,
    InlineCode,
    /// `href` is `None` when the destination was not a safe URL.
    Link { href: Option<String>, title: Option<String> },
    /// `src` is `None` when the source was not a safe URL.
    Image { src: Option<String>, title: Option<String> },
    LineBreak,
    Rule,
}

impl NodeKind {
    pub fn tag_name(&self) -> &'static str {
        match self {
            NodeKind::Heading(1) => "h1",
            NodeKind::Heading(2) => "h2",
            NodeKind::Heading(3) => "h3",
            NodeKind::Heading(4) => "h4",
            NodeKind::Heading(5) => "h5",
            NodeKind::Heading(_) => "h6",
            NodeKind::Paragraph => "p",
            NodeKind::BlockQuote => "blockquote",
            NodeKind::CodeBlock { .. } => "pre",
            NodeKind::List { start: Some(_) } => "ol",
            NodeKind::List { start: None } => "ul",
            NodeKind::ListItem => "li",
            NodeKind::Table => "table",
            NodeKind::TableHead => "thead",
            NodeKind::TableRow => "tr",
            NodeKind::TableCell => "td",
            NodeKind::Emphasis => "em",
            NodeKind::Strong => "strong",
            NodeKind::Strikethrough => "del",
            NodeKind::InlineCode => "code",
            NodeKind::Link { .. } => "a",
            NodeKind::Image { .. } => "img",
            NodeKind::LineBreak => "br",
            NodeKind::Rule => "hr",
        }
    }

    pub fn css_class(&self) -> &'static str {
        match self {
            NodeKind::Heading(1) => "md-h1",
            NodeKind::Heading(2) => "md-h2",
            NodeKind::Heading(3) => "md-h3",
            NodeKind::Heading(4) => "md-h4",
            NodeKind::Heading(5) => "md-h5",
            NodeKind::Heading(_) => "md-h6",
            NodeKind::Paragraph => "md-p",
            NodeKind::BlockQuote => "md-blockquote",
            NodeKind::CodeBlock { .. } => "md-code",
            NodeKind::List { start: Some(_) } => "md-ol",
            NodeKind::List { start: None } => "md-ul",
            NodeKind::ListItem => "md-li",
            NodeKind::Table | NodeKind::TableHead | NodeKind::TableRow | NodeKind::TableCell => {
                "md-table"
            }
            NodeKind::Emphasis => "md-em",
            NodeKind::Strong => "md-strong",
            NodeKind::Strikethrough => "md-del",
            NodeKind::InlineCode => "md-inline-code",
            NodeKind::Link { .. } => "md-link",
            NodeKind::Image { .. } => "md-img",
            NodeKind::LineBreak => "md-br",
            NodeKind::Rule => "md-hr",
        }
    }

    fn is_void(&self) -> bool {
        matches!(self, NodeKind::LineBreak | NodeKind::Rule | NodeKind::Image { .. })
    }
}

/// A node of the rendered tree. Text is always plain text, never markup.
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    Element { kind: NodeKind, children: Vec<Node> },
    Text(String),
}

impl Node {
    fn element(kind: NodeKind, children: Vec<Node>) -> Self {
        Node::Element { kind, children }
    }

    /// Concatenated text of this node and its descendants.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Node::Text(text) => out.push_str(text),
            Node::Element { children, .. } => {
                for child in children {
                    child.collect_text(out);
                }
            }
        }
    }

    fn write_html(&self, out: &mut String) {
        match self {
            Node::Text(text) => out.push_str(&html_escape(text)),
            Node::Element { kind, children } => write_element(kind, children, out),
        }
    }
}

fn write_element(kind: &NodeKind, children: &[Node], out: &mut String) {
    match kind {
        // Unsafe destinations keep their text but lose the element
        NodeKind::Link { href: None, .. } => {
            for child in children {
                child.write_html(out);
            }
            return;
        }
        NodeKind::Image { src: None, .. } => {
            let alt: String = children.iter().map(Node::text_content).collect();
            out.push_str(&html_escape(&alt));
            return;
        }
        _ => {}
    }

    let tag = kind.tag_name();
    out.push('<');
    out.push_str(tag);
    out.push_str(&format!(" class=\"{}\"", kind.css_class()));
    match kind {
        NodeKind::Link { href: Some(href), title } => {
            out.push_str(&format!(" href=\"{}\" rel=\"nofollow noopener\"", html_escape(href)));
            if let Some(title) = title {
                out.push_str(&format!(" title=\"{}\"", html_escape(title)));
            }
        }
        NodeKind::Image { src: Some(src), title } => {
            let alt: String = children.iter().map(Node::text_content).collect();
            out.push_str(&format!(" src=\"{}\" alt=\"{}\"", html_escape(src), html_escape(&alt)));
            if let Some(title) = title {
                out.push_str(&format!(" title=\"{}\"", html_escape(title)));
            }
        }
        NodeKind::List { start: Some(start) } if *start != 1 => {
            out.push_str(&format!(" start=\"{start}\""));
        }
        _ => {}
    }
    out.push('>');
    if kind.is_void() {
        return;
    }

    if let NodeKind::CodeBlock { language } = kind {
        match language {
            Some(lang) => out.push_str(&format!("<code class=\"language-{}\">", html_escape(lang))),
            None => out.push_str("<code>"),
        }
        for child in children {
            child.write_html(out);
        }
        out.push_str("</code>");
    } else {
        for child in children {
            child.write_html(out);
        }
    }

    out.push_str("</");
    out.push_str(tag);
    out.push('>');
}

/// A rendered markdown document.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Document {
    pub nodes: Vec<Node>,
}

impl Document {
    /// Serialise to HTML. All text and attribute values are escaped.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            node.write_html(&mut out);
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// An open element while walking the event stream. `kind == None` marks a
/// container we do not model; its children are spliced into the parent.
struct Frame {
    kind: Option<NodeKind>,
    children: Vec<Node>,
}

impl Frame {
    fn new(kind: Option<NodeKind>) -> Self {
        Self {
            kind,
            children: Vec::new(),
        }
    }

    fn push_text(&mut self, text: &str) {
        if let Some(Node::Text(last)) = self.children.last_mut() {
            last.push_str(text);
        } else {
            self.children.push(Node::Text(text.to_string()));
        }
    }
}

fn open_tag(tag: Tag<'_>) -> Option<NodeKind> {
    let kind = match tag {
        Tag::Heading { level, .. } => NodeKind::Heading(level as u8),
        Tag::Paragraph => NodeKind::Paragraph,
        // Raw HTML blocks are shown as text, in their own paragraph
        Tag::HtmlBlock => NodeKind::Paragraph,
        Tag::BlockQuote(_) => NodeKind::BlockQuote,
        Tag::CodeBlock(CodeBlockKind::Fenced(info)) => NodeKind::CodeBlock {
            language: code_language(&info),
        },
        Tag::CodeBlock(CodeBlockKind::Indented) => NodeKind::CodeBlock { language: None },
        Tag::List(start) => NodeKind::List { start },
        Tag::Item => NodeKind::ListItem,
        Tag::Table(_) => NodeKind::Table,
        Tag::TableHead => NodeKind::TableHead,
        Tag::TableRow => NodeKind::TableRow,
        Tag::TableCell => NodeKind::TableCell,
        Tag::Emphasis => NodeKind::Emphasis,
        Tag::Strong => NodeKind::Strong,
        Tag::Strikethrough => NodeKind::Strikethrough,
        Tag::Link {
            dest_url, title, ..
        } => NodeKind::Link {
            href: safe_url(&dest_url),
            title: non_empty(title),
        },
        Tag::Image {
            dest_url, title, ..
        } => NodeKind::Image {
            src: safe_url(&dest_url),
            title: non_empty(title),
        },
        _ => return None,
    };
    Some(kind)
}

fn code_language(info: &str) -> Option<String> {
    let lang: String = info
        .split_whitespace()
        .next()
        .unwrap_or("")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+' | '#' | '.'))
        .collect();
    (!lang.is_empty()).then_some(lang)
}

fn non_empty(s: CowStr<'_>) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

/// Accept relative URLs and the http, https and mailto schemes. Anything else
/// (`javascript:`, `data:`, `vbscript:` …) is rejected. Whitespace and control
/// characters are ignored when looking for the scheme, as browsers do.
pub fn safe_url(raw: &str) -> Option<String> {
    let compact: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect();
    if compact.is_empty() {
        return None;
    }
    let scheme_end = compact.find(|c: char| matches!(c, ':' | '/' | '?' | '#'));
    match scheme_end {
        Some(i) if compact[i..].starts_with(':') => {
            let scheme = compact[..i].to_ascii_lowercase();
            matches!(scheme.as_str(), "http" | "https" | "mailto").then(|| raw.trim().to_string())
        }
        _ => Some(raw.trim().to_string()),
    }
}

fn parser_options() -> Options {
    let mut opts = Options::empty();
    opts.insert(Options::ENABLE_STRIKETHROUGH);
    opts.insert(Options::ENABLE_TABLES);
    opts.insert(Options::ENABLE_TASKLISTS);
    opts
}

/// Render markdown into a sanitized [`Document`].
///
/// Raw HTML in the source never becomes markup: it is carried as literal text
/// and escaped on output.
pub fn render(markdown: &str) -> Document {
    let mut stack = vec![Frame::new(None)];

    for event in Parser::new_ext(markdown, parser_options()) {
        match event {
            Event::Start(tag) => stack.push(Frame::new(open_tag(tag))),
            Event::End(_) => {
                if stack.len() < 2 {
                    continue;
                }
                let Some(frame) = stack.pop() else { continue };
                let Some(parent) = stack.last_mut() else { continue };
                match frame.kind {
                    Some(kind) => parent.children.push(Node::element(kind, frame.children)),
                    None => parent.children.extend(frame.children),
                }
            }
            Event::Text(text) | Event::Html(text) | Event::InlineHtml(text) => {
                if let Some(current) = stack.last_mut() {
                    current.push_text(&text);
                }
            }
            Event::Code(code) => {
                if let Some(current) = stack.last_mut() {
                    current.children.push(Node::element(
                        NodeKind::InlineCode,
                        vec![Node::Text(code.to_string())],
                    ));
                }
            }
            Event::SoftBreak => {
                if let Some(current) = stack.last_mut() {
                    current.push_text("\n");
                }
            }
            Event::HardBreak => {
                if let Some(current) = stack.last_mut() {
                    current.children.push(Node::element(NodeKind::LineBreak, Vec::new()));
                }
            }
            Event::Rule => {
                if let Some(current) = stack.last_mut() {
                    current.children.push(Node::element(NodeKind::Rule, Vec::new()));
                }
            }
            Event::TaskListMarker(done) => {
                if let Some(current) = stack.last_mut() {
                    current.push_text(if done { "[x] " } else { "[ ] " });
                }
            }
            Event::FootnoteReference(name) => {
                if let Some(current) = stack.last_mut() {
                    current.push_text(&format!("[{name}]"));
                }
            }
            _ => {}
        }
    }

    // Unbalanced input cannot happen with pulldown-cmark, but fold any open
    // frames back so no content is lost.
    while stack.len() > 1 {
        if let Some(frame) = stack.pop() {
            if let Some(parent) = stack.last_mut() {
                match frame.kind {
                    Some(kind) => parent.children.push(Node::element(kind, frame.children)),
                    None => parent.children.extend(frame.children),
                }
            }
        }
    }

    Document {
        nodes: stack.pop().map(|root| root.children).unwrap_or_default(),
    }
}

pub(crate) fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Node {
        Node::Text(s.to_string())
    }

    #[test]
    fn test_heading_and_paragraph() {
        let doc = render("# Title\n\nSome *text*.");
        assert_eq!(
            doc.nodes,
            vec![
                Node::element(NodeKind::Heading(1), vec![text("Title")]),
                Node::element(
                    NodeKind::Paragraph,
                    vec![
                        text("Some "),
                        Node::element(NodeKind::Emphasis, vec![text("text")]),
                        text("."),
                    ]
                ),
            ]
        );
    }

    #[test]
    fn test_lists() {
        let doc = render("- a\n- b\n\n3. x\n4. y\n");
        let Node::Element { kind, children } = &doc.nodes[0] else {
            panic!("expected list");
        };
        assert_eq!(*kind, NodeKind::List { start: None });
        assert_eq!(children.len(), 2);

        let Node::Element { kind, .. } = &doc.nodes[1] else {
            panic!("expected list");
        };
        assert_eq!(*kind, NodeKind::List { start: Some(3) });
        assert!(doc.to_html().contains("<ol class=\"md-ol\" start=\"3\">"));
    }

    #[test]
    fn test_code_block_keeps_language_and_escapes() {
        let doc = render("```rust\nlet x = a < b;\n```\n");
        assert_eq!(
            doc.to_html(),
            "<pre class=\"md-code\"><code class=\"language-rust\">let x = a &lt; b;\n</code></pre>"
        );
    }

    #[test]
    fn test_inline_code() {
        let doc = render("use `<b>` tags");
        assert_eq!(
            doc.to_html(),
            "<p class=\"md-p\">use <code class=\"md-inline-code\">&lt;b&gt;</code> tags</p>"
        );
    }

    #[test]
    fn test_raw_html_is_text() {
        let doc = render("<script>alert(1)</script>\n\nhi <img src=x onerror=alert(1)>");
        let html = doc.to_html();
        assert!(!html.contains("<script"));
        assert!(!html.contains("<img"));
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
    }

    #[test]
    fn test_javascript_links_are_dropped() {
        let doc = render("[click](javascript:alert(1)) and [ok](https://example.com)");
        let html = doc.to_html();
        assert!(!html.contains("javascript"));
        assert!(html.contains("click"));
        assert!(html.contains("href=\"https://example.com\""));
    }

    #[test]
    fn test_unsafe_image_shows_alt_text() {
        let doc = render("![logo](data:image/svg+xml;base64,AAAA)");
        assert_eq!(doc.to_html(), "<p class=\"md-p\">logo</p>");
    }

    #[test]
    fn test_image() {
        let doc = render("![a \"cat\"](/uploads/cat.png)");
        assert_eq!(
            doc.to_html(),
            "<p class=\"md-p\"><img class=\"md-img\" src=\"/uploads/cat.png\" alt=\"a &quot;cat&quot;\"></p>"
        );
    }

    #[test]
    fn test_safe_url() {
        assert_eq!(safe_url("https://a.b/c").as_deref(), Some("https://a.b/c"));
        assert_eq!(safe_url("/relative/path").as_deref(), Some("/relative/path"));
        assert_eq!(safe_url("page#frag").as_deref(), Some("page#frag"));
        assert_eq!(safe_url("mailto:me@x.y").as_deref(), Some("mailto:me@x.y"));
        assert!(safe_url("JavaScript:alert(1)").is_none());
        assert!(safe_url("java\tscript:alert(1)").is_none());
        assert!(safe_url("vbscript:x").is_none());
        assert!(safe_url("").is_none());
    }

    #[test]
    fn test_empty_input() {
        assert!(render("").is_empty());
        assert_eq!(render("   \n").to_html(), "");
    }
}
