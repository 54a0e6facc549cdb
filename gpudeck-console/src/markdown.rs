//! Markdown to sanitized HTML for the docs page.

use pulldown_cmark::{html, CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd};

const DIAGRAM_LANG: &str = "mermaid";

/// A diagram block pulled out of a document, to be drawn by the viewer.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagram {
    pub id: String,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RenderedDoc {
    pub html: String,
    pub diagrams: Vec<Diagram>,
}

/// Render `markdown` to HTML that is safe to inject.
///
/// Fenced blocks tagged `mermaid` are replaced by
/// `<div data-diagram-id="diagram-N">` placeholders; their sources come back
/// in `diagrams`, in document order.
pub fn render_markdown(markdown: &str) -> RenderedDoc {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let mut events: Vec<Event> = Vec::new();
    let mut diagrams = Vec::new();
    let mut capturing: Option<String> = None;

    for event in Parser::new_ext(markdown, options) {
        match event {
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(ref lang)))
                if lang.trim().eq_ignore_ascii_case(DIAGRAM_LANG) =>
            {
                capturing = Some(String::new());
            }
            Event::Text(ref text) if capturing.is_some() => {
                if let Some(buf) = capturing.as_mut() {
                    buf.push_str(text);
                }
            }
            Event::End(TagEnd::CodeBlock) if capturing.is_some() => {
                let source = capturing.take().unwrap_or_default();
                let id = format!("diagram-{}", diagrams.len() + 1);
                events.push(Event::Html(CowStr::from(format!(
                    "<div data-diagram-id=\"{}\"></div>\n",
                    id
                ))));
                diagrams.push(Diagram {
                    id,
                    source: source.trim_end().to_string(),
                });
            }
            other => events.push(other),
        }
    }

    let mut raw = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut raw, events.into_iter());

    RenderedDoc {
        html: sanitize(&raw),
        diagrams,
    }
}

fn sanitize(raw: &str) -> String {
    let mut cleaner = ammonia::Builder::default();
    cleaner.add_generic_attributes(&["data-diagram-id"]);
    cleaner.clean(raw).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mermaid_blocks_become_placeholders() {
        let md = "# Failover\n\n```mermaid\ngraph TD\n  A-->B\n```\n\ntext\n\n```mermaid\nsequenceDiagram\n```\n";
        let doc = render_markdown(md);
        assert_eq!(doc.diagrams.len(), 2);
        assert_eq!(doc.diagrams[0].id, "diagram-1");
        assert_eq!(doc.diagrams[0].source, "graph TD\n  A-->B");
        assert!(doc.html.contains(r#"data-diagram-id="diagram-1""#));
        assert!(doc.html.contains(r#"data-diagram-id="diagram-2""#));
        assert!(!doc.html.contains("graph TD"));
        assert!(doc.html.contains("<h1>Failover</h1>"));
    }

    #[test]
    fn other_code_blocks_are_kept() {
        let doc = render_markdown("```bash\nssh root@host\n```\n");
        assert!(doc.diagrams.is_empty());
        assert!(doc.html.contains("ssh root@host"));
    }

    #[test]
    fn scripts_and_handlers_are_stripped() {
        let md = "hello <script>alert(1)</script> <img src=\"x.png\" onerror=\"alert(2)\">";
        let doc = render_markdown(md);
        assert!(!doc.html.contains("<script"));
        assert!(!doc.html.contains("onerror"));
        assert!(doc.html.contains("hello"));
    }

    #[test]
    fn tables_render() {
        let doc = render_markdown("| a | b |\n|---|---|\n| 1 | 2 |\n");
        assert!(doc.html.contains("<table>"));
        assert!(doc.html.contains("<td>1</td>"));
    }
}
