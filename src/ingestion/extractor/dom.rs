use scraper::{ElementRef, Node};

/// Elements whose text never counts as article content.
pub const STRIPPED: &[&str] = &["script", "style", "nav", "header", "footer", "form", "aside", "noscript"];

pub fn is_stripped(el: &ElementRef) -> bool {
    STRIPPED.contains(&el.value().name())
}

pub fn inside_stripped(el: &ElementRef) -> bool {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .any(|a| is_stripped(&a))
}

/// Text nodes under `el`, skipping stripped subtrees, trimmed and joined with a space.
pub fn visible_text(el: ElementRef) -> String {
    let mut parts = Vec::new();
    collect(el, &mut parts);
    parts.join(" ")
}

fn collect<'a>(el: ElementRef<'a>, out: &mut Vec<&'a str>) {
    for child in el.children() {
        match child.value() {
            Node::Text(text) => {
                let t = text.trim();
                if !t.is_empty() {
                    out.push(t);
                }
            }
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    if !is_stripped(&child_el) {
                        collect(child_el, out);
                    }
                }
            }
            _ => {}
        }
    }
}
