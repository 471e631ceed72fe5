use crate::heading_index::{HeadingLevel, HeadingNode};
use anyhow::{Context, Result};
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use log::{debug, warn};
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use std::fs;
use std::path::Path;

/// One block of rendered guide content
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    /// Index into `GuideContent::headings`
    Heading(usize),
    Text(String),
}

/// A rendered guide page reduced to what the navigation engine reads:
/// prose blocks and the `h2`/`h3` headings between them, in document order.
#[derive(Debug, Clone, Default)]
pub struct GuideContent {
    pub title: Option<String>,
    pub blocks: Vec<Block>,
    pub headings: Vec<HeadingNode>,
}

impl GuideContent {
    pub fn from_file(path: &Path) -> Result<Self> {
        let html = fs::read_to_string(path)
            .with_context(|| format!("Failed to read guide page {}", path.display()))?;
        Ok(Self::from_html(&html))
    }

    pub fn from_html(html: &str) -> Self {
        let dom = match parse_document(RcDom::default(), Default::default())
            .from_utf8()
            .read_from(&mut html.as_bytes())
        {
            Ok(dom) => dom,
            Err(e) => {
                warn!("Failed to parse guide HTML: {e}");
                return Self::default();
            }
        };

        let mut content = GuideContent {
            title: find_element(&dom.document, "title")
                .map(|node| collapse_whitespace(&text_of(&node)))
                .filter(|title| !title.is_empty()),
            ..Default::default()
        };

        let region = ["article", "main", "body"]
            .iter()
            .find_map(|tag| find_element(&dom.document, tag))
            .unwrap_or_else(|| dom.document.clone());

        content.visit(&region);
        debug!(
            "Loaded guide content: {} blocks, {} headings",
            content.blocks.len(),
            content.headings.len()
        );
        content
    }

    pub fn heading(&self, index: usize) -> Option<&HeadingNode> {
        self.headings.get(index)
    }

    fn visit(&mut self, node: &Handle) {
        for child in node.children.borrow().iter() {
            match &child.data {
                NodeData::Element { name, attrs, .. } => {
                    let tag = name.local.as_ref();
                    if let Some(level) = HeadingLevel::from_tag(tag) {
                        let text = collapse_whitespace(&text_of(child));
                        let existing_id = attrs
                            .borrow()
                            .iter()
                            .find(|attr| attr.name.local.as_ref() == "id")
                            .map(|attr| attr.value.to_string());
                        let mut heading = HeadingNode::new(text, level);
                        heading.existing_id = existing_id;
                        self.blocks.push(Block::Heading(self.headings.len()));
                        self.headings.push(heading);
                    } else if is_skipped(tag) {
                        continue;
                    } else if is_text_block(tag) && !contains_heading(child) {
                        self.push_text(&text_of(child));
                    } else {
                        self.visit(child);
                    }
                }
                NodeData::Text { contents } => {
                    self.push_text(&contents.borrow());
                }
                _ => {}
            }
        }
    }

    fn push_text(&mut self, raw: &str) {
        let text = collapse_whitespace(raw);
        if !text.is_empty() {
            self.blocks.push(Block::Text(text));
        }
    }
}

fn is_skipped(tag: &str) -> bool {
    matches!(tag, "script" | "style" | "noscript" | "template" | "svg")
}

fn is_text_block(tag: &str) -> bool {
    matches!(
        tag,
        "p" | "li"
            | "blockquote"
            | "pre"
            | "h1"
            | "h4"
            | "h5"
            | "h6"
            | "dt"
            | "dd"
            | "figcaption"
            | "caption"
            | "tr"
    )
}

/// Whether an `h2`/`h3` sits anywhere below `node`
fn contains_heading(node: &Handle) -> bool {
    node.children.borrow().iter().any(|child| match &child.data {
        NodeData::Element { name, .. } => {
            HeadingLevel::from_tag(name.local.as_ref()).is_some() || contains_heading(child)
        }
        _ => false,
    })
}

fn find_element(node: &Handle, tag: &str) -> Option<Handle> {
    for child in node.children.borrow().iter() {
        if let NodeData::Element { name, .. } = &child.data {
            if name.local.as_ref() == tag {
                return Some(child.clone());
            }
        }
        if let Some(found) = find_element(child, tag) {
            return Some(found);
        }
    }
    None
}

fn text_of(node: &Handle) -> String {
    fn collect(node: &Handle, out: &mut String) {
        match &node.data {
            NodeData::Text { contents } => out.push_str(&contents.borrow()),
            NodeData::Element { name, .. } if is_skipped(name.local.as_ref()) => {}
            NodeData::Element { name, .. } if name.local.as_ref() == "br" => out.push(' '),
            _ => {
                for child in node.children.borrow().iter() {
                    collect(child, out);
                }
            }
        }
    }

    let mut out = String::new();
    collect(node, &mut out);
    out
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
