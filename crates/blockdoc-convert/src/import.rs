//! Markdown import collaborator.
//!
//! Walks the pulldown-cmark event stream and produces the ordered block
//! array [`Session::load_blocks`] accepts. The importer only shapes blocks;
//! order assignment and structural normalization happen in the engine when
//! the batch is committed.
//!
//! [`Session::load_blocks`]: blockdoc_engine::editing::Session::load_blocks

use std::sync::Arc;

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};

use blockdoc_engine::editing::{Block, ElementChild, ElementNode, NodeKind, PropValue, TextLeaf};

#[derive(Debug, Default)]
pub struct MarkdownImporter;

impl MarkdownImporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a Markdown source into Block-shaped objects, in document order.
    ///
    /// Headings, paragraphs, lists (bulleted, numbered, task), block quotes,
    /// fenced and indented code, and thematic breaks map onto their block
    /// types; bold, italic, strikethrough, and inline code become marks,
    /// links become inline link elements. Nested lists flatten into their
    /// outermost list block. Anything else contributes its text content.
    pub fn import(&self, input: &str) -> Vec<Block> {
        let options = Options::ENABLE_TASKLISTS | Options::ENABLE_STRIKETHROUGH;
        let mut state = ImportState::default();
        for event in Parser::new_ext(input, options) {
            state.handle(event);
        }
        state.blocks
    }
}

#[derive(Debug)]
struct ItemDraft {
    children: Vec<ElementChild>,
    checked: Option<bool>,
}

#[derive(Debug)]
struct ListContext {
    ordered: bool,
    has_tasks: bool,
    items: Vec<ItemDraft>,
    /// Content of the item currently being read.
    current: Vec<ElementChild>,
    pending_check: Option<bool>,
}

#[derive(Debug)]
struct CodeContext {
    language: Option<String>,
    text: String,
}

#[derive(Debug, Default)]
struct ImportState {
    blocks: Vec<Block>,
    /// Inline runs of the construct currently being read.
    runs: Vec<ElementChild>,
    /// Active mark names, innermost last.
    marks: Vec<&'static str>,
    /// Open links: `(href, collected content)`.
    links: Vec<(String, Vec<ElementChild>)>,
    lists: Vec<ListContext>,
    quote_depth: usize,
    quote_runs: Vec<ElementChild>,
    code: Option<CodeContext>,
    image_depth: usize,
}

impl ImportState {
    fn handle(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => match &mut self.code {
                Some(code) => code.text.push_str(&text),
                None => self.push_text(&text, None),
            },
            Event::Code(text) => self.push_text(&text, Some("code")),
            Event::SoftBreak => self.push_text(" ", None),
            Event::HardBreak => self.push_text("\n", None),
            Event::Rule => self.push_block("Divider", ElementNode::root("divider", NodeKind::Void)),
            Event::TaskListMarker(state) => {
                if let Some(list) = self.lists.last_mut() {
                    list.has_tasks = true;
                    list.pending_check = Some(state);
                }
            }
            // Raw HTML, footnotes and math have no block type to land in.
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::List(start) => {
                // A nested list opens while its parent item's text is still
                // in the inline buffer; park that text on the parent item
                // before switching context.
                if !self.lists.is_empty() {
                    self.flush_runs_into_item();
                }
                self.lists.push(ListContext {
                    ordered: start.is_some(),
                    has_tasks: false,
                    items: Vec::new(),
                    current: Vec::new(),
                    pending_check: None,
                });
            }
            Tag::BlockQuote(_) => self.quote_depth += 1,
            Tag::CodeBlock(kind) => {
                let language = match kind {
                    CodeBlockKind::Fenced(info) if !info.is_empty() => Some(info.to_string()),
                    _ => None,
                };
                self.code = Some(CodeContext {
                    language,
                    text: String::new(),
                });
            }
            Tag::Strong => self.marks.push("bold"),
            Tag::Emphasis => self.marks.push("italic"),
            Tag::Strikethrough => self.marks.push("strikethrough"),
            Tag::Link { dest_url, .. } => self.links.push((dest_url.to_string(), Vec::new())),
            Tag::Image { .. } => self.image_depth += 1,
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => {
                if !self.lists.is_empty() {
                    self.flush_runs_into_item();
                } else if self.quote_depth > 0 {
                    self.flush_runs_into_quote();
                } else {
                    let runs = std::mem::take(&mut self.runs);
                    self.push_block(
                        "Paragraph",
                        ElementNode::root("paragraph", NodeKind::Block)
                            .with_children(non_empty(runs)),
                    );
                }
            }
            TagEnd::Heading(level) => {
                let (kind, root) = match level {
                    HeadingLevel::H1 => ("HeadingOne", "heading-one"),
                    HeadingLevel::H2 => ("HeadingTwo", "heading-two"),
                    _ => ("HeadingThree", "heading-three"),
                };
                let runs = std::mem::take(&mut self.runs);
                self.push_block(
                    kind,
                    ElementNode::root(root, NodeKind::Block).with_children(non_empty(runs)),
                );
            }
            TagEnd::Item => self.close_item(),
            TagEnd::List(_) => {
                let Some(list) = self.lists.pop() else {
                    return;
                };
                if self.lists.is_empty() {
                    if !list.items.is_empty() {
                        self.blocks.push(list_block(list));
                    }
                } else {
                    // A nested list closes while its parent item is still
                    // open; close that item now so the flattened items keep
                    // document order.
                    self.close_item();
                    if let Some(parent) = self.lists.last_mut() {
                        parent.has_tasks |= list.has_tasks;
                        parent.items.extend(list.items);
                    }
                }
            }
            TagEnd::BlockQuote(_) => {
                self.quote_depth = self.quote_depth.saturating_sub(1);
                if self.quote_depth == 0 {
                    self.flush_runs_into_quote();
                    let runs = std::mem::take(&mut self.quote_runs);
                    self.push_block(
                        "Blockquote",
                        ElementNode::root("blockquote", NodeKind::Block)
                            .with_children(non_empty(runs)),
                    );
                }
            }
            TagEnd::CodeBlock => {
                let Some(code) = self.code.take() else {
                    return;
                };
                let mut text = code.text;
                if text.ends_with('\n') {
                    text.pop();
                }
                let mut root = ElementNode::root("code", NodeKind::Block)
                    .with_children(vec![ElementChild::Text(TextLeaf::new(text))]);
                if let Some(language) = code.language {
                    root = root.with_prop("language", language);
                }
                self.push_block("Code", root);
            }
            TagEnd::Strong | TagEnd::Emphasis | TagEnd::Strikethrough => {
                self.marks.pop();
            }
            TagEnd::Link => {
                if let Some((href, children)) = self.links.pop() {
                    let node = ElementNode::new("link")
                        .with_prop("href", href)
                        .with_children(non_empty(children));
                    self.push_child(ElementChild::element(node));
                }
            }
            TagEnd::Image => self.image_depth = self.image_depth.saturating_sub(1),
            _ => {}
        }
    }

    fn push_text(&mut self, text: &str, extra_mark: Option<&str>) {
        if text.is_empty() {
            return;
        }
        let mut leaf = TextLeaf::new(text);
        for mark in &self.marks {
            leaf.marks.insert((*mark).to_string(), PropValue::Bool(true));
        }
        if let Some(mark) = extra_mark {
            leaf.marks.insert(mark.to_string(), PropValue::Bool(true));
        }
        self.push_child(ElementChild::Text(leaf));
    }

    fn push_child(&mut self, child: ElementChild) {
        // Alt text of images is dropped; uploads are a different collaborator.
        if self.image_depth > 0 {
            return;
        }
        match self.links.last_mut() {
            Some((_, buffer)) => buffer.push(child),
            None => self.runs.push(child),
        }
    }

    fn push_block(&mut self, kind: &str, root: ElementNode) {
        self.blocks.push(Block::new(kind, vec![Arc::new(root)]));
    }

    /// Move the inline buffer into the open list item, separating multiple
    /// paragraphs within one item by a newline run.
    fn flush_runs_into_item(&mut self) {
        let runs = std::mem::take(&mut self.runs);
        if runs.is_empty() {
            return;
        }
        if let Some(list) = self.lists.last_mut() {
            if !list.current.is_empty() {
                list.current.push(ElementChild::Text(TextLeaf::new("\n")));
            }
            list.current.extend(runs);
        }
    }

    fn flush_runs_into_quote(&mut self) {
        let runs = std::mem::take(&mut self.runs);
        if runs.is_empty() {
            return;
        }
        if !self.quote_runs.is_empty() {
            self.quote_runs.push(ElementChild::Text(TextLeaf::new("\n")));
        }
        self.quote_runs.extend(runs);
    }

    fn close_item(&mut self) {
        self.flush_runs_into_item();
        if let Some(list) = self.lists.last_mut() {
            if list.current.is_empty() && list.pending_check.is_none() {
                return;
            }
            let children = std::mem::take(&mut list.current);
            let checked = list.pending_check.take();
            list.items.push(ItemDraft { children, checked });
        }
    }
}

fn list_block(list: ListContext) -> Block {
    let (kind, root_kind, item_kind) = if list.has_tasks {
        ("TodoList", "todo-list", "todo-list-item")
    } else if list.ordered {
        ("NumberedList", "numbered-list", "numbered-list-item")
    } else {
        ("BulletedList", "bulleted-list", "bulleted-list-item")
    };
    let items: Vec<ElementChild> = list
        .items
        .into_iter()
        .map(|draft| {
            let mut item = ElementNode::new(item_kind).with_children(non_empty(draft.children));
            if list.has_tasks {
                item = item.with_prop("checked", draft.checked.unwrap_or(false));
            }
            ElementChild::element(item)
        })
        .collect();
    Block::new(
        kind,
        vec![Arc::new(
            ElementNode::root(root_kind, NodeKind::Block).with_children(items),
        )],
    )
}

fn non_empty(children: Vec<ElementChild>) -> Vec<ElementChild> {
    if children.is_empty() {
        vec![ElementChild::Text(TextLeaf::empty())]
    } else {
        children
    }
}
