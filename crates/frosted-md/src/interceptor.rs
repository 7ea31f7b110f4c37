//! Meta block and title interception.
//!
//! pulldown-cmark hands out a flat event stream. [`Blocks`] regroups it into
//! top-level blocks so [`RenderInterceptor`] can decide, one block at a time,
//! whether a code block is the document's meta block and whether a leading
//! heading supplies the document title. Everything else is passed through to
//! the output untouched.

use pulldown_cmark::{Event, Tag};
use serde::Deserialize;

use crate::codeblock::{Language, MetaBlock};

/// Where a document keeps its meta block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetaPosition {
    /// First block, or second after a leading heading
    #[default]
    Start,
    /// Last code block in the document
    End,
}

/// Kind of a top-level block.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockKind {
    Heading,
    CodeBlock(Language),
    Other,
}

/// One top-level block and all of its events, start to end.
#[derive(Debug, Clone)]
pub struct Block<'a> {
    pub kind: BlockKind,
    pub events: Vec<Event<'a>>,
}

impl<'a> Block<'a> {
    /// Plain text of the block: text and inline code, concatenated.
    pub fn text(&self) -> String {
        plain_text(&self.events)
    }
}

fn plain_text(events: &[Event<'_>]) -> String {
    let mut text = String::new();
    for event in events {
        if let Event::Text(s) | Event::Code(s) = event {
            text.push_str(s);
        }
    }
    text
}

/// Groups a Markdown event stream into top-level [`Block`]s.
pub struct Blocks<I> {
    events: I,
}

impl<I> Blocks<I> {
    pub fn new(events: I) -> Self {
        Self { events }
    }
}

impl<'a, I> Iterator for Blocks<I>
where
    I: Iterator<Item = Event<'a>>,
{
    type Item = Block<'a>;

    fn next(&mut self) -> Option<Block<'a>> {
        let first = self.events.next()?;

        let kind = match &first {
            Event::Start(Tag::Heading { .. }) => BlockKind::Heading,
            Event::Start(Tag::CodeBlock(kind)) => BlockKind::CodeBlock(Language::from_kind(kind)),
            _ => BlockKind::Other,
        };

        // Leaf events such as rules stand alone at the top level.
        let mut depth = usize::from(matches!(first, Event::Start(_)));
        let mut events = vec![first];

        while depth > 0 {
            let Some(event) = self.events.next() else {
                break;
            };
            match &event {
                Event::Start(_) => depth += 1,
                Event::End(_) => depth -= 1,
                _ => {}
            }
            events.push(event);
        }

        Some(Block { kind, events })
    }
}

/// The meta block candidate and, in [`MetaPosition::End`] mode, its events
/// so it can be put back into the output if a later block supersedes it.
#[derive(Debug)]
struct Candidate<'a> {
    meta: MetaBlock,
    events: Vec<Event<'a>>,
}

/// What is left once the whole document has gone through the interceptor.
#[derive(Debug)]
pub struct Intercepted<'a> {
    /// Output events with the meta block removed
    pub events: Vec<Event<'a>>,

    /// The meta block, if the document had one
    pub meta: Option<MetaBlock>,

    /// Text of the leading heading, if captured
    pub header_title: Option<String>,
}

/// Sits between the Markdown parser and the HTML writer, pulling out the
/// meta block and the leading heading text.
#[derive(Debug)]
pub struct RenderInterceptor<'a> {
    position: MetaPosition,

    /// Committed, non-meta blocks emitted so far
    blocks: usize,

    candidate: Option<Candidate<'a>>,
    header_title: Option<String>,
    out: Vec<Event<'a>>,
}

impl<'a> RenderInterceptor<'a> {
    pub fn new(position: MetaPosition) -> Self {
        Self {
            position,
            blocks: 0,
            candidate: None,
            header_title: None,
            out: Vec::new(),
        }
    }

    /// Feed the next top-level block.
    pub fn on_block(&mut self, block: Block<'a>) {
        let Block { kind, events } = block;
        match kind {
            BlockKind::Heading => self.on_heading(events),
            BlockKind::CodeBlock(language) => {
                let meta = MetaBlock::new(plain_text(&events), language);
                self.on_code_block(meta, events);
            }
            BlockKind::Other => {
                self.flush_pending();
                self.commit(events);
            }
        }
    }

    /// Feed every block of a document, then finish.
    pub fn run<I>(mut self, blocks: I) -> Intercepted<'a>
    where
        I: IntoIterator<Item = Block<'a>>,
    {
        for block in blocks {
            self.on_block(block);
        }
        self.finish()
    }

    /// End of document: whatever candidate is still pending is the meta block.
    pub fn finish(self) -> Intercepted<'a> {
        Intercepted {
            events: self.out,
            meta: self.candidate.map(|c| c.meta),
            header_title: self.header_title.filter(|t| !t.is_empty()),
        }
    }

    fn on_heading(&mut self, events: Vec<Event<'a>>) {
        self.flush_pending();

        // The heading stays in the output; it only doubles as the fallback
        // title and does not count as a committed block.
        if self.blocks == 0 && self.header_title.is_none() {
            self.header_title = Some(plain_text(&events));
            self.emit(events);
        } else {
            self.commit(events);
        }
    }

    fn on_code_block(&mut self, meta: MetaBlock, events: Vec<Event<'a>>) {
        match self.position {
            MetaPosition::Start => {
                if self.blocks == 0 && self.candidate.is_none() {
                    tracing::trace!(language = meta.language.as_str(), "meta block candidate");
                    self.candidate = Some(Candidate {
                        meta,
                        events: Vec::new(),
                    });
                } else {
                    self.commit(events);
                }
            }
            MetaPosition::End => {
                self.flush_pending();
                self.candidate = Some(Candidate { meta, events });
            }
        }
    }

    /// A new block proves the pending candidate was not the last code block.
    fn flush_pending(&mut self) {
        if self.position != MetaPosition::End {
            return;
        }
        if let Some(candidate) = self.candidate.take() {
            self.commit(candidate.events);
        }
    }

    fn commit(&mut self, events: Vec<Event<'a>>) {
        self.blocks += 1;
        self.emit(events);
    }

    /// Append a block, separated from the previous one by a blank line.
    fn emit(&mut self, events: Vec<Event<'a>>) {
        if !self.out.is_empty() {
            self.out.push(Event::Html("\n".into()));
        }
        self.out.extend(events);
    }
}
