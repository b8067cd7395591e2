/// Markdown to HTML conversion with reference links, GFM tables and
/// per-node render overrides
pub mod ast;
pub mod lexer;
pub mod options;
pub mod parser;
pub mod references;
pub mod renderer;
pub mod token;
pub mod typography;

mod grammar;

pub use ast::{Alignment, Node, NodeKind};
pub use options::Options;
pub use references::{LinkDefinition, ReferenceTable};
pub use renderer::{HtmlRenderer, RenderFn, RenderTable};

use log::debug;
use parser::Parser;

/// Render markdown text to HTML with default options
pub fn render(markdown: &str) -> String {
    Document::new(markdown, Options::default()).render()
}

/// A parsed document: its node tree, its link definitions and the render
/// overrides registered on it.
pub struct Document {
    root: Node,
    references: ReferenceTable,
    options: Options,
    renderers: RenderTable,
}

impl Document {
    pub fn new(markdown: &str, options: Options) -> Self {
        let source = markdown.replace("\r\n", "\n");
        let (root, references) = Parser::new(&options).parse(&source);
        debug!(
            "parsed {} top-level block(s) and {} link definition(s)",
            root.children().len(),
            references.len()
        );
        Document {
            root,
            references,
            options,
            renderers: RenderTable::new(),
        }
    }

    /// Replace the default rendering of `kind`. The function gets the
    /// renderer so it can render descendants the usual way.
    pub fn add_render_fn<F>(&mut self, kind: NodeKind, render: F) -> &mut Self
    where
        F: Fn(&Node, &HtmlRenderer<'_>) -> String + Send + Sync + 'static,
    {
        self.renderers.insert(kind, Box::new(render));
        self
    }

    pub fn render(&self) -> String {
        HtmlRenderer::new(&self.options, &self.renderers).render(&self.root)
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn references(&self) -> &ReferenceTable {
        &self.references
    }

    pub fn options(&self) -> &Options {
        &self.options
    }
}
