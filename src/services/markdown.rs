use pulldown_cmark::{html, Options, Parser};

pub const EXCERPT_LENGTH: usize = 150;

/// Renders post bodies to HTML that is safe to embed in a page.
pub struct MarkdownRenderer {
    options: Options,
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownRenderer {
    pub fn new() -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_FOOTNOTES);
        Self { options }
    }

    pub fn render(&self, markdown: &str) -> String {
        let parser = Parser::new_ext(markdown, self.options);
        let mut unsafe_html = String::new();
        html::push_html(&mut unsafe_html, parser);
        ammonia::clean(&unsafe_html)
    }

    /// First `length` characters of the raw body, with `...` when cut.
    pub fn generate_excerpt(&self, content: &str, length: usize) -> String {
        let mut chars = content.chars();
        let head: String = chars.by_ref().take(length).collect();
        if chars.next().is_some() {
            format!("{}...", head)
        } else {
            head
        }
    }
}
