//! Markdown to HTML conversion using pulldown-cmark.

use crate::config::MarkdownConfig;
use pulldown_cmark::{Options, Parser, html};

/// Convert Markdown text to an HTML fragment.
///
/// Pure: no I/O, same input always yields the same output.
pub fn to_html(markdown: &str, config: &MarkdownConfig) -> String {
    let parser = Parser::new_ext(markdown, pulldown_options(config));
    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

/// Convert to pulldown-cmark Options
fn pulldown_options(config: &MarkdownConfig) -> Options {
    let mut opts = Options::empty();
    if config.tables {
        opts.insert(Options::ENABLE_TABLES);
    }
    if config.footnotes {
        opts.insert(Options::ENABLE_FOOTNOTES);
    }
    if config.strikethrough {
        opts.insert(Options::ENABLE_STRIKETHROUGH);
    }
    if config.task_lists {
        opts.insert(Options::ENABLE_TASKLISTS);
    }
    opts
}
