//! Wrap converted content for export: Markdown with a metadata header, or a
//! complete HTML document.

pub mod front_matter;
pub mod html_shell;

pub use front_matter::{DocumentMetadata, assemble_markdown};
pub use html_shell::{absolutize_wiki_links, assemble_html};
