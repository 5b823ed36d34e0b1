//! Shared markup layer: a tolerant tokenizer, a best-effort balanced tree and
//! a serializer for storage-format (XHTML plus `ac:`/`ri:` macro) markup.
//!
//! Storage markup is XML-flavoured: CDATA sections carry code macro bodies and
//! namespaced elements self-close. HTML5 parsers turn CDATA into comments, so
//! this layer parses the dialect itself. Export HTML goes through `scraper`
//! instead (see `export_converter`).

pub mod serializer;
pub mod tokenizer;
pub mod tree;

pub use serializer::{serialize, serialize_into, write_cdata};
pub use tree::{Element, Node, VOID_ELEMENTS, parse_fragment};
