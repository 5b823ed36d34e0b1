//! Tree serializer producing XHTML-style storage markup.
//!
//! Output conventions (relied on by the storage renderer, which must produce
//! byte-identical markup for the same tree):
//! - attributes are written `name="value"` with `& < > "` escaped
//! - text has `& < >` escaped
//! - void HTML elements are written `<br />`
//! - childless namespaced elements (`ac:`, `ri:`) are written `<ri:page />`
//! - every other element gets an explicit end tag

use html_escape::{encode_double_quoted_attribute_to_string, encode_text_to_string};

use super::tree::{Element, Node, VOID_ELEMENTS};

/// Elements whose text content is written without entity escaping
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Serialize a list of nodes back into markup.
#[must_use]
pub fn serialize(nodes: &[Node]) -> String {
    let mut output = String::new();
    serialize_into(nodes, &mut output);
    output
}

/// Serialize nodes, appending to an existing buffer.
pub fn serialize_into(nodes: &[Node], output: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) => {
                encode_text_to_string(text, output);
            }
            Node::CData(text) => write_cdata(text, output),
            Node::Element(element) => serialize_element(element, output),
        }
    }
}

fn serialize_element(element: &Element, output: &mut String) {
    write_start_tag(&element.name, &element.attrs, output);

    if VOID_ELEMENTS.contains(&element.name.as_str()) {
        output.push_str(" />");
        return;
    }
    if element.children.is_empty() && element.name.contains(':') {
        output.push_str(" />");
        return;
    }
    output.push('>');

    if RAW_TEXT_ELEMENTS.contains(&element.name.as_str()) {
        // Raw text is never entity-decoded on parse, so it is written as-is.
        // Only an embedded end tag would change the structure.
        let raw = element.text_content().replace("</", "<\\/");
        output.push_str(&raw);
    } else {
        serialize_into(&element.children, output);
    }

    write_end_tag(&element.name, output);
}

/// Write `<name a="v"` without the closing `>`.
pub fn write_start_tag(name: &str, attrs: &[(String, String)], output: &mut String) {
    output.push('<');
    output.push_str(name);
    for (key, value) in attrs {
        if !is_valid_attribute_name(key) {
            continue;
        }
        output.push(' ');
        output.push_str(key);
        output.push_str("=\"");
        encode_double_quoted_attribute_to_string(value, output);
        output.push('"');
    }
}

pub fn write_end_tag(name: &str, output: &mut String) {
    output.push_str("</");
    output.push_str(name);
    output.push('>');
}

/// Write a CDATA section. A literal `]]>` inside the content is split across
/// two sections so the section cannot be terminated early.
pub fn write_cdata(text: &str, output: &mut String) {
    output.push_str("<![CDATA[");
    output.push_str(&text.replace("]]>", "]]]]><![CDATA[>"));
    output.push_str("]]>");
}

fn is_valid_attribute_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.'))
}
