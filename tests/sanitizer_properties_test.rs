//! Property tests for the sanitizer and the storage renderer
//!
//! - sanitize is idempotent and total for arbitrary input
//! - forbidden elements disappear together with their content
//! - dangerous URL schemes never survive
//! - Markdown converted to storage is already sanitized

use kodegen_tools_confluence::{sanitize, to_storage};
use proptest::prelude::*;

/// Markup-like fragments, including broken and hostile ones
fn fragment() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("<p>".to_string()),
        Just("</p>".to_string()),
        Just("<div class=\"x\">".to_string()),
        Just("</div>".to_string()),
        Just("<strong>".to_string()),
        Just("</strong>".to_string()),
        Just("<ul><li>".to_string()),
        Just("</li></ul>".to_string()),
        Just("<table><tr><td>".to_string()),
        Just("</td></tr></table>".to_string()),
        Just("<br>".to_string()),
        Just("<br/>".to_string()),
        Just("<img src=\"/x.png\" onerror=\"alert(1)\">".to_string()),
        Just("<a href=\"javascript:alert(1)\">".to_string()),
        Just("<a href=\"https://example.com/?a=1&amp;b=2\">".to_string()),
        Just("</a>".to_string()),
        Just("<script>alert(1)</script>".to_string()),
        Just("<script>".to_string()),
        Just("<style>p{}</style>".to_string()),
        Just("<!-- comment -->".to_string()),
        Just("<!--".to_string()),
        Just("<![CDATA[raw <b> ]]>".to_string()),
        Just("<ac:structured-macro ac:name=\"code\">".to_string()),
        Just("<ac:parameter ac:name=\"language\">rust</ac:parameter>".to_string()),
        Just("<ac:plain-text-body><![CDATA[fn main() {} ]]]]><![CDATA[>]]></ac:plain-text-body>".to_string()),
        Just("</ac:structured-macro>".to_string()),
        Just("<ri:page ri:content-title=\"Home\" />".to_string()),
        Just("<unknown-tag data-x=1>".to_string()),
        Just("</unknown-tag>".to_string()),
        Just("&amp;".to_string()),
        Just("&lt;p&gt;".to_string()),
        Just("&bogus;".to_string()),
        Just("<".to_string()),
        Just(">".to_string()),
        Just("\"".to_string()),
        "[a-zA-Z0-9 ]{0,12}",
        any::<String>(),
    ]
}

fn markup() -> impl Strategy<Value = String> {
    prop::collection::vec(fragment(), 0..24).prop_map(|parts| parts.concat())
}

/// Markdown-like fragments
fn markdown_fragment() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("# ".to_string()),
        Just("## ".to_string()),
        Just("\n".to_string()),
        Just("\n\n".to_string()),
        Just("* ".to_string()),
        Just("  * ".to_string()),
        Just("1. ".to_string()),
        Just("- [ ] ".to_string()),
        Just("> ".to_string()),
        Just("```rust\n".to_string()),
        Just("```".to_string()),
        Just("`".to_string()),
        Just("**".to_string()),
        Just("*".to_string()),
        Just("_".to_string()),
        Just("[link](https://example.com)".to_string()),
        Just("[bad](javascript:alert(1))".to_string()),
        Just("![img](/x.png)".to_string()),
        Just("| a | b |\n| --- | --- |\n| 1 | 2 |\n".to_string()),
        Just("---".to_string()),
        Just("<script>alert(1)</script>".to_string()),
        Just("]]>".to_string()),
        Just("&amp;".to_string()),
        Just("\\*".to_string()),
        Just("  \n".to_string()),
        "[a-zA-Z0-9 ]{0,12}",
        any::<String>(),
    ]
}

fn markdown() -> impl Strategy<Value = String> {
    prop::collection::vec(markdown_fragment(), 0..24).prop_map(|parts| parts.concat())
}

proptest! {
    #[test]
    fn sanitize_is_idempotent(input in markup()) {
        let once = sanitize(&input);
        let twice = sanitize(&once);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn sanitize_is_idempotent_on_arbitrary_strings(input in any::<String>()) {
        let once = sanitize(&input);
        prop_assert_eq!(sanitize(&once), once);
    }

    #[test]
    fn sanitize_never_emits_script_or_style(input in markup()) {
        let output = sanitize(&input);
        prop_assert!(!output.contains("<script"));
        prop_assert!(!output.contains("<style"));
        prop_assert!(!output.contains("alert(1)</"));
    }

    #[test]
    fn sanitize_never_emits_dangerous_urls(input in markup()) {
        let output = sanitize(&input);
        prop_assert!(!output.to_ascii_lowercase().contains("javascript:"));
        prop_assert!(!output.contains("onerror"));
    }

    #[test]
    fn storage_output_is_a_sanitizer_fixed_point(input in markdown()) {
        let storage = to_storage(&input);
        prop_assert_eq!(sanitize(&storage), storage);
    }
}

#[test]
fn test_sanitize_totality_on_edge_inputs() {
    for input in ["", " ", "\n\t  \n", "<", "</", "<<<>>>", "<p", "<a href=\"", "<![CDATA[", "&", "&#xFFFFFFFF;"] {
        let once = sanitize(input);
        assert_eq!(sanitize(&once), once, "not idempotent for {input:?}");
    }
}

#[test]
fn test_forbidden_tags_removed_with_content() {
    let output = sanitize("<p>keep</p><script>var stolen = document.cookie;</script><style>.x{}</style>");
    assert_eq!(output, "<p>keep</p>");
}

#[test]
fn test_dangerous_href_neutralized() {
    let output = sanitize(r#"<a href="javascript:alert(1)">x</a>"#);
    assert!(output.contains('x'));
    assert!(!output.contains("javascript:"));
}

#[test]
fn test_obfuscated_scheme_neutralized() {
    let output = sanitize("<a href=\"&#106;ava&#x73;cript:alert(1)\">x</a><a href=\" java\tscript:alert(1)\">y</a>");
    assert!(!output.to_ascii_lowercase().contains("script:"));
    assert!(output.contains('x'));
    assert!(output.contains('y'));
}

#[test]
fn test_storage_macros_survive() {
    let storage = concat!(
        r#"<ac:structured-macro ac:name="code" ac:schema-version="1">"#,
        r#"<ac:parameter ac:name="language">rust</ac:parameter>"#,
        "<ac:plain-text-body><![CDATA[if a < b && c { }]]></ac:plain-text-body>",
        "</ac:structured-macro>",
    );
    assert_eq!(sanitize(storage), storage);
}

#[test]
fn test_event_handlers_dropped() {
    let output = sanitize(r#"<p onclick="steal()" class="lead">Text</p>"#);
    assert!(!output.contains("onclick"));
    assert!(output.contains("Text"));
}
