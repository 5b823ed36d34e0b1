//! Export view HTML conversion and document assembly

use chrono::{TimeZone, Utc};
use kodegen_tools_confluence::export_converter::html_to_markdown_with;
use kodegen_tools_confluence::{
    ConversionOptions, DocumentMetadata, MarkupConfig, MarkupPipeline, create_markdown_document,
    html_to_markdown, prepare_html_for_export,
};

mod common;
use common::BASE_URL;

const EXPORT_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>Runbook</title>
    <style>body { color: red; }</style>
    <script>window.tracking = true;</script>
</head>
<body>
<div id="main-content" class="wiki-content">
    <h1 id="Runbook-Overview">Overview</h1>
    <p>Restart the <strong>worker</strong> with care. See <a href="/wiki/spaces/OPS/pages/2">the guide</a>.</p>
    <div class="confluence-information-macro confluence-information-macro-note">
        <div class="confluence-information-macro-body"><p>Requires on-call approval.</p></div>
    </div>
    <ol>
        <li>Drain traffic</li>
        <li>Restart <code>worker.service</code></li>
    </ol>
    <div class="code panel pdl"><div class="codeContent panelContent pdl">
        <pre class="syntaxhighlighter-pre" data-syntaxhighlighter-params="brush: bash; gutter: false; theme: Confluence" data-theme="Confluence">systemctl restart worker.service
journalctl -u worker -f</pre>
    </div></div>
    <div class="table-wrap"><table class="confluenceTable"><tbody>
        <tr><th class="confluenceTh">Host</th><th class="confluenceTh">Role</th></tr>
        <tr><td class="confluenceTd">app-1</td><td class="confluenceTd">primary</td></tr>
    </tbody></table></div>
    <p><span class="confluence-embedded-file-wrapper"><img class="confluence-embedded-image" src="/wiki/download/attachments/2/topology.png" alt="Topology"></span></p>
    <noscript>Enable JavaScript</noscript>
</div>
</body>
</html>"#;

#[test]
fn test_export_page_to_markdown() {
    let markdown = html_to_markdown(EXPORT_PAGE);

    assert!(markdown.starts_with("# Overview"));
    assert!(markdown.contains("Restart the **worker** with care."));
    assert!(markdown.contains("[the guide](/wiki/spaces/OPS/pages/2)"));
    assert!(markdown.contains("Requires on-call approval."));
    assert!(markdown.contains("* Drain traffic\n* Restart `worker.service`"));
    assert!(markdown.contains("```bash\nsystemctl restart worker.service\njournalctl -u worker -f\n```"));
    assert!(markdown.contains("| Host | Role |"));
    assert!(markdown.contains("| app-1 | primary |"));
    assert!(markdown.contains("![Topology](/wiki/download/attachments/2/topology.png)"));

    assert!(!markdown.contains("color: red"));
    assert!(!markdown.contains("tracking"));
    assert!(!markdown.contains("Enable JavaScript"));
    assert!(!markdown.contains("Runbook"));
}

#[test]
fn test_minimal_options_reduce_structure_to_text() {
    let markdown = html_to_markdown_with(EXPORT_PAGE, &ConversionOptions::minimal());

    assert!(markdown.contains("the guide"));
    assert!(!markdown.contains("](/wiki/spaces/OPS/pages/2)"));
    assert!(!markdown.contains("| Host | Role |"));
    assert!(markdown.contains("Host"));
    assert!(!markdown.contains("!["));
}

#[test]
fn test_markdown_document_assembly() {
    let metadata = DocumentMetadata {
        page_id: Some("2".to_string()),
        space_key: Some("OPS".to_string()),
        space: Some("Operations".to_string()),
        version: Some(12),
        modified_at: Some("2024-05-01T12:00:00.000Z".to_string()),
        exported_at: Utc.with_ymd_and_hms(2024, 5, 2, 9, 30, 0).single(),
        source_url: Some(format!("{BASE_URL}/spaces/OPS/pages/2")),
        ..DocumentMetadata::new("Runbook")
    };

    let document = create_markdown_document(&html_to_markdown(EXPORT_PAGE), &metadata);

    let front_matter_end = document[4..].find("\n---\n").map(|i| i + 4);
    assert!(document.starts_with("---\n"));
    assert!(front_matter_end.is_some());
    assert!(document.contains("title: \"Runbook\"\n"));
    assert!(document.contains("modified: \"2024-05-01T12:00:00Z\"\n"));
    assert!(document.contains("exported: \"2024-05-02T09:30:00Z\"\n"));
    assert!(document.contains("## Export Information"));
    assert!(document.contains("- **Space:** Operations (OPS)"));
    assert!(document.contains("# Overview"));
}

#[test]
fn test_html_export_shell() {
    let html = prepare_html_for_export(
        r#"<p><a href="/wiki/spaces/OPS">ops</a><img src="/wiki/download/a.png"></p>"#,
        "Runbook <v2>",
        BASE_URL,
        true,
    );

    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains("<title>Runbook &lt;v2&gt;</title>"));
    assert!(html.contains(r#"href="https://example.atlassian.net/wiki/spaces/OPS""#));
    assert!(html.contains(r#"src="https://example.atlassian.net/wiki/download/a.png""#));
    assert!(html.contains("<style>"));
}

#[test]
fn test_pipeline_export_uses_configured_style() -> anyhow::Result<()> {
    let config = MarkupConfig::builder()
        .base_url(BASE_URL)
        .styled_export(false)
        .build()?;
    let pipeline = MarkupPipeline::new(config);

    let html = pipeline.export_html("<p>x</p>", "T");
    assert!(!html.contains("<style>"));
    assert!(pipeline.prepare_html_for_export("<p>x</p>", "T", true).contains("<style>"));
    Ok(())
}

#[test]
fn test_html_export_strips_executable_content() {
    let html = prepare_html_for_export(
        concat!(
            "<p>x</p><script>alert(document.cookie)</script>",
            r#"<img src=x onerror="alert(1)"><a href="javascript:alert(2)">y</a>"#,
            r#"<div class="panel"><img src="data:image/png;base64,iVBORw0KGgo=" alt="inline"></div>"#,
        ),
        "Runbook",
        BASE_URL,
        false,
    );

    assert!(!html.contains("alert(document.cookie)"));
    assert!(!html.contains("onerror"));
    assert!(!html.contains("javascript:"));
    assert!(html.contains("<p>x</p>"));
    assert!(html.contains("<a>y</a>"));
    assert!(html.contains(r#"<div class="panel"><img src="data:image/png;base64,iVBORw0KGgo=" alt="inline" /></div>"#));
}
