//! Markdown export documents with a metadata header.

use std::fmt::Write as _;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::document::markdown_renderer::escape_text;

/// Page metadata written into an exported document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    pub title: String,
    pub page_id: Option<String>,
    pub space_key: Option<String>,
    /// Human-readable space name
    pub space: Option<String>,
    pub version: Option<u64>,
    /// Last modification time as reported by the API (any common timestamp form)
    pub modified_at: Option<String>,
    /// Defaults to the assembly time
    pub exported_at: Option<DateTime<Utc>>,
    pub source_url: Option<String>,
}

impl DocumentMetadata {
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// Prefix `body` with a `---` front-matter block and an
/// "Export Information" section.
///
/// String values are JSON-quoted, which keeps the block valid YAML for any
/// title or URL.
#[must_use]
pub fn assemble_markdown(body: &str, metadata: &DocumentMetadata) -> String {
    let exported = metadata.exported_at.unwrap_or_else(Utc::now);
    let modified = metadata.modified_at.as_deref().map(normalize_timestamp);

    let mut out = String::with_capacity(body.len() + 512);
    out.push_str("---\n");
    push_field(&mut out, "title", &quoted(&metadata.title));
    if let Some(page_id) = &metadata.page_id {
        push_field(&mut out, "pageId", &quoted(page_id));
    }
    if let Some(space) = &metadata.space {
        push_field(&mut out, "space", &quoted(space));
    }
    if let Some(space_key) = &metadata.space_key {
        push_field(&mut out, "spaceKey", &quoted(space_key));
    }
    if let Some(version) = metadata.version {
        push_field(&mut out, "version", &version.to_string());
    }
    if let Some(modified) = &modified {
        push_field(&mut out, "modified", &quoted(modified));
    }
    push_field(
        &mut out,
        "exported",
        &quoted(&exported.to_rfc3339_opts(SecondsFormat::Secs, true)),
    );
    if let Some(source) = &metadata.source_url {
        push_field(&mut out, "source", &quoted(source));
    }
    out.push_str("---\n\n");

    out.push_str("## Export Information\n\n");
    push_info(&mut out, "Title", &escape_text(&metadata.title));
    match (&metadata.space, &metadata.space_key) {
        (Some(space), Some(key)) => {
            push_info(&mut out, "Space", &format!("{} ({})", escape_text(space), escape_text(key)));
        }
        (Some(space), None) => push_info(&mut out, "Space", &escape_text(space)),
        (None, Some(key)) => push_info(&mut out, "Space", &escape_text(key)),
        (None, None) => {}
    }
    if let Some(version) = metadata.version {
        push_info(&mut out, "Version", &version.to_string());
    }
    if let Some(modified) = &modified {
        push_info(&mut out, "Last Modified", &human_timestamp(modified));
    }
    push_info(&mut out, "Exported", &exported.format("%Y-%m-%d %H:%M UTC").to_string());
    if let Some(source) = &metadata.source_url {
        push_info(&mut out, "Source", &format!("<{source}>"));
    }

    out.push_str("\n---\n\n");
    out.push_str(body.trim());
    out.push('\n');
    out
}

fn push_field(out: &mut String, key: &str, value: &str) {
    let _ = writeln!(out, "{key}: {value}");
}

fn push_info(out: &mut String, label: &str, value: &str) {
    let _ = writeln!(out, "- **{label}:** {value}");
}

fn quoted(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

/// Normalize a timestamp to RFC 3339 UTC; unparseable input is kept as is.
fn normalize_timestamp(raw: &str) -> String {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return parsed
            .with_timezone(&Utc)
            .to_rfc3339_opts(SecondsFormat::Secs, true);
    }
    // Confluence also emits offsets without a colon (`+0000`)
    if let Ok(parsed) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return parsed
            .with_timezone(&Utc)
            .to_rfc3339_opts(SecondsFormat::Secs, true);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return naive.and_utc().to_rfc3339_opts(SecondsFormat::Secs, true);
    }
    raw.to_string()
}

fn human_timestamp(normalized: &str) -> String {
    match DateTime::parse_from_rfc3339(normalized) {
        Ok(parsed) => parsed.with_timezone(&Utc).format("%Y-%m-%d %H:%M UTC").to_string(),
        Err(_) => escape_text(normalized),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn metadata() -> DocumentMetadata {
        DocumentMetadata {
            title: "Release \"Notes\": Q3".to_string(),
            page_id: Some("12345".to_string()),
            space_key: Some("ENG".to_string()),
            space: Some("Engineering".to_string()),
            version: Some(7),
            modified_at: Some("2024-03-05T10:20:30.000+0100".to_string()),
            exported_at: Utc.with_ymd_and_hms(2024, 3, 6, 8, 0, 0).single(),
            source_url: Some("https://example.atlassian.net/wiki/spaces/ENG/pages/12345".to_string()),
        }
    }

    #[test]
    fn test_front_matter_fields() {
        let doc = assemble_markdown("# Body", &metadata());

        assert!(doc.starts_with("---\ntitle: \"Release \\\"Notes\\\": Q3\"\n"));
        assert!(doc.contains("pageId: \"12345\"\n"));
        assert!(doc.contains("space: \"Engineering\"\n"));
        assert!(doc.contains("spaceKey: \"ENG\"\n"));
        assert!(doc.contains("version: 7\n"));
        assert!(doc.contains("modified: \"2024-03-05T09:20:30Z\"\n"));
        assert!(doc.contains("exported: \"2024-03-06T08:00:00Z\"\n"));
        assert!(doc.contains("source: \"https://example.atlassian.net/wiki/spaces/ENG/pages/12345\"\n"));
        assert!(doc.ends_with("---\n\n# Body\n"));
    }

    #[test]
    fn test_export_information_section() {
        let doc = assemble_markdown("Body", &metadata());
        assert!(doc.contains("## Export Information\n\n"));
        assert!(doc.contains("- **Space:** Engineering (ENG)\n"));
        assert!(doc.contains("- **Version:** 7\n"));
        assert!(doc.contains("- **Last Modified:** 2024-03-05 09:20 UTC\n"));
        assert!(doc.contains("- **Exported:** 2024-03-06 08:00 UTC\n"));
    }

    #[test]
    fn test_optional_fields_omitted() {
        let doc = assemble_markdown("Body", &DocumentMetadata::new("Plain"));
        assert!(doc.contains("title: \"Plain\"\n"));
        assert!(doc.contains("exported: \""));
        assert!(!doc.contains("version:"));
        assert!(!doc.contains("source:"));
        assert!(!doc.contains("- **Space:**"));
    }

    #[test]
    fn test_unparseable_modified_kept() {
        assert_eq!(normalize_timestamp("last tuesday"), "last tuesday");
        assert_eq!(normalize_timestamp("2024-01-02T03:04:05Z"), "2024-01-02T03:04:05Z");
        assert_eq!(normalize_timestamp("2024-01-02T03:04:05.123"), "2024-01-02T03:04:05Z");
    }
}
