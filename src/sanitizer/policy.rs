//! Allow-list sanitization policy.
//!
//! A policy is constructed once and shared read-only (`Arc`) by every
//! sanitizer that uses it. [`SanitizationPolicy::confluence_storage`] is the
//! table for storage-format content, [`SanitizationPolicy::export_html`] the
//! one for standalone export documents.

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use super::url_safety::{DEFAULT_DANGEROUS_SCHEMES, URL_ATTRIBUTES};

/// Storage-format macro elements that every policy must allow.
pub const STORAGE_MACRO_TAGS: &[&str] = &[
    "ac:structured-macro",
    "ac:parameter",
    "ac:plain-text-body",
    "ac:rich-text-body",
    "ac:link",
    "ac:link-body",
    "ac:plain-text-link-body",
    "ac:image",
    "ac:emoticon",
    "ac:task-list",
    "ac:task",
    "ac:task-id",
    "ac:task-status",
    "ac:task-body",
    "ri:page",
    "ri:attachment",
    "ri:url",
    "ri:user",
    "ri:space",
];

/// Errors raised when a custom policy breaks the policy invariants
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("tag '{0}' is both allowed and forbidden")]
    AllowedAndForbidden(String),

    #[error("tag '{0}' is both allowed and a stripped wrapper")]
    AllowedAndStripped(String),

    #[error("macro tag '{0}' must be explicitly allowed")]
    MacroTagNotAllowed(String),
}

/// Tag and attribute allow-list with forbidden and wrapper sets.
#[derive(Debug, Clone, Default)]
pub struct SanitizationPolicy {
    allowed_tags: HashMap<String, HashSet<String>>,
    forbidden_tags: HashSet<String>,
    stripped_wrapper_tags: HashSet<String>,
    dangerous_url_schemes: Vec<String>,
    url_attributes: HashSet<String>,
    inline_images: bool,
}

/// Elements that never reach output, content included
const FORBIDDEN_TAGS: &[&str] = &[
    "script", "style", "iframe", "object", "embed", "applet", "form", "input", "button",
    "textarea", "select", "option", "noscript", "template", "link", "meta", "base", "frame",
    "frameset", "svg", "math", "title", "head",
];

/// Layout wrappers: unwrapped in storage format, kept in export documents
const LAYOUT_TAGS: &[&str] = &[
    "div", "span", "section", "article", "main", "header", "footer", "nav", "aside", "figure",
    "figcaption",
];

impl SanitizationPolicy {
    /// A policy that allows nothing; every element is unwrapped.
    ///
    /// Dangerous schemes and URL attributes start at their defaults.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            dangerous_url_schemes: DEFAULT_DANGEROUS_SCHEMES
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            url_attributes: URL_ATTRIBUTES.iter().map(|s| (*s).to_string()).collect(),
            ..Self::default()
        }
    }

    /// Policy for Confluence storage format: the HTML subset the editor
    /// produces plus the `ac:`/`ri:` macro vocabulary.
    #[must_use]
    pub fn confluence_storage() -> Self {
        let mut policy = Self::storage_vocabulary();
        for tag in LAYOUT_TAGS
            .iter()
            .chain(&["font", "center", "label", "body", "html"])
        {
            policy = policy.strip_wrapper(tag);
        }
        policy
    }

    /// Policy for exported HTML documents.
    ///
    /// Same vocabulary as storage format, but layout wrappers and `class`
    /// attributes survive for the stylesheet, and `img` may carry an inlined
    /// raster `data:image/...` source.
    #[must_use]
    pub fn export_html() -> Self {
        let mut policy = Self::storage_vocabulary().allow_inline_images();
        for tag in LAYOUT_TAGS {
            policy = policy.allow_tag(tag, &["class", "id"]);
        }
        for tag in [
            "p", "h1", "h2", "h3", "h4", "h5", "h6", "pre", "code", "blockquote", "ul", "ol",
            "li", "table", "th", "td", "tr", "img", "a",
        ] {
            policy = policy.allow_tag(tag, &["class"]);
        }
        for tag in ["h1", "h2", "h3", "h4", "h5", "h6"] {
            policy = policy.allow_tag(tag, &["id"]);
        }
        for tag in ["font", "center", "label", "body", "html"] {
            policy = policy.strip_wrapper(tag);
        }
        policy
    }

    /// HTML subset, macro vocabulary and forbidden elements shared by the
    /// built-in policies
    fn storage_vocabulary() -> Self {
        let mut policy = Self::empty();

        for tag in [
            "p", "br", "hr", "h1", "h2", "h3", "h4", "h5", "h6", "strong", "b", "em", "i", "u",
            "s", "del", "sub", "sup", "code", "pre", "blockquote", "ul", "li", "table", "thead",
            "tbody", "tfoot", "tr", "caption", "colgroup",
        ] {
            policy = policy.allow_tag(tag, &[]);
        }
        policy = policy
            .allow_tag("ol", &["start"])
            .allow_tag("a", &["href", "title"])
            .allow_tag("img", &["src", "alt", "title", "width", "height"])
            .allow_tag("th", &["colspan", "rowspan"])
            .allow_tag("td", &["colspan", "rowspan"])
            .allow_tag("col", &["span"]);

        policy = policy
            .allow_tag(
                "ac:structured-macro",
                &["ac:name", "ac:schema-version", "ac:macro-id"],
            )
            .allow_tag("ac:parameter", &["ac:name"])
            .allow_tag("ac:plain-text-body", &[])
            .allow_tag("ac:rich-text-body", &[])
            .allow_tag("ac:link", &["ac:anchor"])
            .allow_tag("ac:link-body", &[])
            .allow_tag("ac:plain-text-link-body", &[])
            .allow_tag("ac:image", &["ac:alt", "ac:height", "ac:width", "ac:title"])
            .allow_tag("ac:emoticon", &["ac:name"])
            .allow_tag("ac:task-list", &[])
            .allow_tag("ac:task", &[])
            .allow_tag("ac:task-id", &[])
            .allow_tag("ac:task-status", &[])
            .allow_tag("ac:task-body", &[])
            .allow_tag("ac:layout", &[])
            .allow_tag("ac:layout-section", &["ac:type"])
            .allow_tag("ac:layout-cell", &[])
            .allow_tag("ri:page", &["ri:content-title", "ri:space-key"])
            .allow_tag("ri:attachment", &["ri:filename"])
            .allow_tag("ri:url", &["ri:value"])
            .allow_tag("ri:user", &["ri:account-id", "ri:userkey"])
            .allow_tag("ri:space", &["ri:space-key"]);

        for tag in FORBIDDEN_TAGS {
            policy = policy.forbid_tag(tag);
        }

        policy
    }

    /// Allow `tag` with the given attributes (merged with any already allowed)
    #[must_use]
    pub fn allow_tag(mut self, tag: &str, attributes: &[&str]) -> Self {
        let entry = self.allowed_tags.entry(tag.to_ascii_lowercase()).or_default();
        entry.extend(attributes.iter().map(|a| a.to_ascii_lowercase()));
        self
    }

    /// Forbid `tag`: the element and all of its content are removed
    #[must_use]
    pub fn forbid_tag(mut self, tag: &str) -> Self {
        self.forbidden_tags.insert(tag.to_ascii_lowercase());
        self
    }

    /// Strip `tag` but keep its children
    #[must_use]
    pub fn strip_wrapper(mut self, tag: &str) -> Self {
        self.stripped_wrapper_tags.insert(tag.to_ascii_lowercase());
        self
    }

    /// Add a scheme (with trailing colon, e.g. `"file:"`) to the dangerous list
    #[must_use]
    pub fn with_dangerous_scheme(mut self, scheme: &str) -> Self {
        let scheme = scheme.to_ascii_lowercase();
        if !self.dangerous_url_schemes.contains(&scheme) {
            self.dangerous_url_schemes.push(scheme);
        }
        self
    }

    /// Let `img src` carry an inlined raster image (`data:image/png;base64,...`)
    /// even though `data:` is a dangerous scheme everywhere else
    #[must_use]
    pub fn allow_inline_images(mut self) -> Self {
        self.inline_images = true;
        self
    }

    /// Check the policy invariants.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError`] if a tag is both allowed and forbidden (or
    /// stripped), or a storage macro tag is missing from the allow-list.
    pub fn validate(&self) -> Result<(), PolicyError> {
        let mut allowed: Vec<&String> = self.allowed_tags.keys().collect();
        allowed.sort();

        for tag in allowed {
            if self.forbidden_tags.contains(tag) {
                return Err(PolicyError::AllowedAndForbidden(tag.clone()));
            }
            if self.stripped_wrapper_tags.contains(tag) {
                return Err(PolicyError::AllowedAndStripped(tag.clone()));
            }
        }

        for tag in STORAGE_MACRO_TAGS {
            if !self.allowed_tags.contains_key(*tag) {
                return Err(PolicyError::MacroTagNotAllowed((*tag).to_string()));
            }
        }

        Ok(())
    }

    #[must_use]
    pub fn is_allowed(&self, tag: &str) -> bool {
        self.allowed_tags.contains_key(tag)
    }

    #[must_use]
    pub fn is_forbidden(&self, tag: &str) -> bool {
        self.forbidden_tags.contains(tag)
    }

    #[must_use]
    pub fn is_stripped_wrapper(&self, tag: &str) -> bool {
        self.stripped_wrapper_tags.contains(tag)
    }

    #[must_use]
    pub fn allows_attribute(&self, tag: &str, attribute: &str) -> bool {
        self.allowed_tags
            .get(tag)
            .is_some_and(|attrs| attrs.contains(attribute))
    }

    #[must_use]
    pub fn is_url_attribute(&self, attribute: &str) -> bool {
        self.url_attributes.contains(attribute)
    }

    /// Whether `tag`'s `attribute` may hold an inlined raster image
    #[must_use]
    pub fn allows_inline_image(&self, tag: &str, attribute: &str) -> bool {
        self.inline_images && tag == "img" && attribute == "src"
    }

    #[must_use]
    pub fn dangerous_url_schemes(&self) -> &[String] {
        &self.dangerous_url_schemes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confluence_policy_is_valid() {
        assert_eq!(SanitizationPolicy::confluence_storage().validate(), Ok(()));
    }

    #[test]
    fn test_export_policy_is_valid() {
        let policy = SanitizationPolicy::export_html();
        assert_eq!(policy.validate(), Ok(()));
        assert!(policy.is_allowed("div"));
        assert!(policy.allows_attribute("span", "class"));
        assert!(policy.is_forbidden("script"));
        assert!(policy.allows_inline_image("img", "src"));
        assert!(!policy.allows_inline_image("a", "href"));
        assert!(!SanitizationPolicy::confluence_storage().allows_inline_image("img", "src"));
    }

    #[test]
    fn test_every_macro_tag_is_allowed() {
        let policy = SanitizationPolicy::confluence_storage();
        for tag in STORAGE_MACRO_TAGS {
            assert!(policy.is_allowed(tag), "{tag} should be allowed");
        }
    }

    #[test]
    fn test_conflicting_tag_is_rejected() {
        let policy = SanitizationPolicy::confluence_storage().forbid_tag("p");
        assert_eq!(
            policy.validate(),
            Err(PolicyError::AllowedAndForbidden("p".to_string()))
        );
    }

    #[test]
    fn test_missing_macro_tag_is_rejected() {
        let policy = SanitizationPolicy::empty().allow_tag("p", &[]);
        assert!(matches!(
            policy.validate(),
            Err(PolicyError::MacroTagNotAllowed(_))
        ));
    }

    #[test]
    fn test_attribute_lookup() {
        let policy = SanitizationPolicy::confluence_storage();
        assert!(policy.allows_attribute("a", "href"));
        assert!(!policy.allows_attribute("a", "onclick"));
        assert!(!policy.allows_attribute("p", "style"));
        assert!(policy.allows_attribute("ri:url", "ri:value"));
    }
}
