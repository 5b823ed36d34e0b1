//! Allow-list HTML sanitizer for storage-format markup.
//!
//! Sanitization is total: any input, however malformed, produces a string.
//! The algorithm runs over the best-effort tree from [`crate::markup`]:
//! - forbidden elements are dropped together with all of their content
//! - allowed elements are kept with only their allow-listed attributes, and
//!   URL attributes with a dangerous scheme are removed
//! - every other element (stripped wrappers and unknown tags) is unwrapped
//! - CDATA survives only as the body of `ac:plain-text-body`
//!
//! The output re-parses to the tree it was serialized from, which makes
//! `sanitize(sanitize(x)) == sanitize(x)`.

pub mod policy;
pub mod url_safety;

use std::sync::{Arc, LazyLock};

use crate::markup::{Element, Node, parse_fragment, serialize};

pub use policy::{PolicyError, STORAGE_MACRO_TAGS, SanitizationPolicy};
pub use url_safety::{
    DEFAULT_DANGEROUS_SCHEMES, URL_ATTRIBUTES, is_dangerous_url, is_inline_image,
};

/// Element that carries literal CDATA content (code macro bodies)
const CDATA_CONTAINER: &str = "ac:plain-text-body";

static DEFAULT_POLICY: LazyLock<Arc<SanitizationPolicy>> =
    LazyLock::new(|| Arc::new(SanitizationPolicy::confluence_storage()));

static EXPORT_POLICY: LazyLock<Arc<SanitizationPolicy>> =
    LazyLock::new(|| Arc::new(SanitizationPolicy::export_html()));

/// Shared handle to the default storage-format policy
#[must_use]
pub fn default_policy() -> Arc<SanitizationPolicy> {
    Arc::clone(&DEFAULT_POLICY)
}

/// Shared handle to the export document policy
#[must_use]
pub fn export_policy() -> Arc<SanitizationPolicy> {
    Arc::clone(&EXPORT_POLICY)
}

/// Sanitize with the default storage-format policy.
#[must_use]
pub fn sanitize(input: &str) -> String {
    HtmlSanitizer::default().sanitize(input)
}

/// Counters collected during one sanitization pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SanitizeStats {
    pub removed_elements: usize,
    pub unwrapped_elements: usize,
    pub removed_attributes: usize,
    pub neutralized_urls: usize,
}

/// Sanitizer bound to one injected, read-only policy.
#[derive(Debug, Clone)]
pub struct HtmlSanitizer {
    policy: Arc<SanitizationPolicy>,
}

impl Default for HtmlSanitizer {
    fn default() -> Self {
        Self::new(default_policy())
    }
}

impl HtmlSanitizer {
    #[must_use]
    pub fn new(policy: Arc<SanitizationPolicy>) -> Self {
        Self { policy }
    }

    #[must_use]
    pub fn policy(&self) -> &SanitizationPolicy {
        &self.policy
    }

    /// Sanitize a markup string.
    #[must_use]
    pub fn sanitize(&self, input: &str) -> String {
        if input.is_empty() {
            return String::new();
        }

        let (nodes, stats) = self.sanitize_nodes(parse_fragment(input));

        if stats != SanitizeStats::default() {
            tracing::debug!(
                "Sanitizer removed {} elements, unwrapped {}, removed {} attributes ({} dangerous URLs)",
                stats.removed_elements,
                stats.unwrapped_elements,
                stats.removed_attributes,
                stats.neutralized_urls
            );
        }

        serialize(&nodes)
    }

    /// Sanitize an already parsed tree.
    #[must_use]
    pub fn sanitize_nodes(&self, nodes: Vec<Node>) -> (Vec<Node>, SanitizeStats) {
        let mut stats = SanitizeStats::default();
        let mut output = Vec::with_capacity(nodes.len());
        self.filter_nodes(nodes, None, &mut output, &mut stats);
        (output, stats)
    }

    fn filter_nodes(
        &self,
        nodes: Vec<Node>,
        parent: Option<&str>,
        output: &mut Vec<Node>,
        stats: &mut SanitizeStats,
    ) {
        for node in nodes {
            match node {
                Node::Text(text) => output.push(Node::Text(text)),
                Node::CData(text) => {
                    if parent == Some(CDATA_CONTAINER) {
                        output.push(Node::CData(text));
                    } else {
                        output.push(Node::Text(text));
                    }
                }
                Node::Element(element) => self.filter_element(element, parent, output, stats),
            }
        }
    }

    fn filter_element(
        &self,
        element: Element,
        parent: Option<&str>,
        output: &mut Vec<Node>,
        stats: &mut SanitizeStats,
    ) {
        let Element {
            name,
            attrs,
            children,
        } = element;

        if self.policy.is_forbidden(&name) {
            stats.removed_elements += 1;
            return;
        }

        if !self.policy.is_allowed(&name) {
            if !self.policy.is_stripped_wrapper(&name) {
                tracing::debug!("Unwrapping unknown element <{}>", name);
            }
            stats.unwrapped_elements += 1;
            self.filter_nodes(children, parent, output, stats);
            return;
        }

        let attrs = self.filter_attributes(&name, attrs, stats);
        let mut kept = Vec::with_capacity(children.len());
        self.filter_nodes(children, Some(name.as_str()), &mut kept, stats);

        output.push(Node::Element(Element {
            name,
            attrs,
            children: kept,
        }));
    }

    fn filter_attributes(
        &self,
        tag: &str,
        attrs: Vec<(String, String)>,
        stats: &mut SanitizeStats,
    ) -> Vec<(String, String)> {
        attrs
            .into_iter()
            .filter(|(key, value)| {
                if !self.policy.allows_attribute(tag, key) {
                    stats.removed_attributes += 1;
                    return false;
                }
                if self.policy.is_url_attribute(key)
                    && is_dangerous_url(value, self.policy.dangerous_url_schemes())
                    && !(self.policy.allows_inline_image(tag, key) && is_inline_image(value))
                {
                    stats.removed_attributes += 1;
                    stats.neutralized_urls += 1;
                    return false;
                }
                true
            })
            .collect()
    }
}
