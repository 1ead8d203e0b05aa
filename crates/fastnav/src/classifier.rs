//! Link classification — decides which links the engine intercepts.
//!
//! Pure functions of the link and the current document location. No I/O.

use url::Url;

use crate::types::LinkCandidate;

/// Schemes the engine can fetch and swap in place.
const NAVIGABLE_SCHEMES: &[&str] = &["http", "https"];

/// Whether a link is eligible for interception (prefetch or in-place swap).
///
/// All of the following must hold:
/// - the link exists and has a non-empty `href` that resolves against `current`
/// - its hostname equals the current document's hostname
/// - it has no fragment identifier
/// - it does not target a new browsing context and carries no `download`
/// - its scheme is `http` or `https`
pub fn is_interceptable(link: Option<&LinkCandidate>, current: &Url) -> bool {
    let Some(link) = link else {
        return false;
    };
    if link.href.trim().is_empty() || link.download {
        return false;
    }
    if !targets_same_context(link.target.as_deref()) {
        return false;
    }

    let Some(resolved) = resolve_href(&link.href, current) else {
        return false;
    };

    if !NAVIGABLE_SCHEMES.contains(&resolved.scheme()) {
        return false;
    }
    if resolved.fragment().is_some_and(|f| !f.is_empty()) {
        return false;
    }

    match (resolved.host_str(), current.host_str()) {
        (Some(link_host), Some(doc_host)) => link_host.eq_ignore_ascii_case(doc_host),
        _ => false,
    }
}

/// Resolve a raw `href` attribute against the current location.
pub fn resolve_href(href: &str, current: &Url) -> Option<Url> {
    current.join(href.trim()).ok()
}

/// Canonical cache key for a URL: absolute, without fragment.
pub fn canonical_url(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);
    url.to_string()
}

fn targets_same_context(target: Option<&str>) -> bool {
    match target.map(str::trim) {
        None | Some("") => true,
        Some(t) => t.eq_ignore_ascii_case("_self"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn here() -> Url {
        Url::parse("https://portfolio.test/about").unwrap()
    }

    fn check(link: LinkCandidate) -> bool {
        is_interceptable(Some(&link), &here())
    }

    #[test]
    fn test_relative_same_origin_link() {
        assert!(check(LinkCandidate::new("/projects")));
        assert!(check(LinkCandidate::new("diary")));
        assert!(check(LinkCandidate::new("https://portfolio.test/contacts")));
    }

    #[test]
    fn test_missing_or_empty_link() {
        assert!(!is_interceptable(None, &here()));
        assert!(!check(LinkCandidate::new("")));
        assert!(!check(LinkCandidate::new("   ")));
    }

    #[test]
    fn test_cross_origin_never_interceptable() {
        let variants = [
            LinkCandidate::new("https://other-domain.example/x"),
            LinkCandidate::new("https://other-domain.example/x").with_target("_self"),
            LinkCandidate::new("//other-domain.example/x"),
            LinkCandidate::new("http://other-domain.example/"),
        ];
        for link in variants {
            assert!(!check(link.clone()), "{link:?} must not be interceptable");
        }
    }

    #[test]
    fn test_fragment_links_rejected() {
        assert!(!check(LinkCandidate::new("#section")));
        assert!(!check(LinkCandidate::new("/projects#top")));
    }

    #[test]
    fn test_new_context_and_download_rejected() {
        assert!(!check(LinkCandidate::new("/projects").with_target("_blank")));
        assert!(!check(LinkCandidate::new("/projects").with_target("preview")));
        assert!(!check(LinkCandidate::new("/cv.pdf").with_download()));
        assert!(check(LinkCandidate::new("/projects").with_target("_self")));
    }

    #[test]
    fn test_non_navigable_schemes_rejected() {
        assert!(!check(LinkCandidate::new("mailto:me@portfolio.test")));
        assert!(!check(LinkCandidate::new("tel:+15550100")));
        assert!(!check(LinkCandidate::new("javascript:void(0)")));
    }

    #[test]
    fn test_hostname_comparison_ignores_case() {
        assert!(check(LinkCandidate::new("https://PORTFOLIO.test/diary")));
    }

    #[test]
    fn test_canonical_url_strips_fragment() {
        let url = Url::parse("https://portfolio.test/diary#entry-3").unwrap();
        assert_eq!(canonical_url(&url), "https://portfolio.test/diary");
    }
}
