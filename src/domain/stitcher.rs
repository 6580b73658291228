//! Cross-language stitching.
//!
//! Client-side code often calls a service endpoint through an HTTP helper
//! (`axios.post("/api/orders")`) rather than by the endpoint function's
//! name, so name resolution alone leaves those call sites dangling. The
//! stitcher runs over the dangling set and matches call sites to
//! endpoint-shaped definitions by convention. Best effort: false positives
//! are acceptable, missed impact is the failure mode to avoid.

use crate::domain::linker::{NameIndex, SymbolEntry};
use crate::domain::model::{CallSiteRecord, MetaValue, SymbolId};

/// A call site left unresolved by phase-2 name resolution.
pub struct UnresolvedCall<'a> {
    pub file: &'a str,
    pub site: &'a CallSiteRecord,
}

/// Strategy seam for endpoint matching. Implementations must be
/// thread-safe; swapping strategies must not touch the linker.
pub trait EndpointMatcher: Send + Sync {
    /// Select the endpoint-shaped definitions this strategy considers
    /// match candidates.
    fn endpoint_pool(&self, index: &NameIndex) -> Vec<SymbolEntry>;

    /// Endpoints a dangling call site plausibly targets. Empty means the
    /// call site stays dangling, which is a normal outcome.
    fn match_call(&self, call: &UnresolvedCall, endpoints: &[SymbolEntry]) -> Vec<SymbolId>;
}

/// HTTP-verb client calls (`post`, `fetch`, ...) matched against
/// conventionally named handlers (`create_order`, `api_users`, ...).
const CLIENT_VERBS: &[&str] = &["post", "get", "put", "delete", "fetch", "request"];
const ENDPOINT_PREFIXES: &[&str] = &["create_", "get_", "update_", "delete_", "api_"];

/// Default strategy: pure naming conventions, no parser cooperation needed.
/// High recall, known false positives.
#[derive(Debug, Default)]
pub struct NamingConventionMatcher;

impl NamingConventionMatcher {
    /// The verb part of a client call: `axios.post` -> `post`.
    fn client_verb(callee: &str) -> Option<&str> {
        let tail = callee.rsplit('.').next().unwrap_or(callee);
        let tail = tail.trim();
        CLIENT_VERBS.contains(&tail).then_some(tail)
    }

    fn is_endpoint_name(name: &str) -> bool {
        let lower = name.to_lowercase();
        ENDPOINT_PREFIXES.iter().any(|p| lower.starts_with(p)) || lower.contains("endpoint")
    }

    /// Resource words from a URL-ish callee: `/api/orders/:id` -> ["orders"].
    fn resource_tokens(callee: &str) -> Vec<String> {
        callee
            .split('/')
            .map(str::trim)
            .filter(|seg| {
                !seg.is_empty()
                    && !seg.starts_with(':')
                    && !seg.starts_with('{')
                    && !seg.eq_ignore_ascii_case("api")
            })
            .map(|seg| seg.to_lowercase())
            .collect()
    }

    /// `orders` should match `create_order`; trim a plural `s` for the
    /// comparison.
    fn token_matches(endpoint_name: &str, token: &str) -> bool {
        let name = endpoint_name.to_lowercase();
        let singular = token.strip_suffix('s').unwrap_or(token);
        name.contains(singular)
    }
}

impl EndpointMatcher for NamingConventionMatcher {
    fn endpoint_pool(&self, index: &NameIndex) -> Vec<SymbolEntry> {
        index.entries_where(|entry| Self::is_endpoint_name(&entry.id.name))
    }

    fn match_call(&self, call: &UnresolvedCall, endpoints: &[SymbolEntry]) -> Vec<SymbolId> {
        let callee = call.site.callee.as_str();

        if callee.contains('/') {
            // Path-style callee: match endpoints sharing a resource word.
            let tokens = Self::resource_tokens(callee);
            return endpoints
                .iter()
                .filter(|e| tokens.iter().any(|t| Self::token_matches(&e.id.name, t)))
                .map(|e| e.id.clone())
                .collect();
        }

        if Self::client_verb(callee).is_some() {
            // Verb-only call gives us nothing to narrow by; link every
            // endpoint candidate.
            return endpoints.iter().map(|e| e.id.clone()).collect();
        }

        Vec::new()
    }
}

/// Annotation-driven strategy: only symbols whose metadata carries an
/// explicit route marker participate, and path-style callees must share a
/// segment with the declared route. Precision over recall.
#[derive(Debug, Default)]
pub struct AnnotationMatcher;

impl AnnotationMatcher {
    fn route_of(entry: &SymbolEntry) -> Option<&str> {
        entry
            .metadata
            .get("route")
            .or_else(|| entry.metadata.get("endpoint"))
            .and_then(MetaValue::as_str)
    }
}

impl EndpointMatcher for AnnotationMatcher {
    fn endpoint_pool(&self, index: &NameIndex) -> Vec<SymbolEntry> {
        index.entries_where(|entry| Self::route_of(entry).is_some())
    }

    fn match_call(&self, call: &UnresolvedCall, endpoints: &[SymbolEntry]) -> Vec<SymbolId> {
        let callee = call.site.callee.as_str();
        if !callee.contains('/') {
            return Vec::new();
        }
        let tokens = NamingConventionMatcher::resource_tokens(callee);

        endpoints
            .iter()
            .filter(|e| {
                Self::route_of(e).is_some_and(|route| {
                    let route_tokens = NamingConventionMatcher::resource_tokens(route);
                    tokens.iter().any(|t| route_tokens.contains(t))
                })
            })
            .map(|e| e.id.clone())
            .collect()
    }
}

/// No-op strategy for deployments that want resolution without stitching.
#[derive(Debug, Default)]
pub struct DisabledMatcher;

impl EndpointMatcher for DisabledMatcher {
    fn endpoint_pool(&self, _index: &NameIndex) -> Vec<SymbolEntry> {
        Vec::new()
    }

    fn match_call(&self, _call: &UnresolvedCall, _endpoints: &[SymbolEntry]) -> Vec<SymbolId> {
        Vec::new()
    }
}
