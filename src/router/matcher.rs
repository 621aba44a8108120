//! Token matching between route patterns and request paths.
//!
//! Patterns and request paths are split by the same rule, so a pattern token
//! at index `i` lines up with the request token at `offset + i`. Matching binds
//! parameters into the request as it walks and does not roll them back when a
//! later token fails.

use crate::http::{split_path, Request};

/// The parameter name a trailing catch-all binds.
pub const CATCH_ALL: &str = "*";

const CATCH_ALL_TOKEN: &str = ":*";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Param(String),
}

impl Segment {
    fn parse(token: &str) -> Segment {
        match token.strip_prefix(':') {
            Some(name) => Segment::Param(name.to_string()),
            None => Segment::Literal(token.to_string()),
        }
    }
}

/// A route path split into tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    raw: String,
    segments: Vec<Segment>,
    catch_all: bool,
}

impl Pattern {
    /// Splits `path` into tokens. Blank segments are kept, so `""` and `"/"`
    /// both produce a single empty literal.
    pub fn parse(path: &str) -> Pattern {
        let tokens: Vec<&str> = split_path(path).collect();
        let catch_all = tokens.last() == Some(&CATCH_ALL_TOKEN);
        Pattern {
            raw: path.to_string(),
            segments: tokens.into_iter().map(Segment::parse).collect(),
            catch_all,
        }
    }

    /// A pattern with no tokens at all; it consumes nothing.
    pub fn empty() -> Pattern {
        Pattern {
            raw: String::new(),
            segments: Vec::new(),
            catch_all: false,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// True when the final token is `:*`.
    pub fn has_catch_all(&self) -> bool {
        self.catch_all
    }
}

/// Matches the first `count` tokens of `pattern` against the request tokens
/// starting at `start`.
///
/// Fails when fewer than `count` tokens remain; with `strict`, also fails
/// unless exactly `count` remain.
pub fn match_range(
    req: &mut Request,
    start: usize,
    pattern: &Pattern,
    count: usize,
    strict: bool,
) -> bool {
    if count == 0 {
        return true;
    }
    let remaining = req.tokens.len().saturating_sub(start);
    if remaining < count || (strict && remaining != count) {
        return false;
    }

    let tokens = &req.tokens[start..start + count];
    let params = &mut req.params;
    for (segment, token) in pattern.segments.iter().take(count).zip(tokens) {
        match segment {
            Segment::Param(name) => {
                params.insert(name.clone(), token.clone());
            }
            Segment::Literal(literal) => {
                if literal != token {
                    return false;
                }
            }
        }
    }
    true
}

/// Matches a whole pattern from `start` to the end of the request path.
///
/// A trailing `:*` swallows every remaining token, joined with `/`, into the
/// `*` parameter; it binds `""` when nothing is left. Without a catch-all the
/// pattern must consume exactly the remaining tokens.
pub fn match_with_catchall(start: usize, pattern: &Pattern, req: &mut Request) -> bool {
    if !pattern.has_catch_all() {
        return match_range(req, start, pattern, pattern.len(), true);
    }

    let prefix = pattern.len() - 1;
    if !match_range(req, start, pattern, prefix, false) {
        return false;
    }
    // match_range only checks the length when the prefix is non-empty.
    let from = (start + prefix).min(req.tokens.len());
    let rest = req.tokens[from..].join("/");
    req.params.insert(CATCH_ALL.to_string(), rest);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(pattern: &str, path: &str) -> Option<Request> {
        let mut req = Request::get(path);
        match_with_catchall(0, &Pattern::parse(pattern), &mut req).then_some(req)
    }

    #[test]
    fn parse_classifies_tokens() {
        let pattern = Pattern::parse("/users/:id/:*");
        assert_eq!(
            pattern.segments(),
            &[
                Segment::Literal("users".into()),
                Segment::Param("id".into()),
                Segment::Param("*".into()),
            ]
        );
        assert!(pattern.has_catch_all());
        assert_eq!(pattern.as_str(), "/users/:id/:*");
    }

    #[test]
    fn blank_patterns_keep_their_slot() {
        assert_eq!(Pattern::parse("").segments(), &[Segment::Literal(String::new())]);
        assert_eq!(Pattern::parse("a//b").len(), 3);
        assert!(Pattern::empty().is_empty());
    }

    #[test]
    fn catch_all_only_counts_at_the_end() {
        let pattern = Pattern::parse(":*/tail");
        assert!(!pattern.has_catch_all());

        let req = matches(":*/tail", "anything/tail").unwrap();
        assert_eq!(req.param("*").unwrap(), "anything");
        assert!(matches(":*/tail", "a/b/tail").is_none());
    }

    #[test]
    fn length_mismatch_fails_without_catch_all() {
        assert!(matches("a/b", "a").is_none());
        assert!(matches("a/b", "a/b/c").is_none());
        assert!(matches(":x/:y", "1/2/3").is_none());
        assert!(matches(":x/:y", "1/2").is_some());
    }

    #[test]
    fn params_bind_positionally() {
        let req = matches("list/:id", "list/42").unwrap();
        assert_eq!(req.param("id").unwrap(), "42");
        assert!(matches("list/:id", "list").is_none());
    }

    #[test]
    fn literals_are_case_sensitive() {
        assert!(matches("About", "about").is_none());
        assert!(matches("About", "About").is_some());
    }

    #[test]
    fn catch_all_binds_remainder() {
        let req = matches("a/:*", "a/b/c").unwrap();
        assert_eq!(req.param(CATCH_ALL).unwrap(), "b/c");

        let req = matches("a/:*", "a").unwrap();
        assert_eq!(req.param(CATCH_ALL).unwrap(), "");

        assert!(matches("a/:*", "b/c").is_none());
    }

    #[test]
    fn bare_catch_all_takes_everything() {
        let req = matches(":*", "x/y/z").unwrap();
        assert_eq!(req.param(CATCH_ALL).unwrap(), "x/y/z");

        let req = matches(":*", "/").unwrap();
        assert_eq!(req.param(CATCH_ALL).unwrap(), "");
    }

    #[test]
    fn root_pattern_matches_root_path() {
        assert!(matches("", "/").is_some());
        assert!(matches("/", "").is_some());
        assert!(matches("", "/a").is_none());
    }

    #[test]
    fn prefix_match_consumes_from_offset() {
        let mut req = Request::get("/api/v1/users/7");
        let group = Pattern::parse("api/:version");
        assert!(match_range(&mut req, 0, &group, group.len(), false));
        assert_eq!(req.param("version").unwrap(), "v1");

        let leaf = Pattern::parse("users/:id");
        assert!(match_with_catchall(2, &leaf, &mut req));
        assert_eq!(req.param("id").unwrap(), "7");

        assert!(!match_range(&mut req, 0, &group, group.len(), true));
    }

    #[test]
    fn zero_count_always_matches() {
        let mut req = Request::get("/a");
        assert!(match_range(&mut req, 10, &Pattern::empty(), 0, true));
    }

    #[test]
    fn failed_matches_keep_earlier_bindings() {
        let mut req = Request::get("/7/nope");
        assert!(!match_with_catchall(0, &Pattern::parse(":id/yes"), &mut req));
        assert_eq!(req.param("id").unwrap(), "7");
    }

    #[test]
    fn offset_past_end_fails() {
        let mut req = Request::get("/a");
        assert!(!match_range(&mut req, 5, &Pattern::parse("a"), 1, false));
    }
}
