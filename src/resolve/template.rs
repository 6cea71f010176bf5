//! Template Scanner: finds `${...}`/`${{...}}` placeholders in a string
//! without a regex dependency.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderMatch {
    /// Byte offset of the leading `$`.
    pub start: usize,
    /// Byte offset just past the closing brace(s).
    pub end: usize,
    /// Raw text between the braces, unparsed.
    pub inner: String,
}

/// All placeholders in `s`, in order. A `$` preceded by a single backslash
/// is treated as escaped and never starts a match; nested placeholders
/// are not supported, so a match is closed at the first unbalanced
/// `}`/`}}`.
pub fn get_matches(s: &str) -> Vec<PlaceholderMatch> {
    let mut out = Vec::new();
    let bytes = s.as_bytes();
    let mut i = 0usize;

    while let Some(rel) = s[i..].find('$') {
        let pos = i + rel;
        let escaped = pos > 0 && bytes[pos - 1] == b'\\';
        if escaped {
            i = pos + 1;
            continue;
        }

        let rest = &s[pos + 1..];
        if let Some(after_double) = rest.strip_prefix("{{") {
            if let Some(close_rel) = after_double.find("}}") {
                let inner = after_double[..close_rel].to_string();
                let end = pos + 1 + 2 + close_rel + 2;
                out.push(PlaceholderMatch { start: pos, end, inner });
                i = end;
                continue;
            }
        } else if let Some(after_single) = rest.strip_prefix('{') {
            if let Some(close_rel) = after_single.find('}') {
                let inner = after_single[..close_rel].to_string();
                let end = pos + 1 + 1 + close_rel + 1;
                out.push(PlaceholderMatch { start: pos, end, inner });
                i = end;
                continue;
            }
        }
        i = pos + 1;
    }
    out
}

pub fn is_interpolated(s: &str) -> bool {
    !get_matches(s).is_empty()
}

/// True iff there is exactly one match and it spans the entire string.
pub fn is_exact_single(s: &str, matches: &[PlaceholderMatch]) -> bool {
    matches.len() == 1 && matches[0].start == 0 && matches[0].end == s.len()
}

/// Undo the `\${` → `${` escape once placeholder substitution is complete.
pub fn unescape(s: &str) -> String {
    s.replace("\\${", "${")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_single_brace_placeholder() {
        let m = get_matches("hello ${foo.bar} world");
        assert_eq!(m.len(), 1);
        assert_eq!(m[0].inner, "foo.bar");
        assert_eq!(&"hello ${foo.bar} world"[m[0].start..m[0].end], "${foo.bar}");
    }

    #[test]
    fn finds_double_brace_placeholder() {
        let m = get_matches("${{foo}}");
        assert_eq!(m.len(), 1);
        assert_eq!(m[0].inner, "foo");
    }

    #[test]
    fn escaped_dollar_is_not_a_match() {
        assert!(get_matches("\\${foo}").is_empty());
    }

    #[test]
    fn exact_single_requires_whole_string_span() {
        let s = "${foo}";
        assert!(is_exact_single(s, &get_matches(s)));
        let s2 = "x${foo}";
        assert!(!is_exact_single(s2, &get_matches(s2)));
    }

    #[test]
    fn multiple_matches_in_order() {
        let m = get_matches("${a} and ${b}");
        assert_eq!(m.iter().map(|x| x.inner.as_str()).collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn unescape_strips_backslash_before_placeholder_brace() {
        assert_eq!(unescape("\\${x}"), "${x}");
    }
}
