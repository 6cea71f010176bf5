//! Path Parser: parses the text inside a placeholder's braces into a list
//! of dotted/bracketed segments.
//!
//! Hand-written recursive-descent rather than built on a parser-combinator
//! crate: the grammar is small enough that a combinator library would be
//! more ceremony than the problem needs.

use crate::resolve::error::ExpressionSyntaxError;

/// `path := segment (('.' segment) | ('[' segment ']'))*`
/// `segment := any run of characters other than '.', '[', ']'`
pub fn parse_path(input: &str) -> Result<Vec<String>, ExpressionSyntaxError> {
    let chars: Vec<char> = input.chars().collect();
    let n = chars.len();
    let mut i = 0usize;
    let mut segments = Vec::new();

    segments.push(read_segment(input, &chars, &mut i)?);
    while i < n {
        match chars[i] {
            '.' => {
                i += 1;
                segments.push(read_segment(input, &chars, &mut i)?);
            }
            '[' => {
                i += 1;
                let seg = read_segment(input, &chars, &mut i)?;
                if i >= n || chars[i] != ']' {
                    return Err(ExpressionSyntaxError {
                        text: input.to_string(),
                        offset: i,
                        found: chars.get(i).copied(),
                    });
                }
                i += 1;
                segments.push(seg);
            }
            other => {
                return Err(ExpressionSyntaxError {
                    text: input.to_string(),
                    offset: i,
                    found: Some(other),
                });
            }
        }
    }
    Ok(segments)
}

fn read_segment(
    input: &str,
    chars: &[char],
    i: &mut usize,
) -> Result<String, ExpressionSyntaxError> {
    let start = *i;
    while *i < chars.len() && !matches!(chars[*i], '.' | '[' | ']') {
        *i += 1;
    }
    if *i == start {
        return Err(ExpressionSyntaxError {
            text: input.to_string(),
            offset: start,
            found: chars.get(start).copied(),
        });
    }
    Ok(chars[start..*i].iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_dotted_path() {
        assert_eq!(
            parse_path("models.foo.bar").unwrap(),
            vec!["models", "foo", "bar"]
        );
    }

    #[test]
    fn brackets_and_dots_interchangeably() {
        assert_eq!(
            parse_path("models.foo.bar[0].baz").unwrap(),
            vec!["models", "foo", "bar", "0", "baz"]
        );
    }

    #[test]
    fn bracket_only_key_with_digits() {
        assert_eq!(parse_path("a[12]").unwrap(), vec!["a", "12"]);
    }

    #[test]
    fn unterminated_bracket_reports_offset() {
        let err = parse_path("a[0").unwrap_err();
        assert_eq!(err.offset, 3);
        assert_eq!(err.found, None);
    }

    #[test]
    fn stray_bracket_close_reports_char() {
        let err = parse_path("a]b").unwrap_err();
        assert_eq!(err.offset, 1);
        assert_eq!(err.found, Some(']'));
    }

    #[test]
    fn empty_segment_is_rejected() {
        let err = parse_path(".a").unwrap_err();
        assert_eq!(err.offset, 0);
        assert_eq!(err.found, Some('.'));
    }

    #[test]
    fn diagnostic_points_at_offset() {
        let err = parse_path("a]b").unwrap_err();
        let rendered = err.to_string();
        assert!(rendered.starts_with("${a]b}\n"));
        assert!(rendered.contains("^"));
    }
}
