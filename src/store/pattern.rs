//! Glob Pattern Module
//!
//! Redis-style glob matching used by `MemoryStore::scan`.
//!
//! Supports `*`, `?`, `[abc]`, `[a-z]`, `[^a]` and `\` escapes.

/// Returns true if `key` matches the glob `pattern`.
pub fn glob_match(pattern: &str, key: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let key: Vec<char> = key.chars().collect();
    match_from(&pattern, &key)
}

fn match_from(pattern: &[char], key: &[char]) -> bool {
    let (mut p, mut k) = (0, 0);
    // Position to resume from after the most recent `*`
    let mut backtrack: Option<(usize, usize)> = None;

    while k < key.len() {
        let step = match pattern.get(p) {
            Some('*') => {
                backtrack = Some((p, k));
                p += 1;
                continue;
            }
            Some('?') => Some(1),
            Some('[') => match_class(&pattern[p..], key[k]),
            Some('\\') if p + 1 < pattern.len() => {
                if pattern[p + 1] == key[k] {
                    Some(2)
                } else {
                    None
                }
            }
            Some(&c) if c == key[k] => Some(1),
            _ => None,
        };

        match step {
            Some(consumed) => {
                p += consumed;
                k += 1;
            }
            None => match backtrack {
                Some((star_p, star_k)) => {
                    backtrack = Some((star_p, star_k + 1));
                    p = star_p + 1;
                    k = star_k + 1;
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}

/// Matches one char against a `[...]` class at the start of `pattern`.
///
/// Returns the class length on a match. An unterminated class matches a
/// literal `[`.
fn match_class(pattern: &[char], c: char) -> Option<usize> {
    let close = match pattern.iter().skip(1).position(|&x| x == ']') {
        Some(offset) => offset + 1,
        None => return if c == '[' { Some(1) } else { None },
    };

    let mut body = &pattern[1..close];
    let negate = body.first() == Some(&'^');
    if negate {
        body = &body[1..];
    }

    let mut found = false;
    let mut i = 0;
    while i < body.len() {
        if body[i] == '\\' && i + 1 < body.len() {
            found |= body[i + 1] == c;
            i += 2;
        } else if i + 2 < body.len() && body[i + 1] == '-' {
            let (lo, hi) = if body[i] <= body[i + 2] {
                (body[i], body[i + 2])
            } else {
                (body[i + 2], body[i])
            };
            found |= lo <= c && c <= hi;
            i += 3;
        } else {
            found |= body[i] == c;
            i += 1;
        }
    }

    if found != negate {
        Some(close + 1)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal() {
        assert!(glob_match("abc", "abc"));
        assert!(!glob_match("abc", "abd"));
        assert!(!glob_match("abc", "abcd"));
    }

    #[test]
    fn test_star() {
        assert!(glob_match("prefix:*", "prefix:1,2:"));
        assert!(glob_match("prefix:*", "prefix:"));
        assert!(!glob_match("prefix:*", "prefixx:1"));
        assert!(glob_match("*", ""));
        assert!(glob_match("a*c*e", "abcde"));
        assert!(!glob_match("a*c*e", "abcdf"));
    }

    #[test]
    fn test_question_mark() {
        assert!(glob_match("h?llo", "hello"));
        assert!(!glob_match("h?llo", "hllo"));
    }

    #[test]
    fn test_classes() {
        assert!(glob_match("h[ae]llo", "hallo"));
        assert!(!glob_match("h[ae]llo", "hillo"));
        assert!(glob_match("h[^e]llo", "hallo"));
        assert!(!glob_match("h[^e]llo", "hello"));
        assert!(glob_match("h[a-b]llo", "hbllo"));
        assert!(!glob_match("h[a-b]llo", "hcllo"));
    }

    #[test]
    fn test_escape() {
        assert!(glob_match("a\\*b", "a*b"));
        assert!(!glob_match("a\\*b", "axb"));
    }

    #[test]
    fn test_escaped_prefix_does_not_overmatch() {
        // A prefix containing ':' is escaped, so its pattern cannot match
        // keys of the shorter prefix and vice versa.
        assert!(!glob_match("p:*", "p%3A1:2:"));
        assert!(glob_match("p%3A1:*", "p%3A1:2:"));
    }
}
