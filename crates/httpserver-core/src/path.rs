//! Path tokenization and size-bounded string helpers

/// Split a URL path on `/`, dropping empty segments.
///
/// `"/a//b/"` yields `["a", "b"]`.
pub fn tokenize_path(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|piece| !piece.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Largest char boundary of `s` that is `<= limit`.
pub(crate) fn floor_char_boundary(s: &str, limit: usize) -> usize {
    if limit >= s.len() {
        return s.len();
    }

    let mut end = limit;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    end
}

/// Truncate `s` in place to at most `limit` bytes, on a char boundary.
///
/// Returns `true` if anything was cut.
pub(crate) fn truncate_to(s: &mut String, limit: usize) -> bool {
    if s.len() <= limit {
        return false;
    }

    let end = floor_char_boundary(s, limit);
    s.truncate(end);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_tokenize_path() {
        assert_eq!(tokenize_path("/a/b/c"), vec!["a", "b", "c"]);
        assert_eq!(tokenize_path("a/b/"), vec!["a", "b"]);
        assert_eq!(tokenize_path("//x///y"), vec!["x", "y"]);
        assert!(tokenize_path("/").is_empty());
        assert!(tokenize_path("").is_empty());
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let mut s = "héllo".to_string();
        // 'é' occupies bytes 1..3
        assert!(truncate_to(&mut s, 2));
        assert_eq!(s, "h");

        let mut s = "abc".to_string();
        assert!(!truncate_to(&mut s, 3));
        assert_eq!(s, "abc");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn prop_tokenized_pieces_rejoin_to_path(
            pieces in proptest::collection::vec("[a-z0-9]{1,8}", 0..6),
            leading in any::<bool>(),
            trailing in any::<bool>(),
        ) {
            let mut path = pieces.join("/");
            if leading {
                path.insert(0, '/');
            }
            if trailing {
                path.push('/');
            }

            prop_assert_eq!(tokenize_path(&path), pieces);
        }

        #[test]
        fn prop_truncate_never_exceeds_limit(s in "\\PC{0,32}", limit in 0usize..64) {
            let mut t = s.clone();
            truncate_to(&mut t, limit);

            prop_assert!(t.len() <= limit);
            prop_assert!(s.starts_with(&t));
        }
    }
}
