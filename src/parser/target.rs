//! Request-target helpers.

/// Split a request target into path and query string.
///
/// The query is returned without its leading `?` and is empty when absent.
pub(crate) fn split_target(target: &str) -> (&str, &str) {
    target.split_once('?').unwrap_or((target, ""))
}

#[cfg(test)]
mod tests {
    use super::split_target;

    #[test]
    fn test_split_target() {
        assert_eq!(split_target("/index.html"), ("/index.html", ""));
        assert_eq!(split_target("/search?q=test&page=1"), ("/search", "q=test&page=1"));
        assert_eq!(split_target("/search?"), ("/search", ""));
        assert_eq!(split_target("/a?b?c"), ("/a", "b?c"));
        assert_eq!(split_target("*"), ("*", ""));
    }
}
