//! Content-package platform names.
//!
//! Inside a content package, repository names are escaped so they survive on
//! a filesystem: `jcr:content` is stored as `_jcr_content` and characters
//! that are illegal in file names are `%XX`-encoded. These helpers undo that.
use percent_encoding::percent_decode_str;

/// Decode one platform name segment into a repository name.
pub fn repository_name(platform_name: &str) -> String {
    let decoded = percent_decode_str(platform_name)
        .decode_utf8_lossy()
        .into_owned();
    if let Some(rest) = decoded.strip_prefix("__") {
        return format!("_{rest}");
    }
    if let Some(rest) = decoded.strip_prefix('_') {
        if let Some(index) = rest.find('_') {
            let (prefix, local) = (&rest[..index], &rest[index + 1..]);
            if !prefix.is_empty() && !local.is_empty() {
                return format!("{prefix}:{local}");
            }
        }
    }
    decoded
}

/// Decode every `/`-separated segment of a platform path.
pub fn repository_path(platform_path: &str) -> String {
    platform_path
        .split('/')
        .map(repository_name)
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespace_prefix_is_restored() {
        assert_eq!(repository_name("_jcr_content"), "jcr:content");
        assert_eq!(repository_name("_sling_scripting"), "sling:scripting");
    }

    #[test]
    fn plain_and_escaped_underscores() {
        assert_eq!(repository_name("teaser"), "teaser");
        assert_eq!(repository_name("__private"), "_private");
        assert_eq!(repository_name("_trailing_"), "_trailing_");
    }

    #[test]
    fn percent_escapes_are_decoded() {
        assert_eq!(repository_name("a%3ab"), "a:b");
        assert_eq!(repository_name("100%25"), "100%");
        assert_eq!(repository_name("broken%zz"), "broken%zz");
        assert_eq!(repository_name("tail%4"), "tail%4");
        assert_eq!(repository_name("_sling_a%2fb"), "sling:a/b");
        assert_eq!(repository_name("trailing%3a"), "trailing:");
    }

    #[test]
    fn paths_decode_each_segment() {
        assert_eq!(
            repository_path("apps/_sling_folder/GET.html"),
            "apps/sling:folder/GET.html"
        );
    }
}
