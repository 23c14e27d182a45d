//! URL helper functions

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::config::SiteConfig;

/// Generate a URL with the root path
///
/// # Examples
/// ```ignore
/// url_for(&config, "/post/hello") // -> "/blog/post/hello"
/// ```
pub fn url_for(config: &SiteConfig, path: &str) -> String {
    let root = config.root.trim_end_matches('/');
    let path = path.trim_start_matches('/');

    if path.is_empty() {
        format!("{}/", root)
    } else {
        format!("{}/{}", root, path)
    }
}

/// Characters escaped in a path segment: everything but unreserved ones
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// URL of a post page
pub fn post_url(config: &SiteConfig, uid: &str) -> String {
    url_for(
        config,
        &format!("post/{}", utf8_percent_encode(uid, SEGMENT)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(root: &str) -> SiteConfig {
        SiteConfig {
            root: root.to_string(),
            ..SiteConfig::default()
        }
    }

    #[test]
    fn test_url_for() {
        assert_eq!(url_for(&test_config("/"), "/"), "/");
        assert_eq!(url_for(&test_config("/blog/"), "views/3"), "/blog/views/3");
    }

    #[test]
    fn test_post_url() {
        let config = test_config("/");
        assert_eq!(post_url(&config, "como-utilizar-hooks"), "/post/como-utilizar-hooks");
        assert_eq!(post_url(&config, "a b/c"), "/post/a%20b%2Fc");
        assert_eq!(post_url(&config, "v1.2_x~y"), "/post/v1.2_x~y");
        assert_eq!(post_url(&config, "ação"), "/post/a%C3%A7%C3%A3o");
    }
}
