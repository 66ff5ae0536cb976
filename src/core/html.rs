//! Description HTML cleanup and image URL rewriting

use regex::Regex;
use std::sync::LazyLock;

static SCRIPT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script\b.*?</script\s*>").expect("valid script regex"));
static STYLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style\b.*?</style\s*>").expect("valid style regex"));
static BR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?\s*>").expect("valid br regex"));
static RELATIVE_SRC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(?P<attr>\bsrc\s*=\s*["'])(?P<path>/[^/"'][^"']*)"#).expect("valid src regex")
});

/// Turn an image path from the export into a URL Shopify can fetch
///
/// Absolute and protocol-relative URLs pass through. Relative cabinet paths
/// are joined onto `image_base` when one is configured.
pub fn image_url(path: &str, image_base: Option<&str>) -> String {
    let path = path.trim();
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    if let Some(rest) = path.strip_prefix("//") {
        return format!("https://{}", rest);
    }

    match image_base {
        Some(base) if !base.trim().is_empty() => format!(
            "{}/{}",
            base.trim().trim_end_matches('/'),
            path.trim_start_matches('/')
        ),
        _ => path.to_string(),
    }
}

/// Clean a product description for Shopify's `Body (HTML)` column
pub fn clean_description(html: &str, image_base: Option<&str>) -> String {
    let html = SCRIPT_RE.replace_all(html, "");
    let html = STYLE_RE.replace_all(&html, "");
    let html = BR_RE.replace_all(&html, "<br>");

    let html = match image_base {
        Some(base) if !base.trim().is_empty() => RELATIVE_SRC_RE
            .replace_all(&html, |caps: &regex::Captures| {
                format!("{}{}", &caps["attr"], image_url(&caps["path"], Some(base)))
            })
            .into_owned(),
        _ => html.into_owned(),
    };

    html.trim().to_string()
}
