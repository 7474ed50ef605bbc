use reqwest::Url;

/// Joins a path onto a base URL with exactly one slash between them, so that
/// a base URL path is extended rather than replaced.
///
/// # Panics
///
/// Panics if the joined string is not a valid URL, which cannot happen for a
/// valid base URL.
pub fn join(url: &Url, path: &str) -> Url {
    let base = url.as_str().trim_end_matches('/');
    let path = path.trim_start_matches('/');
    Url::parse(&format!("{base}/{path}")).expect("joined URL is valid")
}
