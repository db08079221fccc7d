use mc_domain::Error;

/// Map a reqwest error onto the domain error type, preserving the
/// timeout category.
pub(crate) fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Http(e.to_string())
    }
}

/// Extract the host from an HTTP(S) base URL, dropping any port or path.
pub(crate) fn host_of(base_url: &str) -> Option<String> {
    let rest = base_url
        .strip_prefix("https://")
        .or_else(|| base_url.strip_prefix("http://"))?;
    let host = rest.split(['/', ':']).next()?.trim();
    if host.is_empty() {
        None
    } else {
        Some(host.to_ascii_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_extraction() {
        assert_eq!(host_of("https://api.openai.com"), Some("api.openai.com".into()));
        assert_eq!(host_of("https://api.openai.com/v1"), Some("api.openai.com".into()));
        assert_eq!(host_of("http://localhost:11434/v1"), Some("localhost".into()));
        assert_eq!(host_of("ftp://x"), None);
        assert_eq!(host_of(""), None);
    }
}
