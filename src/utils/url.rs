//! Endpoint URL construction.

/// Strip trailing slashes so endpoints can be appended without doubling them.
///
/// ```
/// use parlance::utils::url::normalize_base_url;
///
/// assert_eq!(normalize_base_url("https://ai.example.com/v1///"), "https://ai.example.com/v1");
/// ```
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim().trim_end_matches('/').to_string()
}

/// Join a base URL and an endpoint path with exactly one slash.
///
/// ```
/// use parlance::utils::url::construct_api_url;
///
/// assert_eq!(
///     construct_api_url("https://ai.example.com/proxy/v1/", "/chat/completions"),
///     "https://ai.example.com/proxy/v1/chat/completions"
/// );
/// ```
pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    format!(
        "{}/{}",
        normalize_base_url(base_url),
        endpoint.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_with_single_slash() {
        for base in [
            "https://ai.example.com/v1",
            "https://ai.example.com/v1/",
            " https://ai.example.com/v1// ",
        ] {
            assert_eq!(
                construct_api_url(base, "models"),
                "https://ai.example.com/v1/models"
            );
        }
    }

    #[test]
    fn nested_endpoints_keep_their_segments() {
        assert_eq!(
            construct_api_url("http://127.0.0.1:8080", "/chat/completions"),
            "http://127.0.0.1:8080/chat/completions"
        );
    }
}
