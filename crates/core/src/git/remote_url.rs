//! Host-aware clone URL derivation.
//!
//! Constructs the HTTPS clone URL for a repository from the configured API
//! base URL and the `owner/repo` slug. Used as the fallback when the
//! invocation directory has no readable `origin` remote.

/// Derive the HTTPS clone URL for a repository.
///
/// The base is derived from `api_url`:
/// - `https://api.github.com` → `https://github.com`
/// - `https://<host>/api/v3`  → `https://<host>` (GitHub Enterprise)
/// - anything else            → stripped of its trailing slash, as-is
///
/// The result is `{base}/{repo}.git` where `repo` is in `owner/name`
/// format.
pub fn derive_clone_url(api_url: &str, repo: &str) -> String {
    format!("{}/{}.git", derive_git_base_url(api_url), repo)
}

fn derive_git_base_url(api_url: &str) -> String {
    let url = api_url.trim().trim_end_matches('/');

    if url.eq_ignore_ascii_case("https://api.github.com") {
        return "https://github.com".to_string();
    }

    if let Some(base) = url.strip_suffix("/api/v3") {
        return base.to_string();
    }

    url.to_string()
}
