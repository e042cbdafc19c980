//! Resolve raw candidate strings into migratable repositories.
//!
//! Candidates are deduplicated byte-for-byte, filtered against the
//! repository-URL grammar, then grouped by their derived repository name.
//! A name backed by exactly one URL is eligible for migration; a name backed
//! by several URLs is ambiguous and the whole group is skipped.
use std::collections::{BTreeMap, HashSet};

/// Result of resolving a batch of candidate URLs.
#[derive(Debug, Default)]
pub(crate) struct Resolution {
    /// Uniquely-named repositories, name to URL.
    pub eligible: BTreeMap<String, String>,

    /// Name-colliding repositories, name to every URL claiming that name.
    pub duplicates: BTreeMap<String, Vec<String>>,
}

/// Check if a character is allowed in the path part of a repository URL.
fn is_path_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '@' | ':' | '/' | '-' | '~')
}

/// Check if a character is allowed in the user or host of an ssh login.
fn is_login_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.')
}

/// Check if a string is an ssh login of the form `user@host`.
fn is_ssh_login(s: &str) -> bool {
    match s.split_once('@') {
        Some((user, host)) => {
            !user.is_empty()
                && !host.is_empty()
                && user.chars().all(is_login_char)
                && host.chars().all(is_login_char)
        }
        None => false,
    }
}

/// Check if a candidate string fully matches the repository-URL grammar.
///
/// The grammar is `scheme ":" ["//"] path ".git" ["/"]` where `scheme` is one
/// of `git`, `ssh`, `http`, `https` or an ssh login (`user@host`). Anything
/// before or after the match makes the whole string invalid.
pub(crate) fn validate(candidate: &str) -> bool {
    let trimmed = candidate.strip_suffix('/').unwrap_or(candidate);
    let Some(stem) = trimmed.strip_suffix(".git") else {
        return false;
    };
    let Some((scheme, path)) = stem.split_once(':') else {
        return false;
    };
    if !matches!(scheme, "git" | "ssh" | "http" | "https") && !is_ssh_login(scheme) {
        return false;
    }
    let path = path.strip_prefix("//").unwrap_or(path);
    if path.is_empty() || !path.chars().all(is_path_char) {
        return false;
    }
    // The final path segment is the repository name; an empty one would
    // leave nothing to derive a name from.
    path.rsplit(['/', ':'])
        .next()
        .is_some_and(|name| !name.is_empty())
}

/// Derive the repository name from a validated URL.
///
/// The name is the final path segment preceding `.git`, with any trailing
/// slash stripped. Returns `None` when the URL carries no such segment, which
/// cannot happen for URLs accepted by [`validate`].
pub(crate) fn extract_name(url: &str) -> Option<&str> {
    let trimmed = url.strip_suffix('/').unwrap_or(url);
    let stem = trimmed.strip_suffix(".git")?;
    let name = stem.rsplit(['/', ':']).next()?;
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

/// Resolve raw candidates into eligible repositories and duplicate groups.
pub(crate) fn resolve<I>(candidates: I) -> Resolution
where
    I: IntoIterator<Item = String>,
{
    let unique: HashSet<String> = candidates.into_iter().collect();
    let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for url in unique {
        if !validate(&url) {
            log::debug!("Ignoring invalid URL '{url}'");
            continue;
        }
        let Some(name) = extract_name(&url) else {
            log::debug!("Ignoring URL without a repository name '{url}'");
            continue;
        };
        groups.entry(name.to_string()).or_default().push(url);
    }
    let mut resolution = Resolution::default();
    for (name, mut urls) in groups {
        if let [url] = urls.as_mut_slice() {
            resolution.eligible.insert(name, std::mem::take(url));
        } else {
            urls.sort();
            resolution.duplicates.insert(name, urls);
        }
    }
    resolution
}
