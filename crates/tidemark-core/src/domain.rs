//! Domain canonicalization shared by query classification and the stores.

/// Canonical domain of a URL or domain string.
///
/// Strips scheme, credentials, leading `www.`, port, path, query and
/// fragment, then lowercases. `None` if nothing is left.
pub fn extract_domain(input: &str) -> Option<String> {
    let lowered = input.trim().to_lowercase();
    let rest = strip_scheme(&lowered);

    let host_and_port = rest.split(['/', '?', '#']).next().unwrap_or_default();
    let host_and_port = host_and_port
        .rsplit_once('@')
        .map_or(host_and_port, |(_, host)| host);
    let host = host_and_port
        .split_once(':')
        .map_or(host_and_port, |(host, _)| host);
    let host = host.trim_end_matches('.');
    let host = host.strip_prefix("www.").unwrap_or(host);

    if host.is_empty() {
        None
    } else {
        Some(host.to_string())
    }
}

/// Whether `url` lives on exactly `domain` (already canonical).
pub fn is_exact_domain(domain: &str, url: &str) -> bool {
    extract_domain(url).is_some_and(|host| host == domain)
}

/// Drop a leading `scheme://`, where the scheme is a letter followed by
/// letters, digits, `+`, `.` or `-`.
fn strip_scheme(input: &str) -> &str {
    let Some((scheme, rest)) = input.split_once("://") else {
        return input;
    };
    let mut chars = scheme.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_lowercase())
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || "+.-".contains(c));
    if valid {
        rest
    } else {
        input
    }
}
