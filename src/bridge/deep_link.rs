use url::Url;

use crate::types::Ticket;

/// Whether `url` targets the auth deep link `prefix` (e.g. `onsikku://auth`).
///
/// The prefix must be followed by the end of the URL or by `/`, `?` or `#`,
/// so `onsikku://authority` does not match `onsikku://auth`.
#[must_use]
pub fn matches_auth_scheme(url: &str, prefix: &str) -> bool {
    url.strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with(['/', '?', '#']))
}

/// Non-empty `ticket` query parameter of a deep link.
#[must_use]
pub fn extract_ticket(url: &str) -> Option<Ticket> {
    let url = Url::parse(url).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == "ticket")
        .map(|(_, value)| value.trim().to_owned())
        .filter(|value| !value.is_empty())
        .map(Ticket)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheme_matching() {
        assert!(matches_auth_scheme("onsikku://auth?ticket=t1", "onsikku://auth"));
        assert!(matches_auth_scheme("onsikku://auth", "onsikku://auth"));
        assert!(matches_auth_scheme("onsikku://auth/callback?ticket=t1", "onsikku://auth"));
        assert!(!matches_auth_scheme("onsikku://authority?ticket=t1", "onsikku://auth"));
        assert!(!matches_auth_scheme("onsikku://invite?code=abc", "onsikku://auth"));
        assert!(!matches_auth_scheme("https://onsikku.xyz/auth?ticket=t1", "onsikku://auth"));
    }

    #[test]
    fn ticket_extraction() {
        assert_eq!(
            extract_ticket("onsikku://auth?ticket=t1"),
            Some(Ticket("t1".into()))
        );
        assert_eq!(
            extract_ticket("onsikku://auth?state=x&ticket=abc%2B%2F%3D"),
            Some(Ticket("abc+/=".into()))
        );
        assert_eq!(extract_ticket("onsikku://auth"), None);
        assert_eq!(extract_ticket("onsikku://auth?ticket="), None);
        assert_eq!(extract_ticket("not a url"), None);
    }
}
