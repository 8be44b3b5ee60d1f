use std::collections::{HashMap, HashSet};

use anyhow::{bail, Result};

/// Static host tables, built once at startup and never mutated.
///
/// Aliases let several public hostnames share one link namespace (the
/// canonical domain). Writability is keyed on the raw request host, so an
/// alias can stay read-only while the host it points at accepts writes.
#[derive(Debug, Clone, Default)]
pub struct Domains {
    aliases: HashMap<String, String>,
    writable: HashSet<String>,
}

impl Domains {
    pub fn new(aliases: HashMap<String, String>, writable: HashSet<String>) -> Self {
        Self { aliases, writable }
    }

    /// Parse `DOMAIN_ALIASES` (`host=canonical,...`) and
    /// `WRITABLE_DOMAINS` (`host,...`). Entries are lower-cased to match the
    /// lower-cased request host.
    pub fn parse(aliases: &str, writable: &str) -> Result<Self> {
        Ok(Self::new(parse_aliases(aliases)?, parse_writable(writable)))
    }

    /// The storage partition for `host`: its alias target, or `host` itself.
    pub fn canonical<'a>(&'a self, host: &'a str) -> &'a str {
        self.aliases.get(host).map(String::as_str).unwrap_or(host)
    }

    pub fn is_writable(&self, host: &str) -> bool {
        self.writable.contains(host)
    }
}

/// Split `foo.sh.example` into `("foo", "sh.example")`.
pub fn split_subdomain(host: &str) -> Option<(&str, &str)> {
    host.split_once('.')
        .filter(|(label, parent)| !label.is_empty() && !parent.is_empty())
}

fn entries(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn parse_aliases(raw: &str) -> Result<HashMap<String, String>> {
    let mut aliases = HashMap::new();
    for pair in entries(raw) {
        let Some((host, canonical)) = pair.split_once('=') else {
            bail!("invalid domain alias: {pair}");
        };
        aliases.insert(
            host.trim().to_ascii_lowercase(),
            canonical.trim().to_ascii_lowercase(),
        );
    }
    Ok(aliases)
}

fn parse_writable(raw: &str) -> HashSet<String> {
    entries(raw).map(str::to_ascii_lowercase).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Domains {
        Domains::parse("s.example=sh.example, t.example=sh.example", "sh.example").unwrap()
    }

    #[test]
    fn alias_maps_to_canonical() {
        let d = sample();
        assert_eq!(d.canonical("s.example"), "sh.example");
        assert_eq!(d.canonical("t.example"), "sh.example");
    }

    #[test]
    fn unknown_host_is_its_own_domain() {
        assert_eq!(sample().canonical("other.example"), "other.example");
    }

    #[test]
    fn canonical_is_idempotent_for_canonical_values() {
        let d = sample();
        for host in ["sh.example", "other.example", "s.example"] {
            let once = d.canonical(host);
            assert_eq!(d.canonical(once), once);
        }
    }

    #[test]
    fn writability_uses_the_raw_host() {
        let d = sample();
        assert!(d.is_writable("sh.example"));
        assert!(!d.is_writable("s.example"));
    }

    #[test]
    fn empty_config_is_valid() {
        let d = Domains::parse("", "").unwrap();
        assert_eq!(d.canonical("a.example"), "a.example");
        assert!(!d.is_writable("a.example"));
    }

    #[test]
    fn alias_without_equals_is_rejected() {
        let err = Domains::parse("broken.example", "").unwrap_err();
        assert!(err.to_string().contains("broken.example"));
    }

    #[test]
    fn config_entries_match_lower_cased_hosts() {
        let d = Domains::parse("S.Example=Sh.Example", "Sh.Example").unwrap();
        assert_eq!(d.canonical("s.example"), "sh.example");
        assert!(d.is_writable("sh.example"));

        let site = crate::request::Site::resolve(&d, "Sh.Example");
        assert!(site.writable);
        assert_eq!(site.domain, "sh.example");
    }

    #[test]
    fn subdomain_split() {
        assert_eq!(split_subdomain("foo.sh.example"), Some(("foo", "sh.example")));
        assert_eq!(split_subdomain("localhost"), None);
        assert_eq!(split_subdomain(".example"), None);
    }
}
