use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
enum HostPattern {
    Any,
    /// `.example.com`: the domain itself and every subdomain.
    Domain(String),
    Exact(String),
}

impl HostPattern {
    fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim().to_ascii_lowercase();
        match raw.as_str() {
            "" => None,
            "*" => Some(Self::Any),
            _ => match raw.strip_prefix('.') {
                Some(domain) if !domain.is_empty() => Some(Self::Domain(domain.to_owned())),
                Some(_) => None,
                None => Some(Self::Exact(raw)),
            },
        }
    }

    fn matches(&self, host: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(expected) => expected == host,
            Self::Domain(domain) => {
                host == domain
                    || host
                        .strip_suffix(domain.as_str())
                        .is_some_and(|prefix| prefix.ends_with('.'))
            }
        }
    }
}

/// The set of `Host` header values the server answers to.
///
/// ```rust
/// # use quill_kernel::security::AllowedHosts;
/// let hosts = AllowedHosts::new(["quill.onrender.com", ".example.com"]);
/// assert!(hosts.is_allowed("quill.onrender.com:443"));
/// assert!(hosts.is_allowed("blog.example.com"));
/// assert!(!hosts.is_allowed("evil.com"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowedHosts {
    patterns: Vec<HostPattern>,
}

impl AllowedHosts {
    /// Blank and malformed entries are skipped.
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self { patterns: patterns.into_iter().filter_map(|p| HostPattern::parse(p.as_ref())).collect() }
    }

    /// Checks a raw `Host` header value; the port, if any, is ignored.
    #[must_use]
    pub fn is_allowed(&self, host_header: &str) -> bool {
        let Some(host) = normalize_host(host_header) else {
            return false;
        };
        self.patterns.iter().any(|pattern| pattern.matches(&host))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl fmt::Display for AllowedHosts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for pattern in &self.patterns {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            match pattern {
                HostPattern::Any => f.write_str("*")?,
                HostPattern::Domain(domain) => write!(f, ".{domain}")?,
                HostPattern::Exact(host) => f.write_str(host)?,
            }
        }
        Ok(())
    }
}

/// Lowercases and strips the port; `None` for an empty or malformed value.
fn normalize_host(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let host = if let Some(rest) = raw.strip_prefix('[') {
        // [::1]:8000
        let end = rest.find(']')?;
        &raw[..end + 2]
    } else {
        match raw.rsplit_once(':') {
            Some((host, port)) if port.chars().all(|c| c.is_ascii_digit()) => host,
            Some(_) => return None,
            None => raw,
        }
    };
    let host = host.trim_end_matches('.');
    if host.is_empty() { None } else { Some(host.to_ascii_lowercase()) }
}
