/// Domain scope of a crawl job
///
/// A scope is a list of domain patterns. An empty scope places every domain
/// in scope. Patterns are either exact (`example.com`) or wildcards
/// (`*.example.com`), where a wildcard also covers the bare base domain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainScope {
    patterns: Vec<String>,
}

impl DomainScope {
    /// Creates a scope from domain patterns; patterns are compared lowercase
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            patterns: patterns
                .into_iter()
                .map(|p| p.as_ref().trim().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    /// Returns true if the scope places no restriction on domains
    pub fn is_unrestricted(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Checks whether a domain is inside this scope
    ///
    /// # Examples
    ///
    /// ```
    /// use sumi_search::url::DomainScope;
    ///
    /// let scope = DomainScope::new(["*.example.com"]);
    /// assert!(scope.allows("example.com"));
    /// assert!(scope.allows("Blog.Example.com"));
    /// assert!(!scope.allows("example.org"));
    /// ```
    pub fn allows(&self, domain: &str) -> bool {
        if self.patterns.is_empty() {
            return true;
        }
        let domain = domain.to_lowercase();
        self.patterns.iter().any(|p| matches_wildcard(p, &domain))
    }
}

/// Checks if a domain matches a wildcard pattern
pub fn matches_wildcard(pattern: &str, candidate: &str) -> bool {
    if let Some(base) = pattern.strip_prefix("*.") {
        candidate == base || candidate.ends_with(&format!(".{}", base))
    } else {
        candidate == pattern
    }
}
