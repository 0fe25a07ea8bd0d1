//! Robots.txt parser implementation
//!
//! Allow/Disallow matching is delegated to the robotstxt crate, which follows
//! Google's longest-match semantics. Crawl-delay is not covered by that crate
//! and is read from the user-agent groups here.

use robotstxt::DefaultMatcher;

/// Parsed robots.txt data for one host
#[derive(Debug, Clone)]
pub struct ParsedRobots {
    /// Raw robots.txt content (empty string means allow all)
    content: String,
    /// Crawl-delay directives keyed by lowercase user-agent token
    delays: Vec<(String, f64)>,
}

impl ParsedRobots {
    /// Creates a new ParsedRobots from raw robots.txt content
    ///
    /// Unparseable lines are ignored, so garbage content behaves like an
    /// empty rule set.
    pub fn from_content(content: &str) -> Self {
        Self {
            content: content.to_string(),
            delays: parse_crawl_delays(content),
        }
    }

    /// Creates a permissive ParsedRobots that allows everything
    ///
    /// This is used when robots.txt cannot be fetched.
    pub fn allow_all() -> Self {
        Self {
            content: String::new(),
            delays: Vec::new(),
        }
    }

    /// Returns true if this rule set allows every URL
    pub fn is_allow_all(&self) -> bool {
        self.content.trim().is_empty()
    }

    /// Checks if a URL is allowed for the given user agent
    ///
    /// # Arguments
    ///
    /// * `url` - The full URL or path to check (e.g., "/page.html")
    /// * `user_agent` - The user-agent product token (e.g., "SumiSearch")
    ///
    /// # Returns
    ///
    /// * `true` - If the URL is allowed
    /// * `false` - If the URL is disallowed
    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        if self.is_allow_all() {
            return true;
        }

        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, user_agent, url)
    }

    /// Gets the crawl delay for a specific user agent
    ///
    /// A group naming the agent wins over the wildcard group.
    ///
    /// # Returns
    ///
    /// * `Some(f64)` - The crawl delay in seconds
    /// * `None` - If no crawl delay applies
    pub fn crawl_delay(&self, user_agent: &str) -> Option<f64> {
        let agent = user_agent.to_lowercase();

        let specific = self
            .delays
            .iter()
            .find(|(ua, _)| ua != "*" && agent.contains(ua.as_str()))
            .map(|(_, delay)| *delay);

        specific.or_else(|| {
            self.delays
                .iter()
                .find(|(ua, _)| ua == "*")
                .map(|(_, delay)| *delay)
        })
    }
}

/// Collects `Crawl-delay` values for every agent of the group they appear in
fn parse_crawl_delays(content: &str) -> Vec<(String, f64)> {
    let mut delays = Vec::new();
    let mut group_agents: Vec<String> = Vec::new();
    // Consecutive User-agent lines share a group; any rule line closes the header
    let mut in_agent_header = false;

    for line in content.lines() {
        let line = line.split('#').next().unwrap_or("").trim();
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim().to_lowercase();
        let value = value.trim();

        match key.as_str() {
            "user-agent" => {
                if !in_agent_header {
                    group_agents.clear();
                    in_agent_header = true;
                }
                group_agents.push(value.to_lowercase());
            }
            "crawl-delay" => {
                in_agent_header = false;
                if let Ok(delay) = value.parse::<f64>() {
                    if delay.is_finite() && delay >= 0.0 {
                        for agent in &group_agents {
                            if !delays.iter().any(|(ua, _)| ua == agent) {
                                delays.push((agent.clone(), delay));
                            }
                        }
                    }
                }
            }
            _ => in_agent_header = false,
        }
    }

    delays
}
