//! Robots.txt policy evaluation
//!
//! Rule matching is done by the `robotstxt` crate, which follows Google's
//! reference matcher.

use robotstxt::DefaultMatcher;

/// The robots policy of one site
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedRobots {
    /// No usable robots.txt, everything may be followed
    AllowAll,
    /// Access to robots.txt was refused, nothing may be followed
    DisallowAll,
    /// The robots.txt body
    Rules(String),
}

impl ParsedRobots {
    /// Policy of a fetched robots.txt body
    ///
    /// An empty body allows everything.
    pub fn from_content(content: &str) -> Self {
        if content.trim().is_empty() {
            Self::AllowAll
        } else {
            Self::Rules(content.to_string())
        }
    }

    pub fn allow_all() -> Self {
        Self::AllowAll
    }

    pub fn disallow_all() -> Self {
        Self::DisallowAll
    }

    /// Checks if following `url` is allowed for `user_agent`
    ///
    /// # Arguments
    ///
    /// * `url` - The absolute URL to check
    /// * `user_agent` - The robots.txt product token
    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        match self {
            Self::AllowAll => true,
            Self::DisallowAll => false,
            Self::Rules(content) => {
                let mut matcher = DefaultMatcher::default();
                matcher.one_agent_allowed_by_robots(content, user_agent, url)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const AGENT: &str = "SumiCheck";

    #[test]
    fn test_fixed_policies() {
        assert!(ParsedRobots::allow_all().is_allowed("http://x.test/admin", AGENT));
        assert!(!ParsedRobots::disallow_all().is_allowed("http://x.test/", AGENT));
    }

    #[test]
    fn test_empty_body_allows_all() {
        assert_eq!(ParsedRobots::from_content("\n  \n"), ParsedRobots::AllowAll);
    }

    #[test]
    fn test_disallowed_directory() {
        let robots = ParsedRobots::from_content("User-agent: *\nDisallow: /cgi-bin/\n");
        assert!(robots.is_allowed("http://x.test/docs/index.html", AGENT));
        assert!(!robots.is_allowed("http://x.test/cgi-bin/search", AGENT));
    }

    #[test]
    fn test_longest_match_wins() {
        let robots =
            ParsedRobots::from_content("User-agent: *\nDisallow: /docs\nAllow: /docs/public");
        assert!(!robots.is_allowed("http://x.test/docs/internal.html", AGENT));
        assert!(robots.is_allowed("http://x.test/docs/public/a.html", AGENT));
    }

    #[test]
    fn test_agent_specific_group() {
        let robots = ParsedRobots::from_content(
            "User-agent: SumiCheck\nDisallow: /\n\nUser-agent: *\nAllow: /",
        );
        assert!(!robots.is_allowed("http://x.test/page", AGENT));
        assert!(robots.is_allowed("http://x.test/page", "OtherBot"));
    }

    #[test]
    fn test_garbage_allows_all() {
        let robots = ParsedRobots::from_content("<html>not a robots file</html>");
        assert!(robots.is_allowed("http://x.test/any/path", AGENT));
    }
}
