//! Minimal robots.txt support: `User-agent`, `Allow`, and `Disallow` lines.
//!
//! The group naming our agent wins over the `*` group. Within a group the
//! longest matching rule decides; on a tie `Allow` wins. `*` inside a rule
//! matches any run of characters and a trailing `$` anchors the end.

/// Rules from the robots.txt group that applies to one agent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RobotsRules {
    rules: Vec<Rule>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Rule {
    allow: bool,
    pattern: String,
}

#[derive(Debug, Default)]
struct Group {
    agents: Vec<String>,
    rules: Vec<Rule>,
}

impl RobotsRules {
    /// Rules that allow everything (missing or unreadable robots.txt).
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Parse a robots.txt body, keeping the group for `agent_token`.
    pub fn parse(content: &str, agent_token: &str) -> Self {
        let token = agent_token.to_ascii_lowercase();
        let mut groups: Vec<Group> = Vec::new();
        let mut collecting_agents = false;

        for line in content.lines() {
            let line = line.split('#').next().unwrap_or_default().trim();
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim().to_ascii_lowercase();
            let value = value.trim();

            match key.as_str() {
                "user-agent" => {
                    if !collecting_agents || groups.is_empty() {
                        groups.push(Group::default());
                    }
                    if let Some(group) = groups.last_mut() {
                        group.agents.push(value.to_ascii_lowercase());
                    }
                    collecting_agents = true;
                }
                "allow" | "disallow" => {
                    collecting_agents = false;
                    // Empty Disallow means "allow everything".
                    if value.is_empty() {
                        continue;
                    }
                    if let Some(group) = groups.last_mut() {
                        group.rules.push(Rule {
                            allow: key == "allow",
                            pattern: value.to_string(),
                        });
                    }
                }
                _ => collecting_agents = false,
            }
        }

        let names_us = |a: &String| !a.is_empty() && a != "*" && token.contains(a.as_str());
        let named = groups.iter().position(|g| g.agents.iter().any(names_us));
        let wildcard = groups.iter().position(|g| g.agents.iter().any(|a| a == "*"));

        match named.or(wildcard) {
            Some(idx) => Self {
                rules: std::mem::take(&mut groups[idx].rules),
            },
            None => Self::allow_all(),
        }
    }

    /// Whether `path` (path plus optional query) may be fetched.
    pub fn is_allowed(&self, path: &str) -> bool {
        let best = self
            .rules
            .iter()
            .filter(|r| pattern_matches(&r.pattern, path))
            .max_by(|a, b| {
                a.pattern
                    .len()
                    .cmp(&b.pattern.len())
                    .then(a.allow.cmp(&b.allow))
            });

        best.is_none_or(|r| r.allow)
    }
}

fn pattern_matches(pattern: &str, path: &str) -> bool {
    let (pattern, anchored) = match pattern.strip_suffix('$') {
        Some(p) => (p, true),
        None => (pattern, false),
    };

    let mut parts = pattern.split('*');
    let Some(first) = parts.next() else {
        return true;
    };
    let Some(mut rest) = path.strip_prefix(first) else {
        return false;
    };

    let pieces: Vec<&str> = parts.collect();
    for (i, piece) in pieces.iter().enumerate() {
        let is_last = i + 1 == pieces.len();
        if anchored && is_last {
            return rest.ends_with(piece);
        }
        match rest.find(piece) {
            Some(pos) => rest = &rest[pos + piece.len()..],
            None => return false,
        }
    }

    !anchored || rest.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROBOTS: &str = "\
# example
User-agent: *
Disallow: /private/
Allow: /private/press/
Disallow: /*.pdf$

User-agent: BadBot
Disallow: /
";

    #[test]
    fn wildcard_group_applies_to_us() {
        let rules = RobotsRules::parse(ROBOTS, "leadenrich");
        assert!(rules.is_allowed("/"));
        assert!(rules.is_allowed("/about"));
        assert!(!rules.is_allowed("/private/team"));
        assert!(rules.is_allowed("/private/press/2024"));
    }

    #[test]
    fn wildcard_and_anchor_patterns() {
        let rules = RobotsRules::parse(ROBOTS, "leadenrich");
        assert!(!rules.is_allowed("/docs/report.pdf"));
        assert!(rules.is_allowed("/docs/report.pdf.html"));
    }

    #[test]
    fn named_group_beats_wildcard() {
        let robots = "User-agent: *\nDisallow:\n\nUser-agent: LeadEnrich\nDisallow: /\n";
        let rules = RobotsRules::parse(robots, "LeadEnrich");
        assert!(!rules.is_allowed("/"));

        let other = RobotsRules::parse(robots, "SomeoneElse");
        assert!(other.is_allowed("/"));
    }

    #[test]
    fn shared_group_for_multiple_agents() {
        let robots = "User-agent: foo\nUser-agent: *\nDisallow: /x\n";
        let rules = RobotsRules::parse(robots, "leadenrich");
        assert!(!rules.is_allowed("/x/y"));
    }

    #[test]
    fn empty_or_garbage_allows_all() {
        assert!(RobotsRules::parse("", "leadenrich").is_allowed("/anything"));
        assert!(RobotsRules::parse("<html>not robots</html>", "leadenrich").is_allowed("/"));
        assert!(RobotsRules::allow_all().is_allowed("/"));
    }
}
