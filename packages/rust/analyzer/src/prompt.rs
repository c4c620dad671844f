//! Prompt template for structured company analysis.

/// Stand-in for the content slot when no page text is available.
pub const NO_CONTENT_PLACEHOLDER: &str = "(no website content available)";

/// Keys the model must return, in template order.
pub const REQUIRED_KEYS: [&str; 5] = [
    "summary",
    "target_customer",
    "industry",
    "company_size",
    "automation_pitch",
];

/// Build the analysis prompt. Content is cut to `content_chars` characters.
pub fn build_prompt(company_name: &str, content: Option<&str>, content_chars: usize) -> String {
    let content: String = match content.map(str::trim).filter(|c| !c.is_empty()) {
        Some(text) => text.chars().take(content_chars).collect(),
        None => NO_CONTENT_PLACEHOLDER.to_string(),
    };

    format!(
        r#"You are a B2B sales research assistant.

Company: {company_name}
Website content: {content}

Respond with a single JSON object and nothing else. Use exactly these keys, each with a short string value:
{{
  "summary": "one-sentence description of what the company does",
  "target_customer": "main target market",
  "industry": "industry category",
  "company_size": "startup, small, medium, or large",
  "automation_pitch": "one concrete AI automation idea for this company"
}}"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embeds_name_content_and_every_key() {
        let prompt = build_prompt("Acme", Some("We build robots."), 1500);
        assert!(prompt.contains("Company: Acme"));
        assert!(prompt.contains("Website content: We build robots."));
        for key in REQUIRED_KEYS {
            assert!(prompt.contains(&format!("\"{key}\"")), "missing {key}");
        }
    }

    #[test]
    fn caps_content() {
        let long = "x".repeat(5_000);
        let prompt = build_prompt("Acme", Some(&long), 1500);
        assert!(prompt.contains(&"x".repeat(1500)));
        assert!(!prompt.contains(&"x".repeat(1501)));
    }

    #[test]
    fn placeholder_for_missing_or_blank_content() {
        assert!(build_prompt("Acme", None, 1500).contains(NO_CONTENT_PLACEHOLDER));
        assert!(build_prompt("Acme", Some("   "), 1500).contains(NO_CONTENT_PLACEHOLDER));
    }
}
