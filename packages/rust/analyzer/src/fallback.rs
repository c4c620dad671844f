//! Deterministic keyword heuristic used whenever the model path is unavailable.

use std::sync::LazyLock;

use regex::Regex;

use leadenrich_shared::{AnalysisFields, UNKNOWN};

/// Industry used when no keyword matches.
const DEFAULT_INDUSTRY: &str = "Business Services";
const DEFAULT_TARGET_CUSTOMER: &str = "Businesses and consumers";

/// (industry, keywords, target customer). First match wins.
const INDUSTRY_TABLE: &[(&str, &[&str], &str)] = &[
    (
        "Technology",
        &["software", "tech", "technology", "ai", "saas", "app", "apps", "cloud", "platform"],
        "Companies adopting software and digital tools",
    ),
    (
        "Finance",
        &["financial", "finance", "banking", "bank", "fintech", "payments", "insurance", "investing"],
        "Consumers and businesses managing money",
    ),
    (
        "Healthcare",
        &["health", "healthcare", "medical", "clinic", "hospital", "pharma", "patients"],
        "Patients and healthcare providers",
    ),
    (
        "Retail",
        &["retail", "ecommerce", "e-commerce", "shopping", "store", "shop"],
        "Online and in-store shoppers",
    ),
];

struct IndustryRule {
    industry: &'static str,
    pattern: Regex,
    target_customer: &'static str,
}

static RULES: LazyLock<Vec<IndustryRule>> = LazyLock::new(|| {
    INDUSTRY_TABLE
        .iter()
        .map(|&(industry, keywords, target_customer)| {
            let alternation = keywords
                .iter()
                .map(|k| regex::escape(k))
                .collect::<Vec<_>>()
                .join("|");
            IndustryRule {
                industry,
                pattern: Regex::new(&format!(r"(?i)\b(?:{alternation})\b")).expect("valid regex"),
                target_customer,
            }
        })
        .collect()
});

/// Best-effort fields from the company name and, when present, page text.
///
/// Never fails; every field is non-empty. Identical input gives identical output.
pub fn fallback_analysis(company_name: &str, content: Option<&str>) -> AnalysisFields {
    let haystack = match content {
        Some(text) => format!("{company_name}\n{text}"),
        None => company_name.to_string(),
    };

    let (industry, target_customer) = RULES
        .iter()
        .find(|rule| rule.pattern.is_match(&haystack))
        .map(|rule| (rule.industry, rule.target_customer))
        .unwrap_or((DEFAULT_INDUSTRY, DEFAULT_TARGET_CUSTOMER));

    AnalysisFields {
        summary: format!("{company_name} is a {} company.", industry.to_lowercase()),
        target_customer: target_customer.to_string(),
        industry: industry.to_string(),
        company_size: size_from_content(content).to_string(),
        automation_pitch: format!("AI chatbot and process automation for {company_name}"),
    }
}

/// Rough size signal: richer sites tend to belong to larger companies.
fn size_from_content(content: Option<&str>) -> &'static str {
    match content.map(|c| c.chars().count()) {
        None => UNKNOWN,
        Some(n) if n > 2000 => "large",
        Some(n) if n > 1000 => "medium",
        Some(_) => "small",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_industry_from_content() {
        let fields = fallback_analysis("Acme", Some("Cloud software for logistics teams"));
        assert_eq!(fields.industry, "Technology");
        assert_eq!(fields.summary, "Acme is a technology company.");
        assert_eq!(fields.automation_pitch, "AI chatbot and process automation for Acme");
    }

    #[test]
    fn name_alone_can_signal_industry() {
        assert_eq!(fallback_analysis("First National Bank", None).industry, "Finance");
        assert_eq!(fallback_analysis("Sunrise Medical Group", None).industry, "Healthcare");
    }

    #[test]
    fn keywords_match_whole_words_only() {
        // "said" contains "ai", "apple" contains "app"
        let fields = fallback_analysis("Orchard Co", Some("He said the apple harvest was good"));
        assert_eq!(fields.industry, DEFAULT_INDUSTRY);
        assert_eq!(fields.target_customer, DEFAULT_TARGET_CUSTOMER);
    }

    #[test]
    fn size_follows_content_length() {
        assert_eq!(fallback_analysis("A", None).company_size, UNKNOWN);
        assert_eq!(fallback_analysis("A", Some("short")).company_size, "small");
        assert_eq!(fallback_analysis("A", Some(&"x".repeat(1500))).company_size, "medium");
        assert_eq!(fallback_analysis("A", Some(&"x".repeat(2500))).company_size, "large");
    }

    #[test]
    fn every_field_non_empty() {
        let fields = fallback_analysis("Unfindable Corp Xyz123", None);
        for value in [
            &fields.summary,
            &fields.target_customer,
            &fields.industry,
            &fields.company_size,
            &fields.automation_pitch,
        ] {
            assert!(!value.trim().is_empty());
        }
    }

    #[test]
    fn deterministic() {
        let content = Some("Online store for handmade shoes");
        assert_eq!(
            fallback_analysis("Cobbler", content),
            fallback_analysis("Cobbler", content)
        );
        assert_eq!(fallback_analysis("Cobbler", content).industry, "Retail");
    }
}
