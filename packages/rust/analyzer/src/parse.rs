//! Turning a free-form model response into [`AnalysisFields`].
//!
//! Strategies run in order and the first one that yields a JSON object wins:
//!
//! 1. the whole response (optionally inside a Markdown code fence);
//! 2. the first balanced `{...}` substring, skipping braces inside strings.
//!
//! An object that lacks a required key, or holds a non-string or blank value
//! for one, is [`ParseOutcome::Degraded`]. Extra keys are ignored.

use serde_json::{Map, Value};

use leadenrich_shared::AnalysisFields;

use crate::prompt::REQUIRED_KEYS;

/// Result of parsing a model response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    Parsed(AnalysisFields),
    /// Not usable; the reason is for logs only.
    Degraded(String),
}

/// Parse a model response into analysis fields.
pub fn parse_analysis(response: &str) -> ParseOutcome {
    let object = strict_object(response).or_else(|| first_balanced_object(response));

    match object {
        Some(map) => match fields_from_object(&map) {
            Ok(fields) => ParseOutcome::Parsed(fields),
            Err(reason) => ParseOutcome::Degraded(reason),
        },
        None => ParseOutcome::Degraded("no JSON object in response".into()),
    }
}

fn strict_object(response: &str) -> Option<Map<String, Value>> {
    let text = strip_code_fence(response.trim());
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Models sometimes wrap JSON in ```json fences.
fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn first_balanced_object(text: &str) -> Option<Map<String, Value>> {
    text.match_indices('{').find_map(|(start, _)| {
        let end = balanced_end(&text[start..])?;
        match serde_json::from_str::<Value>(&text[start..start + end]) {
            Ok(Value::Object(map)) => Some(map),
            _ => None,
        }
    })
}

/// Byte length of the balanced object starting at `s[0] == '{'`, if it closes.
fn balanced_end(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in s.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

fn fields_from_object(map: &Map<String, Value>) -> Result<AnalysisFields, String> {
    let get = |key: &str| -> Result<String, String> {
        match map.get(key) {
            Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
            Some(Value::String(_)) => Err(format!("key {key} is blank")),
            Some(other) => Err(format!("key {key} is not a string: {other}")),
            None => Err(format!("missing key {key}")),
        }
    };

    let [summary, target_customer, industry, company_size, automation_pitch] = REQUIRED_KEYS;
    Ok(AnalysisFields {
        summary: get(summary)?,
        target_customer: get(target_customer)?,
        industry: get(industry)?,
        company_size: get(company_size)?,
        automation_pitch: get(automation_pitch)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const WELL_FORMED: &str = r#"{"summary":"X","target_customer":"Y","industry":"Z","company_size":"S","automation_pitch":"P"}"#;

    fn parsed(outcome: ParseOutcome) -> AnalysisFields {
        match outcome {
            ParseOutcome::Parsed(fields) => fields,
            ParseOutcome::Degraded(reason) => panic!("expected Parsed, got Degraded({reason})"),
        }
    }

    #[test]
    fn whole_response_object() {
        let fields = parsed(parse_analysis(WELL_FORMED));
        assert_eq!(fields.summary, "X");
        assert_eq!(fields.automation_pitch, "P");
    }

    #[test]
    fn object_wrapped_in_prose() {
        let response = format!("Sure! {WELL_FORMED} Hope this helps!");
        let fields = parsed(parse_analysis(&response));
        assert_eq!(fields.summary, "X");
        assert_eq!(fields.target_customer, "Y");
        assert_eq!(fields.industry, "Z");
        assert_eq!(fields.company_size, "S");
        assert_eq!(fields.automation_pitch, "P");
    }

    #[test]
    fn code_fenced_object() {
        let response = format!("```json\n{WELL_FORMED}\n```");
        assert_eq!(parsed(parse_analysis(&response)).industry, "Z");
    }

    #[test]
    fn braces_inside_strings_do_not_confuse_extraction() {
        let response = r#"Here: {"summary":"Uses {templates} and \"quotes\"","target_customer":"Y","industry":"Z","company_size":"S","automation_pitch":"P"} trailing }"#;
        let fields = parsed(parse_analysis(response));
        assert_eq!(fields.summary, r#"Uses {templates} and "quotes""#);
    }

    #[test]
    fn skips_leading_non_json_brace() {
        let response = format!("Format {{like this}}: {WELL_FORMED}");
        assert_eq!(parsed(parse_analysis(&response)).summary, "X");
    }

    #[test]
    fn extra_keys_are_ignored() {
        let response = r#"{"summary":"X","target_customer":"Y","industry":"Z","company_size":"S","automation_pitch":"P","confidence":"high"}"#;
        assert_eq!(parsed(parse_analysis(response)).company_size, "S");
    }

    #[test]
    fn missing_key_is_degraded() {
        let response = r#"{"summary":"X","target_customer":"Y","industry":"Z","company_size":"S"}"#;
        match parse_analysis(response) {
            ParseOutcome::Degraded(reason) => assert!(reason.contains("automation_pitch")),
            other => panic!("expected Degraded, got {other:?}"),
        }
    }

    #[test]
    fn blank_or_non_string_values_are_degraded() {
        let blank = r#"{"summary":" ","target_customer":"Y","industry":"Z","company_size":"S","automation_pitch":"P"}"#;
        assert!(matches!(parse_analysis(blank), ParseOutcome::Degraded(_)));

        let number = r#"{"summary":"X","target_customer":"Y","industry":"Z","company_size":50,"automation_pitch":"P"}"#;
        assert!(matches!(parse_analysis(number), ParseOutcome::Degraded(_)));
    }

    #[test]
    fn no_object_is_degraded() {
        assert!(matches!(
            parse_analysis("I cannot help with that."),
            ParseOutcome::Degraded(_)
        ));
        assert!(matches!(parse_analysis("{\"unterminated\": "), ParseOutcome::Degraded(_)));
        assert!(matches!(parse_analysis("[1, 2, 3]"), ParseOutcome::Degraded(_)));
    }
}
