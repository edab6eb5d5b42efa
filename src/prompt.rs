//! Prompt composition.
//!
//! [`compose`] renders the incident text and the evidence set into one
//! instruction document. The template is a versioned contract: downstream
//! consumers rely on the five sections named in [`SECTION_NAMES`], in that
//! order. Changing their count, order, or names requires a new
//! [`PROMPT_TEMPLATE_VERSION`].

use std::fmt;

use matcher::EvidenceSet;
use serde_json::Value;

use crate::pipeline::IncidentQuery;

pub const PROMPT_TEMPLATE_VERSION: &str = "v1";

/// Output sections the completion is instructed to produce, in order.
pub const SECTION_NAMES: [&str; 5] = [
    "Similar Incident IDs",
    "Unified Root Cause",
    "Recommended Resolution",
    "Validation Steps",
    "Action Summary",
];

const INSTRUCTIONS: &str = "\
Using ONLY this information, return the output in this exact structure:

1. Similar Incident IDs:
   - Comma-separated list of incident_ids, or \"None\".

2. Unified Root Cause:
   - One concise root cause summarizing patterns found.

3. Recommended Resolution (4-7 Steps):
   - Numbered steps.
   - Combine only relevant actions from past incidents.
   - Avoid repetition.

4. Validation Steps (3-5 Steps):
   - Numbered steps.
   - Confirm the fix.

5. Action Summary:
   - 1-2 crisp sentences describing the final fix and prevention.

Do NOT repeat the incident description.
Do NOT repeat the JSON input.
Only output the structured answer.
";

/// A rendered prompt, ready to hand to a generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionPrompt {
    text: String,
}

impl ResolutionPrompt {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }

    pub fn template_version(&self) -> &'static str {
        PROMPT_TEMPLATE_VERSION
    }
}

impl fmt::Display for ResolutionPrompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Render `query` and `evidence` under the fixed template. Pure and deterministic.
pub fn compose(query: &IncidentQuery, evidence: &EvidenceSet) -> ResolutionPrompt {
    let listing = render_evidence(evidence);
    let mut text = String::with_capacity(
        query.as_str().len() + listing.len() + INSTRUCTIONS.len() + 160,
    );
    text.push_str("You are an expert incident analyst.\n\n");
    text.push_str("A new incident occurred:\n");
    text.push_str(query.as_str());
    text.push_str("\n\nHere are the similar historical incidents in JSON:\n");
    text.push_str(&listing);
    text.push_str("\n\n");
    text.push_str(INSTRUCTIONS);
    ResolutionPrompt { text }
}

/// Compact JSON array of `{incident_id, short_desc, resolution, similarity}`
/// in evidence order. An empty set renders as `[]`.
fn render_evidence(evidence: &EvidenceSet) -> String {
    let items: Vec<String> = evidence
        .iter()
        .map(|item| {
            format!(
                "{{\"incident_id\":{},\"short_desc\":{},\"resolution\":{},\"similarity\":{}}}",
                Value::from(item.incident_id.as_str()),
                Value::from(item.short_desc.as_str()),
                Value::from(item.resolution.as_str()),
                Value::from(item.similarity),
            )
        })
        .collect();
    format!("[{}]", items.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;
    use matcher::EvidenceItem;

    fn query(text: &str) -> IncidentQuery {
        IncidentQuery::new(text).unwrap()
    }

    fn one_item() -> EvidenceSet {
        EvidenceSet::from_items(vec![EvidenceItem::new(
            "INC001",
            "Gateway 504",
            "Restarted LB",
            0.82,
        )])
    }

    #[test]
    fn empty_evidence_renders_explicit_marker() {
        let prompt = compose(&query("disk full"), &EvidenceSet::empty());
        assert!(prompt
            .as_str()
            .contains("Here are the similar historical incidents in JSON:\n[]\n"));
    }

    #[test]
    fn evidence_listing_is_compact_json() {
        let prompt = compose(&query("gateway timeout"), &one_item());
        let expected = r#"[{"incident_id":"INC001","short_desc":"Gateway 504","resolution":"Restarted LB","similarity":0.82}]"#;
        assert!(prompt.as_str().contains(expected));

        let listing_line = prompt
            .as_str()
            .lines()
            .find(|l| l.starts_with('['))
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(listing_line).unwrap();
        assert_eq!(parsed[0]["incident_id"], "INC001");
    }

    #[test]
    fn evidence_strings_are_escaped() {
        let evidence = EvidenceSet::from_items(vec![EvidenceItem::new(
            "INC\"7",
            "line one\nline two",
            "ran `kill -9`",
            0.7,
        )]);
        let prompt = compose(&query("x"), &evidence);
        assert!(prompt.as_str().contains(r#""incident_id":"INC\"7""#));
        assert!(prompt.as_str().contains(r#""short_desc":"line one\nline two""#));
    }

    #[test]
    fn incident_text_is_verbatim_and_first() {
        let text = "  API gateway timeout\nwhen payload delivery happened ";
        let prompt = compose(&query(text), &one_item());
        let body = prompt.as_str();
        let incident_at = body.find(text).unwrap();
        let evidence_at = body.find("INC001").unwrap();
        let instructions_at = body.find("Using ONLY this information").unwrap();
        assert!(incident_at < evidence_at && evidence_at < instructions_at);
    }

    #[test]
    fn sections_appear_in_contract_order() {
        let prompt = compose(&query("x"), &EvidenceSet::empty());
        let body = prompt.as_str();
        let mut last = 0;
        for (n, name) in SECTION_NAMES.iter().enumerate() {
            let heading = format!("{}. {}", n + 1, name);
            let at = body.find(&heading).unwrap_or_else(|| panic!("missing {heading}"));
            assert!(at > last);
            last = at;
        }
        assert!(body.contains("Do NOT repeat the incident description."));
        assert!(body.contains("Do NOT repeat the JSON input."));
    }

    #[test]
    fn composition_is_deterministic() {
        let a = compose(&query("same"), &one_item());
        let b = compose(&query("same"), &one_item());
        assert_eq!(a.as_str().as_bytes(), b.as_str().as_bytes());
        assert_eq!(a.template_version(), "v1");
        assert_eq!(a.to_string(), a.clone().into_string());
    }
}
