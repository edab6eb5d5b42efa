use serde_json::Value;

/// Deterministic completion used when mode is `"fast"`.
///
/// Produces the five-section layout the resolution prompt asks for, citing
/// whichever incident ids appear in the prompt's evidence listing.
pub(crate) fn make_stub_completion(prompt: &str) -> String {
    let ids = evidence_ids(prompt);
    let id_line = if ids.is_empty() {
        "None".to_string()
    } else {
        ids.join(", ")
    };

    format!(
        "1. Similar Incident IDs:\n   - {id_line}\n\n\
         2. Unified Root Cause:\n   - Offline mode: no completion service was called.\n\n\
         3. Recommended Resolution (4-7 Steps):\n   \
         1. Review the cited incidents.\n   \
         2. Identify the failing component.\n   \
         3. Apply the recorded fix.\n   \
         4. Monitor for recurrence.\n\n\
         4. Validation Steps (3-5 Steps):\n   \
         1. Reproduce the original symptom.\n   \
         2. Confirm it no longer occurs.\n   \
         3. Check error rates return to baseline.\n\n\
         5. Action Summary:\n   - Placeholder resolution generated without a model.\n"
    )
}

const LISTING_HEADER: &str = "Here are the similar historical incidents in JSON:\n";

/// Incident ids of the evidence listing, in listing order, deduplicated.
///
/// Only the line after the last listing header is read, so ids quoted in the
/// incident description are never cited. A prompt without the header is read
/// as a bare listing.
fn evidence_ids(prompt: &str) -> Vec<String> {
    let listing = match prompt.rfind(LISTING_HEADER) {
        Some(at) => {
            let body = &prompt[at + LISTING_HEADER.len()..];
            body.split('\n').next().unwrap_or_default()
        }
        None => prompt.trim(),
    };
    let Ok(items) = serde_json::from_str::<Vec<Value>>(listing) else {
        return Vec::new();
    };

    let mut ids: Vec<String> = Vec::new();
    for id in items
        .iter()
        .filter_map(|item| item.get("incident_id").and_then(Value::as_str))
    {
        if !ids.iter().any(|existing| existing == id) {
            ids.push(id.to_string());
        }
    }
    ids
}
