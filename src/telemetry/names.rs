use once_cell::sync::Lazy;
use regex::Regex;

static MANUFACTURER_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z]{2,4}_").unwrap());

const AI_MARKER: &str = "PU AI";

/// Turns an internal entity tag (`AEGS_Idris_02`, `PUAIRifleman_0042`, ...)
/// into a readable label. Tags that no rule applies to come back unchanged.
pub fn sanitize_entity_name(raw: &str) -> String {
    let name = if MANUFACTURER_PREFIX.is_match(raw) {
        match ship_name(raw) {
            Some(name) => name,
            None => return raw.to_string(),
        }
    } else {
        let head = raw.split('_').next().unwrap_or(raw);
        expand_camel_case(head)
    };

    collapse_ai_label(name)
}

fn ship_name(raw: &str) -> Option<String> {
    let mut segments: Vec<&str> = raw
        .split('_')
        .skip(1)
        .filter(|segment| !segment.is_empty())
        .collect();

    // a lone numeric segment is the model, not a serial: `CRUS_300` stays `300`
    if segments.len() > 1
        && segments
            .last()
            .is_some_and(|segment| segment.chars().all(|c| c.is_ascii_digit()))
    {
        segments.pop();
    }

    if segments.is_empty() {
        None
    } else {
        Some(segments.join(" "))
    }
}

fn expand_camel_case(word: &str) -> String {
    let word = match word.strip_prefix("PUAI") {
        Some(rest) => format!("PU AI{rest}"),
        None => word.to_string(),
    };

    let chars: Vec<char> = word.chars().collect();
    let mut expanded = String::with_capacity(word.len() + 4);

    for (index, &ch) in chars.iter().enumerate() {
        if index > 0 && ch.is_uppercase() {
            let prev = chars[index - 1];
            let next_is_lower = chars.get(index + 1).is_some_and(|c| c.is_lowercase());
            let starts_word = prev.is_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_uppercase() && next_is_lower);
            if starts_word {
                expanded.push(' ');
            }
        }
        expanded.push(ch);
    }

    expanded
}

// Keeps only what precedes the marker. A bare "PU AI Rifleman" therefore
// collapses to "NPC " with nothing after it.
fn collapse_ai_label(name: String) -> String {
    match name.find(AI_MARKER) {
        Some(index) => format!("NPC {}", name[..index].trim_end()),
        None => name,
    }
}
