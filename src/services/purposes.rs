//! Purpose code table and purpose-list parsing.
//!
//! Snapshot rows list purposes as `CODE - Label - CODE - Label`. Codes are
//! mapped through the agency's fixed table so every dataset spells labels the
//! same way; the printed label that follows a code is then redundant.

use crate::utils::normalize_whitespace;

/// Separator between purpose segments.
const PURPOSE_SEPARATOR: &str = " - ";

/// Two-letter purpose codes and their labels.
pub const PURPOSE_CODES: &[(&str, &str)] = &[
    ("FC", "Facility management"),
    ("FR", "Research"),
    ("HF", "Fuels management"),
    ("HR", "Heritage resource management"),
    ("LM", "Land ownership management"),
    ("LW", "Land acquisition"),
    ("MG", "Minerals and geology"),
    ("PN", "Land management planning"),
    ("RD", "Road management"),
    ("RG", "Grazing management"),
    ("RO", "Regulations, directives, orders"),
    ("RU", "Special area management"),
    ("RW", "Recreation management"),
    ("SU", "Special use management"),
    ("TM", "Forest products"),
    ("VM", "Vegetation management (non-forest products)"),
    ("WF", "Wildlife, fish, rare plants"),
    ("WM", "Water management"),
];

/// Look up the label for a purpose code.
pub fn purpose_label(code: &str) -> Option<&'static str> {
    PURPOSE_CODES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, label)| *label)
}

/// Split a purpose cell into labels.
pub fn parse_purposes(text: &str) -> Vec<String> {
    let normalized = normalize_whitespace(text);
    let mut purposes = Vec::new();
    let mut after_code = false;

    for segment in normalized.split(PURPOSE_SEPARATOR) {
        let segment = segment.trim_matches('-').trim();
        if segment.is_empty() {
            continue;
        }

        if let Some(label) = purpose_label(segment) {
            purposes.push(label.to_string());
            after_code = true;
            continue;
        }

        // Printed label of the code just mapped.
        if after_code {
            after_code = false;
            continue;
        }

        purposes.push(segment.to_string());
    }

    purposes
}
