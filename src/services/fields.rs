// src/services/fields.rs

//! Cell-level field extraction for snapshot rows.

use phonenumber::{Mode, country};
use regex::Regex;

use crate::error::Result;
use crate::models::Contact;
use crate::utils::{fragment_text, normalize_whitespace};

/// Label that opens a description row.
const DESCRIPTION_LABEL: &str = "Description:";

/// Characters dropped after the description label when the web-link
/// pattern does not match. The source places a non-breaking space there.
const DESCRIPTION_SEPARATOR_CHARS: usize = 1;

/// Label that opens a location row.
const LOCATION_LABEL: &str = "Location:";

/// Segments in a well-formed contact block: name, phone, email.
const CONTACT_SEGMENTS: usize = 3;

/// Fields carried by a description row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescriptionFields {
    pub description: String,
    pub web_link: Option<String>,
    pub project_id: Option<String>,
}

/// Compiled patterns for row cells.
pub struct FieldExtractor {
    line_break: Regex,
    description: Regex,
    project_id: Regex,
}

impl FieldExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            line_break: Regex::new(r"(?i)<br\s*/?>")?,
            description: Regex::new(r"Description:(.*)Web Link:(.*)")?,
            project_id: Regex::new(r"project=(\d+)")?,
        })
    }

    /// Split cell markup on `<br>` and return each segment's visible text.
    pub fn segments(&self, cell_html: &str) -> Vec<String> {
        self.line_break
            .split(cell_html.trim())
            .map(fragment_text)
            .collect()
    }

    /// Name and optional code from the first column.
    pub fn name_and_code(&self, cell_html: &str) -> (String, Option<String>) {
        let mut segments = self.segments(cell_html).into_iter();
        let name = segments.next().unwrap_or_default();
        (name, segments.next().filter(|code| !code.is_empty()))
    }

    /// Numeric project id from a link or text carrying `project=<digits>`.
    pub fn project_id(&self, text: &str) -> Option<String> {
        self.project_id
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }

    /// Status lines joined with `\n`.
    pub fn status(&self, cell_html: &str) -> String {
        self.segments(cell_html)
            .join("\n")
            .trim_matches('\n')
            .to_string()
    }

    /// Contact block; anything but exactly three segments is rejected.
    pub fn contact(&self, cell_html: &str) -> std::result::Result<Contact, String> {
        let segments = self.segments(cell_html);
        if segments.len() != CONTACT_SEGMENTS {
            return Err(format!(
                "contact block has {} segments, expected {CONTACT_SEGMENTS}",
                segments.len()
            ));
        }

        Ok(Contact {
            name: segments[0].clone(),
            phone: normalize_phone(&segments[1]),
            email: segments[2].clone(),
        })
    }

    /// Description, web link and project id from a description row.
    pub fn description(&self, text: &str) -> DescriptionFields {
        let text = normalize_whitespace(text);

        if let Some(caps) = self.description.captures(&text) {
            let description = caps.get(1).map(|m| m.as_str().trim()).unwrap_or_default();
            let web_link = caps
                .get(2)
                .map(|m| m.as_str().trim())
                .filter(|s| !s.is_empty());

            return DescriptionFields {
                description: description.to_string(),
                project_id: web_link.and_then(|link| self.project_id(link)),
                web_link: web_link.map(str::to_string),
            };
        }

        let remainder = text.replacen(DESCRIPTION_LABEL, "", 1);
        let description: String = remainder.chars().skip(DESCRIPTION_SEPARATOR_CHARS).collect();
        DescriptionFields {
            description: description.trim().to_string(),
            ..DescriptionFields::default()
        }
    }

    /// Location text with its label removed.
    pub fn location(&self, text: &str) -> String {
        normalize_whitespace(&text.replacen(LOCATION_LABEL, "", 1))
    }
}

/// Format a phone number in US national form, or keep it verbatim when it
/// does not parse as a valid number.
pub fn normalize_phone(raw: &str) -> String {
    let raw = normalize_whitespace(raw);
    match phonenumber::parse(Some(country::Id::US), raw.to_lowercase()) {
        Ok(number) if phonenumber::is_valid(&number) => {
            number.format().mode(Mode::National).to_string()
        }
        _ => raw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> FieldExtractor {
        FieldExtractor::new().unwrap()
    }

    #[test]
    fn test_name_and_code() {
        let fx = extractor();
        assert_eq!(
            fx.name_and_code("<a href=\"x?project=58124\">Trail Reroute</a><br>TR-1"),
            ("Trail Reroute".to_string(), Some("TR-1".to_string()))
        );
        assert_eq!(fx.name_and_code(" Hazard Trees "), ("Hazard Trees".to_string(), None));
    }

    #[test]
    fn test_project_id() {
        let fx = extractor();
        assert_eq!(
            fx.project_id("http://www.fs.fed.us/nepa/nepa_project_exp.php?project=58124"),
            Some("58124".to_string())
        );
        assert_eq!(fx.project_id("http://www.fs.fed.us/nepa/"), None);
    }

    #[test]
    fn test_status_keeps_line_breaks() {
        let fx = extractor();
        assert_eq!(
            fx.status("In Progress:<br/>Scoping Start  06/01/2021<BR>"),
            "In Progress:\nScoping Start 06/01/2021"
        );
    }

    #[test]
    fn test_contact_requires_three_segments() {
        let fx = extractor();
        let contact = fx
            .contact("Pat Smith<br>406-329-3750<br><a href=\"mailto:pat@usda.gov\">pat@usda.gov</a>")
            .unwrap();
        assert_eq!(contact.name, "Pat Smith");
        assert_eq!(contact.phone, "(406) 329-3750");
        assert_eq!(contact.email, "pat@usda.gov");

        assert!(fx.contact("Pat Smith<br>pat@usda.gov").is_err());
        assert!(fx.contact("a<br>b<br>c<br>d").is_err());
    }

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_phone("406.329.3750"), "(406) 329-3750");
        assert_eq!(normalize_phone("1-406-329-3750"), "(406) 329-3750");
        assert_eq!(normalize_phone(" 406 329  3750 "), "(406) 329-3750");
        assert!(normalize_phone("406-329-3750 EXT. 12").starts_with("(406) 329-3750"));
        assert!(normalize_phone("406-329-3750 EXT. 12").ends_with("12"));
        assert_eq!(normalize_phone("N/A"), "N/A");
        assert_eq!(normalize_phone("see website"), "see website");
    }

    #[test]
    fn test_description_with_web_link() {
        let fx = extractor();
        let fields = fx.description(
            "Description: Reroute two miles of trail. Web Link: http://www.fs.fed.us/nepa/nepa_project_exp.php?project=58124",
        );
        assert_eq!(fields.description, "Reroute two miles of trail.");
        assert_eq!(
            fields.web_link.as_deref(),
            Some("http://www.fs.fed.us/nepa/nepa_project_exp.php?project=58124")
        );
        assert_eq!(fields.project_id.as_deref(), Some("58124"));
    }

    #[test]
    fn test_description_without_web_link() {
        let fx = extractor();
        let fields = fx.description("Description:\u{a0}Thin 400 acres.");
        assert_eq!(fields.description, "Thin 400 acres.");
        assert_eq!(fields.web_link, None);
        assert_eq!(fields.project_id, None);
    }

    #[test]
    fn test_location() {
        let fx = extractor();
        assert_eq!(
            fx.location("Location:  UNIT - Lolo National Forest. STATE - Montana."),
            "UNIT - Lolo National Forest. STATE - Montana."
        );
    }
}
