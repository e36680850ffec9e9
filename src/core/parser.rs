//! Parser for the five-section recommendation grammar
//!
//! ```text
//! document := preamble? section*
//! section  := header ':' text-until-next-header
//! header   := "Summary" | "Recommendations" | "Risk Level"
//!           | "Preventive Actions" | "Important Flags"
//! ```
//!
//! A header only counts at the start of a line (after optional whitespace and
//! markdown `#`/`*` decoration). Text on the header line after the colon
//! belongs to the section. When a header repeats, the first occurrence wins.

use crate::error::PulseError;
use crate::models::{RecommendationDocument, RiskLevel};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Summary,
    Recommendations,
    RiskLevel,
    PreventiveActions,
    ImportantFlags,
}

impl Section {
    pub const ALL: [Section; 5] = [
        Section::Summary,
        Section::Recommendations,
        Section::RiskLevel,
        Section::PreventiveActions,
        Section::ImportantFlags,
    ];

    pub fn header(&self) -> &'static str {
        match self {
            Section::Summary => "Summary",
            Section::Recommendations => "Recommendations",
            Section::RiskLevel => "Risk Level",
            Section::PreventiveActions => "Preventive Actions",
            Section::ImportantFlags => "Important Flags",
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

/// Raw text owned by each header, trimmed; `None` when the header is absent
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedSections {
    bodies: [Option<String>; 5],
}

impl ParsedSections {
    pub fn get(&self, section: Section) -> Option<&str> {
        self.bodies[section.index()].as_deref()
    }

    /// Section text, or `None` when absent or blank
    pub fn non_empty(&self, section: Section) -> Option<&str> {
        self.get(section).filter(|body| !body.is_empty())
    }

    /// Bullet items of a list section; empty when the section is absent
    pub fn items(&self, section: Section) -> Vec<String> {
        self.get(section).map(split_items).unwrap_or_default()
    }

    /// Risk level token (first word, surrounding punctuation and emphasis removed)
    pub fn risk_token(&self) -> Option<&str> {
        self.non_empty(Section::RiskLevel)
            .and_then(|body| body.split_whitespace().next())
            .map(|word| word.trim_matches(|c: char| !c.is_alphanumeric()))
    }

    /// Validate the mandatory sections and build a document
    pub fn into_document(self) -> Result<RecommendationDocument, PulseError> {
        for section in [
            Section::Summary,
            Section::Recommendations,
            Section::RiskLevel,
            Section::PreventiveActions,
        ] {
            if self.non_empty(section).is_none() {
                return Err(PulseError::MalformedResponse(format!(
                    "\"{}\" section is missing or empty",
                    section.header()
                )));
            }
        }

        let token = self.risk_token().unwrap_or_default();
        let risk_level = RiskLevel::from_label(token).ok_or_else(|| {
            PulseError::MalformedResponse(format!(
                "invalid Risk Level '{}': expected Low, Moderate, or High",
                token
            ))
        })?;

        let recommendations = self.items(Section::Recommendations);
        let preventive_actions = self.items(Section::PreventiveActions);
        for (section, items) in [
            (Section::Recommendations, &recommendations),
            (Section::PreventiveActions, &preventive_actions),
        ] {
            if items.is_empty() {
                return Err(PulseError::MalformedResponse(format!(
                    "\"{}\" section has no items",
                    section.header()
                )));
            }
        }

        let summary = self
            .non_empty(Section::Summary)
            .map(|body| {
                body.lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .unwrap_or_default();

        Ok(RecommendationDocument {
            summary,
            recommendations,
            risk_level,
            preventive_actions,
            important_flags: self.items(Section::ImportantFlags),
        })
    }
}

/// Match a header line, returning the section and the text after its colon
fn match_header(line: &str) -> Option<(Section, &str)> {
    let stripped = line.trim_start().trim_start_matches(['#', '*']).trim_start();

    Section::ALL.iter().find_map(|section| {
        let rest = stripped.strip_prefix(section.header())?;
        // tolerate "**Summary:**" and "Summary**:"
        let rest = rest.trim_start_matches('*').strip_prefix(':')?;
        Some((*section, rest.trim_start_matches('*')))
    })
}

/// Split text into sections
pub fn parse_sections(text: &str) -> ParsedSections {
    let mut bodies: [Option<Vec<&str>>; 5] = Default::default();
    let mut current: Option<Section> = None;
    // a repeated header still closes the previous section, but its text is dropped
    let mut capturing = false;

    for line in text.lines() {
        if let Some((section, rest)) = match_header(line) {
            current = Some(section);
            capturing = bodies[section.index()].is_none();
            if capturing {
                bodies[section.index()] = Some(vec![rest]);
            }
            continue;
        }

        if let (Some(section), true) = (current, capturing) {
            if let Some(lines) = bodies[section.index()].as_mut() {
                lines.push(line);
            }
        }
    }

    ParsedSections {
        bodies: bodies.map(|lines| lines.map(|l| l.join("\n").trim().to_string())),
    }
}

/// Split a list section into items, stripping `-` / `•` bullets
pub fn split_items(body: &str) -> Vec<String> {
    body.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            line.strip_prefix('-')
                .or_else(|| line.strip_prefix('•'))
                .map(str::trim)
                .unwrap_or(line)
                .to_string()
        })
        .filter(|item| !item.is_empty())
        .collect()
}

/// Parse and validate generated or composed text into a document
pub fn parse_document(text: &str) -> Result<RecommendationDocument, PulseError> {
    if text.trim().is_empty() {
        return Err(PulseError::MalformedResponse("empty response".into()));
    }
    parse_sections(text).into_document()
}

#[cfg(test)]
mod tests {
    use super::*;

    const WELL_FORMED: &str = "Summary:\nYou are doing well.\nKeep it up.\n\
Recommendations:\n- Walk daily\n• Drink water\n\n\
Risk Level:\nModerate\n\
Preventive Actions:\n- Sleep 8 hours\n";

    #[test]
    fn test_parse_well_formed() {
        let doc = parse_document(WELL_FORMED).unwrap();
        assert_eq!(doc.summary, "You are doing well. Keep it up.");
        assert_eq!(doc.recommendations, vec!["Walk daily", "Drink water"]);
        assert_eq!(doc.risk_level, RiskLevel::Moderate);
        assert_eq!(doc.preventive_actions, vec!["Sleep 8 hours"]);
        assert!(doc.important_flags.is_empty());
    }

    #[test]
    fn test_inline_values_and_markdown_headers() {
        let text = "Here is your plan.\n**Summary:** Fine overall.\n## Recommendations:\n- Stretch\n\
**Risk Level:** High.\nPreventive Actions:\n- See a doctor\nImportant Flags:\n- Check blood pressure";
        let doc = parse_document(text).unwrap();
        assert_eq!(doc.summary, "Fine overall.");
        assert_eq!(doc.risk_level, RiskLevel::High);
        assert_eq!(doc.important_flags, vec!["Check blood pressure"]);
    }

    #[test]
    fn test_missing_risk_level_is_malformed() {
        let text = "Summary:\nok\nRecommendations:\n- a\nPreventive Actions:\n- b";
        let err = parse_document(text).unwrap_err();
        assert!(matches!(err, PulseError::MalformedResponse(ref m) if m.contains("Risk Level")));
    }

    #[test]
    fn test_unknown_risk_level_is_malformed() {
        let text = WELL_FORMED.replace("Moderate", "Severe");
        assert!(matches!(
            parse_document(&text),
            Err(PulseError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_empty_section_is_malformed() {
        let text = "Summary:\n\nRecommendations:\n- a\nRisk Level: Low\nPreventive Actions:\n- b";
        assert!(matches!(
            parse_document(text),
            Err(PulseError::MalformedResponse(ref m)) if m.contains("Summary")
        ));
    }

    #[test]
    fn test_bullet_only_list_is_malformed() {
        let text = "Summary:\nok\nRecommendations:\n-\nRisk Level: Low\nPreventive Actions:\n- b";
        assert!(matches!(
            parse_document(text),
            Err(PulseError::MalformedResponse(ref m)) if m.contains("Recommendations")
        ));

        let text = "Summary:\nok\nRecommendations:\n- a\nRisk Level: Low\nPreventive Actions:\n•\n  - ";
        assert!(matches!(
            parse_document(text),
            Err(PulseError::MalformedResponse(ref m)) if m.contains("Preventive Actions")
        ));
    }

    #[test]
    fn test_emphasized_risk_level() {
        let text = WELL_FORMED.replace("Moderate", "**High**");
        assert_eq!(parse_document(&text).unwrap().risk_level, RiskLevel::High);

        let text = "Summary: ok\nRecommendations:\n- a\n**Risk Level:** _Low_\nPreventive Actions:\n- b";
        assert_eq!(parse_document(text).unwrap().risk_level, RiskLevel::Low);
    }

    #[test]
    fn test_header_must_start_line() {
        let text = "Summary:\nMy Risk Level: is not a header here\nRecommendations:\n- a\n\
Risk Level:\nLow\nPreventive Actions:\n- b";
        let sections = parse_sections(text);
        assert_eq!(
            sections.get(Section::Summary),
            Some("My Risk Level: is not a header here")
        );
        assert_eq!(sections.risk_token(), Some("Low"));
    }

    #[test]
    fn test_rendered_document_parses_back() {
        let doc = RecommendationDocument {
            summary: "Stable overall.".to_string(),
            recommendations: vec!["Walk daily".to_string(), "Stretch hourly".to_string()],
            risk_level: RiskLevel::High,
            preventive_actions: vec!["Annual checkup".to_string()],
            important_flags: vec!["Consult a physician".to_string()],
        };
        assert_eq!(parse_document(&doc.to_string()).unwrap(), doc);
    }

    #[test]
    fn test_empty_text_is_malformed() {
        assert!(matches!(
            parse_document("  \n "),
            Err(PulseError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_first_duplicate_header_wins() {
        let text = format!("{}Summary:\nsecond summary", WELL_FORMED);
        let sections = parse_sections(&text);
        assert_eq!(
            sections.get(Section::Summary),
            Some("You are doing well.\nKeep it up.")
        );
        assert_eq!(sections.items(Section::PreventiveActions), vec!["Sleep 8 hours"]);
    }
}
