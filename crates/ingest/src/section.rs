//! Locating the Discussion section in extracted text.
//!
//! Boundaries come from two ordered rule tables: section headers that open
//! the excerpt and next-section markers that close it. Rules are tried in
//! table order and the first rule with any match wins, at its earliest
//! offset. A heading must sit on its own line, optionally numbered
//! (`5.`, `4.2`, `IV.`). When no header matches, a bounded prefix (or suffix)
//! of the whole text stands in for the section.

use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    /// The heading is the whole line
    Line,
    /// The line starts with the heading stem
    Prefix,
}

#[derive(Debug, Clone, Copy)]
pub struct SectionRule {
    pub name: &'static str,
    /// Regex fragment for the heading words
    pub words: &'static str,
    pub kind: RuleKind,
}

const fn line(name: &'static str, words: &'static str) -> SectionRule {
    SectionRule { name, words, kind: RuleKind::Line }
}

pub const HEADER_RULES: &[SectionRule] = &[
    line("discussion", r"discussion"),
    line("discussion and conclusion", r"discussion[ \t]*and[ \t]*conclusions?"),
    line("general discussion", r"general[ \t]*discussion"),
];

pub const STOP_RULES: &[SectionRule] = &[
    line("conclusion", r"conclusions?"),
    line("limitations", r"limitations"),
    line("implications", r"implications"),
    line("references", r"references"),
    line("bibliography", r"bibliography"),
    line("appendix", r"appendix"),
    SectionRule { name: "acknowledgments", words: r"acknowledg", kind: RuleKind::Prefix },
];

const SECTION_NUMBER: &str = r"(?:\d+(?:\.\d+)*\.?|[ivx]+\.)[ \t]*";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FallbackDirection {
    Prefix,
    Suffix,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionConfig {
    pub max_excerpt_chars: usize,
    /// Size of the stand-in excerpt when no header is found
    pub fallback_chars: usize,
    pub fallback: FallbackDirection,
    /// Additional header phrases, tried after the built-in ones
    pub extra_headers: Vec<String>,
    /// Additional stop phrases, tried after the built-in ones
    pub extra_stops: Vec<String>,
}

impl Default for SectionConfig {
    fn default() -> Self {
        Self {
            max_excerpt_chars: 16_000,
            fallback_chars: 12_000,
            fallback: FallbackDirection::Prefix,
            extra_headers: Vec::new(),
            extra_stops: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscussionExcerpt {
    pub text: String,
    /// Name of the header rule that opened the excerpt
    pub header: Option<String>,
    /// Name of the stop rule that closed it, `None` when it ran to the end
    pub stop: Option<String>,
    /// Byte range in the extracted text before trimming and capping
    pub start: usize,
    pub end: usize,
    pub truncated: bool,
    /// Set when no header matched
    pub fallback: Option<FallbackDirection>,
}

struct Matcher {
    name: String,
    regex: Regex,
}

impl Matcher {
    fn compile(name: &str, words: &str, kind: RuleKind) -> Result<Self, regex::Error> {
        let tail = match kind {
            RuleKind::Line => r"[ \t]*\r?$",
            RuleKind::Prefix => "",
        };
        let pattern = format!(r"(?im)^[ \t]*(?:{})?{}{}", SECTION_NUMBER, words, tail);

        Ok(Self {
            name: name.to_string(),
            regex: Regex::new(&pattern)?,
        })
    }

    fn from_phrase(phrase: &str) -> Result<Self, regex::Error> {
        let words = phrase
            .split_whitespace()
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(r"[ \t]+");
        Self::compile(&phrase.to_lowercase(), &words, RuleKind::Line)
    }
}

pub struct SectionLocator {
    config: SectionConfig,
    headers: Vec<Matcher>,
    stops: Vec<Matcher>,
}

impl SectionLocator {
    pub fn new(mut config: SectionConfig) -> Result<Self, regex::Error> {
        // A zero cap would turn every document into an empty excerpt
        config.max_excerpt_chars = config.max_excerpt_chars.max(1);
        config.fallback_chars = config.fallback_chars.max(1);

        let headers = compile_rules(HEADER_RULES, &config.extra_headers)?;
        let stops = compile_rules(STOP_RULES, &config.extra_stops)?;

        Ok(Self {
            config,
            headers,
            stops,
        })
    }

    pub fn config(&self) -> &SectionConfig {
        &self.config
    }

    pub fn locate(&self, text: &str) -> DiscussionExcerpt {
        let Some((header, start, header_end)) = first_match(&self.headers, text, 0) else {
            tracing::debug!("No discussion header found, using fallback excerpt");
            return self.fallback(text);
        };

        let (stop, end) = match first_match(&self.stops, text, header_end) {
            Some((name, stop_start, _)) => (Some(name), stop_start),
            None => (None, text.len()),
        };

        let section = text[start..end].trim();
        let capped = truncate_chars(section, self.config.max_excerpt_chars);

        tracing::debug!(
            header = %header,
            stop = ?stop,
            start,
            end,
            chars = capped.chars().count(),
            "Located discussion section"
        );

        DiscussionExcerpt {
            text: capped.to_string(),
            header: Some(header),
            stop,
            start,
            end,
            truncated: capped.len() < section.len(),
            fallback: None,
        }
    }

    fn fallback(&self, text: &str) -> DiscussionExcerpt {
        let limit = self.config.fallback_chars;
        let (excerpt, start, end) = match self.config.fallback {
            FallbackDirection::Prefix => {
                let head = truncate_chars(text, limit);
                (head, 0, head.len())
            }
            FallbackDirection::Suffix => {
                let tail = tail_chars(text, limit);
                (tail, text.len() - tail.len(), text.len())
            }
        };

        DiscussionExcerpt {
            text: excerpt.to_string(),
            header: None,
            stop: None,
            start,
            end,
            truncated: excerpt.len() < text.len(),
            fallback: Some(self.config.fallback),
        }
    }
}

fn compile_rules(rules: &[SectionRule], extra: &[String]) -> Result<Vec<Matcher>, regex::Error> {
    let mut matchers = rules
        .iter()
        .map(|rule| Matcher::compile(rule.name, rule.words, rule.kind))
        .collect::<Result<Vec<_>, _>>()?;

    for phrase in extra.iter().filter(|p| !p.trim().is_empty()) {
        matchers.push(Matcher::from_phrase(phrase)?);
    }
    Ok(matchers)
}

/// First rule (in priority order) with a match at or after `from`.
/// Returns the rule name and the match's byte range.
fn first_match(matchers: &[Matcher], text: &str, from: usize) -> Option<(String, usize, usize)> {
    matchers.iter().find_map(|matcher| {
        matcher
            .regex
            .find_at(text, from)
            .map(|m| (matcher.name.clone(), m.start(), m.end()))
    })
}

/// Longest prefix of `s` with at most `max_chars` characters.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Longest suffix of `s` with at most `max_chars` characters.
pub fn tail_chars(s: &str, max_chars: usize) -> &str {
    if max_chars == 0 {
        return "";
    }
    match s.char_indices().rev().nth(max_chars - 1) {
        Some((idx, _)) => &s[idx..],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locator() -> SectionLocator {
        SectionLocator::new(SectionConfig::default()).unwrap()
    }

    #[test]
    fn test_header_to_stop() {
        let text = "...\n\nDiscussion\n\nFindings A and B.\n\nConclusion\n\nWe conclude...";
        let excerpt = locator().locate(text);

        assert_eq!(excerpt.text, "Discussion\n\nFindings A and B.");
        assert_eq!(excerpt.header.as_deref(), Some("discussion"));
        assert_eq!(excerpt.stop.as_deref(), Some("conclusion"));
        assert!(excerpt.fallback.is_none());
    }

    #[test]
    fn test_runs_to_end_without_stop() {
        let text = "Results\nr\n  DISCUSSION  \nWe found X.\nMore on X.";
        let excerpt = locator().locate(text);

        assert_eq!(excerpt.text, "DISCUSSION  \nWe found X.\nMore on X.");
        assert!(excerpt.stop.is_none());
        assert_eq!(excerpt.end, text.len());
    }

    #[test]
    fn test_inline_mentions_are_not_headers() {
        let text = "In the discussion below we argue.\nGeneral Discussion\nBody text.\nReferences\n[1] A.";
        let excerpt = locator().locate(text);

        assert_eq!(excerpt.header.as_deref(), Some("general discussion"));
        assert_eq!(excerpt.text, "General Discussion\nBody text.");
    }

    #[test]
    fn test_rule_priority_beats_position() {
        // "discussion" outranks "discussion and conclusion" even when it comes later
        let text = "Discussion and Conclusion\nEarly.\nDiscussion\nLate.\nAppendix\nA";
        let excerpt = locator().locate(text);

        assert_eq!(excerpt.header.as_deref(), Some("discussion"));
        assert_eq!(excerpt.text, "Discussion\nLate.");
    }

    #[test]
    fn test_stop_priority_beats_position() {
        let text = "Discussion\nBody.\nReferences\n[1]\nConclusion\nEnd.";
        let excerpt = locator().locate(text);

        assert_eq!(excerpt.stop.as_deref(), Some("conclusion"));
        assert_eq!(excerpt.text, "Discussion\nBody.\nReferences\n[1]");
    }

    #[test]
    fn test_numbered_headings() {
        let text = "4. Results\nx\n5. Discussion\nWe saw y.\n6 Limitations\nSmall n.";
        let excerpt = locator().locate(text);

        assert_eq!(excerpt.text, "5. Discussion\nWe saw y.");
        assert_eq!(excerpt.stop.as_deref(), Some("limitations"));
    }

    #[test]
    fn test_acknowledgement_prefix() {
        let text = "Discussion\nBody.\nAcknowledgements: thanks to all.";
        let excerpt = locator().locate(text);

        assert_eq!(excerpt.stop.as_deref(), Some("acknowledgments"));
        assert_eq!(excerpt.text, "Discussion\nBody.");
    }

    #[test]
    fn test_stop_words_before_header_are_ignored() {
        let text = "Conclusion\nearly\nDiscussion\nBody.";
        let excerpt = locator().locate(text);
        assert_eq!(excerpt.text, "Discussion\nBody.");
    }

    #[test]
    fn test_no_header_prefix_fallback() {
        let text = "Abstract\n".to_string() + &"word ".repeat(5_000);
        let excerpt = locator().locate(&text);

        assert!(excerpt.header.is_none());
        assert_eq!(excerpt.fallback, Some(FallbackDirection::Prefix));
        assert_eq!(excerpt.text.chars().count(), 12_000);
        assert!(text.starts_with(&excerpt.text));
        assert!(excerpt.truncated);
    }

    #[test]
    fn test_no_header_short_text_is_kept_whole() {
        let excerpt = locator().locate("Only a short abstract.");
        assert_eq!(excerpt.text, "Only a short abstract.");
        assert!(!excerpt.truncated);
    }

    #[test]
    fn test_no_header_suffix_fallback() {
        let config = SectionConfig {
            fallback: FallbackDirection::Suffix,
            fallback_chars: 5,
            ..SectionConfig::default()
        };
        let excerpt = SectionLocator::new(config).unwrap().locate("abcdefghij");

        assert_eq!(excerpt.text, "fghij");
        assert_eq!(excerpt.start, 5);
    }

    #[test]
    fn test_excerpt_cap() {
        let config = SectionConfig {
            max_excerpt_chars: 15,
            ..SectionConfig::default()
        };
        let excerpt = SectionLocator::new(config)
            .unwrap()
            .locate("Discussion\nééééééééééééééé");

        assert_eq!(excerpt.text, "Discussion\néééé");
        assert!(excerpt.truncated);
    }

    #[test]
    fn test_zero_caps_still_yield_text() {
        let config = SectionConfig {
            max_excerpt_chars: 0,
            fallback_chars: 0,
            ..SectionConfig::default()
        };
        let locator = SectionLocator::new(config).unwrap();

        assert_eq!(locator.config().max_excerpt_chars, 1);
        assert_eq!(locator.locate("Discussion\nFindings.").text, "D");
        assert_eq!(locator.locate("Methods only.").text, "M");
    }

    #[test]
    fn test_extra_phrases() {
        let config = SectionConfig {
            extra_headers: vec!["Diskussion".to_string()],
            extra_stops: vec!["Literatur verzeichnis".to_string()],
            ..SectionConfig::default()
        };
        let text = "Diskussion\nInhalt.\nLiteratur  Verzeichnis\nx";
        let excerpt = SectionLocator::new(config).unwrap().locate(text);

        assert_eq!(excerpt.header.as_deref(), Some("diskussion"));
        assert_eq!(excerpt.text, "Diskussion\nInhalt.");
    }

    #[test]
    fn test_char_helpers() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("hi", 10), "hi");
        assert_eq!(tail_chars("héllo", 4), "éllo");
        assert_eq!(tail_chars("hi", 10), "hi");
        assert_eq!(tail_chars("hi", 0), "");
    }
}
