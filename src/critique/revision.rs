use regex::Regex;

use crate::dialogue::{Transcript, Turn};
use crate::error::{ConfigurationError, CritiqueError};

use super::prompt::speakers;

/// A judge-rewritten transcript: same turn count and speaker per ordinal as
/// the original, new text.
pub type RevisedTranscript = Transcript;

/// Matches `**Name:**` (or `**Name**:`) header lines for the given speakers
/// only, so bold lines inside a poem stay part of its text.
fn header_pattern(names: &[&str]) -> Result<Regex, regex::Error> {
    let names = names
        .iter()
        .map(|name| regex::escape(name.trim()))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(
        r"(?mi)^[ \t]*\*\*[ \t]*({names})[ \t]*(?::\*\*|\*\*:)[ \t]*"
    ))
}

/// Splits `**Name:**` sections into `(name, text)` pairs. Sections without
/// text are dropped.
fn sections<'t>(header: &Regex, text: &'t str) -> Vec<(&'t str, &'t str)> {
    let headers: Vec<_> = header.captures_iter(text).collect();
    headers
        .iter()
        .enumerate()
        .filter_map(|(idx, caps)| {
            let whole = caps.get(0)?;
            let name = caps.get(1)?.as_str().trim();
            let end = headers
                .get(idx + 1)
                .and_then(|next| next.get(0))
                .map_or(text.len(), |m| m.start());
            let body = text[whole.end()..end].trim();
            (!body.is_empty()).then_some((name, body))
        })
        .collect()
}

/// Rebuilds the judge's rewrite onto the original's structure.
///
/// Fails with [`CritiqueError::StructureMismatch`] when the section count
/// differs or a section's speaker does not match the original speaker at that
/// ordinal. In the latter case `found` is the number of leading sections that
/// line up.
pub fn parse_revision(
    original: &Transcript,
    revised_text: &str,
) -> Result<RevisedTranscript, CritiqueError> {
    let header = header_pattern(&speakers(original)).map_err(|err| {
        ConfigurationError::InvalidSession(format!("unusable speaker names: {err}"))
    })?;
    let parsed = sections(&header, revised_text);
    let expected = original.len();
    if parsed.len() != expected {
        return Err(CritiqueError::StructureMismatch {
            expected,
            found: parsed.len(),
        });
    }

    let mut revised = Transcript::new();
    for (idx, (turn, (name, body))) in original.iter().zip(parsed).enumerate() {
        if !turn.speaker.name.eq_ignore_ascii_case(name) {
            log::warn!(
                "Revision speaker mismatch at turn {idx}: expected {}, got {name}",
                turn.speaker.name
            );
            return Err(CritiqueError::StructureMismatch {
                expected,
                found: idx,
            });
        }
        revised.append(Turn {
            text: body.to_string(),
            ..turn.clone()
        });
    }
    Ok(revised)
}
