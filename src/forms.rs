//! Static poetic form table.
//!
//! Forms are passed to models as instructions; nothing here checks meter or
//! rhyme in the returned text.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    Lines,
    Paragraphs,
}

impl UnitKind {
    fn noun(self, count: u32) -> &'static str {
        match (self, count) {
            (UnitKind::Lines, 1) => "line",
            (UnitKind::Lines, _) => "lines",
            (UnitKind::Paragraphs, 1) => "paragraph",
            (UnitKind::Paragraphs, _) => "paragraphs",
        }
    }
}

/// Whether a form's length is fixed or chosen per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Length {
    Fixed(u32),
    Chosen { default: u32, min: u32, max: u32 },
}

struct FormSpec {
    name: &'static str,
    kind: UnitKind,
    length: Length,
    guidance: &'static str,
}

const FORMS: &[FormSpec] = &[
    FormSpec {
        name: "haiku",
        kind: UnitKind::Lines,
        length: Length::Fixed(3),
        guidance: "Three lines in a 5-7-5 syllable pattern. Present tense, one concrete \
                   image or moment, no rhyme required, a pause or turn between images.",
    },
    FormSpec {
        name: "tanka",
        kind: UnitKind::Lines,
        length: Length::Fixed(5),
        guidance: "Five lines in a 5-7-5-7-7 syllable pattern. The first three lines set an \
                   image, the last two turn toward feeling or reflection.",
    },
    FormSpec {
        name: "limerick",
        kind: UnitKind::Lines,
        length: Length::Fixed(5),
        guidance: "Five lines rhyming AABBA with a bouncing anapestic rhythm. Lines 1, 2 and 5 \
                   are longer, lines 3 and 4 shorter. Playful, with a twist in the last line.",
    },
    FormSpec {
        name: "sonnet",
        kind: UnitKind::Lines,
        length: Length::Fixed(14),
        guidance: "Fourteen lines of iambic pentameter rhyming ABAB CDCD EFEF GG: three \
                   quatrains that develop the theme, a turn, and a closing couplet.",
    },
    FormSpec {
        name: "villanelle",
        kind: UnitKind::Lines,
        length: Length::Fixed(19),
        guidance: "Nineteen lines: five tercets and a closing quatrain on two rhymes. Line 1 \
                   returns as lines 6, 12 and 18; line 3 returns as lines 9, 15 and 19.",
    },
    FormSpec {
        name: "ballad",
        kind: UnitKind::Lines,
        length: Length::Chosen {
            default: 8,
            min: 4,
            max: 40,
        },
        guidance: "Narrative quatrains rhyming ABCB, alternating lines of eight and six \
                   syllables. Tell part of a story; dialogue and refrains are welcome.",
    },
    FormSpec {
        name: "ghazal",
        kind: UnitKind::Lines,
        length: Length::Chosen {
            default: 10,
            min: 4,
            max: 30,
        },
        guidance: "Independent couplets. Both lines of the first couplet, and the second line \
                   of every later couplet, end on the same rhyme followed by a repeated refrain \
                   word or phrase. Themes of longing and loss.",
    },
    FormSpec {
        name: "prose",
        kind: UnitKind::Paragraphs,
        length: Length::Chosen {
            default: 3,
            min: 1,
            max: 10,
        },
        guidance: "Lyrical prose poetry in full sentences with vivid imagery and rhythm, \
                   without line breaks inside a paragraph.",
    },
];

const FORMATTING_RULES: &str = "Return only the poem itself: no title, no preamble, no \
                                commentary, no markdown, no quotation marks around it.";

/// Structural constraints applied to every turn of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormConstraints {
    pub form_name: String,
    pub unit_count: u32,
    pub unit_kind: UnitKind,
}

impl FormConstraints {
    /// Looks `form` up in the table. `length` only applies to forms whose
    /// length is chosen per session and is clamped to the form's range.
    pub fn lookup(form: &str, length: Option<u32>) -> Result<Self, ConfigurationError> {
        let spec = find(form)?;
        let unit_count = match spec.length {
            Length::Fixed(n) => {
                if let Some(requested) = length.filter(|l| *l != n) {
                    log::debug!("Ignoring length {requested} for fixed-length {}", spec.name);
                }
                n
            }
            Length::Chosen { default, min, max } => length.unwrap_or(default).clamp(min, max),
        };
        Ok(Self {
            form_name: spec.name.to_string(),
            unit_count,
            unit_kind: spec.kind,
        })
    }

    /// Form-specific guidance plus general formatting rules.
    pub fn guidance(&self) -> String {
        let structure = find(&self.form_name)
            .map(|spec| spec.guidance)
            .unwrap_or_default();
        format!(
            "Form: {} ({} {}). {}\n{}",
            self.form_name,
            self.unit_count,
            self.unit_kind.noun(self.unit_count),
            structure,
            FORMATTING_RULES
        )
    }

    /// Short form like "haiku of 3 lines".
    pub fn describe(&self) -> String {
        format!(
            "{} of {} {}",
            self.form_name,
            self.unit_count,
            self.unit_kind.noun(self.unit_count)
        )
    }
}

impl fmt::Display for FormConstraints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

impl FromStr for FormConstraints {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::lookup(s, None)
    }
}

fn find(form: &str) -> Result<&'static FormSpec, ConfigurationError> {
    let wanted = form.trim().to_ascii_lowercase();
    FORMS
        .iter()
        .find(|spec| spec.name == wanted)
        .ok_or_else(|| ConfigurationError::UnknownForm(form.trim().to_string()))
}

/// Names of every known form, in table order.
pub fn form_names() -> impl Iterator<Item = &'static str> {
    FORMS.iter().map(|spec| spec.name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("haiku", None, 3, UnitKind::Lines)]
    #[case("Sonnet", None, 14, UnitKind::Lines)]
    #[case("villanelle", Some(4), 19, UnitKind::Lines)]
    #[case("ballad", None, 8, UnitKind::Lines)]
    #[case("ghazal", Some(12), 12, UnitKind::Lines)]
    #[case("prose", Some(5), 5, UnitKind::Paragraphs)]
    #[case("prose", Some(99), 10, UnitKind::Paragraphs)]
    fn table_lookup(
        #[case] form: &str,
        #[case] length: Option<u32>,
        #[case] count: u32,
        #[case] kind: UnitKind,
    ) {
        let constraints = FormConstraints::lookup(form, length).unwrap();
        assert_eq!(constraints.unit_count, count);
        assert_eq!(constraints.unit_kind, kind);
    }

    #[test]
    fn unknown_forms_are_configuration_errors() {
        let err = FormConstraints::lookup("epic", None).unwrap_err();
        assert_eq!(err.reason(), "unknown_form");
    }

    #[test]
    fn guidance_names_structure_and_formatting() {
        let text = FormConstraints::lookup("haiku", None).unwrap().guidance();
        assert!(text.contains("3 lines"));
        assert!(text.contains("5-7-5"));
        assert!(text.contains("Return only the poem"));
    }

    #[test]
    fn singular_units_read_naturally() {
        let prose = FormConstraints::lookup("prose", Some(1)).unwrap();
        assert_eq!(prose.describe(), "prose of 1 paragraph");
    }

    #[test]
    fn every_form_is_listed() {
        assert_eq!(form_names().count(), 8);
        for name in form_names() {
            assert!(name.parse::<FormConstraints>().is_ok());
        }
    }
}
