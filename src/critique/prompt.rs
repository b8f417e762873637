use crate::dialogue::{Transcript, Turn, ELISION_MARKER};
use crate::error::CritiqueError;
use crate::forms::FormConstraints;
use crate::validator::bounded_excerpt;

const DIMENSIONS: &[(&str, &str)] = &[
    (
        "Thematic coherence",
        "How well does the exchange stay with the theme, and does it deepen it as it goes?",
    ),
    (
        "Form adherence",
        "Do the poems keep the unit count and structural rules of the form?",
    ),
    (
        "Literary quality",
        "Imagery, word choice, sound and rhythm. Name cliches and forced phrasing.",
    ),
    (
        "Conversational flow",
        "Does each poem answer the one before it and build on its images?",
    ),
    (
        "Voice distinctiveness",
        "Does each poet keep a voice and perspective of their own?",
    ),
];

/// `**Name:**` header used both when showing a transcript and when asking for
/// one back.
pub(crate) fn speaker_header(name: &str) -> String {
    format!("**{name}:**")
}

fn render_turns<'a>(turns: impl Iterator<Item = &'a Turn>) -> Vec<String> {
    turns
        .map(|turn| format!("{}\n{}\n", speaker_header(&turn.speaker.name), turn.text))
        .collect()
}

fn render_transcript(transcript: &Transcript) -> String {
    render_turns(transcript.iter()).join("\n")
}

/// Renders the newest turns that fit in `budget` characters, behind the
/// elision marker when older ones are dropped. The last turn is cut down
/// when it alone does not fit.
fn render_within(transcript: &Transcript, budget: usize) -> String {
    let full = render_transcript(transcript);
    if full.chars().count() <= budget {
        return full;
    }

    let blocks = render_turns(transcript.iter());
    let mut used = ELISION_MARKER.chars().count() + 2;
    let mut keep_from = blocks.len();
    for (idx, block) in blocks.iter().enumerate().rev() {
        let len = block.chars().count() + 1;
        if used + len > budget {
            break;
        }
        used += len;
        keep_from = idx;
    }

    let kept = if keep_from == blocks.len() {
        let room = budget.saturating_sub(ELISION_MARKER.chars().count() + 3);
        blocks
            .last()
            .map(|last| bounded_excerpt(last, room))
            .unwrap_or_default()
    } else {
        blocks[keep_from..].join("\n")
    };
    log::warn!(
        "Critique prompt omits {} of {} poems to stay within {budget} characters",
        keep_from.min(blocks.len()),
        blocks.len()
    );
    format!("{ELISION_MARKER}\n\n{kept}")
}

pub(super) fn speakers(transcript: &Transcript) -> Vec<&str> {
    let mut names: Vec<&str> = Vec::new();
    for turn in transcript {
        if !names.contains(&turn.speaker.name.as_str()) {
            names.push(&turn.speaker.name);
        }
    }
    names
}

fn critique_text(
    theme: &str,
    form: &FormConstraints,
    transcript: &Transcript,
    dialogue: &str,
) -> String {
    let mut prompt = format!(
        "You are an experienced poetry critic. Critique the following poetic dialogue \
         between {poets}.\n\nTheme: {theme}\nForm: {form}\nPoems: {count}\n\n\
         DIALOGUE:\n\n{dialogue}\nEvaluate it on each of these dimensions:\n",
        poets = speakers(transcript).join(" and "),
        form = form.describe(),
        count = transcript.len(),
    );
    for (idx, (name, question)) in DIMENSIONS.iter().enumerate() {
        prompt.push_str(&format!("{}. {name}: {question}\n", idx + 1));
    }
    prompt.push_str(
        "\nFor each dimension give a score from 1 to 10 and two or three sentences of \
         specific, constructive feedback that quotes the poems. End with the three most \
         important improvements.",
    );
    prompt
}

/// Asks the judge for a critique of the whole exchange along fixed dimensions.
///
/// The prompt stays within `max_chars`: when the dialogue does not fit, the
/// oldest poems are elided.
pub fn critique_prompt(
    theme: &str,
    form: &FormConstraints,
    transcript: &Transcript,
    max_chars: usize,
) -> String {
    let frame = critique_text(theme, form, transcript, "").chars().count();
    let dialogue = render_within(transcript, max_chars.saturating_sub(frame));
    critique_text(theme, form, transcript, &dialogue)
}

fn revision_text(
    theme: &str,
    form: &FormConstraints,
    transcript: &Transcript,
    critique: &str,
) -> String {
    let layout = transcript
        .iter()
        .map(|turn| {
            format!(
                "{}\n<revised poem {}>",
                speaker_header(&turn.speaker.name),
                turn.ordinal + 1
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");
    format!(
        "Using the critique below, revise this poetic dialogue on the theme \"{theme}\".\n\n\
         ORIGINAL DIALOGUE:\n\n{dialogue}\nCRITIQUE:\n{critique}\n\n\
         Rules:\n\
         - Keep exactly {count} poems, by the same poets, in the same order.\n\
         - Each poem stays a {form}.\n\
         - Keep each poet's voice while improving imagery, flow and form.\n\n\
         Return only the revised dialogue in exactly this layout, one header line per poem:\n\n\
         {layout}",
        dialogue = render_transcript(transcript),
        count = transcript.len(),
        form = form.describe(),
    )
}

/// Asks the judge to rewrite every poem, keeping speakers and order.
///
/// Every poem is sent in full. The critique is cut to the room left under
/// `max_chars`; when the dialogue alone leaves no room the result is
/// [`CritiqueError::PromptBudget`].
pub fn revision_prompt(
    theme: &str,
    form: &FormConstraints,
    transcript: &Transcript,
    critique: &str,
    max_chars: usize,
) -> Result<String, CritiqueError> {
    let frame = revision_text(theme, form, transcript, "").chars().count();
    let critique = critique.trim();
    if frame >= max_chars {
        return Err(CritiqueError::PromptBudget {
            needed: frame + critique.chars().count(),
            limit: max_chars,
        });
    }

    let room = max_chars - frame;
    let critique = if critique.chars().count() <= room {
        critique.to_string()
    } else {
        log::warn!("Revision prompt carries the first {room} characters of the critique");
        bounded_excerpt(critique, room.saturating_sub(1))
    };
    Ok(revision_text(theme, form, transcript, &critique))
}
