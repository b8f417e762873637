use crate::forms::FormConstraints;

use super::types::{Transcript, Turn};

const STOPWORDS: &[&str] = &[
    "all", "any", "are", "can", "for", "had", "has", "her", "him", "his", "how", "its", "nor",
    "not", "now", "off", "our", "out", "she", "the", "too", "was", "who", "why", "yet", "you",
    "about", "above", "across", "after", "again", "against", "along", "also", "among", "and",
    "another", "around", "because", "been", "before", "behind", "being", "below", "beneath",
    "beside", "between", "beyond", "both", "but", "came", "cannot", "could", "does", "doing",
    "down", "during", "each", "even", "every", "from", "further", "have", "having", "here",
    "herself", "himself", "into", "itself", "just", "like", "more", "most", "much", "myself",
    "never", "nothing", "once", "only", "other", "ours", "ourselves", "over", "same", "shall",
    "should", "some", "something", "still", "such", "than", "that", "their", "theirs", "them",
    "themselves", "then", "there", "these", "they", "this", "those", "through", "toward",
    "towards", "under", "until", "upon", "very", "want", "were", "what", "when", "where",
    "whether", "which", "while", "whose", "will", "with", "within", "without", "would", "your",
    "yours", "yourself", "yourselves",
];

pub(crate) const ELISION_MARKER: &str = "[... earlier turns omitted ...]";

/// Longest non-stopword token of `text`; the first one wins ties.
pub fn salient_word(text: &str) -> Option<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .map(|token| token.trim_matches('\''))
        .filter(|token| token.chars().count() >= 3)
        .filter(|token| !STOPWORDS.contains(&token.to_lowercase().as_str()))
        .fold(None::<&str>, |best, token| match best {
            Some(b) if b.chars().count() >= token.chars().count() => Some(b),
            _ => Some(token),
        })
        .map(str::to_string)
}

/// Builds every prompt an agent sees during a session.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    theme: String,
    form: FormConstraints,
    context_char_budget: usize,
}

impl PromptBuilder {
    pub fn new(theme: impl Into<String>, form: FormConstraints, context_char_budget: usize) -> Self {
        Self {
            theme: theme.into(),
            form,
            context_char_budget,
        }
    }

    pub fn theme(&self) -> &str {
        &self.theme
    }

    pub fn form(&self) -> &FormConstraints {
        &self.form
    }

    pub fn title(&self) -> String {
        format!(
            "Create a short, poetic title (2-4 words) for a poetic dialogue on this theme: {}. \
             Return only the title, nothing else.",
            self.theme
        )
    }

    /// Prompt for ordinal 0: the theme plus the form.
    pub fn opening(&self, agent_name: &str, partner_name: &str) -> String {
        format!(
            "You are {agent_name}, opening a poetic dialogue with {partner_name}.\n\
             Write the first poem on the theme: {theme}.\n\
             Write it as a {form}.\n\n{guidance}",
            theme = self.theme,
            form = self.form.describe(),
            guidance = self.form.guidance(),
        )
    }

    /// Prompt for ordinal > 0. Quotes the previous turn verbatim, names one of
    /// its salient words to echo, and carries as much earlier context as the
    /// budget allows.
    pub fn response(&self, agent_name: &str, transcript: &Transcript) -> String {
        let Some(previous) = transcript.last() else {
            return self.opening(agent_name, "your partner");
        };
        let earlier = &transcript.turns()[..transcript.len() - 1];
        let budget = self
            .context_char_budget
            .saturating_sub(previous.text.chars().count());

        let mut prompt = format!(
            "You are {agent_name}, continuing a poetic dialogue with {partner} on the theme: {theme}.\n",
            partner = previous.speaker.name,
            theme = self.theme,
        );
        if !earlier.is_empty() {
            prompt.push_str("\nThe dialogue so far:\n");
            prompt.push_str(&render_context(earlier, budget));
            prompt.push('\n');
        }
        prompt.push_str(&format!(
            "\n{partner} just wrote:\n\"\"\"\n{text}\n\"\"\"\n\n\
             Respond to it directly, picking up its images and words.",
            partner = previous.speaker.name,
            text = previous.text,
        ));
        if let Some(word) = salient_word(&previous.text) {
            prompt.push_str(&format!(" Echo the word \"{word}\" somewhere in your poem."));
        }
        prompt.push_str(&format!(
            "\nWrite your response as a {form}.\n\n{guidance}",
            form = self.form.describe(),
            guidance = self.form.guidance(),
        ));
        prompt
    }
}

fn render_turn(turn: &Turn) -> String {
    format!("[{}] {}:\n{}\n", turn.ordinal + 1, turn.speaker.name, turn.text)
}

/// Renders `turns`, dropping the oldest ones when over `budget` characters.
fn render_context(turns: &[Turn], budget: usize) -> String {
    let rendered: Vec<String> = turns.iter().map(render_turn).collect();
    let mut used = 0;
    let mut keep_from = rendered.len();
    for (idx, block) in rendered.iter().enumerate().rev() {
        let len = block.chars().count();
        if used + len > budget {
            break;
        }
        used += len;
        keep_from = idx;
    }

    let mut out = String::new();
    if keep_from > 0 {
        out.push_str(ELISION_MARKER);
        out.push('\n');
    }
    for block in &rendered[keep_from..] {
        out.push_str(block);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("the snow is falling softly", Some("falling"))]
    #[case("And then there were those", None)]
    #[case("lanterns, lanterns; river", Some("lanterns"))]
    #[case("hush", Some("hush"))]
    #[case("", None)]
    fn picks_the_longest_content_word(#[case] text: &str, #[case] expected: Option<&str>) {
        assert_eq!(salient_word(text).as_deref(), expected);
    }

    #[test]
    fn empty_context_renders_nothing() {
        assert_eq!(render_context(&[], 10), "");
    }
}
