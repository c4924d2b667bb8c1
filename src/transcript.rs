use serde::Serialize;

const AGENT_PREFIX: &str = "AI:";
const COUNTERPARTY_PREFIX: &str = "User:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    Agent,
    Counterparty,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Turn {
    pub speaker: Speaker,
    pub text: String,
}

/// Splits a stored call transcript into turns.
///
/// Each non-blank line is one turn. Lines starting with `AI:` belong to the
/// agent; anything else, `User:` prefixed or not, to the person called.
pub fn parse_turns(raw: &str) -> Vec<Turn> {
    raw.lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            if let Some(rest) = line.strip_prefix(AGENT_PREFIX) {
                Turn {
                    speaker: Speaker::Agent,
                    text: rest.trim().to_string(),
                }
            } else {
                let text = line.strip_prefix(COUNTERPARTY_PREFIX).unwrap_or(line);
                Turn {
                    speaker: Speaker::Counterparty,
                    text: text.trim().to_string(),
                }
            }
        })
        .collect()
}
