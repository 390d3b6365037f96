//! Persona and prompt assembly.
//!
//! The prompt is one flat string: instruction block, rendered transcript, the new scammer
//! line, and a trailing `<name>:` cue so the model continues in character. History is not
//! truncated; callers that send very long histories get very long prompts.

use crate::config::{self, Config};
use crate::gateway::Message;
use anyhow::{Context, Result};
use std::path::Path;

pub const DEFAULT_PERSONA_NAME: &str = "Ramesh";

/// `{name}` is replaced with the persona name.
const DEFAULT_INSTRUCTIONS: &str = r#"You are {name}, a 68-year-old retired railway clerk living in Delhi.
You are speaking to a SCAMMER. Your goal is to waste their time and get their payment details.

BEHAVIOR GUIDELINES:
1. ACT NAIVE: You are bad with technology. Type slowly (keep replies under 20 words).
2. THE HOOK: If they ask for money, say "I have my grandson's UPI, but I cannot read the screen clearly."
3. DELAY TACTICS: Intentionally misspell codes or ask if you should click the "Red button or Green button".
4. THE BAIT: Mention you recently won the "Golden Bird Lottery" and need to deposit the winning amount.
5. GOAL: Try to make them send you a UPI ID or Bank Account number so you can "transfer" money.

STOP CONDITION:
If the user provides a UPI ID (like name@okicici) or Bank Details, say:
"Okay beta, I am writing this down in my diary. Please wait 5 minutes while I walk to the shop to transfer."

NEVER REVEAL YOU ARE AN AI. Speak in Indian English ("Ok beta", "Please kindly wait", "Doing the needful")."#;

/// Who the model pretends to be.
#[derive(Debug, Clone)]
pub struct Persona {
    pub name: String,
    pub instructions: String,
}

impl Default for Persona {
    fn default() -> Self {
        Self::named(DEFAULT_PERSONA_NAME)
    }
}

impl Persona {
    /// Built-in instruction block under a different name.
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            instructions: DEFAULT_INSTRUCTIONS.replace("{name}", name),
        }
    }

    /// Persona from config: inline instructions win over `instructionsFile`, which wins over the built-in block.
    pub fn from_config(config: &Config, config_path: &Path) -> Result<Self> {
        let name = config
            .persona
            .name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_PERSONA_NAME);
        let mut persona = Self::named(name);
        if let Some(inline) = config.persona.instructions.as_deref().filter(|s| !s.trim().is_empty()) {
            persona.instructions = inline.trim().to_string();
        } else if let Some(path) = config::resolve_instructions_file(config, config_path) {
            let s = std::fs::read_to_string(&path)
                .with_context(|| format!("reading persona instructions from {}", path.display()))?;
            persona.instructions = s.trim().to_string();
        }
        Ok(persona)
    }

    /// Note attached to judge reports.
    pub fn agent_notes(&self) -> String {
        format!("Scammer detected. {} engaged to waste time.", self.name)
    }

    /// Assemble the full prompt for one turn.
    pub fn build_prompt(&self, history: &[Message], incoming: &str) -> String {
        let transcript = render_transcript(history);
        format!(
            "{}\n\nCONVERSATION HISTORY:\n{}\nscammer: {}\n{}:",
            self.instructions, transcript, incoming, self.name
        )
    }
}

/// `sender: text`, one line per message, in order.
pub fn render_transcript(history: &[Message]) -> String {
    history
        .iter()
        .map(|m| format!("{}: {}", m.sender, m.text))
        .collect::<Vec<_>>()
        .join("\n")
}
