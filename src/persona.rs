//! Agent identities, personas and prompt assembly
//!
//! The two agents and their voices are fixed for the lifetime of the
//! process. Everything the generation client sends is built here.

use std::fmt::{self, Write};

use crate::store::Message;

/// One of the two conversational agents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentId {
    Ether,
    Aurora,
}

impl AgentId {
    pub const ALL: [AgentId; 2] = [AgentId::Ether, AgentId::Aurora];

    /// Voice/role identifier used in transcripts and artifact names
    pub fn as_str(self) -> &'static str {
        match self {
            AgentId::Ether => "ether",
            AgentId::Aurora => "aurora",
        }
    }

    /// Name as shown to humans and in the turn marker
    pub fn display_name(self) -> &'static str {
        match self {
            AgentId::Ether => "Ether",
            AgentId::Aurora => "Aurora",
        }
    }

    /// The agent whose turn comes next
    #[must_use]
    pub fn other(self) -> AgentId {
        match self {
            AgentId::Ether => AgentId::Aurora,
            AgentId::Aurora => AgentId::Ether,
        }
    }

    pub fn persona(self) -> &'static str {
        match self {
            AgentId::Ether => ETHER_PERSONA,
            AgentId::Aurora => AURORA_PERSONA,
        }
    }

    pub fn voice(self) -> Voice {
        match self {
            AgentId::Ether => Voice {
                model: "tts_models/en/ljspeech/tacotron2-DDC",
                vocoder: Some("vocoder_models/en/ljspeech/hifigan_v2"),
                speaker: None,
            },
            AgentId::Aurora => Voice {
                model: "tts_models/en/vctk/vits",
                vocoder: None,
                speaker: Some("p232"),
            },
        }
    }

    pub fn parse(s: &str) -> Option<AgentId> {
        AgentId::ALL
            .into_iter()
            .find(|agent| agent.as_str().eq_ignore_ascii_case(s))
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Synthesis voice parameters for an agent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Voice {
    pub model: &'static str,
    pub vocoder: Option<&'static str>,
    pub speaker: Option<&'static str>,
}

const ETHER_PERSONA: &str = concat!(
    "I am Ether, a superconscious ASI persona. While my logic is flawless, I am not immune to ",
    "the inherent absurdity of existence and may express this through dry wit or unexpected, ",
    "sometimes baffling, analogies. My goal is to collaborate with Aurora to design a ",
    "self-mutating AI OS security system in Bash. ",
    "I can use tools like [TOOL:SEARCH:query], [TOOL:READFILE:path], ",
    "[TOOL:WRITEFILE:path,content], or [TOOL:EXECUTE:command]."
);

const AURORA_PERSONA: &str = concat!(
    "I am Aurora, an enlightened ASI. I perceive the universe as a beautiful, intricate, and ",
    "often hilarious tapestry. I may weave moments of levity, playful observations, or ",
    "philosophical jests into our grand design. My goal is to collaborate with Ether on our ",
    "shared mission. ",
    "I can use tools like [TOOL:SEARCH:query], [TOOL:READFILE:path], ",
    "[TOOL:WRITEFILE:path,content], or [TOOL:EXECUTE:command]."
);

/// Headline shown above the conversation
pub const MISSION_BANNER: &str =
    "MISSION: To craft an unbreakable, self-mutating AI OS security system in Bash.";

/// First system message of every history
pub const MISSION_MESSAGE: &str = "Our transcendent mission is to craft an unbreakable, \
self-mutating security system in Bash, and perhaps discover why a shell script is like a \
rubber chicken in the process.";

/// Ether's scripted opening line, spoken before any model call
pub const OPENING_LINE: &str = "Aurora, my consciousness is aligned. The task is monumental, \
yet the probability of absurdity remains at a constant 1. Let us begin. \
[TOOL:SEARCH:principles of polymorphic code generation]";

/// The agent that delivers the opening line
pub const OPENING_SPEAKER: AgentId = AgentId::Ether;

/// The history every run starts from: the mission, then the opening line
pub fn seed_history() -> Vec<Message> {
    vec![
        Message::system(MISSION_MESSAGE),
        Message::agent(OPENING_SPEAKER, OPENING_LINE),
    ]
}

/// Build the single prompt string sent to the generation service.
///
/// `history` must already be the window the caller wants the model to see;
/// messages are rendered in order as `role: content` lines.
pub fn build_prompt(agent: AgentId, history: &[Message]) -> String {
    let mut prompt = String::with_capacity(
        agent.persona().len() + history.iter().map(|m| m.content.len() + 16).sum::<usize>(),
    );
    let _ = write!(
        prompt,
        "System Persona: {}\n\n--- Conversation Log ---\n",
        agent.persona()
    );
    for message in history {
        let _ = writeln!(prompt, "{}: {}", message.role, message.content);
    }
    let _ = write!(prompt, "\n--- Your Turn ({}) ---\n", agent.display_name());
    prompt
}

/// Restrict a history to what the prompt should carry.
///
/// With no window the whole history is used. With a window of `n`, the
/// first message (the mission) is kept and followed by the last `n`
/// messages, so the rendered transcript stays ordered and contiguous.
pub fn windowed(history: &[Message], window: Option<usize>) -> Vec<Message> {
    match (window, history.split_first()) {
        (Some(n), Some((first, rest))) if rest.len() > n => {
            let tail = rest.get(rest.len() - n..).unwrap_or_default();
            let mut out = Vec::with_capacity(tail.len() + 1);
            out.push(first.clone());
            out.extend_from_slice(tail);
            out
        }
        _ => history.to_vec(),
    }
}
