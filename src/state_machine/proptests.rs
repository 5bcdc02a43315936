//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across all possible inputs.

use super::*;
use crate::llm::LlmError;
use crate::persona::AgentId;
use crate::store::Message;
use proptest::prelude::*;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_agent() -> impl Strategy<Value = AgentId> {
    prop_oneof![Just(AgentId::Ether), Just(AgentId::Aurora)]
}

fn arb_system() -> impl Strategy<Value = SystemState> {
    prop_oneof![
        Just(SystemState::Thinking),
        Just(SystemState::Speaking),
        Just(SystemState::ExecutingTool),
    ]
}

fn arb_state() -> impl Strategy<Value = DialogueState> {
    (arb_system(), arb_agent(), 0u64..10).prop_map(|(system, turn, cycle)| DialogueState {
        system,
        turn,
        cycle,
    })
}

fn arb_reply_text() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-zA-Z .,!]{0,40}",
        "[a-z ]{0,10}".prop_map(|s| format!("{s} [TOOL:SEARCH:bash history]")),
        "[a-z ]{0,10}".prop_map(|s| format!("{s} [TOOL:EXECUTE:ls -la]")),
        Just("[TOOL:UNKNOWN:thing]".to_string()),
        Just("[TOOL:broken".to_string()),
    ]
}

fn arb_llm_error() -> impl Strategy<Value = LlmError> {
    prop_oneof![
        Just(LlmError::connection("refused")),
        Just(LlmError::decode("not json")),
        Just(LlmError::service("model missing")),
        Just(LlmError::malformed_response("no response field")),
    ]
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        Just(Event::Start),
        Just(Event::Quit),
        "[a-z ]{0,12}".prop_map(|text| Event::UserSubmit { text }),
        (arb_agent(), arb_reply_text()).prop_map(|(agent, text)| Event::GenerationResult {
            agent,
            result: Ok(text),
        }),
        (arb_agent(), arb_llm_error()).prop_map(|(agent, e)| Event::GenerationResult {
            agent,
            result: Err(e),
        }),
        (0u64..10, "[a-z ]{0,20}").prop_map(|(cycle, output)| Event::ToolResult { cycle, output }),
        (arb_agent(), 0u64..10).prop_map(|(agent, cycle)| Event::SpeechDone { agent, cycle }),
    ]
}

fn requested(effects: &[Effect]) -> Vec<AgentId> {
    effects
        .iter()
        .filter_map(|e| match e {
            Effect::RequestGeneration { agent } => Some(*agent),
            _ => None,
        })
        .collect()
}

/// How a simulated reply resolves
#[derive(Debug, Clone, Copy)]
enum Reply {
    Plain,
    /// Tool reply; `speech_first` picks which completion arrives first
    Tool { speech_first: bool },
}

fn arb_reply() -> impl Strategy<Value = Reply> {
    prop_oneof![
        Just(Reply::Plain),
        any::<bool>().prop_map(|speech_first| Reply::Tool { speech_first }),
    ]
}

/// Drive the machine like the runtime would, answering every effect with
/// its completion event. Returns the agents for which generation was
/// requested, in order.
fn simulate(replies: &[Reply]) -> Vec<AgentId> {
    let ctx = DialogueContext::default();
    let mut state = DialogueState::default();
    let mut pending: Vec<Event> = vec![Event::Start];
    let mut requests = Vec::new();
    let mut replies = replies.iter();
    // The opening line carries a directive; its tool result lands first
    let mut current = Reply::Tool { speech_first: false };

    while let Some(event) = pending.pop() {
        let result = transition(&state, &ctx, event).expect("simulated event must be accepted");
        state = result.new_state;

        let mut speech = None;
        let mut tool = None;
        for effect in result.effects {
            match effect {
                Effect::RequestGeneration { agent } => {
                    requests.push(agent);
                    let Some(reply) = replies.next() else {
                        return requests;
                    };
                    current = *reply;
                    let text = match reply {
                        Reply::Plain => "plain words".to_string(),
                        Reply::Tool { .. } => "[TOOL:SEARCH:x]".to_string(),
                    };
                    pending.push(Event::GenerationResult {
                        agent,
                        result: Ok(text),
                    });
                }
                Effect::Speak { agent, cycle, .. } => {
                    speech = Some(Event::SpeechDone { agent, cycle });
                }
                Effect::ExecuteTool { cycle, .. } => {
                    tool = Some(Event::ToolResult {
                        cycle,
                        output: "result".to_string(),
                    });
                }
                _ => {}
            }
        }

        // `pending` is a stack: push the later event first
        match (speech, tool) {
            (Some(s), Some(t)) => {
                if matches!(current, Reply::Tool { speech_first: true }) {
                    pending.push(t);
                    pending.push(s);
                } else {
                    pending.push(s);
                    pending.push(t);
                }
            }
            (Some(s), None) => pending.push(s),
            (None, Some(t)) => pending.push(t),
            (None, None) => {}
        }
    }
    requests
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Transitions never panic, and rejected events leave nothing behind
    #[test]
    fn prop_arbitrary_sequences_are_handled(events in proptest::collection::vec(arb_event(), 0..30)) {
        let ctx = DialogueContext::default();
        let mut state = DialogueState::default();
        for event in events {
            let before = state;
            if let Ok(result) = transition(&state, &ctx, event) {
                prop_assert!(result.new_state.cycle >= before.cycle);
                state = result.new_state;
            }
        }
    }

    /// A transition flips the turn at most once, and only together with a
    /// generation request for the new owner
    #[test]
    fn prop_turn_flips_only_with_request(state in arb_state(), event in arb_event()) {
        // Start hands the turn to the opening speaker, which the initial state already holds
        prop_assume!(!matches!(event, Event::Start));
        let ctx = DialogueContext::default();
        if let Ok(result) = transition(&state, &ctx, event) {
            let requests = requested(&result.effects);
            prop_assert!(requests.len() <= 1);
            if result.new_state.turn != state.turn {
                prop_assert_eq!(requests, vec![result.new_state.turn]);
            }
            if let Some(agent) = requested(&result.effects).first() {
                prop_assert_eq!(*agent, result.new_state.turn);
                prop_assert_eq!(result.new_state.system, SystemState::Thinking);
            }
        }
    }

    /// Any reply is in history before the next generation is requested
    #[test]
    fn prop_append_precedes_request(state in arb_state(), event in arb_event()) {
        let ctx = DialogueContext::default();
        if let Ok(result) = transition(&state, &ctx, event) {
            let append = result.effects.iter().position(|e| matches!(e, Effect::AppendMessage(_)));
            let request = result.effects.iter().position(|e| matches!(e, Effect::RequestGeneration { .. }));
            if let (Some(a), Some(r)) = (append, request) {
                prop_assert!(a < r);
            }
        }
    }

    /// Failed generations never speak, run tools or flip the turn
    #[test]
    fn prop_generation_error_stalls(turn in arb_agent(), cycle in 0u64..10, error in arb_llm_error()) {
        let ctx = DialogueContext::default();
        let state = DialogueState { system: SystemState::Thinking, turn, cycle };
        let result = transition(&state, &ctx, Event::GenerationResult { agent: turn, result: Err(error) }).unwrap();
        prop_assert_eq!(result.new_state, state);
        let is_system_append = matches!(
            &result.effects[0],
            Effect::AppendMessage(Message { role: crate::store::Role::System, .. })
        );
        prop_assert!(is_system_append);
        prop_assert!(requested(&result.effects).is_empty());
        let spoke_or_ran = result
            .effects
            .iter()
            .any(|e| matches!(e, Effect::Speak { .. } | Effect::ExecuteTool { .. }));
        prop_assert!(!spoke_or_ran);
    }

    /// Every successful reply is spoken exactly once
    #[test]
    fn prop_reply_spoken_once(turn in arb_agent(), cycle in 0u64..10, text in arb_reply_text()) {
        let ctx = DialogueContext::default();
        let state = DialogueState { system: SystemState::Thinking, turn, cycle };
        let result = transition(&state, &ctx, Event::GenerationResult { agent: turn, result: Ok(text) }).unwrap();
        let speaks = result.effects.iter().filter(|e| matches!(e, Effect::Speak { .. })).count();
        prop_assert_eq!(speaks, 1);
        prop_assert_eq!(result.new_state.cycle, cycle + 1);
    }

    /// Quit always stops, whatever the state
    #[test]
    fn prop_quit_stops(state in arb_state()) {
        let result = transition(&state, &DialogueContext::default(), Event::Quit).unwrap();
        prop_assert_eq!(result.effects, vec![Effect::Stop]);
    }

    /// Driving full reply cycles, generation requests strictly alternate
    /// between the agents regardless of completion order
    #[test]
    fn prop_turns_strictly_alternate(replies in proptest::collection::vec(arb_reply(), 1..25)) {
        let requests = simulate(&replies);
        prop_assert!(!requests.is_empty());
        // The opening line is Ether's, so Aurora answers first
        prop_assert_eq!(requests[0], AgentId::Aurora);
        for pair in requests.windows(2) {
            prop_assert_ne!(pair[0], pair[1]);
        }
    }
}
