//! Rendering stored context and writing it into the chat input box.

use crossai_types::{PlatformId, Turn};

use crate::dom::InputField;

pub const TURN_SEPARATOR: &str = "\n\n---\n\n";

const CONTEXT_PREAMBLE: &str = "Here is some persistent user context you should always consider:";
const QUERY_HEADING: &str = "User's query:";

pub fn format_turn(turn: &Turn) -> String {
    let (key, response) = turn.response().unwrap_or(("", ""));
    format!(
        "User: {}\n{}'s Response: {}",
        turn.user(),
        PlatformId::label_for(key),
        response
    )
}

/// All turns as one block, in the order given.
pub fn format_for_injection(turns: &[Turn]) -> String {
    turns
        .iter()
        .map(format_turn)
        .collect::<Vec<_>>()
        .join(TURN_SEPARATOR)
}

/// Wrap `context` around whatever the user already typed.
pub fn compose_injection(context: &str, existing: &str) -> String {
    format!("{CONTEXT_PREAMBLE}\n\n{context}\n\n{QUERY_HEADING}\n\n{existing}")
}

/// Prepend `context` to the field's draft and leave the caret at the end.
/// Returns false, without touching anything, when there is no field.
pub fn inject_into_field<F: InputField>(field: Option<&F>, context: &str) -> bool {
    let Some(field) = field else {
        tracing::debug!("no input field to inject into");
        return false;
    };

    let rich = field.is_content_editable();
    let existing = if rich {
        field.inner_text()
    } else {
        field.value()
    };
    let message = compose_injection(context, existing.trim());

    if rich {
        field.set_inner_text(&message);
        field.dispatch_event("input");
    } else {
        field.set_value(&message);
        field.dispatch_event("input");
        field.dispatch_event("change");
    }

    field.focus();
    field.place_caret_at_end();
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::memory::MemoryNode;

    #[test]
    fn formats_turns_with_platform_label() {
        let turns = vec![
            Turn::new("q1", PlatformId::ChatGpt, "a1"),
            Turn::new("q2", PlatformId::Gemini, "a2"),
        ];
        assert_eq!(
            format_for_injection(&turns),
            "User: q1\nChatGPT's Response: a1\n\n---\n\nUser: q2\nGemini's Response: a2"
        );
        assert_eq!(format_for_injection(&[]), "");
    }

    #[test]
    fn rich_field_keeps_draft_after_context() {
        let field = MemoryNode::editable("hello");
        assert!(inject_into_field(Some(&field), "ctx"));
        assert_eq!(
            field.inner_text(),
            "Here is some persistent user context you should always consider:\n\nctx\n\nUser's query:\n\nhello"
        );
        assert_eq!(field.events(), vec!["input".to_string()]);
        assert!(field.is_focused());
        assert_eq!(field.caret(), Some(field.inner_text().chars().count()));
    }

    #[test]
    fn plain_field_fires_input_and_change() {
        let field = MemoryNode::plain_field("  draft  ");
        assert!(inject_into_field(Some(&field), "ctx"));
        assert!(field.value().ends_with("User's query:\n\ndraft"));
        assert_eq!(field.events(), vec!["input".to_string(), "change".to_string()]);
        assert_eq!(field.caret(), Some(field.value().chars().count()));
    }

    #[test]
    fn missing_field_is_a_noop() {
        assert!(!inject_into_field::<MemoryNode>(None, "ctx"));
    }
}
