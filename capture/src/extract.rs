use crossai_types::Turn;
use std::collections::HashSet;

use crate::dom::{Document, Element};
use crate::platform::Platform;

/// Read the visible conversation and build one turn per complete pair.
///
/// Pairs are matched by position and truncated to the shorter side; while
/// a response streams in the DOM can briefly hold an unmatched trailing
/// node. A pair whose assistant text is blank is skipped until it has
/// content. Identical pairs collapse to their first occurrence.
pub fn extract_candidates<D: Document>(doc: &D, platform: &Platform) -> Vec<Turn> {
    let nodes = platform.conversation_turns(doc);
    let count = nodes.user.len().min(nodes.assistant.len());
    if nodes.user.len() != nodes.assistant.len() {
        tracing::debug!(
            platform = %platform.id,
            user = nodes.user.len(),
            assistant = nodes.assistant.len(),
            "unbalanced conversation nodes; truncating"
        );
    }

    let mut seen = HashSet::new();
    let mut turns = Vec::with_capacity(count);
    for (user, assistant) in nodes.user.iter().zip(nodes.assistant.iter()).take(count) {
        let response = assistant.text();
        if response.trim().is_empty() {
            continue;
        }
        let turn = Turn::new(user.text(), platform.id, response);
        if seen.insert(turn.clone()) {
            turns.push(turn);
        }
    }
    turns
}
