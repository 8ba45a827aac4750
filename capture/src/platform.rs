//! Supported chat UIs and where their conversation lives in the page.
//!
//! Each platform is a capability record selected once, when a page is
//! attached, and threaded through every later call. The selector strings
//! are data; only the three layout shapes below are logic.

use crossai_types::PlatformId;

use crate::dom::{Document, Element};

/// Icon asset keys used by the results panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformAssets {
    pub icon: &'static str,
    pub save_icon: &'static str,
    pub dismiss_icon: &'static str,
    pub toggle_icon: &'static str,
}

/// How user and assistant messages are laid out in a platform's thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnLayout {
    /// One selector matches every message; an attribute names the speaker.
    RoleAttribute {
        cards: &'static str,
        attr: &'static str,
        user: &'static str,
        assistant: &'static str,
    },
    /// One selector matches every message; speakers alternate, user first.
    Alternating { cards: &'static str },
    /// Each container holds one user child and one assistant child.
    Nested {
        containers: &'static str,
        user: &'static str,
        assistant: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    pub id: PlatformId,
    pub domains: &'static [&'static str],
    pub input_field: &'static str,
    pub layout: TurnLayout,
    pub assets: PlatformAssets,
}

/// User and assistant nodes in document order. Lengths may differ while
/// a response is still streaming in.
#[derive(Debug, Clone)]
pub struct TurnNodes<N> {
    pub user: Vec<N>,
    pub assistant: Vec<N>,
}

impl<N> Default for TurnNodes<N> {
    fn default() -> Self {
        Self {
            user: Vec::new(),
            assistant: Vec::new(),
        }
    }
}

const DISMISS_ICON: &str = "assets/cross.svg";
const TOGGLE_ICON: &str = "assets/crossai.svg";

const CLAUDE_THREAD_MESSAGES: &str = "body > div.root > div > div.w-full.relative.min-w-0 > div > div.h-full.flex.flex-col.overflow-hidden > div > div > div > div.flex-1.flex.flex-col.px-4.max-w-3xl.mx-auto.w-full.pt-1 > div[data-test-render-count]";

pub static PLATFORMS: [Platform; 3] = [
    Platform {
        id: PlatformId::ChatGpt,
        domains: &["chatgpt.com", "chat.openai.com"],
        input_field: "#prompt-textarea",
        layout: TurnLayout::RoleAttribute {
            cards: "article",
            attr: "data-turn",
            user: "user",
            assistant: "assistant",
        },
        assets: PlatformAssets {
            icon: "assets/chatgpt.svg",
            save_icon: "assets/save_chatgpt.svg",
            dismiss_icon: DISMISS_ICON,
            toggle_icon: TOGGLE_ICON,
        },
    },
    Platform {
        id: PlatformId::Claude,
        domains: &["claude.ai"],
        input_field: "div.ProseMirror[role='textbox']",
        layout: TurnLayout::Alternating {
            cards: CLAUDE_THREAD_MESSAGES,
        },
        assets: PlatformAssets {
            icon: "assets/claude.svg",
            save_icon: "assets/save_claude.svg",
            dismiss_icon: DISMISS_ICON,
            toggle_icon: TOGGLE_ICON,
        },
    },
    Platform {
        id: PlatformId::Gemini,
        domains: &["gemini.google.com"],
        input_field: "rich-textarea .ql-editor",
        layout: TurnLayout::Nested {
            containers: "#chat-history infinite-scroller > div:has(user-query):has(model-response)",
            user: "user-query",
            assistant: "model-response",
        },
        assets: PlatformAssets {
            icon: "assets/gemini.svg",
            save_icon: "assets/save_gemini.svg",
            dismiss_icon: DISMISS_ICON,
            toggle_icon: TOGGLE_ICON,
        },
    },
];

/// Find the platform serving `url`, matching its host or any subdomain.
pub fn identify(url: &str) -> Option<&'static Platform> {
    let host = host_of(url)?;
    PLATFORMS.iter().find(|p| {
        p.domains
            .iter()
            .any(|d| host == *d || host.ends_with(&format!(".{d}")))
    })
}

pub fn by_id(id: PlatformId) -> &'static Platform {
    match id {
        PlatformId::ChatGpt => &PLATFORMS[0],
        PlatformId::Claude => &PLATFORMS[1],
        PlatformId::Gemini => &PLATFORMS[2],
    }
}

fn host_of(url: &str) -> Option<String> {
    let rest = url.split_once("://").map(|(_, r)| r).unwrap_or(url);
    let authority = rest.split(['/', '?', '#']).next()?;
    let host_port = authority.rsplit('@').next()?;
    let host = host_port.split(':').next()?.trim().to_ascii_lowercase();
    if host.is_empty() {
        None
    } else {
        Some(host)
    }
}

impl Platform {
    pub fn label(&self) -> &'static str {
        self.id.label()
    }

    pub fn conversation_turns<D: Document>(&self, doc: &D) -> TurnNodes<D::Node> {
        match self.layout {
            TurnLayout::RoleAttribute {
                cards,
                attr,
                user,
                assistant,
            } => {
                let mut nodes = TurnNodes::default();
                for card in doc.select_all(cards) {
                    match card.attr(attr).as_deref() {
                        Some(role) if role == user => nodes.user.push(card),
                        Some(role) if role == assistant => nodes.assistant.push(card),
                        _ => {}
                    }
                }
                nodes
            }
            TurnLayout::Alternating { cards } => {
                let mut nodes = TurnNodes::default();
                for (index, card) in doc.select_all(cards).into_iter().enumerate() {
                    if index % 2 == 0 {
                        nodes.user.push(card);
                    } else {
                        nodes.assistant.push(card);
                    }
                }
                nodes
            }
            TurnLayout::Nested {
                containers,
                user,
                assistant,
            } => {
                let mut nodes = TurnNodes::default();
                for container in doc.select_all(containers) {
                    if let (Some(u), Some(a)) = (container.select(user), container.select(assistant)) {
                        nodes.user.push(u);
                        nodes.assistant.push(a);
                    }
                }
                nodes
            }
        }
    }

    pub fn input_field<D: Document>(&self, doc: &D) -> Option<D::Node> {
        let field = doc.select(self.input_field);
        if field.is_none() {
            tracing::warn!(platform = %self.id, selector = self.input_field, "input field not found");
        }
        field
    }
}
