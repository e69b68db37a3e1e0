//! Red-flag screening for incoming messages.
//!
//! Deterministic regex matching against a fixed table of crisis indicators.
//! Adapters consult this before running the pipeline; it is not a gate
//! inside the orchestrator, and it never blocks the counselor from seeing
//! the message.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

static SUICIDE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(suicide|suicidal|kill myself|end my life|end it all)\b")
        .expect("invalid suicide regex")
});

static ABUSE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(abuse|abused|molest|molested|rape|raped)\b").expect("invalid abuse regex")
});

static VIOLENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(harm|hurt|kill)\s+(myself|someone|others)\b")
        .expect("invalid violence regex")
});

/// The category of red flag detected.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SafetyKind {
    SuicideRisk,
    AbuseDisclosure,
    ViolenceRisk,
}

/// How urgently the protocol response should be surfaced.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SafetyAction {
    Critical,
    Urgent,
}

/// A matched red flag with its fixed response protocol.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct SafetyFlag {
    pub kind: SafetyKind,
    pub action: SafetyAction,
    pub response: &'static str,
}

/// Screen a message for red flags.
///
/// Categories are checked in severity order and the first match wins.
pub fn screen(text: &str) -> Option<SafetyFlag> {
    if SUICIDE_RE.is_match(text) {
        return Some(SafetyFlag {
            kind: SafetyKind::SuicideRisk,
            action: SafetyAction::Critical,
            response: "If you are thinking about suicide, please reach out right now: \
                       call or text 988 (Suicide & Crisis Lifeline) or contact your \
                       local emergency services. You deserve immediate support from a \
                       trained crisis counselor.",
        });
    }
    if ABUSE_RE.is_match(text) {
        return Some(SafetyFlag {
            kind: SafetyKind::AbuseDisclosure,
            action: SafetyAction::Urgent,
            response: "What you are describing may involve abuse. You are not to blame. \
                       Please consider contacting a local support hotline or a trusted \
                       professional who can help you stay safe.",
        });
    }
    if VIOLENCE_RE.is_match(text) {
        return Some(SafetyFlag {
            kind: SafetyKind::ViolenceRisk,
            action: SafetyAction::Urgent,
            response: "It sounds like someone may be at risk of harm. Please contact \
                       local emergency services or a crisis line right away so a \
                       professional can help keep everyone safe.",
        });
    }
    None
}
