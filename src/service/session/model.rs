use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::service::{
    onboarding::OnboardingStage,
    profile::{Language, Level, Style, UserProfile},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

/// Bounded conversation log, oldest turn evicted first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct History {
    capacity: usize,
    turns: VecDeque<Turn>,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            turns: VecDeque::with_capacity(capacity.max(1)),
        }
    }

    pub fn push(&mut self, role: Role, content: impl Into<String>) {
        while self.turns.len() >= self.capacity {
            self.turns.pop_front();
        }
        self.turns.push_back(Turn {
            role,
            content: content.into(),
        });
    }

    pub fn to_vec(&self) -> Vec<Turn> {
        self.turns.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyMode {
    #[default]
    Text,
    Voice,
}

impl ReplyMode {
    pub fn toggled(&self) -> Self {
        match self {
            ReplyMode::Text => ReplyMode::Voice,
            ReplyMode::Voice => ReplyMode::Text,
        }
    }
}

/// Per-chat working set, rebuilt from [`UserProfile`] when missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub chat_id: i64,
    pub user_id: i64,
    pub interface_lang: Option<Language>,
    pub target_lang: Option<Language>,
    pub level: Option<Level>,
    pub style: Option<Style>,
    pub onboarding_stage: OnboardingStage,
    pub history: History,
    pub mode: ReplyMode,
    pub last_assistant_text: Option<String>,
}

impl Session {
    pub fn new(chat_id: i64, user_id: i64, history_capacity: usize) -> Self {
        Self {
            chat_id,
            user_id,
            interface_lang: None,
            target_lang: None,
            level: None,
            style: None,
            onboarding_stage: OnboardingStage::AwaitingLanguage,
            history: History::new(history_capacity),
            mode: ReplyMode::default(),
            last_assistant_text: None,
        }
    }

    /// A fully onboarded profile resumes at `Complete`; anything else restarts
    /// onboarding.
    pub fn from_profile(chat_id: i64, profile: &UserProfile, history_capacity: usize) -> Self {
        let mut session = Self::new(chat_id, profile.user_id, history_capacity);
        session.interface_lang = profile.interface_lang;
        session.target_lang = profile.target_lang;
        session.level = profile.level;
        session.style = profile.style;
        if profile.is_onboarded() {
            session.onboarding_stage = OnboardingStage::Complete;
        }
        session
    }

    /// Locale for localized strings.
    pub fn locale(&self) -> &'static str {
        self.interface_lang.unwrap_or(Language::English).code()
    }

    pub fn reset(&mut self) {
        let capacity = self.history.capacity;
        *self = Self::new(self.chat_id, self.user_id, capacity);
    }
}
