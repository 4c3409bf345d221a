mod model;

pub use model::*;

use std::sync::Arc;

use crate::{
    service::{onboarding::OnboardingStage, profile::ProfileService},
    storage::SessionStore,
};

/// Per-chat sessions over a transient store, rebuilt from the durable
/// profile after a restart.
#[derive(Clone)]
pub struct SessionService {
    store: Arc<dyn SessionStore>,
    profiles: ProfileService,
    history_capacity: usize,
}

impl SessionService {
    pub fn new(store: Arc<dyn SessionStore>, profiles: ProfileService, history_capacity: usize) -> Self {
        Self {
            store,
            profiles,
            history_capacity,
        }
    }

    pub fn peek(&self, chat_id: i64) -> Option<Session> {
        self.store.get(chat_id)
    }

    /// Cached session, else one rebuilt from the profile, else a fresh one.
    pub async fn load(&self, chat_id: i64, user_id: i64) -> Session {
        if let Some(session) = self.store.get(chat_id) {
            return session;
        }

        let session = match self.profiles.get_profile(user_id).await {
            Ok(Some(profile)) => {
                debug!("Rebuilding session of chat {} from profile", chat_id);
                Session::from_profile(chat_id, &profile, self.history_capacity)
            }
            Ok(None) => Session::new(chat_id, user_id, self.history_capacity),
            Err(e) => {
                warn!("Profile lookup failed for user {}, starting fresh: {}", user_id, e);
                Session::new(chat_id, user_id, self.history_capacity)
            }
        };

        self.store.set(&session);
        session
    }

    pub fn save(&self, session: &Session) {
        self.store.set(session);
    }

    /// Writes the history and last reply of `updated` onto the session the chat
    /// holds now, keeping settings changed while the model was answering.
    /// A chat that was reset or forgotten in the meantime drops the exchange.
    pub fn commit_dialogue(&self, updated: &Session) -> Session {
        match self.store.get(updated.chat_id) {
            Some(mut current) if current.onboarding_stage == OnboardingStage::Complete => {
                current.history = updated.history.clone();
                current.last_assistant_text = updated.last_assistant_text.clone();
                self.store.set(&current);
                current
            }
            Some(current) => {
                debug!("Chat {} restarted onboarding mid-turn, dropping exchange", updated.chat_id);
                current
            }
            None => updated.clone(),
        }
    }

    pub fn remove(&self, chat_id: i64) {
        self.store.delete(chat_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        service::profile::{Language, Level, ProfileUpdate, Style},
        storage::{MemoryProfileStore, MemorySessionStore, MemoryUsageStore},
    };

    fn service() -> (SessionService, ProfileService) {
        let profiles = ProfileService::new(
            Arc::new(MemoryProfileStore::default()),
            Arc::new(MemoryUsageStore::default()),
        );
        let sessions = SessionService::new(Arc::new(MemorySessionStore::new(16)), profiles.clone(), 40);
        (sessions, profiles)
    }

    #[tokio::test]
    async fn test_unknown_user_gets_fresh_session() {
        let (sessions, _) = service();
        let session = sessions.load(1, 2).await;
        assert_eq!(session.onboarding_stage, OnboardingStage::AwaitingLanguage);
        assert!(sessions.peek(1).is_some());
    }

    #[tokio::test]
    async fn test_onboarded_profile_resumes_complete() {
        let (sessions, profiles) = service();
        profiles.save(2, ProfileUpdate::interface_lang(Language::Russian)).await;
        profiles.save(2, ProfileUpdate::target_lang(Language::German)).await;
        profiles.save(2, ProfileUpdate::level(Level::B2)).await;
        profiles.save(2, ProfileUpdate::style(Style::Business)).await;

        let session = sessions.load(1, 2).await;
        assert_eq!(session.onboarding_stage, OnboardingStage::Complete);
        assert_eq!(session.target_lang, Some(Language::German));
        assert_eq!(session.locale(), "ru");
    }

    #[tokio::test]
    async fn test_saved_session_wins_over_profile() {
        let (sessions, _) = service();
        let mut session = sessions.load(3, 4).await;
        session.onboarding_stage = OnboardingStage::AwaitingLevel;
        sessions.save(&session);

        assert_eq!(sessions.load(3, 4).await.onboarding_stage, OnboardingStage::AwaitingLevel);

        sessions.remove(3);
        assert!(sessions.peek(3).is_none());
    }

    #[tokio::test]
    async fn test_commit_dialogue_keeps_concurrent_mode_change() {
        let (sessions, _) = service();
        let mut in_flight = sessions.load(5, 6).await;
        in_flight.onboarding_stage = OnboardingStage::Complete;
        sessions.save(&in_flight);

        let mut toggled = in_flight.clone();
        toggled.mode = toggled.mode.toggled();
        sessions.save(&toggled);

        in_flight.history.push(Role::User, "Hola");
        in_flight.history.push(Role::Assistant, "¿Qué tal?");
        in_flight.last_assistant_text = Some("¿Qué tal?".into());

        let committed = sessions.commit_dialogue(&in_flight);
        assert_eq!(committed.mode, toggled.mode);
        assert_eq!(committed.history.len(), 2);

        let stored = sessions.peek(5).unwrap();
        assert_eq!(stored.mode, toggled.mode);
        assert_eq!(stored.last_assistant_text.as_deref(), Some("¿Qué tal?"));
    }

    #[tokio::test]
    async fn test_commit_dialogue_after_reset_or_forget() {
        let (sessions, _) = service();
        let mut in_flight = sessions.load(7, 8).await;
        in_flight.onboarding_stage = OnboardingStage::Complete;
        in_flight.history.push(Role::User, "Hallo");

        let restarted = sessions.load(7, 8).await;
        assert_eq!(restarted.onboarding_stage, OnboardingStage::AwaitingLanguage);
        let committed = sessions.commit_dialogue(&in_flight);
        assert!(committed.history.is_empty());
        assert!(sessions.peek(7).unwrap().history.is_empty());

        sessions.remove(7);
        sessions.commit_dialogue(&in_flight);
        assert!(sessions.peek(7).is_none());
    }
}
