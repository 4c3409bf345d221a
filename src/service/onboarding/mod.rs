mod model;
pub mod questions;

pub use model::*;

use chrono::{DateTime, Utc};

use crate::service::{
    entitlement::{EntitlementService, PromoOutcome},
    profile::{Language, Level, ProfileService, ProfileUpdate, Style},
    session::{Role, Session},
};

const PROMO_REFUSALS: [&str; 4] = ["no", "нет", "skip", "-"];

pub fn is_promo_refusal(text: &str) -> bool {
    let text = text.trim().to_lowercase();
    PROMO_REFUSALS.contains(&text.as_str())
}

/// Walks a chat through language, promo, acknowledgement, target language,
/// level and style, persisting each choice as it is made.
#[derive(Clone)]
pub struct OnboardingService {
    profiles: ProfileService,
    entitlement: EntitlementService,
}

impl OnboardingService {
    pub fn new(profiles: ProfileService, entitlement: EntitlementService) -> Self {
        Self { profiles, entitlement }
    }

    /// New user or explicit reset.
    pub fn start(&self, session: &mut Session) -> OnboardingStep {
        session.reset();
        info!("Chat {} entered onboarding", session.chat_id);
        OnboardingStep::AskLanguage
    }

    /// Prompt for the stage the session is currently in.
    pub async fn current_prompt(&self, session: &Session, now: DateTime<Utc>) -> OnboardingStep {
        match session.onboarding_stage {
            OnboardingStage::AwaitingLanguage => OnboardingStep::AskLanguage,
            OnboardingStage::AwaitingPromo => OnboardingStep::AskPromo,
            OnboardingStage::AwaitingOk => OnboardingStep::AskAcknowledge { promo: None },
            OnboardingStage::AwaitingTargetLang => OnboardingStep::AskTargetLanguage {
                english_only: self.entitlement.english_only(session.user_id, now).await,
            },
            OnboardingStage::AwaitingLevel => OnboardingStep::AskLevel {
                target_lang: session.target_lang.unwrap_or(Language::English),
            },
            OnboardingStage::AwaitingStyle => OnboardingStep::AskStyle {
                level: session.level.unwrap_or(Level::A2),
            },
            OnboardingStage::Complete => OnboardingStep::Ignored {
                stage: OnboardingStage::Complete,
            },
        }
    }

    pub async fn advance(&self, session: &mut Session, input: OnboardingInput, now: DateTime<Utc>) -> OnboardingStep {
        let stage = session.onboarding_stage;
        if input.stage() != stage {
            warn!(
                "Chat {} sent {:?} while in stage {}, ignoring",
                session.chat_id, input, stage
            );
            return OnboardingStep::Ignored { stage };
        }

        let user_id = session.user_id;

        let step = match input {
            OnboardingInput::Language(raw) => {
                let lang = Language::parse_or_default(&raw);
                let lang = if Language::INTERFACE.contains(&lang) {
                    lang
                } else {
                    Language::English
                };
                session.interface_lang = Some(lang);
                self.profiles.save(user_id, ProfileUpdate::interface_lang(lang)).await;
                OnboardingStep::AskPromo
            }

            OnboardingInput::Promo(text) => {
                if is_promo_refusal(&text) {
                    OnboardingStep::AskAcknowledge { promo: None }
                } else {
                    match self.entitlement.activate_promo(user_id, &text, now).await {
                        Ok(PromoOutcome::Activated(promo_type)) => OnboardingStep::AskAcknowledge {
                            promo: Some(promo_type),
                        },
                        Ok(PromoOutcome::Invalid) => return OnboardingStep::PromoRejected(PromoRejection::Invalid),
                        Ok(PromoOutcome::AlreadyUsed) => {
                            return OnboardingStep::PromoRejected(PromoRejection::AlreadyUsed)
                        }
                        Err(e) => {
                            error!("Promo activation failed for user {}: {}", user_id, e);
                            return OnboardingStep::PromoRejected(PromoRejection::Unavailable);
                        }
                    }
                }
            }

            OnboardingInput::Acknowledge => OnboardingStep::AskTargetLanguage {
                english_only: self.entitlement.english_only(user_id, now).await,
            },

            OnboardingInput::TargetLanguage(raw) => {
                let lang = Language::parse_or_default(&raw);
                let lang = if !Language::TARGETS.contains(&lang) || self.entitlement.english_only(user_id, now).await {
                    Language::English
                } else {
                    lang
                };
                session.target_lang = Some(lang);
                self.profiles.save(user_id, ProfileUpdate::target_lang(lang)).await;
                OnboardingStep::AskLevel { target_lang: lang }
            }

            OnboardingInput::Level(raw) => {
                let level = Level::parse_or_default(&raw);
                session.level = Some(level);
                self.profiles.save(user_id, ProfileUpdate::level(level)).await;
                OnboardingStep::AskStyle { level }
            }

            OnboardingInput::Style(raw) => {
                let style = Style::parse_or_default(&raw);
                session.style = Some(style);
                self.profiles.save(user_id, ProfileUpdate::style(style)).await;

                let opening_question = questions::pick_opening_question(
                    session.target_lang.unwrap_or(Language::English),
                    session.level.unwrap_or(Level::A2),
                    &mut rand::thread_rng(),
                );
                session.history.push(Role::Assistant, opening_question.clone());
                session.last_assistant_text = Some(opening_question.clone());

                OnboardingStep::Completed {
                    style,
                    opening_question,
                }
            }
        };

        if let Some(next) = stage.next() {
            debug!("Chat {} onboarding {} -> {}", session.chat_id, stage, next);
            session.onboarding_stage = next;
        }

        if session.onboarding_stage.is_complete() {
            info!("Chat {} completed onboarding", session.chat_id);
        }

        step
    }
}
