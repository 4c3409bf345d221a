use std::fmt;

use serde::{Deserialize, Serialize};

use crate::service::profile::{Language, Level, PromoType, Style};

/// Onboarding steps, in the only order they may be visited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingStage {
    #[default]
    AwaitingLanguage,
    AwaitingPromo,
    AwaitingOk,
    AwaitingTargetLang,
    AwaitingLevel,
    AwaitingStyle,
    Complete,
}

impl OnboardingStage {
    pub fn next(&self) -> Option<OnboardingStage> {
        use OnboardingStage::*;
        match self {
            AwaitingLanguage => Some(AwaitingPromo),
            AwaitingPromo => Some(AwaitingOk),
            AwaitingOk => Some(AwaitingTargetLang),
            AwaitingTargetLang => Some(AwaitingLevel),
            AwaitingLevel => Some(AwaitingStyle),
            AwaitingStyle => Some(Complete),
            Complete => None,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, OnboardingStage::Complete)
    }
}

impl fmt::Display for OnboardingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OnboardingStage::AwaitingLanguage => "awaiting_language",
            OnboardingStage::AwaitingPromo => "awaiting_promo",
            OnboardingStage::AwaitingOk => "awaiting_ok",
            OnboardingStage::AwaitingTargetLang => "awaiting_target_lang",
            OnboardingStage::AwaitingLevel => "awaiting_level",
            OnboardingStage::AwaitingStyle => "awaiting_style",
            OnboardingStage::Complete => "complete",
        };
        f.write_str(s)
    }
}

/// Raw user input for one onboarding step. Selection values are the
/// unparsed strings from the keyboard so bad values can fall back to defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OnboardingInput {
    Language(String),
    Promo(String),
    Acknowledge,
    TargetLanguage(String),
    Level(String),
    Style(String),
}

impl OnboardingInput {
    /// The stage this input is meant for.
    pub fn stage(&self) -> OnboardingStage {
        match self {
            OnboardingInput::Language(_) => OnboardingStage::AwaitingLanguage,
            OnboardingInput::Promo(_) => OnboardingStage::AwaitingPromo,
            OnboardingInput::Acknowledge => OnboardingStage::AwaitingOk,
            OnboardingInput::TargetLanguage(_) => OnboardingStage::AwaitingTargetLang,
            OnboardingInput::Level(_) => OnboardingStage::AwaitingLevel,
            OnboardingInput::Style(_) => OnboardingStage::AwaitingStyle,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromoRejection {
    Invalid,
    AlreadyUsed,
    /// Storage could not be reached; the user may retry.
    Unavailable,
}

/// What the transport layer should show after a step.
#[derive(Debug, Clone, PartialEq)]
pub enum OnboardingStep {
    AskLanguage,
    AskPromo,
    PromoRejected(PromoRejection),
    AskAcknowledge { promo: Option<PromoType> },
    AskTargetLanguage { english_only: bool },
    AskLevel { target_lang: Language },
    AskStyle { level: Level },
    Completed { style: Style, opening_question: String },
    /// Input did not belong to the current stage; nothing changed.
    Ignored { stage: OnboardingStage },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_sequence_is_linear() {
        let mut stage = OnboardingStage::default();
        let mut visited = vec![stage];
        while let Some(next) = stage.next() {
            assert!(next > stage);
            visited.push(next);
            stage = next;
        }

        assert_eq!(visited.len(), 7);
        assert_eq!(stage, OnboardingStage::Complete);
        assert!(stage.is_complete());
    }

    #[test]
    fn test_input_stage_mapping() {
        assert_eq!(
            OnboardingInput::Language("ru".into()).stage(),
            OnboardingStage::AwaitingLanguage
        );
        assert_eq!(OnboardingInput::Acknowledge.stage(), OnboardingStage::AwaitingOk);
        assert_eq!(
            OnboardingInput::Style("casual".into()).stage(),
            OnboardingStage::AwaitingStyle
        );
    }
}
