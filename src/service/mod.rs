use std::{sync::Arc, time::Duration};

use dialogue::DialogueService;
use entitlement::EntitlementService;
use llm::OpenAiClient;
use onboarding::OnboardingService;
use profile::ProfileService;
use retry::RetryPolicy;
use session::SessionService;
use speech::OpenAiSpeech;
use usage::UsageGate;

use crate::{config::AppConfig, storage::StorageManager};

pub mod dialogue;
pub mod entitlement;
mod error;
pub mod llm;
pub mod onboarding;
pub mod profile;
pub mod retry;
pub mod session;
pub mod speech;
pub mod usage;

pub use error::ServiceError;

#[derive(Clone)]
pub struct ServiceRegistry {
    pub profile: ProfileService,
    pub entitlement: EntitlementService,
    pub gate: UsageGate,
    pub onboarding: OnboardingService,
    pub session: SessionService,
    pub dialogue: DialogueService,
}

impl ServiceRegistry {
    pub fn new(config: &AppConfig, storage: &StorageManager) -> Result<Self, ServiceError> {
        info!("Initializing service registry");

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(60))
            .build()?;

        let speech = Arc::new(OpenAiSpeech::new(client.clone(), &config.llm));
        let dialogue = DialogueService::new(
            Arc::new(OpenAiClient::new(client, &config.llm)),
            speech.clone(),
            speech,
            RetryPolicy::from(&config.retry),
        );

        let registry = Self::from_parts(config, storage, dialogue);

        info!("Service registry initialized");

        Ok(registry)
    }

    /// Wires the storage-backed services around an already built dialogue service.
    pub fn from_parts(config: &AppConfig, storage: &StorageManager, dialogue: DialogueService) -> Self {
        let profile = ProfileService::new(storage.profiles.clone(), storage.usage.clone());
        let entitlement = EntitlementService::new(storage.profiles.clone(), storage.promos.clone(), &config.entitlement);
        let gate = UsageGate::new(entitlement.clone(), storage.usage.clone(), config.gate.clone());
        let onboarding = OnboardingService::new(profile.clone(), entitlement.clone());
        let session = SessionService::new(
            storage.sessions.clone(),
            profile.clone(),
            config.session.history_capacity,
        );

        Self {
            profile,
            entitlement,
            gate,
            onboarding,
            session,
            dialogue,
        }
    }
}
