use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::Utc;
use teloxide::dptree;
use teloxide_tests::{MockBot, MockMessageText, MockUser, Responses};

use crate::{
    config::{
        AppConfig, EntitlementConfig, GateConfig, LlmConfig, RetryConfig, SessionConfig, StorageConfig, TelegramConfig,
    },
    handler::get_handler,
    service::{
        dialogue::DialogueService,
        llm::LlmClient,
        onboarding::OnboardingStage,
        profile::{Language, Level, PromoCode, PromoType, Style, UserProfile},
        retry::RetryPolicy,
        session::{ReplyMode, Session, Turn},
        speech::{SpeechToText, TextToSpeech, VoiceParams},
        ServiceError,
    },
    state::AppState,
    storage::{
        MemoryProfileStore, MemoryPromoStore, MemorySessionStore, MemoryUsageStore, SessionStore, StorageManager,
        UsageStore,
    },
};

fn test_config() -> AppConfig {
    AppConfig {
        telegram: TelegramConfig("test-token".into()),
        storage: StorageConfig {
            turso_url: "libsql://localhost".into(),
            turso_token: String::new(),
            redis_url: None,
        },
        llm: LlmConfig {
            api_key: "sk-test".into(),
            base_url: "http://localhost".into(),
            chat_model: "test".into(),
            tts_model: "test".into(),
            tts_voice: "test".into(),
            stt_model: "test".into(),
        },
        retry: RetryConfig {
            max_attempts: 1,
            backoff: Duration::ZERO,
        },
        gate: GateConfig::default(),
        entitlement: EntitlementConfig::default(),
        session: SessionConfig::default(),
    }
}

/// Offline stand-in for the model and speech backends. Replies echo the
/// user and every model call is counted.
#[derive(Default)]
struct EchoModel {
    calls: AtomicUsize,
    audio: Vec<u8>,
}

#[async_trait]
impl LlmClient for EchoModel {
    async fn complete(&self, _system: &str, turns: &[Turn]) -> Result<String, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(turns.last().map(|turn| turn.content.clone()).unwrap_or_default())
    }
}

#[async_trait]
impl SpeechToText for EchoModel {
    async fn transcribe(&self, _audio: Vec<u8>, _file_name: &str) -> Result<String, ServiceError> {
        Ok(String::new())
    }
}

#[async_trait]
impl TextToSpeech for EchoModel {
    async fn synthesize(&self, _text: &str, _params: VoiceParams) -> Result<Vec<u8>, ServiceError> {
        Ok(self.audio.clone())
    }
}

/// App state plus handles on the in-memory stores behind it.
struct Fixture {
    state: AppState,
    model: Arc<EchoModel>,
    profiles: MemoryProfileStore,
    usage: MemoryUsageStore,
    sessions: MemorySessionStore,
}

impl Fixture {
    fn new() -> Self {
        Self::with_model(EchoModel::default())
    }

    fn with_model(model: EchoModel) -> Self {
        let profiles = MemoryProfileStore::default();
        let promos = MemoryPromoStore::default();
        promos.insert(PromoCode {
            code: "SPRING25".into(),
            promo_type: PromoType::Permanent,
            days: None,
        });
        let usage = MemoryUsageStore::default();
        let sessions = MemorySessionStore::new(16);

        let storage = StorageManager {
            profiles: Arc::new(profiles.clone()),
            promos: Arc::new(promos),
            usage: Arc::new(usage.clone()),
            sessions: Arc::new(sessions.clone()),
        };

        let model = Arc::new(model);
        let dialogue = DialogueService::new(
            model.clone(),
            model.clone(),
            model.clone(),
            RetryPolicy::new(1, Duration::ZERO),
        );

        Self {
            state: AppState::from_parts(test_config(), storage, dialogue),
            model,
            profiles,
            usage,
            sessions,
        }
    }

    fn user_id() -> i64 {
        MockUser::ID as i64
    }

    /// A Spanish learner who finished onboarding, on the free tier.
    fn onboarded(self) -> Self {
        let mut profile = UserProfile::new(Self::user_id());
        profile.interface_lang = Some(Language::English);
        profile.target_lang = Some(Language::Spanish);
        profile.level = Some(Level::B1);
        profile.style = Some(Style::Casual);
        self.profiles.insert(profile);
        self
    }

    fn with_session(self, session: Session) -> Self {
        self.sessions.set(&session);
        self
    }

    async fn used_today(self, count: u32) -> Self {
        let today = Utc::now().date_naive();
        for _ in 0..count {
            self.usage.increment_usage(Self::user_id(), today).await.unwrap();
        }
        self
    }

    async fn usage_today(&self) -> u32 {
        self.usage
            .get_usage_count(Self::user_id(), Utc::now().date_naive())
            .await
            .unwrap()
    }

    fn model_calls(&self) -> usize {
        self.model.calls.load(Ordering::SeqCst)
    }

    async fn send(&self, text: &str) -> Responses {
        let bot = MockBot::new(MockMessageText::new().text(text), get_handler());
        bot.dependencies(dptree::deps![self.state.clone()]);
        bot.dispatch().await;
        bot.get_responses()
    }
}

fn session_at(stage: OnboardingStage) -> Session {
    let mut session = Session::new(Fixture::user_id(), Fixture::user_id(), 40);
    session.interface_lang = Some(Language::English);
    session.onboarding_stage = stage;
    session
}

fn texts(responses: &Responses) -> Vec<String> {
    responses
        .sent_messages_text
        .iter()
        .filter_map(|sent| sent.message.text().map(str::to_string))
        .collect()
}

async fn last_reply(text: &str) -> Option<String> {
    let responses = Fixture::new().send(text).await;
    responses
        .sent_messages
        .last()
        .and_then(|message| message.text().map(str::to_string))
}

#[tokio::test]
async fn test_start_command_asks_for_language() {
    let reply = last_reply("/start").await;
    assert_eq!(reply.as_deref(), Some(t!("onboarding.ask_language", locale = "en").as_ref()));
}

#[tokio::test]
async fn test_promo_command_activates_known_code() {
    let reply = last_reply("/promo SPRING25").await;
    assert_eq!(
        reply.as_deref(),
        Some(t!("promo.activated.permanent", locale = "en").as_ref())
    );
}

#[tokio::test]
async fn test_promo_command_rejects_unknown_code() {
    let reply = last_reply("/promo WINTER99").await;
    assert_eq!(reply.as_deref(), Some(t!("promo.invalid", locale = "en").as_ref()));
}

#[tokio::test]
async fn test_text_before_onboarding_repeats_language_prompt() {
    let reply = last_reply("Hello there").await;
    assert_eq!(reply.as_deref(), Some(t!("onboarding.ask_language", locale = "en").as_ref()));
}

#[tokio::test]
async fn test_unknown_command() {
    let reply = last_reply("/teleport").await;
    assert_eq!(
        reply.as_deref(),
        Some(t!("commands.unknown_command", locale = "en").as_ref())
    );
}

#[tokio::test]
async fn test_sixteenth_message_is_blocked_without_model_call() {
    let fixture = Fixture::new().onboarded().used_today(15).await;

    let responses = fixture.send("hola").await;

    assert_eq!(
        texts(&responses),
        vec![t!("usage.limit_reached", locale = "en", limit = 15).to_string()]
    );
    assert_eq!(fixture.model_calls(), 0);
    assert_eq!(fixture.usage_today().await, 15);
}

#[tokio::test]
async fn test_tenth_message_sends_reminder_before_reply() {
    let fixture = Fixture::new().onboarded().used_today(9).await;

    let responses = fixture.send("hola").await;

    assert_eq!(
        texts(&responses),
        vec![
            t!("usage.reminder", locale = "en", remaining = 5).to_string(),
            "hola".to_string(),
        ]
    );
    assert_eq!(fixture.model_calls(), 1);
    assert_eq!(fixture.usage_today().await, 10);
}

#[tokio::test]
async fn test_promo_stage_text_is_never_counted() {
    let fixture = Fixture::new().with_session(session_at(OnboardingStage::AwaitingPromo));

    let responses = fixture.send("WINTER99").await;

    assert_eq!(texts(&responses), vec![t!("promo.invalid", locale = "en").to_string()]);
    assert_eq!(fixture.usage_today().await, 0);
    assert_eq!(fixture.model_calls(), 0);
}

#[tokio::test]
async fn test_long_voice_reply_goes_out_uncaptioned_with_text() {
    let mut session = session_at(OnboardingStage::Complete);
    session.target_lang = Some(Language::Spanish);
    session.level = Some(Level::B1);
    session.style = Some(Style::Casual);
    session.mode = ReplyMode::Voice;

    let fixture = Fixture::with_model(EchoModel {
        audio: b"OggS".to_vec(),
        ..Default::default()
    })
    .onboarded()
    .with_session(session);

    let long_text = "palabra ".repeat(200).trim_end().to_string();
    let responses = fixture.send(&long_text).await;

    assert_eq!(responses.sent_messages_voice.len(), 1);
    assert_eq!(responses.sent_messages_voice[0].message.caption(), None);
    assert_eq!(texts(&responses), vec![long_text]);
}
