use teloxide::types::{Message, MessageEntityKind};

/// The parts of an inbound message that decide whether it is metered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InboundMessage {
    pub is_command: bool,
    pub has_bot_command_entity: bool,
    pub from_bot: bool,
    pub has_text: bool,
    pub has_voice: bool,
}

impl InboundMessage {
    /// Plain text or voice/audio from a human, never a command.
    pub fn is_countable(&self) -> bool {
        !self.is_command && !self.has_bot_command_entity && !self.from_bot && (self.has_text || self.has_voice)
    }
}

impl From<&Message> for InboundMessage {
    fn from(msg: &Message) -> Self {
        let text = msg.text().unwrap_or_default();
        let has_bot_command_entity = msg
            .entities()
            .is_some_and(|entities| entities.iter().any(|e| matches!(e.kind, MessageEntityKind::BotCommand)));

        Self {
            is_command: text.trim_start().starts_with('/'),
            has_bot_command_entity,
            from_bot: msg.from.as_ref().is_some_and(|user| user.is_bot),
            has_text: !text.trim().is_empty(),
            has_voice: msg.voice().is_some() || msg.audio().is_some(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Premium or a valid promo; nothing was counted.
    Unlimited,
    /// Counted against today's quota.
    Counted { used: u32, remind: bool },
    /// Quota exhausted or the counter is unusable; stop handling this update.
    Halt,
}

impl GateDecision {
    pub fn should_continue(&self) -> bool {
        !matches!(self, GateDecision::Halt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text() -> InboundMessage {
        InboundMessage {
            has_text: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_countability() {
        assert!(text().is_countable());
        assert!(InboundMessage {
            has_voice: true,
            ..Default::default()
        }
        .is_countable());

        assert!(!InboundMessage::default().is_countable());
        assert!(!InboundMessage {
            is_command: true,
            ..text()
        }
        .is_countable());
        assert!(!InboundMessage {
            has_bot_command_entity: true,
            ..text()
        }
        .is_countable());
        assert!(!InboundMessage {
            from_bot: true,
            ..text()
        }
        .is_countable());
    }

    #[test]
    fn test_halt_stops() {
        assert!(!GateDecision::Halt.should_continue());
        assert!(GateDecision::Unlimited.should_continue());
        assert!(GateDecision::Counted { used: 3, remind: false }.should_continue());
    }
}
