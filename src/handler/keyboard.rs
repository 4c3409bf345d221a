use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::service::profile::{Language, Level, Style};

pub fn get_interface_language_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([[
        InlineKeyboardButton::callback(t!("buttons.language.ru", locale = "ru"), "lang:ru"),
        InlineKeyboardButton::callback(t!("buttons.language.en", locale = "en"), "lang:en"),
    ]])
}

pub fn get_promo_skip_keyboard(locale: &str) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([[InlineKeyboardButton::callback(
        t!("buttons.promo_skip", locale = locale),
        "promo:skip",
    )]])
}

pub fn get_acknowledge_keyboard(locale: &str) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([[InlineKeyboardButton::callback(t!("buttons.ok", locale = locale), "ok")]])
}

/// Only English is offered while an English-only promo holds.
pub fn get_target_language_keyboard(locale: &str, english_only: bool) -> InlineKeyboardMarkup {
    let languages: &[Language] = if english_only {
        &[Language::English]
    } else {
        &Language::TARGETS
    };

    let buttons = languages.iter().map(|lang| {
        vec![InlineKeyboardButton::callback(
            t!(format!("languages.{}", lang.code()), locale = locale),
            format!("target:{}", lang.code()),
        )]
    });

    InlineKeyboardMarkup::new(buttons)
}

pub fn get_level_keyboard() -> InlineKeyboardMarkup {
    let buttons: Vec<Vec<InlineKeyboardButton>> = Level::ALL
        .chunks(4)
        .map(|row| {
            row.iter()
                .map(|level| InlineKeyboardButton::callback(level.as_str(), format!("level:{}", level.as_str())))
                .collect()
        })
        .collect();

    InlineKeyboardMarkup::new(buttons)
}

pub fn get_style_keyboard(locale: &str) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([[Style::Casual, Style::Business].map(|style| {
        InlineKeyboardButton::callback(
            t!(format!("buttons.style.{}", style.as_str()), locale = locale),
            format!("style:{}", style.as_str()),
        )
    })])
}

/// Attached to every assistant reply.
pub fn get_reply_keyboard(locale: &str) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([[
        InlineKeyboardButton::callback(t!("buttons.translate", locale = locale), "translate"),
        InlineKeyboardButton::callback(t!("buttons.toggle_mode", locale = locale), "mode:toggle"),
    ]])
}
