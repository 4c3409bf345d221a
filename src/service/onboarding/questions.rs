use rand::{seq::SliceRandom, Rng};

use crate::service::profile::{Language, Level};

const EN_EASY: &[&str] = &[
    "What is your favourite food?",
    "Do you have any pets?",
    "What do you like to do on weekends?",
    "What is the weather like today?",
    "Where do you live?",
    "What time do you usually wake up?",
];

const EN_STANDARD: &[&str] = &[
    "What is a book or film that changed the way you think?",
    "If you could live in any city for a year, which would you choose and why?",
    "What skill would you like to master in the next few years?",
    "How has technology changed the way you work or study?",
    "What is the best piece of advice you have ever received?",
    "Describe a tradition from your country that you enjoy.",
];

const ES_EASY: &[&str] = &[
    "¿Cuál es tu comida favorita?",
    "¿Tienes mascotas?",
    "¿Qué haces los fines de semana?",
    "¿Qué tiempo hace hoy?",
    "¿Dónde vives?",
];

const ES_STANDARD: &[&str] = &[
    "¿Qué libro o película ha cambiado tu forma de pensar?",
    "Si pudieras vivir un año en cualquier ciudad, ¿cuál elegirías y por qué?",
    "¿Qué habilidad te gustaría dominar en los próximos años?",
    "¿Cómo ha cambiado la tecnología tu forma de trabajar o estudiar?",
    "¿Cuál es el mejor consejo que te han dado?",
];

const DE_EASY: &[&str] = &[
    "Was ist dein Lieblingsessen?",
    "Hast du Haustiere?",
    "Was machst du am Wochenende?",
    "Wie ist das Wetter heute?",
    "Wo wohnst du?",
];

const DE_STANDARD: &[&str] = &[
    "Welches Buch oder welcher Film hat deine Sichtweise verändert?",
    "Wenn du ein Jahr in einer beliebigen Stadt leben könntest, welche wäre es und warum?",
    "Welche Fähigkeit möchtest du in den nächsten Jahren meistern?",
    "Wie hat die Technik deine Art zu arbeiten oder zu lernen verändert?",
    "Was ist der beste Rat, den du je bekommen hast?",
];

const FR_EASY: &[&str] = &[
    "Quel est ton plat préféré ?",
    "As-tu des animaux ?",
    "Que fais-tu le week-end ?",
    "Quel temps fait-il aujourd'hui ?",
    "Où habites-tu ?",
];

const FR_STANDARD: &[&str] = &[
    "Quel livre ou quel film a changé ta façon de penser ?",
    "Si tu pouvais vivre un an dans n'importe quelle ville, laquelle choisirais-tu et pourquoi ?",
    "Quelle compétence aimerais-tu maîtriser dans les prochaines années ?",
    "Comment la technologie a-t-elle changé ta façon de travailler ou d'étudier ?",
    "Quel est le meilleur conseil que tu aies jamais reçu ?",
];

const IT_EASY: &[&str] = &[
    "Qual è il tuo cibo preferito?",
    "Hai animali domestici?",
    "Cosa fai nel fine settimana?",
    "Che tempo fa oggi?",
    "Dove abiti?",
];

const IT_STANDARD: &[&str] = &[
    "Quale libro o film ha cambiato il tuo modo di pensare?",
    "Se potessi vivere un anno in qualsiasi città, quale sceglieresti e perché?",
    "Quale abilità vorresti padroneggiare nei prossimi anni?",
    "Come ha cambiato la tecnologia il tuo modo di lavorare o studiare?",
    "Qual è il miglior consiglio che tu abbia mai ricevuto?",
];

/// Opening-question pool for a target language; beginners get the easy pool.
/// Languages without pools use English.
pub fn pool(lang: Language, level: Level) -> &'static [&'static str] {
    let easy = level.is_beginner();
    match (lang, easy) {
        (Language::Spanish, true) => ES_EASY,
        (Language::Spanish, false) => ES_STANDARD,
        (Language::German, true) => DE_EASY,
        (Language::German, false) => DE_STANDARD,
        (Language::French, true) => FR_EASY,
        (Language::French, false) => FR_STANDARD,
        (Language::Italian, true) => IT_EASY,
        (Language::Italian, false) => IT_STANDARD,
        (_, true) => EN_EASY,
        (_, false) => EN_STANDARD,
    }
}

pub fn pick_opening_question<R: Rng + ?Sized>(lang: Language, level: Level, rng: &mut R) -> String {
    pool(lang, level)
        .choose(rng)
        .map(|q| q.to_string())
        .unwrap_or_else(|| EN_EASY[0].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_pool_by_level() {
        assert_eq!(pool(Language::English, Level::A0), EN_EASY);
        assert_eq!(pool(Language::English, Level::A2), EN_EASY);
        assert_eq!(pool(Language::English, Level::B1), EN_STANDARD);
        assert_eq!(pool(Language::German, Level::C2), DE_STANDARD);
        assert_eq!(pool(Language::Russian, Level::A1), EN_EASY);
    }

    #[test]
    fn test_pick_is_from_pool() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let q = pick_opening_question(Language::French, Level::A1, &mut rng);
            assert!(FR_EASY.contains(&q.as_str()));
        }
    }
}
