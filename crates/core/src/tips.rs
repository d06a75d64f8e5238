//! Short per-lesson guidance derived from keywords in the lesson title.

/// Keyword groups checked in priority order; the first hit wins.
const CATEGORIES: &[(&[&str], &[&str])] = &[
    (
        &["oddech", "oddych", "breath"],
        &[
            "Wdychaj powietrze nosem, kierując je w boki żeber.",
            "Wydychaj ustami, powoli i do końca, aktywując mięśnie brzucha.",
            "Nie unoś barków przy wdechu; szyja pozostaje rozluźniona.",
        ],
    ),
    (
        &["kręgosłup", "kregoslup", "mobiliz", "spine"],
        &[
            "Poruszaj się segment po segmencie, bez szarpnięć.",
            "Prowadź ruch oddechem: wydech przy zaokrągleniu, wdech przy wydłużeniu.",
            "Zatrzymaj się przed bólem; zakres rośnie z każdą sesją.",
        ],
    ),
    (
        &["biodr", "stabiliz", "hip"],
        &[
            "Utrzymuj miednicę w pozycji neutralnej przez całe ćwiczenie.",
            "Kolana prowadź w linii ze stopami, nie pozwalaj im uciekać do środka.",
            "Wolniejsze tempo daje więcej pracy mięśniom głębokim.",
        ],
    ),
];

const GENERIC_TIPS: &[&str] = &[
    "Skup się na jakości ruchu, nie na liczbie powtórzeń.",
    "Oddychaj spokojnie i rób przerwy, gdy ich potrzebujesz.",
];

/// Tips for a lesson title. Pure and deterministic.
#[must_use]
pub fn generate_tips(lesson_title: &str) -> Vec<String> {
    let title = lesson_title.to_lowercase();
    let tips = CATEGORIES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| title.contains(k)))
        .map_or(GENERIC_TIPS, |(_, tips)| tips);
    tips.iter().map(|t| (*t).to_string()).collect()
}
