//! Zone keys, display names and localized text.

use std::collections::BTreeMap;

use crate::config::Locale;

/// Turn a raw panel zone name into a stable key.
pub fn normalize_name(name: &str) -> String {
    let mut key = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            '.' | ' ' | '-' | '/' => key.push('_'),
            'ä' | 'Ä' => key.push_str("ae"),
            'ö' | 'Ö' => key.push_str("oe"),
            'ü' | 'Ü' => key.push_str("ue"),
            'ß' => key.push_str("ss"),
            other => key.push(other),
        }
    }
    key
}

/// Display name for a zone: override by key, then by raw name, else the key
/// with underscores turned into spaces.
pub fn friendly_name(key: &str, raw_name: &str, overrides: &BTreeMap<String, String>) -> String {
    overrides
        .get(key)
        .or_else(|| overrides.get(raw_name))
        .filter(|name| !name.is_empty())
        .cloned()
        .unwrap_or_else(|| key.replace('_', " "))
}

/// Sentence asking the user to close the given zones. Empty when none are open.
pub fn spoken_zone_list(zones: &[String], locale: Locale) -> String {
    let (single, several, and) = match locale {
        Locale::De => (
            "Ich konnte die Alarmanlage nicht aktivieren, bitte schließe:",
            "Ich konnte die Alarmanlage nicht aktivieren, bitte folgende Fenster und Türen schließen:",
            "und",
        ),
        Locale::En => (
            "I could not arm the alarm system, please close:",
            "I could not arm the alarm system, please close the following windows and doors:",
            "and",
        ),
    };

    match zones {
        [] => String::new(),
        [only] => format!("{single} {only}."),
        [head @ .., last] => format!("{several} {} {and} {last}.", head.join(", ")),
    }
}

/// Localized label for a raw mode. `None` when no mode is known yet.
pub fn mode_label(raw_mode: Option<&str>, locale: Locale) -> Option<String> {
    let raw = raw_mode?;
    let label = match (locale, raw) {
        (Locale::De, "set") => "Scharf",
        (Locale::De, "partset") => "Teilscharf",
        (Locale::De, "unset") => "Unscharf",
        (Locale::De, _) => "Unbekannt",
        (Locale::En, "set") => "Armed",
        (Locale::En, "partset") => "Armed home",
        (Locale::En, "unset") => "Disarmed",
        (Locale::En, _) => "Unknown",
    };
    Some(label.to_string())
}
