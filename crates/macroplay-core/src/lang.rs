//! OCR language specs such as `"ru+en"`.

use crate::config::DEFAULT_OCR_LANG;

fn alias(code: &str) -> &str {
    match code {
        "ru" | "russian" => "rus",
        "en" | "english" => "eng",
        other => other,
    }
}

/// Split a spec into deduplicated, alias-resolved codes.
pub fn split_lang_spec(spec: &str) -> Vec<String> {
    let lower = spec.trim().to_lowercase();
    let mut out: Vec<String> = Vec::new();
    for part in lower.split(|c: char| c == '+' || c == ',' || c == ';' || c == '|' || c.is_whitespace()) {
        let code = alias(part.trim());
        if !code.is_empty() && !out.iter().any(|c| c == code) {
            out.push(code.to_string());
        }
    }
    out
}

/// Restrict a spec to installed languages, falling back to the default
/// language or the first installed one. With nothing installed the request
/// passes through unchanged.
pub fn normalize_lang_spec(spec: &str, available: &[String]) -> String {
    let available: Vec<String> = available
        .iter()
        .map(|l| l.trim().to_lowercase())
        .filter(|l| !l.is_empty() && l != "osd")
        .collect();
    let requested = split_lang_spec(spec);

    let selected: Vec<String> = if available.is_empty() {
        requested
    } else {
        requested.into_iter().filter(|c| available.contains(c)).collect()
    };
    if !selected.is_empty() {
        return selected.join("+");
    }
    if available.is_empty() || available.iter().any(|l| l == DEFAULT_OCR_LANG) {
        DEFAULT_OCR_LANG.to_string()
    } else {
        available[0].clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn langs(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn aliases_and_separators() {
        assert_eq!(split_lang_spec(" RU + english; ru|deu "), vec!["rus", "eng", "deu"]);
    }

    #[test]
    fn filters_to_installed() {
        assert_eq!(normalize_lang_spec("ru+en+jpn", &langs(&["eng", "rus", "osd"])), "rus+eng");
    }

    #[test]
    fn falls_back() {
        assert_eq!(normalize_lang_spec("jpn", &langs(&["eng", "rus"])), "rus");
        assert_eq!(normalize_lang_spec("jpn", &langs(&["eng", "deu"])), "eng");
        assert_eq!(normalize_lang_spec("", &[]), "rus");
        assert_eq!(normalize_lang_spec("en", &[]), "eng");
    }
}
