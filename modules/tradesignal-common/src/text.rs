use std::sync::LazyLock;

use regex::Regex;

static MULTI_NEWLINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n+").unwrap());
static INLINE_SPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]+").unwrap());

/// Lines matching any of these are site chrome, not article body. Matched
/// case-insensitively from the start of the phrase to the end of the line.
static BOILERPLATE: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"Read more.*",
        r"Subscribe.*",
        r"Copyright.*",
        r"All rights reserved.*",
        r"Follow us on.*",
        r"Share this article.*",
    ]
    .iter()
    .map(|p| Regex::new(&format!("(?i){p}")).unwrap())
    .collect()
});

/// Normalize raw scraped article text before it is stored, embedded, or sent
/// to the classifier: collapse whitespace, strip boilerplate lines, and
/// replace typographic quotes with ASCII ones.
pub fn clean_article_text(raw_text: &str) -> String {
    let mut text = raw_text.replace('\r', "\n");
    text = MULTI_NEWLINE.replace_all(&text, "\n").into_owned();

    for pattern in BOILERPLATE.iter() {
        text = pattern.replace_all(&text, "").into_owned();
    }

    text = text
        .replace('\u{201c}', "\"")
        .replace('\u{201d}', "\"")
        .replace('\u{2018}', "'")
        .replace('\u{2019}', "'");

    text = INLINE_SPACE.replace_all(&text, " ").into_owned();
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_whitespace() {
        let cleaned = clean_article_text("Copper  rose\r\n\n\nsharply\ttoday");
        assert_eq!(cleaned, "Copper rose\nsharply today");
    }

    #[test]
    fn strips_boilerplate_lines() {
        let raw = "Prices climbed on Tuesday.\nSubscribe to our newsletter for updates\nFollow us on X";
        let cleaned = clean_article_text(raw);
        assert_eq!(cleaned, "Prices climbed on Tuesday.");
    }

    #[test]
    fn boilerplate_match_is_case_insensitive() {
        let cleaned = clean_article_text("Body text.\nREAD MORE about tariffs here");
        assert_eq!(cleaned, "Body text.");
    }

    #[test]
    fn normalizes_typographic_quotes() {
        let cleaned = clean_article_text("\u{201c}steel\u{201d} and \u{2018}iron\u{2019}");
        assert_eq!(cleaned, "\"steel\" and 'iron'");
    }
}
