//! Text normalization for rule matching
//!
//! Both the inbound text and every keyword pass through the same normalizer,
//! so comparisons ignore case, punctuation and (optionally) diacritics.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Canonicalizes text before comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Normalizer {
    strip_diacritics: bool,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self {
            strip_diacritics: true,
        }
    }
}

impl Normalizer {
    pub fn new(strip_diacritics: bool) -> Self {
        Self { strip_diacritics }
    }

    /// Whether accents are removed ("café" compares equal to "cafe")
    pub fn strips_diacritics(&self) -> bool {
        self.strip_diacritics
    }

    /// Normalize text: fold diacritics, lowercase, keep only letters, digits and whitespace.
    ///
    /// Never fails. Code points that are not letters, digits or whitespace are
    /// dropped. Composition runs last so the result is already in NFC and a
    /// second pass returns it unchanged.
    pub fn normalize(&self, text: &str) -> String {
        let folded: String = if self.strip_diacritics {
            text.nfd().filter(|c| !is_combining_mark(*c)).collect()
        } else {
            text.nfc().collect()
        };

        folded
            .chars()
            .flat_map(char::to_lowercase)
            .filter(|c| c.is_alphanumeric() || c.is_whitespace())
            .nfc()
            .collect()
    }
}

/// Normalize with the default options (diacritics stripped)
pub fn normalize(text: &str) -> String {
    Normalizer::default().normalize(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercases_and_strips_punctuation() {
        assert_eq!(normalize("Hello~World!"), "helloworld");
        assert_eq!(normalize("Don't"), "dont");
        assert_eq!(normalize("This is an URGENT alert!"), "this is an urgent alert");
    }

    #[test]
    fn test_strips_diacritics_by_default() {
        assert_eq!(normalize("Café~"), "cafe");
        assert_eq!(normalize("Ação rápida"), "acao rapida");
        assert_eq!(normalize("NAÏVE"), "naive");
    }

    #[test]
    fn test_keeps_diacritics_when_disabled() {
        let normalizer = Normalizer::new(false);
        assert!(!normalizer.strips_diacritics());
        assert_eq!(normalizer.normalize("Café~"), "café");
        // Decomposed input is recomposed, not split
        assert_eq!(normalizer.normalize("Cafe\u{301}"), "café");
    }

    #[test]
    fn test_drops_emoji_and_symbols() {
        assert_eq!(normalize("🚀 launch $100 #now"), " launch 100 now");
    }

    #[test]
    fn test_keeps_non_latin_scripts() {
        assert_eq!(normalize("Привет, Мир!"), "привет мир");
        assert_eq!(normalize("東京 2024"), "東京 2024");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("!!!"), "");
    }

    #[test]
    fn test_composes_after_filtering() {
        assert_eq!(normalize("\u{1100}!\u{1161}"), "\u{AC00}");
        assert_eq!(Normalizer::new(false).normalize("α!\u{345}"), "\u{1FB3}");
    }

    #[test]
    fn test_idempotent() {
        let samples = [
            "This is an URGENT alert!",
            "Café crème brûlée",
            "İstanbul ǅemal",
            "Ｆｕｌｌｗｉｄｔｈ ＡＢＣ",
            "東京 🚀 Привет",
            "a\u{301}\u{302}b",
            // Filtering leaves composable neighbours behind
            "\u{1100}!\u{1161}",
            "α!\u{345}",
        ];
        for normalizer in [Normalizer::new(true), Normalizer::new(false)] {
            for sample in samples {
                let once = normalizer.normalize(sample);
                assert_eq!(normalizer.normalize(&once), once, "input: {sample:?}");
            }
        }
    }
}
