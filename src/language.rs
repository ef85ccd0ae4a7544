use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque language identifier understood by the model, e.g. `khm_Khmr`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LanguageTag(String);

impl LanguageTag {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Script derived from the `_Xxxx` suffix of NLLB-style codes.
    pub fn script(&self) -> Script {
        let suffix = self.0.rsplit_once('_').map(|(_, s)| s).unwrap_or("");
        Script::from_code(suffix)
    }
}

impl fmt::Display for LanguageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LanguageTag {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    Latin,
    Cyrillic,
    Arabic,
    Devanagari,
    Tamil,
    Hangul,
    HanSimplified,
    HanTraditional,
    Japanese,
    Thai,
    Khmer,
    Lao,
    Myanmar,
    Other,
}

impl Script {
    pub fn from_code(code: &str) -> Self {
        match code {
            "Latn" => Self::Latin,
            "Cyrl" => Self::Cyrillic,
            "Arab" => Self::Arabic,
            "Deva" => Self::Devanagari,
            "Taml" => Self::Tamil,
            "Hang" => Self::Hangul,
            "Hans" => Self::HanSimplified,
            "Hant" => Self::HanTraditional,
            "Jpan" => Self::Japanese,
            "Thai" => Self::Thai,
            "Khmr" => Self::Khmer,
            "Laoo" => Self::Lao,
            "Mymr" => Self::Myanmar,
            _ => Self::Other,
        }
    }

    /// Scripts written without spaces between words and often without
    /// sentence punctuation, which need positional splitting.
    pub fn lacks_boundaries(self) -> bool {
        matches!(self, Self::Thai | Self::Khmer | Self::Lao | Self::Myanmar)
    }

    /// Text joiner placed between independently translated pieces.
    pub fn joiner(self) -> &'static str {
        match self {
            Self::HanSimplified
            | Self::HanTraditional
            | Self::Japanese
            | Self::Thai
            | Self::Khmer
            | Self::Lao
            | Self::Myanmar => "",
            _ => " ",
        }
    }

    /// Rough characters-per-token ratio used when no tokenizer is reachable.
    pub fn chars_per_token(self) -> f64 {
        match self {
            Self::Khmer | Self::HanSimplified | Self::HanTraditional | Self::Japanese => 2.5,
            _ => 4.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    pub code: String,
    pub name: String,
}

impl Language {
    pub fn new(code: &str, name: &str) -> Self {
        Self {
            code: code.to_string(),
            name: name.to_string(),
        }
    }
}

/// Ordered set of languages offered to callers.
#[derive(Debug, Clone, PartialEq)]
pub struct LanguageCatalog {
    languages: Vec<Language>,
}

impl LanguageCatalog {
    pub fn new(languages: Vec<Language>) -> Self {
        Self { languages }
    }

    pub fn languages(&self) -> &[Language] {
        &self.languages
    }

    pub fn contains(&self, tag: &LanguageTag) -> bool {
        self.languages.iter().any(|l| l.code == tag.as_str())
    }

    pub fn name_of(&self, tag: &LanguageTag) -> Option<&str> {
        self.languages
            .iter()
            .find(|l| l.code == tag.as_str())
            .map(|l| l.name.as_str())
    }
}

impl Default for LanguageCatalog {
    fn default() -> Self {
        Self::new(default_languages())
    }
}

/// Languages exposed by default, in display order.
pub fn default_languages() -> Vec<Language> {
    [
        ("eng_Latn", "English"),
        ("khm_Khmr", "Khmer"),
        ("spa_Latn", "Spanish"),
        ("fra_Latn", "French"),
        ("deu_Latn", "German"),
        ("ita_Latn", "Italian"),
        ("por_Latn", "Portuguese"),
        ("rus_Cyrl", "Russian"),
        ("zho_Hans", "Chinese (Simplified)"),
        ("zho_Hant", "Chinese (Traditional)"),
        ("jpn_Jpan", "Japanese"),
        ("kor_Hang", "Korean"),
        ("ara_Arab", "Arabic"),
        ("hin_Deva", "Hindi"),
        ("tha_Thai", "Thai"),
        ("vie_Latn", "Vietnamese"),
        ("ind_Latn", "Indonesian"),
        ("tam_Taml", "Tamil"),
        ("tur_Latn", "Turkish"),
        ("pol_Latn", "Polish"),
    ]
    .iter()
    .map(|(code, name)| Language::new(code, name))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_from_tag() {
        assert_eq!(LanguageTag::from("khm_Khmr").script(), Script::Khmer);
        assert_eq!(LanguageTag::from("eng_Latn").script(), Script::Latin);
        assert_eq!(LanguageTag::from("zho_Hant").script(), Script::HanTraditional);
        assert_eq!(LanguageTag::from("en").script(), Script::Other);
    }

    #[test]
    fn test_joiners() {
        assert_eq!(Script::Latin.joiner(), " ");
        assert_eq!(Script::Japanese.joiner(), "");
        assert_eq!(Script::Other.joiner(), " ");
    }

    #[test]
    fn test_default_catalog_order() {
        let catalog = LanguageCatalog::default();
        assert_eq!(catalog.languages().len(), 20);
        assert_eq!(catalog.languages()[0].code, "eng_Latn");
        assert_eq!(catalog.languages()[1].code, "khm_Khmr");
        assert_eq!(catalog.name_of(&"pol_Latn".into()), Some("Polish"));
        assert!(!catalog.contains(&"xxx_Latn".into()));
    }
}
