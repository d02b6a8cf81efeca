use std::fmt;
use std::str::FromStr;

use isolang::Language;

use crate::errors::LanguageError;

/// Language utilities for target-language handling
///
/// The set of target languages is closed: every supported language carries a
/// fixed pair of captions used to mark generated content in the output notebook.
/// Identifiers are accepted as English names, native names, or ISO 639-1 /
/// ISO 639-2 codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetLanguage {
    Chinese,
    English,
    Spanish,
    French,
    German,
    Japanese,
    Korean,
    Russian,
    Portuguese,
    Italian,
}

/// Captions marking generated content, one line each in the output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Labels {
    /// Caption placed above a translated text block
    pub translation_label: &'static str,
    /// Caption placed above an image description
    pub description_label: &'static str,
}

impl TargetLanguage {
    /// Every supported language, in display order
    pub const ALL: [TargetLanguage; 10] = [
        Self::Chinese,
        Self::English,
        Self::Spanish,
        Self::French,
        Self::German,
        Self::Japanese,
        Self::Korean,
        Self::Russian,
        Self::Portuguese,
        Self::Italian,
    ];

    /// English name, used in prompts
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Chinese => "Chinese",
            Self::English => "English",
            Self::Spanish => "Spanish",
            Self::French => "French",
            Self::German => "German",
            Self::Japanese => "Japanese",
            Self::Korean => "Korean",
            Self::Russian => "Russian",
            Self::Portuguese => "Portuguese",
            Self::Italian => "Italian",
        }
    }

    // @returns: Name of the language in the language itself
    pub fn native_name(&self) -> &'static str {
        match self {
            Self::Chinese => "中文",
            Self::English => "English",
            Self::Spanish => "Español",
            Self::French => "Français",
            Self::German => "Deutsch",
            Self::Japanese => "日本語",
            Self::Korean => "한국어",
            Self::Russian => "Русский",
            Self::Portuguese => "Português",
            Self::Italian => "Italiano",
        }
    }

    /// ISO 639-2/T code
    pub fn iso_code(&self) -> &'static str {
        match self {
            Self::Chinese => "zho",
            Self::English => "eng",
            Self::Spanish => "spa",
            Self::French => "fra",
            Self::German => "deu",
            Self::Japanese => "jpn",
            Self::Korean => "kor",
            Self::Russian => "rus",
            Self::Portuguese => "por",
            Self::Italian => "ita",
        }
    }

    /// Captions for this language
    pub fn labels(&self) -> Labels {
        let (translation_label, description_label) = match self {
            Self::Chinese => ("**翻译：**", "**图片说明：**"),
            Self::English => ("**Translation:**", "**Image Description:**"),
            Self::Spanish => ("**Traducción:**", "**Descripción de Imagen:**"),
            Self::French => ("**Traduction :**", "**Description d'Image :**"),
            Self::German => ("**Übersetzung:**", "**Bildbeschreibung:**"),
            Self::Japanese => ("**翻訳：**", "**画像説明：**"),
            Self::Korean => ("**번역:**", "**이미지 설명:**"),
            Self::Russian => ("**Перевод:**", "**Описание изображения:**"),
            Self::Portuguese => ("**Tradução:**", "**Descrição da Imagem:**"),
            Self::Italian => ("**Traduzione:**", "**Descrizione dell'Immagine:**"),
        };
        Labels {
            translation_label,
            description_label,
        }
    }

    /// Comma separated list of supported language names
    pub fn supported_list() -> String {
        Self::ALL
            .iter()
            .map(|l| l.display_name())
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn from_iso(code: &str) -> Option<Self> {
        let part2t = normalize_to_part2t(code)?;
        Self::ALL.iter().copied().find(|l| l.iso_code() == part2t)
    }
}

impl fmt::Display for TargetLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for TargetLanguage {
    type Err = LanguageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let lowered = trimmed.to_lowercase();

        let by_name = Self::ALL.iter().copied().find(|l| {
            l.display_name().to_lowercase() == lowered || l.native_name().to_lowercase() == lowered
        });

        by_name
            .or_else(|| Self::from_iso(&lowered))
            .ok_or_else(|| LanguageError::UnsupportedLanguage(trimmed.to_string(), Self::supported_list()))
    }
}

/// Resolve the captions for a language identifier.
///
/// Unsupported identifiers fail with `UnsupportedLanguage`, so callers can
/// validate before any model call is made.
pub fn labels_for(language: &str) -> Result<Labels, LanguageError> {
    language.parse::<TargetLanguage>().map(|l| l.labels())
}

/// Normalize an ISO 639-1 or ISO 639-2 (T or B) code to ISO 639-2/T
pub fn normalize_to_part2t(code: &str) -> Option<String> {
    let normalized_code = code.trim().to_lowercase();

    match normalized_code.len() {
        2 => Language::from_639_1(&normalized_code).map(|lang| lang.to_639_3().to_string()),
        3 => {
            if Language::from_639_3(&normalized_code).is_some() {
                return Some(normalized_code);
            }
            // ISO 639-2/B codes that differ from their /T counterpart
            let part2t = match normalized_code.as_str() {
                "fre" => "fra",
                "ger" => "deu",
                "chi" => "zho",
                "dut" => "nld",
                "gre" => "ell",
                "cze" => "ces",
                _ => return None,
            };
            Some(part2t.to_string())
        }
        _ => None,
    }
}
