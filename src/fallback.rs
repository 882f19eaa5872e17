//! Emergency fallback: an offline, deterministic last resort.
//!
//! Used only when no provider produced anything usable. It looks for known
//! animal names in the image's file name and never fails. Its answers are
//! always tagged as fallback results so the UI can warn the user.

use crate::types::{ClassificationOutcome, ImagePayload, UNIDENTIFIED_LABEL};
use serde_json::json;

pub const FALLBACK_PROVIDER_NAME: &str = "emergency-fallback";

/// A file-name token equals a known keyword.
pub const EXACT_MATCH_CONFIDENCE: f64 = 0.65;
/// A known keyword appears inside a file-name token ("tigers", "foxcub").
pub const PARTIAL_MATCH_CONFIDENCE: f64 = 0.55;
/// Nothing matched.
pub const NO_MATCH_CONFIDENCE: f64 = 0.45;

const DEFAULT_KEYWORDS: &[(&str, &str)] = &[
    ("tiger", "Tiger"),
    ("lion", "Lion"),
    ("leopard", "Leopard"),
    ("cheetah", "Cheetah"),
    ("jaguar", "Jaguar"),
    ("elephant", "Elephant"),
    ("giraffe", "Giraffe"),
    ("zebra", "Zebra"),
    ("rhino", "Rhinoceros"),
    ("hippo", "Hippopotamus"),
    ("gorilla", "Gorilla"),
    ("chimpanzee", "Chimpanzee"),
    ("orangutan", "Orangutan"),
    ("panda", "Giant Panda"),
    ("bear", "Bear"),
    ("wolf", "Gray Wolf"),
    ("fox", "Red Fox"),
    ("deer", "Deer"),
    ("moose", "Moose"),
    ("bison", "Bison"),
    ("kangaroo", "Kangaroo"),
    ("koala", "Koala"),
    ("eagle", "Eagle"),
    ("owl", "Owl"),
    ("hawk", "Hawk"),
    ("parrot", "Parrot"),
    ("flamingo", "Flamingo"),
    ("penguin", "Penguin"),
    ("dolphin", "Dolphin"),
    ("whale", "Whale"),
    ("shark", "Shark"),
    ("turtle", "Sea Turtle"),
    ("crocodile", "Crocodile"),
    ("snake", "Snake"),
    ("frog", "Frog"),
    ("butterfly", "Butterfly"),
    ("squirrel", "Squirrel"),
    ("rabbit", "Rabbit"),
    ("raccoon", "Raccoon"),
    ("otter", "Otter"),
];

#[derive(Debug, Clone)]
pub struct EmergencyFallback {
    keywords: Vec<(String, String)>,
}

impl EmergencyFallback {
    pub fn new() -> Self {
        Self {
            keywords: DEFAULT_KEYWORDS
                .iter()
                .map(|(k, l)| (k.to_string(), l.to_string()))
                .collect(),
        }
    }

    /// Replace the keyword table. Keywords are matched lowercase.
    pub fn with_keywords<I, K, L>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = (K, L)>,
        K: Into<String>,
        L: Into<String>,
    {
        self.keywords = keywords
            .into_iter()
            .map(|(k, l)| (k.into().to_lowercase(), l.into()))
            .collect();
        self
    }

    fn file_tokens(image: &ImagePayload) -> Vec<String> {
        let Some(name) = image.file_name.as_deref() else {
            return Vec::new();
        };
        let stem = match name.rsplit_once('.') {
            Some((stem, _ext)) if !stem.is_empty() => stem,
            _ => name,
        };
        stem.to_lowercase()
            .split(|c: char| !c.is_ascii_alphabetic())
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Always succeeds. The outcome carries `metadata.fallback = true`.
    pub fn classify(&self, image: &ImagePayload) -> ClassificationOutcome {
        let tokens = Self::file_tokens(image);

        let exact = tokens.iter().find_map(|t| {
            self.keywords
                .iter()
                .find(|(k, _)| k == t)
                .map(|(k, l)| (k, l, EXACT_MATCH_CONFIDENCE))
        });
        let matched = exact.or_else(|| {
            tokens.iter().find_map(|t| {
                self.keywords
                    .iter()
                    .find(|(k, _)| t.contains(k.as_str()))
                    .map(|(k, l)| (k, l, PARTIAL_MATCH_CONFIDENCE))
            })
        });

        match matched {
            Some((keyword, label, confidence)) => {
                ClassificationOutcome::new(label.clone(), confidence, FALLBACK_PROVIDER_NAME)
                    .with_metadata(json!({
                        "fallback": true,
                        "heuristic": "file_name_keyword",
                        "matchedKeyword": keyword,
                    }))
            }
            None => ClassificationOutcome::new(
                UNIDENTIFIED_LABEL,
                NO_MATCH_CONFIDENCE,
                FALLBACK_PROVIDER_NAME,
            )
            .with_metadata(json!({
                "fallback": true,
                "heuristic": "none",
            })),
        }
    }
}

impl Default for EmergencyFallback {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(name: Option<&str>) -> ImagePayload {
        let img = ImagePayload::new(vec![0xFF, 0xD8, 0xFF, 0xE0]);
        match name {
            Some(n) => img.with_file_name(n),
            None => img,
        }
    }

    #[test]
    fn test_exact_token_match() {
        let o = EmergencyFallback::new().classify(&image(Some("IMG_2041_tiger.JPG")));
        assert_eq!(o.label, "Tiger");
        assert_eq!(o.confidence, EXACT_MATCH_CONFIDENCE);
        assert_eq!(o.source_provider_name, FALLBACK_PROVIDER_NAME);
        assert_eq!(o.metadata.unwrap()["fallback"], true);
    }

    #[test]
    fn test_exact_match_beats_earlier_partial() {
        // "foxes" only partially matches, "owl" matches exactly
        let o = EmergencyFallback::new().classify(&image(Some("foxes-and-owl.png")));
        assert_eq!(o.label, "Owl");
    }

    #[test]
    fn test_partial_match() {
        let o = EmergencyFallback::new().classify(&image(Some("baby_elephants.webp")));
        assert_eq!(o.label, "Elephant");
        assert_eq!(o.confidence, PARTIAL_MATCH_CONFIDENCE);
    }

    #[test]
    fn test_no_match_is_unidentified() {
        let fb = EmergencyFallback::new();
        for name in [None, Some("DSC_0001.jpg"), Some(".jpg")] {
            let o = fb.classify(&image(name));
            assert_eq!(o.label, UNIDENTIFIED_LABEL);
            assert_eq!(o.confidence, NO_MATCH_CONFIDENCE);
        }
    }

    #[test]
    fn test_custom_keywords() {
        let fb = EmergencyFallback::new().with_keywords([("Quokka", "Quokka")]);
        assert_eq!(fb.classify(&image(Some("quokka.jpg"))).label, "Quokka");
        assert_eq!(fb.classify(&image(Some("tiger.jpg"))).label, UNIDENTIFIED_LABEL);
    }

    #[test]
    fn test_deterministic() {
        let fb = EmergencyFallback::new();
        let a = fb.classify(&image(Some("red_fox_1.jpg")));
        let b = fb.classify(&image(Some("red_fox_1.jpg")));
        assert_eq!(a, b);
    }
}
