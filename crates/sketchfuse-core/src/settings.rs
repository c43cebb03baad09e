//! Generation configuration.

use serde::{Deserialize, Serialize};

/// How a combination is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMode {
    /// Fetch textual combination ideas first; the user picks one and the
    /// combination is generated from it.
    #[default]
    Options,
    /// Generate the combination in a single call.
    Instant,
}

/// Session-scoped generation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Active generation mode.
    pub mode: GenerationMode,
    /// Visual bounding-box edge length of a sketch object, feeding the
    /// overlap resolver's footprint.
    pub canvas_size: f64,
    /// Number of combination ideas to request in options mode.
    pub response_count: usize,
    /// Prompt preamble for the options query.
    pub options_prompt: String,
    /// Prompt preamble for an option-directed combination.
    pub option_combination_prompt: String,
    /// Prompt for an instant combination.
    pub instant_prompt: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mode: GenerationMode::default(),
            canvas_size: crate::overlap::DEFAULT_FOOTPRINT,
            response_count: 3,
            options_prompt: "How might these sketches be combined in a creative, childlike \
                way? These should be ideas that can be drawn in a simple sketch."
                .to_string(),
            option_combination_prompt: "Generate a new sketch based off of these existing \
                sketches and the stated prompt. Keep the basic line style of the original \
                sketches. Use the same colors as the original sketches."
                .to_string(),
            instant_prompt: "How might these sketches be combined in a creative, childlike \
                way? These should be ideas that can be drawn in a simple sketch. List 3 \
                options for how to combine the sketches. Generate a new sketch based off of \
                the existing sketches and the best option of the 3. Keep the basic black \
                and white line style of the original sketches."
                .to_string(),
        }
    }
}

impl Settings {
    /// Create default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the prompt for a combination request.
    ///
    /// In options mode a chosen idea is appended to the option-combination
    /// preamble; without one (or in instant mode) the instant prompt is used.
    pub fn combination_prompt(&self, option: Option<&str>) -> String {
        match (self.mode, option) {
            (GenerationMode::Options, Some(option)) => {
                format!("{} Prompt: {}", self.option_combination_prompt, option)
            }
            _ => self.instant_prompt.clone(),
        }
    }

    /// Build the prompt for an options query.
    pub fn options_query_prompt(&self) -> String {
        format!("{} List {} options.", self.options_prompt, self.response_count)
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::new();
        assert_eq!(settings.mode, GenerationMode::Options);
        assert_eq!(settings.response_count, 3);
        assert!((settings.canvas_size - 200.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_option_directed_prompt() {
        let settings = Settings::new();
        let prompt = settings.combination_prompt(Some("a cat riding a bicycle"));
        assert!(prompt.starts_with(&settings.option_combination_prompt));
        assert!(prompt.ends_with("Prompt: a cat riding a bicycle"));
    }

    #[test]
    fn test_instant_mode_ignores_option() {
        let mut settings = Settings::new();
        settings.mode = GenerationMode::Instant;
        assert_eq!(
            settings.combination_prompt(Some("ignored")),
            settings.instant_prompt
        );
    }

    #[test]
    fn test_options_mode_without_choice_falls_back() {
        let settings = Settings::new();
        assert_eq!(settings.combination_prompt(None), settings.instant_prompt);
    }

    #[test]
    fn test_options_query_prompt_counts() {
        let mut settings = Settings::new();
        settings.response_count = 5;
        assert!(settings.options_query_prompt().ends_with("List 5 options."));
    }

    #[test]
    fn test_json_roundtrip() {
        let mut settings = Settings::new();
        settings.mode = GenerationMode::Instant;
        settings.canvas_size = 320.0;

        let json = settings.to_json().unwrap();
        assert_eq!(Settings::from_json(&json).unwrap(), settings);
    }
}
