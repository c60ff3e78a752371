use serde::{Deserialize, Serialize};

use crate::model::defaults;
use crate::model::recovery::FallbackReason;

/// The normalized description of a generated game.
///
/// Every list is always present (possibly empty) and `name` / `code` are
/// never empty once a spec has left the normalizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSpec {
    pub name: String,
    pub description: String,
    pub genre: String,
    pub theme: String,
    pub difficulty: Difficulty,
    pub rules: String,
    pub mechanics: Vec<String>,
    pub characters: Vec<Character>,
    pub items: Vec<Item>,
    pub levels: Vec<Level>,
    pub controls: Controls,
    pub code: String,
    pub html_structure: String,
    pub styles: String,
    pub image_prompts: Vec<String>,
    pub sound_prompts: Vec<String>,

    pub used_fallback: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
    #[serde(default, alias = "rawLlamaOutput", skip_serializing_if = "Option::is_none")]
    pub raw_model_output: Option<String>,
}

impl GameSpec {
    /// Always-renderable spec used when the model output cannot be recovered.
    /// The raw text is kept so the user can see what the model said.
    pub fn fallback(prompt: &str, raw: &str, reason: &FallbackReason) -> Self {
        let concept = prompt.trim();
        let description = if concept.is_empty() {
            "AI output could not be parsed. This is a minimal fallback; see the raw model output."
                .to_string()
        } else {
            format!(
                "AI output for \"{concept}\" could not be parsed. This is a minimal fallback; see the raw model output."
            )
        };

        Self {
            name: defaults::FALLBACK_NAME.into(),
            description,
            genre: "Unknown".into(),
            theme: "Unknown".into(),
            difficulty: Difficulty::Medium,
            rules: String::new(),
            mechanics: Vec::new(),
            characters: Vec::new(),
            items: Vec::new(),
            levels: Vec::new(),
            controls: Controls::default(),
            code: defaults::default_game_code(),
            html_structure: defaults::DEFAULT_HTML_STRUCTURE.into(),
            styles: defaults::DEFAULT_STYLES.into(),
            image_prompts: Vec::new(),
            sound_prompts: Vec::new(),
            used_fallback: true,
            fallback_reason: Some(reason.to_string()),
            raw_model_output: Some(raw.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "medium" | "normal" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Character {
    pub name: String,
    #[serde(alias = "type")]
    pub role: String,
    pub description: String,
    pub stats: Stats,
    pub abilities: Vec<String>,
}

impl Default for Character {
    fn default() -> Self {
        Self {
            name: "Player".into(),
            role: "player".into(),
            description: String::new(),
            stats: Stats::default(),
            abilities: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Stats {
    pub health: f64,
    pub attack: f64,
    pub defense: f64,
    pub speed: f64,
}

impl Default for Stats {
    fn default() -> Self {
        Self {
            health: 100.0,
            attack: 10.0,
            defense: 5.0,
            speed: 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Item {
    pub name: String,
    #[serde(rename = "type")]
    pub item_type: String,
    pub description: String,
    pub effect: String,
    pub rarity: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Level {
    pub name: String,
    pub description: String,
    pub environment: String,
    pub objectives: Vec<String>,
    pub enemies: Vec<String>,
    pub items: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Controls {
    pub movement: String,
    pub action: String,
    pub special: String,
}

impl Default for Controls {
    fn default() -> Self {
        Self {
            movement: "Arrow keys".into(),
            action: "Spacebar".into(),
            special: "Mouse click".into(),
        }
    }
}

/// A part of a spec that can be regenerated on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Component {
    Code,
    Characters,
    Levels,
    Items,
    ImagePrompts,
}

impl Component {
    pub const ALL: [Component; 5] = [
        Component::Code,
        Component::Characters,
        Component::Levels,
        Component::Items,
        Component::ImagePrompts,
    ];

    /// JSON keys the model may use for this component, preferred first.
    pub fn keys(&self) -> &'static [&'static str] {
        match self {
            Component::Code => &["code", "gameCode"],
            Component::Characters => &["characters"],
            Component::Levels => &["levels"],
            Component::Items => &["items"],
            Component::ImagePrompts => &["imagePrompts", "image_prompts"],
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Component::Code => "Game code",
            Component::Characters => "Characters",
            Component::Levels => "Levels",
            Component::Items => "Items",
            Component::ImagePrompts => "Image prompts",
        }
    }
}
