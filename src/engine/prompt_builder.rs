use crate::engine::llm_client::ChatMessage;
use crate::model::game_spec::{Component, GameSpec};

/// Builds the chat messages sent to the model.
/// Only formats text: no parsing, no networking.
pub struct PromptBuilder;

impl PromptBuilder {
    pub fn game_messages(concept: &str) -> Vec<ChatMessage> {
        let mut system = String::new();
        push_game_system_prompt(&mut system);

        vec![
            ChatMessage::system(system),
            ChatMessage::user(format!(
                "Create a complete game based on this concept: {}",
                concept.trim()
            )),
        ]
    }

    pub fn regenerate_messages(
        component: Component,
        current: &GameSpec,
        concept: &str,
    ) -> Vec<ChatMessage> {
        let mut system = String::new();
        push_game_system_prompt(&mut system);
        system.push_str(&format!(
            "\n\nOnly regenerate the \"{}\" component. Return a JSON object containing that key. Ensure the JSON is valid and properly formatted.",
            component.keys()[0]
        ));

        // Diagnostics would only confuse the model.
        let mut snapshot = current.clone();
        snapshot.raw_model_output = None;
        snapshot.fallback_reason = None;
        let current_json =
            serde_json::to_string_pretty(&snapshot).unwrap_or_else(|_| "{}".to_string());

        let mut user = String::new();
        user.push_str(component_instruction(component));
        user.push_str("\n\nOriginal game concept: ");
        user.push_str(concept.trim());
        user.push_str("\n\nCurrent game data: ");
        user.push_str(&current_json);

        vec![ChatMessage::system(system), ChatMessage::user(user)]
    }

    pub fn name_list_messages(prompt: &str, n: usize) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(format!(
                "You are a creative prototype designer. Given a prompt, generate a comma-separated list of {n} unique, creative, and short names for prototype enemies or items that fit the theme or description. Reply with the list only."
            )),
            ChatMessage::user(prompt.trim().to_string()),
        ]
    }
}

fn component_instruction(component: Component) -> &'static str {
    match component {
        Component::Code => "Regenerate only the game code (JavaScript) for this game, keeping the same concept but with improved gameplay mechanics.",
        Component::Characters => "Regenerate only the characters array with new, more interesting characters while keeping the same game concept.",
        Component::Levels => "Regenerate only the levels array with new, more challenging level designs.",
        Component::Items => "Regenerate only the items array with new, more creative items and power-ups.",
        Component::ImagePrompts => "Regenerate only the image prompts with more detailed and artistic descriptions.",
    }
}

fn push_game_system_prompt(out: &mut String) {
    out.push_str(
        "You are an expert game developer and designer. Given a game concept, create a complete, structured game specification that includes all necessary components for a playable web-based game.\n\n",
    );
    out.push_str(
        "CRITICAL: Return ONLY a valid JSON object. Do not include any markdown formatting, code blocks, or explanatory text. The response must start with { and end with }.\n\n",
    );
    out.push_str("Return your response as a valid JSON object with this exact structure:\n\n");
    out.push_str(SCHEMA_EXAMPLE);
    out.push_str("\n\nIMPORTANT:\n");
    for rule in [
        "Ensure all strings are properly escaped",
        "Do not use line breaks within string values",
        "Use only standard ASCII characters",
        "Make the game code functional and complete",
        "Include proper game states, collision detection, scoring, and win/lose conditions",
    ] {
        out.push_str("- ");
        out.push_str(rule);
        out.push('\n');
    }
}

const SCHEMA_EXAMPLE: &str = r#"{
  "name": "Creative name for the game",
  "description": "Engaging 2-3 sentence description",
  "genre": "Game genre (e.g., RPG, Platformer, Puzzle)",
  "theme": "Visual or narrative theme",
  "difficulty": "easy | medium | hard",
  "rules": "Clear, concise game rules and objectives",
  "mechanics": ["Core gameplay mechanic 1", "Core gameplay mechanic 2"],
  "characters": [
    {
      "name": "Character name",
      "role": "player",
      "description": "Character description",
      "stats": {"health": 100, "attack": 10, "defense": 5, "speed": 5},
      "abilities": ["Ability"]
    }
  ],
  "items": [
    {"name": "Item name", "type": "weapon", "description": "Item description", "effect": "Item effect", "rarity": "common"}
  ],
  "levels": [
    {"name": "Level name", "description": "Level description", "environment": "forest", "objectives": ["Objective 1"], "enemies": ["Enemy name"], "items": ["Item name"]}
  ],
  "controls": {"movement": "Arrow keys", "action": "Spacebar", "special": "Mouse click"},
  "code": "Complete HTML5 Canvas game code in JavaScript. Include canvas setup, game loop, input handling, collision detection, and win/lose conditions. Make it fully playable.",
  "htmlStructure": "<canvas id='gameCanvas' width='800' height='600'></canvas>",
  "styles": "body { margin: 0; } canvas { border: 1px solid black; }",
  "imagePrompts": ["Detailed prompt for generating a game asset"],
  "soundPrompts": ["Short description of a sound effect"]
}"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::recovery::FallbackReason;

    #[test]
    fn game_prompt_embeds_concept_and_schema() {
        let msgs = PromptBuilder::game_messages("  a snake game on mars ");
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0].role, "system");
        assert!(msgs[0].content.contains("\"code\""));
        assert!(msgs[1]
            .content
            .ends_with("this concept: a snake game on mars"));
    }

    #[test]
    fn regenerate_prompt_names_component_and_hides_raw_output() {
        let current = GameSpec::fallback("p", "SECRET RAW TEXT", &FallbackReason::NoCandidate);
        let msgs = PromptBuilder::regenerate_messages(Component::Levels, &current, "p");

        assert!(msgs[0].content.contains("Only regenerate the \"levels\" component"));
        assert!(msgs[1].content.starts_with("Regenerate only the levels array"));
        assert!(!msgs[1].content.contains("SECRET RAW TEXT"));
    }

    #[test]
    fn name_list_prompt_asks_for_count() {
        let msgs = PromptBuilder::name_list_messages("haunted castle", 7);
        assert!(msgs[0].content.contains("list of 7 unique"));
        assert_eq!(msgs[1].content, "haunted castle");
    }
}
