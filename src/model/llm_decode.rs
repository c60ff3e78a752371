use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::model::defaults;
use crate::model::game_spec::{Component, Difficulty, GameSpec};
use crate::model::recovery::FallbackReason;

const NAME_KEYS: &[&str] = &["name", "gameName", "title"];
const CODE_KEYS: &[&str] = &["code", "gameCode"];

/// Turn a parsed (or failed) model response into a renderable GameSpec.
/// Never fails: anything unusable becomes a fallback spec carrying `raw`.
pub fn normalize(parsed: Result<&Value, FallbackReason>, prompt: &str, raw: &str) -> GameSpec {
    let reason = match parsed.and_then(decode_game_spec) {
        Ok(spec) => return spec,
        Err(reason) => reason,
    };

    warn!("falling back to placeholder game: {reason}");
    GameSpec::fallback(prompt, raw, &reason)
}

/// Decode untyped model JSON into a GameSpec, backfilling absent optional
/// fields. A missing name or code rejects the whole object.
pub fn decode_game_spec(value: &Value) -> Result<GameSpec, FallbackReason> {
    let Value::Object(obj) = value else {
        return Err(FallbackReason::NotAnObject);
    };

    let name = required_text(obj, NAME_KEYS).ok_or(FallbackReason::MissingName)?;
    let code = required_text(obj, CODE_KEYS).ok_or(FallbackReason::MissingCode)?;

    Ok(GameSpec {
        name,
        description: text(obj, &["description"])
            .unwrap_or_else(|| defaults::DEFAULT_DESCRIPTION.into()),
        genre: text(obj, &["genre"]).unwrap_or_else(|| defaults::DEFAULT_GENRE.into()),
        theme: text(obj, &["theme"]).unwrap_or_else(|| defaults::DEFAULT_THEME.into()),
        difficulty: difficulty(obj),
        rules: text(obj, &["rules"]).unwrap_or_else(|| defaults::DEFAULT_RULES.into()),
        mechanics: string_list(obj, &["mechanics"]).unwrap_or_else(defaults::mechanics),
        characters: object_list(obj, &["characters"]).unwrap_or_else(defaults::characters),
        items: object_list(obj, &["items"]).unwrap_or_else(defaults::items),
        levels: object_list(obj, &["levels"]).unwrap_or_else(defaults::levels),
        controls: object(obj, &["controls"]).unwrap_or_else(defaults::controls),
        code,
        html_structure: text(obj, &["htmlStructure", "html_structure"])
            .unwrap_or_else(|| defaults::DEFAULT_HTML_STRUCTURE.into()),
        styles: text(obj, &["styles", "cssStyles", "css"])
            .unwrap_or_else(|| defaults::DEFAULT_STYLES.into()),
        image_prompts: prompt_list(obj, &["imagePrompts", "image_prompts"])
            .unwrap_or_else(defaults::image_prompts),
        sound_prompts: prompt_list(obj, &["soundPrompts", "sound_prompts"]).unwrap_or_default(),
        used_fallback: false,
        fallback_reason: None,
        raw_model_output: None,
    })
}

/// Replace one component of `base` with the value found in a regenerated
/// response. Everything else in `base` is kept as-is.
pub fn merge_component(
    base: &GameSpec,
    component: Component,
    value: &Value,
) -> Result<GameSpec, FallbackReason> {
    let Value::Object(obj) = value else {
        return Err(FallbackReason::NotAnObject);
    };

    let missing = FallbackReason::MissingComponent(component.label());
    let keys = component.keys();
    let mut spec = base.clone();

    match component {
        Component::Code => spec.code = required_text(obj, keys).ok_or(missing)?,
        Component::Characters => spec.characters = object_list(obj, keys).ok_or(missing)?,
        Component::Levels => spec.levels = object_list(obj, keys).ok_or(missing)?,
        Component::Items => spec.items = object_list(obj, keys).ok_or(missing)?,
        Component::ImagePrompts => spec.image_prompts = prompt_list(obj, keys).ok_or(missing)?,
    }

    Ok(spec)
}

/* =========================
   Field helpers
   ========================= */

/// First key that is present and not null.
fn lookup<'a>(obj: &'a Map<String, Value>, keys: &[&'a str]) -> Option<(&'a str, &'a Value)> {
    keys.iter()
        .find_map(|key| obj.get(*key).filter(|v| !v.is_null()).map(|v| (*key, v)))
}

fn wrong_type(key: &str, expected: &str, got: &Value) {
    warn!(
        "ignoring field '{key}': expected {expected}, got {}",
        type_name(got)
    );
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn text(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    match lookup(obj, keys)? {
        (_, Value::String(s)) => Some(s.clone()),
        (key, other) => {
            wrong_type(key, "string", other);
            None
        }
    }
}

fn required_text(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    text(obj, keys).filter(|s| !s.trim().is_empty())
}

fn difficulty(obj: &Map<String, Value>) -> Difficulty {
    match text(obj, &["difficulty"]) {
        Some(raw) => Difficulty::parse(&raw).unwrap_or_else(|| {
            debug!("unknown difficulty '{raw}', using medium");
            Difficulty::default()
        }),
        None => Difficulty::default(),
    }
}

fn array<'a>(obj: &'a Map<String, Value>, keys: &[&'a str]) -> Option<&'a Vec<Value>> {
    match lookup(obj, keys)? {
        (_, Value::Array(items)) => Some(items),
        (key, other) => {
            wrong_type(key, "array", other);
            None
        }
    }
}

fn string_list(obj: &Map<String, Value>, keys: &[&str]) -> Option<Vec<String>> {
    let items = array(obj, keys)?;
    Some(
        items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                other => {
                    debug!("skipping non-string list entry ({})", type_name(other));
                    None
                }
            })
            .collect(),
    )
}

/// Prompt lists come either as plain strings or as `{type, name, prompt}`.
fn prompt_list(obj: &Map<String, Value>, keys: &[&str]) -> Option<Vec<String>> {
    let items = array(obj, keys)?;
    Some(
        items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Object(fields) => fields
                    .get("prompt")
                    .or_else(|| fields.get("description"))
                    .and_then(Value::as_str)
                    .map(str::to_string),
                _ => None,
            })
            .collect(),
    )
}

/// Decode each entry on its own so one malformed entry doesn't lose the rest.
fn object_list<T: DeserializeOwned>(obj: &Map<String, Value>, keys: &[&str]) -> Option<Vec<T>> {
    let items = array(obj, keys)?;
    let mut decoded = Vec::with_capacity(items.len());
    for item in items {
        if !has_name(item) {
            warn!("skipping unnamed entry in '{}'", keys[0]);
            continue;
        }
        match serde_json::from_value::<T>(item.clone()) {
            Ok(entry) => decoded.push(entry),
            Err(e) => warn!("skipping malformed entry in '{}': {e}", keys[0]),
        }
    }
    Some(decoded)
}

/// Entries without a name are placeholders left by truncation.
fn has_name(item: &Value) -> bool {
    item.get("name")
        .and_then(Value::as_str)
        .is_some_and(|name| !name.trim().is_empty())
}

fn object<T: DeserializeOwned>(obj: &Map<String, Value>, keys: &[&str]) -> Option<T> {
    let (key, value) = lookup(obj, keys)?;
    match serde_json::from_value::<T>(value.clone()) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            warn!("ignoring field '{key}': {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::game_spec::{Character, Controls};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn minimal_object_is_backfilled() {
        let spec = decode_game_spec(&json!({"name": "Foo", "code": "x=1;"})).unwrap();

        assert_eq!(spec.name, "Foo");
        assert_eq!(spec.code, "x=1;");
        assert!(!spec.used_fallback);
        assert_eq!(spec.mechanics, vec!["Movement".to_string(), "Interaction".to_string()]);
        assert_eq!(spec.characters.len(), 1);
        assert_eq!(spec.controls, Controls::default());
        assert!(spec.sound_prompts.is_empty());
        assert_eq!(spec.fallback_reason, None);
    }

    #[test]
    fn present_fields_are_not_overwritten() {
        let spec = decode_game_spec(&json!({
            "name": "  Spaced  ",
            "code": "a();\nb();",
            "description": "",
            "mechanics": [],
            "characters": [],
            "controls": {"movement": "WASD"},
        }))
        .unwrap();

        assert_eq!(spec.name, "  Spaced  ");
        assert_eq!(spec.code, "a();\nb();");
        assert_eq!(spec.description, "");
        assert!(spec.mechanics.is_empty());
        assert!(spec.characters.is_empty());
        assert_eq!(spec.controls.movement, "WASD");
        assert_eq!(spec.controls.action, "Spacebar");
    }

    #[test]
    fn accepts_original_key_names() {
        let spec = decode_game_spec(&json!({
            "gameName": "Legacy",
            "gameCode": "run();",
            "cssStyles": "body{}",
            "htmlStructure": "<canvas></canvas>",
            "imagePrompts": [{"type": "character", "name": "Hero", "prompt": "a hero"}, "a map"],
        }))
        .unwrap();

        assert_eq!(spec.name, "Legacy");
        assert_eq!(spec.code, "run();");
        assert_eq!(spec.styles, "body{}");
        assert_eq!(spec.html_structure, "<canvas></canvas>");
        assert_eq!(spec.image_prompts, vec!["a hero".to_string(), "a map".to_string()]);
    }

    #[test]
    fn missing_name_or_code_is_rejected() {
        assert_eq!(
            decode_game_spec(&json!({"code": "z=3;"})),
            Err(FallbackReason::MissingName)
        );
        assert_eq!(
            decode_game_spec(&json!({"name": "N", "code": "   "})),
            Err(FallbackReason::MissingCode)
        );
        assert_eq!(
            decode_game_spec(&json!({"name": 7, "code": "x"})),
            Err(FallbackReason::MissingName)
        );
        assert_eq!(decode_game_spec(&json!([1, 2])), Err(FallbackReason::NotAnObject));
    }

    #[test]
    fn wrong_typed_optionals_are_backfilled() {
        let spec = decode_game_spec(&json!({
            "name": "N",
            "code": "c",
            "mechanics": "jump",
            "difficulty": "nightmare",
            "controls": "keyboard",
        }))
        .unwrap();

        assert_eq!(spec.mechanics, defaults::mechanics());
        assert_eq!(spec.difficulty, Difficulty::Medium);
        assert_eq!(spec.controls, Controls::default());
    }

    #[test]
    fn malformed_list_entries_are_skipped_individually() {
        let spec = decode_game_spec(&json!({
            "name": "N",
            "code": "c",
            "characters": [{"name": "Knight", "type": "player", "stats": {"health": 80}}, "oops", 3],
            "mechanics": ["Jump", 4, "Dash"],
        }))
        .unwrap();

        assert_eq!(spec.characters.len(), 1);
        let Character { name, role, stats, .. } = &spec.characters[0];
        assert_eq!(name, "Knight");
        assert_eq!(role, "player");
        assert_eq!(stats.health, 80.0);
        assert_eq!(stats.attack, 10.0);
        assert_eq!(spec.mechanics, vec!["Jump".to_string(), "Dash".to_string()]);
    }

    #[test]
    fn unnamed_list_entries_are_skipped() {
        let spec = decode_game_spec(&json!({
            "name": "N",
            "code": "c",
            "characters": [{}],
            "levels": [{"description": "x"}, {"name": "  "}, {"name": "Cave"}],
        }))
        .unwrap();

        assert!(spec.characters.is_empty());
        assert_eq!(spec.levels.len(), 1);
        assert_eq!(spec.levels[0].name, "Cave");
    }

    #[test]
    fn normalize_falls_back_with_provenance() {
        let raw = r#"{"code":"z=3;"}"#;
        let value: Value = serde_json::from_str(raw).unwrap();
        let spec = normalize(Ok(&value), "a puzzle", raw);

        assert!(spec.used_fallback);
        assert_eq!(spec.raw_model_output.as_deref(), Some(raw));
        assert_eq!(
            spec.fallback_reason.as_deref(),
            Some("AI output had no usable game name")
        );
    }

    #[test]
    fn normalize_passes_failure_reason_through() {
        let spec = normalize(Err(FallbackReason::RepairExhausted), "p", "{{{");
        assert_eq!(
            spec.fallback_reason,
            Some(FallbackReason::RepairExhausted.to_string())
        );
    }

    #[test]
    fn merge_replaces_only_the_component() {
        let base = decode_game_spec(&json!({"name": "Base", "code": "old();"})).unwrap();
        let merged = merge_component(
            &base,
            Component::Levels,
            &json!({"name": "Other", "levels": [{"name": "Cave", "enemies": ["Bat"]}]}),
        )
        .unwrap();

        assert_eq!(merged.name, "Base");
        assert_eq!(merged.code, "old();");
        assert_eq!(merged.levels.len(), 1);
        assert_eq!(merged.levels[0].enemies, vec!["Bat".to_string()]);
    }

    #[test]
    fn merge_requires_the_component() {
        let base = decode_game_spec(&json!({"name": "Base", "code": "old();"})).unwrap();
        let err = merge_component(&base, Component::Code, &json!({"name": "x"})).unwrap_err();
        assert_eq!(err, FallbackReason::MissingComponent("Game code"));
    }
}
