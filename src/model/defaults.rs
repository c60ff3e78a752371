//! Backfill table for optional fields the model left out.

use crate::model::game_spec::{Character, Controls, Item, Level, Stats};

pub const FALLBACK_NAME: &str = "Untitled Prototype";

pub const DEFAULT_DESCRIPTION: &str = "An exciting game generated from your prompt.";
pub const DEFAULT_GENRE: &str = "Adventure";
pub const DEFAULT_THEME: &str = "Classic";
pub const DEFAULT_RULES: &str = "Use arrow keys to move and spacebar to interact.";
pub const DEFAULT_HTML_STRUCTURE: &str =
    r#"<canvas id="gameCanvas" width="800" height="600"></canvas>"#;
pub const DEFAULT_STYLES: &str = "canvas { border: 2px solid #333; background: #f0f0f0; }";

pub fn mechanics() -> Vec<String> {
    vec!["Movement".into(), "Interaction".into()]
}

pub fn characters() -> Vec<Character> {
    vec![Character {
        name: "Player".into(),
        role: "player".into(),
        description: "The main character".into(),
        stats: Stats::default(),
        abilities: Vec::new(),
    }]
}

pub fn items() -> Vec<Item> {
    vec![Item {
        name: "Health Potion".into(),
        item_type: "consumable".into(),
        description: "Restores health".into(),
        effect: "Heal 50 HP".into(),
        rarity: "common".into(),
    }]
}

pub fn levels() -> Vec<Level> {
    vec![Level {
        name: "Level 1".into(),
        description: "The first level".into(),
        environment: "plains".into(),
        objectives: vec!["Reach the end".into()],
        enemies: vec!["Basic Enemy".into()],
        items: vec!["Health Potion".into()],
    }]
}

pub fn controls() -> Controls {
    Controls::default()
}

pub fn image_prompts() -> Vec<String> {
    vec!["A heroic character in a fantasy setting, pixel art style".into()]
}

/// Small playable canvas game: move the square with the arrow keys and
/// collect the coins.
pub fn default_game_code() -> String {
    r#"const canvas = document.getElementById('gameCanvas');
const ctx = canvas.getContext('2d');

const state = {
  player: { x: 50, y: 50, size: 30, speed: 4 },
  coins: [],
  score: 0,
  keys: {},
};

function spawnCoin() {
  state.coins.push({
    x: 20 + Math.random() * (canvas.width - 40),
    y: 20 + Math.random() * (canvas.height - 40),
    r: 8,
  });
}

function update() {
  const p = state.player;
  if (state.keys['ArrowLeft']) p.x -= p.speed;
  if (state.keys['ArrowRight']) p.x += p.speed;
  if (state.keys['ArrowUp']) p.y -= p.speed;
  if (state.keys['ArrowDown']) p.y += p.speed;
  p.x = Math.max(0, Math.min(canvas.width - p.size, p.x));
  p.y = Math.max(0, Math.min(canvas.height - p.size, p.y));

  state.coins = state.coins.filter((c) => {
    const hit = c.x > p.x && c.x < p.x + p.size && c.y > p.y && c.y < p.y + p.size;
    if (hit) state.score += 1;
    return !hit;
  });
  while (state.coins.length < 5) spawnCoin();
}

function draw() {
  ctx.clearRect(0, 0, canvas.width, canvas.height);
  ctx.fillStyle = '#3498db';
  ctx.fillRect(state.player.x, state.player.y, state.player.size, state.player.size);
  ctx.fillStyle = '#f1c40f';
  for (const c of state.coins) {
    ctx.beginPath();
    ctx.arc(c.x, c.y, c.r, 0, Math.PI * 2);
    ctx.fill();
  }
  ctx.fillStyle = '#2c3e50';
  ctx.font = '20px Arial';
  ctx.fillText('Score: ' + state.score, 10, canvas.height - 10);
}

function gameLoop() {
  update();
  draw();
  requestAnimationFrame(gameLoop);
}

document.addEventListener('keydown', (e) => { state.keys[e.key] = true; });
document.addEventListener('keyup', (e) => { state.keys[e.key] = false; });

gameLoop();
"#
    .to_string()
}
