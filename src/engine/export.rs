//! Turning a GameSpec into a downloadable game package.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Seek, Write};
use std::path::Path;

use anyhow::{Context, Result};
use log::info;
use serde_json::json;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::model::game_spec::GameSpec;

/// Every file of the exported package, keyed by path inside the archive.
pub fn game_files(spec: &GameSpec) -> Result<BTreeMap<String, String>> {
    let mut files = BTreeMap::new();
    files.insert("index.html".to_string(), index_html(spec));
    files.insert("game.js".to_string(), spec.code.clone());
    files.insert("style.css".to_string(), spec.styles.clone());
    files.insert(
        "assets/prompts.json".to_string(),
        serde_json::to_string_pretty(&json!({
            "imagePrompts": spec.image_prompts,
            "soundPrompts": spec.sound_prompts,
        }))?,
    );
    files.insert("README.md".to_string(), readme(spec));
    files.insert(
        "game-data.json".to_string(),
        serde_json::to_string_pretty(spec)?,
    );
    Ok(files)
}

pub fn write_zip<W: Write + Seek>(spec: &GameSpec, writer: W) -> Result<W> {
    let files = game_files(spec)?;
    let mut zip = ZipWriter::new(writer);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (path, contents) in &files {
        zip.start_file(path.as_str(), options)
            .with_context(|| format!("adding {path} to archive"))?;
        zip.write_all(contents.as_bytes())?;
    }

    let writer = zip.finish().context("finishing archive")?;
    info!("exported '{}' ({} files)", spec.name, files.len());
    Ok(writer)
}

pub fn export_to_path(spec: &GameSpec, path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut file = write_zip(spec, file)?;
    file.flush()?;
    Ok(())
}

/// File-name friendly version of the game name.
pub fn archive_name(spec: &GameSpec) -> String {
    let slug: String = spec
        .name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect();
    let slug = slug
        .split('-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    if slug.is_empty() {
        "game.zip".to_string()
    } else {
        format!("{slug}.zip")
    }
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn index_html(spec: &GameSpec) -> String {
    let title = escape_html(&spec.name);
    let description = escape_html(&spec.description);
    let controls = format!(
        "Move: {} | Action: {} | Special: {}",
        escape_html(&spec.controls.movement),
        escape_html(&spec.controls.action),
        escape_html(&spec.controls.special)
    );

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <link rel="stylesheet" href="style.css">
</head>
<body>
    <div class="game-container">
        <header class="game-header">
            <h1>{title}</h1>
            <p class="game-description">{description}</p>
        </header>
        {structure}
        <p class="game-controls">{controls}</p>
    </div>
    <script src="game.js"></script>
</body>
</html>
"#,
        structure = spec.html_structure,
    )
}

fn readme(spec: &GameSpec) -> String {
    let mut out = format!("# {}\n\n{}\n\n", spec.name, spec.description);
    out.push_str(&format!(
        "- Genre: {}\n- Theme: {}\n- Difficulty: {}\n\n",
        spec.genre,
        spec.theme,
        spec.difficulty.label()
    ));

    if !spec.rules.is_empty() {
        out.push_str(&format!("## Rules\n\n{}\n\n", spec.rules));
    }
    if !spec.mechanics.is_empty() {
        out.push_str("## Mechanics\n\n");
        for m in &spec.mechanics {
            out.push_str(&format!("- {m}\n"));
        }
        out.push('\n');
    }

    out.push_str(&format!(
        "## Controls\n\n- Movement: {}\n- Action: {}\n- Special: {}\n\n",
        spec.controls.movement, spec.controls.action, spec.controls.special
    ));
    out.push_str("## Running\n\nOpen `index.html` in a browser.\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::llm_decode::decode_game_spec;
    use std::io::{Cursor, Read};

    fn spec() -> GameSpec {
        decode_game_spec(&serde_json::json!({
            "name": "Tom & Jerry's <Chase>",
            "code": "start();",
            "styles": "canvas{}",
            "soundPrompts": ["boing"],
        }))
        .unwrap()
    }

    #[test]
    fn html_is_escaped_and_links_assets() {
        let files = game_files(&spec()).unwrap();
        let html = &files["index.html"];

        assert!(html.contains("<title>Tom &amp; Jerry&#39;s &lt;Chase&gt;</title>"));
        assert!(html.contains(r#"<script src="game.js"></script>"#));
        assert!(html.contains(r#"<canvas id="gameCanvas""#));
        assert_eq!(files["game.js"], "start();");
        assert_eq!(files["style.css"], "canvas{}");
    }

    #[test]
    fn package_contains_expected_files() {
        let files = game_files(&spec()).unwrap();
        let names: Vec<&str> = files.keys().map(String::as_str).collect();
        assert_eq!(
            names,
            vec![
                "README.md",
                "assets/prompts.json",
                "game-data.json",
                "game.js",
                "index.html",
                "style.css"
            ]
        );

        let prompts: serde_json::Value = serde_json::from_str(&files["assets/prompts.json"]).unwrap();
        assert_eq!(prompts["soundPrompts"][0], "boing");

        let data: GameSpec = serde_json::from_str(&files["game-data.json"]).unwrap();
        assert_eq!(data, spec());
    }

    #[test]
    fn zip_archive_reads_back() {
        let cursor = write_zip(&spec(), Cursor::new(Vec::new())).unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(cursor.into_inner())).unwrap();

        assert_eq!(archive.len(), 6);
        let mut js = String::new();
        archive.by_name("game.js").unwrap().read_to_string(&mut js).unwrap();
        assert_eq!(js, "start();");
    }

    #[test]
    fn exports_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.zip");
        export_to_path(&spec(), &path).unwrap();

        let archive = zip::ZipArchive::new(std::fs::File::open(&path).unwrap()).unwrap();
        assert!(archive.file_names().any(|n| n == "index.html"));
    }

    #[test]
    fn archive_names_are_slugged() {
        assert_eq!(archive_name(&spec()), "tom-jerry-s-chase.zip");
        let mut unnamed = spec();
        unnamed.name = "???".into();
        assert_eq!(archive_name(&unnamed), "game.zip");
    }
}
