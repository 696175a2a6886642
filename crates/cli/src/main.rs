//! CLI tool for rendering slide decks to HTML previews and editable PPTX files.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use deck_core::{
    outline_to_pages, renumber_pages, LayoutEngine, OutlinePage, PedagogyRegistry, Scene,
    SlidePage, StyleConfig, TemplateRegistry, RENDER_TEMPLATE_ID,
};
use deck_html::{patch_image, HtmlRenderer};
use deck_pptx::{PackageReader, PresentationBuilder};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Render teaching decks to a browser preview and an editable presentation.
#[derive(Parser, Debug)]
#[command(name = "deck-render")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve layouts, write the HTML preview and optionally a .pptx
    Render {
        /// Deck JSON: either `pages` or an `outline`
        #[arg(short, long)]
        deck: PathBuf,

        /// Template id
        #[arg(short, long, default_value = RENDER_TEMPLATE_ID)]
        template: String,

        /// Style overrides JSON (default: derived from the template)
        #[arg(short, long)]
        style: Option<PathBuf>,

        /// Template registry JSON (default: built-in templates)
        #[arg(long)]
        templates: Option<PathBuf>,

        /// Pedagogy registry JSON, used for outline decks
        #[arg(long)]
        pedagogies: Option<PathBuf>,

        /// Output directory for index.html
        #[arg(short, long, default_value = "output")]
        out: PathBuf,

        /// Also build a presentation at this path
        #[arg(long)]
        pptx: Option<PathBuf>,

        /// JSON map of slot id to image file, for the presentation
        #[arg(long)]
        images: Option<PathBuf>,

        /// Static assets copied to <out>/static
        #[arg(long)]
        assets: Option<PathBuf>,
    },

    /// Replace a placeholder in a rendered page with an image
    Patch {
        #[arg(long)]
        html: PathBuf,

        #[arg(long)]
        slot: String,

        #[arg(long)]
        url: String,
    },

    /// List the layout catalog
    Layouts,

    /// List templates
    Templates {
        #[arg(long)]
        scene: Option<Scene>,

        /// Template registry JSON (default: built-in templates)
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// List instructional models
    Pedagogies {
        #[arg(long)]
        scene: Option<Scene>,

        /// Pedagogy registry JSON (default: built-in models)
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Print the shapes of every slide in a .pptx
    Inspect { pptx: PathBuf },
}

/// Deck input file.
#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum DeckFile {
    Pages {
        title: String,
        pages: Vec<SlidePage>,
    },
    Outline {
        title: String,
        #[serde(default)]
        pedagogy: Option<String>,
        outline: Vec<OutlinePage>,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging
    if args.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    match run(args.command) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<ExitCode> {
    match command {
        Command::Render {
            deck,
            template,
            style,
            templates,
            pedagogies,
            out,
            pptx,
            images,
            assets,
        } => {
            let templates = load_templates(templates.as_deref())?;
            let template = templates.get_or_default(&template);
            let pedagogies = load_pedagogies(pedagogies.as_deref())?;
            let (title, mut pages) = load_deck(&deck, &pedagogies)?;

            let style = match style {
                Some(path) => StyleConfig::from_json_reader(open(&path)?)
                    .with_context(|| format!("Failed to parse style {}", path.display()))?,
                None => StyleConfig::from_template(&template),
            };

            let mut renderer = HtmlRenderer::new();
            if let Some(assets) = assets {
                renderer = renderer.with_assets_dir(assets);
            }
            let result = renderer
                .render(&mut pages, &style, &title, &out, &template)
                .with_context(|| format!("Failed to render into {}", out.display()))?;

            if let Some(pptx) = pptx {
                let slot_images: HashMap<String, PathBuf> = match images {
                    Some(path) => serde_json::from_reader(open(&path)?)
                        .with_context(|| format!("Failed to parse image map {}", path.display()))?,
                    None => HashMap::new(),
                };
                PresentationBuilder::new(title.as_str())
                    .build(&pages, &style, &slot_images, &pptx)
                    .with_context(|| format!("Failed to build {}", pptx.display()))?;
            }

            print_json(&result)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Patch { html, slot, url } => {
            let patched = patch_image(&html, &slot, &url)
                .with_context(|| format!("Failed to patch {}", html.display()))?;
            if patched {
                Ok(ExitCode::SUCCESS)
            } else {
                eprintln!("Slot {} not found in {}", slot, html.display());
                Ok(ExitCode::FAILURE)
            }
        }
        Command::Layouts => {
            print_json(&LayoutEngine::list_all_layouts())?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Templates { scene, file } => {
            let registry = load_templates(file.as_deref())?;
            match scene {
                Some(scene) => print_json(&registry.by_scene(scene))?,
                None => print_json(&registry.list())?,
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Pedagogies { scene, file } => {
            let registry = load_pedagogies(file.as_deref())?;
            match scene {
                Some(scene) => print_json(&registry.by_scene(scene))?,
                None => print_json(&registry.list())?,
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Inspect { pptx } => {
            let slides = PackageReader::open(&pptx)
                .and_then(|mut reader| reader.slides())
                .with_context(|| format!("Failed to read {}", pptx.display()))?;
            for slide in &slides {
                println!("Slide {}", slide.number);
                for shape in &slide.shapes {
                    println!(
                        "  {:<24} x={} y={} cx={} cy={}{}",
                        shape.name,
                        shape.x,
                        shape.y,
                        shape.cx,
                        shape.cy,
                        if shape.is_picture { " [picture]" } else { "" }
                    );
                    if !shape.text.is_empty() {
                        println!("    {}", shape.text.replace('\n', "\n    "));
                    }
                }
                if let Some(notes) = &slide.notes {
                    println!("  notes: {}", notes);
                }
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn open(path: &Path) -> Result<BufReader<File>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    Ok(BufReader::new(file))
}

fn load_templates(path: Option<&Path>) -> Result<TemplateRegistry> {
    match path {
        Some(path) => TemplateRegistry::from_json_reader(open(path)?)
            .with_context(|| format!("Failed to parse templates {}", path.display())),
        None => Ok(TemplateRegistry::builtin()),
    }
}

fn load_pedagogies(path: Option<&Path>) -> Result<PedagogyRegistry> {
    match path {
        Some(path) => PedagogyRegistry::from_json_reader(open(path)?)
            .with_context(|| format!("Failed to parse pedagogies {}", path.display())),
        None => Ok(PedagogyRegistry::builtin()),
    }
}

/// Read a deck file, converting outlines to pages.
fn load_deck(path: &Path, pedagogies: &PedagogyRegistry) -> Result<(String, Vec<SlidePage>)> {
    let deck: DeckFile = serde_json::from_reader(open(path)?)
        .with_context(|| format!("Failed to parse deck {}", path.display()))?;

    Ok(match deck {
        DeckFile::Pages { title, mut pages } => {
            log::debug!("Loaded {} pages", pages.len());
            let changed = renumber_pages(&mut pages);
            if changed > 0 {
                log::warn!("Renumbered {} pages of {} by position", changed, path.display());
            }
            (title, pages)
        }
        DeckFile::Outline {
            title,
            pedagogy,
            outline,
        } => {
            let model = pedagogy.as_deref().map(|id| pedagogies.get_or_default(id));
            log::debug!(
                "Converting {} outline pages (model: {})",
                outline.len(),
                model.map(|m| m.id.as_str()).unwrap_or("none")
            );
            (title, outline_to_pages(outline, model))
        }
    })
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use deck_core::SlideType;
    use std::fs;

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from([
            "deck-render",
            "render",
            "--deck",
            "deck.json",
            "--pptx",
            "out.pptx",
            "-v",
        ])
        .unwrap();
        assert!(args.verbose);
        match args.command {
            Command::Render { template, pptx, .. } => {
                assert_eq!(template, RENDER_TEMPLATE_ID);
                assert!(TemplateRegistry::builtin().get(&template).is_some());
                assert_eq!(pptx, Some(PathBuf::from("out.pptx")));
            }
            other => panic!("unexpected command {:?}", other),
        }

        let args =
            Args::try_parse_from(["deck-render", "templates", "--scene", "practice"]).unwrap();
        assert!(matches!(
            args.command,
            Command::Templates {
                scene: Some(Scene::Practice),
                ..
            }
        ));
        assert!(Args::try_parse_from(["deck-render", "templates", "--scene", "lab"]).is_err());

        let args =
            Args::try_parse_from(["deck-render", "pedagogies", "--file", "models.json"]).unwrap();
        match args.command {
            Command::Pedagogies { scene, file } => {
                assert_eq!(scene, None);
                assert_eq!(file, Some(PathBuf::from("models.json")));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_pedagogies_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models.json");
        fs::write(
            &path,
            r#"[{"id": "lab_cycle", "name": "实验循环", "name_en": "Lab cycle",
                "description": "", "applicable_scenes": ["practice"],
                "structure": [{"name": "实验", "slide_type": "steps"}]}]"#,
        )
        .unwrap();
        let registry = load_pedagogies(Some(&path)).unwrap();
        assert!(registry.get("lab_cycle").is_some());
        assert!(registry.get("five_step").is_some());
    }

    #[test]
    fn test_page_deck_renumbered_by_position() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deck.json");
        fs::write(
            &path,
            r#"{"title": "t", "pages": [
                {"index": 1, "slide_type": "concept", "title": "一"},
                {"index": 1, "slide_type": "concept", "title": "二"}
            ]}"#,
        )
        .unwrap();
        let (_, pages) = load_deck(&path, &PedagogyRegistry::builtin()).unwrap();
        assert_eq!(pages.iter().map(|p| p.index).collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn test_load_page_deck() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deck.json");
        fs::write(
            &path,
            r#"{"title": "安全用电", "pages": [
                {"index": 0, "slide_type": "title", "title": "安全用电"},
                {"index": 1, "slide_type": "concept", "title": "触电", "speaker_notes": null}
            ]}"#,
        )
        .unwrap();
        let (title, pages) = load_deck(&path, &PedagogyRegistry::builtin()).unwrap();
        assert_eq!(title, "安全用电");
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[1].slide_type, SlideType::Concept);
    }

    #[test]
    fn test_load_outline_deck_uses_pedagogy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("outline.json");
        fs::write(
            &path,
            r#"{"title": "课", "pedagogy": "five_step", "outline": [
                {"title": "封面", "description": ""},
                {"title": "导入", "description": "- 案例一\n- 案例二"}
            ]}"#,
        )
        .unwrap();
        let (_, pages) = load_deck(&path, &PedagogyRegistry::builtin()).unwrap();
        assert_eq!(pages[0].slide_type, SlideType::Title);
        assert_eq!(pages[1].bullets(), vec!["案例一", "案例二"]);
    }

    #[test]
    fn test_bad_deck_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{}").unwrap();
        let err = load_deck(&path, &PedagogyRegistry::builtin()).unwrap_err();
        assert!(format!("{:#}", err).contains("bad.json"));
    }
}
