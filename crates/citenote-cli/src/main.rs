mod script;

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::{env, fs, process};

use anyhow::{Context, Result};
use citenote_config::Config;
use citenote_engine::commands::ImportEnv;
use citenote_engine::ids::RandomIds;
use citenote_engine::markup::HtmlMarkup;
use citenote_engine::plugins::ImageSyncPlugin;
use citenote_engine::{Editor, EditorState};
use log::{info, warn};

use script::{ScriptHost, parse_script, run_step};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();
    let [_, document_arg, script_arg] = args.as_slice() else {
        eprintln!(
            "Usage: {} <document.json> <script.json>",
            args.first().map(String::as_str).unwrap_or("citenote-cli")
        );
        process::exit(1);
    };

    let config_path = Config::config_path();
    let config = match Config::load_from_path(&config_path) {
        Ok(Some(config)) => {
            info!("Loaded config from {}", config_path.display());
            config
        }
        Ok(None) => Config::default(),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    let document_path = config.resolve_document(&PathBuf::from(document_arg));
    let script_path = config.resolve_document(&PathBuf::from(script_arg));

    let document = fs::read_to_string(&document_path)
        .with_context(|| format!("Failed to read document {}", document_path.display()))?;
    let state: EditorState = serde_json::from_str(&document)
        .with_context(|| format!("Invalid document {}", document_path.display()))?;
    let script = fs::read_to_string(&script_path)
        .with_context(|| format!("Failed to read script {}", script_path.display()))?;
    let steps = parse_script(&script)?;

    let host = Rc::new(RefCell::new(ScriptHost::default()));
    let mut editor = Editor::new(state).with_plugin(ImageSyncPlugin::new(Rc::clone(&host)));
    let env = ImportEnv::new(&HtmlMarkup, &RandomIds).with_image_scale(config.import.image_scale);

    for (index, step) in steps.into_iter().enumerate() {
        let description = format!("{step:?}");
        let applied = run_step(&mut editor, &host, env, step)
            .with_context(|| format!("Step {} failed", index + 1))?;
        if applied {
            info!("Step {}: applied {description}", index + 1);
        } else {
            warn!("Step {}: not applicable {description}", index + 1);
        }
    }

    let host = host.borrow();
    if !host.dimensions.is_empty() {
        warn!("Dimensions were reported after the last document change and were not applied");
    }
    for image in &host.imports {
        info!("Imported image from node {}", image.node_id);
    }

    println!("{}", serde_json::to_string_pretty(editor.state())?);
    Ok(())
}
