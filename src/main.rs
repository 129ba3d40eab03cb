use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use ridgeid::{config, enroll, recognize, store, ModelKind, ModelPair, ModelSource};

const DEFAULT_SEG_MODEL: &str = "unet_segmentation_v1_0";
const DEFAULT_REC_MODEL: &str = "siamese_network_v1_0";

#[derive(Parser)]
#[command(name = "ridgeid")]
#[command(
    version,
    about = "Fingerprint identity verification - enrollment and recognition"
)]
struct Cli {
    /// Config file (defaults to the compiled-in location)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Enroll employee references from a dataset directory
    Enroll {
        /// Directory whose immediate subdirectories are employee ids
        dataset_root: PathBuf,
        /// Segmentation model name
        #[arg(long, default_value = DEFAULT_SEG_MODEL)]
        seg_model: String,
        /// Recognition model name
        #[arg(long, default_value = DEFAULT_REC_MODEL)]
        rec_model: String,
    },
    /// Recognize a fingerprint image against enrolled references
    Recognize {
        /// Fingerprint image file
        image: PathBuf,
        /// Verify against this employee id only
        #[arg(short, long)]
        employee: Option<String>,
        /// Similarity threshold override (defaults to the configured value)
        #[arg(short, long)]
        threshold: Option<f32>,
        /// Segmentation model name
        #[arg(long, default_value = DEFAULT_SEG_MODEL)]
        seg_model: String,
        /// Recognition model name
        #[arg(long, default_value = DEFAULT_REC_MODEL)]
        rec_model: String,
    },
    /// List enrolled employee ids
    List,
    /// List model artifacts available in the model directory
    Models,
    /// Remove one employee's reference, or the whole store
    Purge {
        /// Employee id to remove (omitting it removes everyone)
        #[arg(short, long)]
        employee: Option<String>,
    },
    /// Open config file in editor
    Config,
}

fn main() -> Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .format_target(false)
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Enroll {
            dataset_root,
            seg_model,
            rec_model,
        } => run_enroll(config_path, &dataset_root, &seg_model, &rec_model),
        Commands::Recognize {
            image,
            employee,
            threshold,
            seg_model,
            rec_model,
        } => run_recognize(
            config_path,
            &image,
            employee.as_deref(),
            threshold,
            &seg_model,
            &rec_model,
        ),
        Commands::List => run_list(config_path),
        Commands::Models => run_models(config_path),
        Commands::Purge { employee } => run_purge(config_path, employee.as_deref()),
        Commands::Config => open_config(config_path),
    }
}

fn load_pair(cfg: &config::Config, seg_model: &str, rec_model: &str) -> Result<ModelPair> {
    let source = ModelSource::new(&cfg.model_dir);
    ModelPair::load(&source, seg_model, rec_model).context("Failed to load model pair")
}

fn run_enroll(
    config_path: Option<&Path>,
    dataset_root: &Path,
    seg_model: &str,
    rec_model: &str,
) -> Result<()> {
    let cfg = config::load_config(config_path)?;
    info!("Enrolling dataset: {}", dataset_root.display());

    let mut pair = load_pair(&cfg, seg_model, rec_model)?;
    let summary = enroll::enroll(dataset_root, &mut pair, &cfg.store_path)?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn run_recognize(
    config_path: Option<&Path>,
    image: &Path,
    employee: Option<&str>,
    threshold: Option<f32>,
    seg_model: &str,
    rec_model: &str,
) -> Result<()> {
    let cfg = config::load_config(config_path)?;
    let threshold = match threshold {
        Some(value) => {
            config::validate_threshold(value).context("invalid --threshold")?;
            value
        }
        None => cfg.threshold,
    };

    let source = ModelSource::new(&cfg.model_dir);
    let result = recognize::recognize_with_models(
        &source,
        seg_model,
        rec_model,
        &cfg.store_path,
        image,
        threshold,
        employee,
    )?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn run_list(config_path: Option<&Path>) -> Result<()> {
    let cfg = config::load_config(config_path)?;
    let store = store::ReferenceStore::load(&cfg.store_path)?;

    if store.is_empty() {
        info!("No employees enrolled");
        return Ok(());
    }
    for id in store.ids() {
        println!("{id}");
    }
    Ok(())
}

fn run_models(config_path: Option<&Path>) -> Result<()> {
    let cfg = config::load_config(config_path)?;
    let source = ModelSource::new(&cfg.model_dir);

    for kind in [ModelKind::Segmentation, ModelKind::Recognition] {
        let names = source.list(kind)?;
        if names.is_empty() {
            println!("{kind}: (none)");
        } else {
            println!("{kind}: {}", names.join(", "));
        }
    }
    Ok(())
}

fn run_purge(config_path: Option<&Path>, employee: Option<&str>) -> Result<()> {
    let cfg = config::load_config(config_path)?;

    match employee {
        Some(id) => {
            let mut store = store::ReferenceStore::load(&cfg.store_path)?;
            if !store.remove(id) {
                anyhow::bail!("employee {id:?} is not enrolled");
            }
            store.persist(&cfg.store_path)?;
            info!("Removed reference for employee: {}", id);
        }
        None => {
            store::ReferenceStore::purge(&cfg.store_path)?;
            info!("Reference store removed");
        }
    }
    Ok(())
}

fn open_config(config_path: Option<&Path>) -> Result<()> {
    let path = config_path.unwrap_or(&config::CONFIG_PATH);
    let editor = env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());

    info!("Opening config file: {}", path.display());

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create config directory")?;
    }

    let status = std::process::Command::new(editor)
        .arg(path)
        .status()
        .context("Failed to open editor")?;

    if !status.success() {
        anyhow::bail!("Editor exited with non-zero status");
    }

    Ok(())
}
