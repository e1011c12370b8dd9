//! Mediarack CLI - catalogue and launcher for third-party media tools.
//!
//! Single binary that provides:
//! - catalogue inspection (`list`, `category`, `export`)
//! - catalogue mutation (`add-app`, `update-app`, `delete-app`,
//!   `add-category`, `rename-category`, `delete-category`, `import`)
//! - launching (`launch`, `verify`, `resolve`, `install`)
//! - `run` - resident mode with live reload of the two documents

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use mediarack_core::fetch::{self, HttpFetcher};
use mediarack_core::resolve::find_closest_executable;
use mediarack_core::{
    AppEntry, AppLauncher, CatalogEvent, CatalogService, CatalogWatcher, EntryOrigin, Paths,
    Settings,
};

#[derive(Parser)]
#[command(name = "mediarack")]
#[command(about = "Catalogue and launcher for third-party media tools", version)]
struct Cli {
    /// Root directory for configuration and user data
    #[arg(short, long, global = true)]
    root: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the configuration directory
    Init,

    /// Show the merged catalogue
    List {
        /// Print the merged view as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show one category
    Category { id: String },

    /// Launch an application and wait for it to finish
    Launch {
        category: String,
        name: String,

        /// Input file substituted into the params template
        #[arg(long)]
        input: Option<String>,

        /// Exit immediately after the spawn instead of waiting
        #[arg(long)]
        no_wait: bool,
    },

    /// Check that an application's executable is accessible
    Verify { category: String, name: String },

    /// Add an external application to the catalogue
    AddApp {
        #[arg(long)]
        category: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        path: String,
        #[arg(long)]
        params: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        website: Option<String>,
        #[arg(long)]
        icon: Option<String>,
        #[arg(long)]
        download_url: Option<String>,
        #[arg(long)]
        working_directory: Option<String>,
    },

    /// Update fields of an existing application
    UpdateApp {
        #[arg(long)]
        category: String,
        #[arg(long)]
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        path: Option<String>,
        #[arg(long)]
        params: Option<String>,
        #[arg(long)]
        working_directory: Option<String>,
    },

    /// Delete an application
    DeleteApp {
        #[arg(long)]
        category: String,
        #[arg(long)]
        id: String,
    },

    /// Add an empty category to both documents
    AddCategory {
        #[arg(long)]
        id: String,
        #[arg(long)]
        name: String,
    },

    /// Rename a category wherever it appears
    RenameCategory {
        #[arg(long)]
        id: String,
        #[arg(long)]
        name: String,
    },

    /// Delete an empty category from both documents
    DeleteCategory {
        #[arg(long)]
        id: String,
    },

    /// Replace the external document with the given file
    Import { file: PathBuf },

    /// Write the merged catalogue to a file
    Export { file: PathBuf },

    /// Find the closest executable for an application name
    Resolve { directory: PathBuf, name: String },

    /// Download and install an application from its download url
    Install { category: String, name: String },

    /// Resident mode: watch both documents and log catalogue changes
    Run,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    fmt().with_env_filter(filter).with_target(false).init();

    let paths = match &cli.root {
        Some(root) => Paths::at(root),
        None => Paths::discover().context("could not determine a configuration directory")?,
    };
    paths.ensure()?;

    let service = CatalogService::new(paths.builtin_config(), paths.external_config());
    service.load().await;

    match cli.command {
        Commands::Init => init(&paths),
        Commands::List { json } => list(&service, json).await,
        Commands::Category { id } => category(&service, &id).await,
        Commands::Launch {
            category,
            name,
            input,
            no_wait,
        } => launch(&service, &paths, &category, &name, input.as_deref(), no_wait).await,
        Commands::Verify { category, name } => verify(&service, &paths, &category, &name).await,
        Commands::AddApp {
            category,
            name,
            path,
            params,
            description,
            website,
            icon,
            download_url,
            working_directory,
        } => {
            let entry = AppEntry {
                id: String::new(),
                name,
                path,
                icon: icon.unwrap_or_default(),
                icon_path: None,
                params,
                category,
                description: description.unwrap_or_default(),
                website,
                origin: EntryOrigin::External,
                download_url,
                is_downloaded: None,
                working_directory,
            };
            let added = service.add_app(entry).await?;
            println!("Added {} ({})", added.name, added.id);
            Ok(())
        }
        Commands::UpdateApp {
            category,
            id,
            name,
            path,
            params,
            working_directory,
        } => {
            update_app(&service, &category, &id, name, path, params, working_directory).await
        }
        Commands::DeleteApp { category, id } => {
            service.delete_app(&category, &id).await?;
            println!("Deleted {id} from {category}");
            Ok(())
        }
        Commands::AddCategory { id, name } => {
            service.add_category(&id, &name).await?;
            println!("Added category {id}");
            Ok(())
        }
        Commands::RenameCategory { id, name } => {
            service.update_category(&id, &name).await?;
            println!("Renamed category {id} to {name}");
            Ok(())
        }
        Commands::DeleteCategory { id } => {
            service.delete_category(&id).await?;
            println!("Deleted category {id}");
            Ok(())
        }
        Commands::Import { file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let doc: serde_json::Value = serde_json::from_str(raw.trim_start_matches('\u{feff}'))
                .with_context(|| format!("failed to parse {}", file.display()))?;
            service.import(doc).await?;
            println!("Imported {}", file.display());
            Ok(())
        }
        Commands::Export { file } => {
            let merged = service.config().await;
            std::fs::write(&file, serde_json::to_string_pretty(&merged)?)
                .with_context(|| format!("failed to write {}", file.display()))?;
            println!("Exported merged catalogue to {}", file.display());
            Ok(())
        }
        Commands::Resolve { directory, name } => {
            let found = find_closest_executable(&directory, &name)?;
            println!("{}", found.display());
            Ok(())
        }
        Commands::Install { category, name } => {
            // The settings document may redirect where tools are installed.
            let settings = Settings::load(&paths.settings_file())?;
            let data_root = settings
                .apps_directory
                .as_deref()
                .map(PathBuf::from)
                .unwrap_or_else(|| paths.data_dir.clone());
            let fetcher = HttpFetcher::new();
            let updated =
                fetch::install(&service, &fetcher, &data_root, &category, &name).await?;
            println!("Installed {} at {}", updated.name, updated.path);
            Ok(())
        }
        Commands::Run => run(service).await,
    }
}

fn init(paths: &Paths) -> Result<()> {
    let builtin_path = paths.builtin_config();
    if !builtin_path.exists() {
        std::fs::write(
            &builtin_path,
            serde_json::to_string_pretty(&serde_json::json!({
                "categories": [],
                "builtinAppsFolder": "./apps"
            }))?,
        )?;
    }
    let external_path = paths.external_config();
    if !external_path.exists() {
        std::fs::write(
            &external_path,
            serde_json::to_string_pretty(&serde_json::json!({ "categories": [] }))?,
        )?;
    }
    let settings_path = paths.settings_file();
    if !settings_path.exists() {
        Settings::default().save(&settings_path)?;
    }

    println!("Initialized mediarack at {}", paths.config_dir.display());
    println!();
    println!("Created:");
    println!("  {} - builtin catalogue", builtin_path.display());
    println!("  {} - external catalogue", external_path.display());
    println!("  {} - settings", settings_path.display());
    Ok(())
}

async fn list(service: &CatalogService, json: bool) -> Result<()> {
    let merged = service.config().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&merged)?);
        return Ok(());
    }

    println!("Catalogue: {} categories", merged.categories.len());
    for category in &merged.categories {
        println!();
        println!("{} ({})", category.name, category.id);
        for app in &category.apps {
            let marker = match app.is_downloaded {
                Some(false) => " [not downloaded]",
                _ => "",
            };
            println!("  - {} [{}]{}", app.name, app.origin.name(), marker);
        }
    }
    Ok(())
}

async fn category(service: &CatalogService, id: &str) -> Result<()> {
    let category = service
        .category(id)
        .await
        .with_context(|| format!("category not found: {id}"))?;
    println!("{} ({})", category.name, category.id);
    for app in &category.apps {
        println!("  - {} [{}] {}", app.name, app.origin.name(), app.path);
    }
    Ok(())
}

async fn launch(
    service: &CatalogService,
    paths: &Paths,
    category: &str,
    name: &str,
    input: Option<&str>,
    no_wait: bool,
) -> Result<()> {
    let entry = service
        .app(category, name)
        .await
        .with_context(|| format!("application not found: {name} (category {category})"))?;

    let launcher = AppLauncher::new(paths.data_dir.clone());
    launcher.launch(&entry, input).await?;

    if no_wait {
        return Ok(());
    }

    // Hold until the process deregisters itself; ctrl-c requests a stop.
    let registry = Arc::clone(launcher.registry());
    loop {
        if registry.is_empty() {
            return Ok(());
        }
        tokio::select! {
            _ = tokio::time::sleep(std::time::Duration::from_millis(200)) => {}
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupt received, stopping launched applications");
                registry.stop_all();
                return Ok(());
            }
        }
    }
}

async fn verify(
    service: &CatalogService,
    paths: &Paths,
    category: &str,
    name: &str,
) -> Result<()> {
    let entry = service
        .app(category, name)
        .await
        .with_context(|| format!("application not found: {name} (category {category})"))?;

    let launcher = AppLauncher::new(paths.data_dir.clone());
    let resolved = launcher.verify_access(&entry)?;
    println!("OK: {}", resolved.display());
    Ok(())
}

async fn update_app(
    service: &CatalogService,
    category: &str,
    id: &str,
    name: Option<String>,
    path: Option<String>,
    params: Option<String>,
    working_directory: Option<String>,
) -> Result<()> {
    let merged = service.config().await;
    let mut entry = merged
        .app_by_id(category, id)
        .cloned()
        .with_context(|| format!("application not found: {id} (category {category})"))?;

    if let Some(name) = name {
        entry.name = name;
    }
    if let Some(path) = path {
        entry.path = path;
    }
    if let Some(params) = params {
        entry.params = Some(params);
    }
    if let Some(working_directory) = working_directory {
        entry.working_directory = Some(working_directory);
    }

    service.update_app(entry).await?;
    println!("Updated {id}");
    Ok(())
}

async fn run(service: Arc<CatalogService>) -> Result<()> {
    let mut events = service.subscribe();
    let watcher = CatalogWatcher::spawn(Arc::clone(&service)).await?;
    tracing::info!("Watching catalogue documents, ctrl-c to exit");

    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Ok(CatalogEvent::Loaded(merged)) => {
                        tracing::info!(categories = merged.categories.len(), "Catalogue loaded");
                    }
                    Ok(CatalogEvent::Changed(merged)) => {
                        tracing::info!(categories = merged.categories.len(), "Catalogue changed");
                    }
                    Err(_) => break,
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    watcher.dispose();
    tracing::info!("Shut down");
    Ok(())
}
