//! Wine Quality Prediction CLI
//!
//! Download the raw data, train the random forest and serve predictions over HTTP.

use clap::{Parser, Subcommand};
use wine::{Config, Result};

#[derive(Parser)]
#[command(name = "wine")]
#[command(about = "Wine quality prediction with a random forest regressor", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Data management commands
    Data {
        #[command(subcommand)]
        action: DataCommands,
    },
    /// Train the model and write artifacts
    Train {
        /// Override number of trees
        #[arg(long)]
        n_estimators: Option<usize>,
        /// Override maximum tree depth
        #[arg(long)]
        max_depth: Option<usize>,
        /// Override random seed
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Predict the quality of one wine
    Predict {
        /// JSON file with the twelve features (reads stdin when omitted or "-")
        input: Option<String>,
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
    /// Model management commands
    Model {
        #[command(subcommand)]
        action: ModelCommands,
    },
    /// Serve the prediction API
    Serve {
        /// Override bind host
        #[arg(long)]
        host: Option<String>,
        /// Override bind port
        #[arg(long)]
        port: Option<u16>,
    },
    /// Initialize a new project with default config
    Init,
}

#[derive(Subcommand)]
enum DataCommands {
    /// Download the raw datasets
    Download,
    /// Show raw data status
    Status,
}

#[derive(Subcommand)]
enum ModelCommands {
    /// Show model information
    Info,
}

#[derive(Clone, Debug)]
enum OutputFormat {
    Table,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}. Use table or json.", s)),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load or create config
    let config = if std::path::Path::new(&cli.config).exists() {
        match Config::load(&cli.config) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        Config::default()
    };

    // Run command
    let result = match cli.command {
        Commands::Data { action } => match action {
            DataCommands::Download => commands::data_download(&config),
            DataCommands::Status => commands::data_status(&config),
        },
        Commands::Train {
            n_estimators,
            max_depth,
            seed,
        } => commands::train(&config, n_estimators, max_depth, seed),
        Commands::Predict { input, format } => commands::predict(&config, input, format),
        Commands::Model { action } => match action {
            ModelCommands::Info => commands::model_info(&config),
        },
        Commands::Serve { host, port } => commands::serve(&config, host, port),
        Commands::Init => commands::init(&cli.config),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

mod commands {
    use super::*;
    use std::io::Read;
    use std::path::Path;
    use wine::data::{Downloader, WineDataset};
    use wine::features::WineFeatures;
    use wine::model::ArtifactStore;
    use wine::predict::{format_prediction, InferenceEngine, PredictionService};
    use wine::training::Trainer;
    use wine::{WineError, WineType};

    pub fn init(config_path: &str) -> Result<()> {
        let config = Config::default();
        config.save(config_path)?;
        println!("Created default config at {}", config_path);

        std::fs::create_dir_all(&config.data.data_dir)?;
        std::fs::create_dir_all(&config.data.model_dir)?;
        println!(
            "Created {}/ and {}/ directories",
            config.data.data_dir, config.data.model_dir
        );

        println!("\nNext steps:");
        println!("  1. Edit {} to customize settings", config_path);
        println!("  2. Run 'wine data download' to fetch the raw datasets");
        println!("  3. Run 'wine train' to train the model");
        println!("  4. Run 'wine serve' to start the API");

        Ok(())
    }

    pub fn data_download(config: &Config) -> Result<()> {
        let downloader = Downloader::new()?;
        for path in downloader.fetch_all(Path::new(&config.data.data_dir))? {
            println!("Downloaded {}", path.display());
        }
        Ok(())
    }

    pub fn data_status(config: &Config) -> Result<()> {
        let data_dir = Path::new(&config.data.data_dir);

        println!("Data Status");
        println!("───────────────────────────────");
        println!("  Path:     {}", data_dir.display());
        for wine_type in WineType::all() {
            let path = WineDataset::data_path(data_dir, wine_type);
            let label = format!("{}:", wine_type);
            if path.exists() {
                let rows = count_rows(&path)?;
                println!("  {:<9} {} samples", label, rows);
            } else {
                println!("  {:<9} missing ({})", label, path.display());
            }
        }

        Ok(())
    }

    fn count_rows(path: &Path) -> Result<usize> {
        let mut reader = csv::ReaderBuilder::new().delimiter(b';').from_path(path)?;
        Ok(reader.records().count())
    }

    pub fn train(
        config: &Config,
        n_estimators: Option<usize>,
        max_depth: Option<usize>,
        seed: Option<u64>,
    ) -> Result<()> {
        let mut training = config.training.clone();
        if let Some(n) = n_estimators {
            training.n_estimators = n;
        }
        if let Some(d) = max_depth {
            training.max_depth = d;
        }
        if let Some(s) = seed {
            training.seed = s;
        }

        println!("Initializing training...");
        let store = ArtifactStore::new(&config.data.model_dir);
        let report = Trainer::new(training).run(Path::new(&config.data.data_dir), &store)?;

        println!("\nModel Performance:");
        println!("  MSE: {:.4}", report.test_metrics.mse);
        println!("  R2:  {:.4}", report.test_metrics.r2);
        println!("\nSaved artifacts to {}", store.dir().display());

        Ok(())
    }

    pub fn predict(config: &Config, input: Option<String>, format: OutputFormat) -> Result<()> {
        let raw = match input.as_deref() {
            None | Some("-") => {
                let mut buf = String::new();
                std::io::stdin().read_to_string(&mut buf)?;
                buf
            }
            Some(path) => std::fs::read_to_string(path)?,
        };
        let request: serde_json::Value = serde_json::from_str(&raw)?;

        let store = ArtifactStore::new(&config.data.model_dir);
        if !store.has_trained_model() {
            return Err(WineError::ModelNotLoaded);
        }
        let service = PredictionService::new(InferenceEngine::try_load(&store)?);
        let result = service.predict(&request)?;

        match format {
            OutputFormat::Table => println!("{}", format_prediction(&result)),
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        }

        Ok(())
    }

    pub fn model_info(config: &Config) -> Result<()> {
        let store = ArtifactStore::new(&config.data.model_dir);
        if !store.has_trained_model() {
            println!("No trained model found in {}", store.dir().display());
            println!("Run 'wine train' first.");
            return Ok(());
        }

        let engine = InferenceEngine::try_load(&store)?;

        println!("Model Information");
        println!("───────────────────────────────");
        println!("  Path:     {}", store.dir().display());
        println!(
            "  Features: {} ({:?} order)",
            engine.feature_order().len(),
            engine.order_source()
        );
        if let Some(model) = store.load_model()? {
            let params = model.params();
            println!(
                "  Trees:    {} (max depth {}, min samples split {}, seed {})",
                model.n_trees(),
                params.tree.max_depth,
                params.tree.min_samples_split,
                params.seed
            );
        }
        if let Some(report) = store.load_report()? {
            println!("\n{}", report);
        }

        let mut ranked: Vec<(String, f64)> = engine.feature_importance().into_iter().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        if !ranked.is_empty() {
            println!("\nFeature importance:");
            for (name, weight) in ranked {
                println!("  {:<22} {:.4}", name, weight);
            }
        }

        println!("\nExample request:");
        println!("{}", serde_json::to_string_pretty(&WineFeatures::example())?);

        Ok(())
    }

    pub fn serve(config: &Config, host: Option<String>, port: Option<u16>) -> Result<()> {
        let mut server = config.server.clone();
        if let Some(h) = host {
            server.host = h;
        }
        if let Some(p) = port {
            server.port = p;
        }

        // Missing artifacts degrade the service rather than preventing startup
        let engine = InferenceEngine::load(&ArtifactStore::new(&config.data.model_dir));
        let service = PredictionService::new(engine);

        let runtime = tokio::runtime::Runtime::new()?;
        runtime.block_on(wine::server::serve(&server, service))
    }
}
