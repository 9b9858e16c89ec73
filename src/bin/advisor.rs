use chess_style_advisor::{
    extract_features, parse_color, AdvisorConfig, AnalysisService, DatasetBuilder, StyleClass,
};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(author, version, about = "Chess play-style detection and opening recommendation", long_about = None)]
struct Args {
    /// JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Style classifier artifact (overrides the configuration)
    #[arg(long, global = true)]
    style_model: Option<PathBuf>,

    /// Opening classifier artifact (overrides the configuration)
    #[arg(long, global = true)]
    opening_model: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Detect the play style of one side
    Style {
        #[arg(long)]
        pgn: PathBuf,
        #[arg(long, default_value = "white")]
        color: String,
    },
    /// Recommend openings for a side and a style
    Recommend {
        #[arg(long)]
        pgn: PathBuf,
        #[arg(long, default_value = "white")]
        color: String,
        /// combinativo, posicional or universal
        #[arg(long)]
        style: String,
    },
    /// Detect the style, then recommend openings for it
    Analyze {
        #[arg(long)]
        pgn: PathBuf,
        #[arg(long, default_value = "white")]
        color: String,
    },
    /// Print the raw feature vector of a side
    Extract {
        #[arg(long)]
        pgn: PathBuf,
        #[arg(long, default_value = "white")]
        color: String,
        /// Append a style block and use the recommender layout
        #[arg(long)]
        style: Option<String>,
    },
    /// Build a labelled CSV dataset from a PGN database
    Dataset {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long, default_value = "dataset.csv")]
        output: PathBuf,
        /// Hide the progress bar
        #[arg(long)]
        quiet: bool,
    },
}

fn init_logging(debug: bool) {
    let log_level = if debug { "debug" } else { "info" };
    env_logger::Builder::from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, log_level),
    )
    .target(env_logger::Target::Stderr)
    .init();
}

fn load_config(args: &Args) -> Result<AdvisorConfig, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => AdvisorConfig::from_file(path)?,
        None => AdvisorConfig::default(),
    };
    if let Some(path) = &args.style_model {
        config.style_model_path = path.clone();
    }
    if let Some(path) = &args.opening_model {
        config.opening_model_path = path.clone();
    }
    config.validate()?;
    Ok(config)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(&args)?;

    match args.command {
        Command::Style { pgn, color } => {
            let service = AnalysisService::from_config(config)?;
            let text = fs::read_to_string(&pgn)?;
            print_json(&service.detect_style_response(&text, &color))?;
        }
        Command::Recommend { pgn, color, style } => {
            let service = AnalysisService::from_config(config)?;
            let text = fs::read_to_string(&pgn)?;
            print_json(&service.recommend_openings_response(&text, &color, &style))?;
        }
        Command::Analyze { pgn, color } => {
            let service = AnalysisService::from_config(config)?;
            let text = fs::read_to_string(&pgn)?;
            let report = service.analyze(&text, parse_color(&color)?)?;
            print_json(&report)?;
        }
        Command::Extract { pgn, color, style } => {
            let text = fs::read_to_string(&pgn)?;
            let style = style.map(|s| s.parse::<StyleClass>()).transpose()?;
            let vector = extract_features(&config, &text, parse_color(&color)?, style)?;
            log::info!(
                "Extracted {} values from {} sampled blocks",
                vector.len(),
                vector.sampled_blocks()
            );
            print_json(&vector.to_vec())?;
        }
        Command::Dataset {
            input,
            output,
            quiet,
        } => {
            let builder = DatasetBuilder::new(&config).with_progress(!quiet);
            let rows = builder.build_from_reader(BufReader::new(File::open(&input)?))?;
            builder.write_csv(&rows, BufWriter::new(File::create(&output)?))?;
            log::info!("Wrote {} rows to {}", rows.len(), output.display());
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.debug);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
