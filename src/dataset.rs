use crate::assembler::{FeatureAssembler, FeatureSet};
use crate::config::AdvisorConfig;
use crate::config_error;
use crate::errors::Result;
use crate::game_record::GameRecord;
use crate::pipeline::color_name;
use crate::style::StyleClass;
use chess::Color;
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::io::{Read, Write};

/// One labelled training example
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetRow {
    pub white: String,
    pub black: String,
    pub color: Color,
    pub style: StyleClass,
    pub features: Vec<f32>,
}

/// Players with a known style, as written in PGN `White`/`Black` tags
pub fn default_player_styles() -> BTreeMap<String, StyleClass> {
    use StyleClass::*;
    [
        ("Steinitz, Wilhelm", Positional),
        ("Capablanca, José", Positional),
        ("Karpov, Anatoly", Positional),
        ("Kramnik, Vladimir", Positional),
        ("Alekhine, Alexander", Combinative),
        ("Fischer, Robert James", Combinative),
        ("Kasparov, Garry", Combinative),
        ("Tal, Mikhail", Combinative),
        ("Petrosian, Tigran", Positional),
        ("Lasker, Emanuel", Universal),
        ("Spassky, Boris", Universal),
        ("Anand, Viswanathan", Universal),
        ("Carlsen, Magnus", Universal),
        ("Botvinnik, Mikhail", Positional),
        ("Euwe, Max", Positional),
    ]
    .into_iter()
    .map(|(name, style)| (name.to_string(), style))
    .collect()
}

/// Extracts labelled style vectors from a game database
#[derive(Debug, Clone)]
pub struct DatasetBuilder {
    assembler: FeatureAssembler,
    min_half_moves: usize,
    threads: usize,
    show_progress: bool,
    player_styles: BTreeMap<String, StyleClass>,
}

impl DatasetBuilder {
    pub fn new(config: &AdvisorConfig) -> Self {
        Self {
            assembler: FeatureAssembler::new(config.moves_to_analyze, FeatureSet::Style),
            min_half_moves: config.min_half_moves,
            threads: config.dataset_threads,
            show_progress: true,
            player_styles: default_player_styles(),
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn with_player(mut self, name: &str, style: StyleClass) -> Self {
        self.player_styles.insert(name.to_string(), style);
        self
    }

    pub fn player_styles(&self) -> &BTreeMap<String, StyleClass> {
        &self.player_styles
    }

    /// Side whose player has a known style; White is checked first
    pub fn label(&self, game: &GameRecord) -> Option<(Color, StyleClass)> {
        [Color::White, Color::Black].into_iter().find_map(|color| {
            game.player(color)
                .and_then(|name| self.player_styles.get(name.trim()))
                .map(|style| (color, *style))
        })
    }

    /// Read a PGN database and build rows for every usable game
    pub fn build_from_reader<R: Read>(&self, source: R) -> Result<Vec<DatasetRow>> {
        let games = GameRecord::read_all(source)?;
        self.build(&games)
    }

    /// Build rows in parallel; unlabelled, short or failing games are skipped
    pub fn build(&self, games: &[GameRecord]) -> Result<Vec<DatasetRow>> {
        let candidates: Vec<(&GameRecord, Color, StyleClass)> = games
            .iter()
            .filter(|game| game.half_moves() >= self.min_half_moves)
            .filter_map(|game| self.label(game).map(|(color, style)| (game, color, style)))
            .collect();

        info!(
            "{} of {} games are long enough and have a labelled player",
            candidates.len(),
            games.len()
        );

        let pb = if self.show_progress {
            let pb = ProgressBar::new(candidates.len() as u64);
            if let Ok(style) = ProgressStyle::default_bar()
                .template("Extracting [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%)")
            {
                pb.set_style(style.progress_chars("#>-"));
            }
            pb
        } else {
            ProgressBar::hidden()
        };

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.threads)
            .build()
            .map_err(|e| config_error!("cannot start dataset workers: {}", e))?;

        let rows: Vec<DatasetRow> = pool.install(|| {
            candidates
                .par_iter()
                .filter_map(|(game, color, style)| {
                    pb.inc(1);
                    match self.assembler.assemble(game, *color, None) {
                        Ok(vector) => Some(DatasetRow {
                            white: game.player(Color::White).unwrap_or_default().to_string(),
                            black: game.player(Color::Black).unwrap_or_default().to_string(),
                            color: *color,
                            style: *style,
                            features: vector.to_vec(),
                        }),
                        Err(e) => {
                            warn!("Skipping game without features: {}", e);
                            None
                        }
                    }
                })
                .collect()
        });

        pb.finish_and_clear();
        info!("Extracted {} dataset rows", rows.len());
        Ok(rows)
    }

    /// Write rows as `white,black,color,style,f0..fN`
    pub fn write_csv<W: Write>(&self, rows: &[DatasetRow], writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        let mut header = vec![
            "white".to_string(),
            "black".to_string(),
            "color".to_string(),
            "style".to_string(),
        ];
        header.extend((0..self.assembler.vector_len()).map(|i| format!("f{}", i)));
        csv_writer.write_record(&header)?;

        for row in rows {
            let mut record = vec![
                row.white.clone(),
                row.black.clone(),
                color_name(row.color).to_string(),
                row.style.key().to_string(),
            ];
            record.extend(row.features.iter().map(|v| v.to_string()));
            csv_writer.write_record(&record)?;
        }

        csv_writer.flush()?;
        Ok(())
    }
}
