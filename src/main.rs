//! Football Match Prediction CLI
//!
//! Ensemble match prediction with Monte Carlo, minute-by-minute and season
//! simulation.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use football::{Config, Result};

#[derive(Parser)]
#[command(name = "football")]
#[command(about = "Football match prediction and simulation", long_about = None)]
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
    /// Initialize a new project with default config
    Init,
    /// Data management commands
    Data {
        #[command(subcommand)]
        action: DataCommands,
    },
    /// Train the ensemble on all stored matches
    Train {
        /// voting or stacking
        #[arg(long)]
        strategy: Option<String>,
        /// Override number of epochs for the neural members
        #[arg(long)]
        epochs: Option<usize>,
    },
    /// Grid-search MLP hyperparameters on the validation split
    Tune {
        /// Maximum epochs per candidate
        #[arg(long, default_value = "100")]
        max_epochs: usize,
    },
    /// Evaluate the saved ensemble on the held-out split
    Evaluate,
    /// Predict match outcomes
    Predict {
        /// Home team name
        home: Option<String>,
        /// Away team name
        away: Option<String>,
        /// Match date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Predict stored upcoming fixtures
        #[arg(long)]
        upcoming: bool,
        /// Maximum number of upcoming fixtures
        #[arg(long, default_value = "10")]
        limit: usize,
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
    /// Monte Carlo simulation of a single match
    Simulate {
        home: String,
        away: String,
        #[arg(long)]
        iterations: Option<usize>,
        #[arg(long)]
        seed: Option<u64>,
        /// Perturb the feature vector and re-predict each iteration
        #[arg(long)]
        perturb_features: bool,
    },
    /// Minute-by-minute match simulation
    SimulateMatch {
        home: String,
        away: String,
        /// Squad file (JSON) to pick line-ups and strengths from
        #[arg(long)]
        squads: Option<String>,
        #[arg(long)]
        seed: Option<u64>,
        /// Number of matches; one prints the full timeline
        #[arg(long, default_value = "1")]
        runs: usize,
    },
    /// Project the rest of a league season
    SimulateSeason {
        /// Current standings CSV (team,played,points,goals_for,goals_against);
        /// built from the stored results of the current season when omitted
        #[arg(long)]
        table: Option<String>,
        /// Competition code used when building the table from stored results
        #[arg(long)]
        competition: Option<String>,
        /// Remaining fixtures CSV (home,away[,expected_home,expected_away])
        #[arg(long)]
        fixtures: String,
        #[arg(long)]
        iterations: Option<usize>,
    },
    /// Squad commands
    Squad {
        #[command(subcommand)]
        action: SquadCommands,
    },
}

#[derive(Subcommand)]
enum DataCommands {
    /// Import matches and fixtures from a CSV or JSON file
    Import {
        path: String,
    },
    /// Sync data from remote sources
    Sync {
        /// Only sync from one source (api or wikipedia)
        #[arg(long)]
        source: Option<String>,
        /// Competition code, e.g. PL
        #[arg(long)]
        competition: Option<String>,
        /// Wikipedia page suffix, e.g. Premier_League
        #[arg(long, default_value = "Premier_League")]
        league_page: String,
        /// Season start years (defaults to the current season)
        #[arg(long, value_delimiter = ',')]
        season: Vec<u16>,
        /// Cache directory for responses
        #[arg(long)]
        cache: Option<String>,
        /// Use only cached responses (no network requests)
        #[arg(long)]
        offline: bool,
    },
    /// Show database status
    Status,
}

#[derive(Subcommand)]
enum SquadCommands {
    /// Show each squad's best eleven and bench
    Show { file: String },
    /// Rank squads by strength
    Strength { file: String },
}

#[derive(Clone, Debug)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown format: {}. Use table, json, or csv.", s)),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

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

    let result = match cli.command {
        Commands::Init => commands::init(&cli.config),
        Commands::Data { action } => match action {
            DataCommands::Import { path } => commands::data_import(&config, &path),
            DataCommands::Sync {
                source,
                competition,
                league_page,
                season,
                cache,
                offline,
            } => commands::data_sync(
                &config,
                source,
                competition,
                &league_page,
                season,
                cache,
                offline,
            ),
            DataCommands::Status => commands::data_status(&config),
        },
        Commands::Train { strategy, epochs } => commands::train(config, strategy, epochs),
        Commands::Tune { max_epochs } => commands::tune(&config, max_epochs),
        Commands::Evaluate => commands::evaluate(&config),
        Commands::Predict {
            home,
            away,
            date,
            upcoming,
            limit,
            format,
        } => commands::predict(config, home, away, date, upcoming, limit, format),
        Commands::Simulate {
            home,
            away,
            iterations,
            seed,
            perturb_features,
        } => commands::simulate(config, &home, &away, iterations, seed, perturb_features),
        Commands::SimulateMatch {
            home,
            away,
            squads,
            seed,
            runs,
        } => commands::simulate_match(config, &home, &away, squads, seed, runs),
        Commands::SimulateSeason {
            table,
            competition,
            fixtures,
            iterations,
        } => commands::simulate_season(&config, table.as_deref(), competition.as_deref(), &fixtures, iterations),
        Commands::Squad { action } => match action {
            SquadCommands::Show { file } => commands::squad_show(&file),
            SquadCommands::Strength { file } => commands::squad_strength(&file),
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

mod commands {
    use super::*;
    use std::path::Path;

    use football::data::sources::football_data::FootballDataApi;
    use football::data::sources::wikipedia::WikipediaScraper;
    use football::data::sources::{merge_sources, season_of, season_start, ResponseCache, Source};
    use football::data::{Database, DataLoader, FootballDataset, LoadedData};
    use football::model::{Ensemble, TrainingSet};
    use football::predict::{format_prediction, MatchPrediction, Predictor};
    use football::simulation::{
        load_fixtures_csv, load_standings_csv, standings_from_matches, MatchEngine, MonteCarloSimulator,
        SeasonSimulator, SimulationSummary, TeamProfile,
    };
    use football::squad::{expected_goals_from_strength, TeamManager};
    use football::training::{time_split, MlpTuner, TuningGrid};
    use football::FootballError;

    pub fn init(config_path: &str) -> Result<()> {
        let config = Config::default();
        config.save(config_path)?;
        println!("Created default config at {}", config_path);

        std::fs::create_dir_all("data")?;
        std::fs::create_dir_all("model")?;
        println!("Created data/ and model/ directories");

        println!("\nNext steps:");
        println!("  1. Edit {} to customize settings", config_path);
        println!("  2. Run 'football data import <file>' or 'football data sync' to load matches");
        println!("  3. Run 'football train' to train the ensemble");
        println!("  4. Run 'football predict \"Team A\" \"Team B\"' to make predictions");

        Ok(())
    }

    /// Resolve names to IDs and upsert everything into the database
    fn store(db: &Database, data: &LoadedData) -> Result<()> {
        let (records, fixtures) = data.to_records(&|name| Ok(db.get_or_create_team(name, None)?.id))?;
        let matches = db.upsert_matches(&records)?;
        let upcoming = db.upsert_fixtures(&fixtures)?;
        println!("Stored {} matches and {} fixtures in database", matches, upcoming);
        Ok(())
    }

    pub fn data_import(config: &Config, path: &str) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;
        let loader = DataLoader::new().with_competition(&config.data.competition);

        println!("Importing {}...", path);
        let data = loader.load_path(path)?;
        println!(
            "Read {} matches and {} fixtures",
            data.matches.len(),
            data.fixtures.len()
        );
        if data.is_empty() {
            println!("Nothing to import. Check the file's columns.");
            return Ok(());
        }
        store(&db, &data)
    }

    pub fn data_sync(
        config: &Config,
        source: Option<String>,
        competition: Option<String>,
        league_page: &str,
        season: Vec<u16>,
        cache: Option<String>,
        offline: bool,
    ) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;
        let years = if season.is_empty() {
            vec![season_of(chrono::Local::now().date_naive())?]
        } else {
            season
        };

        let cache = match cache {
            Some(dir) => {
                println!("Using cache directory: {}", dir);
                ResponseCache::new(&dir).offline_only(offline)
            }
            None => ResponseCache::disabled().offline_only(offline),
        };
        if offline {
            println!("Offline mode: using cached responses only");
        }

        let competition = competition.unwrap_or_else(|| config.data.competition.clone());
        let mut sources: Vec<Box<dyn Source>> = Vec::new();
        match source.as_deref() {
            Some("api") => {
                sources.push(Box::new(
                    FootballDataApi::new(&competition, config.data.api_token.clone()).with_cache(cache),
                ));
            }
            Some("wikipedia") => {
                sources.push(Box::new(WikipediaScraper::new(league_page).with_cache(cache)));
            }
            None => {
                sources.push(Box::new(
                    FootballDataApi::new(&competition, config.data.api_token.clone())
                        .with_cache(cache.clone()),
                ));
                sources.push(Box::new(WikipediaScraper::new(league_page).with_cache(cache)));
            }
            Some(other) => {
                println!("Unknown source: {}. Available: api, wikipedia", other);
                return Ok(());
            }
        }

        let mut fetched = Vec::with_capacity(sources.len());
        for source in &sources {
            println!("Syncing from {}...", source.source());
            fetched.push(source.fetch_seasons(&years)?);
        }
        let data = merge_sources(fetched);
        println!(
            "Fetched {} matches and {} fixtures",
            data.matches.len(),
            data.fixtures.len()
        );

        if data.is_empty() {
            println!("No matches found. Check the source, season, or cache directory.");
            return Ok(());
        }
        store(&db, &data)
    }

    pub fn data_status(config: &Config) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;
        let stats = db.get_stats()?;

        println!("Database Status");
        println!("───────────────────────────────");
        println!("  Path:     {}", config.data.database_path);
        println!("  Teams:    {}", stats.team_count);
        println!("  Matches:  {}", stats.match_count);
        println!("  Fixtures: {}", stats.fixture_count);
        if let (Some(earliest), Some(latest)) = (stats.earliest_match, stats.latest_match) {
            println!("  Range:    {} to {}", earliest, latest);
        }

        Ok(())
    }

    /// Feature dataset of every stored match, oldest first
    fn load_dataset(config: &Config) -> Result<FootballDataset> {
        let db = Database::open(&config.data.database_path)?;
        let matches = db.get_all_matches()?;
        if matches.is_empty() {
            return Err(FootballError::Config(
                "No matches in database. Run 'football data import' or 'football data sync' first."
                    .to_string(),
            ));
        }
        println!("Loaded {} matches from database", matches.len());

        let dataset = FootballDataset::from_matches(&matches, &config.features);
        println!(
            "Built {} samples ({} features each)",
            dataset.len(),
            dataset.feature_dim()
        );
        Ok(dataset)
    }

    pub fn train(mut config: Config, strategy: Option<String>, epochs: Option<usize>) -> Result<()> {
        if let Some(s) = strategy {
            config.ensemble.strategy = s;
        }
        if let Some(e) = epochs {
            config.training.epochs = e;
        }

        let dataset = load_dataset(&config)?;
        let (train, val) = time_split(&dataset, config.training.validation_fraction);
        println!("  {} training samples", train.len());
        println!("  {} validation samples", val.len());
        if train.is_empty() {
            return Err(FootballError::Config(format!(
                "No training samples; teams need {} prior matches each",
                config.features.min_history
            )));
        }

        let mut ensemble = Ensemble::new(&config)?;
        println!(
            "\nTraining {} ensemble: {}",
            config.ensemble.strategy,
            config.ensemble.members.join(", ")
        );
        let component_metrics = ensemble.fit(&TrainingSet::new(train, val))?;

        println!("\nValidation metrics");
        println!("───────────────────────────────");
        for component in &component_metrics {
            println!("  {:<10} {}", component.name, component.metrics);
        }

        let model_path = Path::new(&config.data.model_path);
        ensemble.save(model_path)?;
        println!("\nEnsemble saved to {}", model_path.display());

        Ok(())
    }

    pub fn tune(config: &Config, max_epochs: usize) -> Result<()> {
        let dataset = load_dataset(config)?;
        let (train, val) = time_split(&dataset, config.training.validation_fraction);
        let grid = TuningGrid::default();
        println!(
            "Trying {} MLP configurations (max {} epochs each)...",
            grid.candidates().len(),
            max_epochs
        );

        let results = MlpTuner::new(config.training.clone())
            .with_max_epochs(max_epochs)
            .tune(&TrainingSet::new(train, val), &grid)?;

        println!("\nTop configurations by validation log-loss");
        println!("───────────────────────────────");
        for (rank, result) in results.iter().take(5).enumerate() {
            let hp = &result.hyperparams;
            println!(
                "  {}. lr={:<7} hidden={:?} wd={:<7} {}",
                rank + 1,
                hp.learning_rate,
                hp.hidden_dims,
                hp.weight_decay,
                result.val_metrics
            );
        }
        if let Some(best) = results.first() {
            println!(
                "\nSet training.learning_rate = {}, hidden_dims = {:?}, weight_decay = {} in config.toml to use the best",
                best.hyperparams.learning_rate, best.hyperparams.hidden_dims, best.hyperparams.weight_decay
            );
        }
        Ok(())
    }

    pub fn evaluate(config: &Config) -> Result<()> {
        let ensemble = Ensemble::load(Path::new(&config.data.model_path), config)?;
        let dataset = load_dataset(config)?;
        let (_, holdout) = time_split(&dataset, config.training.validation_fraction);
        println!("Evaluating on {} held-out samples", holdout.len());

        println!("\nHeld-out metrics");
        println!("───────────────────────────────");
        for component in ensemble.evaluate(&holdout)? {
            println!("  {:<10} {}", component.name, component.metrics);
        }
        Ok(())
    }

    pub fn predict(
        config: Config,
        home: Option<String>,
        away: Option<String>,
        date: Option<NaiveDate>,
        upcoming: bool,
        limit: usize,
        format: OutputFormat,
    ) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;
        let predictor = Predictor::load(db, config)?;

        let predictions = if upcoming {
            predictor.predict_upcoming(limit)?
        } else {
            match (home, away) {
                (Some(h), Some(a)) => vec![predictor.predict(&h, &a, date)?],
                _ => {
                    println!("Usage: football predict <HOME> <AWAY> or football predict --upcoming");
                    return Ok(());
                }
            }
        };

        if predictions.is_empty() {
            println!("No fixtures to predict.");
            return Ok(());
        }
        let version = format!("{}-ensemble", predictor.ensemble().strategy());
        for p in &predictions {
            predictor.database().record_prediction(&p.prediction, &version)?;
        }
        print_predictions(&predictions, &format)
    }

    fn print_predictions(predictions: &[MatchPrediction], format: &OutputFormat) -> Result<()> {
        match format {
            OutputFormat::Table => {
                for p in predictions {
                    println!("{}", format_prediction(p));
                }
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(predictions)?);
            }
            OutputFormat::Csv => {
                let mut writer = csv::Writer::from_writer(std::io::stdout());
                writer.write_record([
                    "date",
                    "home",
                    "away",
                    "home_win",
                    "draw",
                    "away_win",
                    "expected_home_goals",
                    "expected_away_goals",
                    "most_likely_score",
                    "confidence",
                ])?;
                for p in predictions {
                    let pred = &p.prediction;
                    writer.write_record([
                        p.date.to_string(),
                        p.home_name.clone(),
                        p.away_name.clone(),
                        format!("{:.4}", pred.probs.home_win),
                        format!("{:.4}", pred.probs.draw),
                        format!("{:.4}", pred.probs.away_win),
                        format!("{:.2}", pred.expected_home_goals),
                        format!("{:.2}", pred.expected_away_goals),
                        format!("{}-{}", pred.most_likely_score.0, pred.most_likely_score.1),
                        pred.confidence.to_string(),
                    ])?;
                }
                writer.flush()?;
            }
        }
        Ok(())
    }

    fn print_summary(home: &str, away: &str, summary: &SimulationSummary) {
        println!("\n{} vs {} ({} simulations)", home, away, summary.iterations);
        println!("───────────────────────────────");
        println!(
            "  Home win:         {:.1}% (±{:.1})",
            summary.home_win * 100.0,
            summary.home_win_std_error * 196.0
        );
        println!("  Draw:             {:.1}%", summary.draw * 100.0);
        println!("  Away win:         {:.1}%", summary.away_win * 100.0);
        println!(
            "  Mean goals:       {:.2} - {:.2}",
            summary.mean_home_goals, summary.mean_away_goals
        );
        println!("  Over 2.5 goals:   {:.1}%", summary.over_2_5 * 100.0);
        println!("  Both teams score: {:.1}%", summary.both_teams_score * 100.0);
        println!(
            "  Total goals (90%): {} to {}",
            summary.total_goals_interval.0, summary.total_goals_interval.1
        );
        println!("  Likely scores:");
        for (h, a, p) in &summary.top_scores {
            println!("    {}-{}  {:.1}%", h, a, p * 100.0);
        }
    }

    pub fn simulate(
        config: Config,
        home: &str,
        away: &str,
        iterations: Option<usize>,
        seed: Option<u64>,
        perturb_features: bool,
    ) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;
        let mut simulator = MonteCarloSimulator::new(&config.simulation);
        if let Some(n) = iterations {
            simulator = simulator.with_iterations(n);
        }
        if let Some(s) = seed {
            simulator = simulator.with_seed(s);
        }

        let predictor = Predictor::load(db, config)?;
        let prediction = predictor.predict(home, away, None)?;

        let summary = if perturb_features {
            let home_team = predictor.resolve(home)?;
            let away_team = predictor.resolve(away)?;
            let features = predictor.fixture_features(&home_team, &away_team, prediction.date)?;
            simulator.run_with_model(predictor.ensemble(), &features)?
        } else {
            simulator.run(
                prediction.prediction.expected_home_goals,
                prediction.prediction.expected_away_goals,
            )?
        };

        print_summary(&prediction.home_name, &prediction.away_name, &summary);
        Ok(())
    }

    /// Event-engine profiles from squads, or from model expected goals
    fn match_profiles(
        config: Config,
        home: &str,
        away: &str,
        squads: Option<String>,
    ) -> Result<(TeamProfile, TeamProfile)> {
        if let Some(file) = squads {
            let manager = TeamManager::load_json(&file)?;
            let home_team = manager.team(home)?;
            let away_team = manager.team(away)?;
            let (xh, xa) = expected_goals_from_strength(
                &home_team.strength(),
                &away_team.strength(),
                config.simulation.league_avg_goals,
            );
            return Ok((home_team.match_profile(xh), away_team.match_profile(xa)));
        }

        let db = Database::open(&config.data.database_path)?;
        let predictor = Predictor::load(db, config)?;
        let prediction = predictor.predict(home, away, None)?;
        Ok((
            TeamProfile::new(&prediction.home_name, prediction.prediction.expected_home_goals),
            TeamProfile::new(&prediction.away_name, prediction.prediction.expected_away_goals),
        ))
    }

    pub fn simulate_match(
        config: Config,
        home: &str,
        away: &str,
        squads: Option<String>,
        seed: Option<u64>,
        runs: usize,
    ) -> Result<()> {
        let seed = seed.unwrap_or(config.simulation.seed);
        let (home_profile, away_profile) = match_profiles(config, home, away, squads)?;
        println!(
            "{} (xG {:.2}) vs {} (xG {:.2})",
            home_profile.name, home_profile.expected_goals, away_profile.name, away_profile.expected_goals
        );

        let mut engine = MatchEngine::new(seed);
        if runs <= 1 {
            let timeline = engine.simulate(&home_profile, &away_profile);
            println!();
            for event in &timeline.events {
                let team = match event.side {
                    Some(football::simulation::Side::Home) => home_profile.name.as_str(),
                    Some(football::simulation::Side::Away) => away_profile.name.as_str(),
                    None => "",
                };
                println!("{:<24} {}", team, event);
            }

            let (h, a) = (&timeline.stats.home, &timeline.stats.away);
            println!(
                "\nFinal score: {} {}-{} {} (HT {}-{})",
                home_profile.name,
                timeline.final_score.0,
                timeline.final_score.1,
                away_profile.name,
                timeline.half_time_score.0,
                timeline.half_time_score.1
            );
            println!("───────────────────────────────");
            println!("  Possession:  {:>5.1}% {:>5.1}%", h.possession, a.possession);
            println!("  Shots:       {:>6} {:>6}", h.shots, a.shots);
            println!("  On target:   {:>6} {:>6}", h.shots_on_target, a.shots_on_target);
            println!("  Corners:     {:>6} {:>6}", h.corners, a.corners);
            println!("  Fouls:       {:>6} {:>6}", h.fouls, a.fouls);
            println!("  Yellows:     {:>6} {:>6}", h.yellow_cards, a.yellow_cards);
            println!("  Reds:        {:>6} {:>6}", h.red_cards, a.red_cards);
        } else {
            let summary = engine.simulate_many(&home_profile, &away_profile, runs);
            println!("\n{} simulated matches", summary.runs);
            println!("───────────────────────────────");
            println!("  Home win:    {:.1}%", summary.home_win * 100.0);
            println!("  Draw:        {:.1}%", summary.draw * 100.0);
            println!("  Away win:    {:.1}%", summary.away_win * 100.0);
            let (h, a) = (&summary.home, &summary.away);
            println!("  Goals:       {:>6.2} {:>6.2}", h.goals, a.goals);
            println!("  Possession:  {:>5.1}% {:>5.1}%", h.possession, a.possession);
            println!("  Shots:       {:>6.1} {:>6.1}", h.shots, a.shots);
            println!("  On target:   {:>6.1} {:>6.1}", h.shots_on_target, a.shots_on_target);
            println!("  Corners:     {:>6.1} {:>6.1}", h.corners, a.corners);
            println!("  Yellows:     {:>6.2} {:>6.2}", h.yellow_cards, a.yellow_cards);
            println!("  Reds:        {:>6.2} {:>6.2}", h.red_cards, a.red_cards);
        }
        Ok(())
    }

    pub fn simulate_season(
        config: &Config,
        table: Option<&str>,
        competition: Option<&str>,
        fixtures: &str,
        iterations: Option<usize>,
    ) -> Result<()> {
        let standings = match table {
            Some(path) => load_standings_csv(path)?,
            None => {
                let db = Database::open(&config.data.database_path)?;
                let since = season_start(season_of(chrono::Local::now().date_naive())?)?;
                let standings =
                    standings_from_matches(&db.get_all_matches()?, &db.get_all_teams()?, competition, since);
                if standings.is_empty() {
                    return Err(FootballError::Config(format!(
                        "No results stored since {}; pass --table or sync data first",
                        since
                    )));
                }
                println!("Built table of {} teams from results since {}", standings.len(), since);
                standings
            }
        };
        let remaining = load_fixtures_csv(fixtures)?;
        let mut simulator = SeasonSimulator::new(config);
        if let Some(n) = iterations {
            simulator = simulator.with_iterations(n);
        }

        let outlook = simulator.run(&standings, &remaining)?;

        println!(
            "\n{:<24} {:>7} {:>7} {:>7} {:>8} {:>8}",
            "Team", "Title", "Top 4", "Releg.", "Points", "Pos."
        );
        println!("{}", "─".repeat(66));
        for row in outlook {
            println!(
                "{:<24} {:>6.1}% {:>6.1}% {:>6.1}% {:>8.1} {:>8.2}",
                row.team,
                row.title * 100.0,
                row.top_four * 100.0,
                row.relegation * 100.0,
                row.mean_points,
                row.mean_position
            );
        }
        Ok(())
    }

    pub fn squad_show(file: &str) -> Result<()> {
        let manager = TeamManager::load_json(file)?;
        for team in manager.teams() {
            println!("\n{} ({})", team.name, team.formation);
            println!("───────────────────────────────");
            for player in team.best_xi() {
                println!(
                    "  {:<3} {:<24} {:>5.1}",
                    player.position,
                    player.name,
                    player.effective_rating()
                );
            }
            let bench = team.bench(9);
            if !bench.is_empty() {
                println!("  Bench:");
                for player in bench {
                    println!(
                        "  {:<3} {:<24} {:>5.1}",
                        player.position,
                        player.name,
                        player.effective_rating()
                    );
                }
            }
            let unavailable: Vec<&str> = team
                .players
                .iter()
                .filter(|p| !p.is_available())
                .map(|p| p.name.as_str())
                .collect();
            if !unavailable.is_empty() {
                println!("  Unavailable: {}", unavailable.join(", "));
            }
        }
        Ok(())
    }

    pub fn squad_strength(file: &str) -> Result<()> {
        let manager = TeamManager::load_json(file)?;
        println!(
            "\n{:<24} {:>7} {:>7} {:>7} {:>7} {:>7}",
            "Team", "Attack", "Mid", "Def", "GK", "Overall"
        );
        println!("{}", "─".repeat(64));
        for row in manager.strength_table() {
            let s = row.strength;
            println!(
                "{:<24} {:>7.1} {:>7.1} {:>7.1} {:>7.1} {:>7.1}",
                row.team, s.attack, s.midfield, s.defence, s.goalkeeper, s.overall
            );
        }
        Ok(())
    }
}
