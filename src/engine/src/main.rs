#![deny(rust_2018_idioms)]

use avicast_core::ScientificName;
use clap::Parser;
use engine::{App, Settings, SpeciesOutcome};
use tracing::{error, event, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Species to forecast, replaces the configured and tracked species
    #[arg(short, long)]
    species: Vec<String>,

    /// Overrides the configured number of training epochs
    #[arg(short, long)]
    epochs: Option<usize>,

    /// Seed for the train/test split, weight initialisation and range shift noise
    #[arg(long)]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let mut settings = Settings::new()?;

    tracing::subscriber::set_global_default(
        FmtSubscriber::builder()
            .with_max_level(settings.log_level.as_tracing())
            .finish(),
    )?;

    if !args.species.is_empty() {
        settings.species = Some(args.species);
    }
    if let Some(epochs) = args.epochs {
        settings.pipeline.training.epochs = epochs;
    }
    if args.seed.is_some() {
        settings.pipeline.seed = args.seed;
    }

    let app = App::build(&settings).await?;
    let report = app.run().await?;

    for (species, outcome) in &report.outcomes {
        log_outcome(species, outcome);
    }
    event!(
        Level::INFO,
        "{} species succeeded, {} failed",
        report.succeeded(),
        report.failed()
    );

    Ok(())
}

fn log_outcome(species: &ScientificName, outcome: &SpeciesOutcome) {
    match outcome {
        SpeciesOutcome::Success(report) => event!(
            Level::INFO,
            predictions_generated = report.predictions_generated,
            train_mae = report.metrics.train_mae,
            test_mae = report.metrics.test_mae,
            test_mape = report.metrics.test_mape,
            model_path = %report.model_path.display(),
            "{species}: success"
        ),
        SpeciesOutcome::Failure { error } => error!("{species}: failed, err: {error}"),
    }
}
