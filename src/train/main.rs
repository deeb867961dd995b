use anyhow::Context;
use clap::Parser;
use credit_scoring::{config::Config, ml::run_training, observability::init_tracing};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "credit-train")]
#[command(about = "Train the credit-worthiness classifier and write the model artifact", long_about = None)]
#[command(version)]
struct Cli {
    /// Delimited applicant history file
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// Where to write the model artifact
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Passes over the training split
    #[arg(short, long)]
    epochs: Option<usize>,

    /// Mini-batch size
    #[arg(short, long)]
    batch_size: Option<usize>,

    /// Adam step size
    #[arg(short, long)]
    learning_rate: Option<f64>,

    /// Fraction of rows held out for evaluation
    #[arg(short, long)]
    test_size: Option<f64>,

    /// Seed for splitting, initialization and shuffling
    #[arg(short, long)]
    seed: Option<u64>,

    /// Field delimiter of the data file
    #[arg(short = 'D', long)]
    delimiter: Option<char>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load().context("failed to load configuration")?;
    init_tracing(&config.observability)?;

    let training = &mut config.training;
    if let Some(data) = cli.data {
        training.data_path = data;
    }
    if let Some(epochs) = cli.epochs {
        training.epochs = epochs;
    }
    if let Some(batch_size) = cli.batch_size {
        training.batch_size = batch_size;
    }
    if let Some(learning_rate) = cli.learning_rate {
        training.learning_rate = learning_rate;
    }
    if let Some(test_size) = cli.test_size {
        training.test_size = test_size;
    }
    if let Some(seed) = cli.seed {
        training.seed = seed;
    }
    if let Some(delimiter) = cli.delimiter {
        training.delimiter = delimiter;
    }
    let output = cli.output.unwrap_or_else(|| config.model.artifact_path.clone());

    tracing::info!(
        data = %config.training.data_path.display(),
        output = %output.display(),
        epochs = config.training.epochs,
        batch_size = config.training.batch_size,
        "Starting training run"
    );

    let report = run_training(&config.training, &output).with_context(|| {
        format!(
            "training on {} failed",
            config.training.data_path.display()
        )
    })?;

    let metrics = &report.metadata.test_metrics;
    println!("Model saved to {}", report.artifact_path.display());
    println!("Model id:       {}", report.metadata.model_id);
    println!(
        "Samples:        {} train / {} test",
        report.metadata.n_training_samples, report.metadata.n_test_samples
    );
    println!("Test loss:      {:.4}", metrics.loss);
    println!("Test accuracy:  {:.4}", metrics.accuracy);
    println!("Test precision: {:.4}", metrics.precision);
    println!("Test recall:    {:.4}", metrics.recall);
    println!("Test F1:        {:.4}", metrics.f1_score);

    Ok(())
}
