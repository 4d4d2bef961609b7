mod cli;

use std::io::{self, BufRead, Write};
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Builder;
use log::{LevelFilter, info};
use rand::SeedableRng;
use rand::rngs::StdRng;

use gender_predictor::{
    NaiveBayesClassifier, PredictorError, TrainingPipeline, load_csv, store, train_test_split,
};

use cli::{ClassifyArgs, Command, InspectArgs, PredictorArgs, TrainArgs};

fn main() {
    let args = PredictorArgs::parse();

    let log_level = match args.verbosity() {
        0 => LevelFilter::Error,
        1 => LevelFilter::Warn,
        2 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    Builder::new()
        .filter_level(log_level)
        .format(|buf, record| writeln!(buf, "[{}] {}", record.level(), record.args()))
        .init();

    let result = match args.command {
        Command::Train(args) => run_train(args),
        Command::Classify(args) => run_classify(args),
        Command::Inspect(args) => run_inspect(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    let examples = load_csv(&args.data, args.format.into())
        .with_context(|| format!("loading {}", args.data.display()))?;

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let split = train_test_split(&examples, args.test_ratio, &mut rng);
    info!(
        "🧠 training on {} names, holding out {}",
        split.train.len(),
        split.test.len()
    );

    let mut pipeline = TrainingPipeline::new();
    if let Some(labels) = args.labels {
        pipeline = pipeline.with_expected_labels(labels);
    }
    let classifier = if args.parallel {
        pipeline.fit_parallel(&split.train)?
    } else {
        pipeline.fit(&split.train)?
    };

    if !split.test.is_empty() {
        let acc = classifier.accuracy(&split.test)?;
        println!("✅ Accuracy: {:.2}%", acc * 100.0);
    }
    print_top_features(&classifier, args.top);

    store::save_to_file(&classifier, &args.model.model)?;
    println!("💾 Saved model to {}", args.model.model.display());
    Ok(())
}

fn run_classify(args: ClassifyArgs) -> Result<()> {
    let classifier = store::load_from_file(&args.model.model)
        .with_context(|| format!("loading model {}", args.model.model.display()))?;

    if !args.names.is_empty() {
        for name in &args.names {
            print_prediction(&classifier, name)?;
        }
        return Ok(());
    }

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("Enter a name to classify (or 'exit'): ");
        io::stdout().flush()?;
        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;
        let name = line.trim();

        if name.eq_ignore_ascii_case("exit") {
            break;
        }
        match print_prediction(&classifier, name) {
            Err(PredictorError::InvalidInput(_)) => {
                println!("⚠️ Please enter a name.");
            }
            other => other?,
        }
    }
    Ok(())
}

fn run_inspect(args: InspectArgs) -> Result<()> {
    let classifier = store::load_from_file(&args.model.model)
        .with_context(|| format!("loading model {}", args.model.model.display()))?;
    let model = classifier.model();

    println!("📦 {}", args.model.model.display());
    println!("Examples: {}", model.total_examples());
    for (label, count) in model.label_counts() {
        println!("{:>12}: {}", label, count);
    }
    for (name, domain) in model.feature_value_domains() {
        println!("{:>12}: {} distinct values", name, domain.len());
    }
    print_top_features(&classifier, args.top);
    Ok(())
}

fn print_prediction(
    classifier: &NaiveBayesClassifier,
    name: &str,
) -> gender_predictor::Result<()> {
    let label = classifier.classify(name)?;
    let probs = classifier.classify_with_probabilities(name)?;
    let detail = probs
        .iter()
        .map(|(l, p)| format!("P({l}) = {:.2}%", p * 100.0))
        .collect::<Vec<_>>()
        .join(", ");
    println!("{name} is classified as {label} ({detail})");
    Ok(())
}

fn print_top_features(classifier: &NaiveBayesClassifier, n: usize) {
    if n == 0 {
        return;
    }
    println!("Most Informative Features:");
    for f in classifier.most_informative_features(n) {
        println!(
            "{:>25} | {} : {} = {:.2} : 1",
            format!("{}={}", f.feature, f.value),
            f.favored,
            f.disfavored,
            f.ratio
        );
    }
}
