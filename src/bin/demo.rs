use nalgebra::{DMatrix, DVector};
use statlearn::data::dataset::Dataset;
use statlearn::data::io::{read_categorical_csv, read_regression_csv};
use statlearn::maxent::model::MaxEntropy;
use statlearn::maxent::params::MaxEntropyParams;
use statlearn::metrics::confusion::ClassificationMetrics;
use statlearn::metrics::errors::RegressionMetrics;
use statlearn::regression::logistic::LogisticRegression;
use statlearn::trees::classifier::C45Classifier;
use statlearn::trees::regressor::RegressionCart;
use statlearn::trees::{SplitEvent, TreeModel};
use std::error::Error;
use tracing::info;

const USAGE: &str = "usage: statlearn-demo [--classify <csv> | --regress <csv>] [--header]";

fn loan_rows() -> Vec<Vec<&'static str>> {
    vec![
        vec!["young", "no", "no", "fair"],
        vec!["young", "no", "no", "good"],
        vec!["young", "yes", "no", "good"],
        vec!["young", "yes", "yes", "fair"],
        vec!["young", "no", "no", "fair"],
        vec!["old", "no", "no", "fair"],
        vec!["old", "no", "no", "good"],
        vec!["old", "yes", "yes", "good"],
        vec!["old", "no", "yes", "excellent"],
        vec!["old", "no", "yes", "excellent"],
        vec!["old", "no", "yes", "excellent"],
        vec!["old", "no", "yes", "good"],
        vec!["old", "yes", "no", "good"],
        vec!["old", "yes", "no", "excellent"],
        vec!["old", "no", "no", "fair"],
    ]
}

fn loan_labels() -> Vec<&'static str> {
    vec![
        "no", "no", "yes", "yes", "no", "no", "no", "yes", "yes", "yes", "yes", "yes", "yes",
        "yes", "no",
    ]
}

fn print_split(event: &SplitEvent) {
    match event {
        SplitEvent::Categorical {
            depth,
            column,
            gain_ratio,
            n_samples,
        } => println!(
            "{:indent$}split on column {} (gain ratio {:.4}, {} samples)",
            "",
            column,
            gain_ratio,
            n_samples,
            indent = depth * 2
        ),
        SplitEvent::Continuous {
            depth,
            column,
            threshold,
            squared_error,
            n_samples,
        } => println!(
            "{:indent$}x[{}] <= {} (squared error {:.5}, {} samples)",
            "",
            column,
            threshold,
            squared_error,
            n_samples,
            indent = depth * 2
        ),
        SplitEvent::Leaf { depth, n_samples } => {
            println!("{:indent$}leaf ({} samples)", "", n_samples, indent = depth * 2)
        }
    }
}

fn c45_examples() -> Result<(), Box<dyn Error>> {
    println!("C4.5 example 1: loan approval");
    let dataset = Dataset::from_rows(&loan_rows(), loan_labels())?;
    let mut tree = C45Classifier::new();
    tree.set_split_observer(print_split);
    println!("{}", tree.fit(&dataset)?);
    let predictions = tree.predict(&dataset.x)?;
    println!("training accuracy: {:.3}", tree.accuracy(&dataset.y, &predictions)?);

    // The unpruned tree doesn't generalize to the three held-out records.
    println!("\nC4.5 example 2: fit on 12 records, predict all 15");
    let test = Dataset::from_rows(&loan_rows(), loan_labels())?;
    let train: Vec<usize> = (0..15).filter(|i| ![2, 12, 13].contains(i)).collect();
    let mut tree = C45Classifier::new();
    println!("{}", tree.fit(&test.select_rows(&train))?);
    let predictions = tree.predict(&test.x)?;
    for (row, (predicted, actual)) in predictions.iter().zip(test.y.iter()).enumerate() {
        println!("{:>2}: predicted {:<3} actual {}", row, predicted, actual);
    }
    let matrix = tree.confusion_matrix(&test.y, &predictions)?;
    println!("test accuracy: {:.3}", matrix.accuracy());
    for class in &matrix.classes {
        println!(
            "{:<3} precision {:.3}, recall {:.3}, f1 {:.3}",
            class,
            matrix.precision(class)?,
            matrix.recall(class)?,
            matrix.f1(class)?
        );
    }
    println!("macro f1: {:.3}", tree.f1_score(&test.y, &predictions)?);
    Ok(())
}

fn cart_examples() -> Result<(), Box<dyn Error>> {
    let x = DMatrix::from_iterator(10, 1, (1..=10).map(f64::from));
    let y = DVector::from_vec(vec![4.5, 4.75, 4.91, 5.34, 5.8, 7.05, 7.90, 8.23, 8.70, 9.00]);
    let dataset = Dataset::new(x.clone(), y.clone());
    let shifted = x.map(|value| value + 0.5);

    let examples: [(&str, Option<u16>, &DMatrix<f64>, bool); 4] = [
        ("CART example 1: full tree", None, &x, true),
        ("CART example 2: predict between training points", None, &shifted, false),
        ("CART example 3: stump", Some(1), &x, true),
        ("CART example 4: split twice", Some(3), &x, true),
    ];

    for (title, max_depth, test_x, on_training_set) in examples {
        println!("\n{}", title);
        let mut tree = RegressionCart::with_params(max_depth)?;
        tree.set_split_observer(print_split);
        println!("{}", tree.fit(&dataset)?);
        let predictions = tree.predict(test_x)?;
        for (input, predicted) in test_x.iter().zip(predictions.iter()) {
            println!("x = {:<4} -> {:.4}", input, predicted);
        }
        if on_training_set {
            println!("mse: {:.5}", tree.mse(&y, &predictions)?);
        }
    }
    Ok(())
}

fn logistic_examples() -> Result<(), Box<dyn Error>> {
    let x = DMatrix::from_row_slice(4, 2, &[0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 1.0, 1.0]);
    let examples = [
        ("Logistic regression example 1: separable", vec![1u8, 1, 0, 0]),
        ("Logistic regression example 2: XOR isn't linearly separable", vec![1u8, 0, 0, 1]),
    ];

    for (title, labels) in examples {
        println!("\n{}", title);
        let dataset = Dataset::new(x.clone(), DVector::from_vec(labels));
        let mut model = LogisticRegression::<f64, u8>::with_params(None, None, None, Some(0))?;
        println!("{}", model.fit(&dataset)?);
        let predictions = model.predict(&x)?;
        println!("weights: {:?}", model.weights().map(|w| w.as_slice().to_vec()));
        println!("accuracy: {:.3}", model.accuracy(&dataset.y, &predictions)?);
    }
    Ok(())
}

fn maxent_examples() -> Result<(), Box<dyn Error>> {
    let p_data = DMatrix::from_row_slice(2, 3, &[0.125, 0.25, 0.125, 0.5, 0.0, 0.0]);
    let table = |values: [f64; 6]| DMatrix::from_row_slice(2, 3, &values);
    let examples = [
        ("Max entropy example 1: one indicator", vec![table([1.0, 0.0, 0.0, 0.0, 0.0, 0.0])]),
        ("Max entropy example 2: scaled indicator", vec![table([0.5, 0.0, 0.0, 0.0, 0.0, 0.0])]),
        (
            "Max entropy example 3: two indicators",
            vec![
                table([1.0, 0.0, 0.0, 0.0, 0.0, 0.0]),
                table([0.0, 0.0, 0.0, 0.0, 1.0, 0.0]),
            ],
        ),
        ("Max entropy example 4: complement", vec![table([0.0, 1.0, 1.0, 0.0, 0.0, 0.0])]),
        ("Max entropy example 5: weighted", vec![table([0.0, 1.0, 0.5, 0.0, 0.0, 0.0])]),
    ];

    let mut params = MaxEntropyParams::new();
    params.set_seed(Some(0));
    for (title, features) in examples {
        println!("\n{}", title);
        let mut model = MaxEntropy::with_params(params.clone());
        println!("{}", model.fit(&p_data, &features)?);
        for (x, row) in model.probabilities()?.row_iter().enumerate() {
            let row: Vec<String> = row.iter().map(|p| format!("{:.4}", p)).collect();
            println!("p(y | x = {}) = [{}]", x, row.join(", "));
        }
    }
    Ok(())
}

fn run_csv(flag: &str, path: &str, header: bool) -> Result<(), Box<dyn Error>> {
    match flag {
        "--classify" => {
            let dataset = read_categorical_csv(path, header)?;
            info!(records = dataset.nrows(), "Loaded categorical dataset");
            let mut tree = C45Classifier::new();
            println!("{}", tree.fit(&dataset)?);
            let predictions = tree.predict(&dataset.x)?;
            println!("training accuracy: {:.3}", tree.accuracy(&dataset.y, &predictions)?);
        }
        "--regress" => {
            let dataset = read_regression_csv(path, header)?;
            info!(records = dataset.nrows(), "Loaded regression dataset");
            let mut tree = RegressionCart::new();
            println!("{}", tree.fit(&dataset)?);
            let predictions = tree.predict(&dataset.x)?;
            println!("training mse: {:.5}", tree.mse(&dataset.y, &predictions)?);
            println!("training r2: {:.5}", tree.r2(&dataset.y, &predictions)?);
        }
        _ => return Err(USAGE.into()),
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "statlearn=info".into()),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let header = args.iter().any(|arg| arg == "--header");
    let positional: Vec<&String> = args.iter().filter(|arg| *arg != "--header").collect();

    match positional.as_slice() {
        [] => {
            c45_examples()?;
            cart_examples()?;
            logistic_examples()?;
            maxent_examples()
        }
        [flag, path] => run_csv(flag, path, header),
        _ => Err(USAGE.into()),
    }
}
