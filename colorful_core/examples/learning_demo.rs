/// Simulated learning session
///
/// This example shows how to:
/// 1. Load a category preset and the learning configuration
/// 2. Present pairs of neighbouring colours and read the model's descriptions
/// 3. Teach the model with the three learning rules
/// 4. Export the learned model and compare it with the preset
///
/// Run with `RUST_LOG=colorful_core=debug` to see solver iterations.
use colorful_core::sampling::two_adjacent_colors;
use colorful_core::{
    border_change, CategoryModel, ColorSession, LearningConfig, LearningJournal, Metric,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let root = env!("CARGO_MANIFEST_DIR");
    let config = LearningConfig::load_from_file(format!("{root}/../config/learning.toml"))?;
    let preset = CategoryModel::load_csv(format!("{root}/data/kb_colors_preset.csv"))?;
    let out_dir = std::env::temp_dir().join("colorful_demo");

    let mut session = ColorSession::new(preset, config)?
        .with_journal(LearningJournal::with_file(out_dir.join("learning.jsonl")));
    let mut rng = StdRng::seed_from_u64(2024);

    println!("=== Colour Category Learning Demo ===\n");
    for trial in 0..6 {
        let colors = two_adjacent_colors(session.model(), &mut rng, 1.2)?;
        session.fit_colors(&colors)?;
        let naive = session.best_descriptions(Metric::Acc)?;
        let context = session.best_descriptions(Metric::Score)?;
        println!("Trial {trial}: {} | {}", colors[0], colors[1]);
        println!("  naive:   {:?}", naive);
        println!("  context: {:?}", context);

        // The simulated participant insists that the second colour is named
        // like the first one's context description.
        let label = context[0].as_str();
        let report = match trial % 3 {
            0 => session.statistical_learning(label, &colors, 1, None)?,
            1 => session.naive_learning(&colors, &[None, Some(label)], None)?,
            _ => session.context_sensitive_learning(&colors, &[None, Some(label)], None)?,
        };
        println!("  taught '{label}' -> {}", report.outcome);

        if naive[0] == naive[1] {
            let bumped = session.indistinguishable_colors(0)?;
            println!("  indistinguishable, diversity bumped for '{bumped}'");
        }
    }

    println!("\n--- Border change against the preset ---");
    for (name, learned) in session.model().iter() {
        if let Some(original) = session.baseline().get(name) {
            let change = border_change(original, learned);
            if change > 0.0 {
                println!("{name:>10}: {change:.2}");
            }
        }
    }

    let path = session.save_snapshot(&out_dir, "demo")?;
    println!("\nSaved learned model to {}", path.display());
    println!("Journal entries: {}", session.journal().entries().len());
    Ok(())
}
