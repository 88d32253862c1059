use colorful_core::{
    CategoryModel, Color, GoalBuilder, Metric, ScoringEngine,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn preset() -> CategoryModel {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/data/kb_colors_preset.csv");
    CategoryModel::load_csv(path).expect("preset loads")
}

fn random_color(rng: &mut StdRng) -> Color {
    Color::new(
        rng.gen_range(0.0..360.0),
        rng.gen_range(0.0..=100.0),
        rng.gen_range(0.0..=100.0),
    )
    .unwrap()
}

#[test]
fn acceptability_stays_in_bounds() {
    let engine = ScoringEngine::default();
    let model = preset();
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..500 {
        let color = random_color(&mut rng);
        for (_, category) in model.iter() {
            let acc = engine.acceptability(category, &color);
            assert!(acc >= engine.lower_bound());
            assert!(acc <= 1.0);
        }
    }
}

#[test]
fn discriminatory_power_sums_to_one_for_every_slot() {
    let engine = ScoringEngine::default();
    let model = preset();
    let mut rng = StdRng::seed_from_u64(7);
    for size in 1..=4 {
        let colors: Vec<Color> = (0..size).map(|_| random_color(&mut rng)).collect();
        let table = engine.score_model(&model, &colors);
        for slot in 0..size {
            let total: f64 = table
                .names()
                .map(|name| table.slot(name, slot).unwrap().dp)
                .sum();
            assert!((total - 1.0).abs() < 1e-9, "slot {} sums to {}", slot, total);
        }
    }
}

#[test]
fn hue_relabelling_by_full_turns_changes_nothing() {
    let engine = ScoringEngine::default();
    let model = preset();
    for h in [0.0, 5.0, 179.0, 355.0] {
        let base = Color::new(h, 80.0, 50.0).unwrap();
        let up = Color::new(h + 360.0, 80.0, 50.0).unwrap();
        let down = Color::new(h - 360.0, 80.0, 50.0).unwrap();
        for (_, category) in model.iter() {
            let a = engine.acceptability(category, &base);
            assert!((a - engine.acceptability(category, &up)).abs() < 1e-12);
            assert!((a - engine.acceptability(category, &down)).abs() < 1e-12);
        }
    }
}

#[test]
fn scoring_twice_reproduces_identical_columns() {
    let engine = ScoringEngine::default();
    let model = preset();
    let colors = [
        Color::new(12.0, 85.0, 40.0).unwrap(),
        Color::new(40.0, 90.0, 55.0).unwrap(),
        Color::new(200.0, 30.0, 80.0).unwrap(),
    ];
    assert_eq!(
        engine.score_model(&model, &colors),
        engine.score_model(&model, &colors)
    );
}

#[test]
fn red_yellow_goals() {
    let model = CategoryModel::from_csv_str(
        "colorname,hc,hr,sc,sr,lc,lr\n\
         red,0,20,90,10,50,15\n\
         yellow,50,20,90,10,50,15\n",
    )
    .unwrap();
    let colors = [
        Color::new(10.0, 90.0, 50.0).unwrap(),
        Color::new(45.0, 90.0, 50.0).unwrap(),
    ];
    let table = ScoringEngine::default().score_model(&model, &colors);
    let builder = GoalBuilder::default();

    let first = builder.naive(&table, 0, "red").unwrap();
    assert!(first.distracting_categories.is_empty());

    let second = builder.naive(&table, 1, "red").unwrap();
    assert_eq!(second.distracting_categories, vec!["yellow".to_string()]);
    assert_eq!(table.best(1, Metric::Acc), Some("yellow"));
}
