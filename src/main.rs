use pinnacle::engines::generation::ConsoleProgressCallback;
use pinnacle::functions::primitives;
use pinnacle::{Arity, ConfigManager, EvolutionEngine, Palette, TrainingCase, TrainingSet};

#[derive(Debug, Clone, Copy)]
struct Point {
    x: f64,
    y: f64,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Optional TOML config as the first argument
    let manager = ConfigManager::new();
    if let Some(path) = std::env::args().nth(1) {
        manager.load_from_file(&path)?;
        log::info!("Loaded configuration from {}", path);
    }
    let config = manager.get()?;

    let mut palette = Palette::new().with_arithmetic();
    palette
        .add_functional("neg", Arity::exact(1), primitives::negate)?
        .add_terminal("x", |p: &Point| Ok(p.x))
        .add_terminal("y", |p: &Point| Ok(p.y))
        .add_constant(1.0)
        .add_constant(2.0);

    // x * x + y over a small grid
    let cases: Vec<TrainingCase<Point>> = (-3..=3)
        .flat_map(|x| (-3..=3).map(move |y| Point { x: x as f64, y: y as f64 }))
        .map(|p| TrainingCase::new(p, p.x * p.x + p.y))
        .collect();
    log::info!("Training on {} cases", cases.len());

    let mut engine = EvolutionEngine::from_app_config(&config, palette, TrainingSet::Static(cases))?;
    let summary = engine.run(&mut ConsoleProgressCallback)?;

    match &summary.best {
        Some(best) => log::info!(
            "Best after {} generations: {} (fitness {:.4})",
            summary.generations,
            best.expression,
            best.fitness.unwrap_or(0.0)
        ),
        None => log::warn!("Run ended without a scored organism"),
    }
    println!("{}", summary.to_json()?);

    Ok(())
}
