//! Rescue run on a hand-built three-storey building with collapsed stairwells.
//!
//! cargo run --example collapsed_building

use rescue_ga::baseline::build_baseline;
use rescue_ga::models::{Coord, Dimensions, Environment, StartPolicy, Survivor};
use rescue_ga::{Configuration, ServiceBuilder};

fn building() -> anyhow::Result<Environment> {
    let dimensions = Dimensions::new(12, 8, 3)?;

    // Each floor is split by a rubble wall with a single opening on alternating sides
    let mut rubble = Vec::new();
    for z in 0..3 {
        let gap = if z % 2 == 0 { 7 } else { 0 };
        rubble.extend((0..8).filter(|&y| y != gap).map(|y| Coord::new(6, y, z)));
    }

    let survivors = vec![
        Survivor {
            position: Coord::new(10, 1, 0),
            priority: 5,
        },
        Survivor {
            position: Coord::new(2, 6, 1),
            priority: 3,
        },
        Survivor {
            position: Coord::new(9, 6, 2),
            priority: 1,
        },
    ];

    Ok(Environment::from_parts(dimensions, rubble, survivors)?)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_thread_ids(true).init();

    let config = Configuration {
        population_size: 80,
        num_generations: 150,
        max_path_length: 80,
        workers: 4,
        start_policy: StartPolicy::TopFace,
        stagnation_limit: 40,
        seed: Some(7),
        ..Configuration::default()
    };

    let service = ServiceBuilder::new(config.request()?, building()?).build()?;
    let model = service.fitness_model();
    let outcome = service.run()?;

    println!(
        "{:?} after {} generations",
        outcome.conclusion(),
        outcome.generation()
    );
    for report in outcome.workers() {
        println!(
            "  worker {} evolved {} local generations, island best {:?}",
            report.worker_id(),
            report.local_generations(),
            report.best().map(|p| p.fitness())
        );
    }

    if let Some(best) = outcome.best() {
        println!(
            "GA best: fitness {:.2}, {} survivors, {} steps",
            best.fitness(),
            best.survivors_reached(),
            best.len()
        );

        if let Some(start) = best.start() {
            let baseline = build_baseline(&model, start, config.max_path_length);
            println!(
                "A*:      fitness {:.2}, {} survivors, {} steps",
                baseline.fitness(),
                baseline.survivors_reached(),
                baseline.len()
            );
        }
    }

    Ok(())
}
