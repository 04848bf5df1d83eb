use rescue_ga::{Configuration, bootstrap_optimizer, models::Conclusion};
use std::thread;
use std::time::Duration;

fn endless_config() -> Configuration {
    Configuration {
        population_size: 20,
        num_generations: u32::MAX,
        workers: 2,
        stagnation_limit: 0,
        seed: Some(3),
        ..Configuration::default()
    }
}

#[test]
fn test_interrupt_run_end_to_end() -> anyhow::Result<()> {
    let service = bootstrap_optimizer(&endless_config())?.build()?;
    let interrupt = service.interrupt_handle();

    // Interrupt the run from another thread once it is underway
    let interrupter = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        interrupt.interrupt()
    });

    let outcome = service.run()?;

    assert!(
        interrupter.join().expect("interrupter panicked")?,
        "Interrupt should be the first stop reason"
    );
    assert_eq!(outcome.conclusion(), Conclusion::Interrupted);
    assert!(outcome.generation() < u32::MAX);
    assert_eq!(outcome.failed_workers(), 0);
    assert_eq!(outcome.workers().len(), 2);

    Ok(())
}

#[test]
fn test_interrupt_before_run_terminates_immediately() -> anyhow::Result<()> {
    let service = bootstrap_optimizer(&endless_config())?.build()?;

    service.interrupt_handle().interrupt()?;
    let outcome = service.run()?;

    assert_eq!(outcome.conclusion(), Conclusion::Interrupted);
    assert_eq!(outcome.generation(), 0);
    for report in outcome.workers() {
        assert_eq!(report.local_generations(), 0);
    }

    // Islands are evaluated during initialization, so a best may already exist
    if let Some(best) = outcome.best() {
        assert!(best.is_feasible());
    }

    Ok(())
}
