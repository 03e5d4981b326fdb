use simulation::{contention_sweep, run_contention};
use std::time::Duration;
pub mod simulation;

fn main() {
    tandem_dme::telemetry::init_tracing();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to start runtime: {}", e);
            std::process::exit(1);
        }
    };
    let violations = match rt.block_on(async_main()) {
        Ok(violations) => violations,
        Err(e) => {
            eprintln!("simulation failed: {}", e);
            std::process::exit(1);
        }
    };

    if violations > 0 {
        eprintln!("\n✗ {} mutual exclusion violations", violations);
        std::process::exit(2);
    }
    println!("\n✓ All contention runs completed without overlap!");
}

async fn async_main() -> Result<usize, tandem_dme::DmeError> {
    println!("\n\n╔════════════════════════════════════════════════════════════╗");
    println!("║            TWO-NODE CONTENTION SIMULATION                   ║");
    println!("╚════════════════════════════════════════════════════════════╝");

    let mut violations = 0;

    // Light contention: long think, short hold
    let stats = run_contention(200, Duration::from_millis(2), Duration::from_micros(100)).await?;
    stats.print();
    violations += stats.violations;

    // Heavy contention: both nodes request back to back
    let stats = run_contention(500, Duration::ZERO, Duration::from_micros(10)).await?;
    stats.print();
    violations += stats.violations;

    let sweep = contention_sweep(
        200,
        &[
            Duration::from_millis(1),
            Duration::from_micros(250),
            Duration::from_micros(50),
        ],
    )
    .await?;
    violations += sweep.iter().map(|s| s.violations).sum::<usize>();

    Ok(violations)
}
