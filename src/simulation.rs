use async_stream::stream;
use futures::stream::Stream;
use futures::stream::StreamExt;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tandem_dme::{Engine, EngineConfigBuilder, NodeId};
use tandem_net::{link_pair, pump, ChannelSink};
use tracing::{info, warn};

/// Per-node outcome of a contention run
#[derive(Clone, Debug, Default)]
pub struct NodeStats {
    pub node: u32,
    pub grants: usize,
    pub timeouts: usize,
    pub waits: Vec<Duration>,
}

impl NodeStats {
    fn mean_wait(&self) -> Duration {
        if self.waits.is_empty() {
            Duration::ZERO
        } else {
            self.waits.iter().sum::<Duration>() / self.waits.len() as u32
        }
    }

    fn max_wait(&self) -> Duration {
        self.waits.iter().copied().max().unwrap_or(Duration::ZERO)
    }
}

/// Statistics collected during a contention run
#[derive(Clone, Debug)]
pub struct SimulationStats {
    pub rounds_per_node: usize,
    pub max_think: Duration,
    pub hold: Duration,
    pub nodes: Vec<NodeStats>,
    /// Times a node entered while the other was already inside.
    pub violations: usize,
    pub total_time: Duration,
}

impl SimulationStats {
    pub fn total_grants(&self) -> usize {
        self.nodes.iter().map(|n| n.grants).sum()
    }

    pub fn print(&self) {
        println!("\n╔════════════════════════════════════════════════════════════╗");
        println!("║              Contention Statistics                          ║");
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║  Rounds per Node:           {:>30} ║", self.rounds_per_node);
        println!("║  Max Think Time:            {:>28}µs ║", self.max_think.as_micros());
        println!("║  Hold Time:                 {:>28}µs ║", self.hold.as_micros());
        for node in &self.nodes {
            println!("╟────────────────────────────────────────────────────────────╢");
            println!("║  Node {:<3} Grants:           {:>30} ║", node.node, node.grants);
            println!("║  Node {:<3} Timeouts:         {:>30} ║", node.node, node.timeouts);
            println!(
                "║  Node {:<3} Mean Wait:        {:>28}µs ║",
                node.node,
                node.mean_wait().as_micros()
            );
            println!(
                "║  Node {:<3} Max Wait:         {:>28}µs ║",
                node.node,
                node.max_wait().as_micros()
            );
        }
        println!("╟────────────────────────────────────────────────────────────╢");
        println!("║  Exclusion Violations:      {:>30} ║", self.violations);
        println!(
            "║  Total Time:                {:>29}s ║",
            format!("{:.3}", self.total_time.as_secs_f64())
        );
        println!("╚════════════════════════════════════════════════════════════╝");
    }
}

/// Generator that yields the pause before each acquire
fn think_time_generator(seed: u64, rounds: usize, max_think: Duration) -> impl Stream<Item = Duration> {
    stream! {
        let mut rng = StdRng::seed_from_u64(seed);
        let max_us = max_think.as_micros() as u64;
        for _ in 0..rounds {
            yield Duration::from_micros(if max_us == 0 { 0 } else { rng.gen_range(0..=max_us) });
        }
    }
}

fn linked_engines(timeout: Duration) -> Result<[Arc<Engine<ChannelSink>>; 2], tandem_dme::DmeError> {
    let (end_a, end_b) = link_pair();
    let (sink_a, inbound_a) = end_a.split();
    let (sink_b, inbound_b) = end_b.split();

    let a = Arc::new(Engine::new(
        EngineConfigBuilder::new()
            .self_id(1)
            .peer_id(2)
            .acquire_timeout(timeout)
            .build(),
        sink_a,
    )?);
    let b = Arc::new(Engine::new(
        EngineConfigBuilder::new()
            .self_id(2)
            .peer_id(1)
            .acquire_timeout(timeout)
            .build(),
        sink_b,
    )?);
    pump(inbound_a, a.clone());
    pump(inbound_b, b.clone());
    Ok([a, b])
}

/// One node's loop: think, acquire, hold, release.
async fn contend(
    engine: Arc<Engine<ChannelSink>>,
    occupancy: Arc<AtomicUsize>,
    violations: Arc<AtomicUsize>,
    rounds: usize,
    max_think: Duration,
    hold: Duration,
) -> NodeStats {
    let NodeId(node) = engine.self_id();
    let mut stats = NodeStats {
        node,
        ..NodeStats::default()
    };
    let mut thinks = Box::pin(think_time_generator(node as u64, rounds, max_think));

    while let Some(think) = thinks.next().await {
        tokio::time::sleep(think).await;

        let started = Instant::now();
        if let Err(e) = engine.acquire().await {
            warn!(node, error = %e, "acquire failed");
            stats.timeouts += 1;
            continue;
        }
        stats.waits.push(started.elapsed());
        stats.grants += 1;

        if occupancy.fetch_add(1, Ordering::SeqCst) != 0 {
            warn!(node, "entered while the other node was inside");
            violations.fetch_add(1, Ordering::SeqCst);
        }
        tokio::time::sleep(hold).await;
        occupancy.fetch_sub(1, Ordering::SeqCst);

        engine.release();

        if stats.grants % 100 == 0 {
            println!("  Node {} grants: {}/{}", node, stats.grants, rounds);
        }
    }
    stats
}

/// Two engines over an in-memory link, both hammering the critical section
pub async fn run_contention(
    rounds_per_node: usize,
    max_think: Duration,
    hold: Duration,
) -> Result<SimulationStats, tandem_dme::DmeError> {
    println!("\n╔════════════════════════════════════════════════════════════╗");
    println!("║        Ricart-Agrawala Contention (2 nodes, in-memory)      ║");
    println!(
        "║  Rounds/Node: {} | Think ≤ {}µs | Hold: {}µs ║",
        rounds_per_node,
        max_think.as_micros(),
        hold.as_micros()
    );
    println!("╚════════════════════════════════════════════════════════════╝");

    let start = Instant::now();
    let engines = linked_engines(Duration::from_secs(10))?;
    let occupancy = Arc::new(AtomicUsize::new(0));
    let violations = Arc::new(AtomicUsize::new(0));

    let mut handles = vec![];
    for engine in &engines {
        handles.push(tokio::spawn(contend(
            Arc::clone(engine),
            Arc::clone(&occupancy),
            Arc::clone(&violations),
            rounds_per_node,
            max_think,
            hold,
        )));
    }

    let mut nodes = vec![];
    for handle in handles {
        match handle.await {
            Ok(stats) => nodes.push(stats),
            Err(e) => warn!(error = %e, "contention task failed"),
        }
    }

    let stats = SimulationStats {
        rounds_per_node,
        max_think,
        hold,
        nodes,
        violations: violations.load(Ordering::SeqCst),
        total_time: start.elapsed(),
    };
    info!(
        grants = stats.total_grants(),
        violations = stats.violations,
        elapsed_ms = stats.total_time.as_millis() as u64,
        "contention run finished"
    );
    Ok(stats)
}

/// Repeat the run with shrinking think time, i.e. growing contention
pub async fn contention_sweep(
    rounds_per_node: usize,
    think_times: &[Duration],
) -> Result<Vec<SimulationStats>, tandem_dme::DmeError> {
    println!("\n╔════════════════════════════════════════════════════════════╗");
    println!("║      Contention Sweep - Wait Time vs Think Time             ║");
    println!("╚════════════════════════════════════════════════════════════╝");

    let mut runs = vec![];
    for &max_think in think_times {
        let stats = run_contention(rounds_per_node, max_think, Duration::from_micros(50)).await?;
        stats.print();
        runs.push(stats);
    }
    Ok(runs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_contention_has_no_violations() {
        let stats = run_contention(50, Duration::from_micros(200), Duration::from_micros(20))
            .await
            .unwrap();

        assert_eq!(stats.violations, 0);
        assert_eq!(stats.total_grants(), 100);
        assert!(stats.nodes.iter().all(|n| n.timeouts == 0));
    }

    #[tokio::test]
    async fn test_think_times_stay_in_range() {
        let max = Duration::from_micros(300);
        let thinks: Vec<Duration> = think_time_generator(3, 40, max).collect().await;
        assert_eq!(thinks.len(), 40);
        assert!(thinks.iter().all(|t| *t <= max));

        let zero: Vec<Duration> = think_time_generator(3, 5, Duration::ZERO).collect().await;
        assert!(zero.iter().all(|t| t.is_zero()));
    }
}
