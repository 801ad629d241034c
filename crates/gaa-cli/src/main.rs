use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use gaa_core::{BioSignals, GaaConfig, GaaEngine};
use gaa_field::{CollectiveField, LockDetector, ParticipantId, ParticipantSnapshot};
use gaa_presets::{BuiltinCatalog, MemoryCache, PresetManager};

#[derive(Parser)]
#[command(name = "gaa")]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulated solo session and print safety alerts.
    Session {
        /// Preset to load.
        #[arg(long, default_value = "deep-theta")]
        preset: String,
        /// Simulated session length in seconds.
        #[arg(long, default_value_t = 30)]
        seconds: u32,
    },
    /// List presets passing the TriLaw gate.
    Presets {},
    /// Simulate a multi-node session and print the collective field.
    Lock {
        /// Number of participating nodes.
        #[arg(long, default_value_t = 12)]
        nodes: usize,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Commands::Session { preset, seconds } => run_session(&preset, seconds).await?,
        Commands::Presets {} => list_presets().await?,
        Commands::Lock { nodes } => run_lock_demo(nodes),
    }
    Ok(())
}

async fn run_session(preset_id: &str, seconds: u32) -> Result<(), Box<dyn std::error::Error>> {
    let manager = PresetManager::new(MemoryCache::new(), BuiltinCatalog);
    manager.initialize("demo-user").await?;

    let outcome = manager.load_preset(preset_id).await;
    let Some(preset) = outcome.preset else {
        println!(
            "cannot load preset {}: {}",
            preset_id,
            outcome.message.unwrap_or_default()
        );
        return Ok(());
    };
    info!(preset = %preset.id, "starting session");

    let mut engine = GaaEngine::new(GaaConfig::default())?;
    engine.configure_session(
        preset.audio_profile.fundamental_hz,
        preset.audio_profile.amplitude,
        preset.audio_profile.target_bpm,
    );
    engine.safety_mut().on_alert(|alert| {
        println!(
            "[alert] {} {:?}: {}",
            alert.category.name(),
            alert.severity,
            alert.message
        );
    });

    engine.start(0);
    let tick_us: i64 = 16_000;
    let ticks = (seconds as i64 * 1_000_000) / tick_us;
    let mut buffer = vec![0.0f32; 256];
    for n in 1..=ticks {
        let ts = n * tick_us;
        let t_sec = ts as f32 / 1_000_000.0;
        let signals = BioSignals {
            breath: (t_sec * 0.1 * std::f32::consts::TAU).sin(),
            hrv: 55.0,
            eeg_band_ratio: 0.6,
        };
        engine.render(&mut buffer);
        engine.control_tick(ts, &signals)?;
    }
    engine.stop();
    let mut ts = ticks * tick_us;
    while engine.oscillators().active_count() > 0 {
        ts += tick_us;
        engine.control_tick(ts, &BioSignals::default())?;
    }

    let status = engine.safety().status();
    println!(
        "session {} finished: state={}, safety={:?}, alerts-seen={}",
        engine.session_id(),
        engine.state().name(),
        status.level,
        engine.safety().history().count()
    );
    Ok(())
}

async fn list_presets() -> Result<(), Box<dyn std::error::Error>> {
    let manager = PresetManager::new(MemoryCache::new(), BuiltinCatalog);
    manager.initialize("demo-user").await?;
    for preset in manager.accessible_presets().await {
        println!(
            "{:<16} {:<18} f0={:>6.1} Hz  bpm={:<4.1} evidence: {}",
            preset.id,
            preset.name,
            preset.audio_profile.fundamental_hz,
            preset.audio_profile.target_bpm,
            preset.evidence
        );
    }
    Ok(())
}

fn run_lock_demo(node_count: usize) {
    let mut nodes: Vec<LockDetector> = (0..node_count)
        .map(|i| {
            // Half the nodes cluster near 110 Hz, the rest spread out.
            let base = if i % 2 == 0 {
                110.0 * (1.0 + 0.002 * i as f32)
            } else {
                300.0 + 40.0 * i as f32
            };
            LockDetector::with_defaults(base)
        })
        .collect();

    let mut field = CollectiveField::new();
    for step in 0..20i64 {
        let ts = step * 100_000;
        let lattices: Vec<Vec<f32>> = nodes
            .iter()
            .map(|n| n.lattice().frequencies.clone())
            .collect();
        for (i, node) in nodes.iter_mut().enumerate() {
            let external: Vec<f32> = lattices
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .flat_map(|(_, l)| l.iter().copied())
                .collect();
            node.detect_lock(&external, ts);
            let snap =
                ParticipantSnapshot::capture(ParticipantId::new_from_str(format!("node-{}", i)), node, 0.0, ts);
            field.update_participant(snap.id.clone(), snap.state);
        }
    }

    let summary = field.summary();
    println!(
        "nodes={} global-coherence={:.3} regional-coherence={:.3} glow={:.3}",
        summary.node_count,
        summary.global_coherence,
        summary.regional_coherence,
        field.shared_glow()
    );
    for (i, node) in nodes.iter().enumerate() {
        println!(
            "node-{:<3} base={:>8.1} Hz locked={:<5} gain={:.3}",
            i,
            node.lattice().base_hz,
            node.is_locked(),
            node.gain()
        );
    }
}
