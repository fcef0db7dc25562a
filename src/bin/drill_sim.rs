//! Simulated learner driving the drill engine end to end.
//!
//! Environment:
//! - `LOG_LEVEL` (default `info`)
//! - `DRILL_SIM_TRIALS` number of trials (default 2000)
//! - `DRILL_SIM_SNAPSHOT` optional path the final snapshot is written to
//! - `DRILL_*` engine overrides, see `EngineConfig::from_env`

use std::collections::HashMap;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use pitchset_drill::logging::init_tracing;
use pitchset_drill::{Constraints, EngineConfig, ShapeKey, Trainer};

/// Learner whose chance of a right answer grows with exposure to a shape
struct SimLearner {
    exposures: HashMap<ShapeKey, u32>,
    rng: ChaCha8Rng,
}

impl SimLearner {
    fn new(seed: u64) -> Self {
        Self {
            exposures: HashMap::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    fn answer(&mut self, offsets: &[i32]) -> String {
        let seen = self.exposures.entry(ShapeKey::encode(offsets)).or_insert(0);
        let p_correct = (0.2 + 0.08 * *seen as f64).min(0.95);
        *seen += 1;

        let mut guess = offsets.to_vec();
        if !self.rng.gen_bool(p_correct) {
            // confuse the top note by a semitone
            if let Some(last) = guess.last_mut() {
                *last += if self.rng.gen_bool(0.5) { 1 } else { -1 };
            }
        }
        guess
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn main() {
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let _log_guard = init_tracing(&log_level);

    let config = EngineConfig::from_env();
    let trials: usize = std::env::var("DRILL_SIM_TRIALS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(2000);
    let learner_seed = config.seed.unwrap_or(7);

    let mut trainer = match Trainer::new(config, Constraints::default()) {
        Ok(trainer) => trainer,
        Err(err) => {
            tracing::error!(error = %err, "invalid engine configuration");
            std::process::exit(1);
        }
    };
    let mut learner = SimLearner::new(learner_seed);

    tracing::info!(universe = trainer.universe().len(), trials, "simulation started");

    for n in 1..=trials {
        let Some(trial) = trainer.request_trial() else {
            tracing::warn!("no trial available, stopping");
            break;
        };
        let answer = learner.answer(trial.shape.offsets());
        let submission = trainer.submit(&answer);

        if n % 250 == 0 {
            if let Some(feedback) = submission.feedback {
                tracing::info!(
                    trial = n,
                    mastered = feedback.aggregate.mastered_count,
                    universe = feedback.aggregate.universe_size,
                    minimum = feedback.minimum_correct,
                    overall = feedback.overall_percent,
                    "progress"
                );
            }
        }
    }

    let aggregate = trainer.aggregate();
    tracing::info!(
        mastered = aggregate.mastered_count,
        universe = aggregate.universe_size,
        approximate = aggregate.is_approximate,
        "simulation finished"
    );

    if let Ok(path) = std::env::var("DRILL_SIM_SNAPSHOT") {
        let written = trainer
            .snapshot()
            .to_json()
            .map_err(|e| e.to_string())
            .and_then(|json| std::fs::write(&path, json).map_err(|e| e.to_string()));
        match written {
            Ok(()) => tracing::info!(%path, "snapshot written"),
            Err(err) => tracing::error!(%path, error = %err, "failed to write snapshot"),
        }
    }
}
