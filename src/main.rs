use std::sync::Arc;

use rand::Rng;

use danci_proficiency::config::{Config, StoreKind};
use danci_proficiency::db::{MemoryStore, ProficiencyStore, SqliteStore};
use danci_proficiency::logging;
use danci_proficiency::proficiency::irt::probability_correct;
use danci_proficiency::proficiency::{
    CandidateItem, EngineConfig, ProficiencyRepository, SessionController, SessionSummary,
};

const DEMO_SKILL: &str = "fractions";
const DEMO_LEARNER: &str = "demo-learner";

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let config = Config::from_env();
    let _log_guard = logging::init_tracing(&config);

    let engine = match load_engine_config(&config) {
        Ok(engine) => engine,
        Err(err) => {
            tracing::error!(error = %err, "invalid engine configuration");
            std::process::exit(1);
        }
    };

    let true_theta = std::env::var("DEMO_TRUE_THETA")
        .ok()
        .and_then(|v| v.parse::<f64>().ok())
        .unwrap_or(1.8);

    let summary = match config.store {
        StoreKind::Memory => {
            let store = Arc::new(MemoryStore::new());
            run_demo_session(store, engine, true_theta).await
        }
        StoreKind::Sqlite => match SqliteStore::connect(&config.db_path).await {
            Ok(store) => {
                let store = Arc::new(store);
                let summary = run_demo_session(Arc::clone(&store), engine, true_theta).await;
                store.close().await;
                summary
            }
            Err(err) => {
                tracing::error!(error = %err, path = %config.db_path.display(), "failed to open store");
                std::process::exit(1);
            }
        },
    };

    match serde_json::to_string_pretty(&summary) {
        Ok(json) => println!("{json}"),
        Err(err) => tracing::error!(error = %err, "failed to render summary"),
    }
}

fn load_engine_config(config: &Config) -> Result<EngineConfig, danci_proficiency::proficiency::config::ConfigError> {
    match config.engine_config_path.as_deref() {
        Some(path) => EngineConfig::from_json_file(path),
        None => {
            let engine = EngineConfig::from_env();
            engine.validate()?;
            Ok(engine)
        }
    }
}

fn demo_catalog() -> Vec<CandidateItem> {
    let labels = ["easy", "medium", "hard"];
    (0..60)
        .map(|i| CandidateItem::new(format!("{DEMO_SKILL}-{i:03}"), DEMO_SKILL, labels[i % labels.len()]))
        .collect()
}

/// Plays a simulated learner of ability `true_theta` until the engine stops.
async fn run_demo_session<S: ProficiencyStore>(
    store: Arc<S>,
    engine: EngineConfig,
    true_theta: f64,
) -> SessionSummary {
    let repository = ProficiencyRepository::new(store, engine.estimator.clone());
    let mut session = SessionController::start(repository, engine, DEMO_LEARNER, DEMO_SKILL).await;
    let catalog = demo_catalog();
    let mut rng = rand::rng();

    loop {
        let decision = session.should_stop();
        if decision.stop {
            if let Some(reason) = decision.reason {
                tracing::info!(reason = %reason, "session stopped");
            }
            break;
        }
        if session.time_limit_reached() {
            tracing::info!("session time limit reached");
            break;
        }

        let Some(selection) = session.select_next_item(&catalog) else {
            break;
        };
        let p = probability_correct(true_theta, &selection.parameters);
        let correct = rng.random_bool(p);
        let update = session.record_answer(correct, &selection.parameters).await;

        tracing::info!(
            item_id = %selection.item.id,
            label = %selection.item.difficulty_label,
            correct,
            theta = update.new_theta,
            sigma = update.new_sigma,
            phase = update.phase.as_str(),
            "answered"
        );
    }

    session.finish()
}
