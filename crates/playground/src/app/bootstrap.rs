use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_SCENARIO: &str = "throw_demo.json";

pub(crate) struct AppWiring {
    pub(crate) scenario_name: String,
}

pub(crate) fn build_app() -> AppWiring {
    init_tracing();
    info!("=== Grab Lab Startup ===");

    AppWiring {
        scenario_name: scenario_name_from_args(std::env::args().skip(1)),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn scenario_name_from_args(mut args: impl Iterator<Item = String>) -> String {
    args.next()
        .map(|raw| raw.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| DEFAULT_SCENARIO.to_string())
}
