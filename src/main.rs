use faculty_scheduler::config::SchedulingConfig;
use faculty_scheduler::server;
use log::{error, info};

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match std::env::var("SCHEDULER_CONFIG") {
        Ok(path) => match SchedulingConfig::from_file(&path) {
            Ok(config) => {
                info!("Loaded configuration from {path}");
                config
            }
            Err(e) => {
                error!("{e}");
                std::process::exit(1);
            }
        },
        Err(_) => SchedulingConfig::default(),
    };
    let addr = std::env::var("SCHEDULER_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());

    if let Err(e) = server::run_server(&addr, config).await {
        error!("Server stopped: {e}");
        std::process::exit(1);
    }
}
