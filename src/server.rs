use crate::config::SchedulingConfig;
use crate::data::ScheduleRequest;
use crate::report::ScheduleReport;
use crate::solver::{self, HighsSolver};
use axum::http::StatusCode;
use axum::{Json, Router, extract::State, routing::post};
use log::{debug, error, info};
use std::sync::Arc;

async fn solve_handler(
    State(defaults): State<Arc<SchedulingConfig>>,
    Json(request): Json<ScheduleRequest>,
) -> Result<Json<ScheduleReport>, (StatusCode, String)> {
    let config = request.config.unwrap_or_else(|| (*defaults).clone());
    let tables = request.tables;

    let joined = tokio::task::spawn_blocking(move || {
        let backend = HighsSolver::new(config.solver.clone());
        solver::solve(&tables, &config, &backend)
    })
    .await
    .map_err(|e| {
        error!("Solve task failed: {e}");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    match joined {
        Ok(run) => {
            let report = ScheduleReport::build(&run.entities, &run.result);
            for usage in &report.group_usage {
                debug!("{usage}");
            }
            Ok(Json(report))
        }
        Err(e) => Err((StatusCode::BAD_REQUEST, e.to_string())),
    }
}

pub fn router(defaults: SchedulingConfig) -> Router {
    Router::new()
        .route("/v1/schedule/solve", post(solve_handler))
        .with_state(Arc::new(defaults))
}

pub async fn run_server(addr: &str, defaults: SchedulingConfig) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server running at http://{}", listener.local_addr()?);
    axum::serve(listener, router(defaults)).await
}
