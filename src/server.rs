use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use tracing::info;

use crate::config::Config;
use crate::handlers;
use crate::predictor::{build_predictor, Predictor};

/// Shared, read-only state for every request.
pub struct AppState {
    pub predictor: Arc<dyn Predictor>,
}

impl AppState {
    pub fn new(predictor: Arc<dyn Predictor>) -> Self {
        Self { predictor }
    }
}

/// Registers the prediction routes.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/api/predict")
            .route(web::post().to(handlers::predict))
            .default_service(web::to(handlers::method_not_allowed)),
    )
    .service(web::resource("/health").route(web::get().to(handlers::health)));
}

pub async fn run(config: Config) -> anyhow::Result<()> {
    let predictor = build_predictor(&config.predictor)?;
    let state = web::Data::new(AppState::new(predictor));
    let allow_any_origin = config.server.allow_any_origin;

    info!("Server running at http://{}", config.server.bind);

    HttpServer::new(move || {
        let cors = if allow_any_origin {
            Cors::default()
                .allow_any_origin()
                .allow_any_method()
                .allow_any_header()
        } else {
            Cors::default()
        };

        App::new()
            .wrap(cors)
            .wrap(Logger::default())
            .app_data(state.clone())
            .configure(routes)
    })
    .bind(&config.server.bind)?
    .run()
    .await?;

    Ok(())
}
