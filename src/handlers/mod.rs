pub mod poll;
pub mod vote;

use crate::config::Config;
use crate::core::ports::repository::Store;
use crate::error::Error;
use actix_web::web::{get, post, scope, JsonConfig, ServiceConfig};
use log::error;

pub fn routes<S>(cfg: &mut ServiceConfig)
where
    S: Store + 'static,
{
    cfg.service(
        scope("api").app_data(json_config()).service(
            scope("polls")
                .route("", get().to(poll::list::<S>))
                .route("", post().to(poll::create::<S>))
                .service(
                    scope("{unique_id}")
                        .route("", get().to(vote::detail::<S>))
                        .route("responses", post().to(vote::submit::<S>))
                        .route("results", get().to(vote::results::<S>)),
                ),
        ),
    );
}

/// Malformed request bodies get the same JSON error body as a failed validation.
fn json_config() -> JsonConfig {
    JsonConfig::default().error_handler(|err, _| Error::Validation(err.to_string()).into())
}

/// Store failures are only reported once, here at the request boundary.
fn logged(e: Error) -> Error {
    if e.is_store_failure() {
        error!("store call failed: {}", e);
    }
    e
}

fn base_url(config: &Config) -> &str {
    &config.public_base_url
}
