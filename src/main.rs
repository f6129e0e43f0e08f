extern crate actix_files;
extern crate actix_web;
extern crate chrono;
extern crate dotenv;
extern crate env_logger;
extern crate itertools;
extern crate reqwest;
extern crate serde;
extern crate serde_json;
extern crate thiserror;
extern crate tokio;
extern crate uuid;

mod config;
mod core;
mod error;
mod handlers;
mod impls;
mod response;
mod setup;

use actix_files::Files;
use actix_web::web::Data;
use actix_web::{middleware::Logger, App, HttpServer};
use crate::config::{Backend, Config, SetupConfig};
use crate::core::ports::repository::Store;
use crate::impls::store::{baserow::BaserowStore, memory::MemoryStore};
use log::{info, warn};

async fn serve<S>(store: S, config: Config) -> std::io::Result<()>
where
    S: Store + Send + Sync + 'static,
{
    let address = (config.bind_addr.clone(), config.port);
    info!("listening on {}:{}, share links start with {}", address.0, address.1, config.public_base_url);
    let store = Data::new(store);
    let config = Data::new(config);
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(store.clone())
            .app_data(config.clone())
            .configure(handlers::routes::<S>)
            .service(Files::new("/", &config.static_dir).index_file("index.html"))
    })
    .bind(address)?
    .run()
    .await
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info,actix_web=info")).init();

    if std::env::args().nth(1).as_deref() == Some("setup") {
        return setup::run(SetupConfig::from_env()?).await;
    }

    let config = Config::from_env()?;
    match (&config.backend, &config.baserow) {
        (Backend::Baserow, Some(baserow)) => {
            let store = BaserowStore::new(baserow)?;
            serve(store, config).await?;
        }
        _ => {
            warn!("using the in-memory store, polls are lost on restart");
            serve(MemoryStore::new(), config).await?;
        }
    }
    Ok(())
}
