use crate::actix_web::{
    web::{Data, Json},
    HttpResponse,
};
use crate::config::Config;
use crate::core::models::poll::{PollCreate, PollSummary};
use crate::core::ports::repository::Store;
use crate::core::services::poll as service;
use crate::error::Error;
use crate::handlers::{base_url, logged};
use crate::response::List;

pub async fn create<S>(Json(body): Json<PollCreate>, store: Data<S>, config: Data<Config>) -> Result<HttpResponse, Error>
where
    S: Store + 'static,
{
    let created = service::create_poll(store.get_ref(), base_url(&config), body).await.map_err(logged)?;
    Ok(HttpResponse::Created().json(created))
}

pub async fn list<S>(store: Data<S>, config: Data<Config>) -> Result<Json<List<PollSummary>>, Error>
where
    S: Store + 'static,
{
    let polls = service::list_polls(store.get_ref(), base_url(&config)).await.map_err(logged)?;
    Ok(Json(List::from(polls)))
}
