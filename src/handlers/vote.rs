use crate::actix_web::{
    web::{Data, Json, Path},
    HttpResponse,
};
use crate::config::Config;
use crate::core::models::{poll::PollView, response::Submit, result::PollResults};
use crate::core::ports::repository::Store;
use crate::core::services::{result::poll_results, vote as service};
use crate::error::Error;
use crate::handlers::{base_url, logged};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    message: &'static str,
}

pub async fn detail<S>(unique_id: Path<(String,)>, store: Data<S>, config: Data<Config>) -> Result<Json<PollView>, Error>
where
    S: Store + 'static,
{
    let unique_id = unique_id.into_inner().0;
    let view = service::poll_view(store.get_ref(), base_url(&config), &unique_id).await.map_err(logged)?;
    Ok(Json(view))
}

pub async fn submit<S>(unique_id: Path<(String,)>, Json(body): Json<Submit>, store: Data<S>) -> Result<HttpResponse, Error>
where
    S: Store + 'static,
{
    let unique_id = unique_id.into_inner().0;
    service::submit_response(store.get_ref(), &unique_id, body).await.map_err(logged)?;
    Ok(HttpResponse::Created().json(SubmitResponse {
        message: "Your vote has been recorded!",
    }))
}

pub async fn results<S>(unique_id: Path<(String,)>, store: Data<S>) -> Result<Json<PollResults>, Error>
where
    S: Store + 'static,
{
    let unique_id = unique_id.into_inner().0;
    let results = poll_results(store.get_ref(), &unique_id).await.map_err(logged)?;
    Ok(Json(results))
}
