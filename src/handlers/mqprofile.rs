use axum::extract::{Extension, Path, State};
use futures::TryStreamExt;
use serde::Serialize;

use crate::database::{Document, Filter, Lookup, MqProfileClient, Projection, MQPROFILE_KEY};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::schema::RequestArgs;

#[derive(Debug, Serialize)]
pub struct MqProfileList {
    pub mqprofiles: Vec<Document>,
}

/// GET /{version}/mq-profiles/{mqid} - one profile by id (WMS only)
pub async fn get(
    State(client): State<MqProfileClient>,
    Path(mqid): Path<String>,
) -> ApiResult<Document> {
    let filter = Filter::new().eq(MQPROFILE_KEY, mqid.as_str());

    match client.find_one(&filter).await? {
        Lookup::Found(mqprofile) => Ok(ApiResponse::success(mqprofile)),
        Lookup::NotFound => {
            tracing::debug!("MQProfile '{}' not found", mqid);
            Err(ApiError::not_found("MQProfile not found"))
        }
    }
}

/// GET /{version}/mq-profiles/public/activated - activated, public profiles of one workflow
pub async fn get_public_activated(
    State(client): State<MqProfileClient>,
    Extension(args): Extension<RequestArgs>,
) -> ApiResult<MqProfileList> {
    // Already required by the validation gate
    let workflow_id = args
        .get_argument("workflow_id")
        .ok_or_else(|| ApiError::bad_request("Missing argument workflow_id"))?;

    let filter = Filter::new()
        .eq("workflow_id", workflow_id)
        .eq("is_public", true)
        .eq("is_active", true);
    let projection = Projection::new(args.get_arguments("projection").iter().cloned());

    let mqprofiles: Vec<Document> = client.find_all(&filter, &projection).try_collect().await?;

    tracing::debug!(
        "Found {} active public MQProfile(s) for workflow '{}'",
        mqprofiles.len(),
        workflow_id
    );
    Ok(ApiResponse::success(MqProfileList { mqprofiles }))
}
