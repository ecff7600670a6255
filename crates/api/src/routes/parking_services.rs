//! Parking service handlers and the streaming parking import.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use domain::models::activity_log::entity;
use domain::models::{
    ActivityAction, CreateParkingServiceRequest, ImportKind, ImportRequest, ParkingService,
    PartnerQuery, Permission, UpdateParkingServiceRequest,
};
use domain::services::ActivityLogBuilder;
use persistence::repositories::{ActivityLogRepository, ParkingServiceRepository};
use shared::pagination::{PageRequest, Paginated};
use tokio::sync::mpsc;
use tokio_stream::{wrappers::UnboundedReceiverStream, Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{ApiJson, ApiQuery, UserAuth};
use crate::routes::imports::record_import;
use crate::services::import::{ChannelProgress, ImportEvent};

const DUPLICATE_NAME: &str = "A parking service with this name already exists";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_parking_services).post(create_parking_service))
        .route("/:id", get(get_parking_service).patch(update_parking_service))
}

/// The streaming import, mounted with the import rate limit.
pub fn import_router() -> Router<AppState> {
    Router::new().route("/api/parking-services/import", post(import_parking))
}

/// GET /api/parking-services
async fn list_parking_services(
    State(state): State<AppState>,
    user: UserAuth,
    ApiQuery(query): ApiQuery<PartnerQuery>,
) -> Result<Json<Paginated<ParkingService>>, ApiError> {
    user.require(Permission::ViewContracts)?;

    let page = PageRequest::new(query.page, query.limit);
    let (services, total) = ParkingServiceRepository::new(state.pool.clone())
        .list(&query, page)
        .await?;
    Ok(Json(Paginated::new(services, page, total)))
}

/// GET /api/parking-services/:id
async fn get_parking_service(
    State(state): State<AppState>,
    user: UserAuth,
    Path(id): Path<Uuid>,
) -> Result<Json<ParkingService>, ApiError> {
    user.require(Permission::ViewContracts)?;

    let service = ParkingServiceRepository::new(state.pool.clone())
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Parking service not found".to_string()))?;
    Ok(Json(service))
}

/// POST /api/parking-services
async fn create_parking_service(
    State(state): State<AppState>,
    user: UserAuth,
    ApiJson(request): ApiJson<CreateParkingServiceRequest>,
) -> Result<(StatusCode, Json<ParkingService>), ApiError> {
    user.require(Permission::ManagePartners)?;
    request.validate()?;

    let service = ParkingServiceRepository::new(state.pool.clone())
        .create(&request)
        .await
        .map_err(ApiError::on_unique(DUPLICATE_NAME))?;

    ActivityLogRepository::new(state.pool.clone()).record(
        ActivityLogBuilder::user_action(user.user_id, ActivityAction::CreateParkingService)
            .on_entity(entity::PARKING_SERVICE, service.id)
            .with_details(format!("Created parking service {}", service.name))
            .build(),
    );
    Ok((StatusCode::CREATED, Json(service)))
}

/// PATCH /api/parking-services/:id
async fn update_parking_service(
    State(state): State<AppState>,
    user: UserAuth,
    Path(id): Path<Uuid>,
    ApiJson(request): ApiJson<UpdateParkingServiceRequest>,
) -> Result<Json<ParkingService>, ApiError> {
    user.require(Permission::ManagePartners)?;
    request.validate()?;

    let service = ParkingServiceRepository::new(state.pool.clone())
        .update(id, &request)
        .await
        .map_err(ApiError::on_unique(DUPLICATE_NAME))?
        .ok_or_else(|| ApiError::NotFound("Parking service not found".to_string()))?;

    ActivityLogRepository::new(state.pool.clone()).record(
        ActivityLogBuilder::user_action(user.user_id, ActivityAction::UpdateParkingService)
            .on_entity(entity::PARKING_SERVICE, service.id)
            .build(),
    );
    Ok(Json(service))
}

/// Import a parking report, streaming progress as server-sent events.
///
/// POST /api/parking-services/import
///
/// The import runs in a background task. When the client disconnects the
/// event stream is dropped, which cancels the task.
async fn import_parking(
    State(state): State<AppState>,
    user: UserAuth,
    ApiJson(request): ApiJson<ImportRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    user.require(Permission::ImportServices)?;
    request.validate()?;

    let (tx, rx) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();
    let guard = cancel.clone().drop_guard();

    info!(user_id = %user.user_id, file = %request.uploaded_file_path, "Parking import started");
    tokio::spawn(run_parking_import(
        state,
        user,
        request.uploaded_file_path,
        ChannelProgress::new(tx),
        cancel,
    ));

    let stream = UnboundedReceiverStream::new(rx).map(move |event: ImportEvent| {
        let _stream_owns = &guard;
        Ok(event.to_sse())
    });
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

async fn run_parking_import(
    state: AppState,
    user: UserAuth,
    uploaded_file_path: String,
    progress: ChannelProgress,
    cancel: CancellationToken,
) {
    let result = state
        .importer
        .run(
            ImportKind::Parking,
            &uploaded_file_path,
            None,
            Arc::new(progress.clone()),
            cancel,
        )
        .await;

    match result {
        Ok(outcome) => {
            record_import(
                &state,
                &user,
                ActivityAction::ImportParkingServices,
                entity::PARKING_SERVICE,
                &outcome.file_name,
                &outcome.report,
            );
            progress.send(ImportEvent::Complete(outcome.report));
        }
        Err(err) => {
            warn!(error = %err, file = %uploaded_file_path, "Parking import failed");
            progress.send(ImportEvent::Error {
                message: err.to_string(),
            });
        }
    }
}
