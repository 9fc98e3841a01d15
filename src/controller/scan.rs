use actix_web::{delete, get, http::StatusCode, post, web::{Data, Json, Path, ServiceConfig, scope}};
use hscn::{ScanJob, ScanRequest, ScanStarted, WorkerService};
use serde::Serialize;

use crate::{error::{ApiError, ServiceError}, misc::responder::{ApiResult, Response}};

#[derive(Serialize)]
struct CancelResult {
    status: &'static str,
}

#[post("")]
async fn start_scan(request: Json<ScanRequest>, service: Data<WorkerService>) -> ApiResult<ScanStarted> {
    let request = request.into_inner();
    let scan_id = service.runner().start_job(request.hosts, request.protocol).await
        .map_err(|err| ApiError(StatusCode::BAD_REQUEST, err.msg))?;
    Ok(Response(ScanStarted {
        scan_id,
        status: "started".to_owned(),
    }))
}

#[get("/{scan_id}")]
async fn get_scan(scan_id: Path<String>, service: Data<WorkerService>) -> ApiResult<ScanJob> {
    let job = service.registry().snapshot(&scan_id).await
        .ok_or(ServiceError::DataNotFound)?;
    Ok(Response(job))
}

#[delete("/{scan_id}")]
async fn cancel_scan(scan_id: Path<String>, service: Data<WorkerService>) -> ApiResult<CancelResult> {
    service.runner().cancel_job(&scan_id).await
        .ok_or(ServiceError::DataNotFound)?;
    Ok(Response(CancelResult { status: "cancelled" }))
}

pub fn config(cfg: &mut ServiceConfig) {
    cfg.service(scope("/scan")
        .service(start_scan)
        .service(get_scan)
        .service(cancel_scan)
    );
}
