use actix_web::{get, web::{Data, ServiceConfig, scope}};
use hscn::{ScanStatsReport, SystemStats, WorkerService};
use serde::Serialize;

use crate::misc::responder::{ApiResult, Response};

#[derive(Serialize)]
struct NodeStats {
    system: SystemStats,
    scanner: ScanStatsReport,
}

#[get("/all")]
async fn get_stats(service: Data<WorkerService>) -> ApiResult<NodeStats> {
    Ok(Response(NodeStats {
        system: service.sys_stats().await,
        scanner: service.scan_stats().await,
    }))
}

pub fn config(cfg: &mut ServiceConfig) {
    cfg.service(scope("/stats")
        .service(get_stats)
    );
}

#[cfg(test)]
mod test {
    use actix_web::{App, test, web::Data};
    use hscn::WorkerService;
    use serde_json::Value;

    #[actix_web::test]
    async fn test_stats_endpoint() {
        let service = WorkerService::start().unwrap();
        let app = test::init_service(
            App::new()
                .app_data(Data::new(service))
                .configure(crate::controller::config)
        ).await;

        let request = test::TestRequest::get().uri("/api/stats/all").to_request();
        let stats: Value = test::call_and_read_body_json(&app, request).await;
        assert!(stats["system"]["total_memory_kb"].is_u64());
        assert_eq!(0, stats["scanner"]["jobs_started"]);
    }
}
