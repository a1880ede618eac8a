pub mod pages;
pub mod session;

use crate::application::{DashboardUseCase, LoadReportUseCase};
use crate::domain::error::{AppError, Result};
use crate::domain::report::{ViewDefaults, ViewOptions};
use crate::infrastructure::charts::ChartRenderer;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::export::export_file_name;
use actix_cors::Cors;
use actix_web::cookie::{Cookie, SameSite};
use actix_web::error::BlockingError;
use actix_web::http::header::{self, ContentType};
use actix_web::{
    dev::Server, get, post, web, App, HttpRequest, HttpResponse, HttpResponseBuilder, HttpServer,
    Responder,
};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use self::pages::{dashboard_page, landing_page};
use self::session::{SessionStore, SESSION_COOKIE};

const LOG_CAPACITY: usize = 100;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LogEntry {
    pub time: String,
    pub level: String,
    pub source: String,
    pub message: String,
}

pub struct HttpState {
    pub load_use_case: LoadReportUseCase,
    pub dashboard_use_case: DashboardUseCase,
    pub sessions: SessionStore,
    pub view_defaults: ViewDefaults,
    pub logs: Arc<Mutex<Vec<LogEntry>>>,
}

impl HttpState {
    pub fn new(config: &AppConfig, logs: Arc<Mutex<Vec<LogEntry>>>) -> Self {
        Self {
            load_use_case: LoadReportUseCase::new(config.cache_capacity),
            dashboard_use_case: DashboardUseCase::new(ChartRenderer::new(
                config.chart_width,
                config.chart_height,
            )),
            sessions: SessionStore::new(config.session_capacity),
            view_defaults: config.view_defaults(),
            logs,
        }
    }
}

#[derive(Deserialize)]
pub struct UploadQuery {
    #[serde(default)]
    pub filename: Option<String>,
}

#[get("/")]
async fn index(
    req: HttpRequest,
    data: web::Data<HttpState>,
    query: web::Query<Vec<(String, String)>>,
) -> impl Responder {
    let Some(report) = session_id(&req).and_then(|id| data.sessions.get(&id)) else {
        return html(HttpResponse::Ok(), landing_page(None));
    };

    let pairs = query.into_inner();
    let view = ViewOptions::from_query(report.format, &report.table, data.view_defaults, &pairs);
    let active_tab = pairs
        .iter()
        .rev()
        .find(|(key, _)| key == "tab")
        .and_then(|(_, value)| value.parse::<usize>().ok())
        .unwrap_or(0);

    let state = data.clone();
    let source = report.clone();
    let built = web::block(move || state.dashboard_use_case.build(&source, &view)).await;

    match flatten(built) {
        Ok(dashboard) => {
            tracing::debug!(
                file = %report.file_name,
                tabs = dashboard.tabs.len(),
                charts = dashboard.chart_count(),
                "Dashboard rendered"
            );
            let errors = dashboard.error_count();
            if errors > 0 {
                add_log(
                    &data.logs,
                    "WARN",
                    "Dashboard",
                    &format!("{} section(s) of {} failed to render", errors, report.file_name),
                );
            }
            html(HttpResponse::Ok(), dashboard_page(&report, &dashboard, active_tab))
        }
        Err(e) => {
            add_log(
                &data.logs,
                "ERROR",
                "Dashboard",
                &format!("Dashboard build failed: {}", e),
            );
            html(
                HttpResponse::InternalServerError(),
                landing_page(Some(e.message())),
            )
        }
    }
}

#[post("/upload")]
async fn upload(
    req: HttpRequest,
    data: web::Data<HttpState>,
    query: web::Query<UploadQuery>,
    body: web::Bytes,
) -> impl Responder {
    let file_name = query
        .filename
        .clone()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| "upload.csv".to_string());
    let (session, is_new) = match session_id(&req) {
        Some(id) => (id, false),
        None => (Uuid::new_v4(), true),
    };

    add_log(
        &data.logs,
        "INFO",
        "HttpApi",
        &format!("Upload received: {} ({} bytes)", file_name, body.len()),
    );

    let state = data.clone();
    let name = file_name.clone();
    let loaded = web::block(move || state.load_use_case.execute(&name, &body, &state.logs)).await;

    match flatten(loaded) {
        Ok(report) => {
            data.sessions.set(session, report);
            let mut builder = HttpResponse::SeeOther();
            with_session_cookie(&mut builder, session, is_new);
            builder.insert_header((header::LOCATION, "/")).finish()
        }
        Err(e) => {
            data.sessions.remove(&session);
            add_log(
                &data.logs,
                "ERROR",
                "HttpApi",
                &format!("Upload of {} failed: {}", file_name, e),
            );
            let mut builder = HttpResponse::BadRequest();
            with_session_cookie(&mut builder, session, is_new);
            html(builder, landing_page(Some(e.message())))
        }
    }
}

#[post("/reset")]
async fn reset(req: HttpRequest, data: web::Data<HttpState>) -> impl Responder {
    if let Some(id) = session_id(&req) {
        if data.sessions.remove(&id) {
            add_log(&data.logs, "INFO", "HttpApi", "Session report discarded");
        }
    }
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, "/"))
        .finish()
}

#[get("/download.csv")]
async fn download_csv(req: HttpRequest, data: web::Data<HttpState>) -> impl Responder {
    let Some(report) = session_id(&req).and_then(|id| data.sessions.get(&id)) else {
        return HttpResponse::NotFound().body("Kein Bericht geladen");
    };

    match report.table.to_csv() {
        Ok(csv) => HttpResponse::Ok()
            .content_type("text/csv; charset=utf-8")
            .insert_header((
                header::CONTENT_DISPOSITION,
                format!(
                    "attachment; filename=\"{}\"",
                    export_file_name(&report.file_name)
                ),
            ))
            .body(csv),
        Err(e) => {
            add_log(
                &data.logs,
                "ERROR",
                "HttpApi",
                &format!("CSV export failed: {}", e),
            );
            HttpResponse::InternalServerError().body(e.to_string())
        }
    }
}

#[get("/logs")]
async fn get_logs(data: web::Data<HttpState>) -> impl Responder {
    let logs = data.logs.lock().unwrap_or_else(|e| e.into_inner());
    HttpResponse::Ok().json(&*logs)
}

#[get("/health")]
async fn health() -> impl Responder {
    HttpResponse::Ok().body("ok")
}

fn session_id(req: &HttpRequest) -> Option<Uuid> {
    req.cookie(SESSION_COOKIE)
        .and_then(|cookie| Uuid::parse_str(cookie.value()).ok())
}

fn with_session_cookie(builder: &mut HttpResponseBuilder, id: Uuid, is_new: bool) {
    if is_new {
        builder.cookie(
            Cookie::build(SESSION_COOKIE, id.to_string())
                .path("/")
                .http_only(true)
                .same_site(SameSite::Lax)
                .finish(),
        );
    }
}

fn html(mut builder: HttpResponseBuilder, body: String) -> HttpResponse {
    builder.content_type(ContentType::html()).body(body)
}

fn flatten<T>(outcome: std::result::Result<Result<T>, BlockingError>) -> Result<T> {
    outcome.map_err(|e| AppError::Internal(e.to_string()))?
}

pub fn add_log_entry(
    logs: &Mutex<Vec<LogEntry>>,
    level: &str,
    source: &str,
    message: &str,
) -> LogEntry {
    let entry = LogEntry {
        time: Local::now().format("%H:%M:%S").to_string(),
        level: level.to_string(),
        source: source.to_string(),
        message: message.to_string(),
    };
    let mut logs = logs.lock().unwrap_or_else(|e| e.into_inner());
    logs.push(entry.clone());
    if logs.len() > LOG_CAPACITY {
        logs.remove(0);
    }
    entry
}

/// Record in the activity log and forward to tracing
pub fn add_log(logs: &Mutex<Vec<LogEntry>>, level: &str, source: &str, message: &str) {
    match level {
        "ERROR" => tracing::error!(source = source, "{}", message),
        "WARN" => tracing::warn!(source = source, "{}", message),
        "DEBUG" => tracing::debug!(source = source, "{}", message),
        _ => tracing::info!(source = source, "{}", message),
    }
    add_log_entry(logs, level, source, message);
}

/// Routes shared by the server and the handler tests
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(index)
        .service(upload)
        .service(reset)
        .service(download_csv)
        .service(health)
        .service(
            web::scope("/api")
                .wrap(Cors::permissive()) // Allow all origins for local tool
                .service(get_logs),
        );
}

pub fn start_server(config: &AppConfig, logs: Arc<Mutex<Vec<LogEntry>>>) -> std::io::Result<Server> {
    let state = web::Data::new(HttpState::new(config, logs));
    let max_upload_bytes = config.max_upload_bytes;

    let server = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .app_data(web::PayloadConfig::new(max_upload_bytes))
            .configure(routes)
    })
    .bind((config.host.as_str(), config.port))?
    .run();

    Ok(server)
}
