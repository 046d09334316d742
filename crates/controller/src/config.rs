use crate::service;
use crate::service::domain::onelink::PgHandleLookup;
use crate::service::domain::page::PgProfileStore;

use database::db::{new_postgres_pool, PostgresPool};
use middleware::OnelinkAuth;
use page_builder::handle::{DEFAULT_DEBOUNCE, DEFAULT_MIN_LENGTH};
use page_builder::CheckerConfig;

use actix_web::web;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 8080;

pub struct ApiContext {
    pub app_db: PostgresPool,
    pub store: Arc<PgProfileStore>,
    pub lookup: PgHandleLookup,
    pub handle_rules: CheckerConfig,
}

impl ApiContext {
    pub fn new(app_db: PostgresPool, handle_rules: CheckerConfig) -> Self {
        ApiContext {
            store: Arc::new(PgProfileStore::new(app_db.clone())),
            lookup: PgHandleLookup::new(app_db.clone()),
            app_db,
            handle_rules,
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            log::warn!("env {} = {:?} cannot be parsed, using default", key, raw);
            default
        }),
        Err(_) => default,
    }
}

pub fn config_port() -> u16 {
    env_or("PORT", DEFAULT_PORT)
}

pub fn config_handle_rules() -> CheckerConfig {
    CheckerConfig {
        min_length: env_or("HANDLE_MIN_LENGTH", DEFAULT_MIN_LENGTH),
        debounce: Duration::from_millis(env_or(
            "HANDLE_DEBOUNCE_MS",
            DEFAULT_DEBOUNCE.as_millis() as u64,
        )),
    }
}

pub fn new_api_context() -> Result<ApiContext, database::error::Error> {
    let app_db = new_postgres_pool("DATABASE_URL")?;
    Ok(ApiContext::new(app_db, config_handle_rules()))
}

pub fn config_cors() -> actix_cors::Cors {
    actix_cors::Cors::default()
        .allow_any_origin()
        .allow_any_method()
        .allow_any_header()
}

pub fn config_service(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .service(
                service::page::routers(web::scope("/pages"))
                    .wrap(OnelinkAuth::build("/api/v1/pages/")),
            )
            .service(service::onelink::routers(web::scope("/onelinks")))
            .service(service::schema::routers(web::scope("/schema"))),
    );
}
