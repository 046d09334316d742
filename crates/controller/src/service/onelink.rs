use crate::config::ApiContext;
use crate::service::Error;

use page_builder::handle::{check_handle_format, AvailabilityResponse};
use page_builder::{normalize_handle, HandleLookup};

use actix_web::{
    get,
    web::{self, Data},
    Responder,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HandleRules {
    pub min_length: usize,
    pub debounce_ms: u64,
    pub allowed: &'static str,
}

/// Rules a client-side checker should mirror.
#[get("/rules")]
async fn handle_rules(context: Data<ApiContext>) -> impl Responder {
    web::Json(HandleRules {
        min_length: context.handle_rules.min_length,
        debounce_ms: context.handle_rules.debounce.as_millis() as u64,
        allowed: "[a-zA-Z0-9_-]",
    })
}

#[get("/{handle}/available")]
async fn is_available(
    context: Data<ApiContext>,
    handle: web::Path<String>,
) -> Result<impl Responder, Error> {
    let handle = normalize_handle(&handle.into_inner());
    check_handle_format(&handle, context.handle_rules.min_length).map_err(|status| {
        Error::InvalidParams {
            msg: format!("handle {:?}: {:?}", handle, status),
        }
    })?;

    let available = context.lookup.is_available(&handle).await?;

    Ok(web::Json(AvailabilityResponse { handle, available }))
}

pub fn routers(scope: actix_web::Scope) -> actix_web::Scope {
    scope.service(handle_rules).service(is_available)
}
