use actix_utils::future::{ready, Ready};
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::{Method, StatusCode};
use actix_web::Error;
use futures_util::future::LocalBoxFuture;
use page_builder::{is_equivalent_onelink, normalize_handle};

pub const AUTH_HEADER: &str = "onelink-auth";

#[derive(Debug, thiserror::Error)]
pub enum MiddlewareError {
    #[error("UnAuthorized")]
    UnAuthorized {},

    #[error("BadRequest")]
    BadRequest {},
}

impl actix_web::ResponseError for MiddlewareError {
    fn status_code(&self) -> StatusCode {
        match self {
            MiddlewareError::UnAuthorized {} => StatusCode::UNAUTHORIZED,
            MiddlewareError::BadRequest {} => StatusCode::BAD_REQUEST,
        }
    }
}

/// Only the owner of a onelink may change its page.
///
/// The onelink is the first path segment after `prefix`; the caller's handle
/// comes from the `onelink-auth` header. Reads and click tracking pass through.
pub struct OnelinkAuth {
    prefix: &'static str,
}

impl OnelinkAuth {
    pub fn build(prefix: &'static str) -> Self {
        Self { prefix }
    }
}

impl<S, B> Transform<S, ServiceRequest> for OnelinkAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = OnelinkAuthMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(OnelinkAuthMiddleware {
            service,
            prefix: self.prefix,
        }))
    }
}

pub struct OnelinkAuthMiddleware<S> {
    service: S,
    prefix: &'static str,
}

/// Reads, and click tracking on `{onelink}/blocks/{id}/clicks`.
fn is_public(req: &ServiceRequest, prefix: &str) -> bool {
    if req.method() == Method::GET {
        return true;
    }
    if req.method() != Method::POST {
        return false;
    }

    let segments: Vec<&str> = req
        .path()
        .strip_prefix(prefix)
        .unwrap_or_default()
        .trim_end_matches('/')
        .split('/')
        .collect();
    matches!(segments.as_slice(), [onelink, "blocks", id, "clicks"] if !onelink.is_empty() && !id.is_empty())
}

impl<S, B> Service<ServiceRequest> for OnelinkAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    actix_service::forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if is_public(&req, self.prefix) {
            let fut = self.service.call(req);
            return Box::pin(async move { fut.await });
        }

        let claimed = req
            .headers()
            .get(AUTH_HEADER)
            .map(|s| s.to_str().unwrap_or_default().to_string())
            .unwrap_or_default();

        let onelink = req
            .path()
            .strip_prefix(self.prefix)
            .unwrap_or_default()
            .split('/')
            .take(1)
            .collect::<String>();

        if onelink.is_empty() {
            return Box::pin(async move { Err(Error::from(MiddlewareError::BadRequest {})) });
        }

        if normalize_handle(&claimed).is_empty() || !is_equivalent_onelink(&claimed, &onelink) {
            log::debug!("reject {} {}: not the owner", req.method(), req.path());
            return Box::pin(async move { Err(Error::from(MiddlewareError::UnAuthorized {})) });
        }

        let fut = self.service.call(req);

        Box::pin(async move { fut.await })
    }
}

#[cfg(test)]
mod onelink_auth {
    use super::*;
    use actix_web::{test, web, App, HttpResponse};

    const PREFIX: &str = "/api/v1/pages/";

    async fn ok() -> HttpResponse {
        HttpResponse::Ok().finish()
    }

    async fn status_of(req: test::TestRequest) -> StatusCode {
        let app = test::init_service(
            App::new().service(
                web::scope("/api/v1/pages")
                    .wrap(OnelinkAuth::build(PREFIX))
                    .route("/{onelink}", web::get().to(ok))
                    .route("/{onelink}", web::post().to(ok))
                    .route("/{onelink}/blocks", web::post().to(ok))
                    .route("/{onelink}/blocks/{id}/clicks", web::post().to(ok)),
            ),
        )
        .await;

        match app.call(req.to_request()).await {
            Ok(res) => res.status(),
            Err(e) => e.as_response_error().status_code(),
        }
    }

    #[actix_rt::test]
    async fn test_reads_are_public() {
        let req = test::TestRequest::get().uri("/api/v1/pages/alice");
        assert_eq!(status_of(req).await, StatusCode::OK);

        let req = test::TestRequest::post().uri("/api/v1/pages/alice/blocks/1/clicks");
        assert_eq!(status_of(req).await, StatusCode::OK);
    }

    #[actix_rt::test]
    async fn test_owner_may_write() {
        let req = test::TestRequest::post()
            .uri("/api/v1/pages/alice/blocks")
            .insert_header((AUTH_HEADER, "@alice"));
        assert_eq!(status_of(req).await, StatusCode::OK);
    }

    #[actix_rt::test]
    async fn test_others_may_not_write() {
        let req = test::TestRequest::post()
            .uri("/api/v1/pages/alice/blocks")
            .insert_header((AUTH_HEADER, "Alice"));
        assert_eq!(status_of(req).await, StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::post().uri("/api/v1/pages/alice/blocks");
        assert_eq!(status_of(req).await, StatusCode::UNAUTHORIZED);
    }

    #[actix_rt::test]
    async fn test_only_block_clicks_skip_auth() {
        let req = test::TestRequest::post().uri("/api/v1/pages/clicks");
        assert_eq!(status_of(req).await, StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::post()
            .uri("/api/v1/pages/clicks")
            .insert_header((AUTH_HEADER, "clicks"));
        assert_eq!(status_of(req).await, StatusCode::OK);

        let req = test::TestRequest::post().uri("/api/v1/pages/alice/blocks/clicks");
        assert_eq!(status_of(req).await, StatusCode::UNAUTHORIZED);
    }
}
