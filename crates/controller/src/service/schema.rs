use crate::service::Error;

use page_builder::schema;

use actix_web::{
    get,
    web::{self, Query},
    Responder,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct SchemaQueryParams {
    pub media_type: Option<String>,
}

#[get("/{type}")]
async fn block_schema(
    type_tag: web::Path<String>,
    params: Query<SchemaQueryParams>,
) -> Result<impl Responder, Error> {
    let descriptors = schema::descriptors(&type_tag.into_inner(), params.media_type.as_deref())?;
    Ok(web::Json(descriptors))
}

pub fn routers(scope: actix_web::Scope) -> actix_web::Scope {
    scope.service(block_schema)
}

#[cfg(test)]
mod schema_routes {
    use super::*;
    use actix_web::{http::StatusCode, test, App};

    #[actix_rt::test]
    async fn test_descriptors() {
        let app = test::init_service(App::new().service(routers(web::scope("/schema")))).await;

        let req = test::TestRequest::get().uri("/schema/pool").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body[0]["name"], "address");
        assert_eq!(body[0]["kind"], "pattern");
        assert_eq!(body[1]["name"], "label");

        let req = test::TestRequest::get()
            .uri("/schema/media?media_type=youtube")
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body[0]["values"], serde_json::json!(["youtube"]));
    }

    #[actix_rt::test]
    async fn test_unknown_type() {
        let app = test::init_service(App::new().service(routers(web::scope("/schema")))).await;

        for uri in ["/schema/carousel", "/schema/media?media_type=tiktok"] {
            let req = test::TestRequest::get().uri(uri).to_request();
            let res = test::call_service(&app, req).await;
            assert_eq!(res.status(), StatusCode::BAD_REQUEST, "{}", uri);
        }
    }
}
