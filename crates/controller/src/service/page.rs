use crate::config::ApiContext;
use crate::service::{
    domain::{page, Response},
    Error,
};

use page_builder::handle::check_handle_format;
use page_builder::{
    normalize_handle, render_stored, Block, BlockId, EditorSession, ProfileStore, RenderedUnit,
    Theme, ThemePatch,
};

use actix_web::{
    delete, get, patch, post, put,
    web::{self, Data},
    HttpResponse, Responder,
};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct PositionBody {
    pub index: usize,
}

#[derive(Debug, Serialize)]
pub struct RenderedPage {
    pub onelink: String,
    pub theme: Theme,
    pub units: Vec<RenderedUnit>,
}

/// Splits `{ "type": .., ...fields }` into the type tag and the field map.
fn split_type(mut body: Map<String, Value>) -> Result<(String, Map<String, Value>), Error> {
    let type_tag = body
        .remove("type")
        .and_then(|t| t.as_str().map(str::to_string))
        .ok_or_else(|| Error::InvalidParams {
            msg: "type is required".to_string(),
        })?;
    Ok((type_tag, body))
}

#[post("/{onelink}")]
async fn claim_page(
    context: Data<ApiContext>,
    onelink: web::Path<String>,
) -> Result<impl Responder, Error> {
    let onelink = normalize_handle(&onelink.into_inner());
    check_handle_format(&onelink, context.handle_rules.min_length).map_err(|status| {
        Error::InvalidParams {
            msg: format!("onelink {:?}: {:?}", onelink, status),
        }
    })?;

    let page = page::claim_onelink(&context.app_db, &onelink).await?;
    log::info!("onelink {} claimed", onelink);

    Ok(web::Json(page))
}

#[get("/{onelink}")]
async fn get_page(
    context: Data<ApiContext>,
    onelink: web::Path<String>,
) -> Result<impl Responder, Error> {
    let onelink = normalize_handle(&onelink.into_inner());
    let page = context.store.load(&onelink).await?;
    Ok(web::Json(page))
}

#[get("/{onelink}/render")]
async fn render_page(
    context: Data<ApiContext>,
    onelink: web::Path<String>,
) -> Result<impl Responder, Error> {
    let onelink = normalize_handle(&onelink.into_inner());
    let page = context.store.load(&onelink).await?;
    let units = render_stored(&page.blocks, &page.theme);

    Ok(web::Json(RenderedPage {
        onelink: page.onelink,
        theme: page.theme,
        units,
    }))
}

#[post("/{onelink}/blocks")]
async fn add_block(
    context: Data<ApiContext>,
    onelink: web::Path<String>,
    body: web::Json<Map<String, Value>>,
) -> Result<impl Responder, Error> {
    let onelink = normalize_handle(&onelink.into_inner());
    let (type_tag, fields) = split_type(body.into_inner())?;

    let (_, block) = EditorSession::edit(context.store.clone(), &onelink, |session| {
        session.add_block(&type_tag, fields.clone()).map(Block::clone)
    })
    .await?;

    Ok(web::Json(block))
}

#[patch("/{onelink}/blocks/{id}")]
async fn update_block(
    context: Data<ApiContext>,
    path: web::Path<(String, BlockId)>,
    body: web::Json<Map<String, Value>>,
) -> Result<impl Responder, Error> {
    let (onelink, id) = path.into_inner();
    let onelink = normalize_handle(&onelink);

    let patch = body.into_inner();

    let (_, block) = EditorSession::edit(context.store.clone(), &onelink, |session| {
        session.update_block(id, patch.clone()).map(Block::clone)
    })
    .await?;

    Ok(web::Json(block))
}

#[delete("/{onelink}/blocks/{id}")]
async fn remove_block(
    context: Data<ApiContext>,
    path: web::Path<(String, BlockId)>,
) -> Result<impl Responder, Error> {
    let (onelink, id) = path.into_inner();
    let onelink = normalize_handle(&onelink);

    EditorSession::edit(context.store.clone(), &onelink, |session| {
        session.remove_block(id)
    })
    .await?;

    Ok(HttpResponse::Ok())
}

#[put("/{onelink}/blocks/{id}/position")]
async fn reorder_block(
    context: Data<ApiContext>,
    path: web::Path<(String, BlockId)>,
    body: web::Json<PositionBody>,
) -> Result<impl Responder, Error> {
    let (onelink, id) = path.into_inner();
    let onelink = normalize_handle(&onelink);

    let (session, _) = EditorSession::edit(context.store.clone(), &onelink, |session| {
        session.reorder(id, body.index)
    })
    .await?;

    Ok(web::Json(session.stored_blocks()))
}

#[patch("/{onelink}/theme")]
async fn update_theme(
    context: Data<ApiContext>,
    onelink: web::Path<String>,
    body: web::Json<ThemePatch>,
) -> Result<impl Responder, Error> {
    let onelink = normalize_handle(&onelink.into_inner());

    let patch = body.into_inner();

    // Only the theme column is written.
    let (_, theme) = EditorSession::edit(context.store.clone(), &onelink, |session| {
        Ok(session.apply_theme(&patch).clone())
    })
    .await?;

    Ok(web::Json(theme))
}

#[post("/{onelink}/blocks/{id}/clicks")]
async fn record_click(
    context: Data<ApiContext>,
    path: web::Path<(String, BlockId)>,
) -> Result<impl Responder, Error> {
    let (onelink, id) = path.into_inner();
    let onelink = normalize_handle(&onelink);

    let page = context.store.load(&onelink).await?;
    if !page.blocks.iter().any(|b| b.id == id) {
        return Err(Error::NotFound {
            msg: format!("block {} not on page {}", id, onelink),
        });
    }

    page::record_click(&context.app_db, &onelink, id).await?;
    Ok(HttpResponse::Ok())
}

#[get("/{onelink}/clicks")]
async fn click_counts(
    context: Data<ApiContext>,
    onelink: web::Path<String>,
) -> Result<impl Responder, Error> {
    let onelink = normalize_handle(&onelink.into_inner());
    let counts = page::get_click_counts(&context.app_db, &onelink).await?;

    Ok(web::Json(Response::new(
        counts.len() as i64,
        counts,
        None,
        None,
    )))
}

pub fn routers(scope: actix_web::Scope) -> actix_web::Scope {
    scope
        .service(claim_page)
        .service(get_page)
        .service(render_page)
        .service(add_block)
        .service(update_block)
        .service(remove_block)
        .service(reorder_block)
        .service(update_theme)
        .service(record_click)
        .service(click_counts)
}
