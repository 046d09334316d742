use controller::config;

use actix_web::middleware::{Compress, Logger, NormalizePath};
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use env_logger::Env;
use std::io::{Error, ErrorKind};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let context =
        config::new_api_context().map_err(|e| Error::new(ErrorKind::Other, e.to_string()))?;
    database::db::run_migrations(&context.app_db)
        .await
        .map_err(|e| Error::new(ErrorKind::Other, e.to_string()))?;

    let context = Data::new(context);
    let port = config::config_port();
    log::info!("onelink api listening on 0.0.0.0:{}", port);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(NormalizePath::trim())
            .wrap(Compress::default())
            .wrap(config::config_cors())
            .app_data(context.clone())
            .configure(config::config_service)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
