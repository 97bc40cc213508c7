use actix_web::http::header::ContentType;
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpResponse, HttpServer};
use log::{info, warn};
use serde_json::json;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Mutex;

mod config;
mod error;
mod middleware;
mod models;
mod store;

use error::CartError;
use models::{ClearedCart, ProductPayload};
use store::{CartStore, SharedStore};

/// The document served at `/`.
#[derive(Debug, Clone)]
struct IndexPage(String);

impl IndexPage {
    const BUILTIN: &'static str = include_str!("../static/index.html");

    fn builtin() -> Self {
        IndexPage(Self::BUILTIN.to_string())
    }

    fn load(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::builtin();
        };
        match fs::read_to_string(path) {
            Ok(html) => {
                info!("serving UI from {}", path.display());
                IndexPage(html)
            }
            Err(e) => {
                warn!("cannot read UI page {}: {}; using built-in page", path.display(), e);
                Self::builtin()
            }
        }
    }
}

fn parse_payload(body: &[u8]) -> Result<ProductPayload, CartError> {
    ProductPayload::from_body(body).map_err(|e| {
        warn!("rejected product body: {}", e);
        CartError::from(e)
    })
}

fn not_found(id: &str) -> CartError {
    warn!("product {} not in cart", id);
    CartError::NotFound
}

async fn index(page: web::Data<IndexPage>) -> HttpResponse {
    HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(page.0.clone())
}

async fn add_product(store: web::Data<SharedStore>, body: web::Bytes) -> Result<HttpResponse, CartError> {
    let payload = parse_payload(&body)?;
    let product = store::acquire(&store)?.upsert(payload);
    Ok(HttpResponse::Ok().json(product))
}

async fn list_products(store: web::Data<SharedStore>) -> Result<HttpResponse, CartError> {
    let store = store::acquire(&store)?;
    Ok(HttpResponse::Ok().json(store.products()))
}

async fn get_product(store: web::Data<SharedStore>, id: web::Path<String>) -> Result<HttpResponse, CartError> {
    let store = store::acquire(&store)?;
    match store.product(&id) {
        Ok(product) => Ok(HttpResponse::Ok().json(product)),
        Err(CartError::NotFound) => Err(not_found(&id)),
        Err(e) => Err(e),
    }
}

async fn delete_product(store: web::Data<SharedStore>, id: web::Path<String>) -> Result<HttpResponse, CartError> {
    store::acquire(&store)?.remove(&id);
    Ok(HttpResponse::Ok().json(json!({ "ok": true })))
}

async fn update_product(
    store: web::Data<SharedStore>,
    id: web::Path<String>,
    body: web::Bytes,
) -> Result<HttpResponse, CartError> {
    let patch = parse_payload(&body)?;
    match store::acquire(&store)?.update(&id, patch) {
        Ok(product) => Ok(HttpResponse::Ok().json(product)),
        Err(CartError::NotFound) => Err(not_found(&id)),
        Err(e) => Err(e),
    }
}

async fn checkout(store: web::Data<SharedStore>) -> Result<HttpResponse, CartError> {
    let order = store::acquire(&store)?.checkout();
    Ok(HttpResponse::Ok().json(order))
}

async fn list_orders(store: web::Data<SharedStore>) -> Result<HttpResponse, CartError> {
    let store = store::acquire(&store)?;
    Ok(HttpResponse::Ok().json(store.orders()))
}

async fn clear_cart(store: web::Data<SharedStore>) -> Result<HttpResponse, CartError> {
    store::acquire(&store)?.clear();
    Ok(HttpResponse::Ok().json(ClearedCart {
        success: true,
        message: "Cart cleared",
        cart: Vec::new(),
    }))
}

fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(index))
        .service(
            web::resource("/product")
                .route(web::post().to(add_product))
                .route(web::get().to(list_products)),
        )
        .service(
            web::resource("/product/{id}")
                .route(web::get().to(get_product))
                .route(web::delete().to(delete_product))
                .route(web::post().to(update_product)),
        )
        .service(
            web::resource("/checkout")
                .route(web::post().to(checkout))
                .route(web::get().to(list_orders)),
        )
        .route("/cart", web::delete().to(clear_cart));
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok(); // Load environment variables from .env file
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = config::Config::from_env().map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    // One store for the whole process, shared by every worker
    let store = web::Data::new(Mutex::new(CartStore::new()));
    let page = web::Data::new(IndexPage::load(config.ui_index.as_deref()));

    info!("checkout api listening on {}:{}", config.host, config.port);
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(middleware::cors())
            .app_data(store.clone())
            .app_data(page.clone())
            .configure(routes)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
