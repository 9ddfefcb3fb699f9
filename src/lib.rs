pub mod api;
pub mod auth;
pub mod config;
pub mod conversation;
pub mod db;
pub mod errors;
pub mod mail;
pub mod provider;
pub mod rag;
pub mod redis;
pub mod storage;
pub mod utils;

use rocket::{fairing::AdHoc, get};
use rocket_okapi::{mount_endpoints_and_merged_docs, openapi, openapi_get_routes_spec};

use crate::{
    auth::{setup_encryption, setup_jwt},
    config::{get_config_provider, AppConfig},
    db::setup_db,
    errors::get_catchers,
    provider::setup_providers,
    redis::setup_redis,
    storage::setup_storage,
};

/// Build the rocket server, load configuration and routes, prepare for launch
pub fn build_rocket() -> rocket::Rocket<rocket::Build> {
    let mut server = rocket::custom(get_config_provider())
        .attach(AdHoc::config::<AppConfig>())
        .attach(setup_db())
        .attach(setup_redis())
        .attach(setup_encryption())
        .attach(setup_jwt())
        .attach(setup_providers())
        .attach(setup_storage())
        .register("/", get_catchers())
        .mount("/service/docs", get_doc_routes());

    let openapi_settings = rocket_okapi::settings::OpenApiSettings::default();
    mount_endpoints_and_merged_docs! {
        server, "/service", openapi_settings,
        "/" => openapi_get_routes_spec![health],
        "/user" => api::user_routes(&openapi_settings),
        "/tenant" => api::tenant_routes(&openapi_settings),
        "/prompt" => api::prompt_routes(&openapi_settings),
        "/ai" => api::chat_routes(&openapi_settings),
    };

    server
}

/// Health route
#[openapi]
#[get("/health")]
async fn health() -> String {
    "OK".to_owned()
}

/// Create the OpenAPI doc routes
fn get_doc_routes() -> impl Into<Vec<rocket::Route>> {
    use rocket_okapi::{
        rapidoc::{make_rapidoc, GeneralConfig, Layout, LayoutConfig, RapiDocConfig, RenderStyle},
        settings::UrlObject,
    };

    make_rapidoc(&RapiDocConfig {
        general: GeneralConfig {
            spec_urls: vec![UrlObject::new("OpenAPI Schema", "/service/openapi.json")],
            ..Default::default()
        },
        layout: LayoutConfig {
            layout: Layout::Column,
            render_style: RenderStyle::View,
            ..Default::default()
        },
        ..Default::default()
    })
}
