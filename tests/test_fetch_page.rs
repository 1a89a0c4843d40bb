use std::net::{SocketAddr, TcpListener};

use axum::{http::StatusCode, response::Html, routing::get, Router};
use url::Url;

use opstools::{
    errors::{ErrorLayer, ToolError},
    scrape::{extract_attribute, fetch_page},
};

const PAGE: &str = r#"<ul><li><a href="/wiki/Recife">Recife</a></li></ul>"#;

fn spawn_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.set_nonblocking(true).unwrap();
    let addr = listener.local_addr().unwrap();

    let app = Router::new()
        .route("/page", get(|| async { Html(PAGE) }))
        .route("/overloaded", get(|| async { StatusCode::SERVICE_UNAVAILABLE }))
        .route("/gone", get(|| async { StatusCode::GONE }));
    let server = axum::Server::from_tcp(listener)
        .unwrap()
        .serve(app.into_make_service());
    tokio::spawn(server);
    addr
}

fn url(addr: SocketAddr, path: &str) -> Url {
    Url::parse(&format!("http://{}{}", addr, path)).unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn fetched_page_feeds_extraction() {
    let addr = spawn_server();
    let html = fetch_page(url(addr, "/page")).await.unwrap();
    assert_eq!(
        extract_attribute(&html, "ul > li > a", "href").unwrap(),
        vec!["/wiki/Recife".to_string()]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn server_errors_are_transient() {
    let addr = spawn_server();
    let err = fetch_page(url(addr, "/overloaded")).await.unwrap_err();
    assert!(matches!(err, ToolError::TransientProblem(_)));
    assert_eq!(err.layer(), ErrorLayer::ExternalLayer);
}

#[tokio::test(flavor = "multi_thread")]
async fn other_failures_are_sticky() {
    let addr = spawn_server();
    for path in ["/gone", "/no-such-page"] {
        let err = fetch_page(url(addr, path)).await.unwrap_err();
        assert!(matches!(err, ToolError::StickyProblem(_)), "{}", path);
        assert_eq!(err.layer(), ErrorLayer::ExternalLayer);
    }
}
