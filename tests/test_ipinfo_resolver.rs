use std::net::{SocketAddr, TcpListener};

use axum::{extract::Path, http::StatusCode, routing::get, Json, Router};
use serde_json::{json, Value};

use opstools::{
    errors::ErrorLayer,
    geo::{
        aggregate, make_ipinfo_resolver, resolve_all, AggregateOptions, LocationAttributes,
        LocationResolver,
    },
    logging::init_logging,
};

/// A tiny stand-in for ipinfo.io with a fixed set of answers.
async fn lookup(Path(ip): Path<String>) -> Result<Json<Value>, StatusCode> {
    match ip.as_str() {
        "65.49.1.31" => Ok(Json(json!({
            "ip": "65.49.1.31",
            "city": "Fremont",
            "region": "California",
            "country": "US",
        }))),
        "185.191.126.213" => Ok(Json(json!({
            "ip": "185.191.126.213",
            "city": "Amsterdam",
            "region": "North Holland",
            "country": "NL",
        }))),
        "10.0.0.1" => Ok(Json(json!({ "ip": "10.0.0.1", "bogon": true }))),
        "1.2.3.4" => Err(StatusCode::INTERNAL_SERVER_ERROR),
        _ => Err(StatusCode::NOT_FOUND),
    }
}

fn spawn_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.set_nonblocking(true).unwrap();
    let addr = listener.local_addr().unwrap();

    let app = Router::new().route("/:ip/json", get(lookup));
    let server = axum::Server::from_tcp(listener)
        .unwrap()
        .serve(app.into_make_service());
    tokio::spawn(server);
    addr
}

#[tokio::test(flavor = "multi_thread")]
async fn resolves_and_aggregates_against_a_local_service() {
    init_logging();
    let addr = spawn_server();
    let resolver = make_ipinfo_resolver(&format!("http://{}/", addr)).unwrap();

    let ips: Vec<String> = ["65.49.1.31", "185.191.126.213", "10.0.0.1", "1.2.3.4", "65.49.1.31"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let records = resolve_all(&resolver, &ips).await;
    assert_eq!(records.len(), 5);

    let keys: Vec<String> = aggregate(&records, &AggregateOptions::default())
        .into_iter()
        .collect();
    insta::assert_json_snapshot!(keys, @r###"
    [
      "NL, North Holland, Amsterdam",
      "US, California, Fremont",
      "Unknown, Unknown, Unknown"
    ]
    "###);
}

#[tokio::test(flavor = "multi_thread")]
async fn lookup_distinguishes_server_and_client_failures() {
    let addr = spawn_server();
    let resolver = make_ipinfo_resolver(&format!("http://{}/", addr)).unwrap();

    let err = resolver.lookup("1.2.3.4").await.unwrap_err();
    assert_eq!(err.layer(), ErrorLayer::ExternalLayer);
    assert!(matches!(err, opstools::errors::ToolError::TransientProblem(_)));

    let err = resolver.lookup("8.8.8.8").await.unwrap_err();
    assert!(matches!(err, opstools::errors::ToolError::StickyProblem(_)));

    assert_eq!(resolver.resolve("8.8.8.8").await, LocationAttributes::unknown());
}

#[tokio::test(flavor = "multi_thread")]
async fn unreachable_service_files_everything_as_unknown() {
    // Grab a port and release it so nothing is listening there.
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let resolver = make_ipinfo_resolver(&format!("http://{}/", addr)).unwrap();

    let records = resolve_all(&resolver, &["65.49.1.31".to_string()]).await;
    assert_eq!(records[0].attributes, LocationAttributes::unknown());
}
