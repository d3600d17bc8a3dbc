mod common;

use anyhow::Result;
use reqwest::{Method, StatusCode};

#[tokio::test]
async fn health_endpoint_responds() -> Result<()> {
    let server = common::TestServer::start().await?;

    let res = server.anon(Method::GET, "/health").send().await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["success"], true, "unexpected body: {}", body);
    assert_eq!(body["data"]["status"], "healthy");
    assert_eq!(body["data"]["service"], "Notes API");
    assert!(body["data"]["timestamp"].as_str().unwrap_or_default().ends_with('Z'));
    Ok(())
}

#[tokio::test]
async fn root_lists_endpoints_without_auth() -> Result<()> {
    let server = common::TestServer::start().await?;

    let res = server.anon(Method::GET, "/").send().await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["data"]["version"], env!("CARGO_PKG_VERSION"));
    assert!(body["data"]["endpoints"]["notes"].is_string(), "missing endpoints: {}", body);
    Ok(())
}

#[tokio::test]
async fn unknown_route_gets_error_envelope() -> Result<()> {
    let server = common::TestServer::start().await?;

    let res = server.anon(Method::GET, "/api/unknown").send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["success"], false);
    assert_eq!(body["statusCode"], 404);
    assert!(body["errorMessage"].is_string());
    assert!(body["details"].is_null());
    Ok(())
}

#[tokio::test]
async fn unsupported_method_gets_error_envelope() -> Result<()> {
    let server = common::TestServer::start().await?;

    let res = server.anon(Method::DELETE, "/health").send().await?;
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);

    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["statusCode"], 405);
    Ok(())
}
