mod common;

use anyhow::Result;
use common::{Reply, ScriptedLlm, TestServer};
use reqwest::{Method, StatusCode};
use serde_json::json;

#[tokio::test]
async fn health_reports_backends() -> Result<()> {
    let server = TestServer::start().await?;
    let (status, body) = server.request(Method::GET, "/health", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "memory");
    assert_eq!(body["llm"], "configured");

    let bare = TestServer::builder().without_database().without_llm().start().await?;
    let (status, body) = bare.request(Method::GET, "/health", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"], "not_configured");
    assert_eq!(body["llm"], "not_configured");

    let (status, routes) = bare.request(Method::GET, "/", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert!(routes.is_object());
    Ok(())
}

#[tokio::test]
async fn admin_dashboard_is_gated_by_email() -> Result<()> {
    let llm = ScriptedLlm::new(Reply::text("<p>ok</p>").tokens(1_000_000, 200_000));
    let server = TestServer::builder().llm(llm).start().await?;

    let writer = server.user();
    let (status, _) = server.post("/api/expand", &writer, json!({ "text": "grow" })).await?;
    assert_eq!(status, StatusCode::OK);
    server.wait_for_usage(&writer, 1).await?;

    let (status, body) = server.request(Method::GET, "/api/admin/usage", None, None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", body);

    let nosy = server.user_with_email(Some("someone@example.com"));
    let (status, body) = server.get("/api/admin/usage", &nosy).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Admin access required");

    let admin = server.user_with_email(Some("Admin@CopyWorx.io"));
    let (status, body) = server.get("/api/admin/usage", &admin).await?;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["totalUsers"], 1);
    assert_eq!(body["usersOverLimit"], 1);
    assert_eq!(body["users"][0]["userId"], json!(writer.id));
    assert_eq!(body["users"][0]["totalCost"], 6.0);
    assert_eq!(body["users"][0]["isOverLimit"], true);
    Ok(())
}
