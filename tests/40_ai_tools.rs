mod common;

use std::time::Duration;

use anyhow::Result;
use common::{Reply, ScriptedLlm, TestServer};
use copyworx_api::ai::html::uses_only_allowed_tags;
use reqwest::{Method, StatusCode};
use serde_json::json;

fn close(actual: &serde_json::Value, expected: f64) -> bool {
    actual.as_f64().map(|v| (v - expected).abs() < 1e-9).unwrap_or(false)
}

#[tokio::test]
async fn tone_shift_output_is_limited_to_the_allowed_tags() -> Result<()> {
    let llm = ScriptedLlm::new(Reply::text(
        "```html\n<h2>Big news</h2><div class=\"x\"><p>Hey <b>friend</b>, <script>alert(1)</script>check this out.</p></div>\n```",
    ));
    let server = TestServer::builder().llm(llm).start().await?;
    let user = server.user();

    let (status, body) = server
        .post("/api/tone-shift", &user, json!({ "text": "<p>Dear customer</p>", "tone": "casual" }))
        .await?;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["tone"], "casual");
    let html = body["rewrittenText"].as_str().unwrap();
    assert!(uses_only_allowed_tags(html), "disallowed tag survived: {}", html);
    assert!(html.starts_with("<h2>Big news</h2>"));
    assert!(html.contains("friend"));
    assert!(!html.contains("```"));
    Ok(())
}

#[tokio::test]
async fn text_tools_validate_their_input() -> Result<()> {
    let server = TestServer::start().await?;
    let user = server.user();

    let (status, _) = server
        .post("/api/tone-shift", &user, json!({ "text": "Hi", "tone": "sarcastic" }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = server.post("/api/shorten", &user, json!({ "text": "   " })).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = server.post("/api/expand", &user, json!({ "text": "x".repeat(10_000) })).await?;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = server.post("/api/expand", &user, json!({ "text": "x".repeat(10_001) })).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = server
        .post("/api/rewrite-channel", &user, json!({ "text": "Launch day", "channel": "linkedin" }))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["channel"], "linkedin");
    assert_eq!(body["rewrittenText"], "<p>Scripted copy</p>");

    let (status, _) = server
        .post("/api/rewrite-channel", &user, json!({ "text": "Launch day", "channel": "myspace" }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn usage_is_logged_and_priced() -> Result<()> {
    let llm = ScriptedLlm::new(Reply::text("<p>fallback</p>"))
        .queue(Reply::text("<p>One</p>").tokens(100, 50))
        .queue(Reply::text("<p>Two</p>").tokens(200, 150));
    let server = TestServer::builder().llm(llm).start().await?;
    let user = server.user();

    for tone in ["professional", "playful"] {
        let (status, _) = server
            .post("/api/tone-shift", &user, json!({ "text": "<p>Hello</p>", "tone": tone }))
            .await?;
        assert_eq!(status, StatusCode::OK);
    }

    let usage = server.wait_for_usage(&user, 2).await?;
    assert!(close(&usage["totalCost"], 0.0039), "{}", usage);
    assert!(close(&usage["percentUsed"], 0.078), "{}", usage);
    assert!(close(&usage["remainingBudget"], 4.9961), "{}", usage);
    assert_eq!(usage["isOverLimit"], false);
    assert_eq!(usage["totalTokens"], 500);
    assert_eq!(usage["currentMonth"]["totalCalls"], 2);

    // Someone else's meter is untouched
    let other = server.user();
    let (_, fresh) = server.get("/api/usage", &other).await?;
    assert_eq!(fresh["totalCalls"], 0);
    assert_eq!(fresh["remainingBudget"], 5.0);
    Ok(())
}

#[tokio::test]
async fn headlines_are_parsed_and_capped() -> Result<()> {
    let raw = "Here are your headlines:\n\nHOW-TO:\n1. How To Write Emails People Answer\n2. How To Double Your Reply Rate\n\nQUESTION:\n- Are Your Emails Being Ignored?\n- How To Write Emails People Answer\n✓ Uses curiosity";
    let server = TestServer::builder().llm(ScriptedLlm::new(Reply::text(raw))).start().await?;
    let user = server.user();

    let (status, body) = server.post("/api/headlines", &user, json!({ "text": "Cold email course" })).await?;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(
        body["headlines"],
        json!([
            { "formula": "HOW-TO", "headline": "How To Write Emails People Answer" },
            { "formula": "HOW-TO", "headline": "How To Double Your Reply Rate" },
            { "formula": "QUESTION", "headline": "Are Your Emails Being Ignored?" }
        ])
    );

    let (_, capped) = server
        .post("/api/headlines", &user, json!({ "text": "Cold email course", "count": 2 }))
        .await?;
    assert_eq!(capped["headlines"].as_array().map(Vec::len), Some(2));

    let (status, _) = server
        .post("/api/headlines", &user, json!({ "text": "Cold email course", "count": 21 }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn brand_alignment_returns_a_clamped_score() -> Result<()> {
    let reply = "```json\n{\"score\": 112, \"assessment\": \"Strong\", \"matches\": [\"warm\"], \"violations\": [], \"recommendations\": [\"Cut jargon\"]}\n```";
    let server = TestServer::builder().llm(ScriptedLlm::new(Reply::text(reply))).start().await?;
    let user = server.user();

    let (status, _) = server.post("/api/brand-alignment", &user, json!({ "text": "Hello" })).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = server
        .post(
            "/api/brand-alignment",
            &user,
            json!({ "text": "Hello", "brandVoice": { "brandName": "Acme", "brandTone": "warm" } }),
        )
        .await?;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["result"]["score"], 100);
    assert_eq!(body["result"]["recommendations"], json!(["Cut jargon"]));
    Ok(())
}

#[tokio::test]
async fn template_generation() -> Result<()> {
    let server = TestServer::start().await?;
    let user = server.user();

    let (status, catalog) = server.request(Method::GET, "/api/templates", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert!(catalog.to_string().contains("sales-email"));

    let form = json!({
        "productName": "Ledgerly",
        "targetAudience": "Freelancers",
        "keyBenefits": "Invoices in one click",
        "callToAction": "Start a free trial"
    });
    let (status, body) = server
        .post("/api/generate-template", &user, json!({ "templateId": "sales-email", "formData": form }))
        .await?;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["templateId"], "sales-email");
    assert!(body.get("sectionId").is_none());
    assert!(server.llm.as_ref().unwrap().prompts().iter().any(|p| p.contains("Ledgerly")));

    let (status, _) = server
        .post(
            "/api/generate-template",
            &user,
            json!({ "templateId": "sales-email", "formData": { "productName": "Ledgerly" } }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = server
        .post("/api/generate-template", &user, json!({ "templateId": "haiku", "formData": {} }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn slow_models_time_out_with_408() -> Result<()> {
    let llm = ScriptedLlm::new(Reply::text("<p>late</p>")).with_delay(Duration::from_secs(5));
    let server = TestServer::builder().llm(llm).llm_timeout_secs(1).start().await?;
    let user = server.user();

    let (status, body) = server.post("/api/shorten", &user, json!({ "text": "Make this shorter" })).await?;
    assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
    assert!(body["error"].as_str().unwrap().contains("timed out"));
    Ok(())
}

#[tokio::test]
async fn ai_routes_need_a_caller_and_a_model() -> Result<()> {
    let server = TestServer::builder().without_llm().without_database().start().await?;

    let (status, _) = server
        .request(Method::POST, "/api/shorten", None, Some(json!({ "text": "hi" })))
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // No database needed for the writing tools themselves
    let user = server.user();
    let (status, body) = server.post("/api/shorten", &user, json!({ "text": "hi" })).await?;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "AI service not configured");
    Ok(())
}
