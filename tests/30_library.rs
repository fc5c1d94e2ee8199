mod common;

use anyhow::Result;
use common::{id_of, TestServer};
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
async fn snippet_search_tags_and_usage_counter() -> Result<()> {
    let server = TestServer::start().await?;
    let user = server.user();
    let project_id = server.create_project(&user, "Acme").await?;

    let (status, cta) = server
        .post(
            "/api/snippets",
            &user,
            json!({
                "project_id": project_id,
                "name": "Footer CTA",
                "content": "<p>Book a demo</p>",
                "tags": ["cta", "footer"]
            }),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED, "{}", cta);
    assert_eq!(cta["usage_count"], 0);

    let (status, _) = server
        .post(
            "/api/snippets",
            &user,
            json!({ "project_id": project_id, "name": "Discount", "content": "<p>Save 100%_off</p>" }),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);

    let base = format!("/api/snippets?project_id={}", project_id);
    let (_, found) = server.get(&format!("{}&search=DEMO", base), &user).await?;
    assert_eq!(found.as_array().map(Vec::len), Some(1));

    // LIKE wildcards in the query are literal
    let (_, found) = server.get(&format!("{}&search=%25", base), &user).await?;
    assert_eq!(found[0]["name"], "Discount");
    let (_, found) = server.get(&format!("{}&search=_", base), &user).await?;
    assert_eq!(found.as_array().map(Vec::len), Some(1));

    let (_, tagged) = server.get(&format!("{}&tag=footer", base), &user).await?;
    assert_eq!(tagged.as_array().map(Vec::len), Some(1));
    assert_eq!(tagged[0]["name"], "Footer CTA");

    for expected in 1..=3 {
        let (status, bumped) = server.patch(&format!("/api/snippets?id={}", id_of(&cta)), &user).await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(bumped["usage_count"], expected);
    }

    let stranger = server.user();
    let (status, _) = server.patch(&format!("/api/snippets?id={}", id_of(&cta)), &stranger).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn snippet_length_limits() -> Result<()> {
    let server = TestServer::start().await?;
    let user = server.user();
    let project_id = server.create_project(&user, "Acme").await?;

    let snippet = |content: String, description: String| {
        json!({ "project_id": project_id, "name": "Long", "content": content, "description": description })
    };
    let (status, _) = server
        .post("/api/snippets", &user, snippet("x".repeat(50_000), "d".repeat(500)))
        .await?;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = server
        .post("/api/snippets", &user, snippet("x".repeat(50_001), "ok".into()))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = server
        .post("/api/snippets", &user, snippet("ok".into(), "d".repeat(501)))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn personas_and_brand_voices() -> Result<()> {
    let server = TestServer::start().await?;
    let user = server.user();
    let project_id = server.create_project(&user, "Acme").await?;

    let (status, persona) = server
        .post(
            "/api/personas",
            &user,
            json!({ "name": "Ops Olivia", "pain_points": "Too many tools", "project_id": project_id }),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED, "{}", persona);
    let (status, _) = server
        .post("/api/personas", &user, json!({ "name": "Olivia", "goals": "g".repeat(5_001) }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, voice) = server
        .post(
            "/api/brand-voices",
            &user,
            json!({
                "brand_name": "Acme",
                "brand_tone": "Confident, warm",
                "forbidden_words": ["synergy"],
                "project_id": project_id
            }),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED, "{}", voice);
    assert_eq!(voice["forbidden_words"], json!(["synergy"]));

    let (status, updated) = server
        .put("/api/brand-voices", &user, json!({ "id": id_of(&voice), "approved_phrases": ["Built to last"] }))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["approved_phrases"], json!(["Built to last"]));

    let (status, _) = server
        .put("/api/brand-voices", &user, json!({ "id": id_of(&voice), "approved_phrases": "not a list" }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, personas) = server.get(&format!("/api/personas?project_id={}", project_id), &user).await?;
    assert_eq!(personas.as_array().map(Vec::len), Some(1));
    let (_, all) = server.get("/api/brand-voices", &user).await?;
    assert_eq!(all.as_array().map(Vec::len), Some(1));
    Ok(())
}

#[tokio::test]
async fn settings_upsert_keeps_unmentioned_columns() -> Result<()> {
    let server = TestServer::start().await?;
    let user = server.user();
    let project_id = server.create_project(&user, "Acme").await?;

    let (status, defaults) = server.get("/api/user-settings", &user).await?;
    assert_eq!(status, StatusCode::OK);
    assert!(defaults["active_project_id"].is_null());

    let (status, saved) = server
        .put("/api/user-settings", &user, json!({ "active_project_id": project_id }))
        .await?;
    assert_eq!(status, StatusCode::OK, "{}", saved);

    let (status, saved) = server
        .put("/api/user-settings", &user, json!({ "settings": { "theme": "dark" } }))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(saved["active_project_id"], json!(project_id));
    assert_eq!(saved["settings"]["theme"], "dark");

    let (status, _) = server.put("/api/user-settings", &user, json!({ "settings": [1, 2] })).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let other = server.user();
    let foreign = server.create_project(&other, "Globex").await?;
    let (status, _) = server
        .put("/api/user-settings", &user, json!({ "active_project_id": foreign }))
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}
