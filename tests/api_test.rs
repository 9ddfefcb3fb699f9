//! Integration tests against a real Postgres database. Set `TEST_DATABASE_URL`
//! to a database with the pgvector extension available to run them.

mod common;

use common::{bearer, body_json, unique, TestServer};
use rocket::http::{ContentType, Status};
use serde_json::json;
use tenant_rag_api::{
    db::{
        models::NewChatHistory,
        services::{ChatDbService, DocumentDbService},
    },
    utils::Pagination,
};

#[rocket::async_test]
async fn register_rejects_duplicate_account_and_email() {
    let Some(server) = TestServer::start().await else {
        return;
    };
    let account = unique("acct");
    let email = format!("{}@example.com", unique("mail"));
    server.register(&account, &email, "secret-1").await;

    let response = server
        .post_json(
            "/service/user/register",
            json!({
                "userAccount": account,
                "email": format!("{}@example.com", unique("other")),
                "username": "dup",
                "password": "secret-2",
            }),
        )
        .await;
    assert_eq!(response.status(), Status::BadRequest);
    assert_eq!(body_json(response).await["msg"], "Account already registered");

    let response = server
        .post_json(
            "/service/user/register",
            json!({
                "userAccount": unique("acct"),
                "email": email,
                "username": "dup",
                "password": "secret-2",
            }),
        )
        .await;
    assert_eq!(response.status(), Status::BadRequest);
    assert_eq!(body_json(response).await["msg"], "Email already registered");
}

#[rocket::async_test]
async fn update_password_requires_old_password() {
    let Some(server) = TestServer::start().await else {
        return;
    };
    let account = unique("acct");
    let email = format!("{}@example.com", unique("mail"));
    let (_, token) = server.register(&account, &email, "first-pass").await;

    let update = |old: &'static str| {
        server
            .client
            .put("/service/user/updatePassword")
            .header(ContentType::JSON)
            .header(bearer(&token))
            .body(json!({ "oldPassword": old, "newPassword": "second-pass" }).to_string())
            .dispatch()
    };

    let response = update("wrong-pass").await;
    assert_eq!(response.status(), Status::BadRequest);
    assert_eq!(body_json(response).await["msg"], "Old password is incorrect");

    let response = update("first-pass").await;
    assert_eq!(response.status(), Status::Ok);
    assert_eq!(body_json(response).await["data"], 1);

    let login = |password: &'static str| {
        server.post_json(
            "/service/user/login",
            json!({ "userAccount": account, "password": password }),
        )
    };
    assert_eq!(login("first-pass").await.status(), Status::Unauthorized);
    let response = login("second-pass").await;
    assert_eq!(response.status(), Status::Ok);
    assert!(body_json(response).await["token"].is_string());
}

#[rocket::async_test]
async fn chat_history_pages_are_bounded() {
    let Some(server) = TestServer::start().await else {
        return;
    };
    let account = unique("acct");
    let email = format!("{}@example.com", unique("mail"));
    let (user_id, token) = server.register(&account, &email, "history-pass").await;

    let mut db = server.db().await;
    let mut chat_service = ChatDbService::new(&mut db);
    for i in 0..15 {
        let chat_id = if i < 4 { "chat-a" } else { "chat-b" };
        chat_service
            .save_history(NewChatHistory {
                user_id: user_id.clone(),
                chat_id: chat_id.to_owned(),
                model_name: "llama3".to_owned(),
                files: None,
                prompt: format!("question {i}"),
                content: format!("question {i}"),
                think_content: None,
                response_content: Some(format!("answer {i}")),
            })
            .await
            .unwrap();
    }
    let page = chat_service
        .get_history(&user_id, None, Pagination::new(Some(1), Some(10)))
        .await
        .unwrap();
    assert_eq!(page.items.len(), 10);
    assert_eq!(page.total, 15);

    let get_page = |query: &'static str| {
        server
            .client
            .get(format!("/service/ai/getChatHistory?{query}"))
            .header(bearer(&token))
            .dispatch()
    };

    let body = body_json(get_page("page_num=2&page_size=10").await).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 5);
    assert_eq!(body["total"], 15);

    let body = body_json(get_page("chat_id=chat-a&page_size=3").await).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 3);
    assert_eq!(body["total"], 4);

    // Another user's history stays out of the count
    let other = server
        .register(&unique("acct"), &format!("{}@example.com", unique("mail")), "pw")
        .await;
    let body = body_json(
        server
            .client
            .get("/service/ai/getChatHistory")
            .header(bearer(&other.1))
            .dispatch()
            .await,
    )
    .await;
    assert_eq!(body["total"], 0);
}

#[rocket::async_test]
async fn directory_names_are_unique_per_user_and_tenant() {
    let Some(server) = TestServer::start().await else {
        return;
    };
    let (alice, _) = server
        .register(&unique("acct"), &format!("{}@example.com", unique("mail")), "pw")
        .await;
    let (bob, _) = server
        .register(&unique("acct"), &format!("{}@example.com", unique("mail")), "pw")
        .await;

    let mut db = server.db().await;
    let mut documents = DocumentDbService::new(&mut db);
    let first = documents
        .get_or_create_directory(&alice, None, "notes")
        .await
        .unwrap();
    let again = documents
        .get_or_create_directory(&alice, None, "notes")
        .await
        .unwrap();
    assert_eq!(first.id, again.id);

    let in_tenant = documents
        .get_or_create_directory(&alice, Some("t1"), "notes")
        .await
        .unwrap();
    assert_ne!(in_tenant.id, first.id);
    assert_eq!(in_tenant.tenant_id.as_deref(), Some("t1"));
    let in_tenant_again = documents
        .get_or_create_directory(&alice, Some("t1"), "notes")
        .await
        .unwrap();
    assert_eq!(in_tenant.id, in_tenant_again.id);

    let other_user = documents
        .get_or_create_directory(&bob, None, "notes")
        .await
        .unwrap();
    assert_ne!(other_user.id, first.id);
}

#[rocket::async_test]
async fn failed_upload_rolls_back() {
    let Some(server) = TestServer::start().await else {
        return;
    };
    let (user_id, token) = server
        .register(&unique("acct"), &format!("{}@example.com", unique("mail")), "pw")
        .await;

    // The embedding server is unreachable, so indexing fails after the file is saved
    let response = server
        .client
        .post("/service/ai/uploadDoc?name=notes.txt")
        .header(ContentType::Binary)
        .header(bearer(&token))
        .body("Some notes worth indexing.")
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::InternalServerError);
    let msg = body_json(response).await["msg"].as_str().unwrap().to_owned();
    assert!(msg.starts_with("File processing failed"), "{msg}");

    let body = body_json(
        server
            .client
            .get("/service/ai/getDocList")
            .header(bearer(&token))
            .dispatch()
            .await,
    )
    .await;
    assert_eq!(body["total"], 0);

    let user_dir = server.upload_dir.path().join(&user_id);
    let leftover = std::fs::read_dir(&user_dir)
        .map(|entries| entries.count())
        .unwrap_or(0);
    assert_eq!(leftover, 0, "files left in {}", user_dir.display());
}

#[rocket::async_test]
async fn upload_rejects_unsupported_extension() {
    let Some(server) = TestServer::start().await else {
        return;
    };
    let (_, token) = server
        .register(&unique("acct"), &format!("{}@example.com", unique("mail")), "pw")
        .await;

    let response = server
        .client
        .post("/service/ai/uploadDoc?name=slides.pptx")
        .header(ContentType::Binary)
        .header(bearer(&token))
        .body("not a document")
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::BadRequest);
}
