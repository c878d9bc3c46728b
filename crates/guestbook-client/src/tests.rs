//! `ApiClient` tests against an in-process axum stand-in for the backend.

use std::{
  collections::HashMap,
  sync::{Arc, Mutex},
};

use axum::{
  Json, Router,
  extract::{Query, State},
  http::{HeaderMap, StatusCode, header},
  response::IntoResponse,
  routing::{delete, get, post, put},
};
use guestbook_core::{
  note::{NewNote, NoteUpdate},
  user::{Credentials, ProfileUpdate, Registration},
};
use serde_json::{Value, json};

use crate::{ApiClient, ApiConfig, ApiError};

const TOKEN: &str = "header.payload.signature";

type Captured = Arc<Mutex<Vec<Value>>>;

async fn serve(router: Router) -> ApiClient {
  let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  tokio::spawn(async move {
    axum::serve(listener, router).await.unwrap();
  });
  ApiClient::new(ApiConfig {
    base_url: format!("http://{addr}/"),
    ..ApiConfig::default()
  })
  .unwrap()
}

fn bearer_ok(headers: &HeaderMap) -> bool {
  headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    == Some(format!("Bearer {TOKEN}").as_str())
}

// ─── Login ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn login_reads_token_from_json_object() {
  let captured = Captured::default();
  let router = Router::new()
    .route(
      "/api/auth/Login",
      post(|State(c): State<Captured>, Json(body): Json<Value>| async move {
        c.lock().unwrap().push(body);
        Json(json!({ "token": TOKEN }))
      }),
    )
    .with_state(captured.clone());
  let client = serve(router).await;

  let token = client
    .login(&Credentials::new(" ayse@example.com ", "secret"))
    .await
    .unwrap();
  assert_eq!(token, TOKEN);
  assert_eq!(
    captured.lock().unwrap().as_slice(),
    &[json!({ "Mail": "ayse@example.com", "Password": "secret" })]
  );
}

#[tokio::test]
async fn login_reads_access_token_and_json_string() {
  let router = Router::new()
    .route("/api/auth/Login", post(|| async { Json(json!({ "accessToken": "abc" })) }));
  let client = serve(router).await;
  assert_eq!(client.login(&Credentials::new("a", "b")).await.unwrap(), "abc");

  let router = Router::new().route("/api/auth/Login", post(|| async { Json(json!("xyz")) }));
  let client = serve(router).await;
  assert_eq!(client.login(&Credentials::new("a", "b")).await.unwrap(), "xyz");
}

#[tokio::test]
async fn login_strips_quotes_from_plain_text() {
  let router = Router::new().route(
    "/api/auth/Login",
    post(|| async { format!("\"{TOKEN}\"\n") }),
  );
  let client = serve(router).await;
  assert_eq!(client.login(&Credentials::new("a", "b")).await.unwrap(), TOKEN);
}

#[tokio::test]
async fn login_without_token_is_an_error() {
  let router = Router::new()
    .route("/api/auth/Login", post(|| async { Json(json!({ "ok": true })) }));
  let client = serve(router).await;
  assert!(matches!(
    client.login(&Credentials::new("a", "b")).await,
    Err(ApiError::MissingToken)
  ));
}

#[tokio::test]
async fn failed_login_is_a_server_error_not_unauthorized() {
  let router = Router::new().route(
    "/api/auth/Login",
    post(|| async {
      (
        StatusCode::UNAUTHORIZED,
        [(header::CONTENT_TYPE, "application/problem+json")],
        r#"{"title":"Unauthorized","detail":"Wrong mail or password"}"#,
      )
    }),
  );
  let client = serve(router).await;
  match client.login(&Credentials::new("a", "b")).await {
    Err(ApiError::Server { status, message }) => {
      assert_eq!(status, 401);
      assert_eq!(message, "Wrong mail or password");
    }
    other => panic!("unexpected: {other:?}"),
  }
}

// ─── Register & profile ──────────────────────────────────────────────────────

#[tokio::test]
async fn register_posts_trimmed_fields() {
  let captured = Captured::default();
  let router = Router::new()
    .route(
      "/api/user/Register",
      post(|State(c): State<Captured>, Json(body): Json<Value>| async move {
        c.lock().unwrap().push(body);
        Json(json!({ "id": 1 }))
      }),
    )
    .with_state(captured.clone());
  let client = serve(router).await;

  client
    .register(&Registration::new(" Ali ", "Veli ", " ali@example.com", "pw"))
    .await
    .unwrap();
  assert_eq!(
    captured.lock().unwrap().as_slice(),
    &[json!({ "Name": "Ali", "SurName": "Veli", "Mail": "ali@example.com", "Password": "pw" })]
  );
}

#[tokio::test]
async fn update_user_sends_query_parameters() {
  let captured = Captured::default();
  let router = Router::new()
    .route(
      "/api/user/update",
      put(
        |State(c): State<Captured>,
         headers: HeaderMap,
         Query(q): Query<HashMap<String, String>>| async move {
          if !bearer_ok(&headers) {
            return StatusCode::UNAUTHORIZED;
          }
          c.lock().unwrap().push(json!(q));
          StatusCode::NO_CONTENT
        },
      ),
    )
    .with_state(captured.clone());
  let client = serve(router).await;

  let update = ProfileUpdate {
    id:       5,
    name:     "Ayşe".into(),
    surname:  "Kaya".into(),
    mail:     "ayse@example.com".into(),
    password: String::new(),
  };
  client.update_user(TOKEN, &update).await.unwrap();
  assert_eq!(
    captured.lock().unwrap().as_slice(),
    &[json!({
      "Id": "5", "Name": "Ayşe", "SurName": "Kaya",
      "Mail": "ayse@example.com", "Password": "",
    })]
  );
}

// ─── Notes ───────────────────────────────────────────────────────────────────

fn users_router() -> Router {
  Router::new().route(
    "/api/user/users",
    get(|headers: HeaderMap| async move {
      if !bearer_ok(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
      }
      Json(json!([
        {
          "id": 1, "name": "Ayşe", "surName": "Kaya", "mail": "ayse@example.com",
          "notes": [{ "id": 3, "text": "Merhaba", "dateTime": "2024-05-01T10:00:00", "userId": 1, "mahalleId": 2 }]
        },
        { "id": 2, "name": "Can", "surName": "Öz", "mail": "can@example.com", "notes": [] }
      ]))
      .into_response()
    }),
  )
}

#[tokio::test]
async fn list_notes_sends_bearer_and_flattens() {
  let client = serve(users_router()).await;
  let notes = client.list_notes(TOKEN).await.unwrap();
  assert_eq!(notes.len(), 1);
  assert_eq!(notes[0].id, 3);
  assert_eq!(notes[0].author_name, "Ayşe");
  assert_eq!(notes[0].neighborhood_id, Some(2));
}

#[tokio::test]
async fn quoted_token_is_cleaned_before_sending() {
  let client = serve(users_router()).await;
  assert!(client.list_notes(&format!("\"{TOKEN}\"")).await.is_ok());
}

#[tokio::test]
async fn rejected_token_maps_to_unauthorized() {
  let client = serve(users_router()).await;
  let err = client.list_notes("stale").await.unwrap_err();
  assert!(err.is_unauthorized());
}

#[tokio::test]
async fn create_and_update_post_json_bodies() {
  let captured = Captured::default();
  let router = Router::new()
    .route(
      "/api/Note/CreateNote",
      post(|State(c): State<Captured>, Json(body): Json<Value>| async move {
        c.lock().unwrap().push(body);
        StatusCode::CREATED
      }),
    )
    .route(
      "/api/Note/UpdateNote",
      put(|State(c): State<Captured>, Json(body): Json<Value>| async move {
        c.lock().unwrap().push(body);
        StatusCode::OK
      }),
    )
    .with_state(captured.clone());
  let client = serve(router).await;

  client
    .create_note(TOKEN, &NewNote { text: "hi".into(), user_id: 4, neighborhood_id: Some(9) })
    .await
    .unwrap();
  client
    .update_note(TOKEN, &NoteUpdate { id: 12, user_id: 4, text: "edited".into() })
    .await
    .unwrap();

  assert_eq!(captured.lock().unwrap().as_slice(), &[
    json!({ "text": "hi", "UserId": 4, "MahalleId": 9 }),
    json!({ "Id": 12, "UserId": 4, "text": "edited" }),
  ]);
}

#[tokio::test]
async fn delete_sends_id_query() {
  let captured = Captured::default();
  let router = Router::new()
    .route(
      "/api/Note/DeleteNote",
      delete(
        |State(c): State<Captured>, Query(q): Query<HashMap<String, String>>| async move {
          c.lock().unwrap().push(json!(q));
          StatusCode::OK
        },
      ),
    )
    .with_state(captured.clone());
  let client = serve(router).await;

  client.delete_note(TOKEN, 77).await.unwrap();
  assert_eq!(captured.lock().unwrap().as_slice(), &[json!({ "id": "77" })]);
}

#[tokio::test]
async fn server_errors_carry_extracted_message() {
  let router = Router::new()
    .route(
      "/api/Note/CreateNote",
      post(|| async { (StatusCode::BAD_REQUEST, "Text is required") }),
    )
    .route(
      "/api/Note/DeleteNote",
      delete(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
    );
  let client = serve(router).await;

  let err = client
    .create_note(TOKEN, &NewNote { text: String::new(), user_id: 1, neighborhood_id: None })
    .await
    .unwrap_err();
  assert_eq!(err.to_string(), "Text is required");

  let err = client.delete_note(TOKEN, 1).await.unwrap_err();
  assert!(matches!(err, ApiError::Server { status: 500, .. }));
  assert_eq!(err.to_string(), "HTTP 500");
}

#[tokio::test]
async fn undecodable_success_body_is_a_decode_error() {
  let router = Router::new().route("/api/user/users", get(|| async { "definitely not json" }));
  let client = serve(router).await;
  assert!(matches!(client.list_notes(TOKEN).await, Err(ApiError::Decode(_))));
}

// ─── Neighborhoods ───────────────────────────────────────────────────────────

#[tokio::test]
async fn list_neighborhoods_parses_reference_list() {
  let router = Router::new().route(
    "/api/Mahalle/AllMahalles",
    get(|| async {
      Json(json!([
        { "id": 1, "name": "Levent", "district": "Beşiktaş" },
        { "id": 2, "name": "Bebek" }
      ]))
    }),
  );
  let client = serve(router).await;
  let list = client.list_neighborhoods(TOKEN).await.unwrap();
  assert_eq!(list.len(), 2);
  assert_eq!(list[0].district.as_deref(), Some("Beşiktaş"));
  assert_eq!(list[1].district, None);
}

// ─── Transport ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn unreachable_server_is_a_network_error() {
  let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  drop(listener);

  let client = ApiClient::new(ApiConfig {
    base_url: format!("http://{addr}"),
    ..ApiConfig::default()
  })
  .unwrap();
  assert!(matches!(client.list_notes(TOKEN).await, Err(ApiError::Network(_))));
}
