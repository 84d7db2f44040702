#![cfg(feature = "migration")]

mod common;

use std::sync::Arc;
use std::time::Duration;

use moviecorn::auth::{AuthBackend, MemoryAuth};
use moviecorn::favorites::{FavoriteToggle, FavoritesCollection, ToggleOutcome};
use moviecorn::model::MovieSnapshot;
use moviecorn::navigation::{self, Navigation, Route};
use moviecorn::store::SessionPersistence;
use moviecorn::supabase::SupabaseClient;
use moviecorn::{AuthContext, AuthError, Identity, SupabaseAuth, UserId};
use serde_json::json;
use tokio::time::timeout;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const WAIT: Duration = Duration::from_secs(2);

fn session_body(user_id: &str, access_token: &str) -> serde_json::Value {
    let expires_at = time::OffsetDateTime::now_utc() + time::Duration::hours(1);
    json!({
        "access_token": access_token,
        "token_type": "bearer",
        "expires_in": 3600,
        "expires_at": expires_at.unix_timestamp(),
        "refresh_token": "refresh-1",
        "user": { "id": user_id, "email": "ana@example.com" }
    })
}

async fn wait_for_identity(context: &AuthContext, signed_in: bool) -> Option<Identity> {
    let mut identity = context.watch();
    let current = timeout(WAIT, identity.wait_for(|i| i.is_some() == signed_in))
        .await
        .expect("identity change should arrive")
        .expect("context should still be listening")
        .clone();
    current
}

#[tokio::test]
async fn login_gates_routes_and_favorites() {
    let backend = Arc::new(MemoryAuth::new());
    let store = Arc::new(common::sqlite_store().await);
    let context = AuthContext::init(backend).await;

    assert_eq!(
        navigation::resolve(Route::Favorites, context.current().as_ref()),
        Navigation::LoginPrompt
    );

    let card = FavoriteToggle::new(store.clone(), 27205, MovieSnapshot::default());
    assert_eq!(
        card.toggle(context.current().as_ref()).await,
        Ok(ToggleOutcome::LoginRequired)
    );

    context.sign_up("ana@example.com", "secret1").await.unwrap();
    let ana = wait_for_identity(&context, true).await;
    assert_eq!(
        navigation::resolve(Route::Favorites, ana.as_ref()),
        Navigation::Show(Route::Favorites)
    );
    assert_eq!(
        navigation::resolve(Route::Login, ana.as_ref()),
        Navigation::Redirect(Route::Profile)
    );

    card.resolve(ana.as_ref()).await;
    assert_eq!(card.toggle(ana.as_ref()).await, Ok(ToggleOutcome::Added));

    let mut page = FavoritesCollection::new(store);
    page.load(ana.as_ref()).await.unwrap();
    assert_eq!(page.len(), 1);

    context.log_out().await.unwrap();
    let signed_out = wait_for_identity(&context, false).await;
    page.load(signed_out.as_ref()).await.unwrap();
    assert!(page.is_empty());
    assert_eq!(navigation::after_logout(), Route::Login);
}

#[tokio::test]
async fn supabase_session_survives_a_restart() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .respond_with(ResponseTemplate::new(200).set_body_json(session_body("u-1", "at-1")))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(common::sqlite_store().await);
    let client = SupabaseClient::new(server.uri(), "anon-key").unwrap();

    {
        let auth = Arc::new(SupabaseAuth::new(client.clone()).with_persistence(store.clone()));
        let context = AuthContext::init(auth).await;
        context.log_in("ana@example.com", "secret1").await.unwrap();
        wait_for_identity(&context, true).await;
    }

    // A new process: same database, fresh backend
    let auth = SupabaseAuth::new(client).with_persistence(store.clone());
    let restored = auth.restore().await.expect("session should be restored");
    assert_eq!(restored.identity.id, UserId::new("u-1"));

    let context = AuthContext::init(Arc::new(auth)).await;
    assert_eq!(
        context.current().map(|i| i.id),
        Some(UserId::new("u-1"))
    );
    assert_eq!(store.delete_expired_sessions().await.unwrap(), 0);
}

#[tokio::test]
async fn supabase_rejections_reach_the_caller_with_distinct_messages() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Invalid login credentials"
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/signup"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "code": 422,
            "error_code": "user_already_exists",
            "msg": "User already registered"
        })))
        .mount(&server)
        .await;

    let auth = Arc::new(SupabaseAuth::new(
        SupabaseClient::new(server.uri(), "anon-key").unwrap(),
    ));
    let context = AuthContext::init(auth.clone()).await;

    let login = context.log_in("ana@example.com", "wrong").await.unwrap_err();
    let signup = context.sign_up("ana@example.com", "secret1").await.unwrap_err();

    assert_eq!(login, AuthError::InvalidCredentials);
    assert_eq!(signup, AuthError::EmailTaken);
    assert_ne!(login.user_message(), signup.user_message());
    assert_eq!(auth.current_session().await.unwrap(), None);
    assert!(!context.is_signed_in());
}
