use std::sync::Arc;

use axum::{
    extract::{Multipart, Query, State},
    http::header,
    response::{Html, IntoResponse, Redirect, Response},
    Extension, Form, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::assessment::AssessmentFlow;
use crate::errors::AppError;
use crate::models::Session;
use crate::state::AppState;
use crate::storage::upload_path;
use crate::store::{Fields, StoreError};
use crate::web::browser::{session_cookie, BrowserContext};
use crate::web::pages::{self, AuthMode};

#[derive(Debug, Deserialize)]
pub struct HomeQuery {
    pub mode: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct AnswerForm {
    pub option: String,
}

#[derive(Debug, Deserialize)]
pub struct ProfileForm {
    pub display_name: String,
}

/// The signed-in user, or the response to send instead: a loading notice while
/// the session is being restored, otherwise a redirect to the landing page.
fn signed_in(browser: &BrowserContext, path: &str) -> Result<Session, Response> {
    let current = browser.session.current();
    if current.loading {
        return Err(pages::loading_page(path).into_response());
    }
    current.user.ok_or_else(|| Redirect::to("/").into_response())
}

fn render_flow(user: &Session, flow: &AssessmentFlow, notice: Option<&str>) -> Html<String> {
    match flow.result() {
        Some(result) => pages::results_page(user, result, notice),
        None => pages::question_page(user, flow, notice),
    }
}

/// Sends the browser home with the cookie for its new id.
fn signed_in_redirect(browser: &BrowserContext) -> Response {
    (
        [(header::SET_COOKIE, session_cookie(browser.sid))],
        Redirect::to("/"),
    )
        .into_response()
}

fn auth_mode(mode: Option<&str>) -> AuthMode {
    match mode {
        Some("signup") => AuthMode::Signup,
        _ => AuthMode::Login,
    }
}

/// GET /
pub async fn handle_home(
    Extension(browser): Extension<Arc<BrowserContext>>,
    Query(query): Query<HomeQuery>,
) -> Html<String> {
    let current = browser.session.current();
    if current.loading {
        return pages::loading_page("/");
    }
    match current.user {
        Some(user) => pages::welcome_page(&user),
        None => pages::landing_page(auth_mode(query.mode.as_deref()), None),
    }
}

/// POST /auth/sign-in
pub async fn handle_sign_in(
    State(state): State<AppState>,
    Extension(browser): Extension<Arc<BrowserContext>>,
    Form(form): Form<Credentials>,
) -> Response {
    let outcome = state
        .browsers
        .sign_in(&browser, form.email.trim(), &form.password)
        .await;
    match outcome {
        Ok((browser, session)) => {
            info!("uid {} signed in", session.uid);
            signed_in_redirect(&browser)
        }
        Err(e) => {
            warn!("Sign-in rejected ({}): {}", e.code(), e.detail());
            pages::landing_page(AuthMode::Login, Some(&e.to_string())).into_response()
        }
    }
}

/// POST /auth/sign-up
///
/// A failed profile write does not undo the account; the user is signed in
/// either way.
pub async fn handle_sign_up(
    State(state): State<AppState>,
    Extension(browser): Extension<Arc<BrowserContext>>,
    Form(form): Form<Credentials>,
) -> Response {
    let outcome = state
        .browsers
        .sign_up(&browser, form.email.trim(), &form.password)
        .await;
    let (browser, session) = match outcome {
        Ok(signed_up) => signed_up,
        Err(e) => {
            warn!("Sign-up rejected ({}): {}", e.code(), e.detail());
            return pages::landing_page(AuthMode::Signup, Some(&e.to_string())).into_response();
        }
    };

    let mut profile = Fields::new();
    profile.insert("email".to_string(), json!(session.email));
    if let Err(e) = state.documents.create_user_document(&session.uid, profile).await {
        warn!("Could not create user document for uid {}: {e}", session.uid);
    }
    info!("uid {} signed up", session.uid);
    signed_in_redirect(&browser)
}

/// POST /auth/sign-out
pub async fn handle_sign_out(Extension(browser): Extension<Arc<BrowserContext>>) -> Redirect {
    browser.session.sign_out();
    Redirect::to("/")
}

/// GET /assessment
pub async fn handle_assessment(Extension(browser): Extension<Arc<BrowserContext>>) -> Response {
    let user = match signed_in(&browser, "/assessment") {
        Ok(user) => user,
        Err(response) => return response,
    };
    let flow = browser.flow();
    render_flow(&user, &flow, None).into_response()
}

/// POST /assessment/answer
pub async fn handle_answer(
    Extension(browser): Extension<Arc<BrowserContext>>,
    Form(form): Form<AnswerForm>,
) -> Response {
    let user = match signed_in(&browser, "/assessment") {
        Ok(user) => user,
        Err(response) => return response,
    };
    let mut flow = browser.flow();
    match flow.select_answer(&form.option) {
        Ok(()) => Redirect::to("/assessment").into_response(),
        Err(e) => render_flow(&user, &flow, Some(&e.to_string())).into_response(),
    }
}

/// POST /assessment/submit
///
/// The flow lock is released while the gateway call is in flight, so the page
/// can be re-rendered (showing the pending state) from another request.
pub async fn handle_submit(
    State(state): State<AppState>,
    Extension(browser): Extension<Arc<BrowserContext>>,
) -> Response {
    let user = match signed_in(&browser, "/assessment") {
        Ok(user) => user,
        Err(response) => return response,
    };

    let answers = {
        let mut flow = browser.flow();
        match flow.begin_submit() {
            Ok(answers) => answers,
            Err(e) => return render_flow(&user, &flow, Some(&e.to_string())).into_response(),
        }
    };

    info!("Submitting {} answers for uid {}", answers.len(), user.uid);
    let outcome = state.gateway.analyze(&answers).await;
    let finished = {
        let mut flow = browser.flow();
        flow.finish_submit(outcome);
        flow.state()
    };
    info!("Assessment for uid {} ended in {finished:?}", user.uid);
    Redirect::to("/assessment").into_response()
}

/// POST /assessment/reset
pub async fn handle_reset(Extension(browser): Extension<Arc<BrowserContext>>) -> Response {
    let user = match signed_in(&browser, "/assessment") {
        Ok(user) => user,
        Err(response) => return response,
    };
    let mut flow = browser.flow();
    match flow.reset() {
        Ok(()) => Redirect::to("/assessment").into_response(),
        Err(e) => render_flow(&user, &flow, Some(&e.to_string())).into_response(),
    }
}

/// POST /assessment/save
pub async fn handle_save(
    State(state): State<AppState>,
    Extension(browser): Extension<Arc<BrowserContext>>,
) -> Response {
    let user = match signed_in(&browser, "/assessment") {
        Ok(user) => user,
        Err(response) => return response,
    };
    let result = browser.flow().result().cloned();
    let Some(result) = result else {
        return Redirect::to("/assessment").into_response();
    };

    let notice = match state.documents.save_assessment_results(&user.uid, &result).await {
        Ok(()) => "Results saved.",
        Err(e) => {
            error!("Could not save assessment for uid {}: {e}", user.uid);
            "Could not save your results. Please try again."
        }
    };
    pages::results_page(&user, &result, Some(notice)).into_response()
}

/// GET /results
pub async fn handle_saved_results(
    State(state): State<AppState>,
    Extension(browser): Extension<Arc<BrowserContext>>,
) -> Response {
    let user = match signed_in(&browser, "/results") {
        Ok(user) => user,
        Err(response) => return response,
    };
    match state.documents.get_assessment_results(&user.uid).await {
        Ok(saved) => pages::saved_results_page(&user, saved.as_ref(), None).into_response(),
        Err(e) => {
            error!("Could not load saved assessment for uid {}: {e}", user.uid);
            pages::saved_results_page(&user, None, Some("Could not load your saved results."))
                .into_response()
        }
    }
}

/// GET /profile
pub async fn handle_profile(
    State(state): State<AppState>,
    Extension(browser): Extension<Arc<BrowserContext>>,
) -> Response {
    let user = match signed_in(&browser, "/profile") {
        Ok(user) => user,
        Err(response) => return response,
    };
    match state.documents.get_user_document(&user.uid).await {
        Ok(profile) => pages::profile_page(&user, profile.as_ref(), None).into_response(),
        Err(e) => {
            error!("Could not load profile for uid {}: {e}", user.uid);
            pages::profile_page(&user, None, Some("Could not load your profile.")).into_response()
        }
    }
}

/// POST /profile
pub async fn handle_update_profile(
    State(state): State<AppState>,
    Extension(browser): Extension<Arc<BrowserContext>>,
    Form(form): Form<ProfileForm>,
) -> Response {
    let user = match signed_in(&browser, "/profile") {
        Ok(user) => user,
        Err(response) => return response,
    };

    let mut data = Fields::new();
    data.insert("displayName".to_string(), json!(form.display_name.trim()));
    let outcome = match state.documents.update_user_document(&user.uid, data.clone()).await {
        // Accounts created before profiles existed have no document yet.
        Err(StoreError::NotFound { .. }) => {
            data.insert("email".to_string(), json!(user.email));
            state.documents.create_user_document(&user.uid, data).await
        }
        other => other,
    };

    match outcome {
        Ok(()) => Redirect::to("/profile").into_response(),
        Err(e) => {
            error!("Could not update profile for uid {}: {e}", user.uid);
            let profile = state.documents.get_user_document(&user.uid).await.ok().flatten();
            pages::profile_page(&user, profile.as_ref(), Some("Could not update your profile."))
                .into_response()
        }
    }
}

/// POST /api/files
///
/// Stores the multipart field `file` under `uploads/{uid}/` and returns its path
/// and a download URL.
pub async fn handle_upload(
    State(state): State<AppState>,
    Extension(browser): Extension<Arc<BrowserContext>>,
    mut multipart: Multipart,
) -> Result<Json<Value>, AppError> {
    let user = browser.session.user().ok_or(AppError::Unauthorized)?;
    let storage = state
        .storage
        .as_ref()
        .ok_or_else(|| AppError::Unavailable("File storage is not configured".to_string()))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let path = upload_path(&user.uid, field.file_name().unwrap_or_default())
            .ok_or_else(|| AppError::Validation("A file name is required".to_string()))?;
        let content_type = field.content_type().map(str::to_string);
        let body = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Could not read upload: {e}")))?;

        let url = storage.upload(&path, body, content_type.as_deref()).await?;
        return Ok(Json(json!({ "path": path, "url": url })));
    }

    Err(AppError::Validation("file is required".to_string()))
}
