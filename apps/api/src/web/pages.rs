//! Server-rendered HTML for the presentation shell.
//!
//! Every page is a pure function of session and flow state, rendered from the
//! templates under `apps/api/templates`. Template names end in `.html`, so
//! minijinja escapes everything they interpolate.

use std::sync::OnceLock;

use axum::response::Html;
use minijinja::{context, Environment, Value};
use tracing::error;

use crate::assessment::AssessmentFlow;
use crate::models::{AssessmentResult, Session};
use crate::store::{Fields, SavedAssessment};

pub const APP_NAME: &str = "Career Compass";

const TEMPLATES: &[(&str, &str)] = &[
    ("base.html", include_str!("../../templates/base.html")),
    ("cards.html", include_str!("../../templates/cards.html")),
    ("landing.html", include_str!("../../templates/landing.html")),
    ("loading.html", include_str!("../../templates/loading.html")),
    ("profile.html", include_str!("../../templates/profile.html")),
    ("question.html", include_str!("../../templates/question.html")),
    ("results.html", include_str!("../../templates/results.html")),
    ("saved_results.html", include_str!("../../templates/saved_results.html")),
    ("welcome.html", include_str!("../../templates/welcome.html")),
];

const RENDER_FAILED: &str =
    "<!doctype html><html lang=\"en\"><body><p>Something went wrong. Please reload the page.</p></body></html>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Login,
    Signup,
}

fn environment() -> &'static Environment<'static> {
    static ENV: OnceLock<Environment<'static>> = OnceLock::new();
    ENV.get_or_init(|| {
        let mut env = Environment::new();
        for (name, source) in TEMPLATES {
            if let Err(e) = env.add_template(name, source) {
                error!("Template {name} failed to load: {e}");
            }
        }
        env.add_global("app_name", APP_NAME);
        env
    })
}

fn render(name: &str, ctx: Value) -> Html<String> {
    let rendered = environment()
        .get_template(name)
        .and_then(|template| template.render(ctx));
    match rendered {
        Ok(html) => Html(html),
        Err(e) => {
            error!("Could not render {name}: {e}");
            Html(RENDER_FAILED.to_string())
        }
    }
}

pub fn loading_page(active_path: &str) -> Html<String> {
    render("loading.html", context! { title => "Loading", active => active_path })
}

pub fn landing_page(mode: AuthMode, error: Option<&str>) -> Html<String> {
    let signup = mode == AuthMode::Signup;
    let title = if signup { "Create Account" } else { "Welcome Back" };
    render(
        "landing.html",
        context! { title, active => "/", signup, error },
    )
}

pub fn welcome_page(user: &Session) -> Html<String> {
    render(
        "welcome.html",
        context! { title => "Home", active => "/", email => &user.email },
    )
}

/// The current question, progress bar, any error, and the submit button on
/// the last question.
pub fn question_page(user: &Session, flow: &AssessmentFlow, notice: Option<&str>) -> Html<String> {
    let question = flow.current_question();
    let (position, total) = flow.progress();
    let submitting = flow.is_submitting();
    let submit_label = if submitting {
        "Analyzing Responses..."
    } else {
        "Submit Assessment"
    };

    render(
        "question.html",
        context! {
            title => "Career Assessment",
            active => "/assessment",
            email => &user.email,
            position,
            total,
            percent => position * 100 / total.max(1),
            error => flow.error(),
            notice,
            prompt => question.map(|q| q.prompt),
            options => question.map(|q| q.options),
            selected => question.and_then(|q| flow.answers().get(q.id)),
            locked => submitting,
            last => flow.is_last_question(),
            submit_label,
            submit_disabled => submitting || !flow.is_complete(),
        },
    )
}

pub fn results_page(user: &Session, result: &AssessmentResult, notice: Option<&str>) -> Html<String> {
    render(
        "results.html",
        context! {
            title => "Your Results",
            active => "/assessment",
            email => &user.email,
            notice,
            career_paths => &result.career_paths,
        },
    )
}

pub fn saved_results_page(
    user: &Session,
    saved: Option<&SavedAssessment>,
    error: Option<&str>,
) -> Html<String> {
    render(
        "saved_results.html",
        context! {
            title => "Saved Results",
            active => "/results",
            email => &user.email,
            error,
            saved => saved.is_some(),
            created_at => saved.map(|s| s.created_at.as_deref().unwrap_or("earlier")),
            career_paths => saved.map(|s| &s.results.career_paths),
        },
    )
}

pub fn profile_page(user: &Session, profile: Option<&Fields>, error: Option<&str>) -> Html<String> {
    let display_name = profile
        .and_then(|p| p.get("displayName"))
        .and_then(|v| v.as_str())
        .unwrap_or_default();
    render(
        "profile.html",
        context! {
            title => "Profile",
            active => "/profile",
            email => &user.email,
            error,
            display_name,
        },
    )
}
