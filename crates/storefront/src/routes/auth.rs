//! Authentication route handlers.
//!
//! Email and password login and signup. Failures re-render the form with a
//! message; successes put the user in the session and redirect.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::PageContext;
use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{clear_current_user, set_current_user, verify_csrf};
use crate::models::CurrentUser;
use crate::services::AuthError;
use crate::state::AppState;

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    #[serde(rename = "_csrf")]
    pub csrf: String,
}

/// Signup form data.
#[derive(Debug, Deserialize)]
pub struct SignupForm {
    pub email: String,
    pub password: String,
    #[serde(rename = "confirmPassword")]
    pub confirm_password: String,
    #[serde(rename = "_csrf")]
    pub csrf: String,
}

/// Logout form data.
#[derive(Debug, Deserialize)]
pub struct LogoutForm {
    #[serde(rename = "_csrf")]
    pub csrf: String,
}

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub page: PageContext,
    pub error: Option<String>,
    pub email: String,
}

/// Signup page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/signup.html")]
pub struct SignupTemplate {
    pub page: PageContext,
    pub error: Option<String>,
    pub email: String,
}

/// Display the login page.
pub async fn login_page(page: PageContext) -> LoginTemplate {
    LoginTemplate {
        page,
        error: None,
        email: String::new(),
    }
}

/// Handle login form submission.
#[instrument(skip(state, session, page, form))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    verify_csrf(&session, &form.csrf).await?;

    match state
        .auth()
        .login_with_password(&form.email, &form.password)
        .await
    {
        Ok(user) => {
            let current = CurrentUser {
                id: user.id,
                email: user.email,
            };
            set_current_user(&session, &current).await?;
            set_sentry_user(&current.id, Some(current.email.as_str()));
            Ok(Redirect::to("/").into_response())
        }
        Err(e @ (AuthError::Repository(_) | AuthError::PasswordHash)) => Err(e.into()),
        Err(e) => {
            tracing::info!(error = %e, "Login rejected");
            Ok((
                StatusCode::UNPROCESSABLE_ENTITY,
                LoginTemplate {
                    page,
                    error: Some(e.user_message()),
                    email: form.email,
                },
            )
                .into_response())
        }
    }
}

/// Display the signup page.
pub async fn signup_page(page: PageContext) -> SignupTemplate {
    SignupTemplate {
        page,
        error: None,
        email: String::new(),
    }
}

/// Handle signup form submission. New accounts go to the login page.
#[instrument(skip(state, session, page, form))]
pub async fn signup(
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
    Form(form): Form<SignupForm>,
) -> Result<Response> {
    verify_csrf(&session, &form.csrf).await?;

    let result = if form.password == form.confirm_password {
        state
            .auth()
            .register_with_password(&form.email, &form.password)
            .await
    } else {
        Err(AuthError::PasswordMismatch)
    };

    match result {
        Ok(_) => Ok(Redirect::to("/login").into_response()),
        Err(e @ (AuthError::Repository(_) | AuthError::PasswordHash)) => Err(e.into()),
        Err(e) => Ok((
            StatusCode::UNPROCESSABLE_ENTITY,
            SignupTemplate {
                page,
                error: Some(e.user_message()),
                email: form.email,
            },
        )
            .into_response()),
    }
}

/// End the session.
pub async fn logout(session: Session, Form(form): Form<LogoutForm>) -> Result<Redirect> {
    verify_csrf(&session, &form.csrf).await?;
    clear_current_user(&session).await?;
    clear_sentry_user();
    Ok(Redirect::to("/"))
}
