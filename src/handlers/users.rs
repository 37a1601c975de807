use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::handlers::{form_value, render, set_flash, template_data, AppState};
use crate::http::context::Context;
use crate::models::ModelError;
use crate::security::auth::safe_redirect_target;
use crate::session::{AUTHENTICATED_USER_ID, REDIRECT_AFTER_LOGIN};
use crate::validator::{matches, min_chars, not_blank, Validator, EMAIL_RX};

/// Where a login without a remembered destination lands.
pub const DEFAULT_AFTER_LOGIN: &str = "/snippet/create";

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SignupForm {
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
}

impl SignupForm {
    fn validate(&self) -> Validator {
        let mut v = Validator::default();
        v.check_field(not_blank(&self.name), "name", "This field cannot be blank");
        v.check_field(not_blank(&self.email), "email", "This field cannot be blank");
        v.check_field(
            matches(&self.email, &EMAIL_RX),
            "email",
            "This field must be a valid email address",
        );
        v.check_field(not_blank(&self.password), "password", "This field cannot be blank");
        v.check_field(
            min_chars(&self.password, 8),
            "password",
            "This field must be at least 8 characters long",
        );
        v
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LoginForm {
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
}

impl LoginForm {
    fn validate(&self) -> Validator {
        let mut v = Validator::default();
        v.check_field(not_blank(&self.email), "email", "This field cannot be blank");
        v.check_field(
            matches(&self.email, &EMAIL_RX),
            "email",
            "This field must be a valid email address",
        );
        v.check_field(not_blank(&self.password), "password", "This field cannot be blank");
        v
    }
}

pub async fn user_signup(state: Arc<AppState>, cx: Context) -> Result<Response, AppError> {
    let mut data = template_data(&cx);
    data.form = Some(form_value(&SignupForm::default(), &Validator::default())?);
    render(&state, StatusCode::OK, "signup", &data)
}

pub async fn user_signup_post(state: Arc<AppState>, mut cx: Context) -> Result<Response, AppError> {
    let form: SignupForm = cx.take_form().await?;

    let mut v = form.validate();
    if v.valid() {
        match state.users.insert(&form.name, &form.email, &form.password).await {
            Ok(()) => {
                set_flash(&cx, "Your signup was successful. Please log in.")?;
                return Ok(Redirect::to("/user/login").into_response());
            }
            Err(ModelError::DuplicateEmail) => {
                v.add_field_error("email", "Email address is already in use");
            }
            Err(e) => return Err(e.into()),
        }
    }

    let mut data = template_data(&cx);
    data.form = Some(form_value(&form, &v)?);
    render(&state, StatusCode::UNPROCESSABLE_ENTITY, "signup", &data)
}

pub async fn user_login(state: Arc<AppState>, cx: Context) -> Result<Response, AppError> {
    let mut data = template_data(&cx);
    data.form = Some(form_value(&LoginForm::default(), &Validator::default())?);
    render(&state, StatusCode::OK, "login", &data)
}

pub async fn user_login_post(state: Arc<AppState>, mut cx: Context) -> Result<Response, AppError> {
    let form: LoginForm = cx.take_form().await?;

    let mut v = form.validate();
    if v.valid() {
        match state.users.authenticate(&form.email, &form.password).await {
            Ok(id) => {
                let session = cx.require_session()?;
                // New privilege level, new token.
                session.rotate_token();
                session.insert(AUTHENTICATED_USER_ID, id)?;

                let target = session
                    .pop_string(REDIRECT_AFTER_LOGIN)
                    .filter(|t| safe_redirect_target(t).is_some())
                    .unwrap_or_else(|| DEFAULT_AFTER_LOGIN.to_string());
                tracing::info!(user_id = id, "user logged in");
                return Ok(Redirect::to(&target).into_response());
            }
            Err(ModelError::InvalidCredentials) => {
                v.add_non_field_error("Email or password is incorrect");
            }
            Err(e) => return Err(e.into()),
        }
    }

    let mut data = template_data(&cx);
    data.form = Some(form_value(&form, &v)?);
    render(&state, StatusCode::UNPROCESSABLE_ENTITY, "login", &data)
}

pub async fn user_logout_post(_state: Arc<AppState>, cx: Context) -> Result<Response, AppError> {
    let session = cx.require_session()?;
    session.rotate_token();
    session.remove(AUTHENTICATED_USER_ID);
    set_flash(&cx, "You've been logged out successfully!")?;

    Ok(Redirect::to("/").into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signup_rules() {
        let form = SignupForm {
            name: "".into(),
            email: "not-an-email".into(),
            password: "short".into(),
        };
        let v = form.validate();
        assert_eq!(v.field_errors["name"], "This field cannot be blank");
        assert_eq!(v.field_errors["email"], "This field must be a valid email address");
        assert_eq!(v.field_errors["password"], "This field must be at least 8 characters long");
    }

    #[test]
    fn login_rules() {
        let form = LoginForm {
            email: "alice@example.com".into(),
            password: "".into(),
        };
        let v = form.validate();
        assert!(!v.field_errors.contains_key("email"));
        assert_eq!(v.field_errors["password"], "This field cannot be blank");
    }

    #[test]
    fn passwords_are_never_echoed() {
        let form = SignupForm {
            name: "A".into(),
            email: "a@b.c".into(),
            password: "hunter22".into(),
        };
        let value = serde_json::to_value(&form).unwrap();
        assert!(value.get("password").is_none());
    }
}
