use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::handlers::{form_value, render, set_flash, template_data, AppState};
use crate::http::context::Context;
use crate::models::ModelError;
use crate::security::auth::LOGIN_PATH;
use crate::templates::UserView;
use crate::validator::{min_chars, not_blank, Validator};

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PasswordUpdateForm {
    #[serde(skip_serializing)]
    pub current_password: String,
    #[serde(skip_serializing)]
    pub new_password: String,
    #[serde(skip_serializing)]
    pub new_password_confirmation: String,
}

impl PasswordUpdateForm {
    fn validate(&self) -> Validator {
        let mut v = Validator::default();
        v.check_field(
            not_blank(&self.current_password),
            "currentPassword",
            "This field cannot be blank",
        );
        v.check_field(not_blank(&self.new_password), "newPassword", "This field cannot be blank");
        v.check_field(
            min_chars(&self.new_password, 8),
            "newPassword",
            "This field must be at least 8 characters long",
        );
        v.check_field(
            not_blank(&self.new_password_confirmation),
            "newPasswordConfirmation",
            "This field cannot be blank",
        );
        v.check_field(
            self.new_password == self.new_password_confirmation,
            "newPasswordConfirmation",
            "Passwords do not match",
        );
        v
    }
}

pub async fn account_view(state: Arc<AppState>, cx: Context) -> Result<Response, AppError> {
    let Some(id) = cx.auth().user_id() else {
        return Ok(Redirect::to(LOGIN_PATH).into_response());
    };

    let user = match state.users.get(id).await {
        Ok(user) => user,
        Err(ModelError::NoRecord) => return Ok(Redirect::to(LOGIN_PATH).into_response()),
        Err(e) => return Err(e.into()),
    };

    let mut data = template_data(&cx);
    data.user = Some(UserView::from(user));
    render(&state, StatusCode::OK, "account", &data)
}

pub async fn account_password_update(state: Arc<AppState>, cx: Context) -> Result<Response, AppError> {
    let mut data = template_data(&cx);
    data.form = Some(form_value(&PasswordUpdateForm::default(), &Validator::default())?);
    render(&state, StatusCode::OK, "password", &data)
}

pub async fn account_password_update_post(
    state: Arc<AppState>,
    mut cx: Context,
) -> Result<Response, AppError> {
    let form: PasswordUpdateForm = cx.take_form().await?;
    let Some(id) = cx.auth().user_id() else {
        return Ok(Redirect::to(LOGIN_PATH).into_response());
    };

    let mut v = form.validate();
    if v.valid() {
        match state
            .users
            .password_update(id, &form.current_password, &form.new_password)
            .await
        {
            Ok(()) => {
                set_flash(&cx, "Your password has been updated!")?;
                return Ok(Redirect::to("/account/view").into_response());
            }
            Err(ModelError::InvalidCredentials) => {
                v.add_field_error("currentPassword", "Current password is incorrect");
            }
            Err(e) => return Err(e.into()),
        }
    }

    let mut data = template_data(&cx);
    data.form = Some(form_value(&form, &v)?);
    render(&state, StatusCode::UNPROCESSABLE_ENTITY, "password", &data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_rules() {
        let form = PasswordUpdateForm {
            current_password: "".into(),
            new_password: "short".into(),
            new_password_confirmation: "different".into(),
        };
        let v = form.validate();
        assert_eq!(v.field_errors["currentPassword"], "This field cannot be blank");
        assert_eq!(v.field_errors["newPassword"], "This field must be at least 8 characters long");
        assert_eq!(v.field_errors["newPasswordConfirmation"], "Passwords do not match");
    }

    #[test]
    fn form_field_names() {
        let form: PasswordUpdateForm = serde_json::from_value(serde_json::json!({
            "currentPassword": "old",
            "newPassword": "newpassword",
            "newPasswordConfirmation": "newpassword",
        }))
        .unwrap();
        assert_eq!(form.current_password, "old");
        assert!(form.validate().valid());
    }
}
