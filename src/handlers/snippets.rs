use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::handlers::{form_value, render, set_flash, template_data, AppState};
use crate::http::context::Context;
use crate::models::SnippetId;
use crate::templates::SnippetView;
use crate::validator::{max_chars, not_blank, permitted_value, Validator};

const EXPIRY_DAYS: [i64; 3] = [1, 7, 365];

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SnippetCreateForm {
    pub title: String,
    pub content: String,
    pub expires: i64,
}

impl SnippetCreateForm {
    fn validate(&self) -> Validator {
        let mut v = Validator::default();
        v.check_field(not_blank(&self.title), "title", "This field cannot be blank");
        v.check_field(
            max_chars(&self.title, 100),
            "title",
            "This field cannot be more than 100 characters long",
        );
        v.check_field(not_blank(&self.content), "content", "This field cannot be blank");
        v.check_field(
            permitted_value(&self.expires, &EXPIRY_DAYS),
            "expires",
            "This field must equal 1, 7 or 365",
        );
        v
    }
}

/// Only positive integers name a snippet.
fn parse_id(raw: Option<&str>) -> Option<SnippetId> {
    raw?.parse::<SnippetId>().ok().filter(|id| *id > 0)
}

pub async fn snippet_view(state: Arc<AppState>, cx: Context) -> Result<Response, AppError> {
    let id = parse_id(cx.param("id")).ok_or(AppError::NotFound)?;
    let snippet = state.snippets.get(id).await?;

    let mut data = template_data(&cx);
    data.snippet = Some(SnippetView::from(snippet));
    render(&state, StatusCode::OK, "view", &data)
}

pub async fn snippet_create(state: Arc<AppState>, cx: Context) -> Result<Response, AppError> {
    let form = SnippetCreateForm {
        expires: 365,
        ..Default::default()
    };

    let mut data = template_data(&cx);
    data.form = Some(form_value(&form, &Validator::default())?);
    render(&state, StatusCode::OK, "create", &data)
}

pub async fn snippet_create_post(state: Arc<AppState>, mut cx: Context) -> Result<Response, AppError> {
    let form: SnippetCreateForm = cx.take_form().await?;

    let v = form.validate();
    if !v.valid() {
        let mut data = template_data(&cx);
        data.form = Some(form_value(&form, &v)?);
        return render(&state, StatusCode::UNPROCESSABLE_ENTITY, "create", &data);
    }

    let id = state
        .snippets
        .insert(&form.title, &form.content, form.expires)
        .await?;
    set_flash(&cx, "Snippet successfully created!")?;

    Ok(Redirect::to(&format!("/snippet/view/{}", id)).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_must_be_positive_integers() {
        assert_eq!(parse_id(Some("1")), Some(1));
        assert_eq!(parse_id(Some("42")), Some(42));
        for bad in ["-1", "0", "1.23", "foo", ""] {
            assert_eq!(parse_id(Some(bad)), None, "{:?}", bad);
        }
        assert_eq!(parse_id(None), None);
    }

    #[test]
    fn create_form_rules() {
        let ok = SnippetCreateForm {
            title: "O snail".into(),
            content: "Climb Mount Fuji".into(),
            expires: 7,
        };
        assert!(ok.validate().valid());

        let bad = SnippetCreateForm {
            title: "x".repeat(101),
            content: " ".into(),
            expires: 30,
        };
        let v = bad.validate();
        assert_eq!(v.field_errors["title"], "This field cannot be more than 100 characters long");
        assert_eq!(v.field_errors["content"], "This field cannot be blank");
        assert_eq!(v.field_errors["expires"], "This field must equal 1, 7 or 365");
    }
}
