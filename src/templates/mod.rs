//! Page rendering.
//!
//! Every page is compiled into one immutable environment at startup, so
//! concurrent requests read it without locking. Pages live in `ui/html` and
//! are embedded in the binary.

use minijinja::Environment;
use serde::Serialize;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

use crate::models::{Snippet, User};

const BASE: &str = "base.html";

/// `(name, source)` for every template, layouts and partials included.
const SOURCES: &[(&str, &str)] = &[
    (BASE, include_str!("../../ui/html/base.html")),
    ("partials/nav.html", include_str!("../../ui/html/partials/nav.html")),
    ("home.html", include_str!("../../ui/html/pages/home.html")),
    ("about.html", include_str!("../../ui/html/pages/about.html")),
    ("view.html", include_str!("../../ui/html/pages/view.html")),
    ("create.html", include_str!("../../ui/html/pages/create.html")),
    ("signup.html", include_str!("../../ui/html/pages/signup.html")),
    ("login.html", include_str!("../../ui/html/pages/login.html")),
    ("account.html", include_str!("../../ui/html/pages/account.html")),
    ("password.html", include_str!("../../ui/html/pages/password.html")),
];

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("the template {0} does not exist")]
    MissingPage(String),

    #[error(transparent)]
    Template(#[from] minijinja::Error),
}

/// Format a timestamp as `17 Mar 2024 at 10:15` in UTC; empty for none.
pub fn human_date(t: Option<OffsetDateTime>) -> String {
    let Some(t) = t else {
        return String::new();
    };
    t.to_offset(UtcOffset::UTC)
        .format(format_description!("[day] [month repr:short] [year] at [hour]:[minute]"))
        .unwrap_or_default()
}

#[derive(Debug, Clone, Serialize)]
pub struct SnippetView {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub created: String,
    pub expires: String,
}

impl From<Snippet> for SnippetView {
    fn from(s: Snippet) -> Self {
        Self {
            id: s.id,
            title: s.title,
            content: s.content,
            created: human_date(Some(s.created)),
            expires: human_date(Some(s.expires)),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UserView {
    pub name: String,
    pub email: String,
    pub created: String,
}

impl From<User> for UserView {
    fn from(u: User) -> Self {
        Self {
            name: u.name,
            email: u.email,
            created: human_date(Some(u.created)),
        }
    }
}

/// Everything a page can show.
#[derive(Debug, Default, Serialize)]
pub struct TemplateData {
    pub current_year: i32,
    pub flash: Option<String>,
    pub is_authenticated: bool,
    pub csrf_token: String,
    pub snippet: Option<SnippetView>,
    pub snippets: Vec<SnippetView>,
    pub user: Option<UserView>,
    pub form: Option<serde_json::Value>,
}

/// Compiled pages, shared read-only across requests.
pub struct TemplateCache {
    env: Environment<'static>,
}

impl TemplateCache {
    /// Compile every page. Fails on the first template that does not parse.
    pub fn new() -> Result<Self, RenderError> {
        let mut env = Environment::new();
        for &(name, source) in SOURCES {
            env.add_template(name, source)?;
        }
        tracing::debug!(templates = SOURCES.len(), "Template cache built");
        Ok(Self { env })
    }

    /// Render `page` (e.g. `"home"`) with `data`.
    pub fn render(&self, page: &str, data: &TemplateData) -> Result<String, RenderError> {
        let name = format!("{}.html", page);
        if name == BASE || name.starts_with("partials/") {
            return Err(RenderError::MissingPage(page.to_string()));
        }
        let template = self
            .env
            .get_template(&name)
            .map_err(|_| RenderError::MissingPage(page.to_string()))?;
        Ok(template.render(data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn human_date_formats() {
        assert_eq!(human_date(Some(datetime!(2024-03-17 10:15 UTC))), "17 Mar 2024 at 10:15");
        assert_eq!(human_date(None), "");
        assert_eq!(human_date(Some(datetime!(2024-03-17 10:15 +1))), "17 Mar 2024 at 09:15");
    }

    #[test]
    fn pages_render_and_escape() {
        let cache = TemplateCache::new().unwrap();
        let data = TemplateData {
            current_year: 2024,
            flash: Some("<b>Saved</b>".into()),
            csrf_token: "tok".into(),
            ..Default::default()
        };

        let html = cache.render("home", &data).unwrap();
        assert!(html.contains("There's nothing to see here... yet!"));
        assert!(html.contains("&lt;b&gt;Saved"));
        assert!(!html.contains("<b>Saved"));
        assert!(html.contains("2024"));
    }

    #[test]
    fn forms_carry_csrf_token() {
        let cache = TemplateCache::new().unwrap();
        let data = TemplateData {
            csrf_token: "abc123".into(),
            ..Default::default()
        };
        for page in ["create", "signup", "login", "password"] {
            let html = cache.render(page, &data).unwrap();
            assert!(
                html.contains(r#"name="csrf_token" value="abc123""#),
                "{} has no token field",
                page
            );
        }
    }

    #[test]
    fn unknown_page() {
        let cache = TemplateCache::new().unwrap();
        assert!(matches!(
            cache.render("missing", &TemplateData::default()),
            Err(RenderError::MissingPage(_))
        ));
        assert!(matches!(
            cache.render("base", &TemplateData::default()),
            Err(RenderError::MissingPage(_))
        ));
    }
}
