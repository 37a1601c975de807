//! Shared utilities for integration tests.
//!
//! Boots the real server on an ephemeral port and drives it over HTTP.
//! Cookies are tracked by hand: the session cookie is `Secure`, and the
//! tests need to see exactly when the token rotates.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use regex::Regex;
use reqwest::header::{COOKIE, LOCATION, SET_COOKIE};
use reqwest::{redirect, Response, StatusCode};
use tokio::net::TcpListener;

use snippetbox::config::AppConfig;
use snippetbox::{AppState, HttpServer, Shutdown};

pub struct TestApp {
    pub base: String,
    client: reqwest::Client,
    cookie: Mutex<Option<String>>,
    shutdown: Shutdown,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub async fn spawn_app() -> TestApp {
    let mut config = AppConfig::default();
    config.http.static_dir = PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/ui/static"));

    let state = Arc::new(AppState::in_memory(config).expect("templates compile"));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(state);
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        server.run(listener, rx).await.unwrap();
    });

    let client = reqwest::Client::builder()
        .redirect(redirect::Policy::none())
        .build()
        .unwrap();

    TestApp {
        base: format!("http://{}", addr),
        client,
        cookie: Mutex::new(None),
        shutdown,
    }
}

impl TestApp {
    /// The `session=...` pair currently held, if any.
    pub fn session_cookie(&self) -> Option<String> {
        self.cookie.lock().unwrap().clone()
    }

    pub fn set_session_cookie(&self, cookie: Option<String>) {
        *self.cookie.lock().unwrap() = cookie;
    }

    fn remember(&self, response: &Response) {
        for value in response.headers().get_all(SET_COOKIE) {
            let raw = value.to_str().unwrap();
            let pair = raw.split(';').next().unwrap().trim().to_string();
            if !pair.starts_with("session=") {
                continue;
            }
            let expired = raw.to_ascii_lowercase().contains("max-age=0");
            self.set_session_cookie((!expired).then_some(pair));
        }
    }

    fn with_cookie(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.session_cookie() {
            Some(cookie) => builder.header(COOKIE, cookie),
            None => builder,
        }
    }

    pub async fn get(&self, path: &str) -> Response {
        let request = self.with_cookie(self.client.get(format!("{}{}", self.base, path)));
        let response = request.send().await.unwrap();
        self.remember(&response);
        response
    }

    pub async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> Response {
        let request = self.with_cookie(self.client.post(format!("{}{}", self.base, path)).form(form));
        let response = request.send().await.unwrap();
        self.remember(&response);
        response
    }

    /// GET `path` and pull the CSRF token out of the rendered page.
    pub async fn csrf_token(&self, path: &str) -> String {
        let body = self.get(path).await.text().await.unwrap();
        extract_csrf_token(&body).expect("page has a csrf_token field")
    }

    pub async fn signup(&self, name: &str, email: &str, password: &str) -> Response {
        let token = self.csrf_token("/user/signup").await;
        self.post_form(
            "/user/signup",
            &[("name", name), ("email", email), ("password", password), ("csrf_token", &token)],
        )
        .await
    }

    pub async fn login(&self, email: &str, password: &str) -> Response {
        let token = self.csrf_token("/user/login").await;
        self.post_form(
            "/user/login",
            &[("email", email), ("password", password), ("csrf_token", &token)],
        )
        .await
    }

    /// Sign up and log in a fresh user; returns the login response.
    pub async fn signup_and_login(&self, email: &str, password: &str) -> Response {
        let response = self.signup("Test User", email, password).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        self.login(email, password).await
    }
}

pub fn extract_csrf_token(body: &str) -> Option<String> {
    let rx = Regex::new(r#"<input type="hidden" name="csrf_token" value="([^"]+)">"#).unwrap();
    rx.captures(body).map(|c| c[1].to_string())
}

pub fn location(response: &Response) -> &str {
    response.headers()[LOCATION].to_str().unwrap()
}
