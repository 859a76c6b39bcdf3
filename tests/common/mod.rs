#![allow(dead_code)]

use std::path::PathBuf;

use reqwest::redirect::Policy;
use reqwest::{Client, Response, StatusCode};
use tempfile::TempDir;
use triptych::config::{App, Cli, Config};
use triptych::server;

/// A real server on an ephemeral port with its data in a temporary directory.
pub struct TestServer {
    pub base: String,
    pub data_dir: PathBuf,
    _tmp: TempDir,
}

impl TestServer {
    pub async fn spawn(app: App) -> Self {
        let tmp = TempDir::new().unwrap();
        let cli = Cli {
            app,
            config: None,
            host: None,
            port: None,
            data_dir: Some(tmp.path().to_path_buf()),
        };
        let mut config = Config::load(&cli).unwrap();
        config.auth.bcrypt_cost = 4;
        config.network.page_size = 10;

        let router = server::build_router(app, config).unwrap();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self {
            base: format!("http://{}", addr),
            data_dir: tmp.path().to_path_buf(),
            _tmp: tmp,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// A browser-like client: keeps cookies, does not follow redirects.
    pub fn client(&self) -> Client {
        Client::builder()
            .cookie_store(true)
            .redirect(Policy::none())
            .build()
            .unwrap()
    }

    /// Register `username` and return a client holding its session.
    pub async fn signed_in(&self, username: &str) -> Client {
        let client = self.client();
        let response = client
            .post(self.url("/register"))
            .form(&[
                ("username", username),
                ("email", "someone@example.com"),
                ("password", "secret"),
                ("confirmation", "secret"),
            ])
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        client
    }
}

pub fn location(response: &Response) -> String {
    response
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}
