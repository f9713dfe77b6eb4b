use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, ensure, Result};
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use http_body_util::BodyExt;
use internhub::auth::jwt::JwtService;
use internhub::config::AppConfig;
use internhub::directory::{Project, User, UserType};
use internhub::engine::Engine;
use internhub::mail::{MemoryMailer, OutgoingMail};
use internhub::notify::NotificationDispatcher;
use internhub::routes;
use internhub::state::AppState;
use internhub::store::MemoryStore;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tower::util::ServiceExt;
use uuid::Uuid;

#[derive(Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[allow(dead_code)]
    pub message: Option<String>,
    pub data: T,
}

#[derive(Deserialize)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
}

#[allow(dead_code)]
pub struct TestUser {
    pub user: User,
    pub token: String,
}

impl TestUser {
    pub fn id(&self) -> Uuid {
        self.user.id
    }

    pub fn token(&self) -> Option<&str> {
        Some(&self.token)
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: "postgres://unused@localhost/unused".to_string(),
        database_max_pool_size: 1,
        database_statement_timeout: Duration::from_secs(5),
        store_timeout: Duration::from_secs(5),
        server_host: "127.0.0.1".to_string(),
        server_port: 0,
        jwt_secret: "test-secret".to_string(),
        jwt_issuer: "test-issuer".to_string(),
        jwt_audience: "test-audience".to_string(),
        jwt_expiry_minutes: 60,
        cors_allowed_origin: None,
        smtp: None,
        mail_from: "InternHub <no-reply@internhub.test>".to_string(),
        mail_timeout: Duration::from_secs(2),
        notify_queue_capacity: 64,
    }
}

pub struct TestApp {
    router: Router,
    jwt: JwtService,
    store: Arc<MemoryStore>,
    mailer: Arc<MemoryMailer>,
}

impl TestApp {
    pub fn new() -> Result<Self> {
        Self::with_seed(7)
    }

    #[allow(dead_code)]
    pub fn with_seed(seed: u64) -> Result<Self> {
        let config = test_config();
        let store = Arc::new(MemoryStore::new());
        let mailer = Arc::new(MemoryMailer::new());
        let (notifier, worker) = NotificationDispatcher::new(
            config.notify_queue_capacity,
            store.clone(),
            store.clone(),
            mailer.clone(),
            config.mail_timeout,
        );
        tokio::spawn(worker.run());

        let engine = Engine::with_rng(
            store.clone(),
            store.clone(),
            notifier,
            StdRng::seed_from_u64(seed),
        );
        let jwt = JwtService::from_config(&config)?;
        let state = AppState::new(config, jwt.clone(), engine, store.clone(), store.clone());
        let router = routes::create_router(state);

        Ok(Self {
            router,
            jwt,
            store,
            mailer,
        })
    }

    #[allow(dead_code)]
    pub fn store(&self) -> Arc<MemoryStore> {
        self.store.clone()
    }

    #[allow(dead_code)]
    pub fn mailer(&self) -> Arc<MemoryMailer> {
        self.mailer.clone()
    }

    pub fn add_user(&self, name: &str, user_type: UserType, company: &str) -> Result<TestUser> {
        self.add_user_with(name, user_type, company, |_| {})
    }

    #[allow(dead_code)]
    pub fn add_user_with(
        &self,
        name: &str,
        user_type: UserType,
        company: &str,
        adjust: impl FnOnce(&mut User),
    ) -> Result<TestUser> {
        let mut user = User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: format!(
                "{}@{}.test",
                name.to_ascii_lowercase(),
                company.to_ascii_lowercase()
            ),
            user_type,
            company: Some(company.to_string()),
            verified: true,
            is_approved: true,
        };
        adjust(&mut user);
        self.store.insert_user(user.clone(), "not-a-real-hash")?;
        let token = self.jwt.generate_token(&user)?;
        Ok(TestUser { user, token })
    }

    #[allow(dead_code)]
    pub fn add_project(&self, name: &str, company: &str, approved: bool) -> Result<Project> {
        let project = Project {
            id: Uuid::new_v4(),
            name: name.to_string(),
            company: company.to_string(),
            description: format!("{name} project"),
            skill_requirement: vec!["rust".to_string()],
            estimated_time_to_complete: "3 months".to_string(),
            suggested_by: None,
            is_approved: approved,
            approved_by: None,
            approved_at: None,
            created_at: Utc::now(),
        };
        self.store.insert_project(project.clone())?;
        Ok(project)
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        let mut builder = Request::builder().method(method).uri(path);
        if body.is_some() {
            builder = builder.header("content-type", "application/json");
        }
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = builder.body(body.map(Body::from).unwrap_or_else(Body::empty))?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        let body = serde_json::to_vec(payload)?;
        self.send(Method::POST, path, Some(body), token).await
    }

    #[allow(dead_code)]
    pub async fn put_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        let body = serde_json::to_vec(payload)?;
        self.send(Method::PUT, path, Some(body), token).await
    }

    #[allow(dead_code)]
    pub async fn delete_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        let body = serde_json::to_vec(payload)?;
        self.send(Method::DELETE, path, Some(body), token).await
    }

    #[allow(dead_code)]
    pub async fn post_raw(
        &self,
        path: &str,
        raw: &str,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        self.send(Method::POST, path, Some(raw.as_bytes().to_vec()), token)
            .await
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> Result<hyper::Response<Body>> {
        self.send(Method::GET, path, None, token).await
    }

    /// Polls the in-memory mailer until at least `count` messages arrived.
    #[allow(dead_code)]
    pub async fn wait_for_mail(&self, count: usize) -> Result<Vec<OutgoingMail>> {
        for _ in 0..100 {
            let sent = self.mailer.sent();
            if sent.len() >= count {
                return Ok(sent);
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        Err(anyhow!(
            "expected {count} mails, got {}",
            self.mailer.sent().len()
        ))
    }
}

pub async fn body_to_vec(body: Body) -> Result<Vec<u8>> {
    let collected = body
        .collect()
        .await
        .map_err(|err| anyhow!("failed to read body: {err}"))?;
    Ok(collected.to_bytes().to_vec())
}

/// Asserts the status and decodes the success envelope.
pub async fn expect_data<T: DeserializeOwned>(
    response: hyper::Response<Body>,
    status: StatusCode,
) -> Result<T> {
    let actual = response.status();
    let body = body_to_vec(response.into_body()).await?;
    ensure!(
        actual == status,
        "expected {status}, got {actual}: {}",
        String::from_utf8_lossy(&body)
    );
    let envelope: Envelope<T> = serde_json::from_slice(&body)?;
    ensure!(envelope.success, "success flag not set");
    Ok(envelope.data)
}

/// Asserts the status and decodes the error envelope.
#[allow(dead_code)]
pub async fn expect_error(response: hyper::Response<Body>, status: StatusCode) -> Result<String> {
    let actual = response.status();
    let body = body_to_vec(response.into_body()).await?;
    ensure!(
        actual == status,
        "expected {status}, got {actual}: {}",
        String::from_utf8_lossy(&body)
    );
    let error: ErrorBody = serde_json::from_slice(&body)?;
    ensure!(!error.success, "success flag set on error");
    Ok(error.message)
}
