//! Authenticated HTTP client for the control plane.

use std::io;
use std::time::Duration;

use futures::{StreamExt, TryStreamExt};
use reqwest::header::AUTHORIZATION;
use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use tracing::debug;

use super::models::{App, LoginRequest, LoginResponse, NewApp, PatchAppRequest, Team, User};
use super::server::ServerUrl;
use crate::deploy::{AppIdentity, ControlPlane, DeploymentRequest, ResponseStream};
use crate::error::{ApiError, DeployError};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const LOOKUP_TIMEOUT: Duration = Duration::from_secs(60);

/// Client bound to one cluster's server and token.
#[derive(Debug, Clone)]
pub struct TeresaClient {
    http: reqwest::Client,
    server: ServerUrl,
    token: Option<String>,
}

impl TeresaClient {
    pub fn new(server: ServerUrl, token: Option<String>) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("teresa/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            server,
            token: token.filter(|t| !t.is_empty()),
        })
    }

    pub fn server(&self) -> &ServerUrl {
        &self.server
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => builder.header(AUTHORIZATION, token),
            None => builder,
        }
    }

    async fn get(&self, segments: &[&str]) -> Result<Response, ApiError> {
        let url = self.server.endpoint(segments)?;
        debug!(url = %url, "GET");
        let response = self
            .authorized(self.http.get(url))
            .timeout(LOOKUP_TIMEOUT)
            .send()
            .await?;
        check_status(response).await
    }

    async fn send_json<B: Serialize + ?Sized>(
        &self,
        method: Method,
        segments: &[&str],
        body: &B,
    ) -> Result<Response, ApiError> {
        let url = self.server.endpoint(segments)?;
        debug!(url = %url, method = %method, "sending JSON");
        let response = self
            .authorized(self.http.request(method, url))
            .timeout(LOOKUP_TIMEOUT)
            .json(body)
            .send()
            .await?;
        check_status(response).await
    }

    /// Exchange credentials for an API token.
    pub async fn login(&self, email: &str, password: &str) -> Result<String, ApiError> {
        let url = self.server.endpoint(&["login"])?;
        let response = self
            .http
            .post(url)
            .timeout(LOOKUP_TIMEOUT)
            .json(&LoginRequest { email, password })
            .send()
            .await?;
        let body: LoginResponse = check_status(response).await?.json().await?;
        Ok(body.token)
    }

    /// The current user with their teams and apps.
    pub async fn me(&self) -> Result<User, ApiError> {
        Ok(self.get(&["users", "me"]).await?.json().await?)
    }

    pub async fn apps(&self) -> Result<Vec<App>, ApiError> {
        Ok(self.get(&["apps"]).await?.json().await?)
    }

    pub async fn app_info(&self, name: &str) -> Result<App, ApiError> {
        Ok(self.get(&["apps", name]).await?.json().await?)
    }

    pub async fn teams(&self) -> Result<Vec<Team>, ApiError> {
        Ok(self.get(&["teams"]).await?.json().await?)
    }

    pub async fn create_app(&self, app: &NewApp) -> Result<App, ApiError> {
        debug!(app = %app.name, scale = app.scale, "creating app");
        Ok(self
            .send_json(Method::POST, &["apps"], app)
            .await?
            .json()
            .await?)
    }

    /// Apply env var operations to an app and return its updated state.
    pub async fn patch_app(
        &self,
        name: &str,
        operations: &[PatchAppRequest],
    ) -> Result<App, ApiError> {
        Ok(self
            .send_json(Method::PATCH, &["apps", name], operations)
            .await?
            .json()
            .await?)
    }

    async fn resolve_in_team(&self, name: &str, team: &str) -> Result<AppIdentity, DeployError> {
        let me = self.me().await?;
        let found = me
            .teams
            .iter()
            .find(|t| t.name == team)
            .ok_or_else(|| DeployError::ApplicationNotFound(format!("team '{team}'")))?;

        if !found.apps.iter().any(|a| a.name == name) {
            return Err(DeployError::ApplicationNotFound(format!(
                "'{name}' in team '{team}'"
            )));
        }

        Ok(AppIdentity {
            name: name.to_string(),
            team: Some(found.name.clone()),
        })
    }
}

impl ControlPlane for TeresaClient {
    async fn resolve_application(
        &self,
        name: &str,
        team: Option<&str>,
    ) -> Result<AppIdentity, DeployError> {
        if let Some(team) = team {
            return self.resolve_in_team(name, team).await;
        }

        match self.app_info(name).await {
            Ok(app) => Ok(AppIdentity {
                name: app.name,
                team: app.team,
            }),
            Err(e) if e.is_not_found() => Err(DeployError::ApplicationNotFound(format!("'{name}'"))),
            Err(e) => Err(e.into()),
        }
    }

    async fn create_deployment(
        &self,
        request: DeploymentRequest,
    ) -> Result<ResponseStream, DeployError> {
        let DeploymentRequest {
            application,
            description,
            archive,
            ..
        } = request;

        let url = self
            .server
            .endpoint(&["apps", application.name.as_str(), "deployments"])?;

        let len = archive.len();
        let file_name = archive.file_name().to_string();
        let body = reqwest::Body::wrap_stream(archive.into_stream());
        let tarball = Part::stream_with_length(body, len)
            .file_name(file_name)
            .mime_str("application/gzip")
            .map_err(DeployError::upload_error)?;

        let mut form = Form::new();
        if let Some(description) = description {
            form = form.text("description", description);
        }
        let form = form.part("app_tarball", tarball);

        debug!(url = %url, archive_bytes = len, "POST deployment");
        let response = self
            .authorized(self.http.post(url))
            .multipart(form)
            .send()
            .await
            .map_err(DeployError::upload_error)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(DeployError::ApplicationNotFound(format!(
                "'{}'",
                application.name
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DeployError::upload_error(ApiError::Status {
                status: status.as_u16(),
                body: body.trim().to_string(),
            }));
        }

        Ok(response.bytes_stream().map_err(io::Error::other).boxed())
    }
}

async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ApiError::Unauthorized),
        StatusCode::NOT_FOUND => Err(ApiError::NotFound(response.url().path().to_string())),
        _ => {
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::Status {
                status: status.as_u16(),
                body: body.trim().to_string(),
            })
        }
    }
}
