#![allow(dead_code)]

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use futures::{StreamExt, stream};
use tokio::sync::Notify;

use teresa_core::deploy::{AppIdentity, ControlPlane, DeploymentRequest, ResponseStream};
use teresa_core::error::DeployError;

/// How a scripted response ends after its chunks.
#[derive(Clone)]
pub enum Tail {
    Close,
    Hang,
    Error(String),
}

/// Scripted response for one application.
#[derive(Clone)]
pub struct Script {
    pub chunks: Vec<String>,
    pub tail: Tail,
    /// Wait for this before sending anything.
    pub gate: Option<Arc<Notify>>,
    pub reject: Option<String>,
}

impl Script {
    pub fn lines(lines: &[&str]) -> Self {
        Self {
            chunks: lines.iter().map(|l| format!("{l}\n")).collect(),
            tail: Tail::Close,
            gate: None,
            reject: None,
        }
    }

    pub fn then(mut self, tail: Tail) -> Self {
        self.tail = tail;
        self
    }

    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn rejected(reason: &str) -> Self {
        Self {
            chunks: Vec::new(),
            tail: Tail::Close,
            gate: None,
            reject: Some(reason.to_string()),
        }
    }
}

/// What the fake saw for one deploy call.
#[derive(Debug, Clone)]
pub struct Received {
    pub application: AppIdentity,
    pub description: Option<String>,
    pub archive_path: PathBuf,
    pub archive_bytes: Vec<u8>,
}

/// In-memory control plane.
#[derive(Default)]
pub struct FakePlane {
    scripts: HashMap<String, Script>,
    teams: HashMap<String, String>,
    received: Mutex<Vec<Received>>,
    resolve_calls: Mutex<usize>,
}

impl FakePlane {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_app(mut self, name: &str, script: Script) -> Self {
        self.scripts.insert(name.to_string(), script);
        self
    }

    pub fn with_team_app(mut self, team: &str, name: &str, script: Script) -> Self {
        self.teams.insert(name.to_string(), team.to_string());
        self.scripts.insert(name.to_string(), script);
        self
    }

    pub fn received(&self) -> Vec<Received> {
        self.received.lock().unwrap().clone()
    }

    pub fn resolve_calls(&self) -> usize {
        *self.resolve_calls.lock().unwrap()
    }
}

impl ControlPlane for FakePlane {
    async fn resolve_application(
        &self,
        name: &str,
        team: Option<&str>,
    ) -> Result<AppIdentity, DeployError> {
        *self.resolve_calls.lock().unwrap() += 1;
        if !self.scripts.contains_key(name) {
            return Err(DeployError::ApplicationNotFound(name.to_string()));
        }
        let owner = self.teams.get(name).cloned();
        if let Some(team) = team {
            if owner.as_deref() != Some(team) {
                return Err(DeployError::ApplicationNotFound(format!("{name} in {team}")));
            }
        }
        Ok(AppIdentity {
            name: name.to_string(),
            team: owner,
        })
    }

    async fn create_deployment(
        &self,
        request: DeploymentRequest,
    ) -> Result<ResponseStream, DeployError> {
        let script = self
            .scripts
            .get(&request.application.name)
            .cloned()
            .ok_or_else(|| DeployError::ApplicationNotFound(request.application.name.clone()))?;

        let archive_path = request.artifact.path.clone();
        let mut archive_bytes = Vec::new();
        let mut body = request.archive.into_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| DeployError::upload_failed(e.to_string()))?;
            archive_bytes.extend_from_slice(&chunk);
        }

        self.received.lock().unwrap().push(Received {
            application: request.application,
            description: request.description,
            archive_path: archive_path.clone(),
            archive_bytes,
        });

        if let Some(reason) = script.reject {
            return Err(DeployError::upload_failed(reason));
        }

        let head: ResponseStream = match script.gate {
            Some(gate) => stream::once(async move {
                gate.notified().await;
                let status = if archive_path.exists() {
                    "archive still present\n"
                } else {
                    "archive vanished\n"
                };
                Ok(Bytes::from(status))
            })
            .boxed(),
            None => stream::empty().boxed(),
        };
        let chunks = stream::iter(
            script
                .chunks
                .into_iter()
                .map(|c| Ok::<_, io::Error>(Bytes::from(c))),
        );

        let body = head.chain(chunks);
        let stream: ResponseStream = match script.tail {
            Tail::Close => body.boxed(),
            Tail::Hang => body.chain(stream::pending()).boxed(),
            Tail::Error(reason) => body
                .chain(stream::once(async move {
                    Err(io::Error::new(io::ErrorKind::ConnectionReset, reason))
                }))
                .boxed(),
        };
        Ok(stream)
    }
}

pub fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create_dir_all should succeed in test temp dirs");
    }
    std::fs::write(path, content).expect("write should succeed in test temp dirs");
}

/// Files left in a directory, for cleanup assertions.
pub fn leftover_files(dir: &Path) -> Vec<PathBuf> {
    std::fs::read_dir(dir)
        .expect("read_dir should succeed")
        .map(|e| e.expect("entry should be readable").path())
        .collect()
}
