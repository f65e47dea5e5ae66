use std::path::Path;
use std::sync::Arc;

use reqwest::multipart::{Form, Part};
use reqwest::{Client, Url};
use serde_json::Value;
use thiserror::Error;

use crate::config::{CalibrationMode, TrackerConfig};
use crate::normalizer::{RawResponse, ShapeError, normalize};
use crate::types::{CalibrationParams, Trajectory};

/// Shown when a failure carries no description of its own.
pub const FALLBACK_MESSAGE: &str = "An error occurred";

const ZIP_MIME: &str = "application/zip";

#[derive(Debug, Error)]
pub enum UploadError {
    /// The service answered but reported an `error` in the body.
    #[error("{0}")]
    Service(String),

    /// The request failed or the body was not JSON.
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    #[error("{0}")]
    Shape(#[from] ShapeError),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum UploadState {
    #[default]
    Idle,
    Loading,
    Error(String),
    Ready(Arc<Trajectory>),
}

impl UploadState {
    pub fn is_loading(&self) -> bool {
        matches!(self, UploadState::Loading)
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            UploadState::Error(message) => Some(message),
            _ => None,
        }
    }

    pub fn trajectory(&self) -> Option<&Arc<Trajectory>> {
        match self {
            UploadState::Ready(t) => Some(t),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            UploadState::Idle => "idle",
            UploadState::Loading => "loading",
            UploadState::Error(_) => "error",
            UploadState::Ready(_) => "ready",
        }
    }
}

#[derive(Debug, Clone)]
pub enum UploadEvent {
    Started,
    Succeeded(Arc<Trajectory>),
    Failed(String),
}

/// Upload lifecycle state machine.
///
/// `Started` is accepted from every state and clears a previous error.
/// Outcomes are only accepted while `Loading`.
pub fn transition(state: &UploadState, event: UploadEvent) -> UploadState {
    match (state, event) {
        (_, UploadEvent::Started) => UploadState::Loading,
        (UploadState::Loading, UploadEvent::Succeeded(t)) => UploadState::Ready(t),
        (UploadState::Loading, UploadEvent::Failed(message)) => UploadState::Error(message),
        (s, _) => {
            log::debug!("ignoring outcome in state {}", s.name());
            s.clone()
        }
    }
}

/// An archive picked by the operator.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> UploadFile {
        UploadFile {
            name: name.into(),
            bytes,
        }
    }

    pub fn from_path(path: &Path) -> std::io::Result<UploadFile> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.zip".to_string());
        Ok(UploadFile { name, bytes })
    }
}

/// File picker filter: only `.zip` archives are offered for upload.
pub fn is_archive(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
}

/// Odometry service endpoint.
#[allow(async_fn_in_trait)]
pub trait TrajectoryService {
    /// Sends the archive and returns the decoded JSON body.
    async fn upload(
        &self,
        file: &UploadFile,
        calibration: Option<&CalibrationParams>,
    ) -> Result<Value, UploadError>;
}

/// [`TrajectoryService`] over HTTP. No retry and no timeout.
#[derive(Debug, Clone)]
pub struct HttpService {
    client: Client,
    upload_url: Url,
    health_url: Url,
}

impl HttpService {
    pub fn new(upload_url: Url, health_url: Url) -> HttpService {
        HttpService {
            client: Client::new(),
            upload_url,
            health_url,
        }
    }

    pub fn from_config(config: &TrackerConfig) -> crate::error::Result<HttpService> {
        Ok(HttpService::new(config.upload_url()?, config.health_url()?))
    }

    /// Queries the health endpoint and returns the reported status.
    pub async fn health(&self) -> Result<String, UploadError> {
        let body: Value = self
            .client
            .get(self.health_url.clone())
            .send()
            .await?
            .json()
            .await?;
        let raw = RawResponse::from_value(body.clone())?;
        if let Some(message) = raw.service_error() {
            return Err(UploadError::Service(message));
        }
        Ok(body
            .get("status")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string())
    }
}

impl TrajectoryService for HttpService {
    async fn upload(
        &self,
        file: &UploadFile,
        calibration: Option<&CalibrationParams>,
    ) -> Result<Value, UploadError> {
        let part = Part::bytes(file.bytes.clone())
            .file_name(file.name.clone())
            .mime_str(ZIP_MIME)?;
        let mut form = Form::new().part("file", part);
        if let Some(calibration) = calibration {
            for (name, value) in calibration.form_fields() {
                form = form.text(name, value);
            }
        }

        log::info!(
            "uploading {} ({} bytes) to {}",
            file.name,
            file.bytes.len(),
            self.upload_url
        );
        let response = self
            .client
            .post(self.upload_url.clone())
            .multipart(form)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            // still decoded, the body may carry an `error` field
            log::warn!("upload answered with status {}", status);
        }
        Ok(response.json::<Value>().await?)
    }
}

/// Issued by [`UploadController::begin`], redeemed by [`UploadController::complete`].
#[derive(Debug)]
pub struct RequestTicket {
    generation: u64,
}

impl RequestTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Owns the upload lifecycle and the last successfully loaded trajectory.
pub struct UploadController<S> {
    service: S,
    mode: CalibrationMode,
    state: UploadState,
    displayed: Option<Arc<Trajectory>>,
    generation: u64,
}

impl<S: TrajectoryService> UploadController<S> {
    pub fn new(service: S, mode: CalibrationMode) -> UploadController<S> {
        UploadController {
            service,
            mode,
            state: UploadState::Idle,
            displayed: None,
            generation: 0,
        }
    }

    pub fn state(&self) -> &UploadState {
        &self.state
    }

    pub fn error(&self) -> Option<&str> {
        self.state.error()
    }

    /// Trajectory on display. Survives later failed uploads.
    pub fn trajectory(&self) -> Option<&Arc<Trajectory>> {
        self.displayed.as_ref()
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// Runs one upload attempt. Without a file nothing happens.
    pub async fn submit(
        &mut self,
        file: Option<&UploadFile>,
        calibration: &CalibrationParams,
    ) -> &UploadState {
        let Some(file) = file else {
            log::debug!("no file selected");
            return &self.state;
        };
        let ticket = self.begin();
        let outcome = self.request(file, calibration).await;
        self.complete(ticket, outcome);
        &self.state
    }

    /// Enters `Loading` and starts a new request generation.
    pub fn begin(&mut self) -> RequestTicket {
        self.generation += 1;
        self.apply(UploadEvent::Started);
        RequestTicket {
            generation: self.generation,
        }
    }

    /// Applies the outcome of a request. Returns `false` when a newer request
    /// was started in the meantime and the outcome was dropped.
    pub fn complete(
        &mut self,
        ticket: RequestTicket,
        outcome: Result<Trajectory, UploadError>,
    ) -> bool {
        if ticket.generation != self.generation {
            log::debug!(
                "discarding response of request {} (latest is {})",
                ticket.generation,
                self.generation
            );
            return false;
        }
        let event = match outcome {
            Ok(trajectory) => {
                log::info!("received trajectory with {} frames", trajectory.len());
                UploadEvent::Succeeded(Arc::new(trajectory))
            }
            Err(e) => {
                log::warn!("upload failed: {}", e);
                UploadEvent::Failed(failure_message(&e))
            }
        };
        self.apply(event);
        if let UploadState::Ready(t) = &self.state {
            self.displayed = Some(t.clone());
        }
        true
    }

    async fn request(
        &self,
        file: &UploadFile,
        calibration: &CalibrationParams,
    ) -> Result<Trajectory, UploadError> {
        let calibration = match self.mode {
            CalibrationMode::Forward => Some(calibration),
            CalibrationMode::Withhold => None,
        };
        let body = self.service.upload(file, calibration).await?;
        let raw = RawResponse::from_value(body)?;
        if let Some(message) = raw.service_error() {
            return Err(UploadError::Service(message));
        }
        Ok(normalize(&raw)?)
    }

    fn apply(&mut self, event: UploadEvent) {
        let next = transition(&self.state, event);
        log::debug!("upload state {} -> {}", self.state.name(), next.name());
        self.state = next;
    }
}

fn failure_message(e: &UploadError) -> String {
    let message = e.to_string();
    if message.trim().is_empty() {
        FALLBACK_MESSAGE.to_string()
    } else {
        message
    }
}
