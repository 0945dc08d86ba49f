//! HTTP side of the console: submission POST, debug GET, file preview.

use qa_console_core::{
    ClientError, QaForm, Result, RunId, SubmissionAck, decode_ack, decode_file_selection,
    normalize_base_url,
};
use tracing::debug;

/// Client for the QA server's HTTP endpoints.
#[derive(Debug, Clone)]
pub struct QaGateway {
    base_url: String,
    http: reqwest::Client,
}

impl QaGateway {
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            base_url: normalize_base_url(base_url)?,
            http: reqwest::Client::new(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// POST the form snapshot to the page URL and decode the ack.
    pub async fn submit(&self, form: &QaForm) -> Result<SubmissionAck> {
        let mut body = reqwest::multipart::Form::new();
        for (name, value) in form.fields() {
            body = body.text(name, value);
        }

        let response = self
            .http
            .post(&self.base_url)
            .multipart(body)
            .send()
            .await
            .map_err(|error| ClientError::Network(error.to_string()))?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|error| ClientError::Network(error.to_string()))?;
        if !status.is_success() {
            return Err(http_error(status, &bytes));
        }

        let ack = decode_ack(&bytes)?;
        debug!(?ack, "submission acked");
        Ok(ack)
    }

    /// GET the run's supplementary debug text (an HTML fragment).
    pub async fn fetch_debug(&self, id: &RunId) -> Result<String> {
        let response = self
            .http
            .get(self.endpoint(&format!("/debug/{id}")))
            .send()
            .await
            .map_err(|error| ClientError::Network(error.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let bytes = response
                .bytes()
                .await
                .map_err(|error| ClientError::Network(error.to_string()))?;
            return Err(http_error(status, &bytes));
        }
        response
            .text()
            .await
            .map_err(|error| ClientError::Network(error.to_string()))
    }

    /// Ask the server which files the selected steps would touch under the
    /// form's selection mode. Preview only; nothing is executed.
    pub async fn preview_files(&self, form: &QaForm) -> Result<Vec<String>> {
        let body = reqwest::multipart::Form::new()
            .text("mode", form.mode.as_str().to_string())
            .text("filters", form.filters.join(","))
            .text("step_names", form.steps.join(","));

        let response = self
            .http
            .post(self.endpoint("/file_selection"))
            .multipart(body)
            .send()
            .await
            .map_err(|error| ClientError::Network(error.to_string()))?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|error| ClientError::Network(error.to_string()))?;
        if !status.is_success() {
            return Err(http_error(status, &bytes));
        }
        decode_file_selection(&bytes)
    }
}

fn http_error(status: reqwest::StatusCode, body: &[u8]) -> ClientError {
    let body = String::from_utf8_lossy(body).trim().to_string();
    ClientError::Http {
        status: status.as_u16(),
        body: if body.is_empty() { "<empty>".to_string() } else { body },
    }
}
