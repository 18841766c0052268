//! [`ConversionInvoker`] backed by the ConvertAPI REST service.

use anyhow::{Context, Result, anyhow, bail};
use log::debug;
use reqwest::blocking::{Client, multipart::Form};
use serde::Deserialize;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use crate::engine::invoker::{ConversionInvoker, ConversionRequest, copy_local};
use crate::types::{Item, RemoteFile};
use crate::utils::config::HttpConsts;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ConvertResponse {
    #[serde(default)]
    pub files: Vec<ResponseFile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResponseFile {
    pub file_name: String,
    #[serde(default)]
    pub file_ext: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
    pub url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ErrorResponse {
    #[serde(default)]
    code: Option<i64>,
    message: String,
}

impl From<ResponseFile> for Item {
    fn from(f: ResponseFile) -> Self {
        Item::remote(RemoteFile {
            url: f.url,
            file_name: f.file_name,
            file_ext: f.file_ext,
            size: f.file_size,
        })
    }
}

/// Multipart field name of input `index` out of `count`: `File` for a single input, `Files[i]` for a batch.
pub fn file_field_name(index: usize, count: usize) -> String {
    if count == 1 {
        "File".to_string()
    } else {
        format!("Files[{index}]")
    }
}

/// Parse a successful conversion response body into result items.
pub fn parse_convert_response(body: &str) -> Result<Vec<Item>> {
    let resp: ConvertResponse =
        serde_json::from_str(body).context("parse conversion response")?;
    Ok(resp.files.into_iter().map(Item::from).collect())
}

/// Human-readable message of a failed response: the service's `Message` when the body carries one.
pub fn error_message(status: u16, body: &str) -> String {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(ErrorResponse {
            code: Some(code),
            message,
        }) => format!("HTTP {status}: {message} (code {code})"),
        Ok(ErrorResponse { message, .. }) => format!("HTTP {status}: {message}"),
        Err(_) if body.trim().is_empty() => format!("HTTP {status}"),
        Err(_) => format!("HTTP {status}: {}", body.trim()),
    }
}

/// Where a service result named `file_name` lands inside `dir`. Only the final path
/// component of the reported name is used, so a result never lands outside `dir`.
pub fn output_path(dir: &Path, file_name: &str) -> Result<PathBuf> {
    match Path::new(file_name).file_name() {
        Some(name) => Ok(dir.join(name)),
        None => bail!("service returned an unusable file name {:?}", file_name),
    }
}

pub struct ConvertApiClient {
    http: Client,
    base_url: String,
    secret: String,
}

impl ConvertApiClient {
    pub fn new(secret: &str) -> Result<Self> {
        Self::with_base_url(secret, HttpConsts::DEFAULT_BASE_URL)
    }

    pub fn with_base_url(secret: &str, base_url: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(HttpConsts::REQUEST_TIMEOUT)
            .connect_timeout(HttpConsts::CONNECT_TIMEOUT)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("build HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            secret: secret.to_string(),
        })
    }

    fn convert_url(&self, source_format: &str, destination_format: &str) -> String {
        format!(
            "{}/convert/{}/to/{}",
            self.base_url, source_format, destination_format
        )
    }

    fn build_form(request: &ConversionRequest<'_>) -> Result<Form> {
        let count = request.items.len();
        let mut form = Form::new().text("StoreFile", "true");
        for (i, item) in request.items.iter().enumerate() {
            let name = file_field_name(i, count);
            form = match item {
                Item::Local(file) => form
                    .file(name, file.path())
                    .with_context(|| format!("open {}", file.path().display()))?,
                Item::Remote(remote) => form.text(name, remote.url.clone()),
            };
        }
        for (key, value) in request.params {
            form = form.text(key.clone(), value.clone());
        }
        Ok(form)
    }
}

impl ConversionInvoker for ConvertApiClient {
    fn convert(&self, request: &ConversionRequest<'_>) -> Result<Vec<Item>> {
        if request.items.is_empty() {
            bail!("empty conversion batch");
        }
        let url = self.convert_url(request.source_format, request.destination_format);
        debug!("POST {} ({} file(s))", url, request.items.len());
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.secret)
            .multipart(Self::build_form(request)?)
            .send()
            .with_context(|| format!("request {url}"))?;
        let status = resp.status();
        let body = resp.text().context("read conversion response")?;
        if !status.is_success() {
            return Err(anyhow!(error_message(status.as_u16(), &body)));
        }
        parse_convert_response(&body)
    }

    fn persist(&self, item: &Item, dir: &Path) -> Result<PathBuf> {
        let Item::Remote(remote) = item else {
            return copy_local(item, dir);
        };
        let dest = output_path(dir, &remote.file_name)?;
        fs::create_dir_all(dir)
            .with_context(|| format!("create output directory {}", dir.display()))?;
        let mut resp = self
            .http
            .get(&remote.url)
            .send()
            .and_then(|r| r.error_for_status())
            .with_context(|| format!("download {}", remote.url))?;
        let mut out =
            File::create(&dest).with_context(|| format!("create {}", dest.display()))?;
        resp.copy_to(&mut out)
            .with_context(|| format!("write {}", dest.display()))?;
        Ok(dest)
    }
}
