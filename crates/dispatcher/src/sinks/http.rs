//! HttpClientTarget - POSTs records to an HTTP endpoint

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use contracts::{
    Batch, ConfigValue, Destination, ErrorSink, Record, Stage, StageContext, StageError,
};
use flate2::write::GzEncoder;
use flate2::Compression as GzLevel;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_ENCODING, CONTENT_TYPE};
use reqwest::{Certificate, Client, StatusCode};
use tracing::{debug, info, instrument, warn};

use crate::metrics::DestinationMetrics;

const RESOURCE_URL: &str = "conf.resourceUrl";
const HEADERS: &str = "conf.headers";
const SINGLE_REQUEST_PER_BATCH: &str = "conf.singleRequestPerBatch";
const HTTP_COMPRESSION: &str = "conf.client.httpCompression";
const TLS_ENABLED: &str = "conf.client.tlsConfig.tlsEnabled";
const TRUST_STORE: &str = "conf.client.tlsConfig.trustStoreFilePath";

const CONTENT_TYPE_JSON: &str = "application/json;charset=UTF-8";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum HttpCompression {
    #[default]
    None,
    Gzip,
}

#[derive(Debug)]
struct HttpTargetConfig {
    resource_url: reqwest::Url,
    headers: HeaderMap,
    single_request_per_batch: bool,
    compression: HttpCompression,
}

impl HttpTargetConfig {
    fn from_context(ctx: &StageContext) -> Result<Self, StageError> {
        let stage = ctx.instance_name();
        let raw_url = ctx.string(RESOURCE_URL)?;
        let resource_url = reqwest::Url::parse(&raw_url).map_err(|e| {
            StageError::configuration(stage, RESOURCE_URL, format!("invalid url '{raw_url}': {e}"))
        })?;

        let mut headers = HeaderMap::new();
        for entry in ctx.list(HEADERS)? {
            let (key, value) = header_pair(&entry).ok_or_else(|| {
                StageError::configuration(stage, HEADERS, "expected {key, value} entries")
            })?;
            let name = HeaderName::from_bytes(key.as_bytes()).map_err(|e| {
                let message = format!("invalid header name '{key}': {e}");
                StageError::configuration(stage, HEADERS, message)
            })?;
            let value = HeaderValue::from_str(&value).map_err(|e| {
                StageError::configuration(stage, HEADERS, format!("invalid value for '{key}': {e}"))
            })?;
            headers.insert(name, value);
        }

        let compression = match ctx.optional_string(HTTP_COMPRESSION)? {
            None => HttpCompression::None,
            Some(raw) => match raw.to_ascii_uppercase().as_str() {
                "NONE" => HttpCompression::None,
                "GZIP" => HttpCompression::Gzip,
                _ => {
                    return Err(StageError::configuration(
                        stage,
                        HTTP_COMPRESSION,
                        format!("expected NONE or GZIP, got '{raw}'"),
                    ))
                }
            },
        };

        Ok(Self {
            resource_url,
            headers,
            single_request_per_batch: ctx.bool_or(SINGLE_REQUEST_PER_BATCH, false)?,
            compression,
        })
    }
}

fn header_pair(entry: &ConfigValue) -> Option<(String, String)> {
    let map = entry.as_map()?;
    let key = map.get("key")?.as_str()?.to_string();
    let value = map.get("value").map(ConfigValue::to_string).unwrap_or_default();
    Some((key, value))
}

async fn build_client(ctx: &StageContext) -> Result<Client, StageError> {
    let stage = ctx.instance_name();
    let mut builder = Client::builder().timeout(REQUEST_TIMEOUT);

    if ctx.bool_or(TLS_ENABLED, false)? {
        if let Some(path) = ctx.optional_string(TRUST_STORE)? {
            let pem = tokio::fs::read(&path).await.map_err(|e| {
                StageError::configuration(stage, TRUST_STORE, format!("cannot read '{path}': {e}"))
            })?;
            let cert = Certificate::from_pem(&pem).map_err(|e| {
                let message = format!("invalid PEM certificate: {e}");
                StageError::configuration(stage, TRUST_STORE, message)
            })?;
            builder = builder.add_root_certificate(cert);
        }
    }

    builder
        .build()
        .map_err(|e| StageError::configuration(stage, TLS_ENABLED, format!("http client: {e}")))
}

/// Destination sending one request per record, or one newline-joined
/// request per batch
#[derive(Debug, Default)]
pub struct HttpClientTarget {
    name: String,
    config: Option<HttpTargetConfig>,
    client: Option<Client>,
    metrics: Arc<DestinationMetrics>,
}

impl HttpClientTarget {
    pub const LIBRARY: &'static str = "streamsets-datacollector-basic-lib";
    pub const STAGE_NAME: &'static str =
        "com_streamsets_pipeline_stage_destination_http_HttpClientDTarget";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn metrics(&self) -> Arc<DestinationMetrics> {
        self.metrics.clone()
    }

    fn encode(&self, record: &Record) -> Result<Vec<u8>, StageError> {
        record
            .value_as_text()
            .map(String::into_bytes)
            .map_err(|e| StageError::RecordConversion {
                source_id: record.source_id().to_string(),
                message: e.to_string(),
            })
    }

    async fn send(&self, body: Vec<u8>) -> Result<(), StageError> {
        let (Some(config), Some(client)) = (&self.config, &self.client) else {
            return Err(StageError::Other(format!("stage '{}' not initialized", self.name)));
        };

        let mut request = client
            .post(config.resource_url.clone())
            .headers(config.headers.clone())
            .header(CONTENT_TYPE, CONTENT_TYPE_JSON);

        let body = match config.compression {
            HttpCompression::None => body,
            HttpCompression::Gzip => {
                request = request.header(CONTENT_ENCODING, "gzip");
                gzip(&body)?
            }
        };

        self.metrics.inc_requests();
        let response = request
            .body(body)
            .send()
            .await
            .map_err(|e| StageError::transient_io(&self.name, e.to_string()))?;

        let status = response.status();
        debug!(stage = %self.name, %status, "response received");
        if status != StatusCode::OK {
            return Err(StageError::fatal_destination(
                &self.name,
                format!("unexpected response status {status}"),
            ));
        }
        Ok(())
    }
}

fn gzip(body: &[u8]) -> Result<Vec<u8>, StageError> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(body.len() / 2), GzLevel::default());
    encoder.write_all(body)?;
    Ok(encoder.finish()?)
}

#[async_trait]
impl Stage for HttpClientTarget {
    async fn init(&mut self, context: &StageContext) -> Result<(), StageError> {
        self.name = context.instance_name().to_string();
        let config = HttpTargetConfig::from_context(context)?;
        self.client = Some(build_client(context).await?);

        info!(
            stage = %self.name,
            url = %config.resource_url,
            batch_mode = config.single_request_per_batch,
            compression = ?config.compression,
            "HttpClientTarget initialized"
        );
        self.config = Some(config);
        Ok(())
    }
}

#[async_trait]
impl Destination for HttpClientTarget {
    #[instrument(
        name = "http_target_write",
        skip(self, batch, errors),
        fields(stage = %self.name, records = batch.len())
    )]
    async fn write(&mut self, batch: &Batch, errors: &mut ErrorSink) -> Result<(), StageError> {
        let single_request = self
            .config
            .as_ref()
            .map(|c| c.single_request_per_batch)
            .unwrap_or(false);

        let mut joined = Vec::new();
        let mut delivered = 0u64;
        for record in batch.records() {
            let bytes = match self.encode(record) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(
                        stage = %self.name,
                        source_id = %record.source_id(),
                        error = %e,
                        "record not encodable"
                    );
                    errors.push(self.name.clone(), record.clone(), &e);
                    self.metrics.inc_error_records();
                    continue;
                }
            };
            if single_request {
                joined.extend_from_slice(&bytes);
                joined.push(b'\n');
            } else {
                self.send(bytes).await.inspect_err(|_| self.metrics.inc_failure_count())?;
            }
            delivered += 1;
        }

        if single_request && delivered > 0 {
            self.send(joined).await.inspect_err(|_| self.metrics.inc_failure_count())?;
        }

        self.metrics.add_records_written(delivered);
        Ok(())
    }
}
