//! Tracing setup: stdout, optional rolling log files, optional OTLP export.

use crate::config::TelemetryConfig;

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::{SpanExporter, WithHttpConfig};
use opentelemetry_sdk::trace::span_processor_with_async_runtime::BatchSpanProcessor;
use opentelemetry_sdk::trace::{Sampler, SdkTracerProvider};
use opentelemetry_sdk::{Resource, runtime};
use std::borrow::Cow;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

/// Fields that carry user-authored text and get truncated in log lines.
const TRUNCATED_FIELDS: &[&str] = &["message", "text"];
const MAX_FIELD_CHARS: usize = 280;

/// Keeps log writers and the span exporter alive. Call [`shutdown`] before
/// exit so buffered spans are flushed.
///
/// [`shutdown`]: TelemetryGuard::shutdown
#[must_use]
pub struct TelemetryGuard {
    provider: Option<SdkTracerProvider>,
    _log_guard: Option<WorkerGuard>,
}

impl TelemetryGuard {
    pub fn otlp_enabled(&self) -> bool {
        self.provider.is_some()
    }

    pub fn shutdown(self) {
        if let Some(provider) = self.provider {
            if let Err(error) = provider.shutdown() {
                eprintln!("failed to flush OTLP spans: {error}");
            }
        }
    }
}

/// Cut `text` to at most `max_chars` characters, marking the cut with `...`.
fn clip(text: &str, max_chars: usize) -> Cow<'_, str> {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => Cow::Owned(format!("{}...", &text[..cut])),
        None => Cow::Borrowed(text),
    }
}

fn format_field(
    writer: &mut format::Writer<'_>,
    field: &tracing::field::Field,
    value: &dyn std::fmt::Debug,
) -> std::fmt::Result {
    let name = field.name();
    if !TRUNCATED_FIELDS.contains(&name) {
        return write!(writer, "{name}={value:?}");
    }
    let rendered = format!("{value:?}");
    write!(writer, "{name}={}", clip(&rendered, MAX_FIELD_CHARS))
}

/// Install the global subscriber.
pub fn init_tracing(debug: bool, telemetry: &TelemetryConfig) -> TelemetryGuard {
    let filter = build_env_filter(debug);

    let stdout_layer = tracing_subscriber::fmt::layer()
        .fmt_fields(format::debug_fn(format_field))
        .compact();

    let (file_layer, log_guard) = match &telemetry.log_dir {
        Some(log_dir) => {
            let file_appender = tracing_appender::rolling::daily(log_dir, "warpdeploy.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .fmt_fields(format::debug_fn(format_field))
                .compact();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let provider = build_otlp_provider(telemetry);
    let otel_layer = provider
        .as_ref()
        .map(|provider| tracing_opentelemetry::layer().with_tracer(provider.tracer("warpdeploy")));

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .with(otel_layer)
        .init();

    TelemetryGuard {
        provider,
        _log_guard: log_guard,
    }
}

/// `RUST_LOG` wins when set; otherwise `--debug` picks the level.
fn build_env_filter(debug: bool) -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if debug {
            tracing_subscriber::EnvFilter::new("debug")
        } else {
            tracing_subscriber::EnvFilter::new("info")
        }
    })
}

/// Accepts either a bare collector base URL or the full `/v1/traces` path.
fn traces_endpoint(endpoint: &str) -> String {
    if endpoint.ends_with("/v1/traces") {
        endpoint.to_owned()
    } else {
        format!("{}/v1/traces", endpoint.trim_end_matches('/'))
    }
}

/// Sampling for a rate already validated to lie in `0.0..=1.0`. Partial
/// rates follow the parent's decision so traces are never split.
fn sampler(rate: f64) -> Sampler {
    if rate >= 1.0 {
        Sampler::AlwaysOn
    } else if rate <= 0.0 {
        Sampler::AlwaysOff
    } else {
        Sampler::ParentBased(Box::new(Sampler::TraceIdRatioBased(rate)))
    }
}

fn span_exporter(telemetry: &TelemetryConfig, endpoint: String) -> Result<SpanExporter, String> {
    use opentelemetry_otlp::WithExportConfig as _;

    SpanExporter::builder()
        .with_http()
        .with_endpoint(endpoint)
        .with_headers(telemetry.otlp_headers.clone())
        .build()
        .map_err(|error| error.to_string())
}

/// Build an OTLP provider when an endpoint is configured. Export failures
/// degrade to local logging only.
fn build_otlp_provider(telemetry: &TelemetryConfig) -> Option<SdkTracerProvider> {
    let endpoint = traces_endpoint(telemetry.otlp_endpoint.as_deref()?);
    let exporter = match span_exporter(telemetry, endpoint) {
        Ok(exporter) => exporter,
        Err(error) => {
            eprintln!("OTLP export disabled: {error}");
            return None;
        }
    };

    // reqwest needs a tokio runtime on the exporting thread.
    let processor = BatchSpanProcessor::builder(exporter, runtime::Tokio).build();

    Some(
        SdkTracerProvider::builder()
            .with_span_processor(processor)
            .with_resource(
                Resource::builder()
                    .with_service_name(telemetry.service_name.clone())
                    .build(),
            )
            .with_sampler(sampler(telemetry.sample_rate))
            .build(),
    )
}
