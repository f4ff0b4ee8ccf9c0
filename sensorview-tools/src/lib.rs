use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use clap::Args;
use sensorview::{AlignedSeriesBuffer, ViewConfig};
use tracing_subscriber::EnvFilter;

#[derive(Args, Debug, Clone, Default)]
pub struct ViewOpts {
    /// YAML file with view settings (span, width, overscan, ...)
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Target points per series after downsampling
    #[arg(short = 'w', long = "width", global = true)]
    pub width: Option<usize>,

    /// Field delimiter of delimited input
    #[arg(short = 'd', long = "delimiter", global = true)]
    pub delimiter: Option<char>,

    /// Live window length in seconds
    #[arg(long = "span", global = true)]
    pub span: Option<f64>,
}

impl ViewOpts {
    /// Defaults, then the config file, then command-line overrides.
    pub fn load(&self) -> Result<ViewConfig, String> {
        let mut config = match &self.config {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
                serde_yaml::from_str(&text)
                    .map_err(|e| format!("invalid config {}: {e}", path.display()))?
            }
            None => ViewConfig::default(),
        };
        if let Some(width) = self.width {
            config.display_width = width;
        }
        if let Some(delimiter) = self.delimiter {
            config.delimiter = delimiter;
        }
        if let Some(span) = self.span {
            config.default_span_secs = span;
        }
        tracing::debug!(?config, "view config");
        Ok(config)
    }
}

/// Logs to stderr, filtered by `RUST_LOG` (default `warn`, or `debug` when
/// verbose).
pub fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

pub fn format_time(t: f64, as_date: bool) -> String {
    if !as_date {
        return t.to_string();
    }
    let micros = (t * 1e6).round() as i64;
    match chrono::DateTime::from_timestamp_micros(micros) {
        Some(dt) => dt.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        None => t.to_string(),
    }
}

/// Writes `buffer` as delimited text: a `time` column then one column per
/// series. Absent readings are empty cells.
pub fn write_csv<W: Write>(
    out: &mut W,
    buffer: &AlignedSeriesBuffer,
    delimiter: char,
    dates: bool,
) -> io::Result<()> {
    let sep = delimiter.to_string();
    let mut header = vec!["time".to_string()];
    header.extend(buffer.series_ids().map(|id| quote(id, delimiter)));
    writeln!(out, "{}", header.join(&sep))?;

    let columns: Vec<_> = buffer.iter().map(|(_, values)| values).collect();
    for (i, t) in buffer.axis().iter().enumerate() {
        let mut row = vec![format_time(*t, dates)];
        row.extend(
            columns
                .iter()
                .map(|values| values[i].try_as_f64().map(|v| v.to_string()).unwrap_or_default()),
        );
        writeln!(out, "{}", row.join(&sep))?;
    }
    Ok(())
}

fn quote(field: &str, delimiter: char) -> String {
    if field.contains(delimiter) || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
