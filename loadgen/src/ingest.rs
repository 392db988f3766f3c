//! Synthetic metric samples and their statsd wire encoding.

use core::error::Error;
use std::{fs, io::Write, path::Path};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Counter,
    Gauge,
    Timer,
}

impl MetricKind {
    /// Statsd type suffix.
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Counter => "c",
            Self::Gauge => "g",
            Self::Timer => "ms",
        }
    }
}

/// A single metric sample.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Metric {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: MetricKind,
    pub value: f64,
    pub tags: Vec<String>,
    pub sample_rate: f64,
    /// Sent as a `host:<hostname>` tag, unless empty.
    pub hostname: String,
}

impl Default for Metric {
    fn default() -> Self {
        Self {
            name: "test".to_string(),
            kind: MetricKind::Counter,
            value: 10.0,
            tags: vec!["abc:def".to_string()],
            sample_rate: 1.0,
            hostname: "hostname".to_string(),
        }
    }
}

impl Metric {
    /// Loads a sample from the YAML file, filling missing fields with
    /// defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn Error>> {
        let data = fs::read(path)?;
        let metric: Metric = serde_yaml::from_slice(&data)?;
        metric.validate()?;

        Ok(metric)
    }

    pub fn validate(&self) -> Result<(), Box<dyn Error>> {
        if self.name.is_empty() {
            return Err("metric name must not be empty".into());
        }
        if self.name.contains([':', '|', '\n']) {
            return Err(format!("metric name \"{}\" contains reserved characters", self.name).into());
        }
        if !(self.sample_rate > 0.0 && self.sample_rate <= 1.0) {
            return Err(format!("sample rate must be in (0, 1], got {}", self.sample_rate).into());
        }

        Ok(())
    }
}

/// Serializes metric samples into wire bytes.
pub trait Encode {
    /// Appends the encoded sample to the given buffer.
    fn encode(&self, metric: &Metric, buf: &mut Vec<u8>);
}

/// DogStatsD-flavored line encoder.
///
/// `<name>:<value>|<type>[|@<rate>][|#<tag>,...]`
#[derive(Debug, Clone, Copy, Default)]
pub struct StatsdEncoder;

impl Encode for StatsdEncoder {
    fn encode(&self, metric: &Metric, buf: &mut Vec<u8>) {
        // Writing into a vector never fails.
        _ = write!(buf, "{}:{}|{}", metric.name, metric.value, metric.kind.as_str());

        if metric.sample_rate < 1.0 {
            _ = write!(buf, "|@{}", metric.sample_rate);
        }

        let tags = metric.tags.iter().map(String::as_str).filter(|tag| !tag.is_empty());
        let host = (!metric.hostname.is_empty()).then(|| format!("host:{}", metric.hostname));

        let mut sep = "|#";
        for tag in tags.chain(host.as_deref()) {
            buf.extend_from_slice(sep.as_bytes());
            buf.extend_from_slice(tag.as_bytes());
            sep = ",";
        }
    }
}
