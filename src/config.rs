//! # Configuration
//!
//! Service settings read from named parameters, normally environment
//! variables. Each parameter is a small type implementing [`NamedParam`],
//! which knows its name and how to parse its value.
use crate::extractor::ExtractionMode;
use crate::generative::gemini::DEFAULT_ENDPOINT;
use crate::generative::gemini::DEFAULT_MODEL;
use crate::generative::retry::RetryPolicy;
use crate::generative::SamplingParams;
use chrono::Datelike;
use std::collections::HashMap;
use std::fmt::Debug;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Configuration errors, raised at service start-up.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing parameter '{0}'")]
    MissingParameter(&'static str),

    #[error("Invalid parameter '{name}': {message}")]
    InvalidParameter { name: &'static str, message: String },
}

/// Where parameter values come from.
pub trait ParamSource {
    /// Raw value of the parameter, None when unset or blank.
    fn get(&self, name: &str) -> Option<String>;
}

/// Process environment.
pub struct EnvSource;

impl ParamSource for EnvSource {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(name).ok().filter(|value| !value.trim().is_empty())
    }
}

impl ParamSource for HashMap<String, String> {
    fn get(&self, name: &str) -> Option<String> {
        HashMap::get(self, name).filter(|value| !value.trim().is_empty()).cloned()
    }
}

/// A named, typed configuration parameter.
///
/// # Type Parameters
///
/// * `T` - The type of the parameter value
pub trait NamedParam<T> {
    /// Parameter name as it appears in the environment
    fn name() -> &'static str;

    /// Converts the raw text into a value
    fn parse(value: &str) -> Result<T, String>;

    /// Reads and parses the parameter, None if not provided
    fn read(source: &dyn ParamSource) -> Result<Option<T>, ConfigError> {
        source
            .get(Self::name())
            .map(|value| {
                Self::parse(value.trim()).map_err(|message| ConfigError::InvalidParameter {
                    name: Self::name(),
                    message,
                })
            })
            .transpose()
    }
}

/// Parses any `FromStr` value, reporting the input on failure.
fn parse_from_str<T: FromStr>(value: &str) -> Result<T, String>
where
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|error| format!("'{value}': {error}"))
}

macro_rules! named_param {
    ($param:ident, $kind:ty, $name:literal, $parse:expr) => {
        pub struct $param;

        impl NamedParam<$kind> for $param {
            fn name() -> &'static str {
                $name
            }

            fn parse(value: &str) -> Result<$kind, String> {
                $parse(value)
            }
        }
    };
}

named_param!(ClovaUrlParam, Url, "CLOVA_URL", parse_from_str);
named_param!(ClovaSecretParam, Secret, "CLOVA_SECRET", |value: &str| Ok(Secret(value.to_owned())));
named_param!(GeminiApiKeyParam, Secret, "GEMINI_API_KEY", |value: &str| Ok(Secret(value.to_owned())));
named_param!(GeminiModelParam, String, "GEMINI_MODEL", |value: &str| Ok(value.to_owned()));
named_param!(GeminiEndpointParam, Url, "GEMINI_ENDPOINT", parse_from_str);
named_param!(ModeParam, ExtractionMode, "ROSTER_MODE", parse_from_str);
named_param!(YearParam, i32, "ROSTER_YEAR", |value: &str| {
    parse_from_str::<i32>(value).and_then(|year| match year {
        1..=9999 => Ok(year),
        _ => Err(format!("year {year} out of range")),
    })
});
named_param!(SeedParam, i32, "ROSTER_SEED", parse_from_str);
named_param!(TemperatureParam, f32, "ROSTER_TEMPERATURE", |value: &str| {
    parse_from_str::<f32>(value).and_then(|temperature| match temperature {
        t if t.is_finite() && t >= 0.0 => Ok(t),
        t => Err(format!("temperature {t} must be a non-negative number")),
    })
});
named_param!(TopPParam, f32, "ROSTER_TOP_P", |value: &str| {
    parse_from_str::<f32>(value).and_then(|top_p| match top_p {
        p if p > 0.0 && p <= 1.0 => Ok(p),
        p => Err(format!("nucleus threshold {p} must be in (0, 1]")),
    })
});
named_param!(MaxAttemptsParam, u32, "ROSTER_MAX_ATTEMPTS", |value: &str| {
    parse_from_str::<u32>(value).and_then(|attempts| match attempts {
        0 => Err("at least one attempt is required".to_owned()),
        n => Ok(n),
    })
});
named_param!(RequestTimeoutParam, Duration, "ROSTER_REQUEST_TIMEOUT_SECS", |value: &str| {
    parse_from_str::<u64>(value).map(Duration::from_secs)
});

/// Credential that never shows up in debug output or logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(pub String);

impl Secret {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Secret(***)")
    }
}

/// OCR service location and credential.
#[derive(Clone, Debug, PartialEq)]
pub struct OcrConfig {
    pub url: Url,
    pub secret: Secret,
}

/// Generative endpoint location, model and credential.
#[derive(Clone, Debug, PartialEq)]
pub struct GeminiConfig {
    pub endpoint: Url,
    pub model: String,
    pub api_key: Secret,
}

/// Complete service configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub mode: ExtractionMode,
    pub year: i32,
    pub sampling: SamplingParams,
    pub retry: RetryPolicy,
    pub ocr: Option<OcrConfig>,
    pub gemini: Option<GeminiConfig>,
}

impl Config {
    /// Loads the configuration from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_source(&EnvSource)
    }

    /// Loads the configuration from any parameter source.
    pub fn from_source(source: &dyn ParamSource) -> Result<Self, ConfigError> {
        let defaults = SamplingParams::default();
        let sampling = SamplingParams {
            seed: SeedParam::read(source)?.unwrap_or(defaults.seed),
            temperature: TemperatureParam::read(source)?.unwrap_or(defaults.temperature),
            top_p: TopPParam::read(source)?.unwrap_or(defaults.top_p),
        };

        let mut retry = RetryPolicy::default();
        if let Some(max_attempts) = MaxAttemptsParam::read(source)? {
            retry.max_attempts = max_attempts;
        }
        if let Some(request_timeout) = RequestTimeoutParam::read(source)? {
            retry.request_timeout = request_timeout;
        }

        let ocr = match (ClovaUrlParam::read(source)?, ClovaSecretParam::read(source)?) {
            (Some(url), Some(secret)) => Some(OcrConfig { url, secret }),
            (Some(_), None) => Err(ConfigError::MissingParameter(ClovaSecretParam::name()))?,
            (None, Some(_)) => Err(ConfigError::MissingParameter(ClovaUrlParam::name()))?,
            (None, None) => None,
        };

        let gemini = match GeminiApiKeyParam::read(source)? {
            Some(api_key) => Some(GeminiConfig {
                endpoint: match GeminiEndpointParam::read(source)? {
                    Some(endpoint) => endpoint,
                    None => GeminiEndpointParam::parse(DEFAULT_ENDPOINT).map_err(|message| {
                        ConfigError::InvalidParameter { name: GeminiEndpointParam::name(), message }
                    })?,
                },
                model: GeminiModelParam::read(source)?.unwrap_or_else(|| DEFAULT_MODEL.to_owned()),
                api_key,
            }),
            None => None,
        };

        let mode = ModeParam::read(source)?.unwrap_or_default();
        if mode == ExtractionMode::Generative && gemini.is_none() {
            Err(ConfigError::MissingParameter(GeminiApiKeyParam::name()))?;
        }

        Ok(Self {
            mode,
            year: YearParam::read(source)?.unwrap_or_else(|| chrono::Local::now().year()),
            sampling,
            retry,
            ocr,
            gemini,
        })
    }
}
