//! Configuration for the visibility harness.
//!
//! Configuration can be loaded from multiple sources with the following precedence (highest to
//! lowest):
//!
//! 1. Command line flags of the individual subcommands
//! 2. Environment variables (prefixed with `VB__`)
//! 3. YAML configuration file (specified via `-c` or `--config` flag)
//! 4. Defaults
//!
//! See [`Config`] for a description of all configuration fields and their defaults.
//!
//! # Environment Variables
//!
//! Environment variables use `VB__` as a prefix and double underscores (`__`) to denote nested
//! configuration structures. For example:
//!
//! - `VB__STORAGE__TYPE=s3compatible` sets the storage type
//! - `VB__STORAGE__BUCKET=visibility` sets the bucket
//! - `VB__RUN__MAX_WAIT=10s` sets the wait budget per item
//!
//! # YAML Configuration File
//!
//! The above configuration in YAML format would look like this:
//!
//! ```yaml
//! storage:
//!   type: s3compatible
//!   endpoint: http://localhost:9000
//!   bucket: visibility
//!
//! run:
//!   max_wait: 10s
//! ```

use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use figment::providers::{Env, Format, Serialized, Yaml};
use secrecy::{CloneableSecret, ExposeSecret, SecretBox, SerializableSecret, zeroize::Zeroize};
use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;
use visibility_service::{Propagation, StorageConfig};

use crate::detector::{DetectorConfig, FaultPolicy};
use crate::error::{HarnessError, HarnessResult};
use crate::producer::ProducerConfig;
use crate::size::PayloadSize;
use crate::workload::{DEFAULT_SEED, Mode, Workload};

/// Environment variable prefix for all configuration options.
const ENV_PREFIX: &str = "VB__";

/// Newtype around `String` that may protect against accidental
/// logging of secrets in our configuration struct. Use with
/// [`secrecy::SecretBox`].
#[derive(Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConfigSecret(String);

impl ConfigSecret {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<&str> for ConfigSecret {
    fn from(str: &str) -> Self {
        ConfigSecret(str.to_string())
    }
}

impl fmt::Debug for ConfigSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "[redacted]")
    }
}

impl CloneableSecret for ConfigSecret {}
impl SerializableSecret for ConfigSecret {}
impl Zeroize for ConfigSecret {
    fn zeroize(&mut self) {
        self.0.zeroize();
    }
}

/// Storage backend configuration.
///
/// The `type` field in YAML or `__TYPE` in environment variables determines which variant is used.
///
/// Used in: [`Config::storage`]
#[derive(Debug, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Storage {
    /// Local filesystem storage backend (type `"filesystem"`).
    ///
    /// Point this at a network filesystem mount to measure its propagation between hosts.
    ///
    /// # Example
    ///
    /// ```yaml
    /// storage:
    ///   type: filesystem
    ///   path: /mnt/shared/visibility
    /// ```
    FileSystem {
        /// Directory path for storing objects. The directory must exist.
        ///
        /// # Environment Variables
        ///
        /// - `VB__STORAGE__TYPE=filesystem`
        /// - `VB__STORAGE__PATH=/path/to/storage`
        path: PathBuf,
    },

    /// S3-compatible storage backend (type `"s3compatible"`).
    ///
    /// # Example
    ///
    /// ```yaml
    /// storage:
    ///   type: s3compatible
    ///   endpoint: http://localhost:9000
    ///   bucket: visibility
    /// ```
    S3Compatible {
        /// S3 endpoint URL.
        ///
        /// # Environment Variables
        ///
        /// - `VB__STORAGE__TYPE=s3compatible`
        /// - `VB__STORAGE__ENDPOINT=http://localhost:9000`
        endpoint: String,

        /// S3 bucket name. The bucket must exist.
        ///
        /// # Environment Variables
        ///
        /// - `VB__STORAGE__BUCKET=visibility`
        bucket: String,

        /// Optional bearer token sent with every request.
        ///
        /// # Environment Variables
        ///
        /// - `VB__STORAGE__TOKEN`
        #[serde(default)]
        token: Option<SecretBox<ConfigSecret>>,
    },

    /// Azure blob storage backend (type `"azure"`).
    ///
    /// # Example
    ///
    /// ```yaml
    /// storage:
    ///   type: azure
    ///   account_url: https://myaccount.blob.core.windows.net
    ///   container: visibility
    /// ```
    Azure {
        /// Blob service URL of the storage account.
        account_url: String,
        /// Container name. The container must exist.
        container: String,
        /// Optional shared access signature, without the leading `?`.
        #[serde(default)]
        sas_token: Option<SecretBox<ConfigSecret>>,
    },

    /// In-process storage (type `"memory"`).
    ///
    /// Only useful with the `run` subcommand, since producer and detector must share the process.
    /// Simulates a store where every change becomes visible after a fixed delay.
    Memory {
        /// Time after a write or delete before it becomes visible.
        #[serde(default, with = "humantime_serde")]
        delay: Duration,
    },
}

impl Storage {
    /// Returns the configuration to construct a backend with [`visibility_service::connect`].
    pub fn as_storage_config(&self) -> StorageConfig<'_> {
        match self {
            Storage::FileSystem { path } => StorageConfig::FileSystem { path },
            Storage::S3Compatible {
                endpoint,
                bucket,
                token,
            } => StorageConfig::S3Compatible {
                endpoint,
                bucket,
                token: token.as_ref().map(|token| token.expose_secret().as_str()),
            },
            Storage::Azure {
                account_url,
                container,
                sas_token,
            } => StorageConfig::Azure {
                account_url,
                container,
                sas_token: sas_token.as_ref().map(|sas| sas.expose_secret().as_str()),
            },
            Storage::Memory { delay } => StorageConfig::Memory {
                propagation: Propagation::delayed(*delay),
            },
        }
    }
}

/// Parameters of the measurement shared by producer and detector.
///
/// Producer and detector running on different hosts must agree on the key prefix, seed,
/// iterations and size, otherwise the detector looks for objects that are never written.
///
/// Used in: [`Config::run`]
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Run {
    /// Prefix of all object keys. Keys are the prefix followed by the zero-padded index.
    ///
    /// # Default
    ///
    /// `"visibility/"`
    pub key_prefix: String,

    /// Seed that payload contents are derived from.
    pub seed: u64,

    /// Number of items to write and detect.
    ///
    /// # Default
    ///
    /// `10`
    pub iterations: u64,

    /// Size of every payload, such as `64K` or `1M`.
    ///
    /// # Default
    ///
    /// `1M`
    pub size: PayloadSize,

    /// Write empty objects instead, overriding [`size`](Self::size).
    pub empty: bool,

    /// Whether writes or deletes are measured.
    pub mode: Mode,

    /// Cadence of successive writes.
    ///
    /// The detector uses the same cadence to tell when each item is due, so a detector started
    /// separately must be given the producer's value.
    ///
    /// # Default
    ///
    /// `1s`
    #[serde(with = "humantime_serde")]
    pub write_interval: Duration,

    /// Additional attempts for a failed write.
    ///
    /// # Default
    ///
    /// `3`
    pub write_retries: u32,

    /// Delay between attempts of a failed write.
    ///
    /// # Default
    ///
    /// `500ms`
    #[serde(with = "humantime_serde")]
    pub retry_delay: Duration,

    /// Time limit for a single write attempt, after which the attempt counts as failed.
    ///
    /// # Default
    ///
    /// `30s`
    #[serde(with = "humantime_serde")]
    pub write_timeout: Duration,

    /// Delay between polls for the same item.
    ///
    /// # Default
    ///
    /// `100ms`
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,

    /// Time after which an item that has not become visible is given up.
    ///
    /// The wait for an item starts when its write is due, not when the detector gets to it.
    ///
    /// # Default
    ///
    /// `5s`
    #[serde(with = "humantime_serde")]
    pub max_wait: Duration,

    /// Whether detected objects must match the payload digest in addition to its size.
    ///
    /// # Default
    ///
    /// `true`
    pub verify_digest: bool,

    /// How backend errors during polling are treated.
    ///
    /// # Default
    ///
    /// `transient`
    pub fault_policy: FaultPolicy,

    /// Whether the `run` subcommand deletes the written objects when it is done.
    ///
    /// # Default
    ///
    /// `true`
    pub cleanup: bool,
}

impl Default for Run {
    fn default() -> Self {
        Self {
            key_prefix: "visibility/".into(),
            seed: DEFAULT_SEED,
            iterations: 10,
            size: PayloadSize(1024 * 1024),
            empty: false,
            mode: Mode::Write,
            write_interval: Duration::from_secs(1),
            write_retries: 3,
            retry_delay: Duration::from_millis(500),
            write_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(100),
            max_wait: Duration::from_secs(5),
            verify_digest: true,
            fault_policy: FaultPolicy::Transient,
            cleanup: true,
        }
    }
}

/// Locations of the files a measurement produces.
///
/// Used in: [`Config::output`]
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Output {
    /// Log of completed writes, appended to by the producer.
    pub write_log: PathBuf,
    /// Log of detections, appended to by the detector.
    pub detection_log: PathBuf,
    /// File that collects one summary row per run.
    pub ledger: PathBuf,
    /// Optional file to export the raw latency series to.
    pub samples: Option<PathBuf>,
    /// Label of the ledger row. Defaults to the payload size and the current time.
    pub label: Option<String>,
}

impl Default for Output {
    fn default() -> Self {
        Self {
            write_log: PathBuf::from("writes.tsv"),
            detection_log: PathBuf::from("detections.tsv"),
            ledger: PathBuf::from("ledger.tsv"),
            samples: None,
            label: None,
        }
    }
}

/// [Sentry](https://sentry.io/) error reporting configuration.
///
/// Sentry is disabled by default and only enabled when a DSN is provided.
///
/// Used in: [`Config::sentry`]
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Sentry {
    /// Sentry DSN (Data Source Name).
    ///
    /// # Environment Variable
    ///
    /// `VB__SENTRY__DSN`
    pub dsn: Option<SecretBox<ConfigSecret>>,

    /// Environment name, such as `"production"`.
    pub environment: Option<Cow<'static, str>>,

    /// Identifier of the host running the harness.
    pub server_name: Option<Cow<'static, str>>,

    /// Error event sampling rate.
    ///
    /// # Default
    ///
    /// `1.0` (send all errors)
    pub sample_rate: f32,

    /// Performance trace sampling rate.
    ///
    /// # Default
    ///
    /// `0.01` (send 1% of traces)
    pub traces_sample_rate: f32,

    /// Enable Sentry SDK debug mode.
    pub debug: bool,
}

impl Sentry {
    /// Returns whether Sentry integration is enabled.
    ///
    /// Sentry is considered enabled if a DSN is configured.
    pub fn is_enabled(&self) -> bool {
        self.dsn.is_some()
    }
}

impl Default for Sentry {
    fn default() -> Self {
        Self {
            dsn: None,
            environment: None,
            server_name: None,
            sample_rate: 1.0,
            traces_sample_rate: 0.01,
            debug: false,
        }
    }
}

/// Log output format.
///
/// Controls how log messages are formatted. The format can be explicitly specified or
/// auto-detected based on whether output is to a TTY.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Auto detect the best format.
    ///
    /// This chooses [`LogFormat::Pretty`] for TTY, otherwise [`LogFormat::Simplified`].
    Auto,

    /// Pretty printing with colors.
    ///
    /// ```text
    ///  INFO  visibility_bench::detector > starting detector
    /// ```
    Pretty,

    /// Simplified plain text output.
    ///
    /// ```text
    /// 2020-12-04T12:10:32Z [visibility_bench::detector] INFO: starting detector
    /// ```
    Simplified,

    /// Dump out JSON lines.
    Json,
}

/// The logging format parse error.
#[derive(Clone, Debug)]
pub struct FormatParseError(String);

impl fmt::Display for FormatParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            r#"error parsing "{}" as format: expected one of "auto", "pretty", "simplified", "json""#,
            self.0
        )
    }
}

impl std::str::FromStr for LogFormat {
    type Err = FormatParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let result = match s {
            "" => LogFormat::Auto,
            s if s.eq_ignore_ascii_case("auto") => LogFormat::Auto,
            s if s.eq_ignore_ascii_case("pretty") => LogFormat::Pretty,
            s if s.eq_ignore_ascii_case("simplified") => LogFormat::Simplified,
            s if s.eq_ignore_ascii_case("json") => LogFormat::Json,
            s => return Err(FormatParseError(s.into())),
        };

        Ok(result)
    }
}

impl std::error::Error for FormatParseError {}

mod display_fromstr {
    pub fn serialize<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
        T: std::fmt::Display,
    {
        serializer.collect_str(&value)
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        D: serde::Deserializer<'de>,
        T: std::str::FromStr,
        <T as std::str::FromStr>::Err: std::fmt::Display,
    {
        use serde::Deserialize;
        let s = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Logging configuration.
///
/// Logs are always written to stderr, so they do not interleave with the summary on stdout.
///
/// Used in: [`Config::logging`]
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Logging {
    /// Minimum log level to output.
    ///
    /// The `RUST_LOG` environment variable provides more granular control per module if needed.
    ///
    /// # Default
    ///
    /// `INFO`
    ///
    /// # Environment Variable
    ///
    /// `VB__LOGGING__LEVEL`
    #[serde(with = "display_fromstr")]
    pub level: LevelFilter,

    /// Log output format. See [`LogFormat`] for available options.
    ///
    /// # Environment Variable
    ///
    /// `VB__LOGGING__FORMAT`
    pub format: LogFormat,
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            level: LevelFilter::INFO,
            format: LogFormat::Auto,
        }
    }
}

/// Main configuration struct for the visibility harness.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// The storage backend under test.
    ///
    /// # Default
    ///
    /// Filesystem storage in the `./data` directory
    pub storage: Storage,

    /// Parameters of the measurement.
    pub run: Run,

    /// Locations of logs and the ledger.
    pub output: Output,

    /// Logging configuration.
    pub logging: Logging,

    /// Sentry error reporting configuration.
    pub sentry: Sentry,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: Storage::FileSystem {
                path: PathBuf::from("data"),
            },
            run: Run::default(),
            output: Output::default(),
            logging: Logging::default(),
            sentry: Sentry::default(),
        }
    }
}

impl Config {
    /// Loads configuration from the optional YAML file and the environment.
    ///
    /// Configuration is merged in the following order (later sources override earlier ones):
    /// 1. Default values
    /// 2. YAML configuration file (if a path is given)
    /// 3. Environment variables (prefixed with `VB__`)
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The YAML configuration file cannot be read or parsed
    /// - Environment variables contain invalid values
    /// - The resulting configuration fails [`validation`](Self::validate)
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = figment::Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        let config: Config = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;

        config.validate()?;
        Ok(config)
    }

    /// Checks settings that cannot be expressed by their types alone.
    pub fn validate(&self) -> HarnessResult<()> {
        let run = &self.run;
        if run.iterations == 0 {
            return Err(HarnessError::Config("iterations must be at least 1".into()));
        }
        if run.poll_interval.is_zero() {
            return Err(HarnessError::Config("poll_interval must not be zero".into()));
        }
        if run.max_wait < run.poll_interval {
            return Err(HarnessError::Config(
                "max_wait must not be shorter than poll_interval".into(),
            ));
        }
        if run.write_timeout.is_zero() {
            return Err(HarnessError::Config("write_timeout must not be zero".into()));
        }
        if let Some(label) = &self.output.label
            && label.contains(['\t', '\n', '\r'])
        {
            return Err(HarnessError::Config(
                "label must not contain tabs or line breaks".into(),
            ));
        }
        Ok(())
    }

    /// The workload that producer and detector agree on.
    pub fn workload(&self) -> Workload {
        let size = if self.run.empty {
            0
        } else {
            self.run.size.bytes()
        };

        Workload::builder(self.run.key_prefix.as_str())
            .iterations(self.run.iterations)
            .payload_size(size)
            .seed(self.run.seed)
            .verify_digest(self.run.verify_digest)
            .build()
    }

    pub fn producer_config(&self) -> ProducerConfig {
        ProducerConfig {
            write_interval: self.run.write_interval,
            write_retries: self.run.write_retries,
            retry_delay: self.run.retry_delay,
            write_timeout: self.run.write_timeout,
        }
    }

    pub fn detector_config(&self) -> DetectorConfig {
        DetectorConfig {
            poll_interval: self.run.poll_interval,
            max_wait: self.run.max_wait,
            write_interval: self.run.write_interval,
            fault_policy: self.run.fault_policy,
            mode: self.run.mode,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults() {
        figment::Jail::expect_with(|_jail| {
            let config = Config::load(None).unwrap();

            let Storage::FileSystem { path } = &config.storage else {
                panic!("expected filesystem storage");
            };
            assert_eq!(path, Path::new("data"));
            assert_eq!(config.run.poll_interval, Duration::from_millis(100));
            assert_eq!(config.run.max_wait, Duration::from_secs(5));
            assert_eq!(config.run.size, PayloadSize(1048576));
            assert_eq!(config.output.ledger, Path::new("ledger.tsv"));
            assert!(!config.sentry.is_enabled());

            Ok(())
        });
    }

    #[test]
    fn configurable_via_env() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("VB__STORAGE__TYPE", "s3compatible");
            jail.set_env("VB__STORAGE__ENDPOINT", "http://localhost:9000");
            jail.set_env("VB__STORAGE__BUCKET", "whatever");
            jail.set_env("VB__STORAGE__TOKEN", "s3cr3t");
            jail.set_env("VB__RUN__ITERATIONS", "20");
            jail.set_env("VB__RUN__SIZE", "64K");
            jail.set_env("VB__RUN__MODE", "delete");
            jail.set_env("VB__RUN__MAX_WAIT", "2s");
            jail.set_env("VB__RUN__FAULT_POLICY", "fatal");
            jail.set_env("VB__OUTPUT__LABEL", "wan-64k");
            jail.set_env("VB__SENTRY__DSN", "abcde");
            jail.set_env("VB__SENTRY__SAMPLE_RATE", "0.5");

            let config = Config::load(None).unwrap();

            let Storage::S3Compatible {
                endpoint,
                bucket,
                token,
            } = &dbg!(&config).storage
            else {
                panic!("expected s3 storage");
            };
            assert_eq!(endpoint, "http://localhost:9000");
            assert_eq!(bucket, "whatever");
            assert_eq!(token.as_ref().unwrap().expose_secret().as_str(), "s3cr3t");

            assert_eq!(config.run.iterations, 20);
            assert_eq!(config.run.size, PayloadSize(65536));
            assert_eq!(config.run.mode, Mode::Delete);
            assert_eq!(config.run.max_wait, Duration::from_secs(2));
            assert_eq!(config.run.fault_policy, FaultPolicy::Fatal);
            assert_eq!(config.output.label.as_deref(), Some("wan-64k"));
            assert_eq!(config.sentry.dsn.unwrap().expose_secret().as_str(), "abcde");
            assert_eq!(config.sentry.sample_rate, 0.5);

            Ok(())
        });
    }

    #[test]
    fn configurable_via_yaml() {
        let mut tempfile = tempfile::NamedTempFile::new().unwrap();
        tempfile
            .write_all(
                br#"
            storage:
                type: memory
                delay: 250ms
            run:
                key_prefix: "wan-test/"
                empty: true
                poll_interval: 50ms
                write_interval: 0s
            output:
                samples: samples.tsv
            logging:
                level: debug
                format: json
            "#,
            )
            .unwrap();

        figment::Jail::expect_with(|_jail| {
            let config = Config::load(Some(tempfile.path())).unwrap();

            let Storage::Memory { delay } = &dbg!(&config).storage else {
                panic!("expected memory storage");
            };
            assert_eq!(*delay, Duration::from_millis(250));
            assert_eq!(config.run.poll_interval, Duration::from_millis(50));
            assert_eq!(config.run.write_interval, Duration::ZERO);
            assert_eq!(config.output.samples.as_deref(), Some(Path::new("samples.tsv")));
            assert_eq!(config.logging.level, LevelFilter::DEBUG);
            assert_eq!(config.logging.format, LogFormat::Json);

            let workload = config.workload();
            assert_eq!(workload.payload_size(), 0);
            assert_eq!(workload.key(1), "wan-test/000001");

            Ok(())
        });
    }

    #[test]
    fn configured_with_env_and_yaml() {
        let mut tempfile = tempfile::NamedTempFile::new().unwrap();
        tempfile
            .write_all(
                br#"
            storage:
                type: azure
                account_url: http://localhost:10000/devstoreaccount1
                container: whatever
            run:
                max_wait: 10s
            "#,
            )
            .unwrap();

        figment::Jail::expect_with(|jail| {
            jail.set_env("VB__STORAGE__CONTAINER", "other");
            jail.set_env("VB__RUN__MAX_WAIT", "3s");

            let config = Config::load(Some(tempfile.path())).unwrap();

            let Storage::Azure {
                container,
                sas_token,
                ..
            } = &dbg!(&config).storage
            else {
                panic!("expected azure storage");
            };
            // Env should overwrite the yaml config
            assert_eq!(container, "other");
            assert!(sas_token.is_none());
            assert_eq!(config.run.max_wait, Duration::from_secs(3));

            Ok(())
        });
    }

    #[test]
    fn rejects_labels_that_break_the_ledger() {
        let mut config = Config::default();
        config.output.label = Some("lan\twan".into());
        assert!(config.validate().is_err());

        config.output.label = Some("lan\n".into());
        assert!(config.validate().is_err());

        config.output.label = Some("lan-64K".into());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn detector_follows_write_cadence() {
        let mut config = Config::default();
        config.run.write_interval = Duration::from_secs(5);
        assert_eq!(config.detector_config().write_interval, Duration::from_secs(5));
    }

    #[test]
    fn rejects_invalid_settings() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("VB__RUN__ITERATIONS", "0");
            assert!(Config::load(None).is_err());

            jail.set_env("VB__RUN__ITERATIONS", "5");
            jail.set_env("VB__RUN__MAX_WAIT", "10ms");
            assert!(Config::load(None).is_err());

            jail.set_env("VB__RUN__MAX_WAIT", "5s");
            jail.set_env("VB__RUN__SIZE", "12X");
            assert!(Config::load(None).is_err());

            jail.set_env("VB__RUN__SIZE", "1M");
            jail.set_env("VB__RUN__WRITE_TIMEOUT", "0s");
            assert!(Config::load(None).is_err());

            Ok(())
        });
    }
}
