use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    /// Appended to in addition to stderr.
    pub log_file: Option<PathBuf>,
    /// 0 = info, 1 = debug, 2+ = trace. `RUST_LOG` takes precedence.
    pub verbosity: u8,
}

/// Process-wide log output, installed once by the binary before a run.
#[derive(Debug)]
pub struct LoggingContext {
    log_file: Option<PathBuf>,
}

impl LoggingContext {
    pub fn init(options: &LogOptions) -> Result<Self> {
        let level = match options.verbosity {
            0 => "info",
            1 => "debug",
            _ => "trace",
        };
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

        let file_layer = match &options.log_file {
            Some(path) => {
                crate::ensure_parent_dir(path)?;
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map_err(|e| Error::writing(path, e))?;
                Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            }
            None => None,
        };

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(io::stderr))
            .with(file_layer)
            .try_init()
            .map_err(|e| Error::Config(format!("logging already initialized: {e}")))?;

        Ok(Self {
            log_file: options.log_file.clone(),
        })
    }

    pub fn log_file(&self) -> Option<&PathBuf> {
        self.log_file.as_ref()
    }
}
