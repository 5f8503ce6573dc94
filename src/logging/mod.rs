//! 日志
//!
//! Two layers live here: the process-wide `tracing` subscriber set up by
//! [`init_logging`], and the service-level [`Logger`] with its pluggable
//! handlers, which mirrors every record into `tracing` as well.

pub mod error_logger;
pub mod handlers;
pub mod logger;

use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub use error_logger::{describe, ErrorLogger};
pub use handlers::{
    FingersCrossedHandler, Mail, MailHandler, MailTransport, SendmailTransport, StreamHandler,
};
pub use logger::{LogHandler, LogLevel, LogRecord, Logger};

/// 日志格式配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// 人类可读格式
    Pretty,
    /// 紧凑格式
    Compact,
}

/// 日志配置
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: Level,
    /// 输出格式
    pub format: LogFormat,
    /// 是否显示目标模块
    pub show_target: bool,
    /// 是否启用 ANSI 颜色
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::Compact,
            show_target: false,
            ansi: true,
        }
    }
}

impl LoggingConfig {
    /// 开发环境配置
    pub fn development() -> Self {
        Self {
            level: Level::DEBUG,
            format: LogFormat::Pretty,
            show_target: true,
            ansi: true,
        }
    }

    /// 生产环境配置
    pub fn production() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::Compact,
            show_target: true,
            ansi: false,
        }
    }

    /// 测试环境配置
    pub fn testing() -> Self {
        Self {
            level: Level::ERROR,
            format: LogFormat::Compact,
            show_target: false,
            ansi: false,
        }
    }

    /// Pick a configuration from the `-v` count given on the command line.
    pub fn from_verbosity(verbose: u8) -> Self {
        match verbose {
            0 => Self::default(),
            _ => Self::development(),
        }
    }
}

/// 初始化日志系统
///
/// `RUST_LOG` wins over the configured level when set. Calling this twice is
/// an error rather than a panic.
pub fn init_logging(config: LoggingConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str().to_lowercase()));

    let result = match config.format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .pretty()
                    .with_target(config.show_target)
                    .with_ansi(config.ansi)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        LogFormat::Compact => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .compact()
                    .with_target(config.show_target)
                    .with_ansi(config.ansi)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };
    result.map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))?;

    tracing::debug!(level = ?config.level, format = ?config.format, "Logging system initialized");
    Ok(())
}
