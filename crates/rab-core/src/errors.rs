/// Boxed underlying cause carried by the error kinds below.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Core error type for the bot.
///
/// A small closed set of kinds: callers branch on the variant (for example to
/// tell [`Error::NoSavedPages`] apart from a real storage fault) instead of
/// matching on message text. Adapter crates map their specific errors into
/// this type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("transport error: {context}: {source}")]
    Transport {
        context: String,
        #[source]
        source: BoxError,
    },

    #[error("protocol error: {context}: {source}")]
    Protocol {
        context: String,
        #[source]
        source: BoxError,
    },

    #[error("storage error: {context}: {source}")]
    Storage {
        context: String,
        #[source]
        source: BoxError,
    },

    #[error("no saved pages")]
    NoSavedPages,
}

impl Error {
    pub fn transport(context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Transport {
            context: context.into(),
            source: source.into(),
        }
    }

    pub fn protocol(context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Protocol {
            context: context.into(),
            source: source.into(),
        }
    }

    pub fn storage(context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Storage {
            context: context.into(),
            source: source.into(),
        }
    }

    /// Fetch-side failures the consumer loop retries after a backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Protocol { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
