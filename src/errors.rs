use thiserror::Error;

/// Failures while turning a signed token into a typed payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("Invalid token format: expected 3 segments, found {segments}")]
    InvalidFormat { segments: usize },

    #[error("Invalid token payload: malformed base64 ({0})")]
    InvalidBase64(String),

    #[error("Invalid token payload: not valid UTF-8")]
    InvalidEncoding,

    #[error("Invalid token payload: malformed JSON ({0})")]
    InvalidJson(String),

    #[error("Invalid token payload: missing user object")]
    MissingUser,
}

#[derive(Debug, Clone, Error)]
pub enum AppError {
    #[error("Invalid authentication token")]
    InvalidAuthenticationToken {
        #[source]
        source: Box<AppError>,
    },

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("API error ({status}): {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid configuration response: {0}")]
    InvalidConfiguration(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

/// WordPress JWT error codes that mean the session can no longer be used.
const CREDENTIAL_ERROR_CODES: &[&str] = &[
    "jwt_auth_invalid_token",
    "jwt_auth_bad_config",
    "jwt_auth_expired_token",
    "rest_forbidden_invalid_token",
];

const CREDENTIAL_ERROR_FRAGMENTS: &[&str] = &["expired", "invalid token", "signature", "secret"];

impl AppError {
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::InvalidAuthenticationToken { .. } => "INVALID_AUTHENTICATION_TOKEN",
            AppError::Token(TokenError::InvalidFormat { .. }) => "INVALID_TOKEN_FORMAT",
            AppError::Token(_) => "INVALID_PAYLOAD",
            AppError::Api { .. } => "API_ERROR",
            AppError::Network(_) => "NETWORK_ERROR",
            AppError::InvalidConfiguration(_) => "INVALID_CONFIGURATION",
            AppError::Storage(_) => "STORAGE_ERROR",
            AppError::Serialization(_) => "SERIALIZATION_ERROR",
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
        }
    }

    pub fn invalid_authentication(cause: AppError) -> Self {
        AppError::InvalidAuthenticationToken {
            source: Box::new(cause),
        }
    }

    /// The decode failure behind an `InvalidAuthenticationToken`, if any.
    pub fn token_error(&self) -> Option<&TokenError> {
        match self {
            AppError::Token(err) => Some(err),
            AppError::InvalidAuthenticationToken { source } => source.token_error(),
            _ => None,
        }
    }

    /// Whether a results-sync failure means the credentials are invalid,
    /// expired, or signed with a secret the server no longer accepts.
    pub fn is_credential_failure(&self) -> bool {
        match self {
            AppError::Api { code, message, .. } => {
                let code_matches = code
                    .as_deref()
                    .is_some_and(|c| CREDENTIAL_ERROR_CODES.contains(&c));
                code_matches || message_signals_bad_credentials(message)
            }
            AppError::Network(message) => message_signals_bad_credentials(message),
            _ => false,
        }
    }
}

fn message_signals_bad_credentials(message: &str) -> bool {
    let lowered = message.to_lowercase();
    CREDENTIAL_ERROR_FRAGMENTS
        .iter()
        .any(|fragment| lowered.contains(fragment))
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;
