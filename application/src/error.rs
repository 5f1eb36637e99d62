//! [`Error`]-related definitions.

use std::fmt;

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    response::{IntoResponse, Response},
    Json,
};
use derive_more::Error as StdError;
use itertools::Itertools as _;
use serde::Serialize;
use service::infra::database;
use tracerr::{Trace, Traced};

/// Defines a new error type.
#[expect(clippy::module_name_repetitions, reason = "more readable")]
#[macro_export]
macro_rules! define_error {
    (
        enum $name:ident {
            $(
                #[code = $code:literal]
                #[status = $status_code:ident]
                #[message = $message:literal]
                $variant:ident
            ),* $(,)?
        }
    ) => {
        /// Error type.
        #[derive(
            Clone,
            Copy,
            Debug,
            ::derive_more::Display,
            ::derive_more::Error
        )]
        #[repr(u16)]
        pub enum $name {
            $(
                #[display($message)]
                #[doc = $message]
                $variant,
            )*
        }

        impl From<$name> for $crate::Error {
            fn from(err: $name) -> Self {
                match err {
                    $(
                        $name::$variant => Self {
                            code: $code,
                            status_code: ::http::StatusCode::$status_code,
                            message: $message.to_string(),
                            backtrace: None,
                            errors: Vec::new(),
                            warnings: Vec::new(),
                        },
                    )*
                }
            }
        }
    };
}

/// REST API [`Error`].
#[derive(Clone, Debug, StdError)]
pub struct Error {
    /// [`Error`] code.
    pub code: Code,

    /// [`http::StatusCode`] of this [`Error`].
    pub status_code: http::StatusCode,

    /// Backtrace of this [`Error`].
    #[error(not(backtrace))]
    pub backtrace: Option<Trace>,

    /// [`Error`] message.
    pub message: String,

    /// Itemized validation errors.
    pub errors: Vec<String>,

    /// Itemized validation warnings.
    pub warnings: Vec<String>,
}

impl Error {
    /// Message of internal [`Error`]s exposed to clients.
    pub const INTERNAL_MESSAGE: &'static str = "Internal server error";

    /// Create a new [`Error`] representing an internal server error.
    #[must_use]
    pub fn internal(msg: &impl ToString) -> Self {
        Self {
            code: "INTERNAL_SERVER_ERROR",
            status_code: http::StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.to_string(),
            backtrace: None,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Attaches itemized validation `errors` and `warnings` to this [`Error`].
    #[must_use]
    pub fn with_items(
        mut self,
        errors: impl IntoIterator<Item = String>,
        warnings: impl IntoIterator<Item = String>,
    ) -> Self {
        self.errors.extend(errors);
        self.warnings.extend(warnings);
        self
    }

    /// Builds a failure [`Response`] out of this [`Error`], optionally
    /// including an empty `data` list.
    #[must_use]
    pub fn into_response_with(self, empty_data: bool) -> Response {
        /// Failure envelope.
        #[derive(Serialize)]
        struct Failure {
            success: bool,
            error: Code,
            message: String,
            #[serde(skip_serializing_if = "Vec::is_empty")]
            errors: Vec<String>,
            #[serde(skip_serializing_if = "Vec::is_empty")]
            warnings: Vec<String>,
            #[serde(skip_serializing_if = "Option::is_none")]
            data: Option<[(); 0]>,
        }

        let message = if self.status_code.is_server_error() {
            tracing::error!("{self}");
            Self::INTERNAL_MESSAGE.to_owned()
        } else {
            self.message
        };

        let body = Failure {
            success: false,
            error: self.code,
            message,
            errors: self.errors,
            warnings: self.warnings,
            data: empty_data.then_some([]),
        };
        (self.status_code, Json(body)).into_response()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self {
            code,
            status_code: _,
            backtrace,
            message,
            errors,
            warnings: _,
        } = self;

        write!(
            f,
            "[{code}]: {message}{}{}",
            errors
                .iter()
                .format_with("", |e, f| f(&format_args!("\n- {e}"))),
            backtrace
                .iter()
                .format_with("\n", |trace, f| f(&format_args!("\n{trace}"))),
        )
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        self.into_response_with(false)
    }
}

/// [`Error`] of list endpoints, always responding with an empty `data` list.
#[derive(Clone, Debug)]
pub struct ListError(pub Error);

impl From<Error> for ListError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ListError {
    fn into_response(self) -> Response {
        self.0.into_response_with(true)
    }
}

/// [`Error`] code.
pub type Code = &'static str;

/// Helper trait for converting types into [`Error`]s.
pub trait AsError {
    /// Tries to convert the type into an [`Error`].
    ///
    /// [`None`] is returned if the type cannot be converted into an [`Error`].
    fn try_as_error(&self) -> Option<Error>;

    /// Converts the type into an [`Error`].
    fn as_error(&self) -> Error
    where
        Self: fmt::Display,
    {
        self.try_as_error()
            .unwrap_or_else(|| Error::internal(&self))
    }

    /// Converts the type into an [`Error`] by consuming it.
    fn into_error(self) -> Error
    where
        Self: fmt::Display + Sized,
    {
        self.as_error()
    }
}

impl<E: AsError> AsError for Traced<E> {
    fn try_as_error(&self) -> Option<Error> {
        let mut error = self.as_ref().try_as_error()?;
        error.backtrace = Some(self.trace().clone());
        Some(error)
    }
}

impl AsError for QueryRejection {
    fn try_as_error(&self) -> Option<Error> {
        Some(Error {
            code: "BAD_REQUEST",
            status_code: http::StatusCode::BAD_REQUEST,
            message: self.body_text(),
            backtrace: None,
            errors: Vec::new(),
            warnings: Vec::new(),
        })
    }
}

impl AsError for JsonRejection {
    fn try_as_error(&self) -> Option<Error> {
        Some(Error {
            code: "BAD_REQUEST",
            status_code: self.status(),
            message: self.body_text(),
            backtrace: None,
            errors: Vec::new(),
            warnings: Vec::new(),
        })
    }
}

impl AsError for database::Error {
    fn try_as_error(&self) -> Option<Error> {
        None
    }
}

#[cfg(test)]
mod spec {
    use axum::response::IntoResponse as _;
    use serde_json::{json, Value};

    use super::{Error, ListError};

    async fn body(resp: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn validation_failure_lists_items() {
        let err = Error {
            code: "VALIDATION_FAILED",
            status_code: http::StatusCode::BAD_REQUEST,
            message: "Validation failed".into(),
            backtrace: None,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
        .with_items(["Price must be positive".to_owned()], []);

        let resp = err.into_response();
        assert_eq!(resp.status(), http::StatusCode::BAD_REQUEST);
        assert_eq!(
            body(resp).await,
            json!({
                "success": false,
                "error": "VALIDATION_FAILED",
                "message": "Validation failed",
                "errors": ["Price must be positive"],
            }),
        );
    }

    #[tokio::test]
    async fn internal_failure_hides_details() {
        let resp = ListError(Error::internal(&"connection refused"))
            .into_response();
        assert_eq!(resp.status(), http::StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body(resp).await,
            json!({
                "success": false,
                "error": "INTERNAL_SERVER_ERROR",
                "message": Error::INTERNAL_MESSAGE,
                "data": [],
            }),
        );
    }
}
