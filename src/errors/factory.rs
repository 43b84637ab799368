use std::error::Error as StdError;
use std::sync::Arc;

use super::classify::get_http_code;
use super::codes::Sentinel;
use super::value::{Details, Error, LogField};

/// Fluent, copy-on-write builder for [`Error`]
///
/// Every method returns a new snapshot and leaves the receiver untouched, so
/// a partially configured factory can be reused as a template.
///
/// Errors are private by default. Marking with a sentinel that classifies
/// below 500 makes the error public, unless [`Factory::private`] or
/// [`Factory::public`] was called earlier in the lineage: once forced, the
/// visibility never changes through `mark` again.
///
/// ```
/// use errs::{f, NOT_FOUND};
///
/// let err = f().message("user 42 missing").mark(&NOT_FOUND).err();
/// assert!(err.expose_internal());
/// ```
#[derive(Debug, Clone)]
pub struct Factory {
    internal: Option<Error>,
    safe_message: Option<String>,
    log_fields: Vec<LogField>,
    user_details: Option<Arc<dyn Details>>,
    domain: Option<String>,
    markers: Vec<&'static Sentinel>,
    private: bool,
    forced: bool,
}

impl Default for Factory {
    fn default() -> Self {
        Self {
            internal: None,
            safe_message: None,
            log_fields: Vec::new(),
            user_details: None,
            domain: None,
            markers: Vec::new(),
            private: true,
            forced: false,
        }
    }
}

pub fn f() -> Factory {
    Factory::new()
}

impl Factory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Internal message
    pub fn message(&self, message: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.internal = Some(Error::msg(message));
        next
    }

    /// Internal message with `source` kept as the wrapped cause
    pub fn caused_by<E>(&self, message: impl Into<String>, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        let mut next = self.clone();
        next.internal = Some(Error::caused_by(message, source));
        next
    }

    /// Message shown to clients
    pub fn user_message(&self, message: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.safe_message = Some(message.into());
        next
    }

    pub fn logs(&self, fields: impl IntoIterator<Item = LogField>) -> Self {
        let mut next = self.clone();
        next.log_fields.extend(fields);
        next
    }

    pub fn details<T: Details + 'static>(&self, details: T) -> Self {
        let mut next = self.clone();
        next.user_details = Some(Arc::new(details));
        next
    }

    pub fn mark(&self, sentinel: &'static Sentinel) -> Self {
        let mut next = self.clone();
        next.markers.push(sentinel);

        if !next.forced && get_http_code(sentinel).as_u16() < 500 {
            next.private = false;
        }
        next
    }

    pub fn private(&self) -> Self {
        self.forced_visibility(true)
    }

    pub fn public(&self) -> Self {
        self.forced_visibility(false)
    }

    fn forced_visibility(&self, private: bool) -> Self {
        let mut next = self.clone();
        next.private = private;
        next.forced = true;
        next
    }

    pub fn domain(&self, domain: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.domain = Some(domain.into());
        next
    }

    /// Materialize the error; the internal message defaults to "unknown error"
    pub fn err(&self) -> Error {
        let mut err = self
            .internal
            .clone()
            .unwrap_or_else(|| Error::msg("unknown error"));

        err.expose_internal = !self.private;
        err.safe_message = self.safe_message.clone();
        err.log_fields = self.log_fields.clone();
        err.user_details = self.user_details.clone();
        err.domain = self.domain.clone();
        err.markers = self.markers.clone();
        err
    }
}
