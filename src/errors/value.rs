use serde::Serialize;
use serde_json::Value;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use super::classify;
use super::codes::Sentinel;

type BoxError = Box<dyn StdError + Send + Sync + 'static>;
type SharedError = Arc<dyn StdError + Send + Sync + 'static>;

/// Key/value pair logged alongside an error
#[derive(Debug, Clone, PartialEq)]
pub struct LogField {
    pub key: String,
    pub value: Value,
}

impl LogField {
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Build a `Vec<LogField>` from `key => value` pairs
///
/// ```
/// let fields = errs::fields!["user_id" => 42, "op" => "lookup"];
/// assert_eq!(fields.len(), 2);
/// ```
#[macro_export]
macro_rules! fields {
    ($($key:expr => $value:expr),* $(,)?) => {
        ::std::vec![$($crate::LogField::new($key, $value)),*]
    };
}

/// Payload sent to the client in the `details` field of an error response
///
/// Serialization is deferred until the error is rendered, so a payload that
/// cannot be represented as JSON surfaces as a rendering failure.
pub trait Details: fmt::Debug + Send + Sync {
    fn to_json(&self) -> serde_json::Result<Value>;
}

impl<T> Details for T
where
    T: Serialize + fmt::Debug + Send + Sync,
{
    fn to_json(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}

/// Recognized options for [`new`], [`wrap`], [`mark`] and [`newf!`](crate::newf)
///
/// Options are applied in the order given.
#[derive(Debug, Clone)]
pub enum Opt {
    /// Treat the internal message as safe when no safe message is set
    ExposeInternal(bool),
    SafeMessage(String),
    /// Appended to the existing log fields
    LogFields(Vec<LogField>),
    UserDetails(Arc<dyn Details>),
    Domain(String),
}

impl Opt {
    pub fn expose_internal(expose: bool) -> Self {
        Self::ExposeInternal(expose)
    }

    pub fn safe_message(message: impl Into<String>) -> Self {
        Self::SafeMessage(message.into())
    }

    pub fn log_fields(fields: impl IntoIterator<Item = LogField>) -> Self {
        Self::LogFields(fields.into_iter().collect())
    }

    pub fn user_details<T: Details + 'static>(details: T) -> Self {
        Self::UserDetails(Arc::new(details))
    }

    pub fn domain(domain: impl Into<String>) -> Self {
        Self::Domain(domain.into())
    }

    fn apply(self, err: &mut Error) {
        match self {
            Self::ExposeInternal(expose) => err.expose_internal = expose,
            Self::SafeMessage(message) => err.safe_message = Some(message),
            Self::LogFields(fields) => err.log_fields.extend(fields),
            Self::UserDetails(details) => err.user_details = Some(details),
            Self::Domain(domain) => err.domain = Some(domain),
        }
    }
}

#[derive(Debug, Clone)]
enum Internal {
    Message(Arc<str>),
    Sentinel(&'static Sentinel),
    Foreign(SharedError),
    /// Formatted message that embeds a cause
    Caused { message: Arc<str>, source: SharedError },
    /// Context added by a wrap layer
    Context { context: Arc<str>, inner: Arc<Error> },
}

impl Internal {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Message(_) => None,
            Self::Sentinel(sentinel) => Some(*sentinel),
            Self::Foreign(err) => Some(&**err),
            Self::Caused { source, .. } => Some(&**source),
            Self::Context { inner, .. } => Some(&**inner),
        }
    }
}

impl fmt::Display for Internal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Message(message) => f.write_str(message),
            Self::Sentinel(sentinel) => fmt::Display::fmt(sentinel, f),
            Self::Foreign(err) => fmt::Display::fmt(err, f),
            Self::Caused { message, .. } => f.write_str(message),
            Self::Context { context, inner } => write!(f, "{context}: {inner}"),
        }
    }
}

/// Error value carrying an internal cause plus everything needed to log it
/// and to render it safely to a client
///
/// Composition never mutates: [`Error::wrap`] and [`Error::mark`] borrow the
/// receiver and return a new value, so an `Error` can be shared across
/// threads once built.
#[derive(Debug, Clone)]
pub struct Error {
    internal: Internal,
    pub(crate) expose_internal: bool,
    pub(crate) safe_message: Option<String>,
    pub(crate) log_fields: Vec<LogField>,
    pub(crate) user_details: Option<Arc<dyn Details>>,
    pub(crate) domain: Option<String>,
    pub(crate) markers: Vec<&'static Sentinel>,
}

impl Error {
    fn from_internal(internal: Internal) -> Self {
        Self {
            internal,
            expose_internal: false,
            safe_message: None,
            log_fields: Vec::new(),
            user_details: None,
            domain: None,
            markers: Vec::new(),
        }
    }

    /// Error whose internal cause is a plain message
    pub fn msg(message: impl Into<String>) -> Self {
        Self::from_internal(Internal::Message(message.into().into()))
    }

    /// Error with its own message that keeps `source` as the wrapped cause
    ///
    /// The message is rendered as given; include the cause's text in it if it
    /// should appear in logs.
    pub fn caused_by<E>(message: impl Into<String>, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::from_internal(Internal::Caused {
            message: message.into().into(),
            source: Arc::new(source),
        })
    }

    /// Convert any error, keeping an `Error` as is and wrapping anything else
    pub fn from_std<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::from_boxed(Box::new(err))
    }

    /// Like [`Error::from_std`]; a boxed `&'static Sentinel` keeps its identity
    pub fn from_boxed(err: BoxError) -> Self {
        let err = match err.downcast::<Self>() {
            Ok(err) => return *err,
            Err(err) => err,
        };
        match err.downcast::<&'static Sentinel>() {
            Ok(sentinel) => Self::from(*sentinel),
            Err(foreign) => Self::from_internal(Internal::Foreign(Arc::from(foreign))),
        }
    }

    pub fn with_options(mut self, opts: impl IntoIterator<Item = Opt>) -> Self {
        for opt in opts {
            opt.apply(&mut self);
        }
        self
    }

    /// New error whose message is `"{context}: {self}"`
    ///
    /// Every other field, markers included, is carried over.
    pub fn wrap(&self, context: impl Into<String>) -> Self {
        self.clone().into_wrapped(context.into())
    }

    fn into_wrapped(self, context: String) -> Self {
        let inner = Arc::new(self);
        Self {
            internal: Internal::Context {
                context: context.into(),
                inner: Arc::clone(&inner),
            },
            expose_internal: inner.expose_internal,
            safe_message: inner.safe_message.clone(),
            log_fields: inner.log_fields.clone(),
            user_details: inner.user_details.clone(),
            domain: inner.domain.clone(),
            markers: inner.markers.clone(),
        }
    }

    /// New error that additionally matches `sentinel`; the message is unchanged
    pub fn mark(&self, sentinel: &'static Sentinel) -> Self {
        self.clone().into_marked(sentinel)
    }

    fn into_marked(mut self, sentinel: &'static Sentinel) -> Self {
        self.markers.push(sentinel);
        self
    }

    /// Whether `sentinel` matches this error, a marker anywhere in its chain,
    /// or one of its causes
    pub fn is(&self, sentinel: &Sentinel) -> bool {
        classify::is(self, sentinel)
    }

    /// First cause of type `E` in the chain, starting with this error
    pub fn find<E: StdError + 'static>(&self) -> Option<&E> {
        classify::find(self)
    }

    /// Whether `sentinel` is in this value's own marker set
    ///
    /// Markers on a cause kept by [`Error::caused_by`] are not included; use
    /// [`Error::is`] to search the whole chain.
    pub fn has_marker(&self, sentinel: &Sentinel) -> bool {
        self.markers.iter().any(|marker| *marker == sentinel)
    }

    pub fn markers(&self) -> &[&'static Sentinel] {
        &self.markers
    }

    pub fn expose_internal(&self) -> bool {
        self.expose_internal
    }

    pub fn safe_message(&self) -> Option<&str> {
        self.safe_message.as_deref().filter(|m| !m.is_empty())
    }

    pub fn log_fields(&self) -> &[LogField] {
        &self.log_fields
    }

    pub fn user_details(&self) -> Option<&dyn Details> {
        self.user_details.as_deref()
    }

    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref().filter(|d| !d.is_empty())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.internal, f)
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.internal.source()
    }
}

impl From<&'static Sentinel> for Error {
    fn from(sentinel: &'static Sentinel) -> Self {
        Self::from_internal(Internal::Sentinel(sentinel))
    }
}

/// Create an error from a message and apply `opts`
pub fn new(message: impl Into<String>, opts: impl IntoIterator<Item = Opt>) -> Error {
    Error::msg(message).with_options(opts)
}

/// Add context to `err`; `None` stays `None`
pub fn wrap<E>(
    err: Option<E>,
    context: impl Into<String>,
    opts: impl IntoIterator<Item = Opt>,
) -> Option<Error>
where
    E: StdError + Send + Sync + 'static,
{
    let err = err?;
    Some(
        Error::from_std(err)
            .into_wrapped(context.into())
            .with_options(opts),
    )
}

/// Mark `err` with `sentinel`; `None` stays `None`
///
/// A foreign error is wrapped in a fresh [`Error`] carrying only this marker.
pub fn mark<E>(
    err: Option<E>,
    sentinel: &'static Sentinel,
    opts: impl IntoIterator<Item = Opt>,
) -> Option<Error>
where
    E: StdError + Send + Sync + 'static,
{
    let err = err?;
    Some(Error::from_std(err).into_marked(sentinel).with_options(opts))
}

/// Create an [`Error`] from a format string
///
/// Options follow a `;`. Prefix with `source = err,` to keep `err` as the
/// wrapped cause, so markers and sentinels on it still match.
///
/// ```
/// use errs::{newf, Opt};
///
/// let err = newf!("user {} not found", 42; Opt::domain("users"));
/// assert_eq!(err.to_string(), "user 42 not found");
/// assert_eq!(err.domain(), Some("users"));
/// ```
#[macro_export]
macro_rules! newf {
    (source = $source:expr, $fmt:literal $(, $arg:expr)* $(; $($opt:expr),+)?) => {{
        let opts: ::std::vec::Vec<$crate::Opt> = ::std::vec![$($($opt),+)?];
        $crate::Error::caused_by(::std::format!($fmt $(, $arg)*), $source).with_options(opts)
    }};
    ($fmt:literal $(, $arg:expr)* $(; $($opt:expr),+)?) => {{
        let opts: ::std::vec::Vec<$crate::Opt> = ::std::vec![$($($opt),+)?];
        $crate::new(::std::format!($fmt $(, $arg)*), opts)
    }};
}

/// Wrap and mark errors inside a `Result`; `Ok` passes through untouched
pub trait ResultExt<T> {
    fn wrap_err(self, context: impl Into<String>) -> Result<T, Error>;

    fn mark_err(self, sentinel: &'static Sentinel) -> Result<T, Error>;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: StdError + Send + Sync + 'static,
{
    fn wrap_err(self, context: impl Into<String>) -> Result<T, Error> {
        self.map_err(|err| Error::from_std(err).into_wrapped(context.into()))
    }

    fn mark_err(self, sentinel: &'static Sentinel) -> Result<T, Error> {
        self.map_err(|err| Error::from_std(err).into_marked(sentinel))
    }
}
