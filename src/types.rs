//! Types module for the main runtime, exposing error and result types.
//!
//! Most code in this module is based around coercion of error types into
//! a common error type, to be used as the general "Error" of this crate.
//! Each error carries an `ErrorKind`, which decides the exit code of the
//! process once the error reaches `main`.
use logger::SetLoggerError;
use quick_xml::events::Event;
use quick_xml::Reader;
use rusoto_core::request;

use std::fmt::{self, Debug, Display, Formatter};
use std::io;

use crate::render::RenderError;
use crate::rule::merge::UnknownRule;
use crate::rule::ValidationError;
use crate::store::StoreError;

/// Public type alias for a result with a `UtilError` error type.
pub type UtilResult<T> = Result<T, UtilError>;

/// Exit code used when an operation against the remote fails.
pub const OPERATION_EXIT_CODE: i32 = 1;

/// Exit code used when arguments fail to parse or validate.
pub const USAGE_EXIT_CODE: i32 = 2;

/// Exit code used when a command is interrupted by the user.
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Broad classification of a `UtilError`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad flag combinations or missing arguments; help is printed.
    Usage,
    /// Rule construction or validation failures.
    Validation,
    /// Failures talking to (or reported by) the remote server.
    Operation,
    /// The command was cancelled before it could finish.
    Interrupted,
}

impl ErrorKind {
    /// Returns the process exit code associated with this kind.
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorKind::Usage | ErrorKind::Validation => USAGE_EXIT_CODE,
            ErrorKind::Operation => OPERATION_EXIT_CODE,
            ErrorKind::Interrupted => INTERRUPTED_EXIT_CODE,
        }
    }
}

/// Delegating error wrapper for errors raised by the main archive.
///
/// The internal `String` representation enables cheap coercion from
/// other error types by binding their error messages through, with
/// an attached `ErrorKind` to route the exit code.
pub struct UtilError {
    kind: ErrorKind,
    message: String,
}

impl UtilError {
    /// Constructs a new `UtilError` of the given kind.
    pub fn new<M: Into<String>>(kind: ErrorKind, message: M) -> UtilError {
        UtilError {
            kind,
            message: message.into(),
        }
    }

    /// Constructs a usage error, which prints command help on exit.
    pub fn usage<M: Into<String>>(message: M) -> UtilError {
        UtilError::new(ErrorKind::Usage, message)
    }

    /// Constructs an operation error.
    pub fn operation<M: Into<String>>(message: M) -> UtilError {
        UtilError::new(ErrorKind::Operation, message)
    }

    /// Retrieves the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Retrieves the message of this error.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Prefixes the message with some context, keeping the kind.
    pub fn context<C: Display>(self, context: C) -> UtilError {
        UtilError {
            kind: self.kind,
            message: format!("{}: {}", context, self.message),
        }
    }
}

/// Debug implementation for `UtilError`.
impl Debug for UtilError {
    /// Formats an `UtilError` by delegating to `Display`.
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        Display::fmt(self, f)
    }
}

/// Display implementation for `UtilError`.
impl Display for UtilError {
    /// Formats an `UtilError` by writing out the inner representation.
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

/// Macro to implement `From` for provided types.
macro_rules! derive_from {
    ($type:ty) => {
        impl<'a> From<$type> for UtilError {
            fn from(t: $type) -> UtilError {
                UtilError::operation(t.to_string())
            }
        }
    };
}

// Easy derivations of derive_from.
derive_from!(&'a str);
derive_from!(io::Error);
derive_from!(SetLoggerError);
derive_from!(serde_json::Error);
derive_from!(request::TlsError);
derive_from!(String);

impl From<clap::Error> for UtilError {
    /// Converts a parser error into a usage error.
    fn from(err: clap::Error) -> UtilError {
        UtilError::usage(err.message)
    }
}

impl From<ValidationError> for UtilError {
    /// Converts a rule validation failure into a validation error.
    fn from(err: ValidationError) -> UtilError {
        UtilError::new(ErrorKind::Validation, err.to_string())
    }
}

impl From<StoreError> for UtilError {
    /// Converts a remote store failure into an operation error.
    fn from(err: StoreError) -> UtilError {
        UtilError::operation(err.to_string())
    }
}

impl From<UnknownRule> for UtilError {
    /// Converts a missing rule into an operation error.
    fn from(err: UnknownRule) -> UtilError {
        UtilError::operation(err.to_string())
    }
}

impl From<RenderError> for UtilError {
    /// Converts an empty display into an operation error.
    fn from(err: RenderError) -> UtilError {
        UtilError::operation(err.to_string())
    }
}

/// Locates the text of the first `tag` element in an S3 XML error body.
///
/// Returns `None` if the body is not XML, or if no such tag exists.
pub fn xml_error_field(body: &str, tag: &[u8]) -> Option<String> {
    // only bother with XML payloads
    if !body.trim_start().starts_with('<') {
        return None;
    }

    // create an XML reader and buffer
    let mut reader = Reader::from_str(body);
    let mut buffer = Vec::new();

    loop {
        // parse through each XML node event
        match reader.read_event(&mut buffer) {
            // end, or error, just give up
            Ok(Event::Eof) | Err(_) => return None,

            // if we find the tag, we'll use the text inside it
            Ok(Event::Start(ref e)) if e.name() == tag => {
                return reader.read_text(tag, &mut Vec::new()).ok();
            }

            // skip
            _ => (),
        }
        // empty buffers
        buffer.clear();
    }
}
