use thiserror::Error;

use crate::metadata::token::Token;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

macro_rules! unresolved_error {
    ($token:expr, $context:expr) => {
        crate::Error::UnresolvedReference {
            token: $token,
            context: $context.to_string(),
        }
    };
}

/// The generic Error type covering all errors this library can return.
///
/// Expected failure modes (unresolved references, malformed graph input) are
/// explicit variants; internal-consistency violations inside the marking
/// engine are panics, never `Err` values, because they indicate the algorithm
/// itself has desynchronized rather than the input being bad.
///
/// # Error Categories
///
/// ## Resolution Errors
/// - [`Error::UnresolvedReference`] - A type/method/field reference could not
///   be resolved to a definition and the run is not configured to ignore it
/// - [`Error::TypeNotFound`] - A token does not address a live graph node
///
/// ## Engine Errors
/// - [`Error::MethodProcessing`] - Structural marking of one method failed;
///   carries the method's full name and declaring assembly
///
/// ## Input Errors
/// - [`Error::Malformed`] - The metadata graph violates a structural
///   expectation (e.g. an accessor without an owning property)
#[derive(Error, Debug)]
pub enum Error {
    /// A metadata reference could not be resolved to a definition.
    ///
    /// By default this aborts the marking run. Under the
    /// ignore-unresolved-references policy the failure is downgraded to a
    /// diagnostic and the reference is dropped from the graph instead.
    #[error("Unresolved metadata reference {token} ({context})")]
    UnresolvedReference {
        /// The reference token that failed to resolve
        token: Token,
        /// Where the reference was encountered
        context: String,
    },

    /// A token does not address a node in the metadata graph.
    #[error("No metadata node for token {0}")]
    TypeNotFound(Token),

    /// Structural marking of a single method failed.
    ///
    /// There is no partial-failure semantics inside one marking run; a
    /// half-marked graph is not a valid input to downstream steps, so this
    /// aborts the run.
    #[error("Error processing '{method}' in assembly '{assembly}': {source}")]
    MethodProcessing {
        /// Full name of the method being marked when the error occurred
        method: String,
        /// Name of the assembly declaring that method
        assembly: String,
        /// The underlying failure
        source: Box<Error>,
    },

    /// The metadata graph is structurally invalid.
    #[error("Malformed metadata ({file}:{line}) - {message}")]
    Malformed {
        /// Description of the malformation
        message: String,
        /// Source file where the malformation was detected
        file: &'static str,
        /// Source line where the malformation was detected
        line: u32,
    },
}
