use thiserror::Error;

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

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Absence is never reported through this type: a table type that no loader supports, or a
/// value that is not present in a table, is answered with `None`. Errors are reserved for
/// loaders that could not produce data and for load sequences that were cancelled.
///
/// # Error Categories
///
/// ## Definition Errors
/// - [`Error::Malformed`] - A definition source is structurally invalid
/// - [`Error::Xml`] - The XML reader rejected a definition document
/// - [`Error::FileError`] - Filesystem I/O errors while reading a definition
///
/// ## Loading Errors
/// - [`Error::LoadFailed`] - A loader could not produce the requested table
/// - [`Error::Cancelled`] - A load sequence was cancelled through its token
///
/// ## Miscellaneous
/// - [`Error::LockError`] - Thread synchronization failure
/// - [`Error::Error`] - Wrapped failures without a dedicated variant
///
/// # Examples
///
/// ```rust,no_run
/// use lookupcache::{Error, LookupCache, loader::XmlLoader};
/// use std::sync::Arc;
///
/// let loader = XmlLoader::from_file("enums.xml");
/// let cache = LookupCache::new("global", vec![Arc::new(loader)]);
///
/// match cache.get_table("Country") {
///     Ok(Some(table)) => println!("{} countries", table.len()),
///     Ok(None) => println!("no loader knows this type"),
///     Err(Error::Malformed { message, file, line }) => {
///         eprintln!("Malformed definition: {} ({}:{})", message, file, line);
///     }
///     Err(e) => eprintln!("Load failed: {}", e),
/// }
/// # Ok::<(), lookupcache::Error>(())
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The definition source is damaged and could not be interpreted.
    ///
    /// The error includes the source location where the malformation was
    /// detected for debugging purposes.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// Error from the `quick-xml` reader while parsing a definition document.
    #[error("{0}")]
    Xml(#[from] quick_xml::Error),

    /// File I/O error.
    ///
    /// Wraps standard I/O errors that can occur while reading definition files.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// A loader could not produce data for a table type it claimed to support.
    ///
    /// The backing store may be unreachable or returned unusable data. Nothing
    /// was stored in the cache, so the request can be retried.
    #[error("Failed to load table '{table_type}' - {message}")]
    LoadFailed {
        /// The table type that was being loaded
        table_type: String,
        /// Description of the failure reported by the loader
        message: String,
    },

    /// The load sequence was cancelled before it completed.
    ///
    /// The associated value names the table type. Nothing was stored in the
    /// cache; the load is safe to retry.
    #[error("Loading of table '{0}' was cancelled")]
    Cancelled(String),

    /// Failed to lock target.
    ///
    /// This error occurs when thread synchronization fails, typically
    /// when trying to acquire a mutex or rwlock that is in an invalid state.
    #[error("Failed to lock target")]
    LockError,

    /// Generic error for miscellaneous failures.
    ///
    /// Used for errors that don't fit into other categories or for
    /// wrapping external library errors with additional context.
    #[error("{0}")]
    Error(String),
}

impl Error {
    /// Returns `true` if this error leaves the cache in a state where the same
    /// request may simply be retried later.
    ///
    /// Every loading error qualifies, since a failed sequence never stores a
    /// partial table. Definition errors are retryable only in the sense that the
    /// source itself has to be fixed first.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::LoadFailed { .. } | Error::Cancelled(_) | Error::FileError(_)
        )
    }
}
