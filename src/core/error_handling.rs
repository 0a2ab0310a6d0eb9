//! Generic error handling utilities
//!
//! Provides unified error handling that can work across different error types
//! while maintaining domain-specific error logging patterns.

/// Trait for errors that can distinguish between user-actionable and system errors
///
/// The gateway in front of the queue engine surfaces user-actionable errors
/// (a full queue, a duplicate check-in) as specific messages, while system
/// errors (a failed durable write) only get generic context plus debug detail.
///
/// # Implementation Consistency
/// When `is_user_actionable()` returns `true`, `user_message()` should return
/// `Some(message)` with a helpful, actionable message. When it returns `false`,
/// `user_message()` should return `None`.
pub trait ContextualError: std::error::Error {
    /// Returns true if this error carries a specific, user-actionable message
    /// that should be displayed directly to the caller.
    ///
    /// Examples of user-actionable errors:
    /// - A patient checking in while already queued
    /// - Calling the next patient from an empty queue
    ///
    /// Examples of system errors:
    /// - Durable store write failures
    /// - Event channel failures
    fn is_user_actionable(&self) -> bool;

    /// Returns the specific user message if this is a user-actionable error.
    fn user_message(&self) -> Option<&str>;
}

/// Log errors with appropriate detail level based on error specificity
///
/// User-actionable errors log their specific message; system errors log the
/// operation context only, with full detail pushed down to debug level.
pub fn log_error_with_context<E: ContextualError + std::fmt::Display + std::fmt::Debug>(
    error: &E,
    operation_context: &str,
) {
    if error.is_user_actionable() {
        if let Some(user_msg) = error.user_message() {
            log::error!("FATAL: {}", user_msg);
        } else {
            log::error!("FATAL: {}", operation_context);
        }
    } else {
        log::error!("FATAL: {}", operation_context);
    }
    log::debug!("DETAIL: {}", error);
    log::debug!("DEBUG_DETAILS: {:?}", error);
}
