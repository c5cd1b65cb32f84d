//! Session name transforms
//!
//! A session name is an opaque user identifier, typically an email-like
//! address. The safe form is valid both as a runtime container name and
//! as a filesystem path component; the runtime form carries the leading
//! slash the runtime reports in listings and inspect payloads.

/// Filesystem- and runtime-safe form of a session name.
pub fn safe_name(session: &str) -> String {
    session.replace('@', "_at_").replace('.', "_")
}

/// The runtime's internal name for a session's container.
pub fn runtime_name(session: &str) -> String {
    format!("/{}", safe_name(session))
}

/// Strip the runtime's leading slash from a container name.
pub fn session_from_runtime(name: &str) -> &str {
    name.strip_prefix('/').unwrap_or(name)
}
