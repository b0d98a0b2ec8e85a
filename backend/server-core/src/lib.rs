pub mod config;
pub mod error;
pub mod port;
pub mod readiness;
pub mod supervisor;

#[cfg(test)]
mod tests;

pub const SERVER_BINARY: &str = "next";
pub const SERVER_PROBE_HOSTNAME: &str = "127.0.0.1";
pub const SERVER_CONTENT_HOSTNAME: &str = "localhost";
pub const SERVER_CONTENT_BASE_URL: &str =
    const_format::concatcp!("http://", SERVER_CONTENT_HOSTNAME);
pub const DEFAULT_SERVER_PORT: u16 = 3457;

/// Log target used for lines forwarded from the server's stdout/stderr.
pub const SERVER_LOG_TARGET: &str = "server";

/// URL the shell window loads for a server listening on `port`.
pub fn content_url(port: u16) -> String {
    format!("{SERVER_CONTENT_BASE_URL}:{port}/")
}
