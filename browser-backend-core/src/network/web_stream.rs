use std::io::{self, Read, Seek, SeekFrom};
use std::time::Duration;

use crate::models::error::BackendError;

const DEFAULT_REDIRECTS: u32 = 5;

/// Split `Key: value` lines into pairs. Lines without a colon or with an
/// empty key are skipped.
pub fn parse_http_headers(text: &str) -> Vec<(String, String)> {
    text.lines()
        .filter_map(|line| {
            let (key, value) = line.split_once(':')?;
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            Some((key.to_string(), value.trim().to_string()))
        })
        .collect()
}

/// An outgoing HTTP request.
///
/// The method is `POST` when a body is attached and `GET` otherwise, unless a
/// custom command was set.
#[derive(Debug, Clone, PartialEq)]
pub struct WebRequest {
    url: String,
    command: Option<String>,
    headers: String,
    body: Vec<u8>,
    timeout: Option<Duration>,
    max_redirects: u32,
}

impl WebRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            command: None,
            headers: String::new(),
            body: Vec::new(),
            timeout: None,
            max_redirects: DEFAULT_REDIRECTS,
        }
    }

    /// Append raw header lines (`Key: value`, newline separated).
    pub fn with_extra_headers(mut self, extra: &str) -> Self {
        if !self.headers.is_empty() && !self.headers.ends_with('\n') {
            self.headers.push_str("\r\n");
        }
        self.headers.push_str(extra);
        if !self.headers.is_empty() && !self.headers.ends_with('\n') {
            self.headers.push_str("\r\n");
        }
        self
    }

    pub fn with_custom_request_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    pub fn with_post_data(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_num_redirects_to_follow(mut self, redirects: u32) -> Self {
        self.max_redirects = redirects;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn method(&self) -> &str {
        match &self.command {
            Some(command) => command,
            None if self.body.is_empty() => "GET",
            None => "POST",
        }
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn max_redirects(&self) -> u32 {
        self.max_redirects
    }

    pub fn request_headers(&self) -> Vec<(String, String)> {
        parse_http_headers(&self.headers)
    }
}

/// A completed HTTP response, body fully loaded.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WebResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl WebResponse {
    /// First header named `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Seekable reader over the body of one request.
///
/// The transport loads the whole body and hands the outcome to
/// [`complete`](Self::complete); until then, and after a failure or
/// [`cancel`](Self::cancel), reads return nothing.
#[derive(Debug)]
pub struct WebInputStream {
    request: WebRequest,
    response: Option<WebResponse>,
    error: Option<BackendError>,
    position: u64,
    cancelled: bool,
}

impl WebInputStream {
    pub fn new(request: WebRequest) -> Self {
        Self {
            request,
            response: None,
            error: None,
            position: 0,
            cancelled: false,
        }
    }

    pub fn request(&self) -> &WebRequest {
        &self.request
    }

    /// Store the transport's outcome. Returns whether a response is now
    /// available; ignored once cancelled.
    pub fn complete(&mut self, outcome: Result<WebResponse, BackendError>) -> bool {
        if self.cancelled {
            return false;
        }
        match outcome {
            Ok(response) => {
                log::debug!(
                    "{} {} -> {} ({} bytes)",
                    self.request.method(),
                    self.request.url,
                    response.status,
                    response.body.len()
                );
                self.response = Some(response);
                self.error = None;
            }
            Err(e) => {
                log::warn!("{} {} failed: {}", self.request.method(), self.request.url, e);
                self.response = None;
                self.error = Some(e);
            }
        }
        self.position = 0;
        self.response.is_some()
    }

    pub fn cancel(&mut self) {
        self.cancelled = true;
        self.response = None;
    }

    pub fn is_connected(&self) -> bool {
        self.response.is_some()
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn error(&self) -> Option<&BackendError> {
        self.error.as_ref()
    }

    /// HTTP status, or 0 without a response.
    pub fn status_code(&self) -> u16 {
        self.response.as_ref().map(|r| r.status).unwrap_or(0)
    }

    pub fn response_headers(&self) -> &[(String, String)] {
        self.response.as_ref().map(|r| r.headers.as_slice()).unwrap_or(&[])
    }

    pub fn total_length(&self) -> Option<u64> {
        self.response.as_ref().map(|r| r.body.len() as u64)
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn is_exhausted(&self) -> bool {
        self.total_length().map_or(true, |len| self.position >= len)
    }

    /// Move within the loaded body. Positions past the end are rejected.
    pub fn set_position(&mut self, position: u64) -> bool {
        match self.total_length() {
            Some(len) if position <= len => {
                self.position = position;
                true
            }
            _ => false,
        }
    }
}

impl Read for WebInputStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let Some(response) = &self.response else {
            return Ok(0);
        };
        let start = (self.position as usize).min(response.body.len());
        let count = buf.len().min(response.body.len() - start);
        buf[..count].copy_from_slice(&response.body[start..start + count]);
        self.position += count as u64;
        Ok(count)
    }
}

impl Seek for WebInputStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let len = self.total_length().unwrap_or(0) as i128;
        let target = match pos {
            SeekFrom::Start(offset) => offset as i128,
            SeekFrom::End(offset) => len + offset as i128,
            SeekFrom::Current(offset) => self.position as i128 + offset as i128,
        };
        if target < 0 || !self.set_position(target as u64) {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "seek outside the response body"));
        }
        Ok(self.position)
    }
}
