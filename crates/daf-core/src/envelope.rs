//! Response envelope for front ends
//!
//! Wraps facade output with a status code, paging fields and the elapsed
//! time since the envelope was created.

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::time::{Duration, Instant};

pub const STATUS_OK: u16 = 200;
pub const STATUS_BAD_REQUEST: u16 = 400;
pub const STATUS_NOT_FOUND: u16 = 404;
pub const STATUS_GATEWAY_TIMEOUT: u16 = 504;
pub const STATUS_INTERNAL_ERROR: u16 = 500;

#[derive(Debug, Clone)]
pub struct ApiResult {
    pub status_code: u16,
    pub status_message: String,
    pub current_page: u32,
    pub items_per_page: u32,
    pub paging: u32,
    pub data: Vec<serde_json::Value>,
    started: Option<Instant>,
    frozen: Option<Duration>,
}

impl ApiResult {
    /// Envelope with the timer running
    pub fn new() -> Self {
        Self::with_timer(true)
    }

    pub fn with_timer(start_timer: bool) -> Self {
        Self {
            status_code: STATUS_OK,
            status_message: String::new(),
            current_page: 0,
            items_per_page: 0,
            paging: 0,
            data: Vec::new(),
            started: start_timer.then(Instant::now),
            frozen: None,
        }
    }

    pub fn start_timer(&mut self) {
        self.started = Some(Instant::now());
        self.frozen = None;
    }

    /// Freeze the elapsed time at its current value
    pub fn stop_timer(&mut self) {
        self.frozen = Some(self.elapsed());
    }

    pub fn elapsed(&self) -> Duration {
        match (self.frozen, self.started) {
            (Some(frozen), _) => frozen,
            (None, Some(started)) => started.elapsed(),
            (None, None) => Duration::ZERO,
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    pub fn total(&self) -> usize {
        self.data.len()
    }

    pub fn status_description(&self) -> &'static str {
        match self.status_code {
            STATUS_OK => "OK",
            STATUS_BAD_REQUEST => "BadRequest",
            STATUS_NOT_FOUND => "NotFound",
            STATUS_GATEWAY_TIMEOUT => "GatewayTimeout",
            STATUS_INTERNAL_ERROR => "InternalServerError",
            _ => "Unknown",
        }
    }

    /// Keep only the requested page of `data`
    ///
    /// Pages are 1-based; `items_per_page == 0` keeps everything.
    pub fn paginate(&mut self, page: u32, items_per_page: u32) {
        self.current_page = page.max(1);
        self.items_per_page = items_per_page;
        if items_per_page == 0 {
            self.paging = 1;
            return;
        }
        let per = items_per_page as usize;
        self.paging = u32::try_from(self.data.len().div_ceil(per)).unwrap_or(u32::MAX);
        let skip = (self.current_page as usize - 1).saturating_mul(per);
        self.data = std::mem::take(&mut self.data)
            .into_iter()
            .skip(skip)
            .take(per)
            .collect();
    }
}

impl Default for ApiResult {
    fn default() -> Self {
        Self::new()
    }
}

impl Serialize for ApiResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("ApiResult", 9)?;
        s.serialize_field("status_code", &self.status_code)?;
        s.serialize_field("status_description", self.status_description())?;
        s.serialize_field("status_message", &self.status_message)?;
        s.serialize_field("current_page", &self.current_page)?;
        s.serialize_field("items_per_page", &self.items_per_page)?;
        s.serialize_field("paging", &self.paging)?;
        s.serialize_field("total", &self.total())?;
        s.serialize_field("elapsed_ms", &self.elapsed_ms())?;
        s.serialize_field("data", &self.data)?;
        s.end()
    }
}
