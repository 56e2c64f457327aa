//! One unit of asynchronous result state.
//!
//! A slot moves Idle → Loading → Ready | Failed, and back to Loading on a
//! retry or refresh. Updates are whole-record replacements; there is no
//! partial mutation from the outside.

use crate::error::ApiError;

#[derive(Clone, Debug, PartialEq)]
pub struct Slot<T> {
    pub data: Option<T>,
    pub loading: bool,
    pub error: Option<ApiError>,
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self::idle()
    }
}

impl<T> Slot<T> {
    /// Empty slot: nothing fetched yet.
    pub fn idle() -> Self {
        Self {
            data: None,
            loading: false,
            error: None,
        }
    }

    /// Enter Loading. Previous data stays visible during a refresh so the
    /// view never flashes to empty; a prior error is cleared.
    pub fn begin(&mut self) {
        self.loading = true;
        self.error = None;
    }

    /// Settle the current attempt. A failure drops any retained data, so a
    /// settled slot holds exactly one of data or error.
    pub fn resolve(&mut self, outcome: Result<T, ApiError>) {
        match outcome {
            Ok(data) => {
                *self = Self {
                    data: Some(data),
                    loading: false,
                    error: None,
                };
            }
            Err(error) => {
                *self = Self {
                    data: None,
                    loading: false,
                    error: Some(error),
                };
            }
        }
    }

    /// Replace data without going through Loading — used by the
    /// stale-while-revalidate background refresh. A failed refresh never
    /// downgrades a populated slot.
    pub fn resolve_background(&mut self, outcome: Result<T, ApiError>) {
        match outcome {
            Ok(data) => {
                *self = Self {
                    data: Some(data),
                    loading: false,
                    error: None,
                };
            }
            Err(_) if self.data.is_some() => {
                // keep the last good value
                self.loading = false;
            }
            Err(error) => {
                *self = Self {
                    data: None,
                    loading: false,
                    error: Some(error),
                };
            }
        }
    }

    pub fn is_idle(&self) -> bool {
        self.data.is_none() && !self.loading && self.error.is_none()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}
