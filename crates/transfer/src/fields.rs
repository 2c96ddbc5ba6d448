//! Read-side helpers over the response header table.
//!
//! Response headers are carried as an [`http::HeaderMap`], which is already a
//! case-insensitive, multi-valued mapping. This module adds the small lookup
//! surface the transfer engine and its body handlers rely on: first value,
//! all values in insertion order, and first value parsed as an integer.

use std::num::ParseIntError;

use http::HeaderMap;

/// Lookup extensions for [`HeaderMap`].
pub trait HeaderMapExt {
    /// Returns the first value of the given (possibly multi-valued) header,
    /// or `None` if the header is absent or its value is not valid UTF-8.
    fn first_value(&self, name: &str) -> Option<&str>;

    /// Returns all values of the given header in insertion order. Always
    /// returns a `Vec`, which is empty if the header is absent. Values that
    /// are not valid UTF-8 are skipped.
    fn all_values(&self, name: &str) -> Vec<&str>;

    /// Returns the first value of the given header parsed as a `u64`.
    ///
    /// An absent header is `Ok(None)`. A header that is present but does not
    /// parse as a `u64` is an `Err`, it is never silently treated as absent.
    fn first_value_as_u64(&self, name: &str) -> Result<Option<u64>, ParseIntError>;
}

impl HeaderMapExt for HeaderMap {
    fn first_value(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|value| value.to_str().ok())
    }

    fn all_values(&self, name: &str) -> Vec<&str> {
        self.get_all(name).iter().filter_map(|value| value.to_str().ok()).collect()
    }

    fn first_value_as_u64(&self, name: &str) -> Result<Option<u64>, ParseIntError> {
        match self.first_value(name) {
            Some(value) => value.trim().parse().map(Some),
            None => Ok(None),
        }
    }
}
