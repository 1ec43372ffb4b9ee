//! Fallible host allocation.
//!
//! Grid buffers are sized from an untrusted file header, so every
//! allocation goes through `try_reserve_exact` and surfaces exhaustion
//! as [`HeatflowError::Allocation`] instead of aborting the process.

use heatflow_types::{HeatflowError, HeatflowResult};

/// Allocates a vector of `len` copies of `value`.
pub fn try_filled<T: Clone>(what: &'static str, len: usize, value: T) -> HeatflowResult<Vec<T>> {
    let mut buf = try_with_capacity(what, len)?;
    buf.resize(len, value);
    Ok(buf)
}

/// Allocates an empty vector with room for exactly `len` elements.
pub fn try_with_capacity<T>(what: &'static str, len: usize) -> HeatflowResult<Vec<T>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len).map_err(|_| HeatflowError::Allocation {
        what,
        bytes: len.saturating_mul(std::mem::size_of::<T>()),
    })?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filled_has_requested_length() {
        let buf = try_filled("test", 5, 1.5f64).unwrap();
        assert_eq!(buf, vec![1.5; 5]);
    }

    #[test]
    fn impossible_request_is_an_allocation_error() {
        let err = try_with_capacity::<f64>("current", usize::MAX / 4).unwrap_err();
        assert!(matches!(err, HeatflowError::Allocation { what: "current", .. }));
    }
}
