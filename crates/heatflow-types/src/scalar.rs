//! Scalar type alias for grid temperatures.
//!
//! Host-side temperatures are double precision, matching the
//! precision of the text file format. Device backends that only
//! support `f32` narrow on upload and widen on download.

/// The floating-point type used for every temperature on the host.
pub type Scalar = f64;
