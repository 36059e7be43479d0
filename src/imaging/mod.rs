//! Image I/O and pixel math.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Load** | `image::ImageReader` (format sniffed from content) |
//! | **EXIF tags** | `kamadak-exif` |
//! | **JPEG round-trip** | `JpegEncoder` at a fixed quality, decoded back |
//! | **Debug composite** | `imageops::resize` + `imageops::replace` |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for pixel math (unit testable)
//! - **Parameters**: [`Quality`]
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: Debug-image composition

pub mod backend;
pub mod calculations;
pub(crate) mod exif_reader;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, ImageBackend};
pub use operations::compose_side_by_side;
pub use params::Quality;
pub use rust_backend::{RustBackend, supported_input_extensions};
