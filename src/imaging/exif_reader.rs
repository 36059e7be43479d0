//! EXIF tag extraction via `kamadak-exif`.
//!
//! Only primary-image fields are kept (IFD0 and its Exif/GPS sub-IFDs); the
//! thumbnail IFD repeats tags like `Software` and would shadow the real ones.
//!
//! | Reader outcome | Result |
//! |---|---|
//! | Fields parsed | `Tags(name → value)` |
//! | Container has no EXIF segment | `Tags(empty)` |
//! | Unsupported container, corrupt data | `Unreadable(reason)` |

use crate::types::EmbeddedMetadata;
use std::io::Cursor;

/// Extract EXIF tags from raw container bytes.
pub fn read_exif(bytes: &[u8]) -> EmbeddedMetadata {
    let mut cursor = Cursor::new(bytes);
    let exif = match exif::Reader::new().read_from_container(&mut cursor) {
        Ok(exif) => exif,
        Err(exif::Error::NotFound(_)) => return EmbeddedMetadata::empty(),
        Err(e) => return EmbeddedMetadata::Unreadable(e.to_string()),
    };

    EmbeddedMetadata::from_pairs(
        exif.fields()
            .filter(|f| f.ifd_num == exif::In::PRIMARY)
            .map(|f| (f.tag.to_string(), field_text(f))),
    )
}

/// ASCII values are joined raw; `display_value` would wrap them in quotes.
fn field_text(field: &exif::Field) -> String {
    match &field.value {
        exif::Value::Ascii(parts) => parts
            .iter()
            .map(|p| String::from_utf8_lossy(p).trim_end_matches('\0').trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        _ => field.display_value().to_string(),
    }
}
