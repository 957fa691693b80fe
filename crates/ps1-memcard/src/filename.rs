//! Splitting a save filename into the three directory fields.
//!
//! The split is positional: two characters of country code, ten of product
//! code, and whatever remains as the identifier. Existing cards depend on
//! this layout, e.g. `BASLUS-00067CASTLEVA` → `BA` / `SLUS-00067` / `CASTLEVA`.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::layout::{COUNTRY_CODE_LEN, FILENAME_MAX_LEN, IDENTIFIER_LEN, PRODUCT_CODE_LEN};

/// How much checking happens before a filename is written to the directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FilenamePolicy {
    /// ASCII and short enough to fit the fields.
    #[default]
    Positional,
    /// Additionally requires a `B?` country code, a full product code and a
    /// non-empty identifier.
    Strict,
}

/// Directory fields derived from a filename, NUL padded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveFilename {
    pub country_code: [u8; COUNTRY_CODE_LEN],
    pub product_code: [u8; PRODUCT_CODE_LEN],
    pub identifier: [u8; IDENTIFIER_LEN],
}

impl SaveFilename {
    pub fn parse(filename: &str, policy: FilenamePolicy) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidFilename {
            filename: filename.to_string(),
            reason: reason.to_string(),
        };

        if !filename.is_ascii() {
            return Err(invalid("must be ASCII"));
        }
        if filename.contains('\0') {
            return Err(invalid("must not contain NUL"));
        }
        if filename.len() > FILENAME_MAX_LEN {
            return Err(invalid("longer than 20 characters"));
        }

        let bytes = filename.as_bytes();
        let country = field(bytes, 0, COUNTRY_CODE_LEN);
        let product = field(bytes, COUNTRY_CODE_LEN, PRODUCT_CODE_LEN);
        let identifier = field(bytes, COUNTRY_CODE_LEN + PRODUCT_CODE_LEN, IDENTIFIER_LEN);

        if policy == FilenamePolicy::Strict {
            if country.len() != COUNTRY_CODE_LEN || !country.starts_with(b"B") {
                return Err(invalid("country code must be two characters starting with 'B'"));
            }
            if product.len() != PRODUCT_CODE_LEN || !product.iter().all(u8::is_ascii_graphic) {
                return Err(invalid("product code must be ten printable characters"));
            }
            if identifier.is_empty() {
                return Err(invalid("identifier is empty"));
            }
        }

        let mut parsed = Self {
            country_code: [0; COUNTRY_CODE_LEN],
            product_code: [0; PRODUCT_CODE_LEN],
            identifier: [0; IDENTIFIER_LEN],
        };
        parsed.country_code[..country.len()].copy_from_slice(country);
        parsed.product_code[..product.len()].copy_from_slice(product);
        parsed.identifier[..identifier.len()].copy_from_slice(identifier);
        Ok(parsed)
    }
}

fn field(bytes: &[u8], start: usize, len: usize) -> &[u8] {
    let start = start.min(bytes.len());
    let end = (start + len).min(bytes.len());
    &bytes[start..end]
}
