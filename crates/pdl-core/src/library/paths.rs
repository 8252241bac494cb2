//! Local layout of downloaded versions: `<dest>/<asset dir>/<version>.<ext>`.

use sha2::{Digest, Sha256};
use std::path::Path;

use crate::runner::Version;

/// Hex digits of the identifier digest appended to every directory name.
const ID_HASH_LEN: usize = 12;

/// Directory name for an asset: a readable form of its identifier plus a short
/// SHA-256 of the raw identifier, so distinct ids never share a directory.
///
/// The readable part:
/// - Replaces NUL, `/`, `\`, whitespace and control characters with `_`
/// - Collapses consecutive underscores
/// - Trims leading/trailing dots and underscores
/// - Is cut so the whole name fits in 255 bytes (Linux NAME_MAX)
pub fn asset_dir_name(asset_id: &str) -> String {
    const NAME_MAX: usize = 255;

    let mut out = String::with_capacity(asset_id.len());
    let mut prev_underscore = false;
    for c in asset_id.chars() {
        let c = if c == '\0' || c == '/' || c == '\\' || c.is_control() || c.is_whitespace() {
            '_'
        } else {
            c
        };
        if c == '_' {
            if !prev_underscore {
                out.push('_');
            }
            prev_underscore = true;
        } else {
            out.push(c);
            prev_underscore = false;
        }
    }

    let trimmed = out.trim_matches(|c| c == '.' || c == '_');
    let max_prefix = NAME_MAX - ID_HASH_LEN - 1;
    let prefix = if trimmed.len() > max_prefix {
        let mut take = max_prefix;
        while take > 0 && !trimmed.is_char_boundary(take) {
            take -= 1;
        }
        &trimmed[..take]
    } else {
        trimmed
    };
    let prefix = if prefix.is_empty() { "asset" } else { prefix };

    format!("{}-{}", prefix, id_hash(asset_id))
}

fn id_hash(asset_id: &str) -> String {
    let digest = Sha256::digest(asset_id.as_bytes());
    let mut hex = hex::encode(digest);
    hex.truncate(ID_HASH_LEN);
    hex
}

/// File name for one version, keeping the source file's extension (`original.HEIC`).
pub fn version_file_name(version: Version, source: Option<&Path>) -> String {
    match source
        .and_then(Path::extension)
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
    {
        Some(ext) => format!("{}.{}", version.as_str(), ext),
        None => version.as_str().to_string(),
    }
}
