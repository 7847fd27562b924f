use crate::storage::S3Service;

const HASH_PREFIX_LEN: usize = 16;

/// Where an image role is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleRoute {
    /// Before-disaster imagery: building localisation, no cost report.
    Localization,
    /// After-disaster imagery: damage severity mask with a cost report.
    Severity,
    Unrecognized,
}

impl RoleRoute {
    pub fn mask_type(self) -> Option<&'static str> {
        match self {
            RoleRoute::Localization => Some("localisation"),
            RoleRoute::Severity => Some("damage_severity_mask"),
            RoleRoute::Unrecognized => None,
        }
    }
}

pub fn classify(role: &str) -> RoleRoute {
    if role.contains("pre_disaster") {
        RoleRoute::Localization
    } else if role.contains("post_disaster") {
        RoleRoute::Severity
    } else {
        RoleRoute::Unrecognized
    }
}

/// Splits `name.ext` into (`name`, `.ext`). Leading dots and dots in
/// directory components do not start an extension.
fn split_extension(role: &str) -> (&str, &str) {
    let file_start = role.rfind('/').map_or(0, |i| i + 1);
    match role[file_start..].rfind('.') {
        Some(dot) if dot > 0 => role.split_at(file_start + dot),
        _ => (role, ""),
    }
}

/// Extension for staging the fetched image; `.png` when the role has none.
pub fn staging_suffix(role: &str) -> &str {
    match split_extension(role).1 {
        "" => ".png",
        ext => ext,
    }
}

/// Published name of the processed mask: base name + `_mask` + extension.
pub fn mask_file_name(role: &str) -> String {
    let (base, _) = split_extension(role);
    format!("{}_mask{}", base, staging_suffix(role))
}

/// Object name for a published mask. The content hash prefix keeps masks of
/// different images apart when several groups or requests reuse a role name.
pub fn published_name(role: &str, png: &[u8]) -> String {
    let hash = S3Service::calculate_image_hash(png);
    format!("{}/{}", &hash[..HASH_PREFIX_LEN], mask_file_name(role))
}
