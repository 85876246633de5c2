//! Node name handling: extension splitting, numbering, slugs.

/// Longest extension segment recognised when splitting compound extensions.
const MAX_EXTENSION_SEGMENT: usize = 4;

/// Split a name into its stem and extension chain.
///
/// Up to two trailing extension segments are peeled so that
/// `archive.tar.gz` splits into `("archive", ".tar.gz")`. A segment only
/// counts as an extension when it is short and alphanumeric, which keeps
/// `v1.2 notes.txt` intact as `("v1.2 notes", ".txt")`.
pub fn split_name(name: &str) -> (&str, &str) {
    let mut stem_end = name.len();
    for _ in 0..2 {
        let head = &name[..stem_end];
        let Some(dot) = head.rfind('.') else { break };
        let segment = &head[dot + 1..];
        let is_extension = dot > 0
            && !segment.is_empty()
            && segment.len() <= MAX_EXTENSION_SEGMENT
            && segment.chars().all(|c| c.is_ascii_alphanumeric());
        if !is_extension {
            break;
        }
        stem_end = dot;
    }
    (&name[..stem_end], &name[stem_end..])
}

/// Lowercase final extension without the dot (`"gz"` for `a.tar.gz`).
pub fn extension_of(name: &str) -> String {
    let (_, ext) = split_name(name);
    ext.rsplit('.').next().unwrap_or_default().to_lowercase()
}

/// Apply a numbered-name format such as `{name}_{number}{ext}`.
pub fn numbered_name(format: &str, stem: &str, number: u32, ext: &str) -> String {
    format
        .replace("{name}", stem)
        .replace("{number}", &number.to_string())
        .replace("{ext}", ext)
}

/// Check that a name can be stored as a path component.
pub fn validate_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("Name cannot be empty".to_string());
    }
    if name.contains('/') {
        return Err(format!("Name '{name}' must not contain '/'"));
    }
    Ok(())
}

/// Derive a URL slug: lowercase word characters joined by hyphens.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.chars() {
        if c.is_alphanumeric() || c == '_' {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else if c.is_whitespace() || c == '-' {
            pending_dash = true;
        }
    }
    slug
}
