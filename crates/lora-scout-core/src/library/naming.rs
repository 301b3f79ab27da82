//! Filename helpers for the local LoRA directory.

use crate::config::LoraConfig;

/// Characters reserved on NTFS (and `/` everywhere).
const RESERVED_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Replace each reserved character with `_`.
///
/// # Examples
///
/// ```
/// use lora_scout_core::library::sanitize_filename;
///
/// assert_eq!(sanitize_filename("a/b:c?.safetensors"), "a_b_c_.safetensors");
/// ```
pub fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| if RESERVED_CHARS.contains(&c) { '_' } else { c })
        .collect()
}

/// Remove every occurrence of the LoRA extensions from a name.
///
/// Occurrences anywhere in the name are removed, not only a trailing one,
/// so `foo.pth` becomes `fooh`. Host node inputs carry either the bare
/// stem or the stem plus one extension, which this handles.
pub fn strip_lora_extensions(name: &str) -> String {
    LoraConfig::EXTENSIONS
        .iter()
        .fold(name.to_string(), |acc, ext| acc.replace(ext, ""))
}

/// Whether a file name ends with one of the LoRA extensions.
pub fn has_lora_extension(file_name: &str) -> bool {
    LoraConfig::EXTENSIONS
        .iter()
        .any(|ext| file_name.ends_with(ext))
}

/// The file name with its LoRA extension removed, if it has one.
pub(crate) fn lora_stem(file_name: &str) -> Option<&str> {
    LoraConfig::EXTENSIONS
        .iter()
        .find_map(|ext| file_name.strip_suffix(ext))
}
