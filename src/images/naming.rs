use std::path::{Path, PathBuf};

/// Derives a filesystem-safe folder name from a product name
///
/// Every character outside `[A-Za-z0-9]` is replaced one-for-one with `_`
/// and the result is lowercased.
///
/// # Example
///
/// ```
/// use irbis_harvest::images::sanitize_folder_name;
///
/// assert_eq!(sanitize_folder_name("Orc King (Painted)!"), "orc_king__painted__");
/// ```
pub fn sanitize_folder_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// Directory a product's images are written to: `<images_dir>/<sanitized-name>`
pub fn product_output_dir(images_dir: &Path, product_name: &str) -> PathBuf {
    images_dir.join(sanitize_folder_name(product_name))
}
