pub mod auth;
pub mod file;
pub mod response;
pub mod user;

/// Trimmed value of an optional text field, `None` when absent or blank.
pub fn required(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
