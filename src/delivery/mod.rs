// Digest delivery — sender trait plus the terminal and markdown-file senders.

pub mod file;
pub mod terminal;
pub mod traits;

/// Mask an email address for logs: first three characters of the local
/// part, then `***`, domain kept.
pub fn mask_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) => {
            let masked_local = if local.chars().count() > 3 {
                format!("{}***", local.chars().take(3).collect::<String>())
            } else {
                "***".to_string()
            };
            format!("{masked_local}@{domain}")
        }
        None => "***".to_string(),
    }
}
