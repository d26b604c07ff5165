//! Client-side id generation.

use uuid::Uuid;

/// Generates a new UUID v4.
#[must_use]
pub fn generate_uuid() -> Uuid {
    Uuid::new_v4()
}

/// Generates a fresh entity id in its string form.
///
/// Every thread, step and generation created without an explicit id gets one
/// of these, so the id is known locally before the backend ever sees it.
#[must_use]
pub fn generate_id() -> String {
    generate_uuid().to_string()
}

/// Returns true if `id` parses as a UUID.
#[must_use]
pub fn is_valid_id(id: &str) -> bool {
    Uuid::parse_str(id).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generated_ids_are_unique() {
        let ids: HashSet<String> = (0..1000).map(|_| generate_id()).collect();
        assert_eq!(ids.len(), 1000);
        assert!(ids.iter().all(|id| !id.is_empty()));
    }

    #[test]
    fn test_is_valid_id() {
        assert!(is_valid_id("6f9619ff-8b86-d011-b42d-00cf4fc964ff"));
        assert!(!is_valid_id("not-an-id"));
        assert!(!is_valid_id(""));
    }
}
