/// Source of identifiers for nodes that need external correlation.
pub trait IdGenerator {
    fn next_id(&self) -> String;
}

/// Random UUIDs in simple (unhyphenated) form.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIds;

impl IdGenerator for RandomIds {
    fn next_id(&self) -> String {
        uuid::Uuid::new_v4().simple().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_ids_are_unique_and_compact() {
        let a = RandomIds.next_id();
        let b = RandomIds.next_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
