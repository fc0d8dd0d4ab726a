//! Fixed label schema for the ten skin attributes.
//!
//! The schema order is a contract shared by training-target construction and
//! inference-result construction: model outputs are positional at the numeric
//! layer, so every consumer must preserve this ordering. The order is never
//! re-derived from CSV column order at runtime.

/// The ten attribute labels, in canonical output order.
///
/// Index `i` of any model output corresponds to `LABELS[i]`.
pub const LABELS: [&str; 10] = [
    "Acne",
    "Blackheads",
    "Dark Spots",
    "Dry Skin",
    "Eye bags",
    "Normal Skin",
    "Oily Skin",
    "Pores",
    "Skin Redness",
    "Wrinkles",
];

/// Number of labels in the schema.
pub const NUM_LABELS: usize = LABELS.len();

/// Bumped whenever the schema changes; persisted models are only valid for
/// the schema version they were trained against.
pub const LABEL_SCHEMA_VERSION: u32 = 1;

/// Look up the schema index of a label name.
pub fn label_index(name: &str) -> Option<usize> {
    LABELS.iter().position(|l| *l == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_has_ten_labels() {
        assert_eq!(NUM_LABELS, 10);
    }

    #[test]
    fn test_label_index_matches_order() {
        assert_eq!(label_index("Acne"), Some(0));
        assert_eq!(label_index("Wrinkles"), Some(9));
        assert_eq!(label_index("Sunburn"), None);
    }
}
