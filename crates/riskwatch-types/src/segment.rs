use serde::{Deserialize, Serialize};

/// An ordinal risk/state category.
///
/// `level` is the band position in its segment table (0 = least severe),
/// so ordering follows severity, not the label text.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Segment {
    pub level: usize,
    pub label: String,
}

impl Segment {
    pub fn new(level: usize, label: impl Into<String>) -> Self {
        Self {
            level,
            label: label.into(),
        }
    }

    /// Whether this segment is at or above `floor` in severity.
    pub fn at_least(&self, floor: &Segment) -> bool {
        self.level >= floor.level
    }
}

impl std::fmt::Display for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_follows_level_not_label() {
        let low = Segment::new(0, "ZZZ");
        let high = Segment::new(2, "AAA");
        assert!(low < high);
        assert!(high.at_least(&low));
        assert!(!low.at_least(&high));
    }

    #[test]
    fn display_is_label() {
        assert_eq!(Segment::new(1, "MEDIUM").to_string(), "MEDIUM");
    }
}
