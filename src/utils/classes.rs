use std::{collections::BTreeMap, hash::Hash};

/// Invert a map by swapping keys and values
pub fn invert_map<K, V, MK, MV>(original: MK) -> MV
where
    K: Ord + Hash + Eq,
    V: Ord + Hash + Eq + Clone,
    MK: IntoIterator<Item = (K, V)>,
    MV: FromIterator<(V, K)>,
{
    original
        .into_iter()
        .map(|(key, value)| (value, key))
        .collect()
}

/// A fixed, bidirectional mapping between class ids and class name labels
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassLabels {
    id2label: BTreeMap<usize, String>,
    label2id: BTreeMap<String, usize>,
}

impl ClassLabels {
    /// Build the mapping from an ordered list of names, where the position is the class id
    pub fn new<S: AsRef<str>>(names: &[S]) -> Self {
        let id2label: BTreeMap<usize, String> = names
            .iter()
            .enumerate()
            .map(|(i, s)| (i, s.as_ref().trim().to_string()))
            .collect();

        Self::from_id2label(id2label)
    }

    /// Build the mapping from an existing id -> label map
    pub fn from_id2label(id2label: BTreeMap<usize, String>) -> Self {
        let label2id = invert_map(id2label.clone());

        Self { id2label, label2id }
    }

    /// A mapping from class ids to class name labels
    pub fn id2label(&self) -> &BTreeMap<usize, String> {
        &self.id2label
    }

    /// A mapping from class name labels to class ids
    pub fn label2id(&self) -> &BTreeMap<String, usize> {
        &self.label2id
    }

    /// The label for a class id
    pub fn name(&self, id: usize) -> Option<&str> {
        self.id2label.get(&id).map(String::as_str)
    }

    /// The class id for a label
    pub fn id(&self, name: &str) -> Option<usize> {
        self.label2id.get(name).copied()
    }

    /// Class names ordered by id
    pub fn names(&self) -> Vec<String> {
        self.id2label.values().cloned().collect()
    }

    /// Number of classes
    pub fn len(&self) -> usize {
        self.id2label.len()
    }

    /// Whether no classes are defined
    pub fn is_empty(&self) -> bool {
        self.id2label.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const TOPICS: [&str; 4] = ["World", "Sports", "Business", "Sci/Tech"];

    #[test]
    fn test_labels_round_trip() {
        let labels = ClassLabels::new(&TOPICS);

        assert_eq!(labels.len(), 4);

        for name in TOPICS {
            let id = labels.id(name).unwrap();
            assert_eq!(labels.name(id), Some(name));
        }

        for id in 0..4 {
            let name = labels.name(id).unwrap();
            assert_eq!(labels.id(name), Some(id));
        }
    }

    #[test]
    fn test_labels_are_ordered_by_position() {
        let labels = ClassLabels::new(&TOPICS);

        assert_eq!(labels.id("World"), Some(0));
        assert_eq!(labels.id("Sci/Tech"), Some(3));
        assert_eq!(labels.names(), TOPICS.to_vec());
        assert_eq!(labels.id("Weather"), None);
        assert_eq!(labels.name(4), None);
    }

    #[test]
    fn test_labels_are_trimmed() {
        let labels = ClassLabels::new(&[" World\n", "Sports "]);

        assert_eq!(labels.id("World"), Some(0));
        assert_eq!(labels.name(1), Some("Sports"));
    }

    #[test]
    fn test_invert_map() {
        let original = BTreeMap::from([(0, "a".to_string()), (1, "b".to_string())]);
        let inverted: BTreeMap<String, usize> = invert_map(original);

        assert_eq!(
            inverted,
            BTreeMap::from([("a".to_string(), 0), ("b".to_string(), 1)])
        );
    }
}
