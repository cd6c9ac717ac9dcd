use serde::{Deserialize, Serialize};

use super::SavedAnnotation;

/// Mark types, in the order marks are kept within a set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MarkType {
    Strong,
    Em,
    Underline,
    Strike,
    Code,
    Subscript,
    Superscript,
    Link,
    Highlight,
}

impl MarkType {
    pub fn create(self, attrs: MarkAttrs) -> Mark {
        Mark {
            mark_type: self,
            attrs,
        }
    }

    /// The mark of this type in `set`, if any.
    pub fn is_in_set(self, set: &[Mark]) -> Option<&Mark> {
        set.iter().find(|mark| mark.mark_type == self)
    }

    /// Whether text typed at the end of a marked run continues the mark.
    pub fn is_inclusive(self) -> bool {
        !matches!(self, MarkType::Link | MarkType::Highlight)
    }

    pub fn remove_from_set(self, set: &[Mark]) -> Vec<Mark> {
        set.iter()
            .filter(|mark| mark.mark_type != self)
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MarkAttrs {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    /// Annotation a highlight refers to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotation: Option<SavedAnnotation>,
}

impl MarkAttrs {
    pub fn is_empty(&self) -> bool {
        *self == MarkAttrs::default()
    }
}

/// An inline annotation such as emphasis or a highlight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mark {
    #[serde(rename = "type")]
    pub mark_type: MarkType,
    #[serde(default, skip_serializing_if = "MarkAttrs::is_empty")]
    pub attrs: MarkAttrs,
}

impl Mark {
    pub fn new(mark_type: MarkType) -> Self {
        mark_type.create(MarkAttrs::default())
    }

    /// Add this mark to a sorted set, replacing any mark of the same type.
    pub fn add_to_set(&self, set: &[Mark]) -> Vec<Mark> {
        let mut out: Vec<Mark> = self.mark_type.remove_from_set(set);
        let at = out
            .iter()
            .position(|mark| mark.mark_type > self.mark_type)
            .unwrap_or(out.len());
        out.insert(at, self.clone());
        out
    }

    pub fn is_in_set(&self, set: &[Mark]) -> bool {
        set.contains(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn add_to_set_keeps_rank_order() {
        let set = Mark::new(MarkType::Highlight).add_to_set(&[]);
        let set = Mark::new(MarkType::Strong).add_to_set(&set);
        let set = Mark::new(MarkType::Em).add_to_set(&set);
        let types: Vec<_> = set.iter().map(|m| m.mark_type).collect();
        assert_eq!(
            types,
            vec![MarkType::Strong, MarkType::Em, MarkType::Highlight]
        );
    }

    #[test]
    fn add_to_set_replaces_same_type() {
        let first = MarkType::Link.create(MarkAttrs {
            href: Some("a".into()),
            ..MarkAttrs::default()
        });
        let second = MarkType::Link.create(MarkAttrs {
            href: Some("b".into()),
            ..MarkAttrs::default()
        });
        let set = second.add_to_set(&first.add_to_set(&[]));
        assert_eq!(set, vec![second]);
    }

    #[test]
    fn remove_from_set_by_type() {
        let set = Mark::new(MarkType::Em).add_to_set(&[Mark::new(MarkType::Strong)]);
        assert_eq!(
            MarkType::Strong.remove_from_set(&set),
            vec![Mark::new(MarkType::Em)]
        );
        assert!(MarkType::Strong.is_in_set(&set).is_some());
    }
}
