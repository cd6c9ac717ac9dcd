/// Result of mapping a position through a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapResult {
    pub pos: usize,
    /// The content around the position was deleted
    pub deleted: bool,
}

/// Anything positions can be mapped through.
pub trait Mappable {
    /// Map `pos`. `assoc` picks the side a position at an insertion point
    /// sticks to: negative stays before the inserted content, otherwise it
    /// moves after it.
    fn map_result(&self, pos: usize, assoc: i8) -> MapResult;

    fn map(&self, pos: usize, assoc: i8) -> usize {
        self.map_result(pos, assoc).pos
    }
}

/// Position changes made by a single step: a list of replaced ranges
/// given as `(start, old_size, new_size)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepMap {
    ranges: Vec<(usize, usize, usize)>,
}

impl StepMap {
    pub fn identity() -> Self {
        Self::default()
    }

    pub fn new(start: usize, old_size: usize, new_size: usize) -> Self {
        if old_size == 0 && new_size == 0 {
            return Self::identity();
        }
        Self {
            ranges: vec![(start, old_size, new_size)],
        }
    }

    pub fn is_identity(&self) -> bool {
        self.ranges.is_empty()
    }

    /// The replaced range in new-document coordinates, if any.
    pub fn changed_range(&self) -> Option<(usize, usize)> {
        self.ranges
            .first()
            .map(|&(start, _, new_size)| (start, start + new_size))
    }
}

impl Mappable for StepMap {
    fn map_result(&self, pos: usize, assoc: i8) -> MapResult {
        let mut diff: isize = 0;
        for &(start, old_size, new_size) in &self.ranges {
            if start > pos {
                break;
            }
            let end = start + old_size;
            if pos <= end {
                let side = if old_size == 0 {
                    assoc
                } else if pos == start {
                    -1
                } else if pos == end {
                    1
                } else {
                    assoc
                };
                let offset = if side < 0 { 0 } else { new_size };
                let mapped = (start as isize + diff) as usize + offset;
                let edge = if assoc < 0 { start } else { end };
                return MapResult {
                    pos: mapped,
                    deleted: pos != edge,
                };
            }
            diff += new_size as isize - old_size as isize;
        }
        MapResult {
            pos: (pos as isize + diff) as usize,
            deleted: false,
        }
    }
}

/// A pipeline of step maps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mapping {
    maps: Vec<StepMap>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, map: StepMap) {
        self.maps.push(map);
    }

    pub fn append(&mut self, other: &Mapping) {
        self.maps.extend(other.maps.iter().cloned());
    }

    /// The maps from index `from` onwards.
    pub fn slice(&self, from: usize) -> Mapping {
        Mapping {
            maps: self.maps[from.min(self.maps.len())..].to_vec(),
        }
    }
}

impl Mappable for Mapping {
    fn map_result(&self, mut pos: usize, assoc: i8) -> MapResult {
        let mut deleted = false;
        for map in &self.maps {
            let result = map.map_result(pos, assoc);
            deleted |= result.deleted;
            pos = result.pos;
        }
        MapResult { pos, deleted }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::before(2, 1, 2, false)]
    #[case::inside(6, 1, 10, true)]
    #[case::start_sticks_left(5, 1, 5, true)]
    #[case::start_with_left_assoc(5, -1, 5, false)]
    #[case::end_sticks_right(8, -1, 10, true)]
    #[case::end_with_right_assoc(8, 1, 10, false)]
    #[case::after(12, 1, 14, false)]
    fn replacement_mapping(
        #[case] pos: usize,
        #[case] assoc: i8,
        #[case] expected: usize,
        #[case] deleted: bool,
    ) {
        // three positions at 5 replaced by five
        let map = StepMap::new(5, 3, 5);
        assert_eq!(map.map_result(pos, assoc), MapResult { pos: expected, deleted });
    }

    #[test]
    fn insertion_respects_assoc() {
        let map = StepMap::new(4, 0, 3);
        assert_eq!(map.map(4, -1), 4);
        assert_eq!(map.map(4, 1), 7);
    }

    #[test]
    fn mapping_composes() {
        let mut mapping = Mapping::new();
        mapping.push(StepMap::new(0, 0, 2));
        mapping.push(StepMap::new(10, 2, 0));
        assert_eq!(mapping.map(3, 1), 5);
        assert_eq!(mapping.map(20, 1), 20);
        assert!(mapping.map_result(9, 1).deleted);
    }
}
