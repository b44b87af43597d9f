use crate::assets::AssetId;
use crate::config::StageList;

/// Ordered combats of a level and the cursor into them.
#[derive(Clone, Debug, Default)]
pub struct LevelStages {
    combats: Vec<AssetId>,
    index: usize,
}

impl LevelStages {
    pub fn new(list: &StageList) -> Self {
        let index = list.start_index.min(list.combats.len().saturating_sub(1));
        Self {
            combats: list.combats.clone(),
            index,
        }
    }

    pub fn current_stage(&self) -> Option<&AssetId> {
        self.combats.get(self.index)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.combats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.combats.is_empty()
    }

    /// Jump to an absolute stage. Out of range is refused.
    pub fn jump_to_stage(&mut self, index: usize) -> bool {
        if index >= self.combats.len() {
            return false;
        }
        self.index = index;
        true
    }

    /// Move by a relative amount. Out of range is refused.
    pub fn move_to_stage(&mut self, delta: i32) -> bool {
        let Some(target) = self.index.checked_add_signed(delta as isize) else {
            return false;
        };
        self.jump_to_stage(target)
    }

    pub fn is_first_stage(&self) -> bool {
        self.index == 0
    }

    /// An empty list counts as being on its last stage.
    pub fn is_last_stage(&self) -> bool {
        self.index + 1 >= self.combats.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stages(n: usize) -> LevelStages {
        LevelStages::new(&StageList {
            combats: (0..n).map(|i| AssetId::new("CombatData", &format!("C{i}"))).collect(),
            start_index: 0,
        })
    }

    #[test]
    fn moves_within_bounds() {
        let mut level = stages(3);
        assert!(level.is_first_stage());
        assert!(!level.move_to_stage(-1));
        assert!(level.move_to_stage(2));
        assert!(level.is_last_stage());
        assert!(!level.move_to_stage(1));
        assert_eq!(level.current_stage().map(AssetId::as_str), Some("CombatData:C2"));
        assert!(level.jump_to_stage(1));
        assert!(!level.jump_to_stage(3));
        assert_eq!(level.index(), 1);
    }

    #[test]
    fn empty_level_is_final() {
        let level = stages(0);
        assert!(level.is_last_stage());
        assert!(level.current_stage().is_none());
    }
}
