use std::collections::HashMap;

/// Groups keyed by label, remembering first-seen order so that stable
/// sorts over the groups are deterministic on ties.
pub(crate) struct OrderedGroups<T> {
    index: HashMap<String, usize>,
    groups: Vec<(String, T)>,
}

impl<T: Default> OrderedGroups<T> {
    pub(crate) fn new() -> Self {
        Self {
            index: HashMap::new(),
            groups: Vec::new(),
        }
    }

    pub(crate) fn entry(&mut self, key: &str) -> &mut T {
        let slot = match self.index.get(key) {
            Some(&slot) => slot,
            None => {
                self.groups.push((key.to_string(), T::default()));
                let slot = self.groups.len() - 1;
                self.index.insert(key.to_string(), slot);
                slot
            }
        };
        &mut self.groups[slot].1
    }

    pub(crate) fn into_vec(self) -> Vec<(String, T)> {
        self.groups
    }
}
