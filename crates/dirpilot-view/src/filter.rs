//! Quick local filter of a listing.

use dirpilot_core::DirEntry;

/// Case-insensitive substring filter over entry names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalFilter {
    pattern: String,
    lowered: String,
}

impl LocalFilter {
    pub fn new(pattern: impl Into<String>) -> Self {
        let pattern = pattern.into();
        let lowered = pattern.to_lowercase();
        Self { pattern, lowered }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// An empty filter lets everything through.
    pub fn is_empty(&self) -> bool {
        self.pattern.is_empty()
    }

    pub fn matches(&self, name: &str) -> bool {
        self.lowered.is_empty() || name.to_lowercase().contains(&self.lowered)
    }

    /// Split off the entries this filter hides.
    ///
    /// Returns the visible entries, in their original order, and the number
    /// of hidden ones.
    pub fn apply<'a, I>(&self, entries: I) -> (Vec<DirEntry>, usize)
    where
        I: IntoIterator<Item = &'a DirEntry>,
    {
        let mut hidden = 0;
        let visible = entries
            .into_iter()
            .filter(|entry| {
                let keep = self.matches(entry.name.as_str());
                if !keep {
                    hidden += 1;
                }
                keep
            })
            .cloned()
            .collect();
        (visible, hidden)
    }
}
