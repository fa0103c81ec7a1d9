//! A directory listing pane.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use dirpilot_core::{DirEntry, SortSpec, ViewConfig, ViewError, sort_entries};
use dirpilot_ops::normalize;
use tracing::{debug, warn};

use crate::custom::{CustomList, PendingCustomList};
use crate::filter::LocalFilter;

/// Listing state of one pane: a real directory or a custom list.
#[derive(Debug, Clone)]
pub struct FileView {
    curr_dir: PathBuf,
    config: ViewConfig,
    sort: Vec<SortSpec>,
    /// Sorted rows before the local filter.
    all_entries: Vec<DirEntry>,
    /// Rows currently shown.
    entries: Vec<DirEntry>,
    list_pos: usize,
    local_filter: LocalFilter,
    filtered: usize,
    pending: Option<PendingCustomList>,
    custom: Option<CustomList>,
}

impl FileView {
    /// Create an empty view of `curr_dir`. Nothing is read until
    /// [`FileView::load_dir_list`].
    pub fn new(curr_dir: impl Into<PathBuf>, config: ViewConfig) -> Self {
        let sort = config.sort.clone();
        Self {
            curr_dir: absolute_path(curr_dir.into()),
            config,
            sort,
            all_entries: Vec::new(),
            entries: Vec::new(),
            list_pos: 0,
            local_filter: LocalFilter::default(),
            filtered: 0,
            pending: None,
            custom: None,
        }
    }

    pub fn curr_dir(&self) -> &Path {
        &self.curr_dir
    }

    /// Switch to another real directory, leaving any custom list.
    ///
    /// The listing is emptied; call [`FileView::load_dir_list`] to read it.
    pub fn change_dir(&mut self, dir: impl Into<PathBuf>) {
        self.curr_dir = absolute_path(dir.into());
        self.custom = None;
        self.all_entries.clear();
        self.entries.clear();
        self.filtered = 0;
        self.list_pos = 0;
    }

    /// Directory macros and relative register paths resolve against.
    ///
    /// For a custom list this is the directory it was started from.
    pub fn anchor(&self) -> &Path {
        match &self.custom {
            Some(custom) => &custom.orig_dir,
            None => &self.curr_dir,
        }
    }

    pub fn entries(&self) -> &[DirEntry] {
        &self.entries
    }

    pub fn list_rows(&self) -> usize {
        self.entries.len()
    }

    /// Number of rows hidden by the local filter.
    pub fn filtered(&self) -> usize {
        self.filtered
    }

    pub fn list_pos(&self) -> usize {
        self.list_pos
    }

    pub fn set_list_pos(&mut self, pos: usize) {
        self.list_pos = pos.min(self.entries.len().saturating_sub(1));
    }

    pub fn current(&self) -> Option<&DirEntry> {
        self.entries.get(self.list_pos)
    }

    pub fn config(&self) -> &ViewConfig {
        &self.config
    }

    pub fn sort(&self) -> &[SortSpec] {
        &self.sort
    }

    /// Change the sort keys and re-sort the listing.
    pub fn set_sort(&mut self, sort: Vec<SortSpec>) {
        self.sort = sort;
        if !self.is_unsorted() {
            sort_entries(&mut self.all_entries, &self.sort);
            self.refilter();
        }
    }

    /// Names as displayed, decorations included.
    pub fn display_names(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|entry| entry.decorated_name(&self.config.decorations))
            .collect()
    }

    /// Install externally produced rows, e.g. search results.
    pub fn replace_entries(&mut self, entries: Vec<DirEntry>) {
        self.all_entries = entries;
        self.refilter();
    }

    pub fn mark(&mut self, index: usize, marked: bool) {
        let Some(path) = self.entries.get(index).map(DirEntry::path) else {
            return;
        };
        for entry in self
            .entries
            .iter_mut()
            .chain(self.all_entries.iter_mut())
            .filter(|entry| entry.path() == path)
        {
            entry.marked = marked;
        }
    }

    pub fn clear_marks(&mut self) {
        for entry in self.entries.iter_mut().chain(self.all_entries.iter_mut()) {
            entry.marked = false;
        }
    }

    /// Marked rows, or the row under the cursor when nothing is marked.
    pub fn selection(&self) -> Vec<&DirEntry> {
        let marked: Vec<&DirEntry> = self.entries.iter().filter(|e| e.marked).collect();
        if !marked.is_empty() {
            return marked;
        }
        self.current().into_iter().collect()
    }

    pub fn selected_paths(&self) -> Vec<PathBuf> {
        self.selection().into_iter().map(DirEntry::path).collect()
    }

    pub fn local_filter(&self) -> &LocalFilter {
        &self.local_filter
    }

    /// Set the local filter. An empty pattern removes it.
    pub fn local_filter_apply(&mut self, pattern: &str) {
        self.local_filter = LocalFilter::new(pattern);
        self.refilter();
    }

    /// Drop rows for `path` without re-reading anything.
    ///
    /// Paths compare after `.` and `..` are resolved against the working
    /// directory.
    pub fn remove_path(&mut self, path: &Path) {
        let path = absolute_path(path.to_path_buf());
        self.all_entries.retain(|entry| absolute_path(entry.path()) != path);
        self.entries.retain(|entry| absolute_path(entry.path()) != path);
        if let Some(custom) = &mut self.custom {
            custom.remove(&path);
        }
        self.set_list_pos(self.list_pos);
    }

    /// Whether the view shows a custom list rather than a real directory.
    pub fn custom_active(&self) -> bool {
        self.custom.is_some()
    }

    pub fn custom_list(&self) -> Option<&CustomList> {
        self.custom.as_ref()
    }

    /// Begin a new custom list, discarding one that is being built.
    ///
    /// The current real directory becomes the list's anchor.
    pub fn custom_start(&mut self, title: impl Into<String>) {
        self.pending = Some(PendingCustomList::new(title, self.curr_dir.clone()));
    }

    /// Add a path to the list being built. Duplicates are ignored.
    pub fn custom_add(&mut self, path: impl AsRef<Path>) -> Result<(), ViewError> {
        let pending = self.pending.as_mut().ok_or(ViewError::NotCustom)?;
        pending.add(path.as_ref());
        Ok(())
    }

    /// Install the list being built as the view's listing.
    ///
    /// With `reuse_as_real_dir` the rows keep insertion order; otherwise the
    /// view's sort applies. Paths that cannot be stat'ed are left out, and a
    /// list with no rows left is rejected. Any previous custom list is
    /// replaced.
    pub fn custom_finish(&mut self, reuse_as_real_dir: bool) -> Result<(), ViewError> {
        let pending = self.pending.take().ok_or(ViewError::NotCustom)?;
        if pending.is_empty() {
            return Err(ViewError::EmptyCustomList);
        }

        let list = CustomList::from_pending(pending, reuse_as_real_dir);
        let entries = stat_paths(list.paths.iter());
        if entries.is_empty() {
            return Err(ViewError::EmptyCustomList);
        }

        debug!(title = %list.title, rows = entries.len(), "custom list installed");
        self.custom = Some(list);
        self.install(entries);
        self.list_pos = 0;
        Ok(())
    }

    /// Read the listing again.
    ///
    /// A custom list re-stats each of its paths; a dangling link is still a
    /// row. With `reload` set, marks and cursor survive.
    pub fn load_dir_list(&mut self, reload: bool) -> Result<(), ViewError> {
        let entries = match &self.custom {
            Some(custom) => stat_paths(custom.paths.iter()),
            None => read_dir_entries(&self.curr_dir)?,
        };

        let marked: HashSet<PathBuf> = if reload {
            self.all_entries
                .iter()
                .filter(|e| e.marked)
                .map(DirEntry::path)
                .collect()
        } else {
            HashSet::new()
        };
        let entries = entries
            .into_iter()
            .map(|mut entry| {
                entry.marked = marked.contains(&entry.path());
                entry
            })
            .collect();

        self.install(entries);
        if !reload {
            self.list_pos = 0;
        }
        self.set_list_pos(self.list_pos);
        Ok(())
    }

    fn is_unsorted(&self) -> bool {
        self.custom.as_ref().is_some_and(|custom| custom.unsorted)
    }

    fn install(&mut self, mut entries: Vec<DirEntry>) {
        if !self.is_unsorted() {
            sort_entries(&mut entries, &self.sort);
        }
        self.all_entries = entries;
        self.refilter();
    }

    fn refilter(&mut self) {
        let (visible, hidden) = self.local_filter.apply(&self.all_entries);
        self.entries = visible;
        self.filtered = hidden;
        self.set_list_pos(self.list_pos);
    }
}

/// `path` made absolute with `.` and `..` resolved lexically.
pub(crate) fn absolute_path(path: PathBuf) -> PathBuf {
    match std::path::absolute(&path) {
        Ok(absolute) => normalize(&absolute),
        Err(_) => normalize(&path),
    }
}

fn stat_paths<'a, I>(paths: I) -> Vec<DirEntry>
where
    I: IntoIterator<Item = &'a PathBuf>,
{
    paths
        .into_iter()
        .filter_map(|path| match DirEntry::from_path(path) {
            Ok(entry) => Some(entry),
            Err(e) => {
                debug!(path = %path.display(), "dropping unreadable entry: {e}");
                None
            }
        })
        .collect()
}

fn read_dir_entries(dir: &Path) -> Result<Vec<DirEntry>, ViewError> {
    let read = std::fs::read_dir(dir).map_err(|source| ViewError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut entries = Vec::new();
    for item in read {
        let item = match item {
            Ok(item) => item,
            Err(e) => {
                warn!(dir = %dir.display(), "failed to read entry: {e}");
                continue;
            }
        };
        match DirEntry::from_path(&item.path()) {
            Ok(entry) => entries.push(entry),
            Err(e) => debug!(path = %item.path().display(), "skipping entry: {e}"),
        }
    }
    Ok(entries)
}
