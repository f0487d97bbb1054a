//! Pane geometry: regions, visibility flags, focus slots, and the pure
//! layout computation.
//!
//! Geometry is always recomputed from the current screen size and
//! visibility/focus state immediately before each render; nothing here is
//! persisted and nothing here touches rendering or input.

/// Number of terminal pane slots.
pub const TERMINAL_SLOTS: usize = 3;

/// Focus slot indices. 0 = tree/source-control, 1 = editor, 2..=4 = terminals.
pub const FOCUS_TREE: usize = 0;
pub const FOCUS_EDITOR: usize = 1;
pub const FOCUS_TERMINAL_BASE: usize = 2;
/// Total number of focusable slots.
pub const FOCUS_SLOTS: usize = 2 + TERMINAL_SLOTS;

/// Map a focus slot index to a terminal slot number, if it is one.
pub fn terminal_slot_of(focus: usize) -> Option<usize> {
    if (FOCUS_TERMINAL_BASE..FOCUS_SLOTS).contains(&focus) {
        Some(focus - FOCUS_TERMINAL_BASE)
    } else {
        None
    }
}

/// An axis-aligned rectangle describing where a pane is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Region {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

impl Region {
    pub fn new(x: u16, y: u16, width: u16, height: u16) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Whether the region has any drawable area.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Hit-test a point against this region.
    pub fn contains(&self, px: u16, py: u16) -> bool {
        px >= self.x && px < self.x + self.width && py >= self.y && py < self.y + self.height
    }
}

/// Per-pane visibility flags.
///
/// Invariant: `tree` and `source_control` are never both true; they share
/// the left region. Terminal slots are independent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Visibility {
    pub tree: bool,
    pub source_control: bool,
    pub editor: bool,
    pub terminals: [bool; TERMINAL_SLOTS],
}

impl Default for Visibility {
    fn default() -> Self {
        Self {
            tree: true,
            source_control: false,
            editor: true,
            terminals: [false; TERMINAL_SLOTS],
        }
    }
}

impl Visibility {
    /// Whether the left pane (tree or source-control) is visible.
    pub fn left_visible(&self) -> bool {
        self.tree || self.source_control
    }

    /// Count of visible terminal slots.
    pub fn visible_terminal_count(&self) -> usize {
        self.terminals.iter().filter(|v| **v).count()
    }

    /// Toggle the file tree. Showing it hides source-control.
    pub fn toggle_tree(&mut self) {
        if self.tree {
            self.tree = false;
        } else {
            self.tree = true;
            self.source_control = false;
        }
    }

    /// Toggle the source-control pane. Showing it hides the tree.
    pub fn toggle_source_control(&mut self) {
        if self.source_control {
            self.source_control = false;
        } else {
            self.source_control = true;
            self.tree = false;
        }
    }

    /// Visibility of a focus slot (ignores whether a terminal session exists).
    pub fn slot_visible(&self, focus: usize) -> bool {
        match focus {
            FOCUS_TREE => self.left_visible(),
            FOCUS_EDITOR => self.editor,
            _ => terminal_slot_of(focus)
                .map(|t| self.terminals[t])
                .unwrap_or(false),
        }
    }
}

/// Widths used by the geometry computation, taken from config.
#[derive(Debug, Clone)]
pub struct LayoutConfig {
    /// Left pane width when not expanded.
    pub tree_width_normal: u16,
    /// Left pane width when focused or when it shares the screen with a
    /// single other pane.
    pub tree_width_expanded: u16,
    /// Percentage of the screen width given to terminals while the editor
    /// is visible.
    pub term_width_percent: u16,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            tree_width_normal: 25,
            tree_width_expanded: 40,
            term_width_percent: 45,
        }
    }
}

/// Computed regions for one frame.
///
/// `placeholders` is only populated when both the editor and every terminal
/// are hidden: two centered boxes reminding the user of the restore
/// shortcuts.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RegionSet {
    pub tree: Region,
    pub editor: Region,
    pub terminals: [Region; TERMINAL_SLOTS],
    pub placeholders: Option<(Region, Region)>,
}

impl RegionSet {
    /// Region backing a focus slot.
    pub fn for_slot(&self, focus: usize) -> Region {
        match focus {
            FOCUS_TREE => self.tree,
            FOCUS_EDITOR => self.editor,
            _ => terminal_slot_of(focus)
                .map(|t| self.terminals[t])
                .unwrap_or_default(),
        }
    }
}

/// Rows reserved above the pane area (tab strip).
pub const TOP_RESERVED: u16 = 1;
/// Rows reserved below the pane area (status bar).
pub const BOTTOM_RESERVED: u16 = 1;

/// Compute the pane regions for the given screen size and state.
///
/// Width rules:
/// - Left pane is expanded when it is focused, when the editor is the only
///   other visible pane, or when exactly one terminal is visible and the
///   editor is hidden.
/// - While the editor is visible, terminals share `term_width_percent` of
///   the screen, reduced by the left-pane expansion delta (floored at 0);
///   otherwise they take all space right of the left pane.
/// - Visible terminals split their space equally; the last visible slot
///   absorbs the integer remainder so widths always sum to the screen width.
pub fn compute_geometry(
    screen_width: u16,
    screen_height: u16,
    vis: &Visibility,
    focus: usize,
    cfg: &LayoutConfig,
) -> RegionSet {
    let y = TOP_RESERVED.min(screen_height);
    let height = screen_height
        .saturating_sub(TOP_RESERVED)
        .saturating_sub(BOTTOM_RESERVED);

    let term_count = vis.visible_terminal_count();

    let expanded = vis.left_visible()
        && (focus == FOCUS_TREE
            || (vis.editor && term_count == 0)
            || (!vis.editor && term_count == 1));

    let left_width = if !vis.left_visible() {
        0
    } else if expanded {
        cfg.tree_width_expanded.min(screen_width)
    } else {
        cfg.tree_width_normal.min(screen_width)
    };
    let expansion_delta = if expanded {
        cfg.tree_width_expanded.saturating_sub(cfg.tree_width_normal)
    } else {
        0
    };

    let right_of_left = screen_width.saturating_sub(left_width);

    let term_total = if term_count == 0 {
        0
    } else if vis.editor {
        let pct = (u32::from(screen_width) * u32::from(cfg.term_width_percent) / 100) as u16;
        pct.saturating_sub(expansion_delta).min(right_of_left)
    } else {
        right_of_left
    };

    let editor_width = if vis.editor {
        right_of_left.saturating_sub(term_total)
    } else {
        0
    };

    let mut set = RegionSet::default();
    let mut x = 0u16;

    if vis.left_visible() {
        set.tree = Region::new(x, y, left_width, height);
        x += left_width;
    }
    if vis.editor {
        set.editor = Region::new(x, y, editor_width, height);
        x += editor_width;
    }
    if term_count > 0 {
        let share = term_total / term_count as u16;
        let mut remaining = term_total;
        let mut seen = 0usize;
        for (slot, visible) in vis.terminals.iter().enumerate() {
            if !visible {
                continue;
            }
            seen += 1;
            let w = if seen == term_count { remaining } else { share };
            set.terminals[slot] = Region::new(x, y, w, height);
            x += w;
            remaining = remaining.saturating_sub(w);
        }
    }

    // With nothing but the left pane visible, show two centered placeholder
    // boxes naming the shortcuts that restore the editor and a terminal.
    if !vis.editor && term_count == 0 {
        let area_x = left_width;
        let area_w = right_of_left;
        let box_w = (area_w / 3).clamp(20.min(area_w), 48);
        let box_h = 5.min(height);
        let gap = area_w.saturating_sub(box_w * 2) / 3;
        let box_y = y + height.saturating_sub(box_h) / 2;
        let first = Region::new(area_x + gap, box_y, box_w, box_h);
        let second = Region::new(area_x + gap * 2 + box_w, box_y, box_w, box_h);
        set.placeholders = Some((first, second));
    }

    set
}

/// Find the next eligible focus slot, scanning forward from `from`
/// (exclusive) and wrapping.
///
/// A slot is eligible when its visibility flag is true and, for terminal
/// slots, its backing session exists. Returns `from` unchanged when nothing
/// else qualifies.
pub fn next_eligible_focus(
    from: usize,
    vis: &Visibility,
    session_alive: &[bool; TERMINAL_SLOTS],
) -> usize {
    for step in 1..=FOCUS_SLOTS {
        let candidate = (from + step) % FOCUS_SLOTS;
        let eligible = match candidate {
            FOCUS_TREE => vis.left_visible(),
            FOCUS_EDITOR => vis.editor,
            _ => terminal_slot_of(candidate)
                .map(|t| vis.terminals[t] && session_alive[t])
                .unwrap_or(false),
        };
        if eligible {
            return candidate;
        }
    }
    from
}

/// Backward counterpart of [`next_eligible_focus`].
pub fn prev_eligible_focus(
    from: usize,
    vis: &Visibility,
    session_alive: &[bool; TERMINAL_SLOTS],
) -> usize {
    for step in 1..=FOCUS_SLOTS {
        let candidate = (from + FOCUS_SLOTS - step) % FOCUS_SLOTS;
        let eligible = match candidate {
            FOCUS_TREE => vis.left_visible(),
            FOCUS_EDITOR => vis.editor,
            _ => terminal_slot_of(candidate)
                .map(|t| vis.terminals[t] && session_alive[t])
                .unwrap_or(false),
        };
        if eligible {
            return candidate;
        }
    }
    from
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> LayoutConfig {
        LayoutConfig::default()
    }

    fn widths_sum(set: &RegionSet) -> u16 {
        set.tree.width
            + set.editor.width
            + set.terminals.iter().map(|r| r.width).sum::<u16>()
    }

    #[test]
    fn expand_on_single_pane() {
        // Screen 100x50, only editor + tree visible: tree expands to 40.
        let vis = Visibility::default();
        let set = compute_geometry(100, 50, &vis, FOCUS_EDITOR, &cfg());
        assert_eq!(set.tree.width, 40);
        assert_eq!(set.editor.width, 60);
    }

    #[test]
    fn equal_terminal_split() {
        // 45% of 100 = 45, three terminals at 15 each.
        let mut vis = Visibility::default();
        vis.terminals = [true, true, true];
        let set = compute_geometry(100, 50, &vis, FOCUS_EDITOR, &cfg());
        assert_eq!(set.terminals.iter().map(|r| r.width).sum::<u16>(), 45);
        assert_eq!(set.terminals[0].width, 15);
        assert_eq!(set.terminals[1].width, 15);
        assert_eq!(set.terminals[2].width, 15);
        assert_eq!(set.tree.width, 25);
        assert_eq!(set.editor.width, 30);
    }

    #[test]
    fn widths_always_sum_to_screen() {
        let focus_choices = [FOCUS_TREE, FOCUS_EDITOR, FOCUS_TERMINAL_BASE];
        for width in [20u16, 57, 80, 100, 163, 250] {
            for mask in 0u8..32 {
                let vis = Visibility {
                    tree: mask & 1 != 0,
                    source_control: false,
                    editor: mask & 2 != 0,
                    terminals: [mask & 4 != 0, mask & 8 != 0, mask & 16 != 0],
                };
                for focus in focus_choices {
                    let set = compute_geometry(width, 40, &vis, focus, &cfg());
                    if vis.editor || vis.visible_terminal_count() > 0 {
                        assert_eq!(
                            widths_sum(&set),
                            width,
                            "mask={mask} width={width} focus={focus}"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn x_offsets_are_cumulative() {
        let mut vis = Visibility::default();
        vis.terminals = [true, false, true];
        let set = compute_geometry(120, 40, &vis, FOCUS_EDITOR, &cfg());
        assert_eq!(set.tree.x, 0);
        assert_eq!(set.editor.x, set.tree.width);
        assert_eq!(set.terminals[0].x, set.editor.x + set.editor.width);
        assert_eq!(
            set.terminals[2].x,
            set.terminals[0].x + set.terminals[0].width
        );
    }

    #[test]
    fn tree_expands_when_focused() {
        let mut vis = Visibility::default();
        vis.terminals = [true, true, false];
        let set = compute_geometry(100, 40, &vis, FOCUS_TREE, &cfg());
        assert_eq!(set.tree.width, 40);
        // Terminal space shrinks by the expansion delta (45 - 15 = 30).
        assert_eq!(set.terminals[0].width + set.terminals[1].width, 30);
    }

    #[test]
    fn tree_expands_for_single_terminal_without_editor() {
        let mut vis = Visibility::default();
        vis.editor = false;
        vis.terminals = [false, true, false];
        let set = compute_geometry(100, 40, &vis, FOCUS_TERMINAL_BASE + 1, &cfg());
        assert_eq!(set.tree.width, 40);
        assert_eq!(set.terminals[1].width, 60);
    }

    #[test]
    fn terminals_take_all_space_when_editor_hidden() {
        let mut vis = Visibility::default();
        vis.editor = false;
        vis.terminals = [true, true, true];
        let set = compute_geometry(100, 40, &vis, FOCUS_TERMINAL_BASE, &cfg());
        assert_eq!(set.tree.width, 25);
        assert_eq!(set.terminals.iter().map(|r| r.width).sum::<u16>(), 75);
        assert_eq!(set.editor.width, 0);
    }

    #[test]
    fn hidden_left_pane_has_zero_width() {
        let mut vis = Visibility::default();
        vis.tree = false;
        let set = compute_geometry(100, 40, &vis, FOCUS_EDITOR, &cfg());
        assert_eq!(set.tree.width, 0);
        assert_eq!(set.editor.width, 100);
    }

    #[test]
    fn placeholders_only_when_editor_and_terminals_hidden() {
        let mut vis = Visibility::default();
        vis.editor = false;
        let set = compute_geometry(100, 40, &vis, FOCUS_TREE, &cfg());
        assert!(set.placeholders.is_some());

        vis.terminals[0] = true;
        let set = compute_geometry(100, 40, &vis, FOCUS_TREE, &cfg());
        assert!(set.placeholders.is_none());
    }

    #[test]
    fn remainder_goes_to_last_visible_terminal() {
        let mut vis = Visibility::default();
        vis.terminals = [true, true, true];
        // 44% of 100 = 44; 44 / 3 = 14 with remainder 2.
        let mut c = cfg();
        c.term_width_percent = 44;
        let set = compute_geometry(100, 40, &vis, FOCUS_EDITOR, &c);
        assert_eq!(set.terminals[0].width, 14);
        assert_eq!(set.terminals[1].width, 14);
        assert_eq!(set.terminals[2].width, 16);
    }

    #[test]
    fn tree_source_control_mutually_exclusive() {
        let mut vis = Visibility::default();
        assert!(vis.tree && !vis.source_control);
        vis.toggle_source_control();
        assert!(!vis.tree && vis.source_control);
        vis.toggle_tree();
        assert!(vis.tree && !vis.source_control);
        vis.toggle_tree();
        assert!(!vis.tree && !vis.source_control);
    }

    #[test]
    fn next_focus_skips_hidden_and_dead_slots() {
        let mut vis = Visibility::default();
        vis.terminals = [true, true, false];
        // Terminal 0 visible but session missing, terminal 1 alive.
        let alive = [false, true, false];
        assert_eq!(next_eligible_focus(FOCUS_EDITOR, &vis, &alive), 3);
        assert_eq!(next_eligible_focus(3, &vis, &alive), FOCUS_TREE);
    }

    #[test]
    fn next_focus_falls_back_to_editor() {
        let vis = Visibility {
            tree: false,
            source_control: false,
            editor: true,
            terminals: [false; 3],
        };
        let alive = [false; 3];
        assert_eq!(next_eligible_focus(FOCUS_TERMINAL_BASE, &vis, &alive), 1);
    }

    #[test]
    fn prev_focus_scans_backward() {
        let mut vis = Visibility::default();
        vis.terminals = [false, true, false];
        let alive = [false, true, false];
        assert_eq!(prev_eligible_focus(FOCUS_TREE, &vis, &alive), 3);
        assert_eq!(prev_eligible_focus(3, &vis, &alive), FOCUS_EDITOR);
        assert_eq!(prev_eligible_focus(FOCUS_EDITOR, &vis, &alive), FOCUS_TREE);
    }

    #[test]
    fn next_focus_returns_input_when_nothing_eligible() {
        let vis = Visibility {
            tree: false,
            source_control: false,
            editor: false,
            terminals: [false; 3],
        };
        let alive = [false; 3];
        assert_eq!(next_eligible_focus(FOCUS_TREE, &vis, &alive), FOCUS_TREE);
    }

    #[test]
    fn region_contains() {
        let r = Region::new(10, 5, 20, 10);
        assert!(r.contains(10, 5));
        assert!(r.contains(29, 14));
        assert!(!r.contains(30, 5));
        assert!(!r.contains(9, 5));
    }

    #[test]
    fn terminal_slot_mapping() {
        assert_eq!(terminal_slot_of(FOCUS_TREE), None);
        assert_eq!(terminal_slot_of(FOCUS_EDITOR), None);
        assert_eq!(terminal_slot_of(2), Some(0));
        assert_eq!(terminal_slot_of(4), Some(2));
        assert_eq!(terminal_slot_of(5), None);
    }
}
