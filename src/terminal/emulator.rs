//! In-memory VT emulator: escape-sequence parser plus screen state.
//!
//! Uses the `vte` crate (from Alacritty) to drive a cell grid that the
//! terminal widget reads directly. Tracks the primary and alternate screens,
//! cursor visibility, and a bounded scrollback of lines that scrolled off
//! the top of the primary screen.

use std::collections::VecDeque;

use ratatui::style::{Color, Modifier};

/// A single character cell in the grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub ch: char,
    pub fg: Color,
    pub bg: Color,
    pub modifiers: Modifier,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: ' ',
            fg: Color::Reset,
            bg: Color::Reset,
            modifiers: Modifier::empty(),
        }
    }
}

fn blank_row(cols: usize) -> Vec<Cell> {
    vec![Cell::default(); cols]
}

/// Screen state mutated by the parser callbacks.
///
/// Kept separate from [`VtEmulator`] so the `vte::Parser` and the screen can
/// be borrowed disjointly during `advance()`.
struct Screen {
    grid: Vec<Vec<Cell>>,
    /// Primary-screen grid and cursor, saved while the alternate screen is
    /// active.
    saved_primary: Option<(Vec<Vec<Cell>>, usize, usize)>,
    scrollback: VecDeque<Vec<Cell>>,
    max_scrollback: usize,
    rows: usize,
    cols: usize,
    cursor_row: usize,
    cursor_col: usize,
    cursor_visible: bool,
    alternate: bool,
    fg: Color,
    bg: Color,
    modifiers: Modifier,
    saved_cursor: Option<(usize, usize)>,
}

impl Screen {
    fn new(rows: usize, cols: usize, max_scrollback: usize) -> Self {
        Self {
            grid: vec![blank_row(cols); rows],
            saved_primary: None,
            scrollback: VecDeque::new(),
            max_scrollback,
            rows,
            cols,
            cursor_row: 0,
            cursor_col: 0,
            cursor_visible: true,
            alternate: false,
            fg: Color::Reset,
            bg: Color::Reset,
            modifiers: Modifier::empty(),
            saved_cursor: None,
        }
    }

    fn styled_blank(&self) -> Cell {
        Cell {
            ch: ' ',
            fg: self.fg,
            bg: self.bg,
            modifiers: self.modifiers,
        }
    }

    /// Scroll the grid up one line. On the primary screen the evicted line
    /// goes to scrollback; the alternate screen discards it.
    fn scroll_up(&mut self) {
        if self.grid.is_empty() {
            return;
        }
        let line = self.grid.remove(0);
        if !self.alternate {
            self.scrollback.push_back(line);
            while self.scrollback.len() > self.max_scrollback {
                self.scrollback.pop_front();
            }
        }
        self.grid.push(blank_row(self.cols));
    }

    fn line_feed(&mut self) {
        self.cursor_row += 1;
        if self.cursor_row >= self.rows {
            self.scroll_up();
            self.cursor_row = self.rows.saturating_sub(1);
        }
    }

    fn clear_region(&mut self, rows: std::ops::Range<usize>) {
        let blank = self.styled_blank();
        for r in rows {
            if let Some(row) = self.grid.get_mut(r) {
                row.fill(blank.clone());
            }
        }
    }

    fn enter_alternate(&mut self) {
        if self.alternate {
            return;
        }
        let primary = std::mem::replace(&mut self.grid, vec![blank_row(self.cols); self.rows]);
        self.saved_primary = Some((primary, self.cursor_row, self.cursor_col));
        self.cursor_row = 0;
        self.cursor_col = 0;
        self.alternate = true;
    }

    fn leave_alternate(&mut self) {
        if !self.alternate {
            return;
        }
        if let Some((primary, row, col)) = self.saved_primary.take() {
            self.grid = primary;
            // Saved grid may predate a resize while in the alternate screen.
            self.grid.resize(self.rows, blank_row(self.cols));
            for line in &mut self.grid {
                line.resize(self.cols, Cell::default());
            }
            self.cursor_row = row.min(self.rows.saturating_sub(1));
            self.cursor_col = col.min(self.cols.saturating_sub(1));
        }
        self.alternate = false;
    }

    fn resize(&mut self, rows: usize, cols: usize) {
        self.grid.resize(rows, blank_row(cols));
        for line in &mut self.grid {
            line.resize(cols, Cell::default());
        }
        self.rows = rows;
        self.cols = cols;
        self.cursor_row = self.cursor_row.min(rows.saturating_sub(1));
        self.cursor_col = self.cursor_col.min(cols.saturating_sub(1));
    }

    fn set_private_mode(&mut self, mode: u16, enable: bool) {
        match mode {
            25 => self.cursor_visible = enable,
            47 | 1047 | 1049 => {
                if enable {
                    self.enter_alternate();
                } else {
                    self.leave_alternate();
                }
            }
            _ => {}
        }
    }

    fn handle_sgr(&mut self, params: &[u16]) {
        if params.is_empty() {
            self.fg = Color::Reset;
            self.bg = Color::Reset;
            self.modifiers = Modifier::empty();
            return;
        }
        let mut i = 0;
        while i < params.len() {
            match params[i] {
                0 => {
                    self.fg = Color::Reset;
                    self.bg = Color::Reset;
                    self.modifiers = Modifier::empty();
                }
                1 => self.modifiers |= Modifier::BOLD,
                2 => self.modifiers |= Modifier::DIM,
                3 => self.modifiers |= Modifier::ITALIC,
                4 => self.modifiers |= Modifier::UNDERLINED,
                5 => self.modifiers |= Modifier::SLOW_BLINK,
                7 => self.modifiers |= Modifier::REVERSED,
                8 => self.modifiers |= Modifier::HIDDEN,
                9 => self.modifiers |= Modifier::CROSSED_OUT,
                21 | 22 => {
                    self.modifiers -= Modifier::BOLD;
                    self.modifiers -= Modifier::DIM;
                }
                23 => self.modifiers -= Modifier::ITALIC,
                24 => self.modifiers -= Modifier::UNDERLINED,
                25 => self.modifiers -= Modifier::SLOW_BLINK,
                27 => self.modifiers -= Modifier::REVERSED,
                28 => self.modifiers -= Modifier::HIDDEN,
                29 => self.modifiers -= Modifier::CROSSED_OUT,
                n @ 30..=37 => self.fg = ansi_color(n - 30),
                38 => {
                    let (color, consumed) = extended_color(&params[i + 1..]);
                    if let Some(color) = color {
                        self.fg = color;
                    }
                    i += consumed;
                }
                39 => self.fg = Color::Reset,
                n @ 40..=47 => self.bg = ansi_color(n - 40),
                48 => {
                    let (color, consumed) = extended_color(&params[i + 1..]);
                    if let Some(color) = color {
                        self.bg = color;
                    }
                    i += consumed;
                }
                49 => self.bg = Color::Reset,
                n @ 90..=97 => self.fg = ansi_bright_color(n - 90),
                n @ 100..=107 => self.bg = ansi_bright_color(n - 100),
                _ => {}
            }
            i += 1;
        }
    }
}

fn ansi_color(n: u16) -> Color {
    match n {
        0 => Color::Black,
        1 => Color::Red,
        2 => Color::Green,
        3 => Color::Yellow,
        4 => Color::Blue,
        5 => Color::Magenta,
        6 => Color::Cyan,
        _ => Color::White,
    }
}

fn ansi_bright_color(n: u16) -> Color {
    match n {
        0 => Color::DarkGray,
        1 => Color::LightRed,
        2 => Color::LightGreen,
        3 => Color::LightYellow,
        4 => Color::LightBlue,
        5 => Color::LightMagenta,
        6 => Color::LightCyan,
        _ => Color::Gray,
    }
}

/// Parse the tail of a `38`/`48` extended-color SGR: `5;N` or `2;R;G;B`.
/// Returns the color and how many params were consumed.
fn extended_color(rest: &[u16]) -> (Option<Color>, usize) {
    match rest.first() {
        Some(5) if rest.len() >= 2 => (Some(Color::Indexed(rest[1] as u8)), 2),
        Some(2) if rest.len() >= 4 => (
            Some(Color::Rgb(rest[1] as u8, rest[2] as u8, rest[3] as u8)),
            4,
        ),
        _ => (None, 0),
    }
}

impl vte::Perform for Screen {
    fn print(&mut self, c: char) {
        if self.cursor_col >= self.cols {
            self.cursor_col = 0;
            self.line_feed();
        }
        if self.cursor_row < self.rows && self.cursor_col < self.cols {
            self.grid[self.cursor_row][self.cursor_col] = Cell {
                ch: c,
                fg: self.fg,
                bg: self.bg,
                modifiers: self.modifiers,
            };
        }
        self.cursor_col += 1;
    }

    fn execute(&mut self, byte: u8) {
        match byte {
            b'\r' => self.cursor_col = 0,
            b'\n' | 0x0b | 0x0c => self.line_feed(),
            0x08 => self.cursor_col = self.cursor_col.saturating_sub(1),
            b'\t' => {
                let stop = (self.cursor_col + 8) & !7;
                self.cursor_col = stop.min(self.cols.saturating_sub(1));
            }
            _ => {}
        }
    }

    fn csi_dispatch(
        &mut self,
        params: &vte::Params,
        intermediates: &[u8],
        _ignore: bool,
        action: char,
    ) {
        let params_vec: Vec<u16> = params.iter().flat_map(|sub| sub.iter().copied()).collect();
        let first = |default: u16| params_vec.first().copied().unwrap_or(default);
        let count = first(1).max(1) as usize;

        if intermediates.first() == Some(&b'?') {
            match action {
                'h' => {
                    for &mode in &params_vec {
                        self.set_private_mode(mode, true);
                    }
                }
                'l' => {
                    for &mode in &params_vec {
                        self.set_private_mode(mode, false);
                    }
                }
                _ => {}
            }
            return;
        }

        match action {
            'A' => self.cursor_row = self.cursor_row.saturating_sub(count),
            'B' => self.cursor_row = (self.cursor_row + count).min(self.rows.saturating_sub(1)),
            'C' => self.cursor_col = (self.cursor_col + count).min(self.cols.saturating_sub(1)),
            'D' => self.cursor_col = self.cursor_col.saturating_sub(count),
            'E' => {
                self.cursor_row = (self.cursor_row + count).min(self.rows.saturating_sub(1));
                self.cursor_col = 0;
            }
            'F' => {
                self.cursor_row = self.cursor_row.saturating_sub(count);
                self.cursor_col = 0;
            }
            'G' => {
                let col = first(1).max(1) as usize - 1;
                self.cursor_col = col.min(self.cols.saturating_sub(1));
            }
            'H' | 'f' => {
                let row = first(1).max(1) as usize - 1;
                let col = params_vec.get(1).copied().unwrap_or(1).max(1) as usize - 1;
                self.cursor_row = row.min(self.rows.saturating_sub(1));
                self.cursor_col = col.min(self.cols.saturating_sub(1));
            }
            'J' => match first(0) {
                0 => {
                    let blank = self.styled_blank();
                    if let Some(row) = self.grid.get_mut(self.cursor_row) {
                        for cell in row.iter_mut().skip(self.cursor_col) {
                            *cell = blank.clone();
                        }
                    }
                    self.clear_region(self.cursor_row + 1..self.rows);
                }
                1 => {
                    self.clear_region(0..self.cursor_row);
                    let blank = self.styled_blank();
                    let end = (self.cursor_col + 1).min(self.cols);
                    if let Some(row) = self.grid.get_mut(self.cursor_row) {
                        for cell in row.iter_mut().take(end) {
                            *cell = blank.clone();
                        }
                    }
                }
                2 | 3 => self.clear_region(0..self.rows),
                _ => {}
            },
            'K' => {
                let blank = self.styled_blank();
                let col = self.cursor_col;
                let cols = self.cols;
                if let Some(row) = self.grid.get_mut(self.cursor_row) {
                    let range = match first(0) {
                        0 => col..cols,
                        1 => 0..(col + 1).min(cols),
                        2 => 0..cols,
                        _ => return,
                    };
                    for cell in &mut row[range] {
                        *cell = blank.clone();
                    }
                }
            }
            'L' => {
                for _ in 0..count {
                    if self.cursor_row < self.grid.len() {
                        self.grid.pop();
                        self.grid.insert(self.cursor_row, blank_row(self.cols));
                    }
                }
            }
            'M' => {
                for _ in 0..count {
                    if self.cursor_row < self.grid.len() {
                        self.grid.remove(self.cursor_row);
                        self.grid.push(blank_row(self.cols));
                    }
                }
            }
            'P' => {
                let blank = self.styled_blank();
                let col = self.cursor_col;
                let cols = self.cols;
                if let Some(row) = self.grid.get_mut(self.cursor_row) {
                    for i in col..cols {
                        row[i] = if i + count < cols {
                            row[i + count].clone()
                        } else {
                            blank.clone()
                        };
                    }
                }
            }
            '@' => {
                let blank = self.styled_blank();
                let col = self.cursor_col;
                let cols = self.cols;
                if let Some(row) = self.grid.get_mut(self.cursor_row) {
                    for i in (col..cols).rev() {
                        row[i] = if i >= col + count {
                            row[i - count].clone()
                        } else {
                            blank.clone()
                        };
                    }
                }
            }
            'X' => {
                let blank = self.styled_blank();
                let col = self.cursor_col;
                if let Some(row) = self.grid.get_mut(self.cursor_row) {
                    for cell in row.iter_mut().skip(col).take(count) {
                        *cell = blank.clone();
                    }
                }
            }
            'S' => {
                for _ in 0..count {
                    self.scroll_up();
                }
            }
            'm' => self.handle_sgr(&params_vec),
            's' => self.saved_cursor = Some((self.cursor_row, self.cursor_col)),
            'u' => {
                if let Some((r, c)) = self.saved_cursor {
                    self.cursor_row = r.min(self.rows.saturating_sub(1));
                    self.cursor_col = c.min(self.cols.saturating_sub(1));
                }
            }
            _ => {}
        }
    }

    fn esc_dispatch(&mut self, _intermediates: &[u8], _ignore: bool, byte: u8) {
        match byte {
            b'7' => self.saved_cursor = Some((self.cursor_row, self.cursor_col)),
            b'8' => {
                if let Some((r, c)) = self.saved_cursor {
                    self.cursor_row = r.min(self.rows.saturating_sub(1));
                    self.cursor_col = c.min(self.cols.saturating_sub(1));
                }
            }
            b'c' => {
                self.fg = Color::Reset;
                self.bg = Color::Reset;
                self.modifiers = Modifier::empty();
                self.cursor_row = 0;
                self.cursor_col = 0;
                self.cursor_visible = true;
                self.leave_alternate();
                self.clear_region(0..self.rows);
            }
            b'D' => self.line_feed(),
            b'M' => {
                if self.cursor_row == 0 {
                    self.grid.pop();
                    self.grid.insert(0, blank_row(self.cols));
                } else {
                    self.cursor_row -= 1;
                }
            }
            _ => {}
        }
    }

    fn osc_dispatch(&mut self, _params: &[&[u8]], _bell_terminated: bool) {}
    fn hook(&mut self, _params: &vte::Params, _intermediates: &[u8], _ignore: bool, _action: char) {}
    fn unhook(&mut self) {}
    fn put(&mut self, _byte: u8) {}
}

/// The emulator: parser plus screen state.
pub struct VtEmulator {
    parser: vte::Parser,
    screen: Screen,
}

impl VtEmulator {
    /// Create an emulator with the given grid size and scrollback bound.
    pub fn new(rows: usize, cols: usize, max_scrollback: usize) -> Self {
        Self {
            parser: vte::Parser::new(),
            screen: Screen::new(rows.max(1), cols.max(1), max_scrollback),
        }
    }

    /// Feed raw PTY output through the parser.
    pub fn process(&mut self, data: &[u8]) {
        for &byte in data {
            self.parser.advance(&mut self.screen, byte);
        }
    }

    /// Resize the grid, preserving content that still fits. A resize to the
    /// current size is a no-op.
    pub fn resize(&mut self, rows: usize, cols: usize) {
        let (rows, cols) = (rows.max(1), cols.max(1));
        if rows == self.screen.rows && cols == self.screen.cols {
            return;
        }
        self.screen.resize(rows, cols);
    }

    pub fn rows(&self) -> usize {
        self.screen.rows
    }

    pub fn cols(&self) -> usize {
        self.screen.cols
    }

    /// Visible grid row, top to bottom.
    pub fn row(&self, r: usize) -> Option<&[Cell]> {
        self.screen.grid.get(r).map(|row| row.as_slice())
    }

    /// Number of lines currently held in scrollback.
    pub fn scrollback_len(&self) -> usize {
        self.screen.scrollback.len()
    }

    /// Scrollback row, oldest first.
    pub fn scrollback_row(&self, i: usize) -> Option<&[Cell]> {
        self.screen.scrollback.get(i).map(|row| row.as_slice())
    }

    /// Cursor position as (row, col).
    pub fn cursor_position(&self) -> (usize, usize) {
        (self.screen.cursor_row, self.screen.cursor_col)
    }

    pub fn cursor_visible(&self) -> bool {
        self.screen.cursor_visible
    }

    /// Whether the alternate screen is active (full-screen program running).
    pub fn alternate_screen(&self) -> bool {
        self.screen.alternate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_of(row: &[Cell]) -> String {
        row.iter().map(|c| c.ch).collect::<String>()
    }

    #[test]
    fn prints_characters_and_advances_cursor() {
        let mut emu = VtEmulator::new(24, 80, 100);
        emu.process(b"Hello");
        assert_eq!(emu.cursor_position(), (0, 5));
        assert!(text_of(emu.row(0).unwrap()).starts_with("Hello"));
    }

    #[test]
    fn carriage_return_and_line_feed() {
        let mut emu = VtEmulator::new(24, 80, 100);
        emu.process(b"Line1\r\nLine2");
        assert!(text_of(emu.row(0).unwrap()).starts_with("Line1"));
        assert!(text_of(emu.row(1).unwrap()).starts_with("Line2"));
    }

    #[test]
    fn cursor_position_sequence() {
        let mut emu = VtEmulator::new(24, 80, 100);
        emu.process(b"\x1b[6;11H");
        assert_eq!(emu.cursor_position(), (5, 10));
    }

    #[test]
    fn out_of_bounds_cursor_is_clamped() {
        let mut emu = VtEmulator::new(10, 20, 100);
        emu.process(b"\x1b[99;99H");
        assert_eq!(emu.cursor_position(), (9, 19));
    }

    #[test]
    fn sgr_sets_foreground() {
        let mut emu = VtEmulator::new(24, 80, 100);
        emu.process(b"\x1b[31mR\x1b[0mn");
        let row = emu.row(0).unwrap();
        assert_eq!(row[0].fg, Color::Red);
        assert_eq!(row[1].fg, Color::Reset);
    }

    #[test]
    fn truecolor_and_indexed_sgr() {
        let mut emu = VtEmulator::new(24, 80, 100);
        emu.process(b"\x1b[38;2;255;128;0mX\x1b[38;5;196mY");
        let row = emu.row(0).unwrap();
        assert_eq!(row[0].fg, Color::Rgb(255, 128, 0));
        assert_eq!(row[1].fg, Color::Indexed(196));
    }

    #[test]
    fn scrolled_lines_land_in_scrollback() {
        let mut emu = VtEmulator::new(3, 10, 100);
        emu.process(b"one\r\ntwo\r\nthree\r\nfour\r\nfive");
        assert_eq!(emu.scrollback_len(), 2);
        assert!(text_of(emu.scrollback_row(0).unwrap()).starts_with("one"));
        assert!(text_of(emu.row(0).unwrap()).starts_with("three"));
    }

    #[test]
    fn scrollback_is_bounded() {
        let mut emu = VtEmulator::new(2, 10, 3);
        for i in 0..10 {
            emu.process(format!("line{i}\r\n").as_bytes());
        }
        assert_eq!(emu.scrollback_len(), 3);
    }

    #[test]
    fn alternate_screen_round_trip() {
        let mut emu = VtEmulator::new(5, 20, 100);
        emu.process(b"shell prompt");
        emu.process(b"\x1b[?1049h");
        assert!(emu.alternate_screen());
        assert_eq!(text_of(emu.row(0).unwrap()).trim(), "");
        emu.process(b"full screen app");
        emu.process(b"\x1b[?1049l");
        assert!(!emu.alternate_screen());
        assert!(text_of(emu.row(0).unwrap()).starts_with("shell prompt"));
    }

    #[test]
    fn alternate_screen_does_not_feed_scrollback() {
        let mut emu = VtEmulator::new(2, 10, 100);
        emu.process(b"\x1b[?1049h");
        emu.process(b"a\r\nb\r\nc\r\nd");
        assert_eq!(emu.scrollback_len(), 0);
    }

    #[test]
    fn cursor_visibility_modes() {
        let mut emu = VtEmulator::new(5, 20, 100);
        assert!(emu.cursor_visible());
        emu.process(b"\x1b[?25l");
        assert!(!emu.cursor_visible());
        emu.process(b"\x1b[?25h");
        assert!(emu.cursor_visible());
    }

    #[test]
    fn resize_preserves_fitting_content() {
        let mut emu = VtEmulator::new(24, 80, 100);
        emu.process(b"Hello");
        emu.resize(10, 40);
        assert_eq!(emu.rows(), 10);
        assert_eq!(emu.cols(), 40);
        assert!(text_of(emu.row(0).unwrap()).starts_with("Hello"));
    }

    #[test]
    fn resize_to_same_size_keeps_cursor() {
        let mut emu = VtEmulator::new(10, 40, 100);
        emu.process(b"abc");
        emu.resize(10, 40);
        assert_eq!(emu.cursor_position(), (0, 3));
    }

    #[test]
    fn resize_while_in_alternate_screen() {
        let mut emu = VtEmulator::new(5, 20, 100);
        emu.process(b"primary");
        emu.process(b"\x1b[?1049h");
        emu.resize(8, 30);
        emu.process(b"\x1b[?1049l");
        assert_eq!(emu.rows(), 8);
        assert_eq!(emu.cols(), 30);
        assert!(text_of(emu.row(0).unwrap()).starts_with("primary"));
    }

    #[test]
    fn erase_in_line_from_cursor() {
        let mut emu = VtEmulator::new(3, 10, 100);
        emu.process(b"abcdefghij\r\x1b[5C\x1b[0K");
        assert_eq!(text_of(emu.row(0).unwrap()), "abcde     ");
    }

    #[test]
    fn erase_display_below_cursor() {
        let mut emu = VtEmulator::new(3, 10, 100);
        emu.process(b"AAAAAAAAAA\r\nBBBBBBBBBB\r\nCCCCCCCCCC");
        emu.process(b"\x1b[2;6H\x1b[0J");
        assert!(text_of(emu.row(0).unwrap()).starts_with("AAAAA"));
        assert_eq!(text_of(emu.row(1).unwrap()), "BBBBB     ");
        assert_eq!(text_of(emu.row(2).unwrap()).trim(), "");
    }

    #[test]
    fn backspace_and_tab() {
        let mut emu = VtEmulator::new(24, 80, 100);
        emu.process(b"AB\x08C\r\n\tX");
        let row0 = emu.row(0).unwrap();
        assert_eq!(row0[0].ch, 'A');
        assert_eq!(row0[1].ch, 'C');
        assert_eq!(emu.row(1).unwrap()[8].ch, 'X');
    }
}
