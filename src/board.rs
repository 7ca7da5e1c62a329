use std::fmt;
use std::fmt::{Debug, Display, Formatter};
use std::ops::Index;
use std::str::FromStr;

use anyhow::{anyhow, bail};
use colored::Colorize;
use log::debug;
use rand::Rng;
use strum_macros::EnumIter;

use crate::general::bitset::{ColorSet, NodeSet};
use crate::general::common::{char_to_digit, digit_to_char, Res, ALPHABET_SIZE};

pub mod state;

/// A cell color. Values are `1..=34`; `0` is reserved as "no color" and never
/// appears on a board. Ordering is by value, which the search relies on for
/// symmetry breaking.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[must_use]
pub struct Color(pub u8);

impl Color {
    pub const MAX_VALUE: u8 = ALPHABET_SIZE - 1;

    pub fn from_char(c: char) -> Res<Color> {
        let value = char_to_digit(c)?;
        if value == 0 {
            bail!("The color value 0 is reserved and can't appear on a board");
        }
        Ok(Color(value))
    }

    #[must_use]
    pub fn to_char(self) -> char {
        digit_to_char(self.0)
    }
}

impl Display for Color {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_char())
    }
}

impl Debug for Color {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Color({})", self.0)
    }
}

/// A cell position. `x` grows to the right, `y` downward; ordering is
/// row-major (by `y`, then `x`), matching the scan order of board
/// construction.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
#[must_use]
pub struct Point {
    pub x: u16,
    pub y: u16,
}

impl Point {
    pub fn new(x: usize, y: usize) -> Self {
        Self { x: x as u16, y: y as u16 }
    }
}

impl PartialOrd for Point {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Point {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.y, self.x).cmp(&(other.y, other.x))
    }
}

impl Display for Point {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "({0}, {1})", self.x, self.y)
    }
}

/// Where the player's first region sits.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, EnumIter)]
#[must_use]
pub enum StartPos {
    #[default]
    UpperLeft,
    UpperRight,
    LowerLeft,
    LowerRight,
    Middle,
}

impl StartPos {
    #[must_use]
    pub fn point(self, size: usize) -> Point {
        let last = size - 1;
        match self {
            StartPos::UpperLeft => Point::new(0, 0),
            StartPos::UpperRight => Point::new(last, 0),
            StartPos::LowerLeft => Point::new(0, last),
            StartPos::LowerRight => Point::new(last, last),
            StartPos::Middle => Point::new(size / 2, size / 2),
        }
    }
}

impl Display for StartPos {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            StartPos::UpperLeft => "upper-left",
            StartPos::UpperRight => "upper-right",
            StartPos::LowerLeft => "lower-left",
            StartPos::LowerRight => "lower-right",
            StartPos::Middle => "middle",
        };
        write!(f, "{name}")
    }
}

impl FromStr for StartPos {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Res<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ul" | "upper-left" | "upper_left" => Ok(StartPos::UpperLeft),
            "ur" | "upper-right" | "upper_right" => Ok(StartPos::UpperRight),
            "ll" | "lower-left" | "lower_left" => Ok(StartPos::LowerLeft),
            "lr" | "lower-right" | "lower_right" => Ok(StartPos::LowerRight),
            "m" | "middle" => Ok(StartPos::Middle),
            other => Err(anyhow!(
                "Unknown start position '{0}', expected one of 'ul', 'ur', 'll', 'lr', 'm'",
                other.red()
            )),
        }
    }
}

/// A maximal 4-connected single-color region of the grid. Adjacency is kept
/// as a set of region ids, never as references; the [`Board`] owns all
/// regions exclusively.
#[derive(Debug, Clone)]
#[must_use]
pub struct Region {
    id: u32,
    color: Color,
    fields: Vec<Point>,
    neighbors: NodeSet,
}

impl Region {
    #[inline]
    #[must_use]
    pub fn id(&self) -> u32 {
        self.id
    }

    #[inline]
    pub fn color(&self) -> Color {
        self.color
    }

    #[inline]
    #[must_use]
    pub fn fields(&self) -> &[Point] {
        &self.fields
    }

    #[inline]
    #[must_use]
    pub fn num_fields(&self) -> usize {
        self.fields.len()
    }

    /// Ids of the regions sharing at least one grid edge with this one.
    #[inline]
    pub fn neighbors(&self) -> &NodeSet {
        &self.neighbors
    }
}

pub const MIN_BOARD_SIZE: usize = 2;
pub const MAX_BOARD_SIZE: usize = 256;

/// The whole puzzle: the region graph of a color grid plus its lookup
/// indices. Immutable after construction.
#[derive(Debug, Clone)]
#[must_use]
pub struct Board {
    size: usize,
    regions: Vec<Region>,
    /// Indexed by color value; holds the ids of all regions of that color.
    /// Entries for absent colors are empty sets.
    by_color: Vec<NodeSet>,
    colors: ColorSet,
    start_pos: Point,
    start_node: u32,
    max_steps: u32,
}

impl Board {
    /// Builds the region graph from a row-major grid of cell colors.
    ///
    /// Scans the grid in row-major order and carves out one region per
    /// unvisited cell by flood fill, so region ids are assigned in the order
    /// their first (row-major smallest) cell is encountered. Then wires up
    /// region adjacency and the per-color index. Fails without building
    /// anything on invalid input.
    pub fn from_cells(
        size: usize,
        cells: &[Color],
        start: StartPos,
        max_steps: Option<u32>,
    ) -> Res<Board> {
        if !(MIN_BOARD_SIZE..=MAX_BOARD_SIZE).contains(&size) {
            bail!("Board size must be between {MIN_BOARD_SIZE} and {MAX_BOARD_SIZE}, not {size}");
        }
        if cells.len() != size * size {
            bail!("Expected {0} cells for a board of size {size}, got {1}", size * size, cells.len());
        }
        let mut colors = ColorSet::default();
        for c in cells {
            if c.0 == 0 || c.0 > Color::MAX_VALUE {
                bail!("Cell color values must be between 1 and {0}, not {1}", Color::MAX_VALUE, c.0);
            }
            colors.insert(c.0);
        }
        if colors.count() < 2 {
            bail!("A board needs at least 2 colors, this one has {}", colors.count());
        }

        let at = |x: usize, y: usize| cells[y * size + x];
        const UNASSIGNED: u32 = u32::MAX;
        let mut region_of = vec![UNASSIGNED; size * size];
        let mut carved: Vec<(Color, Vec<Point>)> = vec![];
        let mut stack = vec![];
        for y in 0..size {
            for x in 0..size {
                if region_of[y * size + x] != UNASSIGNED {
                    continue;
                }
                let id = carved.len() as u32;
                let color = at(x, y);
                let mut fields = vec![];
                stack.push((x, y));
                region_of[y * size + x] = id;
                while let Some((x, y)) = stack.pop() {
                    fields.push(Point::new(x, y));
                    let mut visit = |nx: usize, ny: usize| {
                        if region_of[ny * size + nx] == UNASSIGNED && at(nx, ny) == color {
                            region_of[ny * size + nx] = id;
                            stack.push((nx, ny));
                        }
                    };
                    if x > 0 {
                        visit(x - 1, y);
                    }
                    if x + 1 < size {
                        visit(x + 1, y);
                    }
                    if y > 0 {
                        visit(x, y - 1);
                    }
                    if y + 1 < size {
                        visit(x, y + 1);
                    }
                }
                carved.push((color, fields));
            }
        }

        let num_nodes = carved.len();
        let mut regions: Vec<Region> = carved
            .into_iter()
            .enumerate()
            .map(|(id, (color, fields))| Region {
                id: id as u32,
                color,
                fields,
                neighbors: NodeSet::new(num_nodes),
            })
            .collect();

        for id in 0..num_nodes {
            let mut neighbors = std::mem::replace(&mut regions[id].neighbors, NodeSet::new(0));
            for field in &regions[id].fields {
                let (x, y) = (field.x as usize, field.y as usize);
                let mut connect = |nx: usize, ny: usize| {
                    let other = region_of[ny * size + nx];
                    if other != id as u32 {
                        neighbors.set(other as usize);
                    }
                };
                if x > 0 {
                    connect(x - 1, y);
                }
                if x + 1 < size {
                    connect(x + 1, y);
                }
                if y > 0 {
                    connect(x, y - 1);
                }
                if y + 1 < size {
                    connect(x, y + 1);
                }
            }
            regions[id].neighbors = neighbors;
        }

        let mut by_color = vec![NodeSet::new(num_nodes); ALPHABET_SIZE as usize];
        for region in &regions {
            by_color[region.color.0 as usize].set(region.id as usize);
        }

        let max_steps = match max_steps {
            Some(0) => bail!("The maximum number of steps must be at least 1"),
            Some(steps) => steps,
            None => Self::default_max_steps(size, colors.count()),
        };

        let start_pos = start.point(size);
        let start_node = region_of[start_pos.y as usize * size + start_pos.x as usize];
        debug!("board of size {size} with {0} colors reduced to {num_nodes} regions", colors.count());
        let board = Board { size, regions, by_color, colors, start_pos, start_node, max_steps };
        debug_assert!(board.verify().is_ok());
        Ok(board)
    }

    /// The default step cap, `⌊0.30 · size · number of colors⌋`. Only
    /// interactive play and dataset reporting use the cap; the solver
    /// always searches unbounded.
    #[must_use]
    pub fn default_max_steps(size: usize, num_colors: usize) -> u32 {
        ((size * num_colors * 30) / 100) as u32
    }

    /// Parses the single-line compact form: `size²` base-35 digits,
    /// row-major, no whitespace.
    pub fn from_compact_str(compact: &str, start: StartPos, max_steps: Option<u32>) -> Res<Board> {
        let compact = compact.trim();
        let len = compact.chars().count();
        let size = (len as f64).sqrt() as usize;
        if size * size != len {
            bail!("A compact board must have a square number of characters, got {len}");
        }
        let cells = compact.chars().map(Color::from_char).collect::<Res<Vec<_>>>()?;
        Self::from_cells(size, &cells, start, max_steps)
    }

    /// Emits the compact single-line form; the inverse of
    /// [`Self::from_compact_str`] up to region id assignment.
    #[must_use]
    pub fn compact_str(&self) -> String {
        let mut cells = vec![b'?'; self.num_fields()];
        for region in &self.regions {
            for field in &region.fields {
                cells[field.y as usize * self.size + field.x as usize] = region.color.to_char() as u8;
            }
        }
        debug_assert!(!cells.contains(&b'?'));
        String::from_utf8(cells).unwrap()
    }

    /// The plain base-35 grid, one row per line.
    #[must_use]
    pub fn ascii_diagram(&self) -> String {
        let compact = self.compact_str();
        let mut res = String::with_capacity(self.num_fields() + self.size);
        for row in compact.as_bytes().chunks(self.size) {
            res.push_str(std::str::from_utf8(row).unwrap());
            res.push('\n');
        }
        res
    }

    /// A uniformly random board. Regenerates on the (tiny-board) chance that
    /// fewer than 2 colors end up present.
    pub fn random(size: usize, num_colors: usize, start: StartPos) -> Res<Board> {
        if !(2..=Color::MAX_VALUE as usize).contains(&num_colors) {
            bail!("The number of colors must be between 2 and {0}, not {num_colors}", Color::MAX_VALUE);
        }
        let mut rng = rand::rng();
        let mut last_err = None;
        for _ in 0..100 {
            let cells: Vec<Color> =
                (0..size * size).map(|_| Color(rng.random_range(1..=num_colors as u8))).collect();
            match Self::from_cells(size, &cells, start, None) {
                Ok(board) => return Ok(board),
                Err(err) => last_err = Some(err),
            }
        }
        Err(last_err.unwrap())
    }

    /// A deterministic board: the seed string is hashed and the hash drives
    /// a 32-bit xorshift sequence, so the same (seed, size, colors) tuple
    /// produces the same board on every run and platform. Cell `(x, y)`
    /// gets color `1 + next() % colors`, generated row-major.
    pub fn from_seed(seed: &str, size: usize, num_colors: usize, start: StartPos) -> Res<Board> {
        if !(2..=Color::MAX_VALUE as usize).contains(&num_colors) {
            bail!("The number of colors must be between 2 and {0}, not {num_colors}", Color::MAX_VALUE);
        }
        let mut hash: u32 = 0;
        for byte in seed.bytes() {
            hash = hash.wrapping_mul(31).wrapping_add(byte as u32);
        }
        if hash == 0 {
            // xorshift must not start at zero
            hash = 0x9E37_79B9;
        }
        let mut next = move || {
            hash ^= hash << 13;
            hash ^= hash >> 17;
            hash ^= hash << 5;
            hash
        };
        let cells: Vec<Color> =
            (0..size * size).map(|_| Color(1 + (next() % num_colors as u32) as u8)).collect();
        Self::from_cells(size, &cells, start, None)
    }

    #[inline]
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    #[must_use]
    pub fn num_fields(&self) -> usize {
        self.size * self.size
    }

    #[inline]
    #[must_use]
    pub fn num_nodes(&self) -> usize {
        self.regions.len()
    }

    #[inline]
    #[must_use]
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// The ids of all regions with the given color. Empty for colors not on
    /// the board.
    #[inline]
    pub fn nodes_of_color(&self, color: Color) -> &NodeSet {
        &self.by_color[color.0 as usize]
    }

    /// The colors actually present on the board.
    #[inline]
    pub fn colors(&self) -> ColorSet {
        self.colors
    }

    #[inline]
    #[must_use]
    pub fn num_colors(&self) -> usize {
        self.colors.count()
    }

    #[inline]
    pub fn start_pos(&self) -> Point {
        self.start_pos
    }

    /// Id of the region containing the start cell.
    #[inline]
    #[must_use]
    pub fn start_node(&self) -> u32 {
        self.start_node
    }

    #[inline]
    #[must_use]
    pub fn max_steps(&self) -> u32 {
        self.max_steps
    }

    /// Checks the construction invariants. Meant for `assert!`s and tests,
    /// not for the hot path.
    pub fn verify(&self) -> Res<()> {
        let mut seen_fields = 0;
        for region in &self.regions {
            if region.neighbors.get(region.id as usize) {
                bail!("Region {} borders itself", region.id);
            }
            if region.fields.is_empty() {
                bail!("Region {} has no fields", region.id);
            }
            for other in region.neighbors.ones() {
                if !self.regions[other].neighbors.get(region.id as usize) {
                    bail!("Region adjacency of {0} and {other} isn't symmetric", region.id);
                }
                if self.regions[other].color == region.color {
                    bail!("Adjacent regions {0} and {other} share a color", region.id);
                }
            }
            if !self.by_color[region.color.0 as usize].get(region.id as usize) {
                bail!("Region {} is missing from its color index", region.id);
            }
            seen_fields += region.fields.len();
        }
        if seen_fields != self.num_fields() {
            bail!("Regions cover {seen_fields} fields, the board has {}", self.num_fields());
        }
        Ok(())
    }
}

impl Index<usize> for Board {
    type Output = Region;

    #[inline]
    fn index(&self, idx: usize) -> &Region {
        &self.regions[idx]
    }
}

fn terminal_color(value: u8) -> Option<colored::Color> {
    use colored::Color::*;
    Some(match value {
        1 => Red,
        2 => Green,
        3 => Yellow,
        4 => Blue,
        5 => Magenta,
        6 => Cyan,
        7 => White,
        8 => BrightRed,
        9 => BrightGreen,
        10 => BrightYellow,
        11 => BrightBlue,
        12 => BrightMagenta,
        13 => BrightCyan,
        14 => BrightWhite,
        _ => return None,
    })
}

impl Board {
    /// Renders the grid with colored background blocks (values without a
    /// terminal color fall back to plain digits). With a position, the
    /// cells the player owns are marked.
    #[must_use]
    pub fn render(&self, pos: Option<&state::Position>) -> String {
        let mut cells = vec![(0u8, false); self.num_fields()];
        for region in &self.regions {
            let owned = pos.is_some_and(|p| p.filled().get(region.id as usize));
            for field in &region.fields {
                cells[field.y as usize * self.size + field.x as usize] = (region.color.0, owned);
            }
        }
        let mut res = String::new();
        for row in cells.chunks(self.size) {
            for &(value, owned) in row {
                let piece = match (terminal_color(value), owned) {
                    (Some(color), false) => "  ".on_color(color).to_string(),
                    (Some(color), true) => "··".black().on_color(color).to_string(),
                    (None, false) => format!("{} ", digit_to_char(value)),
                    (None, true) => format!("{}", digit_to_char(value)).reversed().to_string() + " ",
                };
                res.push_str(&piece);
            }
            res.push('\n');
        }
        res
    }
}

impl Display for Board {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render(None))
    }
}
