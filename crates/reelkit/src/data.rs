//! Default game data for the standard 5x3 machine.
//!
//! These describe what the reels look like. Nothing here decides outcomes
//! or payouts; hosts pass outcomes in from outside.

use reelkit_render::{Color, Payline, SymbolDescriptor};

pub const REEL_COUNT: usize = 5;
pub const VISIBLE_ROWS: usize = 3;
pub const STRIP_LENGTH: usize = 100;

/// The blank symbol. It has its own atlas entry but reuses the pixels of `D`.
pub const BLANK: &str = "_";

const STANDARD_STRIPS: [&str; REEL_COUNT] = [
    "_CCC__BD___D_____D_____D__DBDDCC_D_C_D__AD_D_CB_C_A_B___B_______DD___D_C_A_____B__C__D______D_______",
    "C_A_____C__DC_____B__B_CD_B___CD__DAD__C__C______CDD_______C_DA________DDD____CDDD___DB____BD__B____",
    "___D_D_B_________CD__D__C_C____B__A___CDB__BC_D__D__CD_C_________D___A_DC__B______B_DDDDD_____C_CDA_",
    "C___C_CDDDDC__D__CCB____D_B__B______D______BD_____A____D_D__AD__D__B___B__C____A____C_D_D___C__CDD__",
    "_________________CC___DC___DDB_BDADDC______B____C__D___D__CA_______CD__D_D_C_______BD_C_DBA_BDD__CD_",
];

const STANDARD_PAYLINES: [[usize; REEL_COUNT]; 20] = [
    [1, 1, 1, 1, 1], // middle
    [0, 0, 0, 0, 0], // top
    [2, 2, 2, 2, 2], // bottom
    [0, 1, 2, 1, 0], // V
    [2, 1, 0, 1, 2], // inverted V
    [0, 1, 1, 2, 2],
    [2, 1, 1, 0, 0],
    [0, 0, 1, 0, 0],
    [2, 2, 1, 2, 2],
    [0, 1, 2, 2, 1],
    [2, 1, 0, 0, 1],
    [1, 0, 0, 0, 1],
    [1, 2, 2, 2, 1],
    [0, 2, 0, 2, 0],
    [2, 0, 2, 0, 2],
    [0, 2, 1, 2, 0],
    [2, 0, 1, 0, 2],
    [0, 0, 1, 2, 2],
    [2, 2, 1, 0, 0],
    [1, 0, 1, 2, 1], // wave
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaylineSet {
    pub paylines: Vec<Payline>,
}

impl PaylineSet {
    /// The 20 standard lines of a 5-reel, 3-row machine.
    pub fn standard() -> Self {
        Self {
            paylines: STANDARD_PAYLINES.iter().map(|rows| Payline::new(*rows)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.paylines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paylines.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Payline> {
        self.paylines.get(index)
    }

    pub fn into_vec(self) -> Vec<Payline> {
        self.paylines
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReelStrips {
    pub strips: Vec<Vec<String>>,
}

impl ReelStrips {
    pub fn standard() -> Self {
        Self {
            strips: STANDARD_STRIPS
                .iter()
                .map(|strip| strip.chars().map(|c| c.to_string()).collect())
                .collect(),
        }
    }

    pub fn reel(&self, index: usize) -> Option<&[String]> {
        self.strips.get(index).map(Vec::as_slice)
    }

    /// The display grid, one column per reel, for the given stop indices.
    ///
    /// Reels without a stop index are left out.
    pub fn grid(&self, stops: &[usize], rows: usize) -> Vec<Vec<String>> {
        self.strips
            .iter()
            .zip(stops)
            .map(|(strip, &stop)| reel_window(strip, stop, rows))
            .collect()
    }

    pub fn into_vec(self) -> Vec<Vec<String>> {
        self.strips
    }
}

/// `rows` consecutive symbols starting at `index`, wrapping around the strip.
pub fn reel_window<S: Clone>(strip: &[S], index: usize, rows: usize) -> Vec<S> {
    if strip.is_empty() {
        return Vec::new();
    }
    (0..rows).map(|row| strip[(index + row) % strip.len()].clone()).collect()
}

/// Symbols under `payline` in a column-major `grid`.
///
/// Reels or rows missing from the grid are skipped.
pub fn payline_symbols<'a>(grid: &'a [Vec<String>], payline: &Payline) -> Vec<&'a str> {
    grid.iter()
        .zip(&payline.rows)
        .filter_map(|(column, &row)| column.get(row).map(String::as_str))
        .collect()
}

#[derive(Debug, Clone)]
pub struct SymbolSet {
    pub symbols: Vec<SymbolDescriptor>,
}

impl SymbolSet {
    /// `A` to `D` with their fallback colors, and the blank aliasing `D`.
    ///
    /// None of these carry an image; hosts attach theirs with
    /// [`with_images`](Self::with_images).
    pub fn standard() -> Self {
        let colored = |id: &str, hex: u32| SymbolDescriptor::new(id, Default::default()).with_fallback_color(Color::from_hex(hex));
        Self {
            symbols: vec![
                colored("A", 0xC0392B),
                colored("B", 0x2980B9),
                colored("C", 0x27AE60),
                colored("D", 0x8E44AD),
                SymbolDescriptor::alias(BLANK, "D"),
            ],
        }
    }

    /// Point each non-alias symbol at `<dir>/<id>.png`.
    pub fn with_images(mut self, dir: impl AsRef<std::path::Path>) -> Self {
        for symbol in self.symbols.iter_mut().filter(|s| s.alias_of.is_none()) {
            symbol.image = reelkit_render::SymbolImage::Path(dir.as_ref().join(format!("{}.png", symbol.id)));
        }
        self
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.symbols.iter().map(|s| s.id.as_str())
    }

    pub fn into_vec(self) -> Vec<SymbolDescriptor> {
        self.symbols
    }
}
