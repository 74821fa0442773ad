pub const EMU_PER_MM: i64 = 36_000;
pub const EMU_PER_PX: i64 = 9_525;
const TWIPS_PER_INCH: i64 = 1_440;
const TENTHS_MM_PER_INCH: i64 = 254;

pub const A4_WIDTH_MM: i64 = 210;
pub const A4_HEIGHT_MM: i64 = 297;

pub const PAGE_WIDTH_EMU: i64 = mm_to_emu(A4_WIDTH_MM);
pub const PAGE_HEIGHT_EMU: i64 = mm_to_emu(A4_HEIGHT_MM);
pub const PAGE_WIDTH_TWIPS: i64 = mm_to_twips(A4_WIDTH_MM);
pub const PAGE_HEIGHT_TWIPS: i64 = mm_to_twips(A4_HEIGHT_MM);

pub const fn mm_to_emu(mm: i64) -> i64 {
    mm * EMU_PER_MM
}

/// Rounded to the nearest twip (half up).
pub const fn mm_to_twips(mm: i64) -> i64 {
    let num = mm * 10 * TWIPS_PER_INCH;
    (num + TENTHS_MM_PER_INCH / 2) / TENTHS_MM_PER_INCH
}

pub const fn px_to_emu(px: i64) -> i64 {
    px * EMU_PER_PX
}

pub fn pct_to_emu(pct: f64, dimension: i64) -> i64 {
    (pct / 100.0 * dimension as f64).round() as i64
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EmuRect {
    pub x: i64,
    pub y: i64,
    pub cx: i64,
    pub cy: i64,
}

impl EmuRect {
    /// Maps a percentage rectangle onto a page of the given size. Values
    /// outside `[0, 100]` are kept as-is and simply land off the page.
    pub fn from_percent(x: f64, y: f64, width: f64, height: f64, page: (i64, i64)) -> Self {
        let (pw, ph) = page;
        EmuRect {
            x: pct_to_emu(x, pw),
            y: pct_to_emu(y, ph),
            cx: pct_to_emu(width, pw),
            cy: pct_to_emu(height, ph),
        }
    }
}

pub fn half_points_to_pt(half_points: u32) -> f32 {
    half_points as f32 / 2.0
}
