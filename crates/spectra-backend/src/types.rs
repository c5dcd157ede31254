//! Wire-level types shared by every backend adapter.
//!
//! Descriptors here are deliberately loose: most fields are optional and
//! colours are plain strings, because each daemon reports a different
//! subset. `spectra-core` normalizes them into its canonical model.
//! Field names use camelCase via `#[serde(rename_all = "camelCase")]`.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Effect id reserved for zone brightness changes.
pub const BRIGHTNESS_EFFECT: &str = "brightness";

// ── Colour ───────────────────────────────────────────────────────────

/// An 8-bit-per-channel colour.
///
/// Serialized as an uppercase `"#RRGGBB"` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Self = Self::new(0, 0, 0);
    pub const WHITE: Self = Self::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#RRGGBB` or `RRGGBB`, case-insensitive.
    pub fn from_hex(raw: &str) -> Option<Self> {
        let hex = raw.trim().strip_prefix('#').unwrap_or(raw.trim());
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        Some(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }

    /// Uppercase `#RRGGBB`.
    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    pub fn to_array(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

impl From<[u8; 3]> for Rgb {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Self::new(r, g, b)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Rgb {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::from_hex(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid hex colour: {raw:?}")))
    }
}

// ── Effect capabilities ──────────────────────────────────────────────

/// How many colours an effect (or one of its options) consumes.
///
/// On the wire: a number for [`ColourCount::Exact`], `"variable"` otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ColourCountRepr", into = "ColourCountRepr")]
pub enum ColourCount {
    Exact(u8),
    /// Any number of colours, at least one.
    Variable,
}

impl ColourCount {
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Self::Exact(n) => usize::from(n) == count,
            Self::Variable => count >= 1,
        }
    }
}

impl Default for ColourCount {
    fn default() -> Self {
        Self::Exact(0)
    }
}

impl fmt::Display for ColourCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(n) => write!(f, "{n}"),
            Self::Variable => f.write_str("at least 1"),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum ColourCountRepr {
    Exact(u8),
    Word(String),
}

impl TryFrom<ColourCountRepr> for ColourCount {
    type Error = String;

    fn try_from(repr: ColourCountRepr) -> Result<Self, Self::Error> {
        match repr {
            ColourCountRepr::Exact(n) => Ok(Self::Exact(n)),
            ColourCountRepr::Word(w) if w.eq_ignore_ascii_case("variable") => Ok(Self::Variable),
            ColourCountRepr::Word(w) => Err(format!("invalid colour count: {w:?}")),
        }
    }
}

impl From<ColourCount> for ColourCountRepr {
    fn from(count: ColourCount) -> Self {
        match count {
            ColourCount::Exact(n) => Self::Exact(n),
            ColourCount::Variable => Self::Word("variable".into()),
        }
    }
}

/// One choice of an enumerated effect parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterOption {
    pub id: String,
    pub label: String,
    /// Overrides the effect's colour requirement when this option is chosen.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colours: Option<ColourCount>,
}

impl ParameterOption {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            colours: None,
        }
    }

    pub fn with_colours(mut self, colours: ColourCount) -> Self {
        self.colours = Some(colours);
        self
    }
}

/// The parameter an effect accepts.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParameterKind {
    #[default]
    None,
    Enumerated {
        options: Vec<ParameterOption>,
    },
    Integer {
        min: i64,
        max: i64,
    },
}

impl ParameterKind {
    pub fn option(&self, id: &str) -> Option<&ParameterOption> {
        match self {
            Self::Enumerated { options } => options.iter().find(|o| o.id == id),
            _ => None,
        }
    }
}

/// A concrete parameter value supplied with a state change.
///
/// Untagged so both `"dual"` and `1` parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Integer(i64),
    Enumerated(String),
}

impl ParameterValue {
    /// Interpret free-form user input: integers become [`Self::Integer`].
    pub fn parse(raw: &str) -> Self {
        raw.trim()
            .parse::<i64>()
            .map_or_else(|_| Self::Enumerated(raw.trim().to_owned()), Self::Integer)
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(n) => write!(f, "{n}"),
            Self::Enumerated(s) => f.write_str(s),
        }
    }
}

/// One effect a zone can display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectDescriptor {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub parameter: ParameterKind,
    #[serde(default)]
    pub colours: ColourCount,
}

impl EffectDescriptor {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            parameter: ParameterKind::None,
            colours: ColourCount::Exact(0),
        }
    }

    /// The reserved brightness pseudo-effect: integer percentage, no colours.
    pub fn brightness() -> Self {
        Self::new(BRIGHTNESS_EFFECT, "Brightness").with_parameter(ParameterKind::Integer {
            min: 0,
            max: 100,
        })
    }

    pub fn with_parameter(mut self, parameter: ParameterKind) -> Self {
        self.parameter = parameter;
        self
    }

    pub fn with_colours(mut self, colours: ColourCount) -> Self {
        self.colours = colours;
        self
    }
}

// ── Device descriptors ───────────────────────────────────────────────

/// Current lighting state of a zone, as reported by the daemon.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawZoneState {
    #[serde(default)]
    pub effect: Option<String>,
    #[serde(default)]
    pub parameter: Option<ParameterValue>,
    /// Hex strings in whatever case the daemon uses.
    #[serde(default)]
    pub colours: Vec<String>,
    /// Percentage; daemons occasionally report values outside 0-100.
    #[serde(default)]
    pub brightness: Option<i64>,
}

/// An independently controllable lighting region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawZone {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub effects: Vec<EffectDescriptor>,
    #[serde(default)]
    pub state: RawZoneState,
}

/// Largest matrix, in pixels, a frame will be allocated for.
pub const MAX_MATRIX_PIXELS: usize = 64 * 1024;

/// Dimensions of a per-LED addressable matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatrixDimensions {
    pub rows: usize,
    pub cols: usize,
}

impl MatrixDimensions {
    pub const fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    pub const fn contains(self, row: usize, col: usize) -> bool {
        row < self.rows && col < self.cols
    }

    /// `None` when the product overflows or exceeds [`MAX_MATRIX_PIXELS`].
    pub fn pixel_count(self) -> Option<usize> {
        self.rows
            .checked_mul(self.cols)
            .filter(|&n| n <= MAX_MATRIX_PIXELS)
    }

    /// Non-empty and small enough to hold a [`Frame`] for.
    pub fn is_addressable(self) -> bool {
        self.pixel_count().is_some_and(|n| n > 0)
    }
}

/// A device as reported by a backend, before normalization.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDeviceDescriptor {
    pub uid: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub serial: Option<String>,
    #[serde(default)]
    pub form_factor: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    /// Empty when the device exposes a single implicit zone.
    #[serde(default)]
    pub zones: Vec<RawZone>,
    /// Device-level effects, used only when `zones` is empty.
    #[serde(default)]
    pub effects: Vec<EffectDescriptor>,
    #[serde(default)]
    pub state: RawZoneState,
    #[serde(default)]
    pub matrix: Option<MatrixDimensions>,
    #[serde(default)]
    pub keyboard_layout: Option<String>,
    #[serde(default)]
    pub firmware: Option<String>,
}

// ── Commands ─────────────────────────────────────────────────────────

/// A validated state change forwarded to [`crate::Backend::set_state`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateChange {
    pub zone: String,
    pub effect: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter: Option<ParameterValue>,
    #[serde(default)]
    pub colours: Vec<Rgb>,
}

impl StateChange {
    pub fn is_brightness(&self) -> bool {
        self.effect == BRIGHTNESS_EFFECT
    }
}

/// A complete matrix frame, row-major.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    pub rows: usize,
    pub cols: usize,
    pub pixels: Vec<Rgb>,
}

impl Frame {
    /// An all-black frame, or `None` if `dimensions` is too large.
    pub fn new(dimensions: MatrixDimensions) -> Option<Self> {
        let len = dimensions.pixel_count()?;
        Some(Self {
            rows: dimensions.rows,
            cols: dimensions.cols,
            pixels: vec![Rgb::BLACK; len],
        })
    }

    pub fn dimensions(&self) -> MatrixDimensions {
        MatrixDimensions::new(self.rows, self.cols)
    }

    fn index(&self, row: usize, col: usize) -> Option<usize> {
        self.dimensions()
            .contains(row, col)
            .then_some(row * self.cols + col)
    }

    pub fn get(&self, row: usize, col: usize) -> Option<Rgb> {
        self.index(row, col)
            .and_then(|i| self.pixels.get(i).copied())
    }

    /// Returns `false` (and changes nothing) when out of range.
    pub fn set(&mut self, row: usize, col: usize, colour: Rgb) -> bool {
        match self.index(row, col).and_then(|i| self.pixels.get_mut(i)) {
            Some(px) => {
                *px = colour;
                true
            }
            None => false,
        }
    }

    pub fn fill(&mut self, colour: Rgb) {
        self.pixels.fill(colour);
    }

    pub fn clear(&mut self) {
        self.fill(Rgb::BLACK);
    }

    /// Iterate rows as slices, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[Rgb]> {
        self.pixels.chunks(self.cols.max(1)).take(self.rows)
    }
}
