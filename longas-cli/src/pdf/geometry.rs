//! Page-space primitives produced by the content interpreter

/// Affine transform in PDF row-vector convention: `p' = p × M`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    pub fn new(a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub fn translate(tx: f32, ty: f32) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    /// `self × other`
    pub fn then(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            x * self.a + y * self.c + self.e,
            x * self.b + y * self.d + self.f,
        )
    }

    pub fn horizontal_scale(&self) -> f32 {
        self.a.hypot(self.b)
    }

    pub fn vertical_scale(&self) -> f32 {
        self.c.hypot(self.d)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// Axis-aligned ruling segment.
///
/// `position` is the y of a horizontal edge or the x of a vertical one;
/// `start <= end` along the other axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub orientation: Orientation,
    pub position: f32,
    pub start: f32,
    pub end: f32,
}

/// Segments closer than this to an axis count as axis-aligned
const AXIS_TOLERANCE: f32 = 1.0;

impl Edge {
    pub fn horizontal(y: f32, x0: f32, x1: f32) -> Self {
        Self {
            orientation: Orientation::Horizontal,
            position: y,
            start: x0.min(x1),
            end: x0.max(x1),
        }
    }

    pub fn vertical(x: f32, y0: f32, y1: f32) -> Self {
        Self {
            orientation: Orientation::Vertical,
            position: x,
            start: y0.min(y1),
            end: y0.max(y1),
        }
    }

    /// Classify a device-space segment; diagonals and points yield `None`
    pub fn from_segment(x0: f32, y0: f32, x1: f32, y1: f32) -> Option<Self> {
        let dx = (x1 - x0).abs();
        let dy = (y1 - y0).abs();
        if dx <= AXIS_TOLERANCE && dy <= AXIS_TOLERANCE {
            None
        } else if dy <= AXIS_TOLERANCE {
            Some(Self::horizontal((y0 + y1) / 2.0, x0, x1))
        } else if dx <= AXIS_TOLERANCE {
            Some(Self::vertical((x0 + x1) / 2.0, y0, y1))
        } else {
            None
        }
    }

    pub fn length(&self) -> f32 {
        self.end - self.start
    }
}

/// A run of text shown by one text operator
#[derive(Debug, Clone, PartialEq)]
pub struct TextChunk {
    /// Origin of the first glyph (baseline)
    pub x: f32,
    pub y: f32,
    /// Advance of the whole run in page units
    pub width: f32,
    /// Effective font size in page units
    pub size: f32,
    pub text: String,
}

impl TextChunk {
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.size * 0.35)
    }
}

/// Everything the table finder needs from one page
#[derive(Debug, Clone, Default)]
pub struct PageLayout {
    pub edges: Vec<Edge>,
    pub chunks: Vec<TextChunk>,
}

impl PageLayout {
    /// Page text, lines top to bottom
    pub fn text(&self) -> String {
        join_chunks(self.chunks.iter().collect())
    }
}

/// Join chunks into text: lines top to bottom separated by `\n`, chunks left
/// to right with a space where a visible gap separates them.
pub fn join_chunks(mut chunks: Vec<&TextChunk>) -> String {
    chunks.sort_by(|a, b| b.y.total_cmp(&a.y).then(a.x.total_cmp(&b.x)));

    let mut lines: Vec<Vec<&TextChunk>> = Vec::new();
    for chunk in chunks {
        let tolerance = (chunk.size * 0.5).max(1.0);
        match lines.last_mut() {
            Some(line) if (line[0].y - chunk.y).abs() <= tolerance => line.push(chunk),
            _ => lines.push(vec![chunk]),
        }
    }

    lines
        .into_iter()
        .map(|mut line| {
            line.sort_by(|a, b| a.x.total_cmp(&b.x));
            let mut text = String::new();
            let mut previous_end: Option<f32> = None;
            for chunk in line {
                if let Some(end) = previous_end {
                    let gap = chunk.x - end;
                    if gap > chunk.size * 0.15
                        && !text.ends_with(char::is_whitespace)
                        && !chunk.text.starts_with(char::is_whitespace)
                    {
                        text.push(' ');
                    }
                }
                text.push_str(&chunk.text);
                previous_end = Some(chunk.x + chunk.width);
            }
            text
        })
        .collect::<Vec<_>>()
        .join("\n")
}
