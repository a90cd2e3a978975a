//! Content stream interpreter
//!
//! Walks a page's operators and keeps only what table detection needs:
//! painted axis-aligned segments and positioned text runs. Form XObjects,
//! clipping and colour are ignored.

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId};

use super::ExtractError;
use super::fonts::{PageFonts, number};
use super::geometry::{Edge, Matrix, PageLayout, TextChunk};

/// TJ adjustments more negative than this (1/1000 em) are read as a word gap
const TJ_SPACE_THRESHOLD: f32 = 250.0;

/// Interpret one page of a loaded document
pub fn page_layout(
    doc: &Document,
    page_number: u32,
    page_id: ObjectId,
) -> Result<PageLayout, ExtractError> {
    let data = doc
        .get_page_content(page_id)
        .map_err(|err| ExtractError::page(page_number, err))?;
    let content = Content::decode(&data).map_err(|err| ExtractError::page(page_number, err))?;
    let fonts = PageFonts::load(doc, page_id);

    Ok(interpret(&content.operations, &fonts))
}

/// Graphics state saved by `q` and restored by `Q`
#[derive(Debug, Clone)]
struct GraphicsState {
    ctm: Matrix,
    font: Option<Vec<u8>>,
    font_size: f32,
    char_spacing: f32,
    word_spacing: f32,
    horizontal_scaling: f32,
    leading: f32,
    rise: f32,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            ctm: Matrix::IDENTITY,
            font: None,
            font_size: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scaling: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

struct Interpreter<'f, 'a> {
    fonts: &'f PageFonts<'a>,
    state: GraphicsState,
    stack: Vec<GraphicsState>,
    text_matrix: Matrix,
    line_matrix: Matrix,
    path: Vec<(f32, f32, f32, f32)>,
    current_point: Option<(f32, f32)>,
    subpath_start: Option<(f32, f32)>,
    layout: PageLayout,
}

/// Run the interpreter over decoded operations
pub fn interpret(operations: &[Operation], fonts: &PageFonts<'_>) -> PageLayout {
    let mut interpreter = Interpreter {
        fonts,
        state: GraphicsState::default(),
        stack: Vec::new(),
        text_matrix: Matrix::IDENTITY,
        line_matrix: Matrix::IDENTITY,
        path: Vec::new(),
        current_point: None,
        subpath_start: None,
        layout: PageLayout::default(),
    };

    for operation in operations {
        interpreter.step(operation);
    }

    interpreter.layout
}

impl Interpreter<'_, '_> {
    fn step(&mut self, op: &Operation) {
        let nums: Vec<f32> = op.operands.iter().filter_map(number).collect();

        match op.operator.as_str() {
            // Graphics state
            "q" => self.stack.push(self.state.clone()),
            "Q" => {
                if let Some(saved) = self.stack.pop() {
                    self.state = saved;
                }
            }
            "cm" if nums.len() == 6 => {
                let m = Matrix::new(nums[0], nums[1], nums[2], nums[3], nums[4], nums[5]);
                self.state.ctm = m.then(&self.state.ctm);
            }

            // Path construction
            "m" if nums.len() == 2 => {
                let p = self.state.ctm.apply(nums[0], nums[1]);
                self.current_point = Some(p);
                self.subpath_start = Some(p);
            }
            "l" if nums.len() == 2 => {
                let p = self.state.ctm.apply(nums[0], nums[1]);
                if let Some(from) = self.current_point {
                    self.path.push((from.0, from.1, p.0, p.1));
                }
                self.current_point = Some(p);
            }
            "c" if nums.len() == 6 => self.move_to_raw(nums[4], nums[5]),
            "v" | "y" if nums.len() == 4 => self.move_to_raw(nums[2], nums[3]),
            "h" => self.close_subpath(),
            "re" if nums.len() == 4 => self.rectangle(nums[0], nums[1], nums[2], nums[3]),

            // Path painting
            "S" | "f" | "F" | "f*" | "B" | "B*" => self.paint(),
            "s" | "b" | "b*" => {
                self.close_subpath();
                self.paint();
            }
            "n" => self.clear_path(),

            // Text objects and state
            "BT" => {
                self.text_matrix = Matrix::IDENTITY;
                self.line_matrix = Matrix::IDENTITY;
            }
            "Tf" => {
                if let Some(Object::Name(name)) = op.operands.first() {
                    self.state.font = Some(name.clone());
                }
                if let Some(size) = op.operands.get(1).and_then(number) {
                    self.state.font_size = size;
                }
            }
            "Tc" if nums.len() == 1 => self.state.char_spacing = nums[0],
            "Tw" if nums.len() == 1 => self.state.word_spacing = nums[0],
            "Tz" if nums.len() == 1 => self.state.horizontal_scaling = nums[0] / 100.0,
            "TL" if nums.len() == 1 => self.state.leading = nums[0],
            "Ts" if nums.len() == 1 => self.state.rise = nums[0],
            "Td" if nums.len() == 2 => self.next_line(nums[0], nums[1]),
            "TD" if nums.len() == 2 => {
                self.state.leading = -nums[1];
                self.next_line(nums[0], nums[1]);
            }
            "Tm" if nums.len() == 6 => {
                let m = Matrix::new(nums[0], nums[1], nums[2], nums[3], nums[4], nums[5]);
                self.text_matrix = m;
                self.line_matrix = m;
            }
            "T*" => self.next_line(0.0, -self.state.leading),

            // Text showing
            "Tj" => {
                if let Some(string @ Object::String(..)) = op.operands.first() {
                    self.show(std::slice::from_ref(string));
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = op.operands.first() {
                    self.show(items);
                }
            }
            "'" => {
                self.next_line(0.0, -self.state.leading);
                if let Some(string @ Object::String(..)) = op.operands.first() {
                    self.show(std::slice::from_ref(string));
                }
            }
            "\"" => {
                if nums.len() >= 2 {
                    self.state.word_spacing = nums[0];
                    self.state.char_spacing = nums[1];
                }
                self.next_line(0.0, -self.state.leading);
                if let Some(string @ Object::String(..)) = op.operands.get(2) {
                    self.show(std::slice::from_ref(string));
                }
            }
            _ => {}
        }
    }

    fn move_to_raw(&mut self, x: f32, y: f32) {
        self.current_point = Some(self.state.ctm.apply(x, y));
    }

    fn close_subpath(&mut self) {
        if let (Some(from), Some(start)) = (self.current_point, self.subpath_start) {
            if from != start {
                self.path.push((from.0, from.1, start.0, start.1));
            }
            self.current_point = Some(start);
        }
    }

    fn rectangle(&mut self, x: f32, y: f32, w: f32, h: f32) {
        let ctm = self.state.ctm;
        let corners = [
            ctm.apply(x, y),
            ctm.apply(x + w, y),
            ctm.apply(x + w, y + h),
            ctm.apply(x, y + h),
        ];
        for i in 0..4 {
            let (from, to) = (corners[i], corners[(i + 1) % 4]);
            self.path.push((from.0, from.1, to.0, to.1));
        }
        self.current_point = Some(corners[0]);
        self.subpath_start = Some(corners[0]);
    }

    fn paint(&mut self) {
        for (x0, y0, x1, y1) in self.path.drain(..) {
            if let Some(edge) = Edge::from_segment(x0, y0, x1, y1) {
                self.layout.edges.push(edge);
            }
        }
        self.clear_path();
    }

    fn clear_path(&mut self) {
        self.path.clear();
        self.current_point = None;
        self.subpath_start = None;
    }

    fn next_line(&mut self, tx: f32, ty: f32) {
        self.line_matrix = Matrix::translate(tx, ty).then(&self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    /// Show a sequence of strings and TJ adjustments as one text run
    fn show(&mut self, items: &[Object]) {
        let render = self.text_matrix.then(&self.state.ctm);
        let (x, y) = render.apply(0.0, self.state.rise);
        let size = self.state.font_size * render.vertical_scale();
        let scaling = self.state.horizontal_scaling;

        let mut text = String::new();
        let mut advance = 0.0f32;

        for item in items {
            match item {
                Object::String(bytes, _) => {
                    let run = self.fonts.decode(self.state.font.as_deref(), bytes);
                    advance += (run.width_units / 1000.0 * self.state.font_size
                        + run.glyph_count as f32 * self.state.char_spacing
                        + run.space_count as f32 * self.state.word_spacing)
                        * scaling;
                    text.push_str(&run.text);
                }
                other => {
                    if let Some(adjust) = number(other) {
                        let gap = adjust < -TJ_SPACE_THRESHOLD;
                        if gap && !text.is_empty() && !text.ends_with(' ') {
                            text.push(' ');
                        }
                        advance -= adjust / 1000.0 * self.state.font_size * scaling;
                    }
                }
            }
        }

        let width = advance * render.horizontal_scale();
        self.text_matrix = Matrix::translate(advance, 0.0).then(&self.text_matrix);

        let trimmed = text.trim();
        if trimmed.is_empty() {
            return;
        }
        self.layout.chunks.push(TextChunk {
            x,
            y,
            width,
            size,
            text: text.trim_end().to_string(),
        });
    }
}
