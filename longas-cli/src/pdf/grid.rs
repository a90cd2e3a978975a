//! Ruled-line table detection
//!
//! Tables are recovered from drawn edges only: edges are snapped and joined,
//! their intersections become candidate cell corners, and every smallest
//! rectangle bounded by edges on all four sides becomes a cell. Whitespace
//! alignment is never used to infer columns.

use serde::{Deserialize, Serialize};

use super::geometry::{Edge, Orientation, PageLayout, TextChunk, join_chunks};

/// Edges shorter than this after joining are ignored
const MIN_EDGE_LENGTH: f32 = 3.0;

/// Tolerances for grid detection, in page units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableSettings {
    /// Parallel edges closer than this are snapped onto one line
    pub snap_tolerance: f32,
    /// Collinear edges with gaps up to this are merged
    pub join_tolerance: f32,
    /// Slack when testing whether two edges cross
    pub intersection_tolerance: f32,
}

impl Default for TableSettings {
    fn default() -> Self {
        Self {
            snap_tolerance: 3.0,
            join_tolerance: 3.0,
            intersection_tolerance: 3.0,
        }
    }
}

/// Rectangle bounded by edges, in PDF coordinates (y grows upwards)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    pub left: f32,
    pub bottom: f32,
    pub right: f32,
    pub top: f32,
}

impl Cell {
    fn corners(&self) -> [(f32, f32); 4] {
        [
            (self.left, self.top),
            (self.right, self.top),
            (self.left, self.bottom),
            (self.right, self.bottom),
        ]
    }

    fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.left && x <= self.right && y >= self.bottom && y <= self.top
    }
}

/// A detected table: rows top to bottom, `None` where the grid has no cell
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub top: f32,
    pub left: f32,
    pub rows: Vec<Vec<Option<String>>>,
}

/// Find all ruled tables on a page, ordered top to bottom then left to right
pub fn find_tables(layout: &PageLayout, settings: &TableSettings) -> Vec<Table> {
    let snapped = snap_edges(layout.edges.clone(), settings.snap_tolerance);
    let edges: Vec<Edge> = join_edges(snapped, settings.join_tolerance)
        .into_iter()
        .filter(|e| e.length() >= MIN_EDGE_LENGTH)
        .collect();

    let grid = EdgeSet::new(edges, settings.intersection_tolerance);
    let points = grid.intersections();
    let cells = grid.cells(&points);

    let mut tables: Vec<Table> = group_cells(&cells, settings.intersection_tolerance)
        .into_iter()
        .map(|group| build_table(&group, &layout.chunks, settings.snap_tolerance))
        .collect();

    tables.sort_by(|a, b| b.top.total_cmp(&a.top).then(a.left.total_cmp(&b.left)));
    tables
}

/// Cluster parallel edges whose positions lie within `tolerance` of their
/// neighbour and move each onto the cluster mean
fn snap_edges(mut edges: Vec<Edge>, tolerance: f32) -> Vec<Edge> {
    for orientation in [Orientation::Horizontal, Orientation::Vertical] {
        let mut indices: Vec<usize> = (0..edges.len())
            .filter(|i| edges[*i].orientation == orientation)
            .collect();
        indices.sort_by(|a, b| edges[*a].position.total_cmp(&edges[*b].position));

        let clusters = cluster_by(&indices, |i| edges[*i].position, tolerance);
        for cluster in clusters {
            let total: f32 = cluster.iter().map(|i| edges[*i].position).sum();
            let mean = total / cluster.len() as f32;
            for i in cluster {
                edges[i].position = mean;
            }
        }
    }
    edges
}

/// Merge collinear edges that overlap or are separated by at most `tolerance`
fn join_edges(mut edges: Vec<Edge>, tolerance: f32) -> Vec<Edge> {
    edges.sort_by(|a, b| {
        (a.orientation as u8)
            .cmp(&(b.orientation as u8))
            .then(a.position.total_cmp(&b.position))
            .then(a.start.total_cmp(&b.start))
    });

    let mut joined: Vec<Edge> = Vec::with_capacity(edges.len());
    for edge in edges {
        match joined.last_mut() {
            Some(last)
                if last.orientation == edge.orientation
                    && last.position == edge.position
                    && edge.start <= last.end + tolerance =>
            {
                last.end = last.end.max(edge.end);
            }
            _ => joined.push(edge),
        }
    }
    joined
}

/// Group sorted items into runs where consecutive values differ by at most `tolerance`
fn cluster_by<T: Copy>(sorted: &[T], value: impl Fn(&T) -> f32, tolerance: f32) -> Vec<Vec<T>> {
    let mut clusters: Vec<Vec<T>> = Vec::new();
    let mut last: Option<f32> = None;
    for item in sorted {
        let v = value(item);
        match (clusters.last_mut(), last) {
            (Some(cluster), Some(prev)) if v - prev <= tolerance => cluster.push(*item),
            _ => clusters.push(vec![*item]),
        }
        last = Some(v);
    }
    clusters
}

struct EdgeSet {
    horizontal: Vec<Edge>,
    vertical: Vec<Edge>,
    tolerance: f32,
}

impl EdgeSet {
    fn new(edges: Vec<Edge>, tolerance: f32) -> Self {
        let (horizontal, vertical) = edges
            .into_iter()
            .partition(|e| e.orientation == Orientation::Horizontal);
        Self {
            horizontal,
            vertical,
            tolerance,
        }
    }

    fn intersections(&self) -> Vec<(f32, f32)> {
        let tol = self.tolerance;
        let mut points = Vec::new();
        for v in &self.vertical {
            for h in &self.horizontal {
                let crosses = h.position >= v.start - tol
                    && h.position <= v.end + tol
                    && v.position >= h.start - tol
                    && v.position <= h.end + tol;
                if crosses && !points.contains(&(v.position, h.position)) {
                    points.push((v.position, h.position));
                }
            }
        }
        points
    }

    /// A horizontal edge at `y` spans `x0..x1`
    fn spans_horizontally(&self, y: f32, x0: f32, x1: f32) -> bool {
        let tol = self.tolerance;
        self.horizontal.iter().any(|h| {
            (h.position - y).abs() <= tol
                && h.start <= x0.min(x1) + tol
                && h.end >= x0.max(x1) - tol
        })
    }

    /// A vertical edge at `x` spans `y0..y1`
    fn spans_vertically(&self, x: f32, y0: f32, y1: f32) -> bool {
        let tol = self.tolerance;
        self.vertical.iter().any(|v| {
            (v.position - x).abs() <= tol
                && v.start <= y0.min(y1) + tol
                && v.end >= y0.max(y1) - tol
        })
    }

    fn has_point(&self, points: &[(f32, f32)], x: f32, y: f32) -> bool {
        points
            .iter()
            .any(|(px, py)| (px - x).abs() <= self.tolerance && (py - y).abs() <= self.tolerance)
    }

    /// For every top-left corner, the nearest bottom-right corner closing a bordered rectangle
    fn cells(&self, points: &[(f32, f32)]) -> Vec<Cell> {
        let tol = self.tolerance;
        let mut cells = Vec::new();

        for &(x, y) in points {
            let mut below: Vec<f32> = points
                .iter()
                .filter(|(px, py)| (px - x).abs() <= tol && *py < y - tol)
                .map(|(_, py)| *py)
                .collect();
            below.sort_by(|a, b| b.total_cmp(a));

            let mut right: Vec<f32> = points
                .iter()
                .filter(|(px, py)| (py - y).abs() <= tol && *px > x + tol)
                .map(|(px, _)| *px)
                .collect();
            right.sort_by(|a, b| a.total_cmp(b));

            'search: for &bottom in &below {
                if !self.spans_vertically(x, bottom, y) {
                    continue;
                }
                for &right_x in &right {
                    if !self.spans_horizontally(y, x, right_x) {
                        continue;
                    }
                    if self.has_point(points, right_x, bottom)
                        && self.spans_vertically(right_x, bottom, y)
                        && self.spans_horizontally(bottom, x, right_x)
                    {
                        cells.push(Cell {
                            left: x,
                            bottom,
                            right: right_x,
                            top: y,
                        });
                        break 'search;
                    }
                }
            }
        }
        cells
    }
}

/// Connected components of cells sharing at least one corner
fn group_cells(cells: &[Cell], tolerance: f32) -> Vec<Vec<Cell>> {
    let mut parent: Vec<usize> = (0..cells.len()).collect();

    fn root(parent: &mut [usize], mut i: usize) -> usize {
        while parent[i] != i {
            parent[i] = parent[parent[i]];
            i = parent[i];
        }
        i
    }

    let close = |a: (f32, f32), b: (f32, f32)| {
        (a.0 - b.0).abs() <= tolerance && (a.1 - b.1).abs() <= tolerance
    };

    for i in 0..cells.len() {
        for j in (i + 1)..cells.len() {
            let shares_corner = cells[i]
                .corners()
                .iter()
                .any(|a| cells[j].corners().iter().any(|b| close(*a, *b)));
            if shares_corner {
                let (ri, rj) = (root(&mut parent, i), root(&mut parent, j));
                if ri != rj {
                    parent[rj] = ri;
                }
            }
        }
    }

    let mut groups: Vec<(usize, Vec<Cell>)> = Vec::new();
    for (i, cell) in cells.iter().enumerate() {
        let r = root(&mut parent, i);
        match groups.iter_mut().find(|(key, _)| *key == r) {
            Some((_, group)) => group.push(*cell),
            None => groups.push((r, vec![*cell])),
        }
    }
    groups.into_iter().map(|(_, group)| group).collect()
}

fn build_table(cells: &[Cell], chunks: &[TextChunk], tolerance: f32) -> Table {
    let mut tops: Vec<f32> = cells.iter().map(|c| c.top).collect();
    tops.sort_by(|a, b| b.total_cmp(a));
    let mut lefts: Vec<f32> = cells.iter().map(|c| c.left).collect();
    lefts.sort_by(|a, b| a.total_cmp(b));

    let row_keys: Vec<f32> = dedup_within(&tops, tolerance);
    let col_keys: Vec<f32> = dedup_within(&lefts, tolerance);

    let mut rows = vec![vec![None; col_keys.len()]; row_keys.len()];
    for cell in cells {
        let r = nearest(&row_keys, cell.top);
        let c = nearest(&col_keys, cell.left);
        rows[r][c] = Some(cell_text(cell, chunks));
    }

    Table {
        top: row_keys.first().copied().unwrap_or_default(),
        left: col_keys.first().copied().unwrap_or_default(),
        rows,
    }
}

fn dedup_within(sorted: &[f32], tolerance: f32) -> Vec<f32> {
    let mut keys: Vec<f32> = Vec::new();
    for v in sorted {
        if keys.last().is_none_or(|last| (last - v).abs() > tolerance) {
            keys.push(*v);
        }
    }
    keys
}

fn nearest(keys: &[f32], value: f32) -> usize {
    keys.iter()
        .enumerate()
        .min_by(|a, b| (a.1 - value).abs().total_cmp(&(b.1 - value).abs()))
        .map(|(i, _)| i)
        .unwrap_or(0)
}

fn cell_text(cell: &Cell, chunks: &[TextChunk]) -> String {
    let inside: Vec<&TextChunk> = chunks
        .iter()
        .filter(|chunk| {
            let (x, y) = chunk.center();
            cell.contains(x, y)
        })
        .collect();
    join_chunks(inside)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Ruled grid with the given column boundaries and row boundaries (top first)
    pub(crate) fn ruled_grid(columns: &[f32], rows: &[f32]) -> Vec<Edge> {
        let (left, right) = (columns[0], columns[columns.len() - 1]);
        let (top, bottom) = (rows[0], rows[rows.len() - 1]);
        let mut edges: Vec<Edge> = rows.iter().map(|y| Edge::horizontal(*y, left, right)).collect();
        edges.extend(columns.iter().map(|x| Edge::vertical(*x, bottom, top)));
        edges
    }

    pub(crate) fn text_at(x: f32, y: f32, text: &str) -> TextChunk {
        TextChunk {
            x,
            y,
            width: text.chars().count() as f32 * 4.0,
            size: 8.0,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_two_by_two_grid_with_text() {
        let layout = PageLayout {
            edges: ruled_grid(&[10.0, 60.0, 140.0], &[700.0, 680.0, 660.0]),
            chunks: vec![
                text_at(12.0, 686.0, "Leito"),
                text_at(62.0, 686.0, "Paciente"),
                text_at(12.0, 666.0, "101A"),
                text_at(62.0, 666.0, "Maria"),
            ],
        };

        let tables = find_tables(&layout, &TableSettings::default());
        assert_eq!(tables.len(), 1);
        assert_eq!(
            tables[0].rows,
            vec![
                vec![Some("Leito".to_string()), Some("Paciente".to_string())],
                vec![Some("101A".to_string()), Some("Maria".to_string())],
            ]
        );
    }

    #[test]
    fn test_slightly_misaligned_and_broken_rules_are_repaired() {
        let mut edges = vec![
            Edge::horizontal(700.0, 10.0, 70.0),
            Edge::horizontal(701.5, 71.0, 140.0),
            Edge::horizontal(680.0, 10.0, 140.0),
            Edge::horizontal(660.0, 10.0, 140.0),
        ];
        edges.push(Edge::vertical(10.0, 660.0, 700.0));
        edges.push(Edge::vertical(61.0, 660.0, 700.0));
        edges.push(Edge::vertical(59.0, 660.0, 700.0));
        edges.push(Edge::vertical(140.0, 660.0, 701.5));

        let layout = PageLayout {
            edges,
            chunks: vec![],
        };
        let tables = find_tables(&layout, &TableSettings::default());

        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].rows.len(), 2);
        assert_eq!(tables[0].rows[0].len(), 2);
        assert_eq!(tables[0].rows[1][1], Some(String::new()));
    }

    #[test]
    fn test_separate_tables_ordered_top_to_bottom() {
        let mut edges = ruled_grid(&[10.0, 100.0], &[300.0, 280.0]);
        edges.extend(ruled_grid(&[10.0, 100.0], &[700.0, 680.0]));
        let layout = PageLayout {
            edges,
            chunks: vec![text_at(12.0, 286.0, "baixo"), text_at(12.0, 686.0, "cima")],
        };

        let tables = find_tables(&layout, &TableSettings::default());
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].rows[0][0].as_deref(), Some("cima"));
        assert_eq!(tables[1].rows[0][0].as_deref(), Some("baixo"));
    }

    #[test]
    fn test_unruled_text_produces_no_table() {
        let layout = PageLayout {
            edges: vec![Edge::horizontal(500.0, 10.0, 300.0)],
            chunks: vec![text_at(12.0, 510.0, "Leito"), text_at(80.0, 510.0, "Paciente")],
        };
        assert!(find_tables(&layout, &TableSettings::default()).is_empty());
    }
}
