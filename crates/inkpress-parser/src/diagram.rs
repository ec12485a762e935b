//! Diagram fences (` ```flow ` / ` ```diagram `) to positioned lanes and cards.
//!
//! A diagram is a JSON object embedded anywhere in the fence body: the span
//! from the first `{` to the last `}` is decoded. Group nodes become vertical
//! lanes laid out left to right; card nodes are stacked inside the lane named
//! by `data.group`, or in one trailing column when they have no lane.
//!
//! Edges are kept even when an endpoint does not exist; only
//! [`DiagramLayout::resolved_edges`] are drawn.

use inkpress_core::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};

/// Fence languages that carry a diagram
pub const DIAGRAM_LANGUAGES: &[&str] = &["flow", "diagram"];

/// Default canvas height when the diagram does not set one
pub const DEFAULT_CANVAS_HEIGHT: f64 = 520.0;

/// Default edge type
pub const DEFAULT_EDGE_TYPE: &str = "smoothstep";

pub fn is_diagram_language(language: &str) -> bool {
    DIAGRAM_LANGUAGES
        .iter()
        .any(|l| l.eq_ignore_ascii_case(language))
}

// ============================================================================
// Input
// ============================================================================

/// Geometry knobs; every field may be overridden from the `layout` object
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutKnobs {
    #[serde(alias = "laneWidth")]
    pub lane_width: f64,
    #[serde(alias = "laneGap")]
    pub lane_gap: f64,
    #[serde(alias = "lanePaddingX")]
    pub lane_padding_x: f64,
    #[serde(alias = "laneTopInset")]
    pub lane_top_inset: f64,
    #[serde(alias = "laneBottomInset")]
    pub lane_bottom_inset: f64,
    #[serde(alias = "nodeHeight")]
    pub node_height: f64,
    #[serde(alias = "nodeGap")]
    pub node_gap: f64,
    #[serde(alias = "minLaneHeight")]
    pub min_lane_height: f64,
    #[serde(alias = "edgeStrokeWidth")]
    pub edge_stroke_width: f64,
}

impl Default for LayoutKnobs {
    fn default() -> Self {
        Self {
            lane_width: 280.0,
            lane_gap: 40.0,
            lane_padding_x: 16.0,
            lane_top_inset: 56.0,
            lane_bottom_inset: 24.0,
            node_height: 72.0,
            node_gap: 16.0,
            min_lane_height: 260.0,
            edge_stroke_width: 1.5,
        }
    }
}

impl LayoutKnobs {
    /// Height of a lane holding `children` cards
    pub fn lane_height(&self, children: usize) -> f64 {
        let content = if children == 0 {
            self.lane_top_inset + self.lane_bottom_inset
        } else {
            let n = children as f64;
            self.lane_top_inset
                + n * self.node_height
                + (n - 1.0) * self.node_gap
                + self.lane_bottom_inset
        };
        content.max(self.min_lane_height)
    }

    /// Vertical offset of the k-th card in a column
    pub fn slot_y(&self, k: usize) -> f64 {
        self.lane_top_inset + k as f64 * (self.node_height + self.node_gap)
    }

    /// Horizontal offset of the i-th column
    pub fn column_x(&self, i: usize) -> f64 {
        i as f64 * (self.lane_width + self.lane_gap)
    }

    pub fn card_width(&self) -> f64 {
        self.lane_width - 2.0 * self.lane_padding_x
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Group,
    #[default]
    #[serde(other)]
    Card,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NodeSpec {
    pub id: String,
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub kind: NodeKind,
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl NodeSpec {
    /// Lane this node asks to be placed in
    pub fn group(&self) -> Option<&str> {
        self.data.get("group").and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EdgeSpec {
    #[serde(default)]
    pub id: Option<String>,
    /// Empty when missing; such an edge never resolves
    #[serde(default, deserialize_with = "null_as_default")]
    pub source: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub target: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub animated: bool,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub style: Map<String, Value>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Decoded diagram before layout
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DiagramSpec {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default)]
    pub layout: LayoutKnobs,
    #[serde(default)]
    pub nodes: Vec<NodeSpec>,
    #[serde(default)]
    pub edges: Vec<EdgeSpec>,
}

// ============================================================================
// Output
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LaidOutNode {
    pub id: String,
    pub kind: NodeKind,
    /// Lane this card sits in; its position is relative to that lane
    pub parent: Option<String>,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub data: Map<String, Value>,
}

impl LaidOutNode {
    pub fn label(&self) -> &str {
        self.data
            .get("label")
            .and_then(Value::as_str)
            .unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LaidOutEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub kind: String,
    pub animated: bool,
    pub label: Option<String>,
    pub style: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagramLayout {
    pub title: Option<String>,
    pub caption: Option<String>,
    pub height: f64,
    /// Lanes first, then each lane's cards, then ungrouped cards
    pub nodes: Vec<LaidOutNode>,
    pub edges: Vec<LaidOutEdge>,
}

impl DiagramLayout {
    pub fn node(&self, id: &str) -> Option<&LaidOutNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Edges whose source and target both exist
    pub fn resolved_edges(&self) -> impl Iterator<Item = &LaidOutEdge> {
        let ids: HashSet<&str> = self.nodes.iter().map(|n| n.id.as_str()).collect();
        self.edges
            .iter()
            .filter(move |e| ids.contains(e.source.as_str()) && ids.contains(e.target.as_str()))
    }

    /// Absolute top-left corner of a node
    pub fn absolute_position(&self, node: &LaidOutNode) -> (f64, f64) {
        match node.parent.as_deref().and_then(|p| self.node(p)) {
            Some(lane) => (lane.x + node.x, lane.y + node.y),
            None => (node.x, node.y),
        }
    }

    /// Total width of all columns
    pub fn width(&self) -> f64 {
        self.nodes
            .iter()
            .map(|n| {
                let (x, _) = self.absolute_position(n);
                x + n.width
            })
            .fold(0.0, f64::max)
    }
}

// ============================================================================
// Interpretation
// ============================================================================

/// The first-`{` to last-`}` span of the trimmed input
pub fn extract_json_span(source: &str) -> Option<&str> {
    let trimmed = source.trim();
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&trimmed[start..=end])
}

/// Decode a diagram fence body without laying it out
pub fn parse_spec(source: &str) -> Result<DiagramSpec> {
    let span = extract_json_span(source)
        .ok_or_else(|| Error::parse_error("No JSON object found in diagram block"))?;
    serde_json::from_str(span).map_err(|e| Error::parse_error(e.to_string()))
}

/// Decode and lay out a diagram fence body.
///
/// ```
/// use inkpress_parser::diagram::interpret;
///
/// let layout = interpret(r#"{"nodes": [{"id": "a"}]}"#).unwrap();
/// assert_eq!(layout.nodes[0].x, 0.0);
/// assert_eq!(layout.height, 520.0);
/// ```
pub fn interpret(source: &str) -> Result<DiagramLayout> {
    let spec = parse_spec(source)?;
    Ok(layout(spec))
}

/// Position the nodes of a decoded diagram
pub fn layout(spec: DiagramSpec) -> DiagramLayout {
    let knobs = spec.layout;

    let lane_ids: HashSet<&str> = spec
        .nodes
        .iter()
        .filter(|n| n.kind == NodeKind::Group)
        .map(|n| n.id.as_str())
        .collect();

    let mut members: HashMap<&str, Vec<&NodeSpec>> = HashMap::new();
    let mut ungrouped: Vec<&NodeSpec> = Vec::new();
    for node in spec.nodes.iter().filter(|n| n.kind != NodeKind::Group) {
        match node.group().filter(|g| lane_ids.contains(g)) {
            Some(lane) => members.entry(lane).or_default().push(node),
            None => ungrouped.push(node),
        }
    }

    let mut lanes = Vec::new();
    let mut cards = Vec::new();
    let lane_specs = spec.nodes.iter().filter(|n| n.kind == NodeKind::Group);

    for (i, lane) in lane_specs.enumerate() {
        let mut children = members.remove(lane.id.as_str()).unwrap_or_default();
        order_by_in_degree(&mut children, &spec.edges);

        lanes.push(LaidOutNode {
            id: lane.id.clone(),
            kind: NodeKind::Group,
            parent: None,
            x: knobs.column_x(i),
            y: 0.0,
            width: knobs.lane_width,
            height: knobs.lane_height(children.len()),
            data: lane.data.clone(),
        });

        for (k, child) in children.into_iter().enumerate() {
            cards.push(LaidOutNode {
                id: child.id.clone(),
                kind: NodeKind::Card,
                parent: Some(lane.id.clone()),
                x: knobs.lane_padding_x,
                y: knobs.slot_y(k),
                width: knobs.card_width(),
                height: knobs.node_height,
                data: child.data.clone(),
            });
        }
    }

    let trailing_x = knobs.column_x(lanes.len());
    for (k, node) in ungrouped.into_iter().enumerate() {
        cards.push(LaidOutNode {
            id: node.id.clone(),
            kind: NodeKind::Card,
            parent: None,
            x: trailing_x,
            y: knobs.slot_y(k),
            width: knobs.card_width(),
            height: knobs.node_height,
            data: node.data.clone(),
        });
    }

    let edges = spec
        .edges
        .into_iter()
        .enumerate()
        .map(|(i, edge)| normalize_edge(i, edge, &knobs))
        .collect();

    lanes.extend(cards);
    DiagramLayout {
        title: spec.title,
        caption: spec.caption,
        height: spec.height.unwrap_or(DEFAULT_CANVAS_HEIGHT),
        nodes: lanes,
        edges,
    }
}

/// Stable sort by number of incoming edges from within the same set
fn order_by_in_degree(children: &mut [&NodeSpec], edges: &[EdgeSpec]) {
    let ids: HashSet<&str> = children.iter().map(|n| n.id.as_str()).collect();
    let mut in_degree: HashMap<&str, usize> = HashMap::new();
    for edge in edges {
        if ids.contains(edge.source.as_str()) && ids.contains(edge.target.as_str()) {
            *in_degree.entry(edge.target.as_str()).or_default() += 1;
        }
    }
    children.sort_by_key(|n| in_degree.get(n.id.as_str()).copied().unwrap_or(0));
}

fn normalize_edge(index: usize, edge: EdgeSpec, knobs: &LayoutKnobs) -> LaidOutEdge {
    let id = edge
        .id
        .unwrap_or_else(|| format!("edge-{}-{}-{}", index, edge.source, edge.target));

    let mut style = edge.style;
    if !style.contains_key("strokeWidth") {
        style.insert("strokeWidth".to_string(), Value::from(knobs.edge_stroke_width));
    }

    LaidOutEdge {
        id,
        source: edge.source,
        target: edge.target,
        kind: edge.kind.unwrap_or_else(|| DEFAULT_EDGE_TYPE.to_string()),
        animated: edge.animated,
        label: edge.label,
        style,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PIPELINE: &str = r#"
        Request flow:
        {
          "title": "Request path",
          "nodes": [
            {"id": "edge", "type": "group", "data": {"label": "Edge"}},
            {"id": "core", "type": "group", "data": {"label": "Core"}},
            {"id": "cdn", "data": {"group": "edge", "label": "CDN"}},
            {"id": "lb", "data": {"group": "edge"}},
            {"id": "api", "data": {"group": "core"}},
            {"id": "db", "data": {"group": "core"}},
            {"id": "log", "data": {"group": "nowhere"}}
          ],
          "edges": [
            {"source": "cdn", "target": "lb"},
            {"id": "e2", "source": "lb", "target": "api", "animated": true},
            {"source": "db", "target": "api", "style": {"strokeWidth": 3}},
            {"source": "api", "target": "ghost"}
          ]
        }
        trailing prose"#;

    #[test]
    fn test_extract_json_span() {
        assert_eq!(extract_json_span("  x {\"a\": {}} y "), Some("{\"a\": {}}"));
        assert_eq!(extract_json_span("no-json-here"), None);
        assert_eq!(extract_json_span("} backwards {"), None);
    }

    #[test]
    fn test_missing_json_reports_error() {
        let err = interpret("no-json-here").unwrap_err();
        assert_eq!(err.message(), "No JSON object found in diagram block");
    }

    #[test]
    fn test_invalid_json_reports_decoder_message() {
        let err = interpret("{ not json }").unwrap_err();
        assert!(matches!(err, Error::ParseError { .. }));
        assert!(!err.message().is_empty());
    }

    #[test]
    fn test_empty_object_defaults() {
        let layout = interpret("{}").unwrap();
        assert!(layout.nodes.is_empty());
        assert!(layout.edges.is_empty());
        assert_eq!(layout.height, DEFAULT_CANVAS_HEIGHT);
        assert!(layout.title.is_none());
    }

    #[test]
    fn test_lanes_and_children() {
        let layout = interpret(PIPELINE).unwrap();
        assert_eq!(layout.title.as_deref(), Some("Request path"));

        let edge_lane = layout.node("edge").unwrap();
        assert_eq!((edge_lane.x, edge_lane.y), (0.0, 0.0));
        assert_eq!(edge_lane.height, 260.0);
        let core_lane = layout.node("core").unwrap();
        assert_eq!(core_lane.x, 320.0);

        let cdn = layout.node("cdn").unwrap();
        assert_eq!(cdn.parent.as_deref(), Some("edge"));
        assert_eq!((cdn.x, cdn.y, cdn.width), (16.0, 56.0, 248.0));
        assert_eq!(cdn.label(), "CDN");
        assert_eq!(layout.node("lb").unwrap().y, 56.0 + 88.0);
    }

    #[test]
    fn test_children_sorted_by_in_degree() {
        let layout = interpret(PIPELINE).unwrap();
        // api has one incoming edge from db inside the core lane; lb -> api crosses lanes
        assert_eq!(layout.node("db").unwrap().y, 56.0);
        assert_eq!(layout.node("api").unwrap().y, 144.0);
    }

    #[test]
    fn test_unresolvable_group_goes_to_trailing_column() {
        let layout = interpret(PIPELINE).unwrap();
        let log = layout.node("log").unwrap();
        assert!(log.parent.is_none());
        assert_eq!((log.x, log.y), (640.0, 56.0));
    }

    #[test]
    fn test_edge_normalization() {
        let layout = interpret(PIPELINE).unwrap();
        assert_eq!(layout.edges[0].id, "edge-0-cdn-lb");
        assert_eq!(layout.edges[0].kind, "smoothstep");
        assert_eq!(layout.edges[0].style["strokeWidth"], json!(1.5));
        assert_eq!(layout.edges[1].id, "e2");
        assert!(layout.edges[1].animated);
        assert_eq!(layout.edges[2].style["strokeWidth"], json!(3));
    }

    #[test]
    fn test_resolved_edges_skip_unknown_nodes() {
        let layout = interpret(PIPELINE).unwrap();
        assert_eq!(layout.edges.len(), 4);
        let resolved: Vec<_> = layout.resolved_edges().map(|e| e.id.as_str()).collect();
        assert_eq!(resolved.len(), 3);
        assert!(!resolved.contains(&"edge-3-api-ghost"));
    }

    #[test]
    fn test_lane_height_formula() {
        let knobs = LayoutKnobs::default();
        assert_eq!(knobs.lane_height(0), 260.0);
        assert_eq!(knobs.lane_height(2), 260.0);
        // 56 + 3*72 + 2*16 + 24 = 328
        assert_eq!(knobs.lane_height(3), 328.0);
    }

    #[test]
    fn test_layout_overrides() {
        let layout = interpret(
            r#"{"height": 300, "layout": {"laneWidth": 100, "lane_gap": 0, "minLaneHeight": 0},
                "nodes": [{"id": "g", "type": "group"}, {"id": "g2", "type": "group"}]}"#,
        )
        .unwrap();
        assert_eq!(layout.height, 300.0);
        assert_eq!(layout.node("g2").unwrap().x, 100.0);
        assert_eq!(layout.node("g").unwrap().height, 80.0);
    }

    #[test]
    fn test_unknown_node_type_is_card() {
        let layout = interpret(r#"{"nodes": [{"id": "x", "type": "custom"}]}"#).unwrap();
        assert_eq!(layout.nodes[0].kind, NodeKind::Card);
    }

    #[test]
    fn test_absolute_position_and_width() {
        let layout = interpret(PIPELINE).unwrap();
        let api = layout.node("api").unwrap();
        assert_eq!(layout.absolute_position(api), (336.0, 144.0));
        assert_eq!(layout.width(), 640.0 + 248.0);
    }

    #[test]
    fn test_is_diagram_language() {
        assert!(is_diagram_language("flow"));
        assert!(is_diagram_language("Diagram"));
        assert!(!is_diagram_language("json"));
    }

    #[test]
    fn test_edge_without_target_is_dropped_not_fatal() {
        let layout =
            interpret(r#"{"nodes": [{"id": "a"}, {"id": "b"}], "edges": [{"source": "a"}, {"source": "a", "target": "b"}]}"#)
                .unwrap();
        assert_eq!(layout.nodes.len(), 2);
        assert_eq!(layout.edges.len(), 2);
        assert_eq!(layout.edges[0].target, "");
        let resolved: Vec<_> = layout.resolved_edges().map(|e| e.target.as_str()).collect();
        assert_eq!(resolved, vec!["b"]);
    }

    #[test]
    fn test_null_node_type_is_card() {
        let layout = interpret(r#"{"nodes": [{"id": "a", "type": null}], "edges": [{"source": null, "target": "a"}]}"#)
            .unwrap();
        assert_eq!(layout.nodes[0].kind, NodeKind::Card);
        assert_eq!(layout.resolved_edges().count(), 0);
    }

    #[test]
    fn test_in_degree_ties_keep_input_order() {
        let layout = interpret(
            r#"{"nodes": [
                {"id": "lane", "type": "group"},
                {"id": "x", "data": {"group": "lane"}},
                {"id": "c", "data": {"group": "lane"}},
                {"id": "a", "data": {"group": "lane"}},
                {"id": "b", "data": {"group": "lane"}}
              ],
              "edges": [{"source": "x", "target": "c"}, {"source": "a", "target": "c"}]}"#,
        )
        .unwrap();
        let order: Vec<_> = layout.nodes[1..].iter().map(|n| n.id.as_str()).collect();
        assert_eq!(order, vec!["x", "a", "b", "c"]);
        assert_eq!(layout.node("c").unwrap().y, 56.0 + 3.0 * 88.0);
    }

    #[test]
    fn test_ungrouped_nodes_are_evenly_spaced() {
        let layout = interpret(r#"{"nodes": [{"id": "p"}, {"id": "q"}, {"id": "r"}]}"#).unwrap();
        let ys: Vec<_> = layout.nodes.iter().map(|n| n.y).collect();
        assert_eq!(ys, vec![56.0, 144.0, 232.0]);
        assert!(layout.nodes.iter().all(|n| n.x == 0.0 && n.parent.is_none()));
    }
}
