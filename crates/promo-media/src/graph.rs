//! Typed filter-graph representation.
//!
//! Graphs are assembled as an ordered list of [`GraphNode`] values whose pads
//! reference either a registered input (by role, resolved to an index by the
//! [`InputRegistry`]) or a [`Label`] produced by an earlier node. The ffmpeg
//! `-filter_complex` text is only produced by [`FilterGraph::to_filter_complex`].

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::PathBuf;

use promo_models::MixDuration;

use crate::command::FfmpegInput;
use crate::error::{MediaError, MediaResult};

// =============================================================================
// Inputs
// =============================================================================

/// Logical role of an ffmpeg input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputRole {
    /// Media slot `n` of the product
    Media(usize),
    Outro,
    Logo,
    Narration,
    Background,
}

/// An input declaration tagged with its role.
#[derive(Debug, Clone, PartialEq)]
pub struct InputDecl {
    pub role: InputRole,
    pub input: FfmpegInput,
}

/// Ordered inputs plus the role → index mapping.
#[derive(Debug, Clone, Default)]
pub struct InputRegistry {
    decls: Vec<InputDecl>,
    index: HashMap<InputRole, usize>,
}

impl InputRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an input and return its ffmpeg index.
    pub fn register(&mut self, role: InputRole, input: FfmpegInput) -> MediaResult<usize> {
        if self.index.contains_key(&role) {
            return Err(MediaError::internal(format!("input role {:?} registered twice", role)));
        }
        let idx = self.decls.len();
        self.decls.push(InputDecl { role, input });
        self.index.insert(role, idx);
        Ok(idx)
    }

    pub fn index_of(&self, role: InputRole) -> Option<usize> {
        self.index.get(&role).copied()
    }

    pub fn decls(&self) -> &[InputDecl] {
        &self.decls
    }

    pub fn roles(&self) -> Vec<InputRole> {
        self.decls.iter().map(|d| d.role).collect()
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }
}

// =============================================================================
// Pads and labels
// =============================================================================

/// Name of an intermediate stream.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Label(String);

impl Label {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `[name]`, the form used by `-map`.
    pub fn bracketed(&self) -> String {
        format!("[{}]", self.0)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hands out labels that are unique within one graph.
#[derive(Debug, Clone, Default)]
pub struct LabelAllocator {
    used: HashSet<String>,
}

impl LabelAllocator {
    /// Allocate `base`, or `base_2`, `base_3`, ... when taken.
    pub fn allocate(&mut self, base: &str) -> Label {
        let mut name = base.to_string();
        let mut n = 2;
        while self.used.contains(&name) {
            name = format!("{}_{}", base, n);
            n += 1;
        }
        self.used.insert(name.clone());
        Label(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamType {
    Video,
    Audio,
}

/// Node input: a stream of a declared input, or an earlier node's output.
#[derive(Debug, Clone, PartialEq)]
pub enum Pad {
    Input { index: usize, stream: StreamType },
    Label(Label),
}

impl Pad {
    pub fn video(index: usize) -> Self {
        Pad::Input {
            index,
            stream: StreamType::Video,
        }
    }

    pub fn audio(index: usize) -> Self {
        Pad::Input {
            index,
            stream: StreamType::Audio,
        }
    }
}

impl From<&Label> for Pad {
    fn from(label: &Label) -> Self {
        Pad::Label(label.clone())
    }
}

impl fmt::Display for Pad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pad::Input { index, stream } => {
                let s = match stream {
                    StreamType::Video => "v",
                    StreamType::Audio => "a",
                };
                write!(f, "[{}:{}]", index, s)
            }
            Pad::Label(label) => write!(f, "[{}]", label),
        }
    }
}

// =============================================================================
// Filters
// =============================================================================

/// Font selection for `drawtext`.
#[derive(Debug, Clone, PartialEq)]
pub enum FontSpec {
    /// Explicit font file
    File(PathBuf),
    /// Fontconfig family name
    Family(String),
}

/// `drawtext` parameters. `text` must already be escaped.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawText {
    pub font: FontSpec,
    pub text: String,
    pub x: String,
    pub y: i32,
    pub font_size: u32,
    pub font_color: String,
    pub border_width: u32,
    pub border_color: String,
}

/// `setpts` expressions used by the composer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PtsExpr {
    /// `PTS-STARTPTS`
    ResetToZero,
    /// `PTS/speed`
    Speed(f64),
}

/// A single filter with its parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// `-1` keeps the aspect ratio for that dimension
    Scale { width: i32, height: i32 },
    SetSar,
    Fps(String),
    Trim { start: f64, end: f64 },
    SetPts(PtsExpr),
    Concat { segments: usize, video: usize, audio: usize },
    DrawText(DrawText),
    Overlay { x: String, y: String },
    Volume(f64),
    Amix { inputs: usize, duration: MixDuration },
}

/// Escape a path for use inside a quoted filter option.
pub fn escape_filter_path(path: &str) -> String {
    path.replace('\\', "\\\\").replace('\'', "\\'").replace(':', "\\:")
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Scale { width, height } => write!(f, "scale={}:{}", width, height),
            Filter::SetSar => write!(f, "setsar=1"),
            Filter::Fps(rate) => write!(f, "fps={}", rate),
            Filter::Trim { start, end } => write!(f, "trim=start={:.6}:end={:.6}", start, end),
            Filter::SetPts(PtsExpr::ResetToZero) => write!(f, "setpts=PTS-STARTPTS"),
            Filter::SetPts(PtsExpr::Speed(speed)) => write!(f, "setpts=PTS/{:.6}", speed),
            Filter::Concat {
                segments,
                video,
                audio,
            } => write!(f, "concat=n={}:v={}:a={}", segments, video, audio),
            Filter::DrawText(dt) => {
                match &dt.font {
                    FontSpec::File(path) => write!(
                        f,
                        "drawtext=fontfile='{}'",
                        escape_filter_path(&path.to_string_lossy())
                    )?,
                    FontSpec::Family(family) => write!(f, "drawtext=font='{}'", family)?,
                }
                write!(
                    f,
                    ":text='{}':x={}:y={}:fontsize={}:fontcolor={}:borderw={}:bordercolor={}",
                    dt.text, dt.x, dt.y, dt.font_size, dt.font_color, dt.border_width, dt.border_color
                )
            }
            Filter::Overlay { x, y } => write!(f, "overlay={}:{}", x, y),
            Filter::Volume(volume) => write!(f, "volume={}", volume),
            Filter::Amix { inputs, duration } => {
                write!(f, "amix=inputs={}:duration={}", inputs, duration.as_str())
            }
        }
    }
}

// =============================================================================
// Graph
// =============================================================================

/// One `-filter_complex` statement: `[in]...filter,filter[out]`.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphNode {
    pub inputs: Vec<Pad>,
    pub filters: Vec<Filter>,
    pub output: Label,
}

impl fmt::Display for GraphNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for pad in &self.inputs {
            write!(f, "{}", pad)?;
        }
        let chain: Vec<String> = self.filters.iter().map(|flt| flt.to_string()).collect();
        write!(f, "{}[{}]", chain.join(","), self.output)
    }
}

/// Ordered list of graph nodes with label bookkeeping.
#[derive(Debug, Clone, Default)]
pub struct FilterGraph {
    nodes: Vec<GraphNode>,
    labels: LabelAllocator,
}

impl FilterGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node and return its (unique) output label.
    pub fn add(&mut self, inputs: Vec<Pad>, filters: Vec<Filter>, output: &str) -> Label {
        let label = self.labels.allocate(output);
        self.nodes.push(GraphNode {
            inputs,
            filters,
            output: label.clone(),
        });
        label
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Serialize to `-filter_complex` syntax.
    pub fn to_filter_complex(&self) -> String {
        self.nodes
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join(";")
    }

    /// Check wiring: input indices exist, every label is produced before it
    /// is consumed, consumed exactly once, and only `terminals` stay open.
    pub fn check(&self, input_count: usize, terminals: &[&Label]) -> MediaResult<()> {
        let mut open: HashSet<&Label> = HashSet::new();

        for node in &self.nodes {
            for pad in &node.inputs {
                match pad {
                    Pad::Input { index, .. } if *index >= input_count => {
                        return Err(MediaError::internal(format!(
                            "node [{}] reads input {} but only {} inputs are declared",
                            node.output, index, input_count
                        )));
                    }
                    Pad::Input { .. } => {}
                    Pad::Label(label) => {
                        if !open.remove(label) {
                            return Err(MediaError::internal(format!(
                                "node [{}] consumes [{}] which is not available",
                                node.output, label
                            )));
                        }
                    }
                }
            }
            open.insert(&node.output);
        }

        for terminal in terminals {
            if !open.remove(terminal) {
                return Err(MediaError::internal(format!(
                    "terminal [{}] is not an open output",
                    terminal
                )));
            }
        }

        if let Some(dangling) = open.iter().next() {
            return Err(MediaError::internal(format!("output [{}] is never used", dangling)));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_allocator_unique() {
        let mut alloc = LabelAllocator::default();
        assert_eq!(alloc.allocate("v0").as_str(), "v0");
        assert_eq!(alloc.allocate("v0").as_str(), "v0_2");
        assert_eq!(alloc.allocate("v0").as_str(), "v0_3");
        assert_eq!(alloc.allocate("vbody").as_str(), "vbody");
    }

    #[test]
    fn test_registry_indices() {
        let mut reg = InputRegistry::new();
        assert_eq!(reg.register(InputRole::Media(0), FfmpegInput::new("a.mp4")).unwrap(), 0);
        assert_eq!(reg.register(InputRole::Logo, FfmpegInput::new("logo.png")).unwrap(), 1);
        assert_eq!(reg.index_of(InputRole::Logo), Some(1));
        assert_eq!(reg.index_of(InputRole::Outro), None);
        assert!(reg.register(InputRole::Logo, FfmpegInput::new("other.png")).is_err());
    }

    #[test]
    fn test_serialize_chain() {
        let mut graph = FilterGraph::new();
        let v0 = graph.add(
            vec![Pad::video(0)],
            vec![
                Filter::Scale { width: 1920, height: 1080 },
                Filter::Trim { start: 5.5, end: 14.5 },
                Filter::SetPts(PtsExpr::ResetToZero),
                Filter::SetPts(PtsExpr::Speed(1.8)),
            ],
            "v0",
        );
        let body = graph.add(
            vec![Pad::from(&v0)],
            vec![Filter::Concat { segments: 1, video: 1, audio: 0 }],
            "vbody",
        );

        assert_eq!(
            graph.to_filter_complex(),
            "[0:v]scale=1920:1080,trim=start=5.500000:end=14.500000,setpts=PTS-STARTPTS,setpts=PTS/1.800000[v0];\
             [v0]concat=n=1:v=1:a=0[vbody]"
        );
        assert!(graph.check(1, &[&body]).is_ok());
    }

    #[test]
    fn test_check_rejects_bad_wiring() {
        let mut graph = FilterGraph::new();
        let a = graph.add(vec![Pad::audio(3)], vec![Filter::Volume(0.5)], "a");
        assert!(graph.check(2, &[&a]).is_err());
        assert!(graph.check(4, &[&a]).is_ok());

        // Dangling output
        let mut graph = FilterGraph::new();
        let v = graph.add(vec![Pad::video(0)], vec![Filter::SetSar], "v");
        graph.add(vec![Pad::video(0)], vec![Filter::SetSar], "w");
        assert!(graph.check(1, &[&v]).is_err());

        // Consumed twice
        let mut graph = FilterGraph::new();
        let v = graph.add(vec![Pad::video(0)], vec![Filter::SetSar], "v");
        let x = graph.add(vec![Pad::from(&v), Pad::from(&v)], vec![Filter::Concat { segments: 2, video: 1, audio: 0 }], "x");
        assert!(graph.check(1, &[&x]).is_err());
    }

    #[test]
    fn test_drawtext_and_overlay_syntax() {
        let draw = Filter::DrawText(DrawText {
            font: FontSpec::File(PathBuf::from("C:/Windows/Fonts/arialbd.ttf")),
            text: "Hello".to_string(),
            x: "(w-text_w)/2".to_string(),
            y: 100,
            font_size: 85,
            font_color: "#000000".to_string(),
            border_width: 2,
            border_color: "#FFFFFF".to_string(),
        });
        assert_eq!(
            draw.to_string(),
            "drawtext=fontfile='C\\:/Windows/Fonts/arialbd.ttf':text='Hello':x=(w-text_w)/2:y=100:fontsize=85:fontcolor=#000000:borderw=2:bordercolor=#FFFFFF"
        );

        let overlay = Filter::Overlay { x: "W-w-50".into(), y: "50".into() };
        assert_eq!(overlay.to_string(), "overlay=W-w-50:50");
        assert_eq!(
            Filter::Amix { inputs: 2, duration: MixDuration::Shortest }.to_string(),
            "amix=inputs=2:duration=shortest"
        );
        assert_eq!(Filter::Volume(0.1).to_string(), "volume=0.1");
    }
}
