//! Event types and sinks for observing composition runs.
//!
//! This module defines [`ComposeEvent`] and a set of sinks and adapters to emit, collect, or
//! forward events while executing [`crate::compose::Composer::compose_with_events`].
//! [`ComposeEvent::ChunkCompleted`] doubles as the progress checkpoint between bounded
//! chunks of the world-spanning stages.
use crate::cluster::ClusterAnchor;
use crate::compose::{ComposeConfig, LayerStats, WorldStats};
use crate::placement::chunk::ChunkId;
use crate::placement::PlacementRecord;
use crate::seed::WorldSeed;

/// Describes events emitted during composition.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub enum ComposeEvent {
    /// Emitted when a run starts.
    RunStarted {
        /// Seed of the run.
        seed: WorldSeed,
        /// Configuration used.
        config: ComposeConfig,
    },

    /// Emitted after region partitioning.
    RegionsPartitioned {
        /// Number of regions produced.
        count: usize,
        /// Number of regions requested.
        requested: usize,
    },

    /// Emitted when a stage starts.
    StageStarted {
        /// Index of the stage in the pipeline.
        index: usize,
        /// Name of the layer the stage builds.
        layer: String,
    },

    /// Emitted when a cluster pass finished planning.
    ClustersPlanned {
        /// Layer the anchors will be filled into.
        layer: String,
        /// Accepted anchors.
        anchors: Vec<ClusterAnchor>,
        /// Number of anchors requested.
        requested: usize,
    },

    /// Checkpoint after a bounded chunk of a world-spanning stage.
    ChunkCompleted {
        /// Layer being built.
        layer: String,
        /// Chunk just finished.
        chunk: ChunkId,
        /// Placements made in this chunk.
        placements: usize,
        /// Chunks finished so far in this stage.
        completed: usize,
        /// Total chunks of this stage.
        total: usize,
    },

    /// Emitted for every accepted placement.
    PlacementMade {
        /// Layer that produced the placement.
        layer: String,
        /// The placement record.
        record: PlacementRecord,
    },

    /// Emitted when a stage finishes.
    StageFinished {
        /// Index of the stage in the pipeline.
        index: usize,
        /// Name of the finished layer.
        layer: String,
        /// Attempt statistics for the layer.
        stats: LayerStats,
    },

    /// Non-fatal warning generated during composition.
    Warning {
        /// Context string (e.g. layer name, cluster kind).
        context: String,
        /// Human-readable message.
        message: String,
    },

    /// Emitted when the run finishes.
    RunFinished {
        /// Aggregated statistics.
        stats: WorldStats,
    },
}

impl ComposeEvent {
    pub fn kind(&self) -> ComposeEventKind {
        match self {
            ComposeEvent::RunStarted { .. } => ComposeEventKind::RunStarted,
            ComposeEvent::RegionsPartitioned { .. } => ComposeEventKind::RegionsPartitioned,
            ComposeEvent::StageStarted { .. } => ComposeEventKind::StageStarted,
            ComposeEvent::ClustersPlanned { .. } => ComposeEventKind::ClustersPlanned,
            ComposeEvent::ChunkCompleted { .. } => ComposeEventKind::ChunkCompleted,
            ComposeEvent::PlacementMade { .. } => ComposeEventKind::PlacementMade,
            ComposeEvent::StageFinished { .. } => ComposeEventKind::StageFinished,
            ComposeEvent::Warning { .. } => ComposeEventKind::Warning,
            ComposeEvent::RunFinished { .. } => ComposeEventKind::RunFinished,
        }
    }
}

/// Discriminant of [`ComposeEvent`], used to filter before building an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComposeEventKind {
    RunStarted,
    RegionsPartitioned,
    StageStarted,
    ClustersPlanned,
    ChunkCompleted,
    PlacementMade,
    StageFinished,
    Warning,
    RunFinished,
}

/// A generic event sink that accepts [`ComposeEvent`]s.
pub trait EventSink {
    fn send(&mut self, event: ComposeEvent);

    /// Whether events of `kind` should be built and sent at all.
    fn wants(&self, _kind: ComposeEventKind) -> bool {
        true
    }
}

/// A no-op event sink.
impl EventSink for () {
    #[inline]
    fn send(&mut self, _event: ComposeEvent) {}

    #[inline]
    fn wants(&self, _kind: ComposeEventKind) -> bool {
        false
    }
}

/// Sends a warning built lazily, only when the sink wants warnings.
pub(crate) fn warn_to(sink: &mut dyn EventSink, context: impl FnOnce() -> String, message: &str) {
    if sink.wants(ComposeEventKind::Warning) {
        sink.send(ComposeEvent::Warning {
            context: context(),
            message: message.to_owned(),
        });
    }
}

/// An event sink that forwards to a user-provided closure.
pub struct FnSink<F>
where
    F: FnMut(ComposeEvent),
{
    f: F,
}

impl<F> FnSink<F>
where
    F: FnMut(ComposeEvent),
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> EventSink for FnSink<F>
where
    F: FnMut(ComposeEvent),
{
    #[inline]
    fn send(&mut self, event: ComposeEvent) {
        (self.f)(event);
    }
}

/// An event sink that collects events in a `Vec`, optionally filtered by kind.
#[derive(Default)]
pub struct VecSink {
    events: Vec<ComposeEvent>,
    only: Option<Vec<ComposeEventKind>>,
}

impl VecSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collects only events of the given kinds.
    pub fn only(kinds: impl IntoIterator<Item = ComposeEventKind>) -> Self {
        Self {
            events: Vec::new(),
            only: Some(kinds.into_iter().collect()),
        }
    }

    pub fn into_inner(self) -> Vec<ComposeEvent> {
        self.events
    }

    pub fn as_slice(&self) -> &[ComposeEvent] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl EventSink for VecSink {
    #[inline]
    fn send(&mut self, event: ComposeEvent) {
        if self.wants(event.kind()) {
            self.events.push(event);
        }
    }

    fn wants(&self, kind: ComposeEventKind) -> bool {
        self.only.as_ref().is_none_or(|kinds| kinds.contains(&kind))
    }
}

/// Fan-out sink that forwards each event to all contained sinks.
pub struct MultiSink<S: EventSink> {
    pub(crate) sinks: Vec<S>,
}

impl<S: EventSink> MultiSink<S> {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn with_sinks(sinks: Vec<S>) -> Self {
        Self { sinks }
    }

    pub fn push(&mut self, sink: S) {
        self.sinks.push(sink);
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }
}

impl<S: EventSink> Default for MultiSink<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: EventSink> EventSink for MultiSink<S> {
    fn send(&mut self, event: ComposeEvent) {
        let kind = event.kind();
        let targets: Vec<usize> = (0..self.sinks.len())
            .filter(|&i| self.sinks[i].wants(kind))
            .collect();
        let Some((&last, rest)) = targets.split_last() else {
            return;
        };
        for &i in rest {
            self.sinks[i].send(event.clone());
        }
        self.sinks[last].send(event);
    }

    fn wants(&self, kind: ComposeEventKind) -> bool {
        self.sinks.iter().any(|s| s.wants(kind))
    }
}
