/*
 * Manifold Projection - incremental type projections for an IDE
 *
 * Feature-First Hexagonal Architecture:
 * - shared/      : Common models (Fqn, TypeRef, Declaration, Diagnostic, Span)
 * - features/    : Vertical slices
 *     source_producer   : producer port + in-memory and directory adapters
 *     parsing           : producer text -> Declaration (tree-sitter-java)
 *     projection_cache  : per-module FQN cache, module graph, reentrancy scope
 *     invalidation      : listener registry, file events, notify watcher
 *     augment           : extensions, properties, delegation, telescoping
 * - session.rs   : explicit per-project context tying the slices together
 * - config/      : YAML configuration with presets
 */

#![allow(clippy::too_many_arguments)] // Synthesis helpers thread many borrowed contexts
#![allow(clippy::type_complexity)] // Keyed maps of tuples in the memo
#![allow(clippy::new_without_default)] // Default impl not always meaningful

pub mod config;
pub mod errors;
pub mod features;
pub mod session;
pub mod shared;

pub use config::{ConfigError, ProjectionConfig, SynthesisPreset};
pub use errors::{ProjectionError, Result};
pub use features::augment::{
    Augmentation, FieldAdjustment, GenerationKind, HolderType, MemberBody, MemberKind,
    PropertyAccess, SyntheticMember,
};
pub use features::invalidation::{
    FileChangeEvent, FileEventSink, InvalidationListener, ProjectionWatcher, RefreshKind,
    RefreshRequest, Subscription,
};
pub use features::projection_cache::{ModuleId, Projection, Resolution};
pub use features::source_producer::{
    DirectorySourceProducer, InMemorySourceProducer, ProduceError, ProducerKind, SourceProducer,
    TypeLookup,
};
pub use session::ProjectionSession;
pub use shared::models::{
    Annotation, AnnotationValue, DeclKind, Declaration, Diagnostic, DiagnosticCode, Field, Fqn,
    Method, Modifiers, Param, Severity, Span, TypeRef, Visibility,
};
