//! # weblift
//!
//! Best-effort analysis of a conventional web application source tree
//! into a reviewable, confidence-scored model, and DSL emission from
//! that model after human review.
//!
//! ## Pipeline invariants
//!
//! 1. **Facts are file-local and immutable**: extraction runs one pass
//!    per file with no shared state; later stages only read facts.
//! 2. **Translation never loses information**: every input statement
//!    surfaces in the IR, either classified or preserved verbatim as
//!    `raw`; intentional elisions are tallied, never silent.
//! 3. **Partial failure is the normal mode**: a file that fails to parse
//!    becomes a warning, an unmatched call becomes an orphan, an
//!    unrecognized handler becomes an empty operation. Nothing aborts
//!    the run except a missing project root.
//! 4. **Ids are run-scoped**: the aggregator hands out monotonically
//!    increasing ids from an explicit, resettable counter; review edits
//!    reference items by id and never mutate the underlying facts.
//! 5. **Confidence is advisory**: scores rank and display, they never
//!    gate generation.

mod aggregate;
mod component;
mod correlate;
mod discovery;
mod emit;
mod entity;
mod error;
mod facts;
mod ir;
mod jsx;
mod route;
mod scan;
mod translate;
mod view;

#[cfg(test)]
mod pipeline_tests;

pub use aggregate::{
    aggregate, apply_overlay, Analysis, DetectedItem, IdCounter, ItemType, ReviewDecision,
    ReviewOverlay,
};
pub use component::{analyze_source, classify_kind};
pub use correlate::{correlate, match_path, normalize_call_path, score_call};
pub use discovery::{analyze_project, analyze_project_with, extract_facts, ProjectFacts};
pub use emit::{emit_action, emit_backend, emit_entity, emit_view, render_statement};
pub use entity::{parse_schema, resolve_entities, EntityResolution, SCHEMA_PATH};
pub use error::AnalyzeError;
pub use facts::{
    CallSite, ComponentFact, ComponentKind, DataOp, EffectFact, HandlerFact, HttpMethod,
    JsxElement, PathSegment, PropDecl, RouteFact, StateVar,
};
pub use ir::{
    Action, Cardinality, CorrelationMatch, CorrelationReport, Entity, EntityField, FieldType,
    Operation, Provenance, Relation, SkipTally, StateBinding, Statement, Translation, View, Widget,
};
pub use route::{analyze_route, is_route_file};
pub use translate::{translate_backend, translate_frontend};
pub use view::map_component;
