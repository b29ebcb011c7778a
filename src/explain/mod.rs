//! Explanation module
//!
//! Summaries and charts of additive-model (EBM-style) global explanations:
//! - Per-bin occupancy counts and human-readable bin labels
//! - Baseline-normalized single-model summaries and label-joined multi-model tables
//! - Band-and-line charts with a pluggable renderer
//! - An adapter binding an explainer to its training table

mod binning;
mod bound;
mod explainer;
mod plot;
mod summary;

pub use binning::{bin_counts, bin_labels, format_number};
pub use bound::BoundExplainer;
pub use explainer::{feature_index, AdditiveExplainer, GlobalExplanation, TermExplanation};
pub use plot::{
    band_traces, clean_text, cycle_colours, plot, with_alpha, Axis, ChartLayout, ChartRenderer, Figure,
    FigureLayout, PlotOptions, PlotlyRenderer, Trace, TraceKind, PALETTE, PRIMARY_BLUE,
};
pub use summary::{
    default_model_names, resolve_model_names, summarize, summarize_set, summarize_single,
    ExplanationSummary, ModelInput, MultiModelRow, MultiModelSummary, Summary, SummaryOptions,
    SummaryRow,
};
