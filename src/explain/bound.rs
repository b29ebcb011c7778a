//! An explainer bound to the table it was trained on

use crate::error::Result;
use super::explainer::{feature_index, AdditiveExplainer};
use super::plot::{plot, ChartRenderer, PlotOptions};
use super::summary::{summarize_single, ExplanationSummary, ModelInput, SummaryOptions};
use polars::prelude::DataFrame;

/// Explainer and training table held together so callers pass only the column
#[derive(Debug, Clone, Copy)]
pub struct BoundExplainer<'a, E: ?Sized> {
    pub explainer: &'a E,
    pub table: &'a DataFrame,
}

impl<'a, E: AdditiveExplainer + ?Sized> BoundExplainer<'a, E> {
    pub fn new(explainer: &'a E, table: &'a DataFrame) -> Self {
        Self { explainer, table }
    }

    pub fn feature_index(&self, column: &str) -> Result<usize> {
        feature_index(self.explainer, column)
    }

    pub fn summarize(&self, column: &str, options: &SummaryOptions) -> Result<ExplanationSummary> {
        summarize_single(self.explainer, self.table, column, options)
    }

    pub fn plot<R: ChartRenderer>(
        &self,
        column: &str,
        options: &PlotOptions,
        renderer: &R,
    ) -> Result<R::Figure> {
        plot(&ModelInput::single(self.explainer, self.table), column, options, renderer)
    }
}
