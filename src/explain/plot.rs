//! Band-and-line charts of explanation summaries

use crate::error::{InsightError, Result};
use super::explainer::AdditiveExplainer;
use super::summary::{resolve_model_names, summarize_single, ModelInput, SummaryOptions};
use serde::{Deserialize, Serialize};

/// Colour of a single-model chart
pub const PRIMARY_BLUE: &str = "#1f77b4";

/// Colours assigned to models in order
pub const PALETTE: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd",
    "#8c564b", "#e377c2", "#7f7f7f", "#bcbd22", "#17becf",
];

/// Endless iterator over [`PALETTE`]
pub fn cycle_colours() -> impl Iterator<Item = &'static str> {
    PALETTE.iter().copied().cycle()
}

/// `#rrggbb` to `rgba(r, g, b, alpha)`; other strings pass through
pub fn with_alpha(colour: &str, alpha: f64) -> String {
    let hex = match colour.strip_prefix('#') {
        Some(hex) if hex.len() == 6 && hex.is_ascii() => hex,
        _ => return colour.to_string(),
    };
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16);
    match (channel(0), channel(2), channel(4)) {
        (Ok(r), Ok(g), Ok(b)) => format!("rgba({}, {}, {}, {})", r, g, b, alpha),
        _ => colour.to_string(),
    }
}

/// `"annual_income"` → `"Annual Income"`
pub fn clean_text(text: &str) -> String {
    text.split('_')
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceKind {
    Scatter,
    Bar,
}

/// One plotly-style trace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    #[serde(rename = "type")]
    pub kind: TraceKind,
    pub name: String,
    pub x: Vec<String>,
    pub y: Vec<f64>,
    pub mode: Option<String>,
    pub line_color: Option<String>,
    pub fill: Option<String>,
    pub fillcolor: Option<String>,
    pub showlegend: bool,
    /// Bin occupancy shown on hover
    pub customdata: Vec<usize>,
    pub hovertemplate: Option<String>,
    /// Axis the trace is drawn against, `"y"` or `"y2"`
    pub yaxis: String,
}

impl Trace {
    fn line(name: &str, x: Vec<String>, y: Vec<f64>, colour: &str, sizes: &[usize]) -> Self {
        Self {
            kind: TraceKind::Scatter,
            name: name.to_string(),
            x,
            y,
            mode: Some("lines".to_string()),
            line_color: Some(colour.to_string()),
            fill: None,
            fillcolor: None,
            showlegend: false,
            customdata: sizes.to_vec(),
            hovertemplate: None,
            yaxis: "y".to_string(),
        }
    }
}

/// Upper bound, lower bound filled up to it, then the effect line
pub fn band_traces(
    name: &str,
    x: &[String],
    effect: &[f64],
    lower: &[f64],
    upper: &[f64],
    sizes: &[usize],
    colour: &str,
) -> Vec<Trace> {
    let translucent = with_alpha(colour, 0.2);

    let mut upper_trace = Trace::line(name, x.to_vec(), upper.to_vec(), &translucent, sizes);
    upper_trace.hovertemplate = Some("Upper: %{y:.3f}<extra></extra>".to_string());

    let mut lower_trace = Trace::line(name, x.to_vec(), lower.to_vec(), &translucent, sizes);
    lower_trace.fill = Some("tonexty".to_string());
    lower_trace.fillcolor = Some(translucent);
    lower_trace.hovertemplate = Some("Lower: %{y:.3f}<extra></extra>".to_string());

    let mut effect_trace = Trace::line(name, x.to_vec(), effect.to_vec(), colour, sizes);
    effect_trace.showlegend = true;
    effect_trace.hovertemplate =
        Some("%{x}<br>Effect: %{y:.3f}<br>Size: %{customdata}<extra></extra>".to_string());

    vec![upper_trace, lower_trace, effect_trace]
}

/// Axis titles and optional `(width, height)`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartLayout {
    pub x_axis_title: String,
    pub y_axis_title: Option<String>,
    pub plot_size: Option<(u32, u32)>,
}

/// Turns traces and the shared x axis into a figure
pub trait ChartRenderer {
    type Figure;

    fn compose(
        &self,
        traces: Vec<Trace>,
        x: &[String],
        sizes: &[usize],
        layout: &ChartLayout,
    ) -> Result<Self::Figure>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    pub title: Option<String>,
    pub overlaying: Option<String>,
    pub side: Option<String>,
    pub showgrid: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FigureLayout {
    pub xaxis: Axis,
    pub yaxis: Axis,
    pub yaxis2: Axis,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub hovermode: String,
}

/// Plotly-style figure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Figure {
    pub data: Vec<Trace>,
    pub layout: FigureLayout,
}

impl Figure {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Traces drawn against the effect axis
    pub fn effect_traces(&self) -> impl Iterator<Item = &Trace> {
        self.data.iter().filter(|t| t.yaxis == "y")
    }
}

/// Renders to a [`Figure`] with an occupancy histogram on a secondary axis
#[derive(Debug, Clone, Default)]
pub struct PlotlyRenderer;

impl ChartRenderer for PlotlyRenderer {
    type Figure = Figure;

    fn compose(
        &self,
        traces: Vec<Trace>,
        x: &[String],
        sizes: &[usize],
        layout: &ChartLayout,
    ) -> Result<Figure> {
        if x.len() != sizes.len() {
            return Err(InsightError::ShapeError {
                expected: format!("{} occupancy counts", x.len()),
                actual: format!("{} occupancy counts", sizes.len()),
            });
        }

        let mut data = Vec::with_capacity(traces.len() + 1);
        data.push(Trace {
            kind: TraceKind::Bar,
            name: "Size".to_string(),
            x: x.to_vec(),
            y: sizes.iter().map(|&s| s as f64).collect(),
            mode: None,
            line_color: None,
            fill: None,
            fillcolor: Some("rgba(128, 128, 128, 0.2)".to_string()),
            showlegend: false,
            customdata: sizes.to_vec(),
            hovertemplate: Some("Size: %{y}<extra></extra>".to_string()),
            yaxis: "y2".to_string(),
        });
        data.extend(traces);

        let (width, height) = match layout.plot_size {
            Some((w, h)) => (Some(w), Some(h)),
            None => (None, None),
        };

        Ok(Figure {
            data,
            layout: FigureLayout {
                xaxis: Axis {
                    title: Some(layout.x_axis_title.clone()),
                    overlaying: None,
                    side: None,
                    showgrid: false,
                },
                yaxis: Axis {
                    title: layout.y_axis_title.clone(),
                    overlaying: Some("y2".to_string()),
                    side: Some("left".to_string()),
                    showgrid: true,
                },
                yaxis2: Axis {
                    title: Some("Size".to_string()),
                    overlaying: None,
                    side: Some("right".to_string()),
                    showgrid: false,
                },
                width,
                height,
                hovermode: "x unified".to_string(),
            },
        })
    }
}

/// Plot options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlotOptions {
    /// X axis title and single-model trace name; defaults to the cleaned column name
    pub feature_label: Option<String>,
    /// Y axis title
    pub target_label: Option<String>,
    /// Trace names for a model set; defaults to `Model i`
    pub model_names: Option<Vec<String>>,
    pub plot_size: Option<(u32, u32)>,
    pub summary: SummaryOptions,
}

impl PlotOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_feature_label(mut self, label: impl Into<String>) -> Self {
        self.feature_label = Some(label.into());
        self
    }

    pub fn with_target_label(mut self, label: impl Into<String>) -> Self {
        self.target_label = Some(label.into());
        self
    }

    pub fn with_model_names(mut self, names: Vec<String>) -> Self {
        self.model_names = Some(names);
        self
    }

    pub fn with_plot_size(mut self, width: u32, height: u32) -> Self {
        self.plot_size = Some((width, height));
        self
    }

    pub fn with_summary(mut self, summary: SummaryOptions) -> Self {
        self.summary = summary;
        self
    }
}

/// Chart the explanation of `column` for one explainer or a set of them.
///
/// The x labels and occupancy of the first model define the shared axis.
pub fn plot<E, R>(
    input: &ModelInput<'_, E>,
    column: &str,
    options: &PlotOptions,
    renderer: &R,
) -> Result<R::Figure>
where
    E: AdditiveExplainer + ?Sized,
    R: ChartRenderer,
{
    let feature_label = options
        .feature_label
        .clone()
        .unwrap_or_else(|| clean_text(column));

    let models: Vec<(&E, &polars::prelude::DataFrame, String, &str)> = match input {
        ModelInput::Single { explainer, table } => {
            vec![(*explainer, *table, feature_label.clone(), PRIMARY_BLUE)]
        }
        ModelInput::Set(set) => {
            if set.is_empty() {
                return Err(InsightError::InvalidInput(
                    "at least one model is required".to_string(),
                ));
            }
            let names = resolve_model_names(set.len(), options.model_names.as_deref())?;
            set.iter()
                .zip(names)
                .zip(cycle_colours())
                .map(|(((explainer, table), name), colour)| (*explainer, *table, name, colour))
                .collect()
        }
    };

    let mut traces = Vec::with_capacity(models.len() * 3);
    let mut axis: Option<(Vec<String>, Vec<usize>)> = None;

    for (explainer, table, name, colour) in models {
        let summary = summarize_single(explainer, table, column, &options.summary)?;
        let labels = summary.labels();
        let sizes = summary.sizes();
        traces.extend(band_traces(
            &name,
            &labels,
            &summary.effects(),
            &summary.lower(),
            &summary.upper(),
            &sizes,
            colour,
        ));
        if axis.is_none() {
            axis = Some((labels, sizes));
        }
    }

    let (x, sizes) = axis.unwrap_or_default();
    let layout = ChartLayout {
        x_axis_title: feature_label,
        y_axis_title: options.target_label.clone(),
        plot_size: options.plot_size,
    };
    renderer.compose(traces, &x, &sizes, &layout)
}
