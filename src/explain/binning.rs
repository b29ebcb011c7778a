//! Bin occupancy counting and human-readable bin labels

/// Count values per bin.
///
/// Bins are right-closed `(e[i], e[i + 1]]` with the first bin also closed on
/// the left. Nulls and values outside the edges are not counted.
pub fn bin_counts(values: &[Option<f64>], edges: &[f64]) -> Vec<usize> {
    let n_bins = edges.len().saturating_sub(1);
    let mut counts = vec![0usize; n_bins];
    if n_bins == 0 {
        return counts;
    }

    let (first, last) = (edges[0], edges[n_bins]);
    for v in values.iter().flatten() {
        if v.is_nan() || *v < first || *v > last {
            continue;
        }
        // First edge >= v closes the bin that holds v
        let upper = edges.partition_point(|e| e < v);
        counts[upper.saturating_sub(1)] += 1;
    }
    counts
}

/// Render a number rounded to `decimal_places`, with thousands separators and
/// trailing zeros trimmed.
pub fn format_number(value: f64, decimal_places: usize) -> String {
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let rendered = format!("{:.*}", decimal_places, value);
    let rendered = if rendered.contains('.') {
        rendered.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        rendered
    };

    let (sign, digits) = match rendered.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", rendered.as_str()),
    };
    let (int_part, frac_part) = match digits.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (digits, None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    // "-0" after rounding is just zero
    let sign = if grouped == "0" && frac_part.is_none() { "" } else { sign };
    match frac_part {
        Some(f) => format!("{}{}.{}", sign, grouped, f),
        None => format!("{}{}", sign, grouped),
    }
}

/// Labels for the bins described by `edges`.
///
/// With `as_percentage` edges are scaled by 100 and suffixed with `%`. With
/// `condense_last` the final bin is written as `"> {lower edge}"`.
pub fn bin_labels(
    edges: &[f64],
    decimal_places: usize,
    as_percentage: bool,
    condense_last: bool,
) -> Vec<String> {
    let rendered: Vec<String> = edges
        .iter()
        .map(|&e| {
            if as_percentage {
                format!("{}%", format_number(e * 100.0, decimal_places))
            } else {
                format_number(e, decimal_places)
            }
        })
        .collect();

    let mut labels: Vec<String> = rendered
        .windows(2)
        .map(|w| format!("{} - {}", w[0], w[1]))
        .collect();

    if condense_last {
        if let Some(last) = labels.last_mut() {
            *last = format!("> {}", rendered[rendered.len() - 2]);
        }
    }
    labels
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bin_counts_right_closed() {
        let edges = [0.0, 10.0, 20.0];
        let values = [Some(0.0), Some(5.0), Some(10.0), Some(10.5), Some(20.0)];
        assert_eq!(bin_counts(&values, &edges), vec![3, 2]);
    }

    #[test]
    fn test_bin_counts_skips_out_of_range_and_nulls() {
        let edges = [0.0, 1.0];
        let values = [Some(-1.0), None, Some(f64::NAN), Some(2.0), Some(0.5)];
        assert_eq!(bin_counts(&values, &edges), vec![1]);
    }

    #[test]
    fn test_bin_counts_infinite_edges() {
        let edges = [f64::NEG_INFINITY, 0.0, 10.0, f64::INFINITY];
        let values = [Some(-5.0), Some(0.0), Some(3.0), Some(100.0)];
        assert_eq!(bin_counts(&values, &edges), vec![2, 1, 1]);
    }

    #[test]
    fn test_bin_counts_empty_bins_present() {
        let edges = [0.0, 1.0, 2.0, 3.0];
        let values = [Some(2.5)];
        assert_eq!(bin_counts(&values, &edges), vec![0, 0, 1]);
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(1234.5678, 2), "1,234.57");
        assert_eq!(format_number(10.0, 2), "10");
        assert_eq!(format_number(0.5, 2), "0.5");
        assert_eq!(format_number(-1234567.0, 0), "-1,234,567");
        assert_eq!(format_number(-0.001, 2), "0");
        assert_eq!(format_number(f64::NEG_INFINITY, 2), "-inf");
    }

    #[test]
    fn test_bin_labels() {
        let edges = [0.0, 10.0, 20.5, 100.0];
        assert_eq!(
            bin_labels(&edges, 2, false, false),
            vec!["0 - 10", "10 - 20.5", "20.5 - 100"]
        );
        assert_eq!(
            bin_labels(&edges, 2, false, true),
            vec!["0 - 10", "10 - 20.5", "> 20.5"]
        );
    }

    #[test]
    fn test_bin_labels_percentage() {
        let edges = [0.0, 0.25, 0.5];
        assert_eq!(bin_labels(&edges, 1, true, false), vec!["0% - 25%", "25% - 50%"]);
    }

    #[test]
    fn test_rounding_collapses_labels() {
        let edges = [0.001, 0.002, 0.003];
        let labels = bin_labels(&edges, 2, false, false);
        assert_eq!(labels[0], labels[1]);
    }
}
