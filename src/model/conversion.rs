use std::cmp::Ordering;

use super::{Matrix, SampleStream, Series};

#[derive(Debug, Clone)]
pub struct ConversionParams {
    pub scale: f64,
    pub sort_label: String,
    /// `"int"` sorts numerically, anything else lexically.
    pub sort_label_parse_as: String,
    /// The sort label was only added to the grouping to get per-series ordering data.
    pub remove_sort_label: bool,
}

impl Default for ConversionParams {
    fn default() -> Self {
        Self {
            scale: 1.0,
            sort_label: String::new(),
            sort_label_parse_as: String::new(),
            remove_sort_label: false,
        }
    }
}

pub fn convert_matrix(mut matrix: Matrix, name: &str, params: &ConversionParams) -> Vec<Series> {
    if !params.sort_label.is_empty() {
        let by_int = params.sort_label_parse_as == "int";
        matrix.sort_by(|a, b| compare_by_label(a, b, &params.sort_label, by_int));
    }
    matrix
        .into_iter()
        .map(|stream| convert_stream(stream, name, params))
        .collect()
}

fn convert_stream(stream: SampleStream, name: &str, params: &ConversionParams) -> Series {
    let mut labels = stream.metric;
    labels.remove("__name__");
    if params.remove_sort_label {
        labels.remove(&params.sort_label);
    }
    let datapoints = if params.scale == 1.0 {
        stream.values
    } else {
        stream
            .values
            .into_iter()
            .map(|(t, v)| (t, v * params.scale))
            .collect()
    };
    Series {
        name: name.to_string(),
        labels,
        datapoints,
    }
}

fn compare_by_label(a: &SampleStream, b: &SampleStream, label: &str, by_int: bool) -> Ordering {
    let va = a.metric.get(label).map(String::as_str).unwrap_or("");
    let vb = b.metric.get(label).map(String::as_str).unwrap_or("");
    if by_int {
        // unparseable values sort after numbers
        match (va.parse::<i64>(), vb.parse::<i64>()) {
            (Ok(x), Ok(y)) => return x.cmp(&y),
            (Ok(_), Err(_)) => return Ordering::Less,
            (Err(_), Ok(_)) => return Ordering::Greater,
            _ => {}
        }
    }
    va.cmp(vb)
}
