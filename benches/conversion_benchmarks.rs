use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::collections::BTreeMap;

use kube_dashboards::build_labels;
use kube_dashboards::model::{convert_matrix, ConversionParams, SampleStream};

fn labels_benchmark(c: &mut Criterion) {
    let filters: BTreeMap<String, String> = [
        ("app", "reviews"),
        ("version", "v2"),
        ("pod_template_hash", "5d8f7c9b4"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    c.bench_function("build_labels", |b| {
        b.iter(|| black_box(build_labels(black_box("namespace"), black_box("bookinfo"), &filters)))
    });
}

fn conversion_benchmark(c: &mut Criterion) {
    let matrix: Vec<SampleStream> = (0..50)
        .map(|i| SampleStream {
            metric: [
                ("__name__".to_string(), "jvm_threads".to_string()),
                ("app".to_string(), "reviews".to_string()),
                ("version".to_string(), format!("{}", 50 - i)),
            ]
            .into_iter()
            .collect(),
            values: (0..120).map(|t| (t as f64 * 15.0, i as f64 + t as f64)).collect(),
        })
        .collect();
    let params = ConversionParams {
        scale: 0.001,
        sort_label: "version".to_string(),
        sort_label_parse_as: "int".to_string(),
        remove_sort_label: true,
    };

    c.bench_function("convert_matrix", |b| {
        b.iter(|| black_box(convert_matrix(black_box(matrix.clone()), "Threads", &params)))
    });
}

criterion_group!(benches, labels_benchmark, conversion_benchmark);
criterion_main!(benches);
