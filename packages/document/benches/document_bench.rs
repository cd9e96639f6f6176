use criterion::{black_box, criterion_group, criterion_main, Criterion};
use splice_document::{parse, serialize};

fn project_source(entries: usize) -> String {
    let mut source = String::from("<?xml version=\"1.0\"?>\n<mlt LC_NUMERIC=\"C\">\n");
    source.push_str("  <producer id=\"producer1\" in=\"0\" out=\"249\">\n");
    source.push_str("    <property name=\"resource\">clip.mp4</property>\n  </producer>\n");
    source.push_str("  <playlist id=\"playlist0\">\n");
    for i in 0..entries {
        source.push_str(&format!(
            "    <entry producer=\"producer1\" in=\"0\" out=\"24\"><property name=\"splice:clip-ref\">clip_{}</property></entry>\n    <blank length=\"5\"/>\n",
            i
        ));
    }
    source.push_str("  </playlist>\n</mlt>\n");
    source
}

fn parse_project(c: &mut Criterion) {
    let source = project_source(500);
    c.bench_function("parse_500_entries", |b| b.iter(|| parse(black_box(&source))));
}

fn serialize_project(c: &mut Criterion) {
    let doc = parse(&project_source(500)).unwrap();
    c.bench_function("serialize_500_entries", |b| b.iter(|| serialize(black_box(&doc))));
}

criterion_group!(benches, parse_project, serialize_project);
criterion_main!(benches);
