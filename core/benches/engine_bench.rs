use criterion::{criterion_group, criterion_main, Criterion};
use profile_core::{preprocess, Document, Field, IndexBuilder};

const TOPICS: &[&str] = &[
    "computer vision and deep learning for medical imaging",
    "wireless sensor networks, internet of things",
    "natural language processing, information retrieval",
    "VLSI design and embedded systems",
    "cryptography, cyber security and blockchain",
    "signal processing for speech and audio",
];

fn corpus(n: usize) -> Vec<Document> {
    (0..n)
        .map(|i| {
            Document::new(format!("DAU{i:04}"), format!("Faculty Member {i}"))
                .with_field(Field::Research, TOPICS[i % TOPICS.len()])
                .with_field(Field::Specialization, TOPICS[(i + 1) % TOPICS.len()])
                .with_field(Field::Bio, "<p>Joined the institute after a PhD &amp; postdoctoral work abroad.</p>")
        })
        .collect()
}

fn bench_preprocess(c: &mut Criterion) {
    let text = TOPICS.join(". ").repeat(20);
    c.bench_function("preprocess_profile_text", |b| b.iter(|| preprocess(&text)));
}

fn bench_build_and_query(c: &mut Criterion) {
    let docs = corpus(500);
    c.bench_function("build_500_profiles", |b| {
        b.iter(|| IndexBuilder::new().build_documents(docs.clone()).unwrap())
    });
    let (index, _) = IndexBuilder::new().build_documents(docs).unwrap();
    c.bench_function("query_top10", |b| b.iter(|| index.query("deep learning for medical imaging", 10)));
}

criterion_group!(benches, bench_preprocess, bench_build_and_query);
criterion_main!(benches);
