use criterion::{black_box, criterion_group, criterion_main, Criterion};

use fschart::config::Options;
use fschart::resources::Resources;
use fschart::session::analyze;
use fschart::testkit::{self, toy_grammar, ToyFs};
use fschart::unpack::unpack_exhaustively;

fn tokens(fs_engine: &mut ToyFs, grammar: &testkit::ToyGrammar, sentence: &[&str]) -> Vec<fschart::Item<ToyFs>> {
  sentence
    .iter()
    .enumerate()
    .map(|(i, &tok)| {
      let ty = match tok {
        "the" => grammar.det_type(),
        "saw" | "barked" | "likes" => grammar.verb_type(),
        "dog" | "cat" | "mary" | "sue" => grammar.noun_type(),
        "it" => grammar.pron_type(),
        other => panic!("unknown bench token {other}"),
      };
      testkit::leaf_item(fs_engine, i, i + 1, ty)
    })
    .collect()
}

fn parse_and_count(sentence: &[&str]) -> usize {
  let grammar = toy_grammar();
  let mut fs_engine = ToyFs::new();
  let opts = Options::default();
  let mut resources = Resources::unlimited();

  let items = tokens(&mut fs_engine, &grammar, sentence);
  let mut result = analyze(items, sentence.len(), &grammar, &mut fs_engine, &opts, &mut resources);
  let (readings, _) = unpack_exhaustively(&mut result.chart, &grammar, &mut fs_engine, &mut resources, &mut result.stats);
  readings.len()
}

fn criterion_benchmark(c: &mut Criterion) {
  let intransitive = ["it", "barked"];
  let transitive = ["the", "dog", "saw", "the", "cat"];

  c.bench_function("parse an intransitive sentence", |b| {
    b.iter(|| parse_and_count(black_box(&intransitive)))
  });

  c.bench_function("parse and exhaustively unpack a transitive sentence", |b| {
    b.iter(|| parse_and_count(black_box(&transitive)))
  });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
