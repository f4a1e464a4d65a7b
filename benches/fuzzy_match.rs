use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use squad_reconcile::dataset::{Dataset, Table};
use squad_reconcile::fuzzy::{CandidatePool, FuzzyMatcher, Scorer};

const FIRST: &[&str] = &[
    "Mohamed", "Bukayo", "Kevin", "Erling", "Martin", "Declan", "Phil", "Bruno", "Heung-min",
    "Ollie", "Cole", "Jarrod", "Alexis", "Virgil", "William",
];
const LAST: &[&str] = &[
    "Salah", "Saka", "De Bruyne", "Haaland", "Odegaard", "Rice", "Foden", "Fernandes", "Son",
    "Watkins", "Palmer", "Bowen", "Mac Allister", "van Dijk", "Saliba", "Silva", "Jones",
];

fn name(i: usize) -> String {
    format!(
        "{} {}{}",
        FIRST[i % FIRST.len()],
        LAST[(i / FIRST.len()) % LAST.len()],
        i / (FIRST.len() * LAST.len())
    )
}

fn generate(targets: usize, candidates: usize) -> (Dataset, CandidatePool) {
    let rows = (0..targets)
        .map(|i| {
            let full = name(i * 7);
            let reordered = full.split_whitespace().rev().collect::<Vec<_>>().join(" ");
            vec![reordered, "1000".to_string()]
        })
        .collect();
    let data = Table::from_rows(
        "results",
        &["Player".to_string(), "Min".to_string()],
        rows,
        "N/a",
    )
    .data;
    let pool = CandidatePool::from_pairs((0..candidates).map(|i| (name(i), format!("€{i}m"))));
    (data, pool)
}

fn bench_fuzzy_match(c: &mut Criterion) {
    let (data, pool) = generate(500, 2_000);
    let parallel = FuzzyMatcher::new("Player", 80.0).expect("matcher");
    let sequential = parallel.clone().sequential();
    let levenshtein = parallel.clone().with_scorer(Scorer::TokenSortLevenshtein);

    let mut group = c.benchmark_group("fuzzy_match");
    group.sample_size(10);

    group.bench_function("token_sort_parallel", |b| {
        b.iter_batched(
            || (),
            |_| parallel.match_records(&data, &pool).expect("parallel match"),
            BatchSize::SmallInput,
        );
    });

    group.bench_function("token_sort_sequential", |b| {
        b.iter_batched(
            || (),
            |_| sequential.match_records(&data, &pool).expect("sequential match"),
            BatchSize::SmallInput,
        );
    });

    group.bench_function("levenshtein_parallel", |b| {
        b.iter_batched(
            || (),
            |_| levenshtein.match_records(&data, &pool).expect("levenshtein match"),
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

criterion_group!(benches, bench_fuzzy_match);
criterion_main!(benches);
