//! Performance benchmarks for contact search.
//!
//! These benchmarks measure each search tier over a full fetch of 1000
//! contacts:
//! - Blank query (no filtering)
//! - Short query (substring matching)
//! - Long query (token-set ranking)
//! - Store fetch plus search through the service layer

use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use phonebook_core::{
    Config, Contact, ContactId, ContactRepository, ContactService, ContactServiceImpl,
    EmailAddress, MemoryContactRepository, Metrics, PhoneNumber, SearchEngine, UserId,
};
use std::sync::Arc;
use tokio::runtime::Runtime;

const FIRST_NAMES: [&str; 10] = [
    "Alice", "Bob", "Carol", "Dave", "Erin", "Frank", "Grace", "Heidi", "Ivan", "Judy",
];
const LAST_NAMES: [&str; 10] = [
    "Smith", "Jones", "Brown", "Lee", "White", "Martin", "Clark", "Lewis", "Walker", "Young",
];

fn generate_contacts(count: usize) -> Vec<Contact> {
    (0..count)
        .map(|i| {
            let first = FIRST_NAMES[i % FIRST_NAMES.len()];
            let last = LAST_NAMES[(i / FIRST_NAMES.len()) % LAST_NAMES.len()];
            Contact {
                id: ContactId::new(i as i64 + 1).unwrap(),
                user_id: UserId::new(1).unwrap(),
                name: format!("{} {} {}", first, last, i),
                phone: PhoneNumber::new(format!("9{:09}", i)).unwrap(),
                email: (i % 2 == 0).then(|| {
                    EmailAddress::new(format!("{}.{}{}@example.com", first, last, i)).unwrap()
                }),
                address: None,
                created_at: Utc::now(),
            }
        })
        .collect()
}

/// Benchmark each tier over 1000 contacts.
fn bench_search_tiers(c: &mut Criterion) {
    let contacts = generate_contacts(1000);
    let engine = SearchEngine::default();

    let mut group = c.benchmark_group("search_tiers");
    for (tier, query) in [
        ("blank", ""),
        ("short", "al"),
        ("long", "alice smith"),
        ("long_reordered", "walker judy example"),
    ] {
        group.bench_with_input(BenchmarkId::from_parameter(tier), &query, |b, &query| {
            b.iter(|| engine.search(black_box(&contacts), black_box(query)));
        });
    }
    group.finish();
}

/// Benchmark fuzzy ranking across different dataset sizes.
fn bench_fuzzy_dataset_sizes(c: &mut Criterion) {
    let engine = SearchEngine::default();

    let mut group = c.benchmark_group("fuzzy_dataset_sizes");
    for size in [100, 500, 1000] {
        let contacts = generate_contacts(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &contacts, |b, contacts| {
            b.iter(|| engine.search(black_box(contacts), black_box("grace lewis")));
        });
    }
    group.finish();
}

/// Benchmark fetch plus search through the service layer.
fn bench_service_search(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let repo = MemoryContactRepository::new();
    repo.import_unchecked(generate_contacts(1000)).unwrap();
    let repo = Arc::new(repo) as Arc<dyn ContactRepository>;
    let service = ContactServiceImpl::new(repo, &Config::default(), Metrics::new());
    let user = UserId::new(1).unwrap();

    c.bench_function("service_search_1000", |b| {
        b.to_async(&rt).iter(|| async {
            service
                .search_contacts(user, black_box("heidi young"))
                .await
                .unwrap()
        });
    });
}

criterion_group!(
    benches,
    bench_search_tiers,
    bench_fuzzy_dataset_sizes,
    bench_service_search
);
criterion_main!(benches);
