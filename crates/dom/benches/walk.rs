use criterion::{black_box, criterion_group, criterion_main, Criterion};
use domwalk::{resolve, walk_document, DomArena, NodeId};

/// `depth` levels of `width` children each, alternating two tags
fn build(width: usize, depth: usize) -> DomArena {
    let mut arena = DomArena::with_document();
    let root = arena.root_id().unwrap();
    let html = arena.append_element(root, "html").unwrap();

    let mut level: Vec<NodeId> = vec![html];
    for _ in 0..depth {
        let mut next = Vec::with_capacity(level.len() * width);
        for &parent in &level {
            for i in 0..width {
                let tag = if i % 2 == 0 { "div" } else { "span" };
                let child = arena.append_element(parent, tag).unwrap();
                arena.append_text(child, "text").unwrap();
                next.push(child);
            }
        }
        level = next;
    }
    arena
}

fn bench_walk(c: &mut Criterion) {
    let arena = build(6, 4);

    c.bench_function("walk_document 6x4", |b| {
        b.iter(|| walk_document(black_box(&arena)).unwrap())
    });

    let paths: Vec<String> = walk_document(&arena)
        .unwrap()
        .into_iter()
        .map(|r| r.path)
        .take(200)
        .collect();

    c.bench_function("resolve 200 paths", |b| {
        b.iter(|| {
            for path in &paths {
                black_box(resolve(&arena, path).unwrap());
            }
        })
    });
}

criterion_group!(benches, bench_walk);
criterion_main!(benches);
