//! Benchmark: reconciliation of keyed and unkeyed lists

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use morphel_pages::Reconciler;
use morphel_pages::dom::{HostTree, MemoryNode, MemoryTree};

fn is_row(tag: &str) -> bool {
	tag == "x-row"
}

fn list(tag: &str, keys: impl Iterator<Item = usize>) -> String {
	keys.map(|key| format!(r#"<{tag} key="{key}"><span>{key}</span></{tag}>"#))
		.collect()
}

fn live(tree: &MemoryTree, markup: &str) -> MemoryNode {
	let node = tree.create_element("ul");
	let fragment = tree.parse_fragment(markup).unwrap();
	tree.append_child(&node, &fragment).unwrap();
	node
}

fn benchmark_identical(c: &mut Criterion) {
	let mut group = c.benchmark_group("morph_identical");
	for size in [10, 100, 1000] {
		let markup = list("li", 0..size);
		group.bench_with_input(BenchmarkId::from_parameter(size), &markup, |b, markup| {
			let tree = MemoryTree::new();
			let node = live(&tree, markup);
			b.iter(|| {
				let fragment = tree.parse_fragment(markup).unwrap();
				black_box(Reconciler::new(&tree, &is_row).morph(&node, &fragment).unwrap())
			});
		});
	}
	group.finish();
}

fn benchmark_prepend(c: &mut Criterion) {
	let mut group = c.benchmark_group("morph_prepend");
	for tag in ["li", "x-row"] {
		let before = list(tag, 1..200);
		let after = list(tag, 0..200);
		group.bench_with_input(BenchmarkId::from_parameter(tag), &(before, after), |b, (before, after)| {
			b.iter(|| {
				let tree = MemoryTree::new();
				let node = live(&tree, before);
				let fragment = tree.parse_fragment(after).unwrap();
				black_box(Reconciler::new(&tree, &is_row).morph(&node, &fragment).unwrap())
			});
		});
	}
	group.finish();
}

fn benchmark_middle_removal(c: &mut Criterion) {
	let before = list("li", 0..200);
	let after = list("li", (0..200).filter(|key| *key != 100));
	c.bench_function("morph_middle_removal", |b| {
		b.iter(|| {
			let tree = MemoryTree::new();
			let node = live(&tree, &before);
			let fragment = tree.parse_fragment(&after).unwrap();
			let report = Reconciler::new(&tree, &is_row).morph(&node, &fragment).unwrap();
			black_box(tree.children(&node).len() + report.removed)
		});
	});
}

criterion_group!(
	benches,
	benchmark_identical,
	benchmark_prepend,
	benchmark_middle_removal
);
criterion_main!(benches);
