//! Property tests: a serialized layout survives being wrapped in prose and
//! parsed back, and materializing it twice yields the same paths.

use proptest::prelude::*;

use kiln_core::structure::{
    ContentKind, DirectoryNode, FileNode, MaterializeMeta, StructureNode, StructureTree,
    materialize, parse,
};

#[derive(Debug, Clone)]
enum Shape {
    File {
        purpose: Option<String>,
        kind: ContentKind,
        intent: Option<String>,
    },
    Dir {
        purpose: Option<String>,
        children: Vec<Shape>,
    },
}

fn words() -> impl Strategy<Value = String> {
    "[a-z]{1,10}( [a-z]{1,8}){0,2}"
}

fn arb_shape() -> impl Strategy<Value = Shape> {
    let leaf = (
        prop::option::of(words()),
        prop::sample::select(ContentKind::ALL.to_vec()),
        prop::option::of(words()),
    )
        .prop_map(|(purpose, kind, intent)| Shape::File {
            purpose,
            kind,
            intent,
        });
    leaf.prop_recursive(4, 40, 6, |inner| {
        (prop::option::of(words()), prop::collection::vec(inner, 0..6))
            .prop_map(|(purpose, children)| Shape::Dir { purpose, children })
    })
}

/// Name shapes by position so siblings never collide, and order children
/// directories first as the parser does.
fn to_nodes(shapes: Vec<Shape>) -> Vec<StructureNode> {
    let mut dirs = Vec::new();
    let mut files = Vec::new();
    for (i, shape) in shapes.into_iter().enumerate() {
        match shape {
            Shape::Dir { purpose, children } => {
                dirs.push(StructureNode::Directory(DirectoryNode {
                    name: format!("d{i}"),
                    purpose,
                    children: to_nodes(children),
                }));
            }
            Shape::File {
                purpose,
                kind,
                intent,
            } => files.push(StructureNode::File(FileNode {
                name: format!("f{i}.txt"),
                purpose,
                kind,
                intent,
            })),
        }
    }
    dirs.extend(files);
    dirs
}

fn arb_tree() -> impl Strategy<Value = StructureTree> {
    prop::collection::vec(arb_shape(), 0..5).prop_map(|shapes| StructureTree::new(to_nodes(shapes)))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn wrapped_layout_parses_back_to_the_same_tree(
        tree in arb_tree(),
        before in "[a-zA-Z ,.!?]{0,60}",
        after in "[a-zA-Z ,.!?]{0,60}",
    ) {
        let wrapped = format!("{before}\n```json\n{}\n```\n{after}", tree.to_json());
        let parsed = parse(&wrapped).unwrap();
        prop_assert!(parsed.warnings.is_empty(), "{:?}", parsed.warnings);
        prop_assert_eq!(parsed.tree, tree);
    }

    #[test]
    fn unfenced_layout_in_prose_parses_back_to_the_same_tree(
        tree in arb_tree(),
        before in "[a-zA-Z ,.!?{}`]{0,60}",
        after in "[a-zA-Z ,.!?{}`]{0,60}",
    ) {
        let wrapped = format!("{before}\n{}\n{after}", tree.to_json());
        let parsed = parse(&wrapped).unwrap();
        prop_assert!(parsed.warnings.is_empty(), "{:?}", parsed.warnings);
        prop_assert_eq!(parsed.tree, tree);
    }

    #[test]
    fn bare_layout_parses_back_to_the_same_tree(tree in arb_tree()) {
        let parsed = parse(&tree.to_json()).unwrap();
        prop_assert_eq!(parsed.tree, tree);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn materializing_twice_yields_identical_paths(tree in arb_tree()) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let tmp = tempfile::TempDir::new().unwrap();

        let (first, second) = runtime.block_on(async {
            let first = materialize(tmp.path(), &tree, &MaterializeMeta::now("prop")).await;
            let second = materialize(tmp.path(), &tree, &MaterializeMeta::now("prop")).await;
            (first, second)
        });

        prop_assert_eq!(first.failures().count(), 0);
        prop_assert_eq!(second.failures().count(), 0);
        prop_assert_eq!(first.created_paths(), second.created_paths());
        prop_assert_eq!(first.fingerprint, second.fingerprint);
    }
}
