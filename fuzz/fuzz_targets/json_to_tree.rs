#![no_main]
use libfuzzer_sys::fuzz_target;
use xfadata::{infer_schema, is_subset_of_schema, json_to_tree, tree_to_json};

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(tree) = json_to_tree(s) {
            assert_eq!(json_to_tree(&tree_to_json(&tree)).ok(), Some(tree.clone()));
            if tree.is_object() {
                assert_eq!(is_subset_of_schema(&tree, &infer_schema(&tree)).ok(), Some(true));
            }
        }
    }
});
