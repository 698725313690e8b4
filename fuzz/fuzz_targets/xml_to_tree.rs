#![no_main]
use libfuzzer_sys::fuzz_target;
use xfadata::{document_to_xml, xml_to_tree};

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(tree) = xml_to_tree(s) {
            let xml = document_to_xml(&tree, false).expect("parsed trees render");
            assert_eq!(xml_to_tree(&xml).ok(), Some(tree));
        }
    }
});
