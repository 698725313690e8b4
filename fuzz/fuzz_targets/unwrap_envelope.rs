#![no_main]
use libfuzzer_sys::fuzz_target;
use xfadata::{datasets_to_envelope_json, envelope_to_datasets_xml};

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(xml) = envelope_to_datasets_xml(s) {
            datasets_to_envelope_json(&xml).expect("filled datasets extract again");
        }
    }
});
