#![no_main]
use libfuzzer_sys::fuzz_target;
use modhost::module::process::translator::parse_line;

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    for line in text.lines() {
        if let Some(diagnostic) = parse_line(line) {
            // Rendering must not panic on any recognised shape
            let _ = diagnostic.to_string();
            assert!(!diagnostic.message.starts_with(' '));
        }
    }
});
