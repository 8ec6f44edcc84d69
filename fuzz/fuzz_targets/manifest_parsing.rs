#![no_main]
use libfuzzer_sys::fuzz_target;
use modhost::module::registry::ModuleManifest;
use modhost::module::validation::ManifestValidator;
use modhost::module::Comparator;
use std::path::Path;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    // Requirement strings alone must parse or fail cleanly
    let _ = Comparator::parse_requirement(text);

    if let Ok(manifest) = ModuleManifest::from_toml_str(text) {
        let validator = ManifestValidator::new();
        let valid = validator.validate(&manifest).is_valid();

        // A manifest that validates must also convert
        let module = manifest.to_module(Path::new("/modules/fuzz"));
        if valid {
            assert!(module.is_ok());
        }
    }
});
