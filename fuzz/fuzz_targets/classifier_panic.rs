#![no_main]
use libfuzzer_sys::fuzz_target;
use texfly_log::{DiagnosticClassifier, ResolutionMemory};

fuzz_target!(|data: &[u8]| {
    // Compiler output is not guaranteed to be UTF-8.
    let s = String::from_utf8_lossy(data);
    let classifier = DiagnosticClassifier::new("main.tex");
    let mut memory = ResolutionMemory::new();
    while let Some(found) = classifier.classify(&s, &memory) {
        memory.record(&found);
    }
});
