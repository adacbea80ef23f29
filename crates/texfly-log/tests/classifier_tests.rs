use texfly_log::ir::{MissingResource, ResourceTier};
use texfly_log::{DiagnosticClassifier, ResolutionMemory};

#[test]
fn test_pdflatex_missing_package() {
    let output = include_str!("fixtures/pdflatex_missing_sty.txt");
    let classifier = DiagnosticClassifier::new("report.tex");
    let memory = ResolutionMemory::new();

    assert_eq!(
        classifier.classify(output, &memory),
        Some(MissingResource::ExplicitFile("siunitx.sty".into()))
    );
}

#[test]
fn test_xelatex_font_spec() {
    let output = include_str!("fixtures/xelatex_missing_font.txt");
    let classifier = DiagnosticClassifier::new("thesis.tex");
    let detections = classifier.detect(output);

    assert!(detections.files.is_empty());
    // The metric pattern fires on `file:Linux` before the font name tiers.
    // Intentional: costs one empty search, the font name is tried next.
    assert_eq!(detections.top(ResourceTier::FontFile), Some("file:Linux.tfm"));
    assert_eq!(
        detections.fonts,
        vec!["Linux Libertine O".to_string(), "LinuxLibertineO(0)".to_string()]
    );
}

#[test]
fn test_xelatex_falls_through_to_font_name() {
    let output = include_str!("fixtures/xelatex_missing_font.txt");
    let classifier = DiagnosticClassifier::new("thesis.tex");
    let mut memory = ResolutionMemory::new();

    let first = classifier.classify(output, &memory).unwrap();
    assert_eq!(first.tier(), ResourceTier::FontFile);
    memory.record(&first);

    let second = classifier.classify(output, &memory).unwrap();
    assert_eq!(second, MissingResource::FontName("Linux Libertine O".into()));
    memory.record(&second);

    assert_eq!(classifier.classify(output, &memory), None);
}

#[test]
fn test_plain_tex_metric_error_converges() {
    let output = include_str!("fixtures/plain_metric_error.txt");
    let classifier = DiagnosticClassifier::new("letter.tex");
    let mut memory = ResolutionMemory::new();

    let found = classifier.classify(output, &memory).unwrap();
    assert_eq!(found, MissingResource::FontFile("cmr10.tfm".into()));
    memory.record(&found);

    // No slashes and no `file:` spec, so nothing else to try.
    assert_eq!(classifier.classify(output, &memory), None);
}

#[test]
fn test_detections_serialize() {
    let output = include_str!("fixtures/plain_metric_error.txt");
    let detections = DiagnosticClassifier::new("letter.tex").detect(output);
    let json = serde_json::to_value(&detections).unwrap();
    assert_eq!(json["font_files"][0], "cmr10.tfm");

    let resource = MissingResource::FontFile("cmr10.tfm".into());
    let json = serde_json::to_value(&resource).unwrap();
    assert_eq!(json["kind"], "FontFile");
    assert_eq!(json["name"], "cmr10.tfm");
}
