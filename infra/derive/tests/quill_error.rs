#[test]
fn quill_error_ui() {
    let t = trybuild::TestCases::new();
    t.pass("tests/ui/quill_error_pass.rs");
}
