#![no_main]

use libfuzzer_sys::fuzz_target;
use pinrelay_pipeline::split_text;

fuzz_target!(|data: &[u8]| {
    let Some((&width, rest)) = data.split_first() else {
        return;
    };
    let max_chars = usize::from(width).max(1);
    let text = String::from_utf8_lossy(rest);
    let segments = split_text(&text, max_chars);
    assert_eq!(segments.concat(), text);
    assert_eq!(segments.len(), text.chars().count().div_ceil(max_chars));
    assert!(segments
        .iter()
        .all(|segment| !segment.is_empty() && segment.chars().count() <= max_chars));
});
