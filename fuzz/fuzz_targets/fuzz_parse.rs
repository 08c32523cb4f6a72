#![no_main]

use libfuzzer_sys::fuzz_target;
use wbs_core::to_outline;
use wbs_parser::{Dialect, parse};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let parsed = parse(text);
    let plain = text
        .bytes()
        .all(|byte| byte.is_ascii_graphic() || matches!(byte, b' ' | b'\t' | b'\n' | b'\r'));
    if !plain || parsed.dialect != Dialect::Indentation {
        return;
    }

    // Serialized indentation trees parse back to the same shape.
    let outline = to_outline(&parsed.tree);
    let reparsed = parse(&outline);
    assert_eq!(reparsed.dialect, Dialect::Indentation, "{outline:?}");
    assert_eq!(parsed.tree.outline_shape(), reparsed.tree.outline_shape());
});
