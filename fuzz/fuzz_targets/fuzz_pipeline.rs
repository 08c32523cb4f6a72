#![no_main]

use libfuzzer_sys::fuzz_target;
use wbs_diagram::{DiagramEngine, EngineConfig};
use wbs_parser::parse;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(mut engine) = DiagramEngine::new(parse(text).tree, EngineConfig::default()) else {
        return;
    };
    let ids: Vec<String> = engine.elements().nodes.iter().map(|node| node.id.clone()).collect();
    // Two history entries per id at most; stay under the default capacity.
    for id in ids.iter().take(40) {
        engine.toggle_collapse(id);
        engine.auto_fit(id);
    }
    if let Some(first) = ids.first() {
        engine.begin_drag(first);
        engine.drag_by(17.0, -23.0);
        engine.end_drag();
    }
    let frame = engine.render_frame();
    assert!(frame.nodes.len() <= ids.len());
    while engine.undo() {}
    assert!(engine.render_frame().nodes.len() == ids.len());
});
