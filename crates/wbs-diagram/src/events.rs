//! Input reported by a render surface.

use serde::{Deserialize, Serialize};
use wbs_core::Point;

use crate::engine::DiagramEngine;

/// Where keyboard input currently goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InputFocus {
    #[default]
    Canvas,
    /// A label editor or other text input; arrow keys belong to it.
    TextField,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArrowKey {
    Up,
    Down,
    Left,
    Right,
}

impl ArrowKey {
    /// Unit step in screen orientation (y grows downwards).
    #[must_use]
    pub const fn unit(self) -> (f64, f64) {
        match self {
            Self::Up => (0.0, -1.0),
            Self::Down => (0.0, 1.0),
            Self::Left => (-1.0, 0.0),
            Self::Right => (1.0, 0.0),
        }
    }
}

/// Pointer coordinates are screen pixels; the engine maps them through its
/// viewport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SurfaceEvent {
    PointerDown {
        /// Node under the pointer, if any.
        target: Option<String>,
        x: f64,
        y: f64,
        /// Shift/meta held: toggle selection instead of grabbing.
        #[serde(default)]
        additive: bool,
    },
    PointerMove {
        x: f64,
        y: f64,
    },
    PointerUp {
        x: f64,
        y: f64,
    },
    KeyDown {
        key: ArrowKey,
        /// Coarse modifier held.
        #[serde(default)]
        coarse: bool,
    },
    KeyUp {
        key: ArrowKey,
    },
    ToggleCollapse {
        node_id: String,
    },
    /// Fit one node, or every node when `node_id` is absent.
    AutoFit {
        #[serde(default)]
        node_id: Option<String>,
    },
    Focus {
        focus: InputFocus,
    },
    Pan {
        dx: f64,
        dy: f64,
    },
    Zoom {
        factor: f64,
        x: f64,
        y: f64,
    },
}

impl DiagramEngine {
    /// Dispatch one surface event. Returns true when engine state changed.
    pub fn handle_event(&mut self, event: SurfaceEvent) -> bool {
        match event {
            SurfaceEvent::PointerDown {
                target: None,
                additive,
                ..
            } => !additive && self.clear_selection(),
            SurfaceEvent::PointerDown {
                target: Some(id),
                additive: true,
                ..
            } => self.toggle_selection(&id),
            SurfaceEvent::PointerDown {
                target: Some(id),
                x,
                y,
                additive: false,
            } => {
                if !self.selection().contains(&id) {
                    self.select(&id);
                }
                let grab = self.model_point(x, y);
                self.begin_drag_with_grab(&id, Some(grab))
            }
            SurfaceEvent::PointerMove { x, y } => {
                let pointer = self.model_point(x, y);
                self.drag_pointer_to(pointer)
            }
            SurfaceEvent::PointerUp { x, y } => {
                let pointer = self.model_point(x, y);
                self.drag_pointer_to(pointer);
                self.end_drag()
            }
            SurfaceEvent::KeyDown { key, coarse } => self.nudge(key, coarse),
            SurfaceEvent::KeyUp { key } => self.release_key(key),
            SurfaceEvent::ToggleCollapse { node_id } => self.toggle_collapse(&node_id),
            SurfaceEvent::AutoFit { node_id: Some(id) } => self.auto_fit(&id),
            SurfaceEvent::AutoFit { node_id: None } => self.auto_fit_all(),
            SurfaceEvent::Focus { focus } => self.set_focus(focus),
            SurfaceEvent::Pan { dx, dy } => {
                self.pan(dx, dy);
                dx != 0.0 || dy != 0.0
            }
            SurfaceEvent::Zoom { factor, x, y } => self.zoom_at(factor, x, y),
        }
    }

    fn model_point(&self, x: f64, y: f64) -> Point {
        let (model_x, model_y) = self.viewport().canvas_to_diagram(x, y);
        Point::new(model_x, model_y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EngineConfig;
    use wbs_parser::parse;

    fn engine() -> DiagramEngine {
        let tree = parse("Project\n  Planning\n    Scope\n  Execution").tree;
        DiagramEngine::new(tree, EngineConfig::default()).expect("engine")
    }

    #[test]
    fn pointer_gesture_drags_subtree_and_commits_once() {
        let mut engine = engine();
        let before = engine.position("1.1.1").expect("scope");
        let planning = engine.position("1.1").expect("planning");
        let (x, y) = engine.viewport().diagram_to_canvas(planning.x, planning.y);

        assert!(engine.handle_event(SurfaceEvent::PointerDown {
            target: Some("1.1".to_string()),
            x,
            y,
            additive: false,
        }));
        assert!(engine.is_dragging());
        assert!(engine.handle_event(SurfaceEvent::PointerMove { x: x + 45.0, y: y + 5.0 }));
        let moved = engine.position("1.1.1").expect("scope");
        assert_eq!(moved.delta_from(before), (45.0, 5.0));

        assert!(engine.handle_event(SurfaceEvent::PointerUp { x: x + 45.0, y: y + 5.0 }));
        assert!(!engine.is_dragging());
        assert_eq!(engine.history().undo_len(), 1);
    }

    #[test]
    fn pointer_moves_are_scaled_by_zoom() {
        let mut engine = engine();
        engine.handle_event(SurfaceEvent::Zoom {
            factor: 2.0,
            x: 0.0,
            y: 0.0,
        });
        let start = engine.position("1.2").expect("execution");
        let (x, y) = engine.viewport().diagram_to_canvas(start.x, start.y);
        engine.handle_event(SurfaceEvent::PointerDown {
            target: Some("1.2".to_string()),
            x,
            y,
            additive: false,
        });
        engine.handle_event(SurfaceEvent::PointerMove { x: x + 40.0, y });
        let moved = engine.position("1.2").expect("execution");
        assert!((moved.x - start.x - 20.0).abs() < 1e-9);
    }

    #[test]
    fn additive_clicks_toggle_selection_and_background_clears_it() {
        let mut engine = engine();
        for id in ["1.1", "1.2"] {
            assert!(engine.handle_event(SurfaceEvent::PointerDown {
                target: Some(id.to_string()),
                x: 0.0,
                y: 0.0,
                additive: true,
            }));
        }
        assert_eq!(engine.selection().len(), 2);
        assert!(!engine.is_dragging());
        assert!(engine.handle_event(SurfaceEvent::PointerDown {
            target: None,
            x: 0.0,
            y: 0.0,
            additive: false,
        }));
        assert!(engine.selection().is_empty());
    }

    #[test]
    fn keyboard_nudge_respects_focus() {
        let mut engine = engine();
        engine.select("1.2");
        assert!(engine.handle_event(SurfaceEvent::Focus {
            focus: InputFocus::TextField,
        }));
        assert!(!engine.handle_event(SurfaceEvent::KeyDown {
            key: ArrowKey::Right,
            coarse: false,
        }));
        engine.handle_event(SurfaceEvent::Focus {
            focus: InputFocus::Canvas,
        });
        assert!(engine.handle_event(SurfaceEvent::KeyDown {
            key: ArrowKey::Right,
            coarse: false,
        }));
        assert!(engine.handle_event(SurfaceEvent::KeyUp { key: ArrowKey::Right }));
        assert_eq!(engine.history().undo_len(), 1);
    }

    #[test]
    fn toggle_and_auto_fit_events() {
        let mut engine = engine();
        assert!(engine.handle_event(SurfaceEvent::ToggleCollapse {
            node_id: "1.1".to_string(),
        }));
        assert!(engine.is_collapsed("1.1"));
        assert!(engine.handle_event(SurfaceEvent::AutoFit { node_id: None }));
        assert!(!engine.handle_event(SurfaceEvent::AutoFit {
            node_id: Some("missing".to_string()),
        }));
    }

    #[test]
    fn events_deserialize_from_tagged_json() {
        let event: SurfaceEvent =
            serde_json::from_str(r#"{"type":"key-down","key":"left"}"#).expect("event");
        assert_eq!(
            event,
            SurfaceEvent::KeyDown {
                key: ArrowKey::Left,
                coarse: false,
            }
        );
    }
}
