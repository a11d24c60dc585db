//! Overlay planning — pure mapping from recognition output to drawing
//! commands for a surface matching the source frame's dimensions.

use serde::Serialize;

use crate::types::FaceBox;

/// Stroke color signalling match status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BoxColor {
    /// Green: the face matched a stored record.
    Recognized,
    /// Red: a face is present but unmatched.
    Unknown,
}

impl BoxColor {
    pub fn rgb(&self) -> &'static str {
        match self {
            BoxColor::Recognized => "#00FF00",
            BoxColor::Unknown => "#FF0000",
        }
    }
}

/// Vertical gap between the label baseline and the box's top edge.
const LABEL_OFFSET: i32 = 10;

/// One drawing command for the presentation surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DrawCommand {
    /// Wipe the whole surface. Always issued first.
    Clear,
    StrokeRect { face_box: FaceBox, color: BoxColor },
    Label { text: String, x: i32, y: i32 },
}

/// What to draw for one tick: a box and, when recognized, a label.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlayPlan {
    pub face_box: Option<FaceBox>,
    pub label: Option<String>,
}

impl OverlayPlan {
    /// Nothing to draw: the surface is left fully cleared.
    pub fn clear() -> Self {
        Self::default()
    }

    pub fn unlabeled(face_box: FaceBox) -> Self {
        Self { face_box: Some(face_box), label: None }
    }

    pub fn labeled(face_box: FaceBox, label: String) -> Self {
        Self { face_box: Some(face_box), label: Some(label) }
    }
}

/// Render a plan into drawing commands.
///
/// Stateless and idempotent: the same plan always yields the same
/// commands, and every call starts by clearing prior drawing.
pub fn render(plan: &OverlayPlan) -> Vec<DrawCommand> {
    let mut commands = vec![DrawCommand::Clear];

    let Some(face_box) = plan.face_box else {
        return commands;
    };

    let color = if plan.label.is_some() { BoxColor::Recognized } else { BoxColor::Unknown };
    commands.push(DrawCommand::StrokeRect { face_box, color });

    if let Some(label) = &plan.label {
        commands.push(DrawCommand::Label {
            text: label.clone(),
            x: face_box.x,
            y: face_box.y - LABEL_OFFSET,
        });
    }

    commands
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bx() -> FaceBox {
        FaceBox { x: 10, y: 10, width: 50, height: 50 }
    }

    #[test]
    fn test_clear_plan_renders_clear_only() {
        assert_eq!(render(&OverlayPlan::clear()), vec![DrawCommand::Clear]);
    }

    #[test]
    fn test_unknown_face_strokes_red() {
        let commands = render(&OverlayPlan::unlabeled(bx()));
        assert_eq!(commands[0], DrawCommand::Clear);
        assert_eq!(
            commands[1],
            DrawCommand::StrokeRect { face_box: bx(), color: BoxColor::Unknown }
        );
        assert_eq!(commands.len(), 2);
    }

    #[test]
    fn test_recognized_face_strokes_green_with_label() {
        let commands = render(&OverlayPlan::labeled(bx(), "Ana".into()));
        assert_eq!(commands[0], DrawCommand::Clear);
        assert_eq!(
            commands[1],
            DrawCommand::StrokeRect { face_box: bx(), color: BoxColor::Recognized }
        );
        // Label sits above the box's top edge.
        assert_eq!(commands[2], DrawCommand::Label { text: "Ana".into(), x: 10, y: 0 });
    }

    #[test]
    fn test_render_is_pure() {
        let plan = OverlayPlan::labeled(bx(), "Ana".into());
        assert_eq!(render(&plan), render(&plan));
    }

    #[test]
    fn test_colors() {
        assert_eq!(BoxColor::Recognized.rgb(), "#00FF00");
        assert_eq!(BoxColor::Unknown.rgb(), "#FF0000");
    }
}
