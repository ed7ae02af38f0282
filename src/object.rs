use crate::rect::Rect;

/*------------------------------------------------------------------------------
Object struct
------------------------------------------------------------------------------*/

/// One detector output for the current frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    pub rect: Rect<f32>,
    pub class_id: usize,
    pub score: f32,
}

impl Object {
    pub fn new(rect: Rect<f32>, class_id: usize, score: f32) -> Self {
        Self {
            rect,
            class_id,
            score,
        }
    }

    pub fn from_tlwh(
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        score: f32,
        class_id: usize,
    ) -> Self {
        Self::new(Rect::new(x, y, width, height), class_id, score)
    }

    pub fn get_rect(&self) -> Rect<f32> {
        self.rect.clone()
    }

    pub fn get_score(&self) -> f32 {
        self.score
    }

    pub fn get_class_id(&self) -> usize {
        self.class_id
    }
}
