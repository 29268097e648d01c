/// Axis-aligned box in pixel coordinates, `x1 < x2` and `y1 < y2`.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

/// One detected object as reported by the detection capability.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub label: String,
    pub confidence: f32,
    pub bbox: BoundingBox,
}
