use crate::vision::Polygon;

use super::angle::{AngleUndetectable, SnappedAngle, detect_angle};

pub const DEFAULT_PADDING: i32 = 3;

/// One side of a box accumulator, unset until the first word is merged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Bound {
    #[default]
    Unset,
    Value(i32),
}

impl Bound {
    pub fn value(self) -> Option<i32> {
        match self {
            Bound::Unset => None,
            Bound::Value(value) => Some(value),
        }
    }

    fn min_with(self, value: i32) -> Self {
        match self {
            Bound::Unset => Bound::Value(value),
            Bound::Value(current) => Bound::Value(current.min(value)),
        }
    }

    fn max_with(self, value: i32) -> Self {
        match self {
            Bound::Unset => Bound::Value(value),
            Bound::Value(current) => Bound::Value(current.max(value)),
        }
    }
}

/// Pillow style box: left, upper, right, lower.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoxCoords {
    pub left: i32,
    pub upper: i32,
    pub right: i32,
    pub lower: i32,
}

impl BoxCoords {
    pub fn new(left: i32, upper: i32, right: i32, lower: i32) -> Self {
        Self {
            left,
            upper,
            right,
            lower,
        }
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.lower - self.upper
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawBox {
    pub left: Bound,
    pub upper: Bound,
    pub right: Bound,
    pub lower: Bound,
}

impl RawBox {
    /// Grows the box to cover `coords`. Never shrinks a resolved side.
    pub fn merge(self, coords: BoxCoords) -> Self {
        Self {
            left: self.left.min_with(coords.left),
            upper: self.upper.min_with(coords.upper),
            right: self.right.max_with(coords.right),
            lower: self.lower.max_with(coords.lower),
        }
    }

    pub fn resolved(&self) -> Option<BoxCoords> {
        Some(BoxCoords {
            left: self.left.value()?,
            upper: self.upper.value()?,
            right: self.right.value()?,
            lower: self.lower.value()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Reconstructed box of one text line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextField {
    pub text: String,
    raw: RawBox,
    angle: SnappedAngle,
    image: ImageSize,
    padding: i32,
}

impl TextField {
    pub fn new(text: impl Into<String>, image: ImageSize) -> Self {
        Self::with_padding(text, image, DEFAULT_PADDING)
    }

    pub fn with_padding(text: impl Into<String>, image: ImageSize, padding: i32) -> Self {
        Self {
            text: text.into(),
            raw: RawBox::default(),
            angle: SnappedAngle::default(),
            image,
            padding,
        }
    }

    /// Merges a word polygon into the field. The first merged word fixes the
    /// angle; on error the field is left untouched.
    pub fn add_word(&mut self, polygon: &Polygon) -> Result<(), AngleUndetectable> {
        if !self.is_initialized() {
            self.angle = detect_angle(polygon)?;
        }
        let coords = polygon_to_coords(polygon, self.image, self.angle);
        self.raw = self.raw.merge(coords);
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.raw.resolved().is_some()
    }

    pub fn angle(&self) -> SnappedAngle {
        self.angle
    }

    pub fn raw_box(&self) -> RawBox {
        self.raw
    }

    pub fn coords(&self) -> Option<BoxCoords> {
        self.raw.resolved()
    }

    pub fn padded_coords(&self) -> Option<BoxCoords> {
        let coords = self.coords()?;
        Some(BoxCoords {
            left: (coords.left - self.padding).max(0),
            upper: (coords.upper - self.padding).max(0),
            right: (coords.right + self.padding).min(self.image.width as i32),
            lower: (coords.lower + self.padding).min(self.image.height as i32),
        })
    }

    /// Extent along the reading direction.
    pub fn width(&self) -> Option<i32> {
        let coords = self.coords()?;
        Some(if self.angle.is_sideways() {
            coords.height()
        } else {
            coords.width()
        })
    }

    /// Extent across the reading direction.
    pub fn height(&self) -> Option<i32> {
        let coords = self.coords()?;
        Some(if self.angle.is_sideways() {
            coords.width()
        } else {
            coords.height()
        })
    }

    pub fn font_size(&self) -> Option<i32> {
        let height = self.height()?;
        Some(((1.333_333_3 * f64::from(height)) as i32 - 2).max(1))
    }

    pub fn stroke_width(&self) -> Option<i32> {
        let font_size = self.font_size()?;
        Some(((f64::from(font_size) / 12.0).round_ties_even() as i32).max(1))
    }
}

/// Picks box sides from the polygon according to the snapped angle. Missing
/// coordinates fall back to the image edge.
pub(crate) fn polygon_to_coords(
    polygon: &Polygon,
    image: ImageSize,
    angle: SnappedAngle,
) -> BoxCoords {
    let [left, upper, right, lower] = angle.corner_order();
    BoxCoords {
        left: polygon[left].x.unwrap_or(0),
        upper: polygon[upper].y.unwrap_or(0),
        right: polygon[right].x.unwrap_or(image.width as i32),
        lower: polygon[lower].y.unwrap_or(image.height as i32),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::Vertex;

    const IMAGE: ImageSize = ImageSize {
        width: 200,
        height: 100,
    };

    fn rect(points: [(i32, i32); 4]) -> Polygon {
        points.map(|(x, y)| Vertex::new(x, y))
    }

    #[test]
    fn single_upright_word() {
        let mut field = TextField::new("HELLO", IMAGE);
        assert!(!field.is_initialized());
        field
            .add_word(&rect([(0, 0), (50, 0), (50, 20), (0, 20)]))
            .expect("angle");

        assert!(field.is_initialized());
        assert_eq!(field.angle(), SnappedAngle::Deg0);
        assert_eq!(field.coords(), Some(BoxCoords::new(0, 0, 50, 20)));
        assert_eq!(field.width(), Some(50));
        assert_eq!(field.height(), Some(20));
        assert_eq!(field.font_size(), Some(24));
        assert_eq!(field.stroke_width(), Some(2));
    }

    #[test]
    fn padded_box_is_clamped_to_image() {
        let mut field = TextField::new("edge", IMAGE);
        field
            .add_word(&rect([(1, 2), (199, 2), (199, 99), (1, 99)]))
            .expect("angle");
        assert_eq!(field.padded_coords(), Some(BoxCoords::new(0, 0, 200, 100)));

        let mut field = TextField::new("inner", IMAGE);
        field
            .add_word(&rect([(10, 10), (40, 10), (40, 30), (10, 30)]))
            .expect("angle");
        assert_eq!(field.padded_coords(), Some(BoxCoords::new(7, 7, 43, 33)));
    }

    #[test]
    fn sideways_text_swaps_axes() {
        let mut field = TextField::new("UP", IMAGE);
        field
            .add_word(&rect([(10, 90), (10, 10), (30, 10), (30, 90)]))
            .expect("angle");
        assert_eq!(field.angle(), SnappedAngle::Deg90);
        assert_eq!(field.coords(), Some(BoxCoords::new(10, 10, 30, 90)));
        assert_eq!(field.width(), Some(80));
        assert_eq!(field.height(), Some(20));
    }

    #[test]
    fn missing_coordinates_default_to_image_edges() {
        let mut polygon = rect([(10, 10), (40, 10), (40, 30), (10, 30)]);
        polygon[2].x = None;
        polygon[3].y = None;
        let mut field = TextField::new("partial", IMAGE);
        field.add_word(&polygon).expect("angle from A→B");
        assert_eq!(field.coords(), Some(BoxCoords::new(10, 10, 200, 100)));
    }

    #[test]
    fn first_word_fixes_the_angle() {
        let mut field = TextField::new("HELLO WORLD", IMAGE);
        field
            .add_word(&rect([(0, 0), (50, 0), (50, 20), (0, 20)]))
            .expect("angle");
        // a sideways second word is still read with the upright corner table
        field
            .add_word(&rect([(60, 40), (60, 0), (80, 0), (80, 40)]))
            .expect("merge");
        assert_eq!(field.angle(), SnappedAngle::Deg0);
        assert_eq!(field.coords(), Some(BoxCoords::new(0, 0, 80, 40)));
    }

    #[test]
    fn undetectable_first_word_leaves_field_unset() {
        let mut field = TextField::new("??", IMAGE);
        assert_eq!(
            field.add_word(&[Vertex::default(); 4]),
            Err(AngleUndetectable)
        );
        assert!(!field.is_initialized());
        assert_eq!(field.font_size(), None);
    }

    #[test]
    fn merging_never_shrinks_the_box() {
        let words = [
            rect([(20, 20), (60, 20), (60, 40), (20, 40)]),
            rect([(0, 25), (10, 25), (10, 35), (0, 35)]),
            rect([(30, 22), (35, 22), (35, 30), (30, 30)]),
            rect([(70, 10), (90, 10), (90, 50), (70, 50)]),
        ];
        let mut field = TextField::new("line", IMAGE);
        let mut previous: Option<BoxCoords> = None;
        for word in &words {
            field.add_word(word).expect("angle");
            let current = field.coords().expect("initialized");
            if let Some(previous) = previous {
                assert!(current.left <= previous.left);
                assert!(current.upper <= previous.upper);
                assert!(current.right >= previous.right);
                assert!(current.lower >= previous.lower);
            }
            previous = Some(current);
        }
        assert_eq!(previous, Some(BoxCoords::new(0, 10, 90, 50)));
    }

    #[test]
    fn raw_box_merge_from_unset() {
        let merged = RawBox::default().merge(BoxCoords::new(5, 6, 7, 8));
        assert_eq!(merged.left, Bound::Value(5));
        assert_eq!(merged.lower, Bound::Value(8));
        assert_eq!(RawBox::default().resolved(), None);
    }

    #[test]
    fn font_size_has_a_floor_of_one() {
        let mut field = TextField::new("tiny", IMAGE);
        field
            .add_word(&rect([(0, 0), (5, 0), (5, 1), (0, 1)]))
            .expect("angle");
        assert_eq!(field.font_size(), Some(1));
        assert_eq!(field.stroke_width(), Some(1));
    }
}
