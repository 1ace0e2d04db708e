mod angle;
mod field;

use tracing::debug;

use crate::vision::Word;

pub use angle::{AngleUndetectable, SnappedAngle, detect_angle};
pub use field::{Bound, BoxCoords, DEFAULT_PADDING, ImageSize, RawBox, TextField};

#[derive(Debug, Clone, Default)]
pub struct Reconstruction {
    pub fields: Vec<TextField>,
    pub consumed_words: usize,
    pub notes: Vec<String>,
}

/// Lines of the provider's full text. Trailing newlines are dropped.
pub fn split_lines(full_text: &str) -> Vec<&str> {
    full_text.trim_end_matches('\n').split('\n').collect()
}

/// Builds one field per line from the reading-order word list.
///
/// Words are consumed greedily while the rest of the line starts with the
/// next word's text. Consumption for a line stops at the first mismatch and
/// the cursor is shared across lines, so a divergent word also stalls every
/// following line.
pub fn reconstruct(
    lines: &[&str],
    words: &[Word],
    image: ImageSize,
    padding: i32,
) -> Reconstruction {
    let mut cursor = 0usize;
    let mut fields = Vec::with_capacity(lines.len());
    let mut notes = Vec::new();

    for line in lines {
        let mut field = TextField::with_padding(*line, image, padding);
        let mut remaining: &str = line;

        while let Some(word) = words.get(cursor) {
            let Some(rest) = remaining.strip_prefix(word.text.as_str()) else {
                break;
            };
            cursor += 1;
            remaining = rest.trim_start();
            if field.add_word(&word.polygon).is_err() {
                debug!("skipping word {:?}: angle is undetectable", word.text);
                notes.push(format!("angle for `{}` is undetectable", word.text));
            }
        }

        fields.push(field);
    }

    Reconstruction {
        fields,
        consumed_words: cursor,
        notes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::Vertex;

    const IMAGE: ImageSize = ImageSize {
        width: 300,
        height: 200,
    };

    fn word(text: &str, left: i32, upper: i32, right: i32, lower: i32) -> Word {
        Word {
            text: text.to_string(),
            polygon: [
                Vertex::new(left, upper),
                Vertex::new(right, upper),
                Vertex::new(right, lower),
                Vertex::new(left, lower),
            ],
        }
    }

    #[test]
    fn split_drops_trailing_newline() {
        assert_eq!(split_lines("HELLO\nWORLD\n"), vec!["HELLO", "WORLD"]);
        assert_eq!(split_lines("one"), vec!["one"]);
        assert_eq!(split_lines("a\n\nb"), vec!["a", "", "b"]);
        assert_eq!(split_lines(""), vec![""]);
    }

    #[test]
    fn single_word_line() {
        let words = vec![word("HELLO", 0, 0, 50, 20)];
        let result = reconstruct(&["HELLO"], &words, IMAGE, DEFAULT_PADDING);

        assert_eq!(result.consumed_words, 1);
        assert!(result.notes.is_empty());
        let field = &result.fields[0];
        assert_eq!(field.angle(), SnappedAngle::Deg0);
        assert_eq!(field.coords(), Some(BoxCoords::new(0, 0, 50, 20)));
        assert_eq!(field.font_size(), Some(24));
    }

    #[test]
    fn words_are_merged_per_line() {
        let words = vec![
            word("Hello", 10, 10, 60, 30),
            word("there,", 65, 12, 120, 32),
            word("world", 10, 50, 70, 70),
        ];
        let lines = split_lines("Hello there,\nworld\n");
        let result = reconstruct(&lines, &words, IMAGE, DEFAULT_PADDING);

        assert_eq!(result.consumed_words, 3);
        assert_eq!(result.fields.len(), 2);
        assert_eq!(result.fields[0].text, "Hello there,");
        assert_eq!(
            result.fields[0].coords(),
            Some(BoxCoords::new(10, 10, 120, 32))
        );
        assert_eq!(
            result.fields[1].coords(),
            Some(BoxCoords::new(10, 50, 70, 70))
        );
    }

    #[test]
    fn undetectable_word_is_noted_and_skipped() {
        let mut broken = word("lost", 0, 0, 0, 0);
        broken.polygon = [Vertex::default(); 4];
        let words = vec![broken, word("found", 40, 0, 90, 20)];
        let result = reconstruct(&["lost found"], &words, IMAGE, DEFAULT_PADDING);

        assert_eq!(result.consumed_words, 2);
        assert_eq!(result.notes, vec!["angle for `lost` is undetectable"]);
        assert_eq!(
            result.fields[0].coords(),
            Some(BoxCoords::new(40, 0, 90, 20))
        );
    }

    #[test]
    fn line_without_words_stays_uninitialized() {
        let words = vec![word("alpha", 0, 0, 40, 10)];
        let result = reconstruct(&["alpha", "beta"], &words, IMAGE, DEFAULT_PADDING);

        assert!(result.fields[0].is_initialized());
        assert!(!result.fields[1].is_initialized());
    }

    // Prefix matching is strict: when the provider splits a word differently
    // from the line text, the line stops consuming and later lines stall too.
    #[test]
    fn mismatch_stops_consumption_for_the_rest_of_the_image() {
        let words = vec![
            word("foo", 0, 0, 30, 10),
            word("bar!", 35, 0, 70, 10),
            word("baz", 0, 20, 30, 30),
        ];
        let result = reconstruct(&["foo bar !", "baz"], &words, IMAGE, DEFAULT_PADDING);

        assert_eq!(result.consumed_words, 1);
        assert_eq!(
            result.fields[0].coords(),
            Some(BoxCoords::new(0, 0, 30, 10))
        );
        assert!(!result.fields[1].is_initialized());
    }

    #[test]
    fn every_initialized_field_consumed_a_word() {
        let words = vec![
            word("a", 0, 0, 10, 10),
            word("b", 0, 20, 10, 30),
            word("c", 20, 20, 30, 30),
        ];
        let result = reconstruct(&["a", "b c", "d"], &words, IMAGE, DEFAULT_PADDING);
        let initialized = result
            .fields
            .iter()
            .filter(|field| field.is_initialized())
            .count();
        assert_eq!(initialized, 2);
        assert!(initialized <= result.consumed_words);
    }
}
