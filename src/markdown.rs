/*!
 * Markdown segmentation and reassembly.
 *
 * A markdown cell's source is split into an ordered list of segments, each
 * holding the exact bytes it was cut from. Segments are one of:
 *
 * - a text block: a run of prose lines (a paragraph, a heading, a list, a fenced
 *   code block including any blank lines inside the fence)
 * - an image block: one `![alt](src)` reference
 * - a blank separator: one or more blank lines between blocks
 *
 * A line made only of image references is cut out of its paragraph; the first
 * of its images carries the line as `raw` and the others carry an empty `raw`.
 * Images written inside prose stay part of the text block and are listed,
 * with an empty `raw`, right after it.
 *
 * Concatenating the segments' `raw` text reproduces the source byte for byte.
 * Reassembly re-emits every segment verbatim and places any generated content,
 * under its caption, directly below the block it belongs to.
 */

use once_cell::sync::Lazy;
use regex::Regex;

// @const: An image reference, optionally titled
static IMAGE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"!\[(?P<alt>[^\]]*)\]\((?P<src><[^>]*>|[^)\s]+)(?:\s+(?:"[^"]*"|'[^']*'))?\)"#).unwrap()
});

// @const: ATX heading
static HEADING_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^ {0,3}#{1,6}(\s|$)").unwrap());

/// Typed content of a segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkdownBlock {
    /// Prose to translate; `content` is the block without its final line break
    Text { content: String },
    /// Image reference to describe
    Image { alt_text: String, source_ref: String },
    /// Blank lines separating blocks; never sent to a model
    Blank,
}

impl MarkdownBlock {
    pub fn is_blank(&self) -> bool {
        matches!(self, Self::Blank)
    }
}

/// A block together with the exact source text it was cut from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub block: MarkdownBlock,
    pub raw: String,
}

impl Segment {
    fn text(raw: String) -> Self {
        let content = raw.trim_end_matches(['\n', '\r']).to_string();
        Self {
            block: MarkdownBlock::Text { content },
            raw,
        }
    }

    fn blank(raw: String) -> Self {
        Self {
            block: MarkdownBlock::Blank,
            raw,
        }
    }

    fn image(image: ImageRef, raw: String) -> Self {
        Self {
            block: MarkdownBlock::Image {
                alt_text: image.alt_text,
                source_ref: image.source_ref,
            },
            raw,
        }
    }
}

/// An image reference found on a line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub alt_text: String,
    pub source_ref: String,
    /// Byte range of the reference within the line
    pub span: std::ops::Range<usize>,
}

/// Generated content attached below a block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Augmentation {
    /// Caption line, e.g. `**Translation:**`
    pub label: &'static str,
    /// Generated text (translation, description, or failure note)
    pub body: String,
}

/// Open fenced code block: fence character and run length
#[derive(Debug, Clone, Copy)]
struct Fence {
    marker: char,
    len: usize,
}

impl Fence {
    fn open(line: &str) -> Option<Self> {
        let trimmed = line.trim_start_matches(' ');
        if line.len() - trimmed.len() > 3 {
            return None;
        }
        let marker = trimmed.chars().next()?;
        if marker != '`' && marker != '~' {
            return None;
        }
        let len = trimmed.chars().take_while(|c| *c == marker).count();
        (len >= 3).then_some(Self { marker, len })
    }

    fn closes(&self, line: &str) -> bool {
        let trimmed = line.trim();
        let len = trimmed.chars().take_while(|c| *c == self.marker).count();
        len >= self.len && trimmed.chars().skip(len).all(char::is_whitespace)
    }
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// Find every image reference on a line, skipping those inside inline code spans
pub fn find_images(line: &str) -> Vec<ImageRef> {
    IMAGE_REGEX
        .captures_iter(line)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let in_code_span = line[..whole.start()].matches('`').count() % 2 == 1;
            if in_code_span {
                return None;
            }
            let src = caps.name("src")?.as_str();
            let src = src.strip_prefix('<').and_then(|s| s.strip_suffix('>')).unwrap_or(src);
            Some(ImageRef {
                alt_text: caps.name("alt")?.as_str().to_string(),
                source_ref: src.to_string(),
                span: whole.range(),
            })
        })
        .collect()
}

/// Whether `line` holds nothing but the given image references and whitespace
fn is_image_only(line: &str, images: &[ImageRef]) -> bool {
    if images.is_empty() || line.len() - line.trim_start_matches(' ').len() > 3 {
        return false;
    }
    let mut cursor = 0;
    for image in images {
        if !line[cursor..image.span.start].trim().is_empty() {
            return false;
        }
        cursor = image.span.end;
    }
    line[cursor..].trim().is_empty()
}

/// Accumulates segments while scanning lines
#[derive(Default)]
struct Segmenter {
    segments: Vec<Segment>,
    text: String,
    // Images found inside the prose currently held in `text`
    inline_images: Vec<Segment>,
    blank: String,
}

impl Segmenter {
    fn flush_text(&mut self) {
        if !self.text.is_empty() {
            self.segments.push(Segment::text(std::mem::take(&mut self.text)));
        }
        self.segments.append(&mut self.inline_images);
    }

    fn flush_blank(&mut self) {
        if !self.blank.is_empty() {
            self.segments.push(Segment::blank(std::mem::take(&mut self.blank)));
        }
    }

    fn push_images(&mut self, line: &str, images: Vec<ImageRef>) {
        for (i, image) in images.into_iter().enumerate() {
            let raw = if i == 0 { line.to_string() } else { String::new() };
            self.segments.push(Segment::image(image, raw));
        }
    }
}

/// Split markdown source into ordered segments
pub fn segment(source: &str) -> Vec<Segment> {
    let mut state = Segmenter::default();
    let mut fence: Option<Fence> = None;

    for line in source.split_inclusive('\n') {
        if let Some(open) = fence {
            state.text.push_str(line);
            if open.closes(line) {
                fence = None;
            }
            continue;
        }

        if is_blank(line) {
            state.flush_text();
            state.blank.push_str(line);
            continue;
        }
        state.flush_blank();

        if let Some(open) = Fence::open(line) {
            fence = Some(open);
            state.text.push_str(line);
            continue;
        }

        let images = find_images(line);

        if is_image_only(line, &images) {
            state.flush_text();
            state.push_images(line, images);
            continue;
        }

        let inline = images.into_iter().map(|image| Segment::image(image, String::new()));

        // Headings stand alone so they translate as their own unit
        if HEADING_REGEX.is_match(line) {
            state.flush_text();
            state.segments.push(Segment::text(line.to_string()));
            state.segments.extend(inline);
            continue;
        }

        state.text.push_str(line);
        state.inline_images.extend(inline);
    }

    state.flush_text();
    state.flush_blank();
    state.segments
}

/// Concatenate segments back into source text
pub fn join(segments: &[Segment]) -> String {
    segments.iter().map(|s| s.raw.as_str()).collect()
}

/// Rebuild markdown with generated content below the blocks it belongs to.
///
/// `augmentations[i]` belongs to `segments[i]`; missing entries mean no
/// augmentation. Original segments are never altered or reordered.
pub fn reassemble(segments: &[Segment], augmentations: &[Option<Augmentation>]) -> String {
    let mut out = String::new();
    let mut ends_with_augmentation = false;

    for (index, segment) in segments.iter().enumerate() {
        if !segment.raw.is_empty() {
            out.push_str(&segment.raw);
            ends_with_augmentation = false;
        }

        let Some(augmentation) = augmentations.get(index).and_then(Option::as_ref) else {
            continue;
        };

        if !out.ends_with('\n') {
            out.push('\n');
        }
        if !out.ends_with("\n\n") {
            out.push('\n');
        }
        out.push_str(augmentation.label);
        out.push('\n');
        out.push_str(augmentation.body.trim_end());
        out.push('\n');

        // Keep generated text from running into a directly following block
        let next_is_blank = segments.get(index + 1).is_none_or(|s| s.block.is_blank());
        if !next_is_blank {
            out.push('\n');
        }
        ends_with_augmentation = true;
    }

    let source_ends_with_newline = segments
        .iter()
        .rev()
        .find(|s| !s.raw.is_empty())
        .is_some_and(|s| s.raw.ends_with('\n'));
    if ends_with_augmentation && !source_ends_with_newline {
        out.pop();
    }
    out
}
