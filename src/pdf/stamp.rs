use anyhow::{Context, Result};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};

/// Resource name the stamp font is registered under on each stamped page.
pub const FONT_RESOURCE_NAME: &str = "FStamp";

// Guards against cyclic /Parent chains in malformed page trees
const MAX_TREE_DEPTH: usize = 32;

const US_LETTER: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

/// Where the stamp baseline sits on the page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Placement {
    /// Fixed distance above the bottom edge
    Bottom { y: f32 },
    /// Fixed distance below the top edge
    Top { offset: f32 },
}

impl Placement {
    /// Baseline y coordinate for a page with the given MediaBox
    pub fn baseline(&self, media_box: [f32; 4]) -> f32 {
        let [_, lower_y, _, upper_y] = media_box;
        match *self {
            Placement::Bottom { y } => lower_y + y,
            Placement::Top { offset } => upper_y - offset,
        }
    }
}

impl Default for Placement {
    fn default() -> Self {
        Placement::Bottom { y: 20.0 }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StampOptions {
    pub x: f32,
    pub font_size: f32,
    pub placement: Placement,
}

impl Default for StampOptions {
    fn default() -> Self {
        StampOptions {
            x: 20.0,
            font_size: 12.0,
            placement: Placement::default(),
        }
    }
}

/// A text stamp bound to one document.
///
/// The Helvetica font object is added to the document once, on `prepare`,
/// and shared by every page the stamp is applied to.
pub struct TextStamp<'a> {
    text: &'a str,
    options: &'a StampOptions,
    font_id: ObjectId,
}

impl<'a> TextStamp<'a> {
    pub fn prepare(doc: &mut Document, text: &'a str, options: &'a StampOptions) -> Self {
        let font_id = doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Font".to_vec())),
            ("Subtype", Object::Name(b"Type1".to_vec())),
            ("BaseFont", Object::Name(b"Helvetica".to_vec())),
            ("Encoding", Object::Name(b"WinAnsiEncoding".to_vec())),
        ]));

        TextStamp {
            text,
            options,
            font_id,
        }
    }

    /// Draw the text on a single page
    pub fn apply(&self, doc: &mut Document, page_id: ObjectId) -> Result<()> {
        let media_box = media_box(doc, page_id);
        let y = self.options.placement.baseline(media_box);
        let x = media_box[0] + self.options.x;

        self.register_font(doc, page_id)?;

        // Isolate the page's own graphics state from ours
        let save = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
        let content = Content {
            operations: vec![
                Operation::new("Q", vec![]),
                Operation::new("q", vec![]),
                Operation::new("BT", vec![]),
                Operation::new(
                    "Tf",
                    vec![
                        Object::Name(FONT_RESOURCE_NAME.as_bytes().to_vec()),
                        Object::Real(self.options.font_size),
                    ],
                ),
                Operation::new("Td", vec![Object::Real(x), Object::Real(y)]),
                Operation::new(
                    "Tj",
                    vec![Object::String(encode_text(self.text), StringFormat::Literal)],
                ),
                Operation::new("ET", vec![]),
                Operation::new("Q", vec![]),
            ],
        };
        let encoded = content.encode().context("Failed to encode stamp content")?;
        let stamp = doc.add_object(Stream::new(Dictionary::new(), encoded));

        wrap_contents(doc, page_id, save, stamp)
    }

    fn register_font(&self, doc: &mut Document, page_id: ObjectId) -> Result<()> {
        // Copy inherited or shared resources onto the page so the change
        // stays local to it
        let mut resources = match inherited_attribute(doc, page_id, b"Resources") {
            Some(Object::Dictionary(dict)) => dict.clone(),
            _ => Dictionary::new(),
        };

        let mut fonts = match resources.get(b"Font") {
            Ok(Object::Dictionary(dict)) => dict.clone(),
            Ok(Object::Reference(id)) => doc
                .get_dictionary(*id)
                .cloned()
                .unwrap_or_else(|_| Dictionary::new()),
            _ => Dictionary::new(),
        };
        fonts.set(FONT_RESOURCE_NAME, Object::Reference(self.font_id));
        resources.set("Font", Object::Dictionary(fonts));

        doc.get_dictionary_mut(page_id)
            .context("Page object is not a dictionary")?
            .set("Resources", Object::Dictionary(resources));
        Ok(())
    }
}

/// WinAnsi code points 0x80..=0x9F that differ from Latin-1
const WIN_ANSI_EXTRAS: [(char, u8); 27] = [
    ('€', 0x80),
    ('‚', 0x82),
    ('ƒ', 0x83),
    ('„', 0x84),
    ('…', 0x85),
    ('†', 0x86),
    ('‡', 0x87),
    ('ˆ', 0x88),
    ('‰', 0x89),
    ('Š', 0x8A),
    ('‹', 0x8B),
    ('Œ', 0x8C),
    ('Ž', 0x8E),
    ('‘', 0x91),
    ('’', 0x92),
    ('“', 0x93),
    ('”', 0x94),
    ('•', 0x95),
    ('–', 0x96),
    ('—', 0x97),
    ('˜', 0x98),
    ('™', 0x99),
    ('š', 0x9A),
    ('›', 0x9B),
    ('œ', 0x9C),
    ('ž', 0x9E),
    ('Ÿ', 0x9F),
];

/// Encode text for a WinAnsi literal string; unsupported characters become '?'
fn encode_text(text: &str) -> Vec<u8> {
    text.chars().map(win_ansi_byte).collect()
}

fn win_ansi_byte(c: char) -> u8 {
    match u32::from(c) {
        // Printable ASCII and Latin-1 above the C1 controls map straight through
        code @ (0x20..=0x7E | 0xA0..=0xFF) => code as u8,
        _ => WIN_ANSI_EXTRAS
            .iter()
            .find(|&&(extra, _)| extra == c)
            .map_or(b'?', |&(_, byte)| byte),
    }
}

/// Page MediaBox, falling back to US Letter when missing or malformed
fn media_box(doc: &Document, page_id: ObjectId) -> [f32; 4] {
    let Some(Object::Array(values)) = inherited_attribute(doc, page_id, b"MediaBox") else {
        return US_LETTER;
    };

    let numbers: Vec<f32> = values
        .iter()
        .filter_map(|obj| match obj {
            Object::Integer(i) => Some(*i as f32),
            Object::Real(r) => Some(*r),
            _ => None,
        })
        .collect();

    match numbers.as_slice() {
        &[a, b, c, d] => [a, b, c, d],
        _ => US_LETTER,
    }
}

/// Look up a page attribute, walking up the page tree for inheritable keys
fn inherited_attribute<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut node = doc.get_dictionary(page_id).ok();

    for _ in 0..MAX_TREE_DEPTH {
        let dict = node?;
        if let Ok(value) = dict.get(key) {
            return match value {
                Object::Reference(id) => doc.get_object(*id).ok(),
                other => Some(other),
            };
        }
        node = match dict.get(b"Parent") {
            Ok(Object::Reference(parent)) => doc.get_dictionary(*parent).ok(),
            _ => None,
        };
    }

    None
}

/// Surround the existing page content with `save` and append `stamp`
fn wrap_contents(doc: &mut Document, page_id: ObjectId, save: ObjectId, stamp: ObjectId) -> Result<()> {
    let page = doc
        .get_dictionary_mut(page_id)
        .context("Page object is not a dictionary")?;

    let contents = match page.get(b"Contents").ok().cloned() {
        Some(Object::Reference(existing)) => vec![
            Object::Reference(save),
            Object::Reference(existing),
            Object::Reference(stamp),
        ],
        Some(Object::Array(mut existing)) => {
            existing.insert(0, Object::Reference(save));
            existing.push(Object::Reference(stamp));
            existing
        }
        _ => vec![Object::Reference(save), Object::Reference(stamp)],
    };
    page.set("Contents", Object::Array(contents));

    Ok(())
}
