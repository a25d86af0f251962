use encoding_rs::{Encoding, SHIFT_JIS, UTF_8};

/// Decodes config text: BOM-declared encoding first, then UTF-8,
/// then Shift_JIS (spreadsheet exports from Japanese locales).
pub fn decode_text(bytes: &[u8]) -> String {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        let (text, _) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
        return text.into_owned();
    }

    if let Some(text) = UTF_8.decode_without_bom_handling_and_without_replacement(bytes) {
        return text.into_owned();
    }

    let (text, _, _) = SHIFT_JIS.decode(bytes);
    text.into_owned()
}
