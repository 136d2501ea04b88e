//! 🔏 IRmark — a digest of the document, stapled inside the document.
//!
//! The revenue office wants proof the payroll submission wasn't tampered with
//! in transit, so the submission carries a SHA-1 of itself. Of itself minus the
//! SHA-1, obviously. We are not trying to solve a fixed-point equation today.
//!
//! Order of operations, and it matters:
//! 1. parse, and remove any stale `IRmark` already in the header,
//! 2. canonical serialization ([`crate::xml`]), SHA-1 over the UTF-8 bytes,
//! 3. lowercase hex, two digits per byte,
//! 4. `<IRmark Type="generic">…</IRmark>` inserted as the FIRST child of the header,
//! 5. serialize again.
//!
//! Stripping the mark and serializing gives back the step-2 bytes exactly.

use sha1::{Digest, Sha1};
use tracing::debug;

use crate::error::{IntegrationError, Result};
use crate::xml::{XmlDocument, XmlElement, XmlNode};

pub const IRMARK_ELEMENT: &str = "IRmark";
pub const HEADER_ELEMENT: &str = "IRheader";
/// 🧭 Where the header lives under `GovTalkMessage`.
pub const DEFAULT_HEADER_PATH: &[&str] = &["Body", "IRenvelope", HEADER_ELEMENT];

/// 🔢 SHA-1 of the canonical serialization, lowercase hex.
pub fn compute_irmark(document: &XmlDocument) -> String {
    let canonical = document.to_canonical_string();
    format!("{:x}", Sha1::digest(canonical.as_bytes()))
}

/// 🔏 Embed the IRmark into the header found at [`DEFAULT_HEADER_PATH`]
/// (or the first `IRheader` anywhere, for envelopes that nest differently).
pub fn embed_irmark(xml: &str) -> Result<String> {
    embed_irmark_at(xml, DEFAULT_HEADER_PATH)
}

pub fn embed_irmark_at(xml: &str, header_path: &[&str]) -> Result<String> {
    let mut document = XmlDocument::parse(xml)?;
    let stale = header_of(&mut document.root, header_path)?.remove_children_named(IRMARK_ELEMENT);
    if stale > 0 {
        debug!("🔏 dropped {stale} stale IRmark element(s) before digesting");
    }

    let mark = compute_irmark(&document);
    debug!("🔏 IRmark computed: {mark}");

    let header = header_of(&mut document.root, header_path)?;
    header.insert_child(
        0,
        XmlNode::Element(XmlElement::leaf(IRMARK_ELEMENT, mark).attr("Type", "generic")),
    );
    Ok(document.to_canonical_string())
}

/// 🗑️ Remove the IRmark and reserialize.
pub fn strip_irmark(xml: &str) -> Result<String> {
    let mut document = XmlDocument::parse(xml)?;
    header_of(&mut document.root, DEFAULT_HEADER_PATH)?.remove_children_named(IRMARK_ELEMENT);
    Ok(document.to_canonical_string())
}

/// 🔍 The IRmark value currently in the document, if any.
pub fn read_irmark(document: &XmlDocument) -> Option<String> {
    document
        .root
        .find_first(HEADER_ELEMENT)
        .and_then(|header| header.child_element(IRMARK_ELEMENT))
        .map(XmlElement::text_content)
}

fn header_of<'a>(root: &'a mut XmlElement, header_path: &[&str]) -> Result<&'a mut XmlElement> {
    let found = if root.find_path(header_path).is_some() {
        root.find_path_mut(header_path)
    } else {
        let last = header_path.last().copied().unwrap_or(HEADER_ELEMENT);
        root.find_first_mut(last)
    };
    found.ok_or_else(|| {
        IntegrationError::Validation(format!(
            "no '{}' element to carry the IRmark",
            header_path.join("/")
        ))
    })
}
