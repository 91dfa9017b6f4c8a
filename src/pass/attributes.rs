//! Removal of event-handler and other script-capable attributes.

use regex::Regex;

use super::compile;

/// Attribute names capable of executing script when rendered: the `on*`
/// event handlers plus `style`, `xmlns`, `formaction`, `form`,
/// `xlink:href`, and two legacy plugin hooks.
pub(crate) const EVIL_ATTRIBUTES: &[&str] = &[
    "onafterprint", "onbeforeprint", "onbeforeunload", "onerror",
    "onhaschange", "onload", "onmessage", "onoffline", "ononline",
    "onpagehide", "onpageshow", "onpopstate", "onredo", "onresize",
    "onstorage", "onundo", "onunload", "onblur", "onchange",
    "oncontextmenu", "onfocus", "onformchange", "onforminput", "oninput",
    "oninvalid", "onreset", "onselect", "onsubmit", "onkeydown",
    "onkeypress", "onkeyup", "onclick", "ondblclick", "ondrag",
    "ondragend", "ondragenter", "ondragleave", "ondragover", "ondragstart",
    "ondrop", "onmousedown", "onmousemove", "onmouseout", "onmouseover",
    "onmouseup", "onmousewheel", "onscroll", "onabort", "oncanplay",
    "oncanplaythrough", "ondurationchange", "onemptied", "onended",
    "onloadeddata", "onloadedmetadata", "onloadstart", "onpause", "onplay",
    "onplaying", "onprogress", "onratechange", "onreadystatechange",
    "onseeked", "onseeking", "onstalled", "onsuspend", "ontimeupdate",
    "onvolumechange", "onwaiting", "style", "xmlns", "formaction", "form",
    "xlink:href", "FSCommand", "seekSegmentTime",
];

/// Deletes evil-attribute fragments from surrounding tag text, looping
/// until no fragment remains.
///
/// In image context `xmlns` is exempted: Adobe Photoshop writes namespaced
/// XMP metadata into JFIF images, and flagging it would reject every such
/// upload.
pub(crate) struct EvilAttributeRemover {
    quoted: Regex,
    unquoted: Regex,
    quoted_image: Regex,
    unquoted_image: Regex,
}

impl EvilAttributeRemover {
    pub(crate) fn new() -> Self {
        let full = EVIL_ATTRIBUTES.join("|");
        let image: Vec<&str> = EVIL_ATTRIBUTES
            .iter()
            .copied()
            .filter(|name| *name != "xmlns")
            .collect();
        let image = image.join("|");
        Self {
            quoted: Self::quoted_pattern(&full),
            unquoted: Self::unquoted_pattern(&full),
            quoted_image: Self::quoted_pattern(&image),
            unquoted_image: Self::unquoted_pattern(&image),
        }
    }

    fn quoted_pattern(names: &str) -> Regex {
        compile(&format!(r#"(?is)({names})\s*=\s*("[^"]*"|'[^']*')"#))
    }

    fn unquoted_pattern(names: &str) -> Regex {
        compile(&format!(r"(?is)({names})\s*=\s*([^\s>]*)"))
    }

    /// Removes every evil-attribute fragment. Returns `None` when the cap
    /// is exhausted or a pathological fragment set overflows the regex
    /// compiler.
    pub(crate) fn remove(&self, input: &str, is_image: bool, limit: usize) -> Option<String> {
        let (quoted, unquoted) = if is_image {
            (&self.quoted_image, &self.unquoted_image)
        } else {
            (&self.quoted, &self.unquoted)
        };

        let mut s = input.to_string();
        for _ in 0..limit {
            let mut fragments: Vec<String> = quoted
                .find_iter(&s)
                .map(|m| regex::escape(m.as_str()))
                .collect();
            fragments.extend(
                unquoted.find_iter(&s).map(|m| regex::escape(m.as_str())),
            );
            if fragments.is_empty() {
                return Some(s);
            }

            let pattern = format!(
                r"(?i)(<?)(/?[^><]+?)([^A-Za-z<>\-])(.*?)({})(.*?)([\s><]?)([><]*)",
                fragments.join("|")
            );
            let re = Regex::new(&pattern).ok()?;
            let replaced = re
                .replace_all(&s, "${1}${2}${3}${4}${6}${7}${8}")
                .into_owned();
            if replaced == s {
                return Some(s);
            }
            s = replaced;
        }
        None
    }
}
