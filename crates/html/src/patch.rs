//! In-place filling of image placeholders.

use regex::Regex;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use deck_core::{Error, Result};

fn escape_attr(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Replace the content of the placeholder tagged `slot_id` with an image.
///
/// Returns `Ok(false)` and leaves the file untouched when no placeholder
/// carries that id. Only the first matching marker is rewritten.
pub fn patch_image(html_path: &Path, slot_id: &str, image_url: &str) -> Result<bool> {
    let content = fs::read_to_string(html_path)?;

    let pattern = format!(
        r#"(<div[^>]*data-slot-id="{}"[^>]*>)[\s\S]*?(</div>)"#,
        regex::escape(slot_id)
    );
    let re = Regex::new(&pattern).map_err(|e| Error::TemplateError(e.to_string()))?;

    let Some(caps) = re.captures(&content) else {
        log::warn!("Slot {} not found in {}", slot_id, html_path.display());
        return Ok(false);
    };
    let (Some(whole), Some(open), Some(close)) = (caps.get(0), caps.get(1), caps.get(2)) else {
        return Ok(false);
    };

    let mut patched = String::with_capacity(content.len() + image_url.len() + 64);
    patched.push_str(&content[..whole.start()]);
    patched.push_str(open.as_str());
    patched.push_str(&format!(
        "<img src=\"{}\" alt=\"配图\" />",
        escape_attr(image_url)
    ));
    patched.push_str(close.as_str());
    patched.push_str(&content[whole.end()..]);

    let mut writer = BufWriter::new(File::create(html_path)?);
    writer.write_all(patched.as_bytes())?;
    writer.flush()?;

    log::info!("Patched slot {} with {}", slot_id, image_url);
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"<section>
<div class="image-slot" data-slot-id="p1_slot1" style="left:4%"><span>[配图区域]</span></div>
<div class="image-slot" data-slot-id="p1_slot10" style="left:9%"><span>[配图区域]</span></div>
</section>"#;

    #[test]
    fn test_similar_ids_are_not_confused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.html");
        fs::write(&path, DOC).unwrap();

        assert!(patch_image(&path, "p1_slot10", "img/a.png").unwrap());
        let html = fs::read_to_string(&path).unwrap();
        assert!(html.contains(
            r#"data-slot-id="p1_slot10" style="left:9%"><img src="img/a.png" alt="配图" /></div>"#
        ));
        assert!(html.contains(
            r#"data-slot-id="p1_slot1" style="left:4%"><span>[配图区域]</span></div>"#
        ));
    }

    #[test]
    fn test_url_is_escaped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.html");
        fs::write(&path, DOC).unwrap();

        assert!(patch_image(&path, "p1_slot1", "a.png\" onerror=\"x").unwrap());
        let html = fs::read_to_string(&path).unwrap();
        assert!(html.contains(r#"src="a.png&quot; onerror=&quot;x""#));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(patch_image(&dir.path().join("nope.html"), "p0_slot0", "a.png").is_err());
    }
}
