use std::cmp::Ordering;
use std::ffi::OsStr;
use std::path::Path;

/// Image extensions counted as pages (lowercase, without the dot).
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "webp"];

/// Archive extensions treated as book containers (lowercase, without the dot).
pub const ARCHIVE_EXTENSIONS: &[&str] = &["zip", "cbz", "rar", "cbr", "7z", "cb7"];

pub fn is_hidden(path: &Path) -> bool {
    path.file_name().and_then(OsStr::to_str).map(|name| name.starts_with('.')).unwrap_or(false)
}

pub fn is_hidden_name(name: &str) -> bool {
    match name.rsplit_once('/') {
        Some((_, last)) => last.starts_with('.'),
        None => name.starts_with('.'),
    }
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension().and_then(OsStr::to_str).map(|ext| ext.to_ascii_lowercase())
}

pub fn is_supported_image(path: &Path) -> bool {
    extension_of(path).map(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str())).unwrap_or(false)
}

pub fn is_supported_image_name(name: &str) -> bool {
    is_supported_image(Path::new(name))
}

pub fn is_supported_archive(path: &Path) -> bool {
    extension_of(path).map(|ext| ARCHIVE_EXTENSIONS.contains(&ext.as_str())).unwrap_or(false)
}

/// Natural ordering over entry names: the single source of truth for page
/// ordinals.
///
/// Walks both names left to right. When both cursors sit on digits, the full
/// contiguous digit runs are compared by numeric value, so `"2" < "10"`.
/// Other characters compare case-insensitively by code point. On an
/// otherwise-equal prefix the shorter name sorts first. Equal-valued digit
/// runs fall back to run length, and fully equal keys to the raw bytes, so
/// the order is total and stable across rescans.
pub fn natural_cmp(left: &str, right: &str) -> Ordering {
    let l: Vec<char> = left.chars().collect();
    let r: Vec<char> = right.chars().collect();
    let mut i = 0;
    let mut j = 0;

    while i < l.len() && j < r.len() {
        if l[i].is_ascii_digit() && r[j].is_ascii_digit() {
            let li = i;
            while i < l.len() && l[i].is_ascii_digit() {
                i += 1;
            }
            let rj = j;
            while j < r.len() && r[j].is_ascii_digit() {
                j += 1;
            }
            match cmp_digit_runs(&l[li..i], &r[rj..j]) {
                Ordering::Equal => {}
                other => return other,
            }
        } else {
            let a = l[i].to_ascii_lowercase();
            let b = r[j].to_ascii_lowercase();
            match a.cmp(&b) {
                Ordering::Equal => {
                    i += 1;
                    j += 1;
                }
                other => return other,
            }
        }
    }

    (l.len() - i).cmp(&(r.len() - j)).then_with(|| left.cmp(right))
}

/// Compare two digit runs numerically without parsing, so arbitrarily long
/// runs cannot overflow.
fn cmp_digit_runs(a: &[char], b: &[char]) -> Ordering {
    let a_sig = strip_leading_zeros(a);
    let b_sig = strip_leading_zeros(b);

    a_sig
        .len()
        .cmp(&b_sig.len())
        .then_with(|| a_sig.cmp(b_sig))
        .then_with(|| a.len().cmp(&b.len()))
}

fn strip_leading_zeros(run: &[char]) -> &[char] {
    let first = run.iter().position(|&c| c != '0').unwrap_or(run.len());
    &run[first..]
}
