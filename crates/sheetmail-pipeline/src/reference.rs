//! Recognition and extraction of external file references (Google Drive links).

use once_cell::sync::Lazy;
use regex::Regex;

static DRIVE_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https://drive\.google\.com/(file/d/|open\?id=)").expect("static regex")
});

static FILE_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"[-\w]{25,}").expect("static regex"));

/// First run of 25 or more word/hyphen characters in `cell`.
pub fn extract_identifier(cell: &str) -> Option<&str> {
    FILE_ID.find(cell).map(|m| m.as_str())
}

/// Whether `cell` has the Drive file URL shape and carries an identifier.
pub fn is_recognized_reference(cell: &str) -> bool {
    DRIVE_URL.is_match(cell) && extract_identifier(cell).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "abcdefghijklmnopqrstuvwxy";

    #[test]
    fn file_d_link_is_recognized() {
        let url = format!("https://drive.google.com/file/d/{ID}/view?usp=sharing");
        assert!(is_recognized_reference(&url));
        assert_eq!(extract_identifier(&url), Some(ID));
    }

    #[test]
    fn open_id_link_is_recognized() {
        let url = format!("https://drive.google.com/open?id=1{ID}");
        assert!(is_recognized_reference(&url));
        assert_eq!(extract_identifier(&url), Some(format!("1{ID}").as_str()));
    }

    #[test]
    fn identifier_may_contain_hyphen_and_underscore() {
        let url = "https://drive.google.com/file/d/1a-B_c2d3E4f5G6h7I8j9K0lMn/view";
        assert_eq!(
            extract_identifier(url),
            Some("1a-B_c2d3E4f5G6h7I8j9K0lMn")
        );
    }

    #[test]
    fn shape_without_identifier_is_rejected() {
        assert!(!is_recognized_reference("https://drive.google.com/file/d/short"));
    }

    #[test]
    fn other_hosts_and_schemes_are_rejected() {
        assert!(!is_recognized_reference(&format!("http://drive.google.com/file/d/{ID}")));
        assert!(!is_recognized_reference(&format!("https://docs.google.com/file/d/{ID}")));
        assert!(!is_recognized_reference(&format!(" https://drive.google.com/file/d/{ID}")));
        assert!(!is_recognized_reference(&format!("https://drive.google.com/drive/folders/{ID}")));
    }

    #[test]
    fn identifier_needs_twenty_five_characters() {
        assert_eq!(extract_identifier(&ID[..24]), None);
        assert_eq!(extract_identifier(ID), Some(ID));
    }
}
