// Unit tests for window constants and the external-open filter

use crate::window::{
    BACKGROUND, MIN_WINDOW_HEIGHT, MIN_WINDOW_WIDTH, WINDOW_HEIGHT, WINDOW_WIDTH,
    is_external_openable,
};

use url::Url;

/// **VALUE**: Verifies web links and mail links leave the app.
///
/// **WHY THIS MATTERS**: `target="_blank"` links in the dashboard should land in the user's
/// browser, not in a second, unhardened webview.
#[test]
fn given_web_and_mail_urls_when_checked_then_openable() {
    for raw in [
        "https://example.com/docs",
        "http://localhost:3457/report",
        "mailto:ops@example.com",
    ] {
        let url = Url::parse(raw).unwrap();
        assert!(is_external_openable(&url), "{raw} should open externally");
    }
}

/// **VALUE**: Verifies local and script schemes are never handed to the OS.
///
/// **BUG THIS CATCHES**: Would catch the filter being dropped, which would let page content
/// launch `file://` paths or custom protocol handlers on the host.
#[test]
fn given_file_and_custom_schemes_when_checked_then_blocked() {
    for raw in [
        "file:///etc/passwd",
        "javascript:alert(1)",
        "vscode://file/tmp",
        "ftp://example.com/",
    ] {
        let url = Url::parse(raw).unwrap();
        assert!(!is_external_openable(&url), "{raw} must be blocked");
    }
}

#[test]
fn given_window_geometry_when_read_then_minimum_fits_inside_default() {
    assert_eq!((WINDOW_WIDTH, WINDOW_HEIGHT), (1440.0, 900.0));
    assert_eq!((MIN_WINDOW_WIDTH, MIN_WINDOW_HEIGHT), (1024.0, 680.0));
    assert!(MIN_WINDOW_WIDTH <= WINDOW_WIDTH && MIN_WINDOW_HEIGHT <= WINDOW_HEIGHT);
}

#[test]
fn given_background_when_read_then_matches_brand_color() {
    assert_eq!(BACKGROUND.0, 0x0a);
    assert_eq!(BACKGROUND.1, 0x0e);
    assert_eq!(BACKGROUND.2, 0x17);
    assert_eq!(BACKGROUND.3, 0xff);
}
