//! Platform resolution from `User-Agent` and `X-App-Platform`.

use std::sync::LazyLock;

use cityquest_core::platform::Platform;
use regex::Regex;

/// Header the native apps send, formatted `type/version` (e.g. `ios/1.2.3`).
pub const APP_PLATFORM_HEADER: &str = "x-app-platform";

const UNKNOWN: &str = "Unknown";

// Patterns are literals; compilation cannot fail.
fn pattern(source: &str) -> Regex {
    Regex::new(source).expect("user-agent pattern is a valid regex")
}

static EDGE: LazyLock<Regex> = LazyLock::new(|| pattern(r"Edg(?:e|A|iOS)?/([\d.]+)"));
static OPERA: LazyLock<Regex> = LazyLock::new(|| pattern(r"(?:OPR|Opera)/([\d.]+)"));
static CHROME: LazyLock<Regex> = LazyLock::new(|| pattern(r"(?:Chrome|CriOS)/([\d.]+)"));
static FIREFOX: LazyLock<Regex> = LazyLock::new(|| pattern(r"(?:Firefox|FxiOS)/([\d.]+)"));
static SAFARI_VERSION: LazyLock<Regex> = LazyLock::new(|| pattern(r"Version/([\d.]+)"));
static WINDOWS_NT: LazyLock<Regex> = LazyLock::new(|| pattern(r"Windows NT (\d+\.\d+)"));
static MAC_OS: LazyLock<Regex> = LazyLock::new(|| pattern(r"Mac OS X (\d+(?:[._]\d+)*)"));
static IOS_VERSION: LazyLock<Regex> = LazyLock::new(|| pattern(r"\b(?:iOS|OS) (\d+(?:[._]\d+)*)"));
static ANDROID_VERSION: LazyLock<Regex> = LazyLock::new(|| pattern(r"Android (\d+(?:\.\d+)*)"));
static ANDROID_DEVICE: LazyLock<Regex> = LazyLock::new(|| pattern(r"Android [\d.]+; ([^;)]+)"));

/// NT kernel version to marketing name.
const WINDOWS_VERSIONS: &[(&str, &str)] = &[
    ("10.0", "10/11"),
    ("6.3", "8.1"),
    ("6.2", "8"),
    ("6.1", "7"),
];

/// Resolves the client platform.
///
/// An explicit app-platform header wins; a malformed or unsupported header
/// yields [`Platform::unknown`]. Without the header the user agent is
/// classified as a mobile or desktop browser.
#[must_use]
pub fn resolve(user_agent: Option<&str>, app_platform: Option<&str>) -> Platform {
    let user_agent = user_agent.unwrap_or_default();

    if let Some(header) = app_platform.map(str::trim).filter(|h| !h.is_empty()) {
        return resolve_native_app(header, user_agent);
    }

    let (browser, version) = detect_browser(user_agent);
    let browser = if is_mobile_browser(user_agent) && browser != UNKNOWN {
        format!("{browser} Mobile")
    } else {
        browser.to_owned()
    };
    Platform::web(&browser, &version, &detect_os(user_agent))
}

fn resolve_native_app(header: &str, user_agent: &str) -> Platform {
    let mut parts = header.split('/');
    let (Some(kind), Some(app_version), None) = (parts.next(), parts.next(), parts.next()) else {
        return Platform::unknown();
    };
    if app_version.is_empty() {
        return Platform::unknown();
    }

    match kind.to_ascii_lowercase().as_str() {
        "ios" => Platform::ios(
            app_version,
            &ios_version(user_agent).unwrap_or_else(|| UNKNOWN.to_owned()),
            ios_device(user_agent),
        ),
        "android" => Platform::android(
            app_version,
            capture(&ANDROID_VERSION, user_agent).unwrap_or(UNKNOWN),
            &android_device(user_agent).unwrap_or_else(|| UNKNOWN.to_owned()),
        ),
        _ => Platform::unknown(),
    }
}

fn is_mobile_browser(user_agent: &str) -> bool {
    ["Mobile", "Android", "iPhone", "iPad"]
        .iter()
        .any(|marker| user_agent.contains(marker))
}

/// Browser name and version. Edge and Opera embed a `Chrome/` token, and
/// Chrome embeds `Safari/`, so the checks run most-specific first.
fn detect_browser(user_agent: &str) -> (&'static str, String) {
    let candidates: [(&Regex, &'static str); 4] = [
        (&*EDGE, "Edge"),
        (&*OPERA, "Opera"),
        (&*CHROME, "Chrome"),
        (&*FIREFOX, "Firefox"),
    ];
    for (re, name) in candidates {
        if let Some(version) = capture(re, user_agent) {
            return (name, version.to_owned());
        }
    }

    if user_agent.contains("Safari/") {
        let version = capture(&SAFARI_VERSION, user_agent).unwrap_or(UNKNOWN);
        return ("Safari", version.to_owned());
    }

    (UNKNOWN, UNKNOWN.to_owned())
}

fn detect_os(user_agent: &str) -> String {
    if let Some(nt) = capture(&WINDOWS_NT, user_agent) {
        let name = WINDOWS_VERSIONS
            .iter()
            .find(|(version, _)| *version == nt)
            .map_or_else(|| format!("NT {nt}"), |(_, name)| (*name).to_owned());
        return format!("Windows {name}");
    }
    if user_agent.contains("Windows") {
        return "Windows".to_owned();
    }
    // iOS user agents also mention "Mac OS X"; Android ones mention "Linux".
    if ["iPhone", "iPad", "iPod"]
        .iter()
        .any(|device| user_agent.contains(device))
    {
        return ios_version(user_agent).map_or_else(|| "iOS".to_owned(), |v| format!("iOS {v}"));
    }
    if user_agent.contains("Android") {
        return capture(&ANDROID_VERSION, user_agent)
            .map_or_else(|| "Android".to_owned(), |v| format!("Android {v}"));
    }
    if let Some(version) = capture(&MAC_OS, user_agent) {
        return format!("macOS {}", version.replace('_', "."));
    }
    if user_agent.contains("Macintosh") || user_agent.contains("Mac OS") {
        return "macOS".to_owned();
    }
    if user_agent.contains("Linux") {
        return "Linux".to_owned();
    }
    UNKNOWN.to_owned()
}

fn ios_version(user_agent: &str) -> Option<String> {
    capture(&IOS_VERSION, user_agent).map(|v| v.replace('_', "."))
}

fn ios_device(user_agent: &str) -> &'static str {
    ["iPad", "iPhone", "iPod"]
        .into_iter()
        .find(|device| user_agent.contains(device))
        .unwrap_or(UNKNOWN)
}

fn android_device(user_agent: &str) -> Option<String> {
    let raw = capture(&ANDROID_DEVICE, user_agent)?;
    let model = raw.split(" Build/").next().unwrap_or(raw).trim();
    (!model.is_empty()).then(|| model.to_owned())
}

fn capture<'a>(re: &Regex, haystack: &'a str) -> Option<&'a str> {
    re.captures(haystack)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}
