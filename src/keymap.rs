//! Key naming and scan codes
//!
//! Recordings identify keys by a canonical lowercase name plus the PC
//! (set 1) scan code. The name alone is ambiguous for extended keys: the
//! right-hand modifiers and the navigation cluster share base scan codes
//! with keypad and left-hand keys, so synthesis resolves a key from the
//! name/scan-code pair first and falls back to the name. Keys the table
//! does not know keep the hook's raw platform code instead.

use rdev::Key;

/// Name used for keys the table does not know
pub const UNKNOWN_KEY_NAME: &str = "unknown";

struct KeyEntry {
    key: Key,
    name: &'static str,
    scan_code: u32,
}

const fn entry(key: Key, name: &'static str, scan_code: u32) -> KeyEntry {
    KeyEntry {
        key,
        name,
        scan_code,
    }
}

const KEY_TABLE: &[KeyEntry] = &[
    entry(Key::Escape, "esc", 1),
    entry(Key::Num1, "1", 2),
    entry(Key::Num2, "2", 3),
    entry(Key::Num3, "3", 4),
    entry(Key::Num4, "4", 5),
    entry(Key::Num5, "5", 6),
    entry(Key::Num6, "6", 7),
    entry(Key::Num7, "7", 8),
    entry(Key::Num8, "8", 9),
    entry(Key::Num9, "9", 10),
    entry(Key::Num0, "0", 11),
    entry(Key::Minus, "-", 12),
    entry(Key::Equal, "=", 13),
    entry(Key::Backspace, "backspace", 14),
    entry(Key::Tab, "tab", 15),
    entry(Key::KeyQ, "q", 16),
    entry(Key::KeyW, "w", 17),
    entry(Key::KeyE, "e", 18),
    entry(Key::KeyR, "r", 19),
    entry(Key::KeyT, "t", 20),
    entry(Key::KeyY, "y", 21),
    entry(Key::KeyU, "u", 22),
    entry(Key::KeyI, "i", 23),
    entry(Key::KeyO, "o", 24),
    entry(Key::KeyP, "p", 25),
    entry(Key::LeftBracket, "[", 26),
    entry(Key::RightBracket, "]", 27),
    entry(Key::Return, "enter", 28),
    entry(Key::ControlLeft, "ctrl", 29),
    entry(Key::KeyA, "a", 30),
    entry(Key::KeyS, "s", 31),
    entry(Key::KeyD, "d", 32),
    entry(Key::KeyF, "f", 33),
    entry(Key::KeyG, "g", 34),
    entry(Key::KeyH, "h", 35),
    entry(Key::KeyJ, "j", 36),
    entry(Key::KeyK, "k", 37),
    entry(Key::KeyL, "l", 38),
    entry(Key::SemiColon, ";", 39),
    entry(Key::Quote, "'", 40),
    entry(Key::BackQuote, "`", 41),
    entry(Key::ShiftLeft, "shift", 42),
    entry(Key::BackSlash, "\\", 43),
    entry(Key::KeyZ, "z", 44),
    entry(Key::KeyX, "x", 45),
    entry(Key::KeyC, "c", 46),
    entry(Key::KeyV, "v", 47),
    entry(Key::KeyB, "b", 48),
    entry(Key::KeyN, "n", 49),
    entry(Key::KeyM, "m", 50),
    entry(Key::Comma, ",", 51),
    entry(Key::Dot, ".", 52),
    entry(Key::Slash, "/", 53),
    entry(Key::ShiftRight, "right shift", 54),
    entry(Key::KpMultiply, "keypad *", 55),
    entry(Key::Alt, "alt", 56),
    entry(Key::Space, "space", 57),
    entry(Key::CapsLock, "caps lock", 58),
    entry(Key::F1, "f1", 59),
    entry(Key::F2, "f2", 60),
    entry(Key::F3, "f3", 61),
    entry(Key::F4, "f4", 62),
    entry(Key::F5, "f5", 63),
    entry(Key::F6, "f6", 64),
    entry(Key::F7, "f7", 65),
    entry(Key::F8, "f8", 66),
    entry(Key::F9, "f9", 67),
    entry(Key::F10, "f10", 68),
    entry(Key::NumLock, "num lock", 69),
    entry(Key::ScrollLock, "scroll lock", 70),
    entry(Key::Kp7, "keypad 7", 71),
    entry(Key::Kp8, "keypad 8", 72),
    entry(Key::Kp9, "keypad 9", 73),
    entry(Key::KpMinus, "keypad -", 74),
    entry(Key::Kp4, "keypad 4", 75),
    entry(Key::Kp5, "keypad 5", 76),
    entry(Key::Kp6, "keypad 6", 77),
    entry(Key::KpPlus, "keypad +", 78),
    entry(Key::Kp1, "keypad 1", 79),
    entry(Key::Kp2, "keypad 2", 80),
    entry(Key::Kp3, "keypad 3", 81),
    entry(Key::Kp0, "keypad 0", 82),
    entry(Key::KpDelete, "keypad .", 83),
    entry(Key::IntlBackslash, "intl \\", 86),
    entry(Key::F11, "f11", 87),
    entry(Key::F12, "f12", 88),
    // Extended keys (E0-prefixed) reuse the base codes above
    entry(Key::KpReturn, "keypad enter", 28),
    entry(Key::ControlRight, "right ctrl", 29),
    entry(Key::KpDivide, "keypad /", 53),
    entry(Key::PrintScreen, "print screen", 55),
    entry(Key::AltGr, "alt gr", 56),
    entry(Key::Pause, "pause", 69),
    entry(Key::Home, "home", 71),
    entry(Key::UpArrow, "up", 72),
    entry(Key::PageUp, "page up", 73),
    entry(Key::LeftArrow, "left", 75),
    entry(Key::RightArrow, "right", 77),
    entry(Key::End, "end", 79),
    entry(Key::DownArrow, "down", 80),
    entry(Key::PageDown, "page down", 81),
    entry(Key::Insert, "insert", 82),
    entry(Key::Delete, "delete", 83),
    entry(Key::MetaLeft, "windows", 91),
    entry(Key::MetaRight, "right windows", 92),
];

const ALIASES: &[(&str, &str)] = &[
    ("escape", "esc"),
    ("return", "enter"),
    ("control", "ctrl"),
    ("left ctrl", "ctrl"),
    ("left shift", "shift"),
    ("left alt", "alt"),
    ("altgr", "alt gr"),
    ("right alt", "alt gr"),
    ("del", "delete"),
    ("ins", "insert"),
    ("pgup", "page up"),
    ("pgdn", "page down"),
    ("capslock", "caps lock"),
    ("spacebar", "space"),
    ("win", "windows"),
    ("left windows", "windows"),
    ("cmd", "windows"),
    ("command", "windows"),
    ("up arrow", "up"),
    ("down arrow", "down"),
    ("left arrow", "left"),
    ("right arrow", "right"),
];

/// Normalize a key name: lowercase, trimmed, aliases folded
pub fn canonical_name(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == lowered)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or(lowered)
}

/// Check whether two key names refer to the same key
pub fn same_key(a: &str, b: &str) -> bool {
    canonical_name(a) == canonical_name(b)
}

/// Describe a hook key as `(canonical name, scan code)`
///
/// Keys outside the table keep their platform code as the scan code.
pub fn describe(key: Key) -> (String, u32) {
    if let Key::Unknown(code) = key {
        return (UNKNOWN_KEY_NAME.to_string(), code);
    }
    KEY_TABLE
        .iter()
        .find(|entry| entry.key == key)
        .map(|entry| (entry.name.to_string(), entry.scan_code))
        .unwrap_or_else(|| (UNKNOWN_KEY_NAME.to_string(), 0))
}

/// Look up a key by name only
pub fn key_for_name(name: &str) -> Option<Key> {
    let name = canonical_name(name);
    KEY_TABLE
        .iter()
        .find(|entry| entry.name == name)
        .map(|entry| entry.key)
}

/// Scan code for a named key, if known
pub fn scan_code_for_name(name: &str) -> Option<u32> {
    let name = canonical_name(name);
    KEY_TABLE
        .iter()
        .find(|entry| entry.name == name)
        .map(|entry| entry.scan_code)
}

/// Resolve a recorded `(name, scan code)` pair to a physical key
///
/// Names outside the table carry the platform key code the hook reported,
/// so they replay as that raw code rather than a set-1 lookup.
pub fn resolve(name: &str, scan_code: u32) -> Key {
    let name = canonical_name(name);

    if let Some(entry) = KEY_TABLE
        .iter()
        .find(|entry| entry.name == name && entry.scan_code == scan_code)
    {
        return entry.key;
    }
    key_for_name(&name).unwrap_or(Key::Unknown(scan_code))
}
