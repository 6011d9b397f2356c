//! Telex transliteration: Vietnamese tone and vowel composition.
//!
//! # What is Telex? (for beginners)
//!
//! Vietnamese is written with the Latin alphabet plus a set of diacritics.
//! A vowel can carry a *mark* that changes the letter itself (`â`, `ă`, `ơ`,
//! `ư`, `ê`, `ô`) and a *tone* that changes the pitch (`á`, `à`, `ả`, `ã`,
//! `ạ`).  Telex is the most common way to type these on a plain keyboard:
//! extra ASCII keys typed *after* a vowel modify it in place.
//!
//! | Keys       | Result | Rule                                   |
//! |------------|--------|----------------------------------------|
//! | `a` `a`    | `â`    | doubled vowel → circumflex             |
//! | `a` `w`    | `ă`    | `w` → breve / horn                     |
//! | `a` `s`    | `á`    | tone key (`s f r x j`)                 |
//! | `á` `z`    | `a`    | `z` removes the tone                   |
//! | `d` `d`    | `đ`    | doubled `d` → barred d                 |
//!
//! # Word scope
//!
//! Tone and `w` keys act on the nearest vowel *in the current word*, found by
//! scanning backwards from the end of the buffer and stopping at the previous
//! space.  Punctuation is not a boundary.
//!
//! # Lookup tables
//!
//! Every composed vowel is described by a [`VowelInfo`] (base letter, mark,
//! tone, case).  Two inverse tables map characters to infos and back.  They are
//! built once, on first use, and shared read-only afterwards.

use std::collections::HashMap;
use std::sync::OnceLock;

/// The diacritic that changes the vowel letter itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VowelMark {
    /// No letter diacritic (`a`, `e`, `o`, ...).
    Plain,
    /// Circumflex (`â`, `ê`, `ô`).
    Circumflex,
    /// Breve (`ă`).
    Breve,
    /// Horn (`ơ`, `ư`).
    Horn,
}

/// The tone diacritic of a vowel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tone {
    None,
    Acute,
    Grave,
    HookAbove,
    Tilde,
    DotBelow,
}

impl Tone {
    /// Order of the tone columns in [`VOWEL_ROWS`].
    const ALL: [Tone; 6] = [
        Tone::None,
        Tone::Acute,
        Tone::Grave,
        Tone::HookAbove,
        Tone::Tilde,
        Tone::DotBelow,
    ];

    /// Maps a Telex tone key to its tone, case-insensitively.
    pub fn from_key(key: char) -> Option<Tone> {
        match key.to_ascii_lowercase() {
            's' => Some(Tone::Acute),
            'f' => Some(Tone::Grave),
            'r' => Some(Tone::HookAbove),
            'x' => Some(Tone::Tilde),
            'j' => Some(Tone::DotBelow),
            _ => None,
        }
    }
}

/// Full description of one composed vowel character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VowelInfo {
    /// Lowercase ASCII base letter: one of `a e i o u y`.
    pub base: char,
    pub mark: VowelMark,
    pub tone: Tone,
    pub uppercase: bool,
}

/// One row per (base, mark) pair; columns follow [`Tone::ALL`].
const VOWEL_ROWS: [(char, VowelMark, &str); 12] = [
    ('a', VowelMark::Plain, "aáàảãạ"),
    ('a', VowelMark::Circumflex, "âấầẩẫậ"),
    ('a', VowelMark::Breve, "ăắằẳẵặ"),
    ('e', VowelMark::Plain, "eéèẻẽẹ"),
    ('e', VowelMark::Circumflex, "êếềểễệ"),
    ('i', VowelMark::Plain, "iíìỉĩị"),
    ('o', VowelMark::Plain, "oóòỏõọ"),
    ('o', VowelMark::Circumflex, "ôốồổỗộ"),
    ('o', VowelMark::Horn, "ơớờởỡợ"),
    ('u', VowelMark::Plain, "uúùủũụ"),
    ('u', VowelMark::Horn, "ưứừửữự"),
    ('y', VowelMark::Plain, "yýỳỷỹỵ"),
];

struct VowelTables {
    by_char: HashMap<char, VowelInfo>,
    by_info: HashMap<VowelInfo, char>,
}

fn tables() -> &'static VowelTables {
    static TABLES: OnceLock<VowelTables> = OnceLock::new();
    TABLES.get_or_init(|| {
        let mut by_char = HashMap::with_capacity(VOWEL_ROWS.len() * 12);
        let mut by_info = HashMap::with_capacity(VOWEL_ROWS.len() * 12);
        for (base, mark, row) in VOWEL_ROWS {
            for (tone, lower) in Tone::ALL.into_iter().zip(row.chars()) {
                // Every Vietnamese vowel has a single-character uppercase form.
                let upper = lower.to_uppercase().next().unwrap_or(lower);
                for (ch, uppercase) in [(lower, false), (upper, true)] {
                    let info = VowelInfo {
                        base,
                        mark,
                        tone,
                        uppercase,
                    };
                    by_char.insert(ch, info);
                    by_info.insert(info, ch);
                }
            }
        }
        VowelTables { by_char, by_info }
    })
}

/// Looks up the composition of a vowel character, if it is one.
pub fn vowel_info(ch: char) -> Option<VowelInfo> {
    tables().by_char.get(&ch).copied()
}

/// Returns the character for a vowel description, if the combination exists.
///
/// Combinations that Vietnamese does not have (for example `i` with a breve)
/// return `None`.
pub fn compose_vowel(info: VowelInfo) -> Option<char> {
    tables().by_info.get(&info).copied()
}

/// Applies one typed input to the accumulated text and returns the new text.
///
/// Single characters go through the Telex rules described in the module docs.
/// Multi-character input (for example a paste) and empty input are appended
/// verbatim.  This function never fails: any combination without a rule
/// falls back to appending the character.
///
/// # Examples
///
/// ```rust
/// use touchlink_core::domain::telex::apply_telex_input;
///
/// assert_eq!(apply_telex_input("a", "a"), "â");
/// assert_eq!(apply_telex_input("â", "s"), "ấ");
/// assert_eq!(apply_telex_input("con a", "s"), "con á");
/// ```
pub fn apply_telex_input(existing: &str, input: &str) -> String {
    let mut chars = input.chars();
    let key = match (chars.next(), chars.next()) {
        (Some(key), None) => key,
        _ => return format!("{existing}{input}"),
    };

    let mut buffer: Vec<char> = existing.chars().collect();
    if compose_key(&mut buffer, key) {
        buffer.into_iter().collect()
    } else {
        format!("{existing}{key}")
    }
}

/// Tries every Telex rule in turn.  Returns `false` when the key must be
/// appended literally.
fn compose_key(buffer: &mut [char], key: char) -> bool {
    let lower = key.to_ascii_lowercase();

    if let Some(tone) = Tone::from_key(key) {
        return retone_nearest_vowel(buffer, tone);
    }

    match lower {
        'z' => match nearest_vowel(buffer) {
            Some((idx, info)) => {
                // Already toneless: swallow the key without changing anything.
                if info.tone != Tone::None {
                    replace_vowel(buffer, idx, VowelInfo { tone: Tone::None, ..info });
                }
                true
            }
            None => false,
        },
        'd' => match buffer.last_mut() {
            Some(last) if *last == 'd' || *last == 'D' => {
                *last = if *last == 'D' { 'Đ' } else { 'đ' };
                true
            }
            _ => false,
        },
        'w' => match nearest_vowel(buffer) {
            Some((idx, info)) if info.mark == VowelMark::Plain => {
                let mark = match info.base {
                    'a' => VowelMark::Breve,
                    'o' | 'u' => VowelMark::Horn,
                    _ => return false,
                };
                replace_vowel(buffer, idx, VowelInfo { mark, ..info })
            }
            _ => false,
        },
        'a' | 'e' | 'o' => {
            let idx = match buffer.len().checked_sub(1) {
                Some(idx) => idx,
                None => return false,
            };
            match vowel_info(buffer[idx]) {
                Some(info) if info.base == lower && info.mark == VowelMark::Plain => {
                    replace_vowel(buffer, idx, VowelInfo { mark: VowelMark::Circumflex, ..info })
                }
                _ => false,
            }
        }
        _ => false,
    }
}

fn retone_nearest_vowel(buffer: &mut [char], tone: Tone) -> bool {
    match nearest_vowel(buffer) {
        Some((idx, info)) => replace_vowel(buffer, idx, VowelInfo { tone, ..info }),
        None => false,
    }
}

/// Scans backwards from the end of the buffer to the previous space and
/// returns the first vowel found.
fn nearest_vowel(buffer: &[char]) -> Option<(usize, VowelInfo)> {
    buffer
        .iter()
        .enumerate()
        .rev()
        .take_while(|(_, ch)| **ch != ' ')
        .find_map(|(idx, ch)| vowel_info(*ch).map(|info| (idx, info)))
}

fn replace_vowel(buffer: &mut [char], idx: usize, info: VowelInfo) -> bool {
    match compose_vowel(info) {
        Some(ch) => {
            buffer[idx] = ch;
            true
        }
        None => false,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    /// Types a sequence of keys one at a time, starting from an empty buffer.
    fn type_keys(keys: &str) -> String {
        keys.chars().fold(String::new(), |text, key| {
            apply_telex_input(&text, &key.to_string())
        })
    }

    // ── Lookup tables ─────────────────────────────────────────────────────────

    #[test]
    fn test_tables_cover_every_vowel_in_both_cases() {
        // 12 (base, mark) rows × 6 tones × 2 cases
        assert_eq!(tables().by_char.len(), 144);
        assert_eq!(tables().by_info.len(), 144);
    }

    #[test]
    fn test_tables_are_inverse_of_each_other() {
        for (ch, info) in &tables().by_char {
            assert_eq!(compose_vowel(*info), Some(*ch), "round trip failed for {ch}");
        }
    }

    #[test]
    fn test_uppercase_vowel_info_is_flagged() {
        let info = vowel_info('Ấ').expect("Ấ is a vowel");
        assert_eq!(info.base, 'a');
        assert_eq!(info.mark, VowelMark::Circumflex);
        assert_eq!(info.tone, Tone::Acute);
        assert!(info.uppercase);
    }

    #[test]
    fn test_consonant_has_no_vowel_info() {
        assert_eq!(vowel_info('b'), None);
        assert_eq!(vowel_info('đ'), None);
    }

    #[test]
    fn test_compose_vowel_rejects_nonexistent_combination() {
        let info = VowelInfo {
            base: 'i',
            mark: VowelMark::Breve,
            tone: Tone::None,
            uppercase: false,
        };
        assert_eq!(compose_vowel(info), None);
    }

    // ── Composition chain ─────────────────────────────────────────────────────

    #[test]
    fn test_plain_vowel_is_appended() {
        assert_eq!(apply_telex_input("", "a"), "a");
    }

    #[test]
    fn test_doubled_a_becomes_circumflex() {
        assert_eq!(apply_telex_input("a", "a"), "â");
    }

    #[test]
    fn test_tone_key_applies_acute_to_circumflex_vowel() {
        assert_eq!(apply_telex_input("â", "s"), "ấ");
    }

    #[test]
    fn test_z_strips_tone_but_keeps_mark() {
        assert_eq!(apply_telex_input("ấ", "z"), "â");
    }

    #[test]
    fn test_z_on_toneless_vowel_is_idempotent() {
        assert_eq!(apply_telex_input("â", "z"), "â");
    }

    #[test]
    fn test_z_without_vowel_is_literal() {
        assert_eq!(apply_telex_input("b", "z"), "bz");
    }

    #[test]
    fn test_doubled_d_becomes_barred_d() {
        assert_eq!(apply_telex_input("d", "d"), "đ");
    }

    #[test]
    fn test_doubled_d_preserves_case_of_first_letter() {
        assert_eq!(apply_telex_input("D", "d"), "Đ");
        assert_eq!(apply_telex_input("d", "D"), "đ");
    }

    #[test]
    fn test_d_after_other_letter_is_literal() {
        assert_eq!(apply_telex_input("a", "d"), "ad");
        assert_eq!(apply_telex_input("đ", "d"), "đd");
    }

    // ── Tone targeting ────────────────────────────────────────────────────────

    #[test]
    fn test_tone_targets_vowel_in_current_word() {
        assert_eq!(apply_telex_input("con a", "s"), "con á");
    }

    #[test]
    fn test_tone_does_not_cross_previous_space() {
        // The current word "b" has no vowel, so "con" must stay untouched.
        assert_eq!(apply_telex_input("con b", "s"), "con bs");
    }

    #[test]
    fn test_tone_skips_trailing_consonants() {
        assert_eq!(apply_telex_input("viêt", "j"), "việt");
    }

    #[test]
    fn test_tone_replaces_existing_tone() {
        assert_eq!(apply_telex_input("á", "f"), "à");
    }

    #[test]
    fn test_tone_key_without_vowel_is_literal() {
        assert_eq!(apply_telex_input("", "s"), "s");
        assert_eq!(apply_telex_input("th", "r"), "thr");
    }

    #[test]
    fn test_uppercase_tone_key_is_recognised() {
        assert_eq!(apply_telex_input("a", "S"), "á");
    }

    #[test]
    fn test_tone_preserves_uppercase_vowel() {
        assert_eq!(apply_telex_input("A", "x"), "Ã");
    }

    // ── w rules ───────────────────────────────────────────────────────────────

    #[test]
    fn test_w_promotes_a_o_u() {
        assert_eq!(apply_telex_input("a", "w"), "ă");
        assert_eq!(apply_telex_input("o", "w"), "ơ");
        assert_eq!(apply_telex_input("u", "w"), "ư");
    }

    #[test]
    fn test_w_keeps_tone() {
        assert_eq!(apply_telex_input("ó", "w"), "ớ");
    }

    #[test]
    fn test_w_on_already_promoted_vowel_is_literal() {
        assert_eq!(apply_telex_input("ă", "w"), "ăw");
        assert_eq!(apply_telex_input("â", "w"), "âw");
    }

    #[test]
    fn test_w_on_vowel_without_horn_form_is_literal() {
        assert_eq!(apply_telex_input("e", "w"), "ew");
    }

    #[test]
    fn test_w_without_vowel_is_literal() {
        assert_eq!(apply_telex_input("", "w"), "w");
    }

    // ── Doubling rules ────────────────────────────────────────────────────────

    #[test]
    fn test_doubling_only_applies_at_end_of_buffer() {
        assert_eq!(apply_telex_input("ab", "a"), "aba");
    }

    #[test]
    fn test_doubling_applies_once() {
        assert_eq!(apply_telex_input("â", "a"), "âa");
    }

    #[test]
    fn test_doubling_requires_same_base() {
        assert_eq!(apply_telex_input("a", "e"), "ae");
    }

    #[test]
    fn test_doubling_keeps_tone_and_case() {
        assert_eq!(apply_telex_input("Ó", "o"), "Ố");
    }

    #[test]
    fn test_doubled_i_is_literal() {
        assert_eq!(apply_telex_input("i", "i"), "ii");
    }

    // ── Verbatim input ────────────────────────────────────────────────────────

    #[test]
    fn test_multi_character_input_bypasses_rules() {
        assert_eq!(apply_telex_input("a", "as"), "aas");
    }

    #[test]
    fn test_empty_input_leaves_text_unchanged() {
        assert_eq!(apply_telex_input("abc", ""), "abc");
    }

    #[test]
    fn test_unmapped_character_is_appended() {
        assert_eq!(apply_telex_input("xin", "!"), "xin!");
    }

    // ── Whole words ───────────────────────────────────────────────────────────

    #[test]
    fn test_typing_full_words() {
        assert_eq!(type_keys("vieejt"), "việt");
        assert_eq!(type_keys("ddaats"), "đất");
        assert_eq!(type_keys("nuwowcs"), "nước");
        assert_eq!(type_keys("xin chafo"), "xin chào");
    }
}
