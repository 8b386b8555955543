//! ASCII character → Morse representation lookup.
//!
//! This is the external collaborator named in spec §1: the core consumes a
//! `character -> representation-string` map and otherwise knows nothing
//! about the alphabet. Kept as a `phf::Map` for O(1), allocation-free
//! lookups, same as the upstream CLI this crate grew out of.

use phf::phf_map;

pub static MORSE: phf::Map<char, &'static str> = phf_map! {
    'A' => ".-",    'B' => "-...",  'C' => "-.-.",  'D' => "-..",
    'E' => ".",     'F' => "..-.",  'G' => "--.",   'H' => "....",
    'I' => "..",    'J' => ".---",  'K' => "-.-",   'L' => ".-..",
    'M' => "--",    'N' => "-.",    'O' => "---",   'P' => ".--.",
    'Q' => "--.-",  'R' => ".-.",   'S' => "...",   'T' => "-",
    'U' => "..-",   'V' => "...-",  'W' => ".--",   'X' => "-..-",
    'Y' => "-.--",  'Z' => "--..",
    '0' => "-----", '1' => ".----", '2' => "..---", '3' => "...--",
    '4' => "....-", '5' => ".....", '6' => "-....", '7' => "--...",
    '8' => "---..", '9' => "----.",
    '.' => ".-.-.-", ',' => "--..--", '?' => "..--..", '/' => "-..-.",
    '&' => ".-...", '(' => "-.--.",  ')' => "-.--.-", '+' => ".-.-.",
    '=' => "-...-", '@' => ".--.-.", ':' => "---...", '\'' => ".----.",
    '"' => ".-..-.", '!' => "-.-.--",
};

/// Look up the dot/dash representation for a character, folding to
/// uppercase first. Returns `None` for anything not in the table
/// (including whitespace, which the caller handles separately as a word
/// space rather than a looked-up representation).
pub fn representation(c: char) -> Option<&'static str> {
    MORSE.get(&c.to_ascii_uppercase()).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn looks_up_letters_and_digits() {
        assert_eq!(representation('a'), Some(".-"));
        assert_eq!(representation('S'), Some("..."));
        assert_eq!(representation('0'), Some("-----"));
    }

    #[test]
    fn unknown_character_is_none() {
        assert_eq!(representation('#'), None);
        assert_eq!(representation(' '), None);
    }
}
