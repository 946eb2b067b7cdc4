//! Best-effort resolution of a shot's `character_focus` to a character.
//!
//! This is a heuristic, not a foreign key. A focus matches a character when
//! either string contains the other; the first character in list order that
//! matches wins. When one name is a substring of another ("Kai" and
//! "Kaito"), the earlier-listed character is chosen even if the later one
//! was meant. That ambiguity is a known limitation.

use crate::project::Character;

/// Resolve `focus` against `characters`.
///
/// Blank focus and the literal `none` (any case) resolve to nothing, as do
/// characters with a blank name.
pub fn resolve_focus<'a>(focus: &str, characters: &'a [Character]) -> Option<&'a Character> {
    let focus = focus.trim();
    if focus.is_empty() || focus.eq_ignore_ascii_case("none") {
        return None;
    }
    characters.iter().find(|c| {
        let name = c.name.trim();
        !name.is_empty() && (focus.contains(name) || name.contains(focus))
    })
}
